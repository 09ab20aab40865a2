// core/tests/error_handling_tests.rs
mod common;

use common::*;
use ochre_flow::{ContextData, FlowError, Pipeline, PipelineControl};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn missing_handler_on_required_step_is_reported() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new(&[("unwired", false, None)]);
  match pipeline.run(ContextData::new(TestContext::default())).await {
    Err(TestError::Flow(s)) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("unwired"));
    }
    other => panic!("expected HandlerMissing, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn pipeline_can_use_flow_error_directly() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, FlowError>::new(&[("task", false, None)]);
  pipeline.on_root("task", |_ctx: ContextData<TestContext>| {
    Box::pin(async move { Err::<PipelineControl, _>(FlowError::from(anyhow::anyhow!("upstream said no"))) })
  });

  match pipeline.run(ContextData::new(TestContext::default())).await {
    Err(FlowError::HandlerError { source }) => assert_eq!(source.to_string(), "upstream said no"),
    other => panic!("expected HandlerError, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn handler_error_type_converts_into_pipeline_error() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("task", false, None)]);
  pipeline.on_root("task", |_ctx: ContextData<TestContext>| {
    Box::pin(async move {
      Err::<PipelineControl, FlowError>(FlowError::HandlerMissing {
        step_name: "inner".to_string(),
      })
    })
  });

  match pipeline.run(ContextData::new(TestContext::default())).await {
    Err(TestError::Flow(s)) => assert!(s.contains("inner")),
    other => panic!("expected converted flow error, got {:?}", other),
  }
}
