// core/tests/branch_tests.rs
mod common;

use common::*;
use ochre_flow::{ContextData, FlowError, Pipeline, PipelineControl, PipelineResult};
use serial_test::serial;
use std::sync::Arc;

fn charge_pipeline(stop_early: bool) -> Arc<Pipeline<ChargeContext, TestError>> {
  let mut p = Pipeline::<ChargeContext, TestError>::new(&[("load", false, None), ("confirm", false, None)]);
  p.on_root("load", move |ctx: ContextData<ChargeContext>| {
    Box::pin(async move {
      ctx.write().trail.push("load".to_string());
      if stop_early {
        return Ok::<_, TestError>(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  });
  p.on_root("confirm", |ctx: ContextData<ChargeContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.trail.push("confirm".to_string());
      guard.confirmed = true;
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });
  Arc::new(p)
}

fn refund_pipeline() -> Arc<Pipeline<RefundContext, TestError>> {
  let mut p = Pipeline::<RefundContext, TestError>::new(&[("refund", false, None)]);
  p.on_root("refund", |ctx: ContextData<RefundContext>| {
    Box::pin(async move {
      ctx.write().refunded = true;
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });
  Arc::new(p)
}

fn routing_pipeline(
  charge: Arc<Pipeline<ChargeContext, TestError>>,
  charge_ctx: ContextData<ChargeContext>,
  refund_ctx: ContextData<RefundContext>,
  otherwise: PipelineControl,
) -> Pipeline<TestContext, TestError> {
  let mut p = Pipeline::<TestContext, TestError>::new(&[("route", false, None), ("ack", false, None)]);
  p.branch_step("route")
    .when(
      |ctx: ContextData<TestContext>| ctx.read().event_kind == "charge.success",
      charge,
      move |_ctx| Ok(charge_ctx.clone()),
    )
    .when(
      |ctx: ContextData<TestContext>| ctx.read().event_kind == "refund.processed",
      refund_pipeline(),
      move |_ctx| Ok(refund_ctx.clone()),
    )
    .otherwise(otherwise)
    .finish();
  p.on_root("ack", record_step("ack", "ack"));
  p
}

fn event(kind: &str) -> ContextData<TestContext> {
  ContextData::new(TestContext {
    event_kind: kind.to_string(),
    ..Default::default()
  })
}

#[tokio::test]
#[serial]
async fn first_matching_arm_runs_its_sub_pipeline() {
  setup_tracing();
  let charge_ctx = ContextData::new(ChargeContext {
    reference: "ref_1".to_string(),
    ..Default::default()
  });
  let refund_ctx = ContextData::new(RefundContext::default());
  let p = routing_pipeline(
    charge_pipeline(false),
    charge_ctx.clone(),
    refund_ctx.clone(),
    PipelineControl::Continue,
  );

  let ctx = event("charge.success");
  assert_eq!(p.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);

  assert!(charge_ctx.read().confirmed);
  assert_eq!(charge_ctx.read().trail, vec!["load", "confirm"]);
  assert!(!refund_ctx.read().refunded);
  assert_eq!(ctx.read().steps_executed, vec!["ack"]);
}

#[tokio::test]
#[serial]
async fn unmatched_event_uses_fallback_control() {
  setup_tracing();
  let charge_ctx = ContextData::new(ChargeContext::default());
  let refund_ctx = ContextData::new(RefundContext::default());

  let lenient = routing_pipeline(
    charge_pipeline(false),
    charge_ctx.clone(),
    refund_ctx.clone(),
    PipelineControl::Continue,
  );
  let ctx = event("transfer.failed");
  assert_eq!(lenient.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().steps_executed, vec!["ack"]);

  let strict = routing_pipeline(charge_pipeline(false), charge_ctx.clone(), refund_ctx, PipelineControl::Stop);
  let ctx = event("transfer.failed");
  assert_eq!(strict.run(ctx.clone()).await.unwrap(), PipelineResult::Stopped);
  assert!(ctx.read().steps_executed.is_empty());
  assert!(charge_ctx.read().trail.is_empty());
}

#[tokio::test]
#[serial]
async fn stopped_sub_pipeline_stops_parent() {
  setup_tracing();
  let charge_ctx = ContextData::new(ChargeContext::default());
  let p = routing_pipeline(
    charge_pipeline(true),
    charge_ctx.clone(),
    ContextData::new(RefundContext::default()),
    PipelineControl::Continue,
  );

  let ctx = event("charge.success");
  assert_eq!(p.run(ctx.clone()).await.unwrap(), PipelineResult::Stopped);
  assert_eq!(charge_ctx.read().trail, vec!["load"]);
  assert!(ctx.read().steps_executed.is_empty());
}

#[tokio::test]
#[serial]
async fn extractor_failure_is_reported_with_step_name() {
  setup_tracing();
  let mut p = Pipeline::<TestContext, TestError>::new(&[("route", false, None)]);
  p.branch_step("route")
    .when(
      |_ctx: ContextData<TestContext>| true,
      charge_pipeline(false),
      |_ctx| Err(FlowError::from(anyhow::anyhow!("metadata missing"))),
    )
    .finish();

  match p.run(event("charge.success")).await {
    Err(TestError::Flow(s)) => {
      assert!(s.contains("ExtractorFailure"));
      assert!(s.contains("route"));
      assert!(s.contains("metadata missing"));
    }
    other => panic!("expected extractor failure, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn optional_branch_swallows_sub_pipeline_error() {
  setup_tracing();
  let mut failing = Pipeline::<ChargeContext, TestError>::new(&[("confirm", false, None)]);
  failing.on_root("confirm", |_ctx: ContextData<ChargeContext>| {
    Box::pin(async move { Err::<PipelineControl, _>(TestError::Handler("db down".to_string())) })
  });
  let failing = Arc::new(failing);

  let mut p = Pipeline::<TestContext, TestError>::new(&[("route", true, None), ("ack", false, None)]);
  p.branch_step("route")
    .when(
      |_ctx: ContextData<TestContext>| true,
      failing,
      |_ctx| Ok(ContextData::new(ChargeContext::default())),
    )
    .finish();
  p.on_root("ack", record_step("ack", "ack"));

  let ctx = event("charge.success");
  assert_eq!(p.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().steps_executed, vec!["ack"]);
}
