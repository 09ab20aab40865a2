// core/src/branch.rs

//! Branch steps: a step whose `on` phase runs exactly one of several typed
//! sub-pipelines, picked by the first arm whose condition holds.
//!
//! ```ignore
//! pipeline
//!   .branch_step("route_event")
//!   .when(is_charge, charge_pipeline, |ctx| Ok(ctx.read().charge.clone()))
//!   .otherwise(PipelineControl::Continue)
//!   .finish();
//! ```
//!
//! A sub-pipeline that completes maps to `Continue` in the parent; one that is
//! stopped maps to `Stop`. Errors propagate unless the step is optional.

use crate::context::{ContextData, Handler};
use crate::control::{PipelineControl, PipelineResult};
use crate::error::FlowError;
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{event, Level};

type Condition<TData> = Arc<dyn Fn(ContextData<TData>) -> bool + Send + Sync + 'static>;
type Extractor<TData, SData> =
  Arc<dyn Fn(ContextData<TData>) -> Result<ContextData<SData>, FlowError> + Send + Sync + 'static>;

#[async_trait]
trait BranchArm<TData, Err>: Send + Sync
where
  TData: Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn matches(&self, ctx_data: ContextData<TData>) -> bool;
  async fn dispatch(&self, step_name: &str, ctx_data: ContextData<TData>) -> Result<PipelineControl, Err>;
}

struct TypedArm<TData, SData, Err>
where
  TData: Send + Sync + 'static,
  SData: Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  condition: Condition<TData>,
  pipeline: Arc<Pipeline<SData, Err>>,
  extractor: Extractor<TData, SData>,
}

#[async_trait]
impl<TData, SData, Err> BranchArm<TData, Err> for TypedArm<TData, SData, Err>
where
  TData: Send + Sync + 'static,
  SData: Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn matches(&self, ctx_data: ContextData<TData>) -> bool {
    (self.condition)(ctx_data)
  }

  async fn dispatch(&self, step_name: &str, ctx_data: ContextData<TData>) -> Result<PipelineControl, Err> {
    let sub_ctx = (self.extractor)(ctx_data).map_err(|e| match e {
      FlowError::HandlerError { source } | FlowError::ExtractorFailure { source, .. } => {
        Err::from(FlowError::ExtractorFailure {
          step_name: step_name.to_string(),
          source,
        })
      }
      other => Err::from(other),
    })?;

    event!(Level::DEBUG, %step_name, sub_context = %std::any::type_name::<SData>(), "Running branch sub-pipeline.");
    match self.pipeline.run(sub_ctx).await? {
      PipelineResult::Completed => Ok(PipelineControl::Continue),
      PipelineResult::Stopped => Ok(PipelineControl::Stop),
    }
  }
}

/// Collects the arms of a branch step. Created by `Pipeline::branch_step`.
pub struct BranchBuilder<'p, TData, Err>
where
  TData: Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: &'p mut Pipeline<TData, Err>,
  step_name: String,
  arms: Vec<Arc<dyn BranchArm<TData, Err>>>,
  otherwise: PipelineControl,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Starts configuring `step_name` as a branch step. The step must be declared.
  pub fn branch_step(&mut self, step_name: &str) -> BranchBuilder<'_, TData, Err> {
    BranchBuilder {
      pipeline: self,
      step_name: step_name.to_string(),
      arms: Vec::new(),
      otherwise: PipelineControl::Continue,
    }
  }
}

impl<'p, TData, Err> BranchBuilder<'p, TData, Err>
where
  TData: Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Adds an arm. Arms are tried in the order they were added.
  pub fn when<SData>(
    mut self,
    condition: impl Fn(ContextData<TData>) -> bool + Send + Sync + 'static,
    pipeline: Arc<Pipeline<SData, Err>>,
    extractor: impl Fn(ContextData<TData>) -> Result<ContextData<SData>, FlowError> + Send + Sync + 'static,
  ) -> Self
  where
    SData: Send + Sync + 'static,
  {
    self.arms.push(Arc::new(TypedArm {
      condition: Arc::new(condition),
      pipeline,
      extractor: Arc::new(extractor),
    }));
    self
  }

  /// Control returned when no arm matches. Defaults to `Continue`.
  pub fn otherwise(mut self, control: PipelineControl) -> Self {
    self.otherwise = control;
    self
  }

  pub fn finish(self) {
    let arms = Arc::new(self.arms);
    let otherwise = self.otherwise;
    let step_name = self.step_name.clone();

    let dispatcher: Handler<TData, Err> = Box::new(move |ctx_data: ContextData<TData>| {
      let arms = arms.clone();
      let step_name = step_name.clone();
      Box::pin(async move {
        for arm in arms.iter() {
          if arm.matches(ctx_data.clone()) {
            return arm.dispatch(&step_name, ctx_data).await;
          }
        }
        event!(Level::DEBUG, %step_name, ?otherwise, "No branch arm matched.");
        Ok(otherwise)
      })
    });

    self.pipeline.push_boxed(&self.step_name, dispatcher);
  }
}
