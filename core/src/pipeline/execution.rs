// core/src/pipeline/execution.rs

use crate::context::{ContextData, Handler};
use crate::control::{PipelineControl, PipelineResult};
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use crate::step::StepDef;
use tracing::{event, info_span, instrument, Instrument, Level};

enum StepOutcome<Err> {
  Continue,
  Stop,
  Failed(Err),
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in order against `ctx_data`.
  ///
  /// A failing handler aborts the run with its error, unless the step is
  /// optional, in which case the error is logged and the next step runs.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(context_type = %std::any::type_name::<TData>(), num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    if let Some(step_name) = self.unknown_hook_targets.first() {
      return Err(Err::from(FlowError::StepNotFound {
        step_name: step_name.clone(),
      }));
    }

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_span = info_span!(
        "pipeline_step",
        step_name = %step_def.name,
        step_index = step_idx,
        optional = step_def.optional
      );
      match self.run_step(step_def, ctx_data.clone()).instrument(step_span).await {
        StepOutcome::Continue => {}
        StepOutcome::Stop => return Ok(PipelineResult::Stopped),
        StepOutcome::Failed(e) => return Err(e),
      }
    }

    event!(Level::DEBUG, "Pipeline completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_step(&self, step_def: &StepDef<TData>, ctx_data: ContextData<TData>) -> StepOutcome<Err> {
    let step_name = step_def.name.as_str();
    let optional = step_def.optional;
    if let Some(skip_if) = &step_def.skip_if {
      if skip_if(ctx_data.clone()) {
        event!(Level::DEBUG, "Step skipped by its skip condition.");
        return StepOutcome::Continue;
      }
    }

    let phases = [
      ("before", self.before.get(step_name)),
      ("on", self.on.get(step_name)),
      ("after", self.after.get(step_name)),
    ];
    let has_handlers = phases.iter().any(|(_, hs)| hs.is_some_and(|v| !v.is_empty()));

    if !has_handlers {
      if optional {
        event!(Level::DEBUG, "Optional step has no handlers, skipping.");
        return StepOutcome::Continue;
      }
      event!(Level::ERROR, "Non-optional step has no handlers.");
      return StepOutcome::Failed(Err::from(FlowError::HandlerMissing {
        step_name: step_name.to_string(),
      }));
    }

    for (phase, handlers) in phases {
      let Some(handlers) = handlers else { continue };
      match run_phase(phase, handlers, &ctx_data).await {
        StepOutcome::Continue => {}
        StepOutcome::Stop => {
          event!(Level::INFO, %phase, "Pipeline stopped by a handler.");
          return StepOutcome::Stop;
        }
        StepOutcome::Failed(e) if optional => {
          event!(Level::WARN, %phase, error = %e, "Optional step failed, continuing.");
          return StepOutcome::Continue;
        }
        StepOutcome::Failed(e) => {
          event!(Level::ERROR, %phase, error = %e, "Step failed.");
          return StepOutcome::Failed(e);
        }
      }
    }
    StepOutcome::Continue
  }
}

async fn run_phase<TData, Err>(
  phase: &'static str,
  handlers: &[Handler<TData, Err>],
  ctx_data: &ContextData<TData>,
) -> StepOutcome<Err>
where
  TData: Send + Sync + 'static,
{
  for (handler_idx, handler) in handlers.iter().enumerate() {
    event!(Level::TRACE, %phase, handler_index = handler_idx, "Running handler.");
    match handler(ctx_data.clone()).await {
      Ok(PipelineControl::Continue) => {}
      Ok(PipelineControl::Stop) => return StepOutcome::Stop,
      Err(e) => return StepOutcome::Failed(e),
    }
  }
  StepOutcome::Continue
}
