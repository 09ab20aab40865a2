// core/src/pipeline/definition.rs

use crate::context::Handler;
use crate::error::FlowError;
use crate::step::{SkipCondition, StepDef};
use std::collections::HashMap;

/// An ordered set of named steps over `TData`, whose handlers fail with `Err`.
pub struct Pipeline<TData, Err>
where
  TData: Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
  // Hooks registered against step names the pipeline does not declare.
  // Reported by `run` instead of panicking at registration time.
  pub(crate) unknown_hook_targets: Vec<String>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Declares the steps as `(name, optional, skip_if)` tuples, in run order.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional, skip_if)| StepDef {
        name: (*name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
      unknown_hook_targets: Vec::new(),
    }
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn has_step(&self, step_name: &str) -> bool {
    self.steps.iter().any(|s| s.name == step_name)
  }

  /// Inserts a new step right after `existing`. Returns `StepNotFound` if
  /// `existing` is not declared.
  pub fn insert_step_after(
    &mut self,
    existing: &str,
    new_step: &str,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) -> Result<(), FlowError> {
    let idx = self
      .steps
      .iter()
      .position(|s| s.name == existing)
      .ok_or_else(|| FlowError::StepNotFound {
        step_name: existing.to_string(),
      })?;
    self.steps.insert(
      idx + 1,
      StepDef {
        name: new_step.to_string(),
        optional,
        skip_if,
      },
    );
    Ok(())
  }

  /// Removes a step and its handlers. Unknown names are ignored.
  pub fn remove_step(&mut self, step_name: &str) {
    self.steps.retain(|s| s.name != step_name);
    self.before.remove(step_name);
    self.on.remove(step_name);
    self.after.remove(step_name);
  }
}
