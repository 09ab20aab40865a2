// core/src/lib.rs

//! Ochre Flow: async, type-safe step pipelines for request workflows.
//!
//! A pipeline is an ordered list of named steps over a shared context
//! (`ContextData<T>`). Each step carries `before`/`on`/`after` handlers that
//! return `PipelineControl::Continue` or `PipelineControl::Stop`.
//!
//!  - Steps may be optional. An optional step with no handlers is skipped and a
//!    failing handler in an optional step is logged and does not abort the run.
//!  - Steps may carry a skip condition evaluated against the context.
//!  - A branch step dispatches to one of several typed sub-pipelines,
//!    chosen by a condition on the parent context.
//!  - `PipelineRegistry` keys pipelines by their context type so callers can
//!    run a workflow just by handing over its context.

pub mod branch;
pub mod context;
pub mod control;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod step;

pub use crate::branch::BranchBuilder;
pub use crate::context::{ContextData, Handler};
pub use crate::control::{PipelineControl, PipelineResult};
pub use crate::error::{FlowError, FlowResult};
pub use crate::pipeline::Pipeline;
pub use crate::registry::PipelineRegistry;
pub use crate::step::{SkipCondition, StepDef};
