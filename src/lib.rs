//! stepwise - resumable multi-step pipeline runner
//!
//! Runs named, ordered sequences of long-running actions (a release
//! process, for example) across multiple separate program invocations,
//! persisting progress to a per-pipeline control file so a step can be
//! resumed, retried, or aborted after the process exits between steps.

pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;

// Re-export commonly used types
pub use crate::core::{
    Config, Meta, PipelineDefinition, PipelineError, PipelineRegistry, PipelineState,
    PipelineStatus, Step, StepStatus,
};
pub use crate::execution::{Action, ExecutionEvent, InvocationController, PipelineEngine};
pub use crate::persistence::{ControlFileStore, InMemoryStateStore, StateStore};
