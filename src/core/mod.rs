//! Core domain types

pub mod config;
pub mod error;
pub mod pipeline;
pub mod state;
pub mod step;

pub use config::Config;
pub use error::PipelineError;
pub use pipeline::{PipelineDefinition, PipelineRegistry};
pub use state::{Meta, PipelineState, PipelineStatus};
pub use step::{Step, StepStatus};
