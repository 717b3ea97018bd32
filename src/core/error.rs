//! Error taxonomy for pipeline runs

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to the operator by the pipeline subsystem
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline '{0}' is already started, use --force to restart or `continue` to resume")]
    AlreadyStarted(String),

    #[error("undefined pipeline '{name}', valid choices are: {known}")]
    UndefinedPipeline { name: String, known: String },

    #[error("no run of pipeline '{0}' is in progress")]
    NotStarted(String),

    #[error("control file {path} is corrupt ({reason}); remove it manually to recover")]
    CorruptState { path: PathBuf, reason: String },

    #[error("control file {path} does not match the current '{pipeline}' definition ({reason}); finish it with the original definition or abort")]
    DefinitionMismatch {
        path: PathBuf,
        pipeline: String,
        reason: String,
    },
}
