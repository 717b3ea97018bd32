//! CLI command definitions

use clap::Args;

/// Begin a new run of a pipeline
#[derive(Debug, Args, Clone)]
pub struct StartCommand {
    /// Name of the pipeline to start
    pub pipeline: String,

    /// Discard any in-progress state and start over
    #[arg(short, long)]
    pub force: bool,
}

/// Resume an in-progress pipeline
#[derive(Debug, Args, Clone)]
pub struct ContinueCommand {
    /// Name of the pipeline to continue
    pub pipeline: String,
}

/// Abandon an in-progress pipeline
#[derive(Debug, Args, Clone)]
pub struct AbortCommand {
    /// Name of the pipeline to abort
    pub pipeline: String,
}

/// List defined pipelines and their run status
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
