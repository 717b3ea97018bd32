//! CLI output formatting

use crate::core::state::PipelineStatus;
use crate::execution::ExecutionEvent;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a spinner shown while a step runs
pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format a run status for display
pub fn format_status(status: PipelineStatus) -> String {
    match status {
        PipelineStatus::InProgress => style("IN PROGRESS").yellow().to_string(),
        PipelineStatus::Complete => style("COMPLETE").green().to_string(),
        PipelineStatus::Aborted => style("ABORTED").red().to_string(),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::RunStarted {
            run_id,
            pipeline,
            total_steps,
        } => format!(
            "{} Starting pipeline {} ({}, {} steps)",
            ROCKET,
            style(pipeline).bold(),
            style(&run_id.to_string()[..8]).dim(),
            style(total_steps).cyan()
        ),
        ExecutionEvent::StepStarted { step, index, total } => format!(
            "{} {} [{}/{}]",
            INFO,
            style(step).cyan(),
            index + 1,
            total
        ),
        ExecutionEvent::StepCompleted { step } => {
            format!("{} {}", CHECK, style(step).green())
        }
        ExecutionEvent::StepSuspended { step } => format!(
            "{} {} is not complete yet; run `continue` once the external work is done",
            WARN,
            style(step).yellow()
        ),
        ExecutionEvent::RunCompleted { pipeline } => format!(
            "{} {} completed {}",
            CHECK,
            style(pipeline).bold(),
            style("successfully").green()
        ),
        ExecutionEvent::RunAborted { pipeline } => {
            format!("{} {} {}", CROSS, style(pipeline).bold(), style("aborted").red())
        }
    }
}
