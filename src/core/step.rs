//! Step contract and built-in step kinds

use crate::core::state::Meta;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Outcome of one step attempt, reported by the step's own run logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The step finished its work; the cursor may advance past it
    Complete,
    /// The step needs another invocation before it can complete
    ///
    /// Not a failure: typically the step is waiting on an external action,
    /// such as a human confirming a pushed tag.
    Suspended,
}

/// A single named unit of work within a pipeline
///
/// Steps are stateless between runs except through the shared `meta`; a
/// step object may be reconstructed fresh on every invocation, so anything
/// it needs to remember must go through `meta`.
#[async_trait]
pub trait Step: Send + Sync {
    /// Stable name, unique within the pipeline definition
    fn name(&self) -> &str;

    /// Execute the step's side-effecting work
    ///
    /// Errors propagate unmodified to the operator and leave the durable
    /// state untouched, so the next `continue` retries the same step from
    /// the same meta snapshot.
    async fn run(&self, meta: &mut Meta) -> Result<StepStatus>;
}

/// Step that runs a shell command, failing on non-zero exit
#[derive(Debug, Clone)]
pub struct CommandStep {
    name: String,
    command: String,
    /// Meta key to store trimmed stdout under, if any
    capture: Option<String>,
}

impl CommandStep {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            capture: None,
        }
    }

    pub fn with_capture(mut self, key: impl Into<String>) -> Self {
        self.capture = Some(key.into());
        self
    }
}

#[async_trait]
impl Step for CommandStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, meta: &mut Meta) -> Result<StepStatus> {
        debug!(step = %self.name, command = %self.command, "spawning command");

        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .output()
            .await
            .with_context(|| format!("failed to spawn command for step '{}'", self.name))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "step '{}' command exited with {}: {}",
                self.name,
                output.status,
                stderr.trim_end()
            );
        }

        if let Some(key) = &self.capture {
            let stdout = String::from_utf8_lossy(&output.stdout)
                .trim_end()
                .to_string();
            meta.insert(key.clone(), stdout);
        }

        Ok(StepStatus::Complete)
    }
}

/// Step that waits for an operator acknowledgement across invocations
///
/// The first attempt prints the instructions and suspends; once the
/// operator has done the external work and re-invokes `continue`, the step
/// completes. The pending marker travels through `meta`.
#[derive(Debug, Clone)]
pub struct ConfirmStep {
    name: String,
    message: String,
}

impl ConfirmStep {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    fn pending_key(&self) -> String {
        format!("pending/{}", self.name)
    }
}

#[async_trait]
impl Step for ConfirmStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, meta: &mut Meta) -> Result<StepStatus> {
        meta.bump(&format!("attempts/{}", self.name));

        if meta.contains(&self.pending_key()) {
            info!(step = %self.name, "acknowledged on re-invocation");
            return Ok(StepStatus::Complete);
        }

        meta.insert(self.pending_key(), true);
        warn!(step = %self.name, "{}", self.message);
        Ok(StepStatus::Suspended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_command_step_completes() {
        let step = CommandStep::new("noop", "true");
        let mut meta = Meta::new();
        let status = step.run(&mut meta).await.unwrap();
        assert_eq!(status, StepStatus::Complete);
        assert!(meta.is_empty());
    }

    #[tokio::test]
    async fn test_command_step_captures_stdout() {
        let step = CommandStep::new("version", "echo 1.2.3").with_capture("version");
        let mut meta = Meta::new();
        step.run(&mut meta).await.unwrap();
        assert_eq!(meta.get_str("version"), Some("1.2.3"));
    }

    #[tokio::test]
    async fn test_command_step_fails_on_nonzero_exit() {
        let step = CommandStep::new("broken", "exit 3");
        let mut meta = Meta::new();
        let err = step.run(&mut meta).await.unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[tokio::test]
    async fn test_confirm_step_suspends_then_completes() {
        let step = ConfirmStep::new("push-tag", "push the tag, then continue");
        let mut meta = Meta::new();

        assert_eq!(step.run(&mut meta).await.unwrap(), StepStatus::Suspended);
        assert!(meta.contains("pending/push-tag"));

        assert_eq!(step.run(&mut meta).await.unwrap(), StepStatus::Complete);
        assert_eq!(
            meta.get("attempts/push-tag").and_then(Value::as_u64),
            Some(2)
        );
    }
}
