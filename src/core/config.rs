//! Pipeline declarations from YAML

use crate::core::pipeline::{PipelineDefinition, PipelineRegistry};
use crate::core::step::{CommandStep, ConfirmStep, Step};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "stepwise.yaml";

/// Top-level configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Pipeline declarations by name
    pub pipelines: BTreeMap<String, PipelineConfig>,
}

/// One declared pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Ordered steps; order is execution order
    pub steps: Vec<StepConfig>,
}

/// Step declaration as written in YAML
///
/// Exactly one of `command` or `confirm` selects the step kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Step name, unique within the pipeline
    pub name: String,

    /// Shell command to run; the step completes when it exits zero
    #[serde(default)]
    pub command: Option<String>,

    /// Meta key to store the command's trimmed stdout under
    #[serde(default)]
    pub capture: Option<String>,

    /// Message to show the operator; the step suspends until the next
    /// `continue` invocation
    #[serde(default)]
    pub confirm: Option<String>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(raw: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(raw).context("failed to parse YAML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (pipeline, decl) in &self.pipelines {
            let mut seen = std::collections::BTreeSet::new();
            for step in &decl.steps {
                if !seen.insert(step.name.as_str()) {
                    bail!(
                        "pipeline '{}' declares step '{}' more than once",
                        pipeline,
                        step.name
                    );
                }
                match (&step.command, &step.confirm) {
                    (Some(_), Some(_)) => bail!(
                        "step '{}' of pipeline '{}' declares both command and confirm",
                        step.name,
                        pipeline
                    ),
                    (None, None) => bail!(
                        "step '{}' of pipeline '{}' declares neither command nor confirm",
                        step.name,
                        pipeline
                    ),
                    _ => {}
                }
                if step.capture.is_some() && step.command.is_none() {
                    bail!(
                        "step '{}' of pipeline '{}' sets capture without a command",
                        step.name,
                        pipeline
                    );
                }
            }
        }
        Ok(())
    }

    /// Build the runnable registry from the declarations
    pub fn into_registry(self) -> PipelineRegistry {
        let mut registry = PipelineRegistry::new();
        for (name, decl) in self.pipelines {
            let steps = decl.steps.into_iter().map(StepConfig::into_step).collect();
            registry.register(PipelineDefinition::new(name, steps));
        }
        registry
    }
}

impl StepConfig {
    fn into_step(self) -> Box<dyn Step> {
        if let Some(message) = self.confirm {
            return Box::new(ConfirmStep::new(self.name, message));
        }

        // validate() guarantees a command is present here
        let command = self.command.unwrap_or_default();
        let mut step = CommandStep::new(self.name, command);
        if let Some(key) = self.capture {
            step = step.with_capture(key);
        }
        Box::new(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
pipelines:
  release:
    steps:
      - name: bump
        command: "cargo set-version --bump patch"
      - name: tag
        command: "git describe --tags"
        capture: tag
      - name: push-tag
        confirm: "Push the tag upstream, then run `stepwise continue release`"
  docs:
    steps:
      - name: build
        command: "make docs"
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.pipelines.len(), 2);
        assert_eq!(config.pipelines["release"].steps.len(), 3);
        assert_eq!(config.pipelines["release"].steps[1].capture.as_deref(), Some("tag"));
    }

    #[test]
    fn test_into_registry() {
        let registry = Config::from_yaml(SAMPLE).unwrap().into_registry();
        assert_eq!(registry.names(), vec!["docs", "release"]);
        let release = registry.get("release").unwrap();
        assert_eq!(release.step_names(), vec!["bump", "tag", "push-tag"]);
    }

    #[test]
    fn test_rejects_ambiguous_step_kind() {
        let yaml = r#"
pipelines:
  bad:
    steps:
      - name: both
        command: "true"
        confirm: "also this"
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("both command and confirm"));
    }

    #[test]
    fn test_rejects_empty_step_kind() {
        let yaml = r#"
pipelines:
  bad:
    steps:
      - name: neither
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("neither command nor confirm"));
    }

    #[test]
    fn test_rejects_duplicate_step_names() {
        let yaml = r#"
pipelines:
  bad:
    steps:
      - name: twice
        command: "true"
      - name: twice
        command: "true"
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("more than once"));
    }
}
