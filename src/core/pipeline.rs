//! Pipeline definitions and lookup

use crate::core::error::PipelineError;
use crate::core::step::Step;
use std::collections::BTreeMap;

/// An ordered, immutable sequence of steps under a stable name
///
/// Supplied externally at construction time and fixed for the lifetime of a
/// run; steps execute strictly in sequence.
pub struct PipelineDefinition {
    name: String,
    steps: Vec<Box<dyn Step>>,
}

impl PipelineDefinition {
    pub fn new(name: impl Into<String>, steps: Vec<Box<dyn Step>>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Get the step at `index`, if within range
    pub fn step(&self, index: usize) -> Option<&dyn Step> {
        self.steps.get(index).map(Box::as_ref)
    }

    /// Step names in execution order
    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name().to_string()).collect()
    }
}

impl std::fmt::Debug for PipelineDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineDefinition")
            .field("name", &self.name)
            .field("steps", &self.step_names())
            .finish()
    }
}

/// Lookup of pipeline definitions by name
#[derive(Debug, Default)]
pub struct PipelineRegistry {
    pipelines: BTreeMap<String, PipelineDefinition>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: PipelineDefinition) {
        self.pipelines.insert(definition.name().to_string(), definition);
    }

    /// Look up a definition, listing the valid choices when it is unknown
    pub fn get(&self, name: &str) -> Result<&PipelineDefinition, PipelineError> {
        self.pipelines
            .get(name)
            .ok_or_else(|| PipelineError::UndefinedPipeline {
                name: name.to_string(),
                known: self.names().join(", "),
            })
    }

    /// Registered pipeline names, sorted
    pub fn names(&self) -> Vec<String> {
        self.pipelines.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::step::CommandStep;

    fn definition(name: &str, steps: &[&str]) -> PipelineDefinition {
        PipelineDefinition::new(
            name,
            steps
                .iter()
                .map(|s| Box::new(CommandStep::new(*s, "true")) as Box<dyn Step>)
                .collect(),
        )
    }

    #[test]
    fn test_definition_order() {
        let def = definition("release", &["bump", "tag", "push"]);
        assert_eq!(def.len(), 3);
        assert_eq!(def.step(0).unwrap().name(), "bump");
        assert_eq!(def.step_names(), vec!["bump", "tag", "push"]);
        assert!(def.step(3).is_none());
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = PipelineRegistry::new();
        registry.register(definition("release", &["tag"]));
        registry.register(definition("docs", &["build"]));

        assert_eq!(registry.get("release").unwrap().name(), "release");

        let err = registry.get("deploy").unwrap_err();
        assert!(err.to_string().contains("docs, release"));
    }
}
