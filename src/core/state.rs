//! Durable pipeline state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// On-disk format version; bumped on incompatible layout changes
pub const STATE_FORMAT_VERSION: u32 = 1;

/// Overall pipeline run status
///
/// The status lives inside the state rather than being inferred from the
/// control file's existence; the file is just a container and is deleted
/// once a terminal status is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Run is underway, a control file exists
    InProgress,
    /// All steps completed (terminal)
    Complete,
    /// Run was abandoned by the operator (terminal)
    Aborted,
}

impl PipelineStatus {
    /// Check if the run has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStatus::Complete | PipelineStatus::Aborted)
    }
}

/// Failure to decode a persisted state
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StateDecodeError(String);

/// Per-step durable record
///
/// The step name is retained so a run persisted under one definition can be
/// rejected when the definition later changes underneath it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub complete: bool,
}

/// Shared mutable scratch data passed to every step's run logic
///
/// The only channel steps use to communicate across invocations. Backed by
/// an ordered map so the serialized form is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meta(BTreeMap<String, Value>);

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a value as a string slice, if present and a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Increment an integer counter under `key`, returning the new count
    pub fn bump(&mut self, key: &str) -> u64 {
        let count = self.0.get(key).and_then(Value::as_u64).unwrap_or(0) + 1;
        self.0.insert(key.to_string(), Value::from(count));
        count
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The durable snapshot of progress through a pipeline's steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// State layout version
    pub version: u32,

    /// Unique id for this run
    pub run_id: Uuid,

    /// Name of the pipeline this run belongs to
    pub pipeline: String,

    /// Current run status
    pub status: PipelineStatus,

    /// Index of the step currently pending execution; never decreases
    pub cursor: usize,

    /// One record per step of the definition, in definition order
    pub steps: Vec<StepRecord>,

    /// Shared scratch data for step communication
    pub meta: Meta,

    /// When the run was started
    pub started_at: DateTime<Utc>,

    /// When the state was last written
    pub updated_at: DateTime<Utc>,
}

impl PipelineState {
    /// Create a fresh state for a run over the given step names
    pub fn new(pipeline: impl Into<String>, step_names: Vec<String>) -> Self {
        let now = Utc::now();
        let status = if step_names.is_empty() {
            // A pipeline with no steps has nothing left to do
            PipelineStatus::Complete
        } else {
            PipelineStatus::InProgress
        };

        Self {
            version: STATE_FORMAT_VERSION,
            run_id: Uuid::new_v4(),
            pipeline: pipeline.into(),
            status,
            cursor: 0,
            steps: step_names
                .into_iter()
                .map(|name| StepRecord {
                    name,
                    complete: false,
                })
                .collect(),
            meta: Meta::new(),
            started_at: now,
            updated_at: now,
        }
    }

    /// Encode the state for the control file
    ///
    /// The encoding is deterministic: field order is fixed and `meta` keys
    /// are sorted, so `unserialize(serialize(s)) == s`.
    pub fn serialize(&self) -> String {
        // A plain struct over JSON-native types cannot fail to encode
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Decode a state previously written by [`serialize`](Self::serialize)
    ///
    /// Structural invalidity is fatal to the invocation; the operator must
    /// remove the control file to recover.
    pub fn unserialize(raw: &str) -> Result<Self, StateDecodeError> {
        let state: PipelineState = serde_json::from_str(raw)
            .map_err(|e| StateDecodeError(format!("invalid encoding: {}", e)))?;

        if state.version != STATE_FORMAT_VERSION {
            return Err(StateDecodeError(format!(
                "unsupported format version {}",
                state.version
            )));
        }
        if state.cursor > state.steps.len() {
            return Err(StateDecodeError(format!(
                "cursor {} out of range for {} steps",
                state.cursor,
                state.steps.len()
            )));
        }

        Ok(state)
    }

    /// Number of steps flagged complete so far
    pub fn completed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.complete).count()
    }

    /// Total number of steps in the run
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Touch the update timestamp before a write
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> PipelineState {
        let mut state = PipelineState::new(
            "release",
            vec!["bump".to_string(), "tag".to_string(), "push".to_string()],
        );
        state.cursor = 1;
        state.steps[0].complete = true;
        state.meta.insert("version", "1.2.3");
        state.meta.insert("attempts/tag", 2);
        state
    }

    #[test]
    fn test_round_trip() {
        let state = sample_state();
        let decoded = PipelineState::unserialize(&state.serialize()).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_fresh_state() {
        let state = PipelineState::new("release", vec!["bump".to_string()]);
        assert_eq!(state.status, PipelineStatus::InProgress);
        assert_eq!(state.cursor, 0);
        assert!(state.meta.is_empty());
        assert!(!state.steps[0].complete);
    }

    #[test]
    fn test_empty_pipeline_is_complete() {
        let state = PipelineState::new("noop", vec![]);
        assert_eq!(state.status, PipelineStatus::Complete);
        assert!(state.status.is_terminal());
    }

    #[test]
    fn test_unserialize_rejects_garbage() {
        assert!(PipelineState::unserialize("not json at all").is_err());
        assert!(PipelineState::unserialize("{\"version\": 1}").is_err());
    }

    #[test]
    fn test_unserialize_rejects_wrong_version() {
        let mut state = sample_state();
        state.version = 99;
        let raw = serde_json::to_string(&state).unwrap();
        let err = PipelineState::unserialize(&raw).unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn test_unserialize_rejects_out_of_range_cursor() {
        let mut state = sample_state();
        state.cursor = 7;
        let raw = serde_json::to_string(&state).unwrap();
        let err = PipelineState::unserialize(&raw).unwrap_err();
        assert!(err.to_string().contains("cursor"));
    }

    #[test]
    fn test_meta_bump() {
        let mut meta = Meta::new();
        assert_eq!(meta.bump("attempts/tag"), 1);
        assert_eq!(meta.bump("attempts/tag"), 2);
        assert_eq!(meta.get("attempts/tag").and_then(Value::as_u64), Some(2));
    }
}
