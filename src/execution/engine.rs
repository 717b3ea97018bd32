//! Pipeline engine - pure state transitions over a definition

use crate::core::error::PipelineError;
use crate::core::pipeline::PipelineDefinition;
use crate::core::state::{PipelineState, PipelineStatus};
use crate::core::step::{Step, StepStatus};
use std::path::PathBuf;

/// What the engine found at the cursor
pub enum NextStep<'d> {
    /// The step at `index` is pending execution
    Pending { index: usize, step: &'d dyn Step },
    /// The cursor has passed the last step; the run is complete
    Exhausted,
}

/// Sequences steps and advances the durable state
///
/// All transitions are pure over the state struct; nothing here touches
/// disk or the process environment, so transitions are unit-testable in
/// isolation.
pub struct PipelineEngine<'d> {
    definition: &'d PipelineDefinition,
}

impl<'d> PipelineEngine<'d> {
    pub fn new(definition: &'d PipelineDefinition) -> Self {
        Self { definition }
    }

    /// Produce a fresh state: cursor at the first step, empty meta, nothing
    /// complete. A zero-step pipeline is immediately complete.
    pub fn init(&self) -> PipelineState {
        PipelineState::new(self.definition.name(), self.definition.step_names())
    }

    /// Reject persisted state that was written for a different definition
    ///
    /// Changing the step sequence of an in-progress pipeline is unsupported;
    /// mismatched counts or names are refused rather than guessed at.
    pub fn check(&self, state: &PipelineState, location: &str) -> Result<(), PipelineError> {
        let mismatch = |reason: String| PipelineError::DefinitionMismatch {
            path: PathBuf::from(location),
            pipeline: self.definition.name().to_string(),
            reason,
        };

        if state.pipeline != self.definition.name() {
            return Err(mismatch(format!(
                "state belongs to pipeline '{}'",
                state.pipeline
            )));
        }
        if state.steps.len() != self.definition.len() {
            return Err(mismatch(format!(
                "state has {} steps, definition has {}",
                state.steps.len(),
                self.definition.len()
            )));
        }
        for (index, record) in state.steps.iter().enumerate() {
            let expected = self
                .definition
                .step(index)
                .map(|s| s.name())
                .unwrap_or_default();
            if record.name != expected {
                return Err(mismatch(format!(
                    "step {} is '{}' in the state but '{}' in the definition",
                    index, record.name, expected
                )));
            }
        }
        Ok(())
    }

    /// Return the step pending at the cursor, advancing past any steps
    /// already flagged complete first
    ///
    /// Idempotent: calling again without an intervening [`record`](Self::record)
    /// returns the same pending step. Once the cursor passes the last step
    /// the state is marked complete and `Exhausted` is returned.
    pub fn next(&self, state: &mut PipelineState) -> NextStep<'d> {
        while state.cursor < state.steps.len() && state.steps[state.cursor].complete {
            state.cursor += 1;
        }

        if state.cursor >= state.steps.len() {
            state.status = PipelineStatus::Complete;
            return NextStep::Exhausted;
        }

        match self.definition.step(state.cursor) {
            Some(step) => NextStep::Pending {
                index: state.cursor,
                step,
            },
            // check() guards against state/definition drift before this point
            None => {
                state.status = PipelineStatus::Complete;
                NextStep::Exhausted
            }
        }
    }

    /// Apply the outcome of one step attempt
    ///
    /// Completion flags the step and advances the cursor; suspension leaves
    /// both untouched so the same step is retried on the next invocation.
    pub fn record(&self, state: &mut PipelineState, index: usize, status: StepStatus) {
        if status == StepStatus::Complete {
            state.steps[index].complete = true;
            state.cursor = index + 1;
            if state.cursor >= state.steps.len() {
                state.status = PipelineStatus::Complete;
            }
        }
    }

    /// Unconditional transition to the aborted status
    ///
    /// Side effects of already-completed steps are not undone; rollback is
    /// up to step authors.
    pub fn abort(&self, state: &mut PipelineState) {
        state.status = PipelineStatus::Aborted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::PipelineDefinition;
    use crate::core::step::CommandStep;

    fn definition(steps: &[&str]) -> PipelineDefinition {
        PipelineDefinition::new(
            "release",
            steps
                .iter()
                .map(|s| Box::new(CommandStep::new(*s, "true")) as Box<dyn Step>)
                .collect(),
        )
    }

    #[test]
    fn test_init_starts_at_first_step() {
        let def = definition(&["bump", "tag"]);
        let engine = PipelineEngine::new(&def);
        let state = engine.init();
        assert_eq!(state.cursor, 0);
        assert_eq!(state.status, PipelineStatus::InProgress);
        assert_eq!(state.completed_steps(), 0);
    }

    #[test]
    fn test_init_empty_pipeline_is_exhausted() {
        let def = definition(&[]);
        let engine = PipelineEngine::new(&def);
        let mut state = engine.init();
        assert_eq!(state.status, PipelineStatus::Complete);
        assert!(matches!(engine.next(&mut state), NextStep::Exhausted));
    }

    #[test]
    fn test_next_is_idempotent() {
        let def = definition(&["bump", "tag"]);
        let engine = PipelineEngine::new(&def);
        let mut state = engine.init();

        for _ in 0..3 {
            match engine.next(&mut state) {
                NextStep::Pending { index, step } => {
                    assert_eq!(index, 0);
                    assert_eq!(step.name(), "bump");
                }
                NextStep::Exhausted => panic!("expected a pending step"),
            }
        }
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn test_record_complete_advances_cursor() {
        let def = definition(&["bump", "tag"]);
        let engine = PipelineEngine::new(&def);
        let mut state = engine.init();

        engine.record(&mut state, 0, StepStatus::Complete);
        assert_eq!(state.cursor, 1);
        assert!(state.steps[0].complete);
        assert_eq!(state.status, PipelineStatus::InProgress);

        engine.record(&mut state, 1, StepStatus::Complete);
        assert_eq!(state.cursor, 2);
        assert_eq!(state.status, PipelineStatus::Complete);
        assert!(matches!(engine.next(&mut state), NextStep::Exhausted));
    }

    #[test]
    fn test_record_suspended_leaves_cursor() {
        let def = definition(&["bump", "tag"]);
        let engine = PipelineEngine::new(&def);
        let mut state = engine.init();

        engine.record(&mut state, 0, StepStatus::Suspended);
        assert_eq!(state.cursor, 0);
        assert!(!state.steps[0].complete);
    }

    #[test]
    fn test_next_skips_already_complete_steps() {
        let def = definition(&["bump", "tag", "push"]);
        let engine = PipelineEngine::new(&def);
        let mut state = engine.init();
        // Flags recovered from disk may be ahead of the cursor
        state.steps[0].complete = true;
        state.steps[1].complete = true;

        match engine.next(&mut state) {
            NextStep::Pending { index, step } => {
                assert_eq!(index, 2);
                assert_eq!(step.name(), "push");
            }
            NextStep::Exhausted => panic!("expected a pending step"),
        }
        assert_eq!(state.cursor, 2);
    }

    #[test]
    fn test_abort_is_terminal() {
        let def = definition(&["bump"]);
        let engine = PipelineEngine::new(&def);
        let mut state = engine.init();
        engine.abort(&mut state);
        assert_eq!(state.status, PipelineStatus::Aborted);
        assert!(state.status.is_terminal());
    }

    #[test]
    fn test_check_accepts_matching_state() {
        let def = definition(&["bump", "tag"]);
        let engine = PipelineEngine::new(&def);
        let state = engine.init();
        assert!(engine.check(&state, "<memory>").is_ok());
    }

    #[test]
    fn test_check_rejects_changed_definition() {
        let old = definition(&["bump", "tag"]);
        let state = PipelineEngine::new(&old).init();

        let renamed = definition(&["bump", "push"]);
        let err = PipelineEngine::new(&renamed)
            .check(&state, "<memory>")
            .unwrap_err();
        assert!(matches!(err, PipelineError::DefinitionMismatch { .. }));

        let shorter = definition(&["bump"]);
        let err = PipelineEngine::new(&shorter)
            .check(&state, "<memory>")
            .unwrap_err();
        assert!(err.to_string().contains("2 steps"));
    }
}
