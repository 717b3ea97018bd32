//! Invocation controller - drives one requested action to completion

use crate::core::error::PipelineError;
use crate::core::pipeline::PipelineDefinition;
use crate::core::step::StepStatus;
use crate::execution::engine::{NextStep, PipelineEngine};
use crate::persistence::StateStore;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Action verbs exposed to the invoking layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Begin a fresh run; fails when one is already in progress
    Start,
    /// Resume the in-progress run by exactly one step
    Continue,
    /// Abandon the in-progress run and drop its control file
    Abort,
}

/// Progress notifications for the invoking layer
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted {
        run_id: Uuid,
        pipeline: String,
        total_steps: usize,
    },
    StepStarted {
        step: String,
        index: usize,
        total: usize,
    },
    StepCompleted {
        step: String,
    },
    StepSuspended {
        step: String,
    },
    RunCompleted {
        pipeline: String,
    },
    RunAborted {
        pipeline: String,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Per-invocation driver
///
/// Interprets a requested action against the persisted state and the
/// engine, looping while the action chain implies further immediate work:
/// a single external `start` transparently also performs the first
/// `continue`, and each completing step chains into the next.
pub struct InvocationController<'a> {
    definition: &'a PipelineDefinition,
    store: &'a dyn StateStore,
    handlers: Vec<EventHandler>,
}

impl<'a> InvocationController<'a> {
    pub fn new(definition: &'a PipelineDefinition, store: &'a dyn StateStore) -> Self {
        Self {
            definition,
            store,
            handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(handler));
    }

    fn emit(&self, event: ExecutionEvent) {
        for handler in &self.handlers {
            handler(event.clone());
        }
    }

    /// Drive `action` until no follow-up action remains
    ///
    /// `force` applies only to the first iteration.
    pub async fn run(&self, action: Action, force: bool) -> Result<()> {
        let mut action = Some(action);
        let mut force = force;
        while let Some(current) = action {
            action = self.dispatch(current, force).await?;
            force = false;
        }
        Ok(())
    }

    async fn dispatch(&self, action: Action, force: bool) -> Result<Option<Action>> {
        match action {
            Action::Start => self.start(force).await,
            Action::Continue => self.advance().await,
            Action::Abort => self.abort().await,
        }
    }

    async fn start(&self, force: bool) -> Result<Option<Action>> {
        if self.store.exists().await? {
            if !force {
                return Err(
                    PipelineError::AlreadyStarted(self.definition.name().to_string()).into(),
                );
            }
            warn!(
                pipeline = self.definition.name(),
                "discarding previous in-progress state"
            );
            self.store.remove().await?;
        }

        let engine = PipelineEngine::new(self.definition);
        let state = engine.init();
        self.store.save(&state).await?;

        info!(
            pipeline = self.definition.name(),
            run_id = %state.run_id,
            steps = state.total_steps(),
            "pipeline started"
        );
        self.emit(ExecutionEvent::RunStarted {
            run_id: state.run_id,
            pipeline: state.pipeline.clone(),
            total_steps: state.total_steps(),
        });

        Ok(Some(Action::Continue))
    }

    async fn advance(&self) -> Result<Option<Action>> {
        let Some(mut state) = self.store.load().await? else {
            return Err(PipelineError::NotStarted(self.definition.name().to_string()).into());
        };

        let engine = PipelineEngine::new(self.definition);
        engine.check(&state, &self.store.location())?;

        let (index, step) = match engine.next(&mut state) {
            NextStep::Pending { index, step } => (index, step),
            NextStep::Exhausted => {
                // Terminal: the control file is dropped so finished runs
                // leave no artifact behind
                info!(pipeline = %state.pipeline, "pipeline is complete");
                self.store.remove().await?;
                self.emit(ExecutionEvent::RunCompleted {
                    pipeline: state.pipeline,
                });
                return Ok(None);
            }
        };

        info!(step = step.name(), "running step");
        self.emit(ExecutionEvent::StepStarted {
            step: step.name().to_string(),
            index,
            total: state.total_steps(),
        });

        // A step failure propagates before any write, leaving the previous
        // durable state for an unmodified retry on the next `continue`
        let status = step.run(&mut state.meta).await?;

        engine.record(&mut state, index, status);
        state.touch();
        self.store.save(&state).await?;

        match status {
            StepStatus::Complete => {
                info!(step = step.name(), "step complete, moving forward");
                self.emit(ExecutionEvent::StepCompleted {
                    step: step.name().to_string(),
                });
                Ok(Some(Action::Continue))
            }
            StepStatus::Suspended => {
                warn!(step = step.name(), "step is NOT complete after run, stopping");
                self.emit(ExecutionEvent::StepSuspended {
                    step: step.name().to_string(),
                });
                Ok(None)
            }
        }
    }

    async fn abort(&self) -> Result<Option<Action>> {
        if !self.store.exists().await? {
            return Err(PipelineError::NotStarted(self.definition.name().to_string()).into());
        }

        // The control file must go even when the state cannot be loaded
        // (corrupt file included), so the removal is not short-circuited
        let outcome = self.abort_state().await;
        let removed = self.store.remove().await;

        outcome?;
        removed?;

        self.emit(ExecutionEvent::RunAborted {
            pipeline: self.definition.name().to_string(),
        });
        Ok(None)
    }

    async fn abort_state(&self) -> Result<()> {
        let Some(mut state) = self.store.load().await? else {
            return Ok(());
        };
        let engine = PipelineEngine::new(self.definition);
        engine.abort(&mut state);
        info!(
            pipeline = %state.pipeline,
            completed = state.completed_steps(),
            total = state.total_steps(),
            "pipeline aborted"
        );
        Ok(())
    }
}
