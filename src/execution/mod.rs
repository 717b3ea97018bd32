//! Pipeline engine and invocation control

pub mod controller;
pub mod engine;

pub use controller::{Action, EventHandler, ExecutionEvent, InvocationController};
pub use engine::{NextStep, PipelineEngine};
