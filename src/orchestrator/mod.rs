//! Request orchestration: the per-item pipeline and transient error dwell.

pub mod dwell;
pub mod engine;

pub use dwell::ErrorDwell;
pub use engine::{Submitted, TaskOrchestrator};
