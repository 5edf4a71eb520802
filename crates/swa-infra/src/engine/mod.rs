//! Engine subprocess drivers.
//!
//! [`wrapper::WrapperDriver`] runs one synthesized rule per job;
//! [`workflow::WorkflowDriver`] runs a whole pre-existing workflow. Both spawn
//! the engine through [`process::run_engine`], which owns timeout and
//! cancellation handling.

pub mod command;
pub mod prefill;
pub mod process;
pub mod profile;
pub mod workflow;
pub mod wrapper;

#[cfg(test)]
pub(crate) mod testing;

pub use command::EngineCommand;
pub use process::{OutputSink, ProcessOutcome, ProcessOutput, run_engine};
pub use workflow::WorkflowDriver;
pub use wrapper::WrapperDriver;
