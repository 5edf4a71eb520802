//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (swa-infra) implements. The core crate never depends on a specific
//! storage technology, so a durable multi-process store can replace the
//! in-memory one without touching the orchestration logic.

pub mod job;
pub mod process;
