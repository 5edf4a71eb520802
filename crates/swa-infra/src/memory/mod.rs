//! In-memory job and process stores.
//!
//! Both are `DashMap`-backed: each shard is behind its own lock, so they are
//! safe under tokio's multi-threaded runtime. Known limitation: state lives
//! in a single server process and is lost on restart.

pub mod job_store;
pub mod process_registry;

pub use job_store::InMemoryJobStore;
pub use process_registry::InMemoryProcessRegistry;
