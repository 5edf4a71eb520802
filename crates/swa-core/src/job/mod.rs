//! Job orchestration: background task runner, submission/cancel service
//! and the per-job process tracker handed to drivers.

pub mod runner;
pub mod service;
pub mod tracker;

pub use runner::TaskRunner;
pub use service::JobService;
pub use tracker::ProcessTracker;
