//! Shared domain types for swa.
//!
//! Jobs, execution requests and results, rule records, wrapper metadata,
//! server configuration and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod job;
pub mod metadata;
pub mod request;
pub mod result;
pub mod rule;
