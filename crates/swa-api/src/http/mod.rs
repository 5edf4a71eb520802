//! HTTP/REST API layer for swa.
//!
//! Axum-based REST API with JSON bodies and a uniform error shape.

pub mod error;
pub mod handlers;
pub mod router;
