//! HTTP request handlers for the REST API.

pub mod demos;
pub mod jobs;
pub mod tool_process;
pub mod tools;
pub mod workflow_process;
pub mod workflows;
