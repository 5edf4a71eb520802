//! Orchestration logic and repository trait definitions for swa.
//!
//! This crate defines the ports (job store, process registry, object store,
//! rule parser) that `swa-infra` implements, plus the logic that needs no
//! I/O of its own: the task runner, job service, rule synthesis, the textual
//! rule parser and demo compiler, config merging and storage prefix scoping.

pub mod component;
pub mod config;
pub mod job;
pub mod repository;
pub mod rule;
pub mod storage;
