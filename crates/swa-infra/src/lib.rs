//! Infrastructure implementations for swa.
//!
//! Implements the ports defined in `swa-core`: in-memory job and process
//! stores, the engine subprocess drivers, the reflective rule parser, the
//! S3 object store and the on-disk metadata cache. Also hosts the config
//! loader and data-directory layout.

pub mod config;
pub mod engine;
pub mod filesystem;
pub mod fsutil;
pub mod memory;
pub mod metadata;
pub mod reflect;
pub mod storage;
