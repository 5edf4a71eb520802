//! Object store adapters.

pub mod s3;

#[cfg(test)]
pub(crate) mod testing;

pub use s3::S3ObjectStore;
