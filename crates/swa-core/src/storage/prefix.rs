//! Remote storage prefix scoping.
//!
//! Concurrent workflow jobs share one bucket, so each job writes below its
//! own sub-prefix `<base>/swa-jobs/<job_id>`.

use std::path::Path;

use swa_types::error::StorageError;
use swa_types::job::JobId;

/// Marker segment separating the shared base prefix from the per-job part.
pub const JOB_SEGMENT: &str = "swa-jobs";

/// Rewrite `base` to the per-job prefix for `job_id`.
///
/// A base that already carries a job segment (from an earlier rewrite) is
/// cut back to the shared part first, so prefixes never accumulate.
pub fn scope_prefix(base: &str, job_id: &JobId) -> String {
    let marker = format!("/{JOB_SEGMENT}/");
    let trimmed = base.trim_end_matches('/');
    let shared = match trimmed.find(&marker) {
        Some(idx) => &trimmed[..idx],
        None => trimmed
            .strip_suffix(&format!("/{JOB_SEGMENT}"))
            .unwrap_or(trimmed),
    };
    format!("{shared}/{JOB_SEGMENT}/{job_id}")
}

/// Bucket and key prefix of an `s3://bucket/key/prefix` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub bucket: String,
    pub key_prefix: String,
}

impl S3Location {
    pub fn parse(prefix: &str) -> Result<Self, StorageError> {
        let rest = prefix
            .strip_prefix("s3://")
            .ok_or_else(|| StorageError::InvalidPrefix(prefix.to_string()))?;
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(StorageError::InvalidPrefix(prefix.to_string()));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            key_prefix: key.trim_matches('/').to_string(),
        })
    }

    /// Object key for a file at `relative` below the uploaded directory.
    pub fn key_for(&self, relative: &Path) -> String {
        let rel: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let rel = rel.join("/");
        if self.key_prefix.is_empty() {
            rel
        } else {
            format!("{}/{rel}", self.key_prefix)
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn scopes_base_prefix_per_job() {
        let id = Uuid::now_v7();
        assert_eq!(
            scope_prefix("s3://bucket/runs", &id),
            format!("s3://bucket/runs/swa-jobs/{id}")
        );
        assert_eq!(
            scope_prefix("s3://bucket/runs/", &id),
            format!("s3://bucket/runs/swa-jobs/{id}")
        );
    }

    #[test]
    fn rescoping_does_not_accumulate() {
        let first = Uuid::now_v7();
        let second = Uuid::now_v7();
        let once = scope_prefix("s3://bucket/runs", &first);
        let twice = scope_prefix(&once, &second);
        assert_eq!(twice, format!("s3://bucket/runs/swa-jobs/{second}"));
        assert_eq!(twice.matches(JOB_SEGMENT).count(), 1);
    }

    #[test]
    fn parses_s3_location() {
        let loc = S3Location::parse("s3://data/wf/swa-jobs/abc").unwrap();
        assert_eq!(loc.bucket, "data");
        assert_eq!(loc.key_prefix, "wf/swa-jobs/abc");
        assert_eq!(loc.key_for(Path::new("config/samples.tsv")), "wf/swa-jobs/abc/config/samples.tsv");

        let bare = S3Location::parse("s3://data").unwrap();
        assert_eq!(bare.key_for(Path::new("a.txt")), "a.txt");

        assert!(S3Location::parse("gs://data/x").is_err());
        assert!(S3Location::parse("s3:///x").is_err());
    }
}
