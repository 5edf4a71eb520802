//! Multi-step workflow execution.
//!
//! Layout of a workflow under `workflows_dir`:
//!
//! ```text
//! <workflow_id>/
//!   workflow/Snakefile     (or Snakefile at the root)
//!   config/config.yaml     base configuration, optional
//!   profiles/<name>/       workflow-local execution profiles
//! ```

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use swa_core::config::deep_merge;
use swa_core::job::ProcessTracker;
use swa_core::rule::spec::is_identifier;
use swa_core::storage::BoxObjectStore;
use swa_core::storage::prefix::scope_prefix;
use swa_types::error::DriverError;
use swa_types::request::{CoreCount, PrefillMode, WorkflowRequest};
use swa_types::result::ExecutionResult;
use uuid::Uuid;

use super::command::EngineCommand;
use super::prefill::prefill;
use super::process::{OutputSink, ProcessOutcome, run_engine};
use super::profile::{ResolvedProfile, resolve_profile};
use crate::fsutil::{LOG_TAIL_BYTES, link_entries, tail_file};

/// Entry points, in lookup order.
pub const ENTRY_POINTS: [&str; 2] = ["workflow/Snakefile", "Snakefile"];
pub const BASE_CONFIG: &str = "config/config.yaml";

pub struct WorkflowDriver {
    engine: EngineCommand,
    workflows_dir: PathBuf,
    runs_dir: PathBuf,
    log_dir: PathBuf,
    profiles_dir: Option<PathBuf>,
    store: Option<Arc<BoxObjectStore>>,
}

/// Everything resolved before the engine is spawned.
struct Prepared {
    exec_dir: PathBuf,
    snakefile: PathBuf,
    config: tempfile::TempPath,
    profile: Option<ResolvedProfile>,
    storage_prefix: Option<String>,
}

impl WorkflowDriver {
    pub fn new(
        engine: EngineCommand,
        workflows_dir: impl Into<PathBuf>,
        runs_dir: impl Into<PathBuf>,
        log_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            engine,
            workflows_dir: workflows_dir.into(),
            runs_dir: runs_dir.into(),
            log_dir: log_dir.into(),
            profiles_dir: None,
            store: None,
        }
    }

    pub fn with_profiles_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profiles_dir = Some(dir.into());
        self
    }

    pub fn with_store(mut self, store: Arc<BoxObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn workflows_dir(&self) -> &Path {
        &self.workflows_dir
    }

    pub fn log_path(&self, job_id: &Uuid) -> PathBuf {
        self.log_dir.join(format!("{job_id}.log"))
    }

    /// Run the workflow named by `request`.
    ///
    /// Preparation errors (unknown workflow, bad profile, unreadable config)
    /// become failed results with exit code `-1`.
    pub async fn execute(
        &self,
        request: &WorkflowRequest,
        timeout: Duration,
        tracker: &ProcessTracker,
    ) -> anyhow::Result<ExecutionResult> {
        let prepared = match self.prepare(request).await {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!(workflow = %request.workflow_id, error = %e, "workflow preparation failed");
                return Ok(ExecutionResult::local_failure(e.to_string()));
            }
        };

        let result = self.run(request, &prepared, timeout, tracker).await;

        let config_path = prepared.config.to_path_buf();
        match prepared.config.close() {
            Ok(()) => tracing::debug!(config = %config_path.display(), "removed merged config"),
            Err(e) => tracing::warn!(config = %config_path.display(), error = %e, "failed to remove merged config"),
        }
        result
    }

    async fn prepare(&self, request: &WorkflowRequest) -> Result<Prepared, DriverError> {
        check_arguments(request)?;
        let workflow_dir = self.workflow_dir(&request.workflow_id).await?;
        let snakefile = entry_point(&workflow_dir).await?;

        let mut config = load_base_config(&workflow_dir).await?;
        deep_merge(&mut config, &Value::Object(request.config_overrides.clone()));

        let exec_dir = if request.isolate {
            let run_id = request.job_id.unwrap_or_else(Uuid::now_v7);
            let dir = self.runs_dir.join(run_id.to_string());
            link_entries(&workflow_dir, &dir).await?;
            std::path::absolute(dir)?
        } else {
            workflow_dir.clone()
        };
        tokio::fs::create_dir_all(&exec_dir).await?;

        let profile = match &request.profile {
            Some(name) => Some(resolve_profile(&workflow_dir, self.profiles_dir.as_deref(), name).await?),
            None => None,
        };
        let storage_prefix = profile.as_ref().and_then(|p| p.storage_prefix.as_deref()).map(|base| {
            let scope = request.job_id.unwrap_or_else(Uuid::now_v7);
            scope_prefix(base, &scope)
        });

        let rendered = serde_yaml_ng::to_string(&config).map_err(|e| DriverError::Config(e.to_string()))?;
        let config_file = tempfile::Builder::new()
            .prefix(".swa-config-")
            .suffix(".yaml")
            .tempfile_in(&exec_dir)?
            .into_temp_path();
        tokio::fs::write(&config_file, rendered).await?;
        tracing::debug!(config = %config_file.display(), "generated merged config");

        Ok(Prepared {
            exec_dir,
            snakefile,
            config: config_file,
            profile,
            storage_prefix,
        })
    }

    async fn workflow_dir(&self, workflow_id: &str) -> Result<PathBuf, DriverError> {
        let id = Path::new(workflow_id);
        let escapes = id
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if workflow_id.trim().is_empty() || escapes {
            return Err(DriverError::WorkflowNotFound(workflow_id.to_string()));
        }
        let dir = self.workflows_dir.join(id);
        if !tokio::fs::metadata(&dir).await.is_ok_and(|m| m.is_dir()) {
            return Err(DriverError::WorkflowNotFound(dir.display().to_string()));
        }
        Ok(std::path::absolute(dir)?)
    }

    async fn run(
        &self,
        request: &WorkflowRequest,
        prepared: &Prepared,
        timeout: Duration,
        tracker: &ProcessTracker,
    ) -> anyhow::Result<ExecutionResult> {
        if let Some(failure) = self.prefill_if_requested(request, prepared).await {
            return Ok(failure);
        }

        let mut command = self
            .engine
            .clone()
            .opt("--snakefile", &prepared.snakefile)
            .opt("--configfile", &*prepared.config)
            .opt("--directory", &prepared.exec_dir)
            .opt("--cores", request.cores.to_string())
            .arg("--default-resources")
            .opt("--scheduler", "greedy")
            .arg("--nocolor")
            .arg("--printshellcmds")
            .flag_if(request.use_conda, "--use-conda");
        if let Some(profile) = &prepared.profile {
            command = command.opt("--profile", &profile.dir);
        }
        if let Some(prefix) = &prepared.storage_prefix {
            command = command.opt("--default-storage-prefix", prefix);
        }
        if let Some(target) = &request.target_rule {
            command = command.arg(target);
        }
        let command = command.current_dir(&prepared.exec_dir);

        let sink = match request.job_id {
            Some(id) => OutputSink::File(self.log_path(&id)),
            None => OutputSink::Capture,
        };
        tracing::info!(workflow = %request.workflow_id, command = %command, "executing workflow");
        let out = run_engine(&command, &sink, timeout, tracker).await?;

        let stderr = match &sink {
            OutputSink::File(log) if out.outcome != ProcessOutcome::Exited(0) => {
                tail_file(log, LOG_TAIL_BYTES).await.unwrap_or_default()
            }
            _ => out.stderr,
        };
        let result = match out.outcome {
            ProcessOutcome::Exited(code) => {
                let mut result = ExecutionResult::from_exit(code, out.stdout, stderr);
                if !result.is_success() {
                    result.error_message = Some(format!("workflow execution failed with exit code {code}"));
                }
                result
            }
            ProcessOutcome::TimedOut => ExecutionResult::timed_out(timeout, out.stdout, stderr),
            ProcessOutcome::Cancelled => ExecutionResult::cancelled("execution cancelled"),
        };
        Ok(result)
    }

    /// Returns a failed result only when a `required` prefill did not succeed.
    async fn prefill_if_requested(&self, request: &WorkflowRequest, prepared: &Prepared) -> Option<ExecutionResult> {
        if request.prefill == PrefillMode::Off {
            return None;
        }
        let Some(prefix) = &prepared.storage_prefix else {
            tracing::debug!(workflow = %request.workflow_id, "prefill requested but no storage prefix resolved");
            return None;
        };
        let outcome = match &self.store {
            Some(store) => prefill(store, &prepared.exec_dir, prefix).await.map_err(|e| e.to_string()),
            None => Err("no object store configured".to_string()),
        };
        match outcome {
            Ok(count) => {
                tracing::info!(prefix = %prefix, files = count, "prefill complete");
                None
            }
            Err(message) => {
                tracing::warn!(prefix = %prefix, error = %message, "prefill failed");
                (request.prefill == PrefillMode::Required)
                    .then(|| ExecutionResult::local_failure(format!("prefill failed: {message}")))
            }
        }
    }
}

/// Client values that end up on the engine command line must not read as flags.
fn check_arguments(request: &WorkflowRequest) -> Result<(), DriverError> {
    if let Some(target) = request.target_rule.as_deref().filter(|t| !is_identifier(t)) {
        return Err(DriverError::InvalidRequest(format!("target rule '{target}' is not a rule name")));
    }
    match &request.cores {
        CoreCount::Keyword(keyword) if keyword != "all" => Err(DriverError::InvalidRequest(format!(
            "cores must be a number or \"all\", got '{keyword}'"
        ))),
        _ => Ok(()),
    }
}

async fn entry_point(workflow_dir: &Path) -> Result<PathBuf, DriverError> {
    for candidate in ENTRY_POINTS {
        let path = workflow_dir.join(candidate);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(path);
        }
    }
    Err(DriverError::WorkflowNotFound(format!(
        "no Snakefile in {}",
        workflow_dir.display()
    )))
}

async fn load_base_config(workflow_dir: &Path) -> Result<Value, DriverError> {
    let path = workflow_dir.join(BASE_CONFIG);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "base config not found, starting from an empty config");
            return Ok(Value::Object(Default::default()));
        }
        Err(e) => return Err(e.into()),
    };
    let value: Value =
        serde_yaml_ng::from_str(&content).map_err(|e| DriverError::Config(format!("{}: {e}", path.display())))?;
    match value {
        Value::Null => Ok(Value::Object(Default::default())),
        Value::Object(_) => Ok(value),
        _ => Err(DriverError::Config(format!("{} is not a mapping", path.display()))),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use serde_json::json;
    use swa_core::storage::BoxObjectStore;
    use swa_types::result::LOCAL_FAILURE_EXIT_CODE;

    use super::*;
    use crate::engine::testing::{FakeEngine, TOUCH_TARGETS};
    use crate::storage::testing::MemoryObjectStore;

    /// Copies the merged config into the execution directory.
    const KEEP_CONFIG: &str = r#"cp "$config" "$dir/seen-config.yaml""#;

    struct Fixture {
        root: tempfile::TempDir,
        engine: FakeEngine,
    }

    impl Fixture {
        fn new(body: &str) -> Self {
            let root = tempfile::tempdir().unwrap();
            let wf = root.path().join("workflows/rna-seq");
            std::fs::create_dir_all(wf.join("workflow")).unwrap();
            std::fs::create_dir_all(wf.join("config")).unwrap();
            std::fs::write(wf.join("workflow/Snakefile"), "rule all:\n    input: []\n").unwrap();
            std::fs::write(
                wf.join("config/config.yaml"),
                "samples: [a, b]\nthreshold:\n  min: 1\n  max: 5\n",
            )
            .unwrap();
            let engine = FakeEngine::new(root.path(), body);
            Self { root, engine }
        }

        fn workflow(&self) -> PathBuf {
            self.root.path().join("workflows/rna-seq")
        }

        fn driver(&self) -> WorkflowDriver {
            let base = self.root.path();
            WorkflowDriver::new(self.engine.command(), base.join("workflows"), base.join("runs"), base.join("logs"))
        }

        fn request(&self) -> WorkflowRequest {
            WorkflowRequest {
                workflow_id: "rna-seq".into(),
                config_overrides: serde_json::Map::new(),
                target_rule: None,
                cores: CoreCount::default(),
                use_conda: true,
                profile: None,
                prefill: PrefillMode::Off,
                isolate: false,
                job_id: None,
            }
        }

        fn temp_configs(&self, dir: &Path) -> usize {
            std::fs::read_dir(dir)
                .unwrap()
                .filter(|e| {
                    e.as_ref()
                        .unwrap()
                        .file_name()
                        .to_string_lossy()
                        .starts_with(".swa-config-")
                })
                .count()
        }
    }

    async fn run(fx: &Fixture, request: &WorkflowRequest) -> ExecutionResult {
        fx.driver()
            .execute(request, Duration::from_secs(30), &ProcessTracker::detached())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn merges_config_and_cleans_up() {
        let fx = Fixture::new(KEEP_CONFIG);
        let mut request = fx.request();
        request.config_overrides = json!({"threshold": {"min": 3}, "samples": ["c"]})
            .as_object()
            .cloned()
            .unwrap();
        request.target_rule = Some("all".into());
        request.cores = CoreCount::Count(2);

        let result = run(&fx, &request).await;
        assert!(result.is_success(), "{result:?}");

        let seen: Value =
            serde_yaml_ng::from_str(&std::fs::read_to_string(fx.workflow().join("seen-config.yaml")).unwrap())
                .unwrap();
        assert_eq!(seen, json!({"samples": ["c"], "threshold": {"min": 3, "max": 5}}));
        assert_eq!(fx.temp_configs(&fx.workflow()), 0);

        let call = &fx.engine.invocations()[0];
        for flag in ["--cores 2", "--default-resources", "--scheduler greedy", "--printshellcmds", "--use-conda"] {
            assert!(call.contains(flag), "missing {flag} in {call}");
        }
        assert!(call.ends_with(" all"));
    }

    #[tokio::test]
    async fn root_snakefile_and_missing_base_config() {
        let fx = Fixture::new(KEEP_CONFIG);
        std::fs::remove_dir_all(fx.workflow().join("workflow")).unwrap();
        std::fs::remove_dir_all(fx.workflow().join("config")).unwrap();
        std::fs::write(fx.workflow().join("Snakefile"), "rule all:\n").unwrap();
        let mut request = fx.request();
        request.use_conda = false;

        let result = run(&fx, &request).await;
        assert!(result.is_success(), "{result:?}");
        let seen = std::fs::read_to_string(fx.workflow().join("seen-config.yaml")).unwrap();
        assert_eq!(seen.trim(), "{}");
        let call = &fx.engine.invocations()[0];
        assert!(call.contains(&format!("--snakefile {}", fx.workflow().join("Snakefile").display())));
        assert!(!call.contains("--use-conda"));
    }

    #[tokio::test]
    async fn unknown_workflow_fails_locally() {
        let fx = Fixture::new(TOUCH_TARGETS);
        let mut request = fx.request();
        request.workflow_id = "missing".into();
        let result = run(&fx, &request).await;
        assert_eq!(result.exit_code, LOCAL_FAILURE_EXIT_CODE);
        assert!(result.stderr.contains("workflow not found"));

        request.workflow_id = "../rna-seq".into();
        let result = run(&fx, &request).await;
        assert_eq!(result.exit_code, LOCAL_FAILURE_EXIT_CODE);
        assert!(fx.engine.invocations().is_empty());
    }

    #[tokio::test]
    async fn flag_like_arguments_are_rejected() {
        let fx = Fixture::new(TOUCH_TARGETS);

        let mut request = fx.request();
        request.target_rule = Some("--delete-all-output".into());
        let result = run(&fx, &request).await;
        assert_eq!(result.exit_code, LOCAL_FAILURE_EXIT_CODE);
        assert!(result.stderr.contains("target rule"), "{}", result.stderr);

        let mut request = fx.request();
        request.cores = CoreCount::Keyword("--touch".into());
        let result = run(&fx, &request).await;
        assert_eq!(result.exit_code, LOCAL_FAILURE_EXIT_CODE);
        assert!(result.stderr.contains("cores"), "{}", result.stderr);

        assert!(fx.engine.invocations().is_empty());

        let mut request = fx.request();
        request.target_rule = Some("align_reads".into());
        request.cores = CoreCount::Keyword("all".into());
        assert!(run(&fx, &request).await.is_success());
    }

    #[tokio::test]
    async fn job_output_goes_to_log_and_tail_becomes_stderr() {
        let fx = Fixture::new("echo 'Building DAG of jobs...'\necho 'Error in rule align' >&2\nexit 1");
        let job_id = Uuid::now_v7();
        let mut request = fx.request();
        request.job_id = Some(job_id);

        let result = run(&fx, &request).await;
        assert_eq!(result.exit_code, 1);
        assert_eq!(
            result.error_message.as_deref(),
            Some("workflow execution failed with exit code 1")
        );
        assert!(result.stderr.contains("Error in rule align"));

        let log = std::fs::read_to_string(fx.root.path().join(format!("logs/{job_id}.log"))).unwrap();
        assert!(log.contains("Building DAG of jobs"));
        assert!(log.contains("Error in rule align"));
    }

    #[tokio::test]
    async fn isolated_runs_use_per_job_directory() {
        let fx = Fixture::new(KEEP_CONFIG);
        let job_id = Uuid::now_v7();
        let mut request = fx.request();
        request.isolate = true;
        request.job_id = Some(job_id);

        let result = run(&fx, &request).await;
        assert!(result.is_success(), "{result:?}");
        let exec_dir = fx.root.path().join("runs").join(job_id.to_string());
        assert!(std::fs::symlink_metadata(exec_dir.join("workflow")).unwrap().file_type().is_symlink());
        assert!(exec_dir.join("seen-config.yaml").is_file());
        assert!(!fx.workflow().join("seen-config.yaml").exists());
        assert_eq!(fx.temp_configs(&exec_dir), 0);
    }

    fn with_s3_profile(fx: &Fixture) {
        let profile = fx.workflow().join("profiles/k3s-s3");
        std::fs::create_dir_all(&profile).unwrap();
        std::fs::write(
            profile.join("config.v8+.yaml"),
            "executor: kubernetes\ndefault-storage-prefix: s3://bucket/base/swa-jobs/previous\n",
        )
        .unwrap();
        std::fs::create_dir_all(fx.workflow().join("data")).unwrap();
        std::fs::write(fx.workflow().join("data/reads.fq"), "@r1\nACGT\n+\nIIII\n").unwrap();
        std::fs::write(fx.workflow().join("engine.log"), "old log").unwrap();
    }

    #[tokio::test]
    async fn profile_prefix_is_scoped_and_prefilled() {
        let fx = Fixture::new(TOUCH_TARGETS);
        with_s3_profile(&fx);
        let memory = MemoryObjectStore::default();
        let driver = fx
            .driver()
            .with_store(Arc::new(BoxObjectStore::new(memory.clone())));

        let job_id = Uuid::now_v7();
        let mut request = fx.request();
        request.profile = Some("k3s-s3".into());
        request.prefill = PrefillMode::Required;
        request.job_id = Some(job_id);

        let result = driver
            .execute(&request, Duration::from_secs(30), &ProcessTracker::detached())
            .await
            .unwrap();
        assert!(result.is_success(), "{result:?}");

        let scoped = format!("s3://bucket/base/swa-jobs/{job_id}");
        let call = &fx.engine.invocations()[0];
        assert!(call.contains(&format!("--default-storage-prefix {scoped}")));
        assert!(call.contains("--profile "));

        let keys: Vec<String> = memory.keys().into_iter().map(|(_, k)| k).collect();
        assert!(keys.contains(&format!("base/swa-jobs/{job_id}/data/reads.fq")));
        assert!(keys.iter().all(|k| !k.ends_with(".log")));
    }

    #[tokio::test]
    async fn required_prefill_failure_stops_the_run() {
        let fx = Fixture::new(TOUCH_TARGETS);
        with_s3_profile(&fx);
        let driver = fx
            .driver()
            .with_store(Arc::new(BoxObjectStore::new(MemoryObjectStore::failing())));
        let mut request = fx.request();
        request.profile = Some("k3s-s3".into());
        request.prefill = PrefillMode::Required;

        let result = driver
            .execute(&request, Duration::from_secs(30), &ProcessTracker::detached())
            .await
            .unwrap();
        assert_eq!(result.exit_code, LOCAL_FAILURE_EXIT_CODE);
        assert!(result.stderr.contains("prefill failed"));
        assert!(fx.engine.invocations().is_empty());
        assert_eq!(fx.temp_configs(&fx.workflow()), 0);

        // best effort carries on
        request.prefill = PrefillMode::BestEffort;
        let result = driver
            .execute(&request, Duration::from_secs(30), &ProcessTracker::detached())
            .await
            .unwrap();
        assert!(result.is_success(), "{result:?}");
    }

    #[tokio::test]
    async fn unknown_profile_fails_locally() {
        let fx = Fixture::new(TOUCH_TARGETS);
        let mut request = fx.request();
        request.profile = Some("nope".into());
        let result = run(&fx, &request).await;
        assert_eq!(result.exit_code, LOCAL_FAILURE_EXIT_CODE);
        assert!(result.stderr.contains("profile not found"));
    }

    #[tokio::test]
    async fn timeout_kills_workflow() {
        let fx = Fixture::new("exec sleep 5");
        let result = fx
            .driver()
            .execute(&fx.request(), Duration::from_secs(1), &ProcessTracker::detached())
            .await
            .unwrap();
        assert_eq!(result.exit_code, LOCAL_FAILURE_EXIT_CODE);
        assert!(result.error_message.unwrap().contains("timed out after 1 seconds"));
        assert_eq!(fx.temp_configs(&fx.workflow()), 0);
    }
}
