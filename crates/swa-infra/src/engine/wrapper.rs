//! Single-wrapper execution.
//!
//! A request becomes one synthesized rule written next to the job's inputs;
//! the engine is then asked to force-build that rule's outputs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use swa_core::component;
use swa_core::job::ProcessTracker;
use swa_core::rule::RuleSpec;
use swa_types::request::ExecutionRequest;
use swa_types::result::ExecutionResult;
use uuid::Uuid;

use super::command::EngineCommand;
use super::process::{OutputSink, ProcessOutcome, run_engine};

/// Name of the environment descriptor shipped with a component.
pub const ENVIRONMENT_FILE: &str = "environment.yaml";

/// Copy of the descriptor inside the working directory.
pub const STAGED_ENVIRONMENT: &str = ".swa-environment.yaml";

const UNLOCK_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct WrapperDriver {
    engine: EngineCommand,
    wrappers_root: PathBuf,
    conda_prefix: PathBuf,
    use_conda: bool,
}

impl WrapperDriver {
    pub fn new(engine: EngineCommand, wrappers_root: impl Into<PathBuf>, conda_prefix: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            wrappers_root: wrappers_root.into(),
            conda_prefix: conda_prefix.into(),
            use_conda: true,
        }
    }

    pub fn with_conda(mut self, use_conda: bool) -> Self {
        self.use_conda = use_conda;
        self
    }

    pub fn wrappers_root(&self) -> &Path {
        &self.wrappers_root
    }

    /// Run `request` to completion.
    ///
    /// Validation problems and engine failures come back as failed results;
    /// `Err` is reserved for unexpected I/O errors around the run.
    pub async fn execute(
        &self,
        request: &ExecutionRequest,
        timeout: Duration,
        tracker: &ProcessTracker,
    ) -> anyhow::Result<ExecutionResult> {
        let component_dir = component::resolve(&self.wrappers_root, &request.component);
        if let Some(failure) = validate(request, &component_dir).await {
            tracing::warn!(component = %request.component, error = ?failure.error_message, "rejected wrapper request");
            return Ok(failure);
        }
        let workdir = std::path::absolute(&request.workdir)?;

        let conda = stage_environment(request, &component_dir, &workdir).await?;
        for log in request.platform.log.iter().flat_map(|l| l.values()) {
            if let Some(parent) = workdir.join(log).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let spec = RuleSpec::from_request(request, &self.wrappers_root, conda);
        let rule_text = spec.render()?;

        let snakefile = tempfile::Builder::new()
            .prefix(&format!(".swa-{}", Uuid::now_v7()))
            .suffix(".smk")
            .rand_bytes(0)
            .tempfile_in(&workdir)?
            .into_temp_path();
        tokio::fs::write(&snakefile, rule_text).await?;
        tracing::debug!(snakefile = %snakefile.display(), "wrote synthesized rule");

        let result = self.run(&spec, &snakefile, &workdir, timeout, tracker).await;

        let path = snakefile.to_path_buf();
        if let Err(e) = snakefile.close() {
            tracing::warn!(snakefile = %path.display(), error = %e, "failed to remove synthesized rule");
        }
        result
    }

    async fn run(
        &self,
        spec: &RuleSpec,
        snakefile: &Path,
        workdir: &Path,
        timeout: Duration,
        tracker: &ProcessTracker,
    ) -> anyhow::Result<ExecutionResult> {
        let unlock = self
            .engine
            .clone()
            .opt("--snakefile", snakefile)
            .opt("--directory", workdir)
            .arg("--unlock");
        match run_engine(&unlock, &OutputSink::Capture, timeout.min(UNLOCK_TIMEOUT), tracker).await {
            Ok(out) if out.outcome == ProcessOutcome::Cancelled => {
                return Ok(ExecutionResult::cancelled("execution cancelled"));
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "unlock failed, continuing"),
        }

        let use_conda = self.use_conda && spec.conda.is_some();
        let mut command = self
            .engine
            .clone()
            .opt("--snakefile", snakefile)
            .opt("--directory", workdir)
            .arg("--forceall")
            .opt("--cores", spec.threads.to_string())
            .arg("--nocolor");
        if use_conda {
            command = command.arg("--use-conda").opt("--conda-prefix", &self.conda_prefix);
        }
        let command = command.args(spec.targets());

        tracing::info!(rule = %spec.name, wrapper = %spec.wrapper, "running wrapper");
        let out = run_engine(&command, &OutputSink::Capture, timeout, tracker).await?;
        let result = match out.outcome {
            ProcessOutcome::Exited(code) => {
                let files = spec.targets().iter().map(|t| workdir.join(t)).collect();
                ExecutionResult::from_exit(code, out.stdout, out.stderr).with_output_files(files)
            }
            ProcessOutcome::TimedOut => ExecutionResult::timed_out(timeout, out.stdout, out.stderr),
            ProcessOutcome::Cancelled => ExecutionResult::cancelled("execution cancelled"),
        };
        Ok(result)
    }
}

async fn validate(request: &ExecutionRequest, component_dir: &Path) -> Option<ExecutionResult> {
    if !tokio::fs::metadata(&request.workdir).await.is_ok_and(|m| m.is_dir()) {
        return Some(ExecutionResult::local_failure(format!(
            "working directory does not exist: {}",
            request.workdir.display()
        )));
    }
    if request.component.trim().is_empty() {
        return Some(ExecutionResult::local_failure("a wrapper component is required"));
    }
    if request.outputs.is_empty() {
        return Some(ExecutionResult::local_failure("at least one output is required"));
    }
    // Outputs are passed to the engine as targets.
    if let Some(output) = request.outputs.values().into_iter().find(|o| o.path().starts_with('-')) {
        return Some(ExecutionResult::local_failure(format!(
            "output path must not start with '-': {}",
            output.path()
        )));
    }
    if !tokio::fs::metadata(component_dir).await.is_ok_and(|m| m.is_dir()) {
        return Some(ExecutionResult::local_failure(format!(
            "wrapper not found at: {}",
            component_dir.display()
        )));
    }
    None
}

/// Copy the component's environment descriptor into the workdir. Returns
/// the workdir-relative name to reference from the rule.
async fn stage_environment(
    request: &ExecutionRequest,
    component_dir: &Path,
    workdir: &Path,
) -> std::io::Result<Option<String>> {
    let source = match &request.platform.conda_env {
        Some(env) => component_dir.join(env),
        None => component_dir.join(ENVIRONMENT_FILE),
    };
    if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
        if request.platform.conda_env.is_some() {
            tracing::warn!(path = %source.display(), "declared environment descriptor is missing");
        }
        return Ok(None);
    }
    tokio::fs::copy(&source, workdir.join(STAGED_ENVIRONMENT)).await?;
    Ok(Some(STAGED_ENVIRONMENT.to_string()))
}
