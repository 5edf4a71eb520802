//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST
//! API. `JobService` is generic over the job repository; AppState pins it to
//! the in-memory store.

use std::path::PathBuf;
use std::sync::Arc;

use swa_core::job::JobService;
use swa_core::storage::BoxObjectStore;
use swa_infra::engine::{EngineCommand, WorkflowDriver, WrapperDriver};
use swa_infra::filesystem::DataLayout;
use swa_infra::memory::{InMemoryJobStore, InMemoryProcessRegistry};
use swa_infra::metadata::MetadataCache;
use swa_infra::storage::S3ObjectStore;
use swa_types::config::ServerConfig;

pub type ConcreteJobService = JobService<InMemoryJobStore>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub jobs: Arc<ConcreteJobService>,
    pub wrapper_driver: Arc<WrapperDriver>,
    pub workflow_driver: Arc<WorkflowDriver>,
    pub metadata: Arc<MetadataCache>,
}

/// Wrapper repository root: configured path or `<data_dir>/snakemake-wrappers`.
pub fn wrappers_root(config: &ServerConfig, layout: &DataLayout) -> PathBuf {
    config
        .wrappers_path
        .clone()
        .unwrap_or_else(|| layout.root().join("snakemake-wrappers"))
}

/// Workflows root: configured path or `<data_dir>/workflows`.
pub fn workflows_root(config: &ServerConfig, layout: &DataLayout) -> PathBuf {
    config
        .workflows_dir
        .clone()
        .unwrap_or_else(|| layout.root().join("workflows"))
}

pub fn wrapper_driver(config: &ServerConfig, layout: &DataLayout) -> WrapperDriver {
    WrapperDriver::new(
        EngineCommand::new(&config.engine.program),
        wrappers_root(config, layout),
        layout.conda_prefix(),
    )
    .with_conda(config.engine.use_conda)
}

impl AppState {
    /// Initialize the application state: create the data directories, wire
    /// the drivers and the S3 client used for prefill.
    pub async fn init(config: ServerConfig, data_dir: PathBuf) -> anyhow::Result<Self> {
        let layout = DataLayout::new(data_dir, &config);
        for dir in [layout.cache_dir(), layout.log_dir(), layout.runs_dir()] {
            tokio::fs::create_dir_all(&dir).await?;
        }

        let store = S3ObjectStore::from_config(&config.storage).await;
        let mut workflow_driver = WorkflowDriver::new(
            EngineCommand::new(&config.engine.program),
            workflows_root(&config, &layout),
            layout.runs_dir(),
            layout.log_dir(),
        )
        .with_store(Arc::new(BoxObjectStore::new(store)));
        if let Some(dir) = &config.workflow.profiles_dir {
            workflow_driver = workflow_driver.with_profiles_dir(dir);
        }

        let wrapper_driver = wrapper_driver(&config, &layout);
        tracing::debug!(
            data_dir = %layout.root().display(),
            wrappers = %wrapper_driver.wrappers_root().display(),
            workflows = %workflow_driver.workflows_dir().display(),
            "application state initialized"
        );
        Ok(Self::from_parts(config, &layout, wrapper_driver, workflow_driver))
    }

    /// Assemble state from prebuilt drivers.
    pub fn from_parts(
        config: ServerConfig,
        layout: &DataLayout,
        wrapper_driver: WrapperDriver,
        workflow_driver: WorkflowDriver,
    ) -> Self {
        let jobs = JobService::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(InMemoryProcessRegistry::new()),
            config.max_concurrent_jobs,
        );
        Self {
            metadata: Arc::new(MetadataCache::new(layout.cache_dir())),
            config: Arc::new(config),
            jobs: Arc::new(jobs),
            wrapper_driver: Arc::new(wrapper_driver),
            workflow_driver: Arc::new(workflow_driver),
        }
    }
}
