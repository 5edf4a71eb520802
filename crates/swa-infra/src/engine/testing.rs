//! Fake engine and registry helpers for driver scenarios.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use swa_core::repository::process::{ProcessHandle, ProcessRegistry};
use swa_types::job::JobId;

use super::command::EngineCommand;
use crate::memory::InMemoryProcessRegistry;

/// Touch every positional target inside `--directory`.
pub const TOUCH_TARGETS: &str = r#"cd "$dir" || exit 1
for t in $targets; do
  mkdir -p "$(dirname "$t")"
  touch "$t"
done"#;

/// Written to a file and run as `sh <script>`. Arguments are appended to
/// `<script>.args`, one invocation per line; `--unlock` exits 0 at once.
/// The body sees `$dir`, `$config` and `$targets`.
fn script(body: &str) -> String {
    format!(
        r#"printf '%s\n' "$*" >> "$0.args"
dir=.
config=""
targets=""
while [ $# -gt 0 ]; do
  case "$1" in
    --unlock) exit 0 ;;
    --directory) dir="$2"; shift 2 ;;
    --configfile) config="$2"; shift 2 ;;
    --snakefile|--cores|--conda-prefix|--profile|--default-storage-prefix|--scheduler) shift 2 ;;
    --*) shift ;;
    *) targets="$targets $1"; shift ;;
  esac
done
{body}
"#
    )
}

pub struct FakeEngine {
    pub script: PathBuf,
}

impl FakeEngine {
    pub fn new(dir: &Path, body: &str) -> Self {
        let script_path = dir.join("fake-engine.sh");
        std::fs::write(&script_path, script(body)).unwrap();
        Self { script: script_path }
    }

    pub fn command(&self) -> EngineCommand {
        EngineCommand::new("sh").arg(&self.script)
    }

    /// Recorded invocations, one argument string per call.
    pub fn invocations(&self) -> Vec<String> {
        let mut path = self.script.clone().into_os_string();
        path.push(".args");
        std::fs::read_to_string(PathBuf::from(path))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Registry that counts registrations per process lifetime.
#[derive(Default)]
pub struct CountingRegistry {
    inner: InMemoryProcessRegistry,
    registrations: AtomicUsize,
}

impl CountingRegistry {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }
}

impl ProcessRegistry for CountingRegistry {
    fn register(&self, job_id: JobId, handle: ProcessHandle) {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        self.inner.register(job_id, handle);
    }

    fn unregister(&self, job_id: &JobId) -> Option<ProcessHandle> {
        self.inner.unregister(job_id)
    }

    fn lookup(&self, job_id: &JobId) -> Option<ProcessHandle> {
        self.inner.lookup(job_id)
    }
}
