//! Component identifiers and their on-disk locations.

use std::path::{Component, Path, PathBuf};

/// Namespace marker older definitions put in front of component paths.
pub const LEGACY_PREFIX: &str = "master/";

pub fn strip_legacy_prefix(component: &str) -> &str {
    component.strip_prefix(LEGACY_PREFIX).unwrap_or(component)
}

/// Lexically normalize a path: drop `.` segments and fold `..` into the
/// preceding segment. Does not touch the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for part in path.components() {
        match part {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Where `component` lives under `root`.
pub fn resolve(root: &Path, component: &str) -> PathBuf {
    normalize(&root.join(strip_legacy_prefix(component).trim_matches('/')))
}

/// Whether two component locations name the same directory.
pub fn same_location(a: &Path, b: &Path) -> bool {
    normalize(a) == normalize(b)
}

/// Component identifier of `dir` relative to `root` (`/`-separated).
pub fn relative_id(root: &Path, dir: &Path) -> Option<String> {
    let rel = normalize(dir);
    let rel = rel.strip_prefix(normalize(root)).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}
