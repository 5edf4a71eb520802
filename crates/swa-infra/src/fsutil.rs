//! Working-directory helpers shared by the drivers and the HTTP layer.
//!
//! Tree copies run on the blocking pool via `spawn_blocking`.

use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

const JOB_WORKDIR_PREFIX: &str = "swa-job-";

/// Last bytes of a log returned as `stderr` on workflow failure.
pub const LOG_TAIL_BYTES: u64 = 16 * 1024;

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

fn join_error(e: tokio::task::JoinError) -> io::Error {
    io::Error::other(format!("blocking task failed: {e}"))
}

/// Copy `src` into `dst` recursively. Symlinks are recreated as symlinks
/// (their targets are not followed); `dst` is created if missing.
pub fn copy_tree_blocking(src: &Path, dst: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(rel);
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            let link = std::fs::read_link(entry.path())?;
            symlink(&link, &target)?;
        } else if file_type.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

pub async fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    let (src, dst) = (src.to_path_buf(), dst.to_path_buf());
    tokio::task::spawn_blocking(move || copy_tree_blocking(&src, &dst))
        .await
        .map_err(join_error)?
}

/// Create a fresh `swa-job-*` directory under the system temp dir, seeded
/// with a copy of `src` when given.
///
/// The directory is kept after return: it belongs to the job, which may
/// outlive the request that created it. The server never removes it; like
/// the in-memory job record it lives until the process exits and is left to
/// the system temp reaper.
pub async fn prepare_job_workdir(src: Option<&Path>) -> io::Result<PathBuf> {
    let src = src.map(Path::to_path_buf);
    tokio::task::spawn_blocking(move || {
        let dir = tempfile::Builder::new().prefix(JOB_WORKDIR_PREFIX).tempdir()?.keep();
        if let Some(src) = src {
            copy_tree_blocking(&src, &dir)?;
        }
        Ok(dir)
    })
    .await
    .map_err(join_error)?
}

/// Populate `dst` with symlinks to every top-level entry of `src`.
/// Entries already present in `dst` are left alone.
pub async fn link_entries(src: &Path, dst: &Path) -> io::Result<()> {
    tokio::fs::create_dir_all(dst).await?;
    let src = std::path::absolute(src)?;
    let mut entries = tokio::fs::read_dir(&src).await?;
    while let Some(entry) = entries.next_entry().await? {
        let link = dst.join(entry.file_name());
        if tokio::fs::symlink_metadata(&link).await.is_ok() {
            continue;
        }
        symlink(&entry.path(), &link)?;
    }
    Ok(())
}

/// Read at most the last `max_bytes` of a file, lossily decoded.
pub async fn tail_file(path: &Path, max_bytes: u64) -> io::Result<String> {
    use tokio::io::{AsyncReadExt, AsyncSeekExt};

    let mut file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    let start = len.saturating_sub(max_bytes);
    file.seek(io::SeekFrom::Start(start)).await?;
    let mut buf = Vec::with_capacity((len - start) as usize);
    file.read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
