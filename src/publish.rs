//! Artifact publisher: walk `dist/` and upload build outputs.
//!
//! Each immediate subdirectory of the distribution root is one binary's
//! output directory. Publishing a directory first removes checksum
//! side-files (`*.md5`, `*.sha1` — their absence is success), then uploads
//! every remaining regular file, tagged with the binary name and the
//! current version. Directories are never uploaded.
//!
//! Checksum cleanup is best-effort; a failed upload aborts the publish.
//! Every attempt is recorded in the upload audit log before an error
//! propagates, so the operator keeps a transcript of partial pushes.

use anyhow::{Context, Result, bail};
use std::path::Path;

use crate::cloud::{GsutilStore, ObjectStore};
use crate::metadata::BuildMetadata;
use crate::runner::Runner;
use crate::uploads;

/// Publish every immediate subdirectory of `dist_root`.
///
/// Returns the number of files uploaded.
pub fn push_all(
    dist_root: &Path,
    runner: &Runner,
    store: &dyn ObjectStore,
    bucket: &str,
    meta: &BuildMetadata,
) -> Result<usize> {
    let entries = std::fs::read_dir(dist_root)
        .with_context(|| format!("failed to read dist root {}", dist_root.display()))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();

    let mut uploaded = 0;
    for dir in &dirs {
        uploaded += publish_dir(dir, runner, store, bucket, meta)?;
    }
    Ok(uploaded)
}

/// Publish exactly one binary's output directory, `dist_root/<name>`.
pub fn push_one(
    dist_root: &Path,
    name: &str,
    runner: &Runner,
    store: &dyn ObjectStore,
    bucket: &str,
    meta: &BuildMetadata,
) -> Result<usize> {
    let dir = dist_root.join(name);
    if !dir.is_dir() {
        bail!("no build output directory at {}", dir.display());
    }
    publish_dir(&dir, runner, store, bucket, meta)
}

/// Per-directory publish routine: checksum cleanup, then upload every
/// regular file.
fn publish_dir(
    dir: &Path,
    runner: &Runner,
    store: &dyn ObjectStore,
    bucket: &str,
    meta: &BuildMetadata,
) -> Result<usize> {
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("unusable directory name: {}", dir.display()))?;

    clean_checksums(dir, runner);

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?
    {
        let entry = entry?;
        // Only regular files are ever uploaded, never directories.
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let version = meta.version();
    let mut uploaded = 0;
    for path in &files {
        let file = match path.file_name().and_then(|n| n.to_str()) {
            Some(f) => f.to_string(),
            None => continue,
        };
        let key = GsutilStore::artifact_key(&name, version, &file);

        eprintln!("[chartify-make] uploading {} -> {}/{}", file, bucket, key);
        let result = store.upload(path, &key);
        let error = result.as_ref().err().map(|e| e.to_string());
        if let Err(e) =
            uploads::record_upload(&name, &file, version, bucket, result.is_ok(), error.as_deref())
        {
            eprintln!("[chartify-make] warning: failed to record upload event: {}", e);
        }
        result?;
        uploaded += 1;
    }

    Ok(uploaded)
}

/// Remove checksum side-files in `dir`. `rm -f` treats absence as success,
/// and any other failure here is not worth aborting the publish over.
fn clean_checksums(dir: &Path, runner: &Runner) {
    for pattern in ["rm -f *.md5", "rm -f *.sha1"] {
        match runner.run_in(pattern, dir) {
            Ok(0) => {}
            Ok(status) => {
                eprintln!(
                    "[chartify-make] warning: checksum cleanup exited {} in {}",
                    status,
                    dir.display()
                );
            }
            Err(e) => {
                eprintln!("[chartify-make] warning: checksum cleanup failed: {}", e);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
