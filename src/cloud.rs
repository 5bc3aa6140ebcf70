//! Cloud object store collaborator.
//!
//! One external collaborator with two operations: uploading an artifact and
//! updating the version registry. Both are implemented by shelling out to
//! `gsutil` through the runner; the trait seam exists so the publisher can
//! be exercised in tests without a network.

use anyhow::Result;
use std::path::Path;

use crate::runner::{Runner, shell_quote};

/// The remote store artifacts are published to.
pub trait ObjectStore {
    /// Upload a local file to `key` under the store's bucket.
    fn upload(&self, local: &Path, key: &str) -> Result<()>;

    /// Record `version` as the latest release of `name` in the registry.
    fn update_registry(&self, name: &str, version: &str) -> Result<()>;
}

/// `gsutil`-backed store targeting one bucket URL (e.g. `gs://appscode-dev`).
pub struct GsutilStore<'a> {
    runner: &'a Runner,
    bucket_url: String,
}

impl<'a> GsutilStore<'a> {
    pub fn new(runner: &'a Runner, bucket_url: impl Into<String>) -> Self {
        GsutilStore {
            runner,
            bucket_url: bucket_url.into(),
        }
    }

    /// Object key for a published artifact.
    pub fn artifact_key(name: &str, version: &str, file: &str) -> String {
        format!("binaries/{}/{}/{}", name, version, file)
    }

    /// Render the `gsutil cp` command for an upload. The local path is
    /// shell-quoted: artifact paths can contain spaces or quotes.
    fn upload_command(&self, local: &Path, key: &str) -> String {
        format!(
            "gsutil cp {} {}/{}",
            shell_quote(&local.to_string_lossy()),
            self.bucket_url,
            key
        )
    }

    fn registry_command(&self, name: &str, version: &str) -> String {
        format!(
            "echo {} | gsutil cp - {}/binaries/{}/latest.txt",
            shell_quote(version),
            self.bucket_url,
            name
        )
    }
}

impl ObjectStore for GsutilStore<'_> {
    fn upload(&self, local: &Path, key: &str) -> Result<()> {
        self.runner.run_fatal(&self.upload_command(local, key))
    }

    fn update_registry(&self, name: &str, version: &str) -> Result<()> {
        self.runner.run_fatal(&self.registry_command(name, version))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
