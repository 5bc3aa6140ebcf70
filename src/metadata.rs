//! Build metadata derived from repository state.
//!
//! Computed once at process start by shelling out to `git`, read-only
//! afterwards. The mapping labels published artifacts (the `version` key)
//! and gets stamped into built binaries via linker flags.

use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::host::HostPlatform;

/// Immutable string-to-string build metadata.
#[derive(Debug, Clone)]
pub struct BuildMetadata {
    values: BTreeMap<String, String>,
}

impl BuildMetadata {
    /// Collect metadata from the repository at `root`.
    ///
    /// Fails when `root` is not a git repository — every workflow that
    /// labels artifacts needs a real version to work with.
    pub fn collect(root: &Path) -> Result<Self> {
        let mut values = BTreeMap::new();

        let version = git_output(root, &["describe", "--tags", "--always", "--dirty"])
            .context("failed to derive version from git")?;
        values.insert("version".to_string(), version);

        values.insert(
            "git_sha".to_string(),
            git_output(root, &["rev-parse", "HEAD"])?,
        );
        values.insert(
            "git_branch".to_string(),
            git_output(root, &["rev-parse", "--abbrev-ref", "HEAD"])?,
        );

        // HEAD may not be exactly on a tag; that is not an error.
        if let Ok(tag) = git_output(root, &["describe", "--exact-match", "--tags"]) {
            values.insert("git_tag".to_string(), tag);
        }

        values.insert(
            "commit_timestamp".to_string(),
            git_output(root, &["log", "-1", "--format=%cI"])?,
        );

        let now = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("failed to format build timestamp")?;
        values.insert("build_timestamp".to_string(), now);

        let host = HostPlatform::detect();
        values.insert("build_host_os".to_string(), host.goos);
        values.insert("build_host_arch".to_string(), host.goarch);

        Ok(BuildMetadata { values })
    }

    /// Construct from known values. Used by tests and the version workflow.
    pub fn from_values(values: BTreeMap<String, String>) -> Self {
        BuildMetadata { values }
    }

    /// The version string labeling this build.
    pub fn version(&self) -> &str {
        self.values
            .get("version")
            .map(String::as_str)
            .unwrap_or("unknown")
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Sorted `key=value` lines, one per entry.
    pub fn to_lines(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }

    /// Pretty-printed JSON rendering of the whole mapping.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.values).context("failed to serialize metadata")
    }
}

/// Run a git command rooted at `root` and return its stdout, trimmed.
///
/// Returns an error if the command exits non-zero.
fn git_output(root: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(args)
        .output()
        .context("failed to execute git")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "git {} failed (exit {}): {}",
            args.join(" "),
            output.status,
            stderr.trim()
        );
    }

    let stdout = String::from_utf8(output.stdout).context("git output was not valid UTF-8")?;
    Ok(stdout.trim().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
