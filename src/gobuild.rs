//! Build matrix expansion and compiler invocation.
//!
//! Planning is pure: the matrix is expanded into a list of [`BuildJob`]s,
//! one per (binary, GOOS, GOARCH) pair, before anything runs. Execution
//! shells out to `go build` through the runner, one job at a time, and
//! aborts the remaining jobs on the first failure — a partial `dist/` tree
//! must not look like a finished release.

use anyhow::Result;

use crate::config::{BinKind, BinMatrix, BinaryEntry};
use crate::host::HostPlatform;
use crate::metadata::BuildMetadata;
use crate::runner::Runner;

/// One planned compiler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildJob {
    pub name: String,
    pub goos: String,
    pub goarch: String,
    pub entrypoint: String,
    pub stamp_version: bool,
}

impl BuildJob {
    /// Artifact file name: `<name>-<goos>-<goarch>`, `.exe` on windows.
    pub fn artifact_name(&self) -> String {
        let mut artifact = format!("{}-{}-{}", self.name, self.goos, self.goarch);
        if self.goos == "windows" {
            artifact.push_str(".exe");
        }
        artifact
    }

    /// Output path relative to the repository root.
    pub fn output_path(&self) -> String {
        format!("dist/{}/{}", self.name, self.artifact_name())
    }

    /// Render the full `go build` command for this job.
    pub fn command(&self, meta: &BuildMetadata) -> String {
        let mut cmd = format!(
            "GOOS={} GOARCH={} go build -o {}",
            self.goos,
            self.goarch,
            self.output_path()
        );
        if self.stamp_version {
            cmd.push_str(&format!(
                " -ldflags '-X main.Version={} -X main.GitSHA={}'",
                meta.version(),
                meta.get("git_sha").unwrap_or("unknown")
            ));
        }
        cmd.push(' ');
        cmd.push_str(&self.entrypoint);
        cmd
    }
}

/// Expand one matrix entry into its build jobs.
///
/// Entries with a distro map get one job per declared (OS, arch) pair;
/// entries without one get exactly one job for the host platform.
pub fn plan_entry(entry: &BinaryEntry, host: &HostPlatform) -> Vec<BuildJob> {
    match entry.kind {
        BinKind::Go => {}
    }

    let job = |goos: &str, goarch: &str| BuildJob {
        name: entry.name.clone(),
        goos: goos.to_string(),
        goarch: goarch.to_string(),
        entrypoint: entry.entrypoint.clone(),
        stamp_version: entry.stamp_version,
    };

    match &entry.distro {
        Some(distro) => distro
            .iter()
            .flat_map(|(goos, archs)| archs.iter().map(move |goarch| job(goos, goarch)))
            .collect(),
        None => vec![job(&host.goos, &host.goarch)],
    }
}

/// Expand the whole matrix.
pub fn plan(matrix: &BinMatrix, host: &HostPlatform) -> Vec<BuildJob> {
    matrix
        .entries()
        .iter()
        .flat_map(|entry| plan_entry(entry, host))
        .collect()
}

/// Execute the planned jobs in order, stopping at the first failure.
pub fn run_jobs(jobs: &[BuildJob], runner: &Runner, meta: &BuildMetadata) -> Result<()> {
    for job in jobs {
        eprintln!(
            "[chartify-make] building {} for {}/{}",
            job.name, job.goos, job.goarch
        );
        runner.run_fatal(&job.command(meta))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
