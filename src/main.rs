use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use chartify_make::cloud::{GsutilStore, ObjectStore};
use chartify_make::config::{BinMatrix, BucketMatrix, repo_root};
use chartify_make::gobuild;
use chartify_make::host::HostPlatform;
use chartify_make::metadata::BuildMetadata;
use chartify_make::publish;
use chartify_make::runner::{CommandFailed, Runner};
use chartify_make::uploads;

/// Build and release automation for the chartify project: format, lint, vet,
/// cross-compile the binary matrix, publish artifacts to cloud storage, and
/// update the version registry.
///
/// With no verb, runs the default workflow: fmt, then install.
#[derive(Parser, Debug)]
#[command(
    name = "chartify-make",
    version,
    about,
    after_help = "Examples:\n  chartify-make fmt\n  chartify-make build\n  chartify-make build chartify\n  chartify-make push\n  chartify-make push chartify\n  chartify-make version --json"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Format the source tree (goimports, gofmt, go fmt).
    Fmt,

    /// Run golint over the source tree (advisory; never fails the run).
    Lint,

    /// Run go vet over the source tree (advisory; never fails the run).
    Vet,

    /// Print build metadata derived from the repository state.
    Version {
        /// Print the metadata as pretty JSON instead of key=value lines.
        #[arg(long)]
        json: bool,
    },

    /// Cross-compile the binary matrix. With no NAME, formats first and
    /// builds every entry; with NAME, builds that entry only.
    Build {
        /// Binary name from the matrix.
        name: Option<String>,
    },

    /// Publish build artifacts from dist/. With no NAME, publishes every
    /// binary directory and updates the version registry.
    Push {
        /// Binary name; publishes dist/NAME only.
        name: Option<String>,
    },

    /// Write the current version to the registry object.
    UpdateRegistry,

    /// Compile and install the binary for the host platform.
    Install,
}

// ---------------------------------------------------------------------------
// Workflow context
// ---------------------------------------------------------------------------

/// Everything the workflows need, built once at startup: immutable
/// configuration, build metadata, and the command runner.
struct Workspace {
    root: PathBuf,
    runner: Runner,
    matrix: BinMatrix,
    buckets: BucketMatrix,
    meta: BuildMetadata,
}

impl Workspace {
    fn open() -> Result<Self> {
        let root = repo_root();
        let meta = BuildMetadata::collect(&root)?;
        Ok(Workspace {
            runner: Runner::new(&root),
            matrix: BinMatrix::chartify(),
            buckets: BucketMatrix::chartify(),
            meta,
            root,
        })
    }

    /// Bucket URL for the current version (release -> prod, else dev).
    fn bucket_url(&self) -> &str {
        let env = BucketMatrix::env_for_version(self.meta.version());
        self.buckets.url(env)
    }

    fn dist_root(&self) -> PathBuf {
        self.root.join("dist")
    }
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

/// Format the source tree. goimports failures are fatal; the remaining
/// formatters are best-effort, matching the original workflow.
fn run_fmt(ws: &Workspace) -> Result<()> {
    ws.runner.run_fatal("goimports -w pkg main.go")?;
    warn_on_failure(ws.runner.run("gofmt -w main.go"), "gofmt");
    warn_on_failure(ws.runner.run("go fmt ./pkg/..."), "go fmt");
    Ok(())
}

/// Lint is advisory: findings are reported, the run always succeeds.
fn run_lint(ws: &Workspace) -> Result<()> {
    warn_on_failure(ws.runner.run("golint ./pkg/... main.go"), "golint");
    Ok(())
}

/// Vet is advisory: findings are reported, the run always succeeds.
fn run_vet(ws: &Workspace) -> Result<()> {
    warn_on_failure(ws.runner.run("go vet ./pkg/..."), "go vet");
    Ok(())
}

fn run_version(ws: &Workspace, json: bool) -> Result<()> {
    if json {
        println!("{}", ws.meta.to_json()?);
    } else {
        for line in ws.meta.to_lines() {
            println!("{}", line);
        }
    }
    Ok(())
}

/// Build the whole matrix (after formatting) or one named entry.
fn run_build(ws: &Workspace, name: Option<&str>) -> Result<()> {
    let host = HostPlatform::detect();

    let jobs = match name {
        Some(name) => {
            let entry = ws
                .matrix
                .get(name)
                .ok_or_else(|| anyhow::anyhow!("unknown binary: {}", name))?;
            gobuild::plan_entry(entry, &host)
        }
        None => {
            run_fmt(ws)?;
            gobuild::plan(&ws.matrix, &host)
        }
    };

    gobuild::run_jobs(&jobs, &ws.runner, &ws.meta)?;
    eprintln!("[chartify-make] built {} artifact(s)", jobs.len());
    Ok(())
}

/// Publish dist/ artifacts. A full push also updates the version registry
/// and prints the recent upload summary.
fn run_push(ws: &Workspace, name: Option<&str>) -> Result<()> {
    let bucket = ws.bucket_url();
    let store = GsutilStore::new(&ws.runner, bucket);
    let dist = ws.dist_root();

    let uploaded = match name {
        Some(name) => publish::push_one(&dist, name, &ws.runner, &store, bucket, &ws.meta)?,
        None => {
            let uploaded = publish::push_all(&dist, &ws.runner, &store, bucket, &ws.meta)?;
            run_update_registry(ws)?;
            uploaded
        }
    };

    eprintln!(
        "[chartify-make] pushed {} file(s) to {} as version {}",
        uploaded,
        bucket,
        ws.meta.version()
    );

    match uploads::summary_last_7d() {
        Ok(summary) => {
            eprintln!(
                "[chartify-make] {} upload(s) recorded in the last 7 days",
                summary.uploads_last_7d
            );
            if let Some(last) = summary.last {
                eprintln!(
                    "[chartify-make] most recent: {} {} ({})",
                    last.binary, last.file, last.status
                );
            }
        }
        Err(e) => {
            eprintln!("[chartify-make] warning: could not read upload log: {}", e);
        }
    }

    Ok(())
}

/// Record the current version as latest for every matrix entry.
fn run_update_registry(ws: &Workspace) -> Result<()> {
    let bucket = ws.bucket_url();
    let store = GsutilStore::new(&ws.runner, bucket);
    let version = ws.meta.version();

    for entry in ws.matrix.entries() {
        store.update_registry(&entry.name, version)?;
        eprintln!(
            "[chartify-make] registry updated: {} -> {}",
            entry.name, version
        );
    }
    Ok(())
}

/// Install the binary for the host platform. The GO15VENDOREXPERIMENT
/// prefix keeps the legacy vendoring toolchain path working; `$GOC` lets
/// the operator point at an alternate go compiler.
fn run_install(ws: &Workspace) -> Result<()> {
    ws.runner
        .run_fatal(&format!("GO15VENDOREXPERIMENT=1 {} install .", goc()))
}

/// Default workflow: fmt, then install. Both fatal.
fn run_default(ws: &Workspace) -> Result<()> {
    run_fmt(ws)?;
    run_install(ws)
}

/// The go compiler to use: `$GOC` when set, plain `go` otherwise.
fn goc() -> String {
    match std::env::var("GOC") {
        Ok(goc) if !goc.is_empty() => goc,
        _ => "go".to_string(),
    }
}

/// Report a non-zero status for an advisory command without failing the run.
fn warn_on_failure(result: Result<i32>, what: &str) {
    match result {
        Ok(0) => {}
        Ok(status) => {
            eprintln!("[chartify-make] warning: {} exited {}", what, status);
        }
        Err(e) => {
            eprintln!("[chartify-make] warning: {} failed to run: {}", what, e);
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();

    let ws = match Workspace::open() {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("[chartify-make] error: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Command::Fmt) => run_fmt(&ws),
        Some(Command::Lint) => run_lint(&ws),
        Some(Command::Vet) => run_vet(&ws),
        Some(Command::Version { json }) => run_version(&ws, json),
        Some(Command::Build { name }) => run_build(&ws, name.as_deref()),
        Some(Command::Push { name }) => run_push(&ws, name.as_deref()),
        Some(Command::UpdateRegistry) => run_update_registry(&ws),
        Some(Command::Install) => run_install(&ws),
        None => run_default(&ws),
    };

    if let Err(e) = result {
        eprintln!("[chartify-make] error: {}", e);
        // A failed external command terminates the run with its own status.
        let status = match e.downcast_ref::<CommandFailed>() {
            Some(failed) => failed.status,
            None => 1,
        };
        process::exit(status);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
