//! Static build/release configuration.
//!
//! Two immutable tables drive the whole tool: the binary matrix (which
//! binaries exist and which OS/architecture pairs they ship for) and the
//! bucket matrix (which storage bucket each deployment environment uses).
//! Both are constructed once at startup and passed explicitly into the
//! workflows — there is deliberately no mutable global state.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Build kind of a binary matrix entry. Only Go binaries exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinKind {
    Go,
}

/// One binary's build configuration.
#[derive(Debug, Clone)]
pub struct BinaryEntry {
    /// Binary name; also the `dist/<name>/` output subdirectory.
    pub name: String,
    pub kind: BinKind,
    /// Compilation entry point handed to the compiler.
    pub entrypoint: String,
    /// Stamp version metadata into the binary via linker flags.
    pub stamp_version: bool,
    /// Supported platforms, GOOS -> GOARCH list. `None` means "host only".
    pub distro: Option<BTreeMap<String, Vec<String>>>,
}

/// The binary matrix: every binary this repository produces.
#[derive(Debug, Clone)]
pub struct BinMatrix {
    entries: Vec<BinaryEntry>,
}

impl BinMatrix {
    pub fn new(entries: Vec<BinaryEntry>) -> Self {
        BinMatrix { entries }
    }

    /// The chartify project's matrix: one Go binary, three OSes.
    pub fn chartify() -> Self {
        let mut distro = BTreeMap::new();
        distro.insert("darwin".to_string(), vec!["386".into(), "amd64".into()]);
        distro.insert(
            "linux".to_string(),
            vec!["arm".into(), "386".into(), "amd64".into()],
        );
        distro.insert("windows".to_string(), vec!["386".into(), "amd64".into()]);

        BinMatrix::new(vec![BinaryEntry {
            name: "chartify".to_string(),
            kind: BinKind::Go,
            entrypoint: "main.go".to_string(),
            stamp_version: true,
            distro: Some(distro),
        }])
    }

    pub fn entries(&self) -> &[BinaryEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&BinaryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// Deployment environment a release publishes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketEnv {
    Prod,
    Dev,
}

/// The bucket matrix: environment name -> storage location URL.
#[derive(Debug, Clone)]
pub struct BucketMatrix {
    prod: String,
    dev: String,
}

impl BucketMatrix {
    pub fn new(prod: impl Into<String>, dev: impl Into<String>) -> Self {
        BucketMatrix {
            prod: prod.into(),
            dev: dev.into(),
        }
    }

    /// The chartify project's buckets.
    pub fn chartify() -> Self {
        BucketMatrix::new("gs://appscode-cdn", "gs://appscode-dev")
    }

    pub fn url(&self, env: BucketEnv) -> &str {
        match env {
            BucketEnv::Prod => &self.prod,
            BucketEnv::Dev => &self.dev,
        }
    }

    /// Pick the environment for a version string: clean `X.Y.Z` releases go
    /// to prod, everything else (dirty, untagged, hash-suffixed) to dev.
    pub fn env_for_version(version: &str) -> BucketEnv {
        if is_release_version(version) {
            BucketEnv::Prod
        } else {
            BucketEnv::Dev
        }
    }
}

/// Whether a version string is a clean `X.Y.Z` release (optional `v` prefix).
pub fn is_release_version(version: &str) -> bool {
    let v = version.strip_prefix('v').unwrap_or(version);
    let parts: Vec<&str> = v.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

/// Resolve the repository root the tool operates on.
///
/// Honors the original GOPATH workspace layout when `GOPATH` is set;
/// otherwise the current directory is the repository.
pub fn repo_root() -> PathBuf {
    match std::env::var("GOPATH") {
        Ok(gopath) if !gopath.is_empty() => {
            PathBuf::from(gopath).join("src/github.com/appscode/chartify")
        }
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_chartify_matrix_shape() {
        let matrix = BinMatrix::chartify();
        assert_eq!(matrix.entries().len(), 1);

        let entry = matrix.get("chartify").expect("chartify entry");
        assert_eq!(entry.kind, BinKind::Go);
        assert!(entry.stamp_version);

        let distro = entry.distro.as_ref().expect("distro map");
        assert_eq!(distro["darwin"], vec!["386", "amd64"]);
        assert_eq!(distro["linux"], vec!["arm", "386", "amd64"]);
        assert_eq!(distro["windows"], vec!["386", "amd64"]);
    }

    #[test]
    fn test_matrix_get_unknown_name() {
        let matrix = BinMatrix::chartify();
        assert!(matrix.get("frobnicate").is_none());
    }

    #[test]
    fn test_bucket_urls() {
        let buckets = BucketMatrix::chartify();
        assert_eq!(buckets.url(BucketEnv::Prod), "gs://appscode-cdn");
        assert_eq!(buckets.url(BucketEnv::Dev), "gs://appscode-dev");
    }

    #[test]
    fn test_is_release_version() {
        assert!(is_release_version("1.2.3"));
        assert!(is_release_version("v0.1.0"));
        assert!(!is_release_version("1.2"));
        assert!(!is_release_version("1.2.3-dirty"));
        assert!(!is_release_version("0.1.0-4-gdeadbee"));
        assert!(!is_release_version("deadbeef"));
        assert!(!is_release_version(""));
    }

    #[test]
    fn test_env_for_version() {
        assert_eq!(BucketMatrix::env_for_version("1.2.3"), BucketEnv::Prod);
        assert_eq!(BucketMatrix::env_for_version("1.2.3-dirty"), BucketEnv::Dev);
    }

    #[test]
    #[serial]
    fn test_repo_root_honors_gopath() {
        let original = std::env::var("GOPATH").ok();
        unsafe { std::env::set_var("GOPATH", "/go") };
        assert_eq!(
            repo_root(),
            PathBuf::from("/go/src/github.com/appscode/chartify")
        );
        unsafe {
            match original {
                Some(v) => std::env::set_var("GOPATH", v),
                None => std::env::remove_var("GOPATH"),
            }
        }
    }

    #[test]
    #[serial]
    fn test_repo_root_defaults_to_cwd() {
        let original = std::env::var("GOPATH").ok();
        unsafe { std::env::remove_var("GOPATH") };
        let root = repo_root();
        assert_eq!(root, std::env::current_dir().unwrap());
        unsafe {
            if let Some(v) = original {
                std::env::set_var("GOPATH", v);
            }
        }
    }
}
