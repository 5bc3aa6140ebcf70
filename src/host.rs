//! Host platform detection: map the Rust target triple to GOOS/GOARCH.
//!
//! `build.rs` re-exports Cargo's `TARGET` so the binary knows the triple it
//! was compiled for (e.g., "x86_64-unknown-linux-gnu"). Matrix entries that
//! declare no distro map build once for the host, so the triple has to be
//! translated into the Go toolchain's platform names.

/// The compile-time target triple emitted by build.rs.
pub const TARGET: &str = env!("TARGET");

/// Host platform in Go toolchain naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    pub goos: String,
    pub goarch: String,
}

impl HostPlatform {
    /// Detect the host platform from the compile-time target triple.
    ///
    /// Falls back to `std::env::consts` when the triple contains no
    /// recognized segment (e.g., an unusual vendor-specific target).
    pub fn detect() -> Self {
        let goos = goos_from_triple(TARGET)
            .or_else(|| goos_from_rust_os(std::env::consts::OS))
            .unwrap_or("linux");
        let goarch = goarch_from_triple(TARGET)
            .or_else(|| goarch_from_rust_arch(std::env::consts::ARCH))
            .unwrap_or("amd64");
        HostPlatform {
            goos: goos.to_string(),
            goarch: goarch.to_string(),
        }
    }
}

/// Extract the GOOS name from a target triple, if any segment is recognized.
pub fn goos_from_triple(triple: &str) -> Option<&'static str> {
    for segment in triple.split('-') {
        let goos = match segment {
            "darwin" | "apple" => "darwin",
            "linux" => "linux",
            "windows" => "windows",
            "freebsd" => "freebsd",
            "netbsd" => "netbsd",
            _ => continue,
        };
        return Some(goos);
    }
    None
}

/// Extract the GOARCH name from a target triple's leading architecture segment.
pub fn goarch_from_triple(triple: &str) -> Option<&'static str> {
    let arch = triple.split('-').next()?;
    goarch_from_rust_arch(arch)
}

fn goos_from_rust_os(os: &str) -> Option<&'static str> {
    match os {
        "macos" => Some("darwin"),
        "linux" => Some("linux"),
        "windows" => Some("windows"),
        "freebsd" => Some("freebsd"),
        "netbsd" => Some("netbsd"),
        _ => None,
    }
}

fn goarch_from_rust_arch(arch: &str) -> Option<&'static str> {
    match arch {
        "x86_64" => Some("amd64"),
        "i686" | "i586" | "x86" => Some("386"),
        "aarch64" => Some("arm64"),
        a if a.starts_with("arm") => Some("arm"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
