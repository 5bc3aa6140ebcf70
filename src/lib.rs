//! Library entrypoint for chartify-make.
//!
//! The primary interface is the `chartify-make` binary. This lib target
//! exists to expose internal modules to integration tests.

pub mod cloud;
pub mod config;
pub mod gobuild;
pub mod host;
pub mod metadata;
pub mod publish;
pub mod runner;
pub mod uploads;
