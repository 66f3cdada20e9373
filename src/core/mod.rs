//! Core building blocks shared by every command
//!
//! - **config**: `pyrail.toml` / `[tool.pyrail]` parsing and validation
//! - **context**: application context built once per invocation
//! - **error**: error types with exit codes and help messages
//! - **host**: repository hosting services (issue and PR URLs)
//! - **vcs**: version control collaborator (system git behind a command runner)

pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod vcs;
