//! Check plugins and the result model they share
//!
//! # Built-in checks
//!
//! - **general**: packages are detected, `py.typed` matches `project.typed`
//! - **release**: `__version__` exists, all version references agree
//! - **changelog**: every changelog bucket validates
//! - **repository**: the inter-dependency graph is acyclic

mod changelog;
mod general;
mod release;
mod repository;

pub use changelog::ChangelogCheck;
pub use general::GeneralCheck;
pub use release::ReleaseCheck;
pub use repository::RepositoryCheck;

use crate::core::error::RailResult;
use crate::plugins::{CheckPlugin, PluginRegistry, ReleasePlugin};
use crate::project::Repository;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub fn builtin_checks() -> Vec<Arc<dyn CheckPlugin>> {
  vec![
    Arc::new(GeneralCheck),
    Arc::new(ReleaseCheck),
    Arc::new(ChangelogCheck),
    Arc::new(RepositoryCheck),
  ]
}

/// Severity level for check results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
  /// Informational message (not an issue)
  Info,
  /// Warning (non-blocking, but should be addressed)
  Warning,
  /// Error (blocking, must be fixed)
  Error,
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Severity::Info => write!(f, "INFO"),
      Severity::Warning => write!(f, "WARN"),
      Severity::Error => write!(f, "ERROR"),
    }
  }
}

/// Result of running a check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
  /// `<plugin>:<check>`
  pub check_name: String,
  /// Project the result applies to, `None` for repository checks
  #[serde(skip_serializing_if = "Option::is_none")]
  pub project: Option<String>,
  pub passed: bool,
  pub severity: Severity,
  pub message: String,
  pub suggestion: Option<String>,
  /// Additional metadata (for JSON output)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<serde_json::Value>,
}

impl CheckResult {
  fn new(check_name: impl Into<String>, passed: bool, severity: Severity, message: impl Into<String>) -> Self {
    Self {
      check_name: check_name.into(),
      project: None,
      passed,
      severity,
      message: message.into(),
      suggestion: None,
      details: None,
    }
  }

  pub fn pass(check_name: impl Into<String>, message: impl Into<String>) -> Self {
    Self::new(check_name, true, Severity::Info, message)
  }

  pub fn error(check_name: impl Into<String>, message: impl Into<String>, suggestion: Option<impl Into<String>>) -> Self {
    Self {
      suggestion: suggestion.map(Into::into),
      ..Self::new(check_name, false, Severity::Error, message)
    }
  }

  pub fn warning(
    check_name: impl Into<String>,
    message: impl Into<String>,
    suggestion: Option<impl Into<String>>,
  ) -> Self {
    Self {
      suggestion: suggestion.map(Into::into),
      ..Self::new(check_name, false, Severity::Warning, message)
    }
  }

  pub fn for_project(mut self, project: &str) -> Self {
    self.project = Some(project.to_string());
    self
  }

  pub fn with_details(mut self, details: serde_json::Value) -> Self {
    self.details = Some(details);
    self
  }

  /// Failed with error severity
  pub fn is_blocking(&self) -> bool {
    !self.passed && self.severity == Severity::Error
  }
}

/// What checks get to look at
pub struct CheckContext<'a> {
  pub repository: &'a Repository,
  /// Release plugins used to discover version references
  pub release_plugins: Vec<Arc<dyn ReleasePlugin>>,
}

impl<'a> CheckContext<'a> {
  pub fn new(repository: &'a Repository, registry: &PluginRegistry) -> RailResult<Self> {
    Ok(Self {
      repository,
      release_plugins: registry.select_release_plugins(&repository.config.release.plugins)?,
    })
  }
}

/// Run every enabled check plugin: repository checks first, then each project
pub fn run_all(registry: &PluginRegistry, ctx: &CheckContext) -> RailResult<Vec<CheckResult>> {
  let mut results = Vec::new();
  for plugin in registry.checks() {
    results.extend(plugin.check_repository(ctx)?);
  }
  for project in ctx.repository.projects() {
    for plugin in registry.checks() {
      let found = plugin.check_project(project, ctx)?;
      results.extend(found.into_iter().map(|r| r.for_project(&project.name)));
    }
  }
  debug!(results = results.len(), "checks finished");
  Ok(results)
}
