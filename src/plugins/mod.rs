//! Plugin capabilities
//!
//! Four capability groups, each behind one trait:
//! - `project-handlers`: [`ProjectHandler`] (Poetry, Flit, Setuptools, PEP 621)
//! - `check-plugins`: [`CheckPlugin`]
//! - `release-plugins`: [`ReleasePlugin`]
//! - `version-rules`: [`VersionRule`]
//!
//! The [`PluginRegistry`] owns one ordered list per group.

pub mod checks;
pub mod handlers;
pub mod registry;
pub mod release;

pub use checks::{CheckContext, CheckResult, Severity};
pub use registry::{PluginGroup, PluginRegistry, PluginRegistryBuilder};

use crate::core::error::RailResult;
use crate::project::{Dependency, Package, Project, ProjectSource};
use crate::version::scan::Discovered;
use crate::version::{Version, VersionRef};
use chrono::NaiveDate;
use std::path::PathBuf;

/// Common surface of every plugin
pub trait Plugin: Send + Sync {
  /// Unique name within its group (kebab-case)
  fn name(&self) -> &str;

  fn description(&self) -> &str;

  /// Opt-in plugins only load when listed in `plugins.enable`
  fn enabled_by_default(&self) -> bool {
    true
  }
}

/// Build-backend specific access to project metadata
pub trait ProjectHandler: Plugin {
  /// Whether this handler understands the directory
  fn detect(&self, source: &ProjectSource) -> bool;

  /// Distribution name
  fn dist_name(&self, source: &ProjectSource) -> Option<String>;

  /// Location of the declared version, `None` when the metadata has none
  fn version_ref(&self, source: &ProjectSource, project: &str) -> Option<VersionRef>;

  /// Explicitly configured packages; `None` falls back to detection
  fn packages(&self, _source: &ProjectSource) -> Option<Vec<Package>> {
    None
  }

  /// Run-time dependencies
  fn dependencies(&self, source: &ProjectSource) -> Vec<Dependency>;

  /// Constraints on `dependency` written in this project's own metadata,
  /// attributed to the project `dependency`
  fn interdependency_refs(&self, source: &ProjectSource, dependency: &str) -> Vec<VersionRef>;
}

/// Validates projects or the repository as a whole
pub trait CheckPlugin: Plugin {
  fn check_project(&self, _project: &Project, _ctx: &CheckContext) -> RailResult<Vec<CheckResult>> {
    Ok(Vec::new())
  }

  fn check_repository(&self, _ctx: &CheckContext) -> RailResult<Vec<CheckResult>> {
    Ok(Vec::new())
  }
}

/// Inputs shared by release plugins during a release
pub struct ReleaseContext {
  pub today: NaiveDate,
  pub dry: bool,
}

/// Contributes version references and takes part in releases
pub trait ReleasePlugin: Plugin {
  /// Extra references for `project`
  fn version_refs(&self, _project: &Project) -> Discovered {
    Discovered::default()
  }

  /// Perform release side effects for `project` at `version`; returns touched files
  fn create_release(&self, _project: &Project, _version: &str, _ctx: &ReleaseContext) -> RailResult<Vec<PathBuf>> {
    Ok(Vec::new())
  }
}

/// Computes the next version
pub trait VersionRule: Plugin {
  fn apply(&self, current: &Version) -> RailResult<Version>;
}
