//! Python projects and the repository that owns them
//!
//! A [`Project`] is an immutable snapshot of one directory's build metadata,
//! read through the first [`ProjectHandler`](crate::plugins::ProjectHandler)
//! that recognises it. A [`Repository`] owns the ordered set of projects.

pub mod packages;
pub mod pyproject;
pub mod repository;

pub use packages::Package;
pub use pyproject::{Pyproject, SetupCfg};
pub use repository::Repository;

use crate::core::config::PyrailConfig;
use crate::core::error::{RailError, RailResult};
use crate::plugins::{PluginRegistry, ProjectHandler};
use crate::version::patterns::{DUNDER_VERSION, Located, locate_one};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::str::FromStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Raw metadata files of a project directory
#[derive(Debug, Clone)]
pub struct ProjectSource {
  pub directory: PathBuf,
  pub pyproject: Option<Pyproject>,
  pub setup_cfg: Option<SetupCfg>,
  pub config: PyrailConfig,
}

impl ProjectSource {
  pub fn read(directory: &Path) -> RailResult<Self> {
    Ok(Self {
      directory: directory.to_path_buf(),
      pyproject: Pyproject::read(directory)?,
      setup_cfg: SetupCfg::read(directory)?,
      config: PyrailConfig::load(directory)?,
    })
  }

  /// Whether any build metadata file exists
  pub fn has_metadata(&self) -> bool {
    self.pyproject.is_some() || self.setup_cfg.is_some() || self.directory.join("setup.py").is_file()
  }

  pub fn build_backend(&self) -> Option<&str> {
    self.pyproject.as_ref().and_then(|p| p.build_backend())
  }
}

/// A requirement as declared in project metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
  pub name: String,
  /// Constraint text, `None` for path or unconstrained dependencies
  pub constraint: Option<String>,
}

impl Dependency {
  /// Name and version specifiers of a PEP 508 string such as
  /// `pkg-a[cli] >=1.2; python_version>'3.8'`. Invalid requirements are skipped.
  pub fn parse_pep508(requirement: &str) -> Option<Self> {
    let requirement = match pep508_rs::Requirement::from_str(requirement.trim()) {
      Ok(requirement) => requirement,
      Err(e) => {
        debug!(requirement, error = %e, "skipping invalid requirement");
        return None;
      }
    };
    let constraint = match requirement.version_or_url.as_ref() {
      Some(pep508_rs::VersionOrUrl::VersionSpecifier(specifiers)) => Some(specifiers.to_string()),
      _ => None,
    };
    Some(Self {
      name: requirement.name.to_string(),
      constraint: constraint.filter(|c| !c.is_empty()),
    })
  }
}

/// PEP 503 normalised distribution name
pub fn normalize_name(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  let mut last_sep = false;
  for ch in name.chars() {
    if matches!(ch, '-' | '_' | '.') {
      if !last_sep {
        out.push('-');
      }
      last_sep = true;
    } else {
      out.push(ch.to_ascii_lowercase());
      last_sep = false;
    }
  }
  out
}

/// One Python project
pub struct Project {
  pub name: String,
  pub directory: PathBuf,
  pub handler: Arc<dyn ProjectHandler>,
  /// Declared version, absent when versioning is deferred to the repository
  pub version: Option<String>,
  pub packages: Vec<Package>,
  pub dependencies: Vec<Dependency>,
  /// Dependency project name -> constraint text as written here
  pub interdependencies: Vec<(String, String)>,
  pub source: ProjectSource,
}

impl fmt::Debug for Project {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Project")
      .field("name", &self.name)
      .field("directory", &self.directory)
      .field("handler", &self.handler.name())
      .field("version", &self.version)
      .finish()
  }
}

impl Project {
  /// Read the project at `directory`; `Ok(None)` when no handler recognises it
  pub fn load(directory: &Path, registry: &PluginRegistry) -> RailResult<Option<Self>> {
    let source = ProjectSource::read(directory)?;
    if !source.has_metadata() {
      return Ok(None);
    }

    let handler = match &source.config.project.handler {
      Some(forced) => {
        let handler = registry.handler(forced).ok_or_else(|| {
          RailError::config(format!(
            "project.handler '{}' in {} is not a registered project handler",
            forced,
            directory.display()
          ))
        })?;
        if !handler.detect(&source) {
          return Err(RailError::config(format!(
            "project handler '{}' does not recognise {}",
            forced,
            directory.display()
          )));
        }
        handler
      }
      None => match registry.handlers().iter().find(|h| h.detect(&source)) {
        Some(handler) => handler.clone(),
        None => {
          debug!(dir = %directory.display(), "no project handler matched");
          return Ok(None);
        }
      },
    };

    let name = handler.dist_name(&source).unwrap_or_else(|| {
      directory
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
    });

    let packages = handler.packages(&source).unwrap_or_else(|| {
      packages::detect_packages(directory, source.config.project.source_directory.as_deref(), &name)
    });

    let mut version = handler.version_ref(&source, &name).map(|r| r.value);
    if version.is_none() && source.pyproject.as_ref().is_some_and(|p| p.is_dynamic("version")) {
      version = primary_package(&packages, &name).and_then(source_version);
    }

    let dependencies = handler.dependencies(&source);
    debug!(project = %name, handler = handler.name(), version = ?version, "loaded project");

    Ok(Some(Self {
      name,
      directory: directory.to_path_buf(),
      handler,
      version,
      packages,
      dependencies,
      interdependencies: Vec::new(),
      source,
    }))
  }

  pub fn config(&self) -> &PyrailConfig {
    &self.source.config
  }

  /// The package whose `__version__` tracks the project version
  pub fn primary_package(&self) -> Option<&Package> {
    primary_package(&self.packages, &self.name)
  }

  pub fn changelog_directory(&self) -> PathBuf {
    self.directory.join(&self.config().changelog.directory)
  }

  /// Constraint this project places on `dependency`, if any
  pub fn constraint_on(&self, dependency: &str) -> Option<&str> {
    let wanted = normalize_name(dependency);
    self
      .interdependencies
      .iter()
      .find(|(name, _)| normalize_name(name) == wanted)
      .map(|(_, c)| c.as_str())
  }
}

fn primary_package<'a>(packages: &'a [Package], dist_name: &str) -> Option<&'a Package> {
  let module = packages::module_name(dist_name);
  packages.iter().find(|p| p.name == module).or_else(|| packages.first())
}

fn source_version(package: &Package) -> Option<String> {
  package.version_candidates().into_iter().find_map(|file| {
    let text = fs::read_to_string(&file).ok()?;
    match locate_one(&DUNDER_VERSION, &text) {
      Located::One(span) => Some(text[span].to_string()),
      _ => None,
    }
  })
}
