//! Version reference discovery
//!
//! For every project the reference set is assembled from, in order:
//! 1. the handler's declared version field
//! 2. release plugins (`source-code-version` contributes `__version__`)
//! 3. `release.references` patterns, each required to match exactly once
//! 4. constraints on the project written in its dependents' metadata
//!
//! Discovery is read-only and deterministic: scanning twice without a write in
//! between yields the same sequence.

use crate::core::error::RailResult;
use crate::plugins::ReleasePlugin;
use crate::project::{Project, Repository};
use crate::version::patterns::{Located, locate_one};
use crate::version::{RefCategory, VersionRef};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// A reference that could not be resolved unambiguously
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inconsistency {
  pub project: String,
  pub file: Option<PathBuf>,
  pub category: RefCategory,
  pub message: String,
}

/// References and inconsistencies contributed by one source
#[derive(Debug, Clone, Default)]
pub struct Discovered {
  pub refs: Vec<VersionRef>,
  pub inconsistencies: Vec<Inconsistency>,
}

impl Discovered {
  pub fn merge(&mut self, other: Discovered) {
    self.refs.extend(other.refs);
    self.inconsistencies.extend(other.inconsistencies);
  }
}

/// References of one project
#[derive(Debug, Clone, Serialize)]
pub struct ProjectRefs {
  pub project: String,
  pub version: Option<String>,
  pub refs: Vec<VersionRef>,
}

/// Result of scanning a set of projects, in the order they were scanned
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
  pub projects: Vec<ProjectRefs>,
  pub inconsistencies: Vec<Inconsistency>,
}

impl ScanReport {
  pub fn refs_of(&self, project: &str) -> &[VersionRef] {
    self
      .projects
      .iter()
      .find(|p| p.project == project)
      .map(|p| p.refs.as_slice())
      .unwrap_or(&[])
  }

  pub fn all_refs(&self) -> impl Iterator<Item = &VersionRef> {
    self.projects.iter().flat_map(|p| p.refs.iter())
  }

  pub fn has_inconsistencies(&self) -> bool {
    !self.inconsistencies.is_empty()
  }
}

/// Assembles reference sets for the projects of a repository
pub struct VersionScanner<'a> {
  repository: &'a Repository,
  plugins: Vec<Arc<dyn ReleasePlugin>>,
}

impl<'a> VersionScanner<'a> {
  pub fn new(repository: &'a Repository, plugins: Vec<Arc<dyn ReleasePlugin>>) -> Self {
    Self { repository, plugins }
  }

  /// Scan every project in discovery order
  pub fn scan_all(&self) -> RailResult<ScanReport> {
    let projects: Vec<&Project> = self.repository.projects().iter().collect();
    self.scan(&projects)
  }

  /// Scan the given projects; inconsistencies are aggregated, not raised
  pub fn scan(&self, projects: &[&Project]) -> RailResult<ScanReport> {
    let mut report = ScanReport::default();
    for project in projects {
      let discovered = self.scan_project(project)?;
      debug!(
        project = %project.name,
        refs = discovered.refs.len(),
        inconsistencies = discovered.inconsistencies.len(),
        "scanned"
      );
      report.projects.push(ProjectRefs {
        project: project.name.clone(),
        version: project.version.clone(),
        refs: discovered.refs,
      });
      report.inconsistencies.extend(discovered.inconsistencies);
    }
    Ok(report)
  }

  /// The ordered, duplicate-free reference set of one project
  pub fn scan_project(&self, project: &Project) -> RailResult<Discovered> {
    let mut found = Discovered::default();

    if let Some(declared) = project.handler.version_ref(&project.source, &project.name) {
      found.refs.push(declared);
    }

    for plugin in &self.plugins {
      found.merge(plugin.version_refs(project));
    }

    found.merge(configured_refs(project)?);

    if self.repository.config.release.interdependencies {
      for dependent in self.repository.dependents_of(&project.name) {
        if dependent.name == project.name {
          continue;
        }
        found.refs.extend(
          dependent
            .handler
            .interdependency_refs(&dependent.source, &project.name)
            .into_iter()
            .map(|mut r| {
              // attribute to the canonical project name
              r.project = project.name.clone();
              r
            }),
        );
      }
    }

    let mut seen: Vec<(PathBuf, usize, usize)> = Vec::new();
    found.refs.retain(|r| {
      let key = (r.file.clone(), r.start, r.end);
      if seen.contains(&key) {
        false
      } else {
        seen.push(key);
        true
      }
    });
    Ok(found)
  }
}

/// Resolve `release.references` of a project, each exactly once
fn configured_refs(project: &Project) -> RailResult<Discovered> {
  let mut found = Discovered::default();

  for reference in &project.config().release.references {
    let regex = reference.regex()?;
    let file = project.directory.join(&reference.file);
    let inconsistency = |message: String| Inconsistency {
      project: project.name.clone(),
      file: Some(file.clone()),
      category: RefCategory::Configured,
      message,
    };

    let text = match fs::read_to_string(&file) {
      Ok(text) => text,
      Err(e) => {
        found
          .inconsistencies
          .push(inconsistency(format!("cannot read file: {}", e)));
        continue;
      }
    };

    match locate_one(&regex, &text) {
      Located::One(span) => found.refs.push(VersionRef::new(
        &project.name,
        &file,
        &text,
        span,
        RefCategory::Configured,
      )),
      Located::Missing => found
        .inconsistencies
        .push(inconsistency(format!("pattern `{}` did not match", reference.pattern))),
      Located::Ambiguous(n) => found.inconsistencies.push(inconsistency(format!(
        "pattern `{}` matched {} times, expected once",
        reference.pattern, n
      ))),
    }
  }
  Ok(found)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::plugins::release::builtin_release_plugins;
  use crate::testing::{monorepo, poetry_project, registry, write};
  use tempfile::TempDir;

  fn values(refs: &[VersionRef]) -> Vec<(String, String)> {
    refs
      .iter()
      .map(|r| (r.file.file_name().unwrap().to_string_lossy().into_owned(), r.value.clone()))
      .collect()
  }

  #[test]
  fn test_project_reference_set() {
    let (_dir, repo) = monorepo();
    let scanner = VersionScanner::new(&repo, builtin_release_plugins());
    let report = scanner.scan_all().unwrap();
    assert!(!report.has_inconsistencies());

    assert_eq!(
      values(report.refs_of("pkg-a")),
      vec![
        ("pyproject.toml".to_string(), "1.2.4".to_string()),
        ("__init__.py".to_string(), "1.2.4".to_string()),
        ("pyproject.toml".to_string(), "1.2.4".to_string()),
      ]
    );
    let dependency = &report.refs_of("pkg-a")[2];
    assert!(dependency.file.starts_with(repo.root.join("b")));
    assert_eq!(
      dependency.category,
      RefCategory::Interdependency {
        dependent: "pkg-b".to_string()
      }
    );

    // pkg-b's own refs never include its constraint on pkg-a
    assert!(report.refs_of("pkg-b").iter().all(|r| r.value == "0.3.0"));
  }

  #[test]
  fn test_scan_is_idempotent() {
    let (_dir, repo) = monorepo();
    let scanner = VersionScanner::new(&repo, builtin_release_plugins());
    let first = scanner.scan_all().unwrap();
    let second = scanner.scan_all().unwrap();
    let a: Vec<&VersionRef> = first.all_refs().collect();
    let b: Vec<&VersionRef> = second.all_refs().collect();
    assert_eq!(a, b);
  }

  #[test]
  fn test_interdependencies_disabled() {
    let dir = TempDir::new().unwrap();
    poetry_project(dir.path(), "a", "pkg-a", "1.2.4", &[]);
    poetry_project(dir.path(), "b", "pkg-b", "0.3.0", &[("pkg-a", "^1.2.4")]);
    write(dir.path(), "pyrail.toml", "[release]\ninterdependencies = false\n");
    let repo = Repository::discover(dir.path(), &registry()).unwrap();

    let report = VersionScanner::new(&repo, builtin_release_plugins()).scan_all().unwrap();
    assert_eq!(report.refs_of("pkg-a").len(), 2);
  }

  #[test]
  fn test_inconsistencies_are_aggregated() {
    let dir = TempDir::new().unwrap();
    poetry_project(dir.path(), "a", "pkg-a", "1.0.0", &[]);
    write(
      dir.path(),
      "a/src/pkg_a/__init__.py",
      "__version__ = '1.0.0'\n__version__ = '1.0.1'\n",
    );
    poetry_project(dir.path(), "b", "pkg-b", "1.0.0", &[]);
    write(
      dir.path(),
      "b/pyrail.toml",
      "[release]\nreferences = [{ file = \"README.md\", pattern = \"pkg-b=={version}\" }]\n",
    );
    write(dir.path(), "b/README.md", "install with pip\n");
    let repo = Repository::discover(dir.path(), &registry()).unwrap();

    let report = VersionScanner::new(&repo, builtin_release_plugins()).scan_all().unwrap();
    assert_eq!(report.inconsistencies.len(), 2);
    assert_eq!(report.inconsistencies[0].project, "pkg-a");
    assert_eq!(report.inconsistencies[0].category, RefCategory::Source);
    assert_eq!(report.inconsistencies[1].project, "pkg-b");
    assert_eq!(report.inconsistencies[1].category, RefCategory::Configured);
    // the declared reference of each project is still found
    assert_eq!(report.refs_of("pkg-a").len(), 1);
    assert_eq!(report.refs_of("pkg-b").len(), 2);
  }

  #[test]
  fn test_configured_reference() {
    let dir = TempDir::new().unwrap();
    poetry_project(dir.path(), "", "solo", "2.0.0", &[]);
    write(
      dir.path(),
      "pyrail.toml",
      "[release]\nreferences = [{ file = \"README.md\", pattern = \"solo=={version}$\" }]\n",
    );
    write(dir.path(), "README.md", "pip install solo==2.0.0\n");
    let repo = Repository::discover(dir.path(), &registry()).unwrap();

    let report = VersionScanner::new(&repo, builtin_release_plugins()).scan_all().unwrap();
    let refs = report.refs_of("solo");
    assert_eq!(refs.len(), 3);
    assert_eq!(refs[2].category, RefCategory::Configured);
    assert_eq!(refs[2].value, "2.0.0");
  }
}
