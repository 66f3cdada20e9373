//! Any other backend that declares a PEP 621 `[project]` table

use super::{pep621_dependencies, pyproject_constraint_refs, toml_version_ref};
use crate::plugins::{Plugin, ProjectHandler};
use crate::project::{Dependency, ProjectSource};
use crate::version::VersionRef;

pub struct Pep621Handler;

impl Plugin for Pep621Handler {
  fn name(&self) -> &str {
    "pep621"
  }

  fn description(&self) -> &str {
    "Projects with a standard [project] table (hatchling, pdm, maturin, ...)"
  }
}

impl ProjectHandler for Pep621Handler {
  fn detect(&self, source: &ProjectSource) -> bool {
    source.pyproject.as_ref().is_some_and(|p| p.has_table(&["project"]))
  }

  fn dist_name(&self, source: &ProjectSource) -> Option<String> {
    source
      .pyproject
      .as_ref()
      .and_then(|p| p.get_str(&["project", "name"]))
      .map(str::to_string)
  }

  fn version_ref(&self, source: &ProjectSource, project: &str) -> Option<VersionRef> {
    toml_version_ref(source.pyproject.as_ref()?, "project", project)
  }

  fn dependencies(&self, source: &ProjectSource) -> Vec<Dependency> {
    source.pyproject.as_ref().map(pep621_dependencies).unwrap_or_default()
  }

  fn interdependency_refs(&self, source: &ProjectSource, dependency: &str) -> Vec<VersionRef> {
    let Some(pyproject) = source.pyproject.as_ref() else {
      return Vec::new();
    };
    let dependent = self.dist_name(source).unwrap_or_default();
    pyproject_constraint_refs(pyproject, dependency, &dependent)
  }
}
