//! Flit projects (`flit_core.buildapi`)

use super::{pep621_dependencies, pyproject_constraint_refs, toml_version_ref};
use crate::plugins::{Plugin, ProjectHandler};
use crate::project::{Dependency, ProjectSource};
use crate::version::VersionRef;
use toml_edit::Item;

pub struct FlitHandler;

impl Plugin for FlitHandler {
  fn name(&self) -> &str {
    "flit"
  }

  fn description(&self) -> &str {
    "Projects built with Flit"
  }
}

impl ProjectHandler for FlitHandler {
  fn detect(&self, source: &ProjectSource) -> bool {
    matches!(source.build_backend(), Some("flit_core.buildapi" | "flit.buildapi"))
      || source
        .pyproject
        .as_ref()
        .is_some_and(|p| p.has_table(&["tool", "flit", "metadata"]))
  }

  fn dist_name(&self, source: &ProjectSource) -> Option<String> {
    let pyproject = source.pyproject.as_ref()?;
    pyproject
      .get_str(&["project", "name"])
      .or_else(|| pyproject.get_str(&["tool", "flit", "metadata", "dist-name"]))
      .or_else(|| pyproject.get_str(&["tool", "flit", "metadata", "module"]))
      .map(str::to_string)
  }

  /// Only a static `[project] version`; dynamic versions live in the module
  fn version_ref(&self, source: &ProjectSource, project: &str) -> Option<VersionRef> {
    toml_version_ref(source.pyproject.as_ref()?, "project", project)
  }

  fn dependencies(&self, source: &ProjectSource) -> Vec<Dependency> {
    let Some(pyproject) = source.pyproject.as_ref() else {
      return Vec::new();
    };
    if pyproject.has_table(&["project"]) {
      return pep621_dependencies(pyproject);
    }
    let mut requirements = pyproject.get_str_array(&["tool", "flit", "metadata", "requires"]);
    if let Some(extras) = pyproject
      .get(&["tool", "flit", "metadata", "requires-extra"])
      .and_then(Item::as_table_like)
    {
      for (extra, _) in extras.iter() {
        requirements.extend(pyproject.get_str_array(&["tool", "flit", "metadata", "requires-extra", extra]));
      }
    }
    requirements.iter().filter_map(|r| Dependency::parse_pep508(r)).collect()
  }

  fn interdependency_refs(&self, source: &ProjectSource, dependency: &str) -> Vec<VersionRef> {
    let Some(pyproject) = source.pyproject.as_ref() else {
      return Vec::new();
    };
    let dependent = self.dist_name(source).unwrap_or_default();
    pyproject_constraint_refs(pyproject, dependency, &dependent)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::config::PyrailConfig;
  use crate::project::Pyproject;
  use std::fs;
  use tempfile::TempDir;

  #[test]
  fn test_dynamic_version_has_no_declared_ref() {
    let dir = TempDir::new().unwrap();
    fs::write(
      dir.path().join("pyproject.toml"),
      r#"[build-system]
requires = ["flit_core >=3.2,<4"]
build-backend = "flit_core.buildapi"

[project]
name = "pkg-c"
dynamic = ["version", "description"]
dependencies = ["pkg-a >=1.2.4"]
"#,
    )
    .unwrap();
    let source = ProjectSource {
      directory: dir.path().to_path_buf(),
      pyproject: Pyproject::read(dir.path()).unwrap(),
      setup_cfg: None,
      config: PyrailConfig::default(),
    };

    assert!(FlitHandler.detect(&source));
    assert!(FlitHandler.version_ref(&source, "pkg-c").is_none());
    let deps = FlitHandler.dependencies(&source);
    assert_eq!(deps[0].name, "pkg-a");
    assert_eq!(deps[0].constraint.as_deref(), Some(">=1.2.4"));

    let refs = FlitHandler.interdependency_refs(&source, "pkg-a");
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].value, "1.2.4");
  }

  #[test]
  fn test_legacy_metadata_extras() {
    let dir = TempDir::new().unwrap();
    fs::write(
      dir.path().join("pyproject.toml"),
      r#"[build-system]
build-backend = "flit_core.buildapi"

[tool.flit.metadata]
module = "pkg_c"
requires = ["requests"]

[tool.flit.metadata.requires-extra]
test = ["pkg-a ==1.2.4"]
"#,
    )
    .unwrap();
    let source = ProjectSource {
      directory: dir.path().to_path_buf(),
      pyproject: Pyproject::read(dir.path()).unwrap(),
      setup_cfg: None,
      config: PyrailConfig::default(),
    };

    let deps = FlitHandler.dependencies(&source);
    let names: Vec<_> = deps.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["requests", "pkg-a"]);
    assert_eq!(deps[1].constraint.as_deref(), Some("==1.2.4"));
  }
}
