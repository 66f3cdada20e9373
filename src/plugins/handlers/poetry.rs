//! Poetry projects (`[tool.poetry]`)

use super::{pep621_dependencies, pyproject_constraint_refs, toml_version_ref};
use crate::plugins::{Plugin, ProjectHandler};
use crate::project::{Dependency, Package, ProjectSource};
use crate::version::VersionRef;
use toml_edit::Item;

pub struct PoetryHandler;

const BACKEND: &str = "poetry.core.masonry.api";

impl Plugin for PoetryHandler {
  fn name(&self) -> &str {
    "poetry"
  }

  fn description(&self) -> &str {
    "Projects built with Poetry"
  }
}

impl ProjectHandler for PoetryHandler {
  fn detect(&self, source: &ProjectSource) -> bool {
    source.build_backend() == Some(BACKEND)
      || source
        .pyproject
        .as_ref()
        .is_some_and(|p| p.has_table(&["tool", "poetry"]))
  }

  fn dist_name(&self, source: &ProjectSource) -> Option<String> {
    let pyproject = source.pyproject.as_ref()?;
    pyproject
      .get_str(&["tool", "poetry", "name"])
      .or_else(|| pyproject.get_str(&["project", "name"]))
      .map(str::to_string)
  }

  fn version_ref(&self, source: &ProjectSource, project: &str) -> Option<VersionRef> {
    let pyproject = source.pyproject.as_ref()?;
    toml_version_ref(pyproject, "tool.poetry", project).or_else(|| toml_version_ref(pyproject, "project", project))
  }

  fn packages(&self, source: &ProjectSource) -> Option<Vec<Package>> {
    let pyproject = source.pyproject.as_ref()?;
    let entries = pyproject.get(&["tool", "poetry", "packages"])?.as_array()?;

    let packages: Vec<Package> = entries
      .iter()
      .filter_map(|entry| {
        let table = entry.as_inline_table()?;
        let include = table.get("include")?.as_str()?;
        let root = match table.get("from").and_then(|v| v.as_str()) {
          Some(from) => source.directory.join(from),
          None => source.directory.clone(),
        };
        let path = root.join(include);
        let module = root.join(format!("{}.py", include));
        let path = if path.is_dir() { path } else { module };
        Some(Package {
          name: include.trim_end_matches(".py").to_string(),
          path,
          root,
        })
      })
      .collect();

    (!packages.is_empty()).then_some(packages)
  }

  fn dependencies(&self, source: &ProjectSource) -> Vec<Dependency> {
    let Some(pyproject) = source.pyproject.as_ref() else {
      return Vec::new();
    };

    let mut tables: Vec<&Item> = ["dependencies", "dev-dependencies"]
      .into_iter()
      .filter_map(|key| pyproject.get(&["tool", "poetry", key]))
      .collect();
    if let Some(groups) = pyproject.get(&["tool", "poetry", "group"]).and_then(Item::as_table_like) {
      tables.extend(groups.iter().filter_map(|(_, group)| group.get("dependencies")));
    }

    let mut deps: Vec<Dependency> = tables
      .into_iter()
      .filter_map(Item::as_table_like)
      .flat_map(|table| table.iter())
      .filter(|(name, _)| *name != "python")
      .map(|(name, item)| Dependency {
        name: name.to_string(),
        constraint: poetry_constraint(item),
      })
      .collect();
    deps.extend(pep621_dependencies(pyproject));
    deps
  }

  fn interdependency_refs(&self, source: &ProjectSource, dependency: &str) -> Vec<VersionRef> {
    let Some(pyproject) = source.pyproject.as_ref() else {
      return Vec::new();
    };
    let dependent = self.dist_name(source).unwrap_or_default();
    pyproject_constraint_refs(pyproject, dependency, &dependent)
  }
}

/// `"^1.0"` or `{ version = "^1.0", ... }`; `None` for path and git dependencies
fn poetry_constraint(item: &Item) -> Option<String> {
  match item.as_str() {
    Some(constraint) => Some(constraint.to_string()),
    None => item
      .as_table_like()
      .and_then(|t| t.get("version"))
      .and_then(|v| v.as_str())
      .map(str::to_string),
  }
}
