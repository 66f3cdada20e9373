//! Built-in project handlers and the metadata helpers they share
//!
//! Priority order: Poetry, Flit, Setuptools, then any PEP 621 `[project]`
//! table. The first handler whose `detect` succeeds owns the directory.

mod flit;
mod pep621;
mod poetry;
mod setuptools;

pub use flit::FlitHandler;
pub use pep621::Pep621Handler;
pub use poetry::PoetryHandler;
pub use setuptools::SetuptoolsHandler;

use crate::plugins::ProjectHandler;
use crate::project::{Dependency, Pyproject, SetupCfg};
use crate::version::patterns::{
  INI_VERSION_KEY, TOML_VERSION_KEY, locate_in_section, pyproject_dependency_patterns, setup_cfg_dependency_pattern,
  version_spans,
};
use crate::version::{RefCategory, VersionRef};
use std::sync::Arc;
use toml_edit::Item;

pub fn builtin_handlers() -> Vec<Arc<dyn ProjectHandler>> {
  vec![
    Arc::new(PoetryHandler),
    Arc::new(FlitHandler),
    Arc::new(SetuptoolsHandler),
    Arc::new(Pep621Handler),
  ]
}

/// `version = "..."` directly inside `[table]` of a pyproject
fn toml_version_ref(pyproject: &Pyproject, table: &str, project: &str) -> Option<VersionRef> {
  let section = pyproject.table_range(table)?;
  let span = locate_in_section(&TOML_VERSION_KEY, &pyproject.text, section)?;
  Some(VersionRef::new(
    project,
    &pyproject.path,
    &pyproject.text,
    span,
    RefCategory::Declared,
  ))
}

/// `version = ...` in the `[metadata]` section of setup.cfg
fn setup_cfg_version_ref(cfg: &SetupCfg, project: &str) -> Option<VersionRef> {
  let section = cfg.section_range("metadata")?;
  let span = locate_in_section(&INI_VERSION_KEY, &cfg.text, section)?;
  // `attr:` / `file:` directives are indirections, not versions
  if cfg.text[span.clone()].contains(':') {
    return None;
  }
  Some(VersionRef::new(project, &cfg.path, &cfg.text, span, RefCategory::Declared))
}

/// PEP 508 strings of `[project] dependencies`, its optional extras and
/// the `[dependency-groups]` table
fn pep621_dependencies(pyproject: &Pyproject) -> Vec<Dependency> {
  let mut requirements = pyproject.get_str_array(&["project", "dependencies"]);
  for keys in [&["project", "optional-dependencies"][..], &["dependency-groups"][..]] {
    let Some(table) = pyproject.get(keys).and_then(Item::as_table_like) else {
      continue;
    };
    for (_, item) in table.iter() {
      // `{ include-group = "..." }` members are not requirements
      let strings = item.as_array().into_iter().flatten().filter_map(|v| v.as_str());
      requirements.extend(strings.map(str::to_string));
    }
  }
  requirements.iter().filter_map(|r| Dependency::parse_pep508(r)).collect()
}

/// Constraints on `dependency` anywhere in a pyproject
fn pyproject_constraint_refs(pyproject: &Pyproject, dependency: &str, dependent: &str) -> Vec<VersionRef> {
  let patterns = pyproject_dependency_patterns(dependency);
  version_spans(&patterns, &pyproject.text)
    .into_iter()
    .map(|span| {
      VersionRef::new(
        dependency,
        &pyproject.path,
        &pyproject.text,
        span,
        RefCategory::Interdependency {
          dependent: dependent.to_string(),
        },
      )
    })
    .collect()
}

/// Constraints on `dependency` in setup.cfg requirement lists
fn setup_cfg_constraint_refs(cfg: &SetupCfg, dependency: &str, dependent: &str) -> Vec<VersionRef> {
  let Some(pattern) = setup_cfg_dependency_pattern(dependency) else {
    return Vec::new();
  };
  version_spans(std::slice::from_ref(&pattern), &cfg.text)
    .into_iter()
    .map(|span| {
      VersionRef::new(
        dependency,
        &cfg.path,
        &cfg.text,
        span,
        RefCategory::Interdependency {
          dependent: dependent.to_string(),
        },
      )
    })
    .collect()
}
