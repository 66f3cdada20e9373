//! Setuptools projects (`setup.cfg`, optionally with a PEP 621 table)

use super::{
  pep621_dependencies, pyproject_constraint_refs, setup_cfg_constraint_refs, setup_cfg_version_ref, toml_version_ref,
};
use crate::plugins::{Plugin, ProjectHandler};
use crate::project::{Dependency, ProjectSource};
use crate::version::VersionRef;

pub struct SetuptoolsHandler;

impl Plugin for SetuptoolsHandler {
  fn name(&self) -> &str {
    "setuptools"
  }

  fn description(&self) -> &str {
    "Projects built with setuptools (setup.cfg or pyproject.toml)"
  }
}

impl ProjectHandler for SetuptoolsHandler {
  fn detect(&self, source: &ProjectSource) -> bool {
    match source.build_backend() {
      Some(backend) => backend.starts_with("setuptools"),
      None => source.setup_cfg.is_some() || source.directory.join("setup.py").is_file(),
    }
  }

  fn dist_name(&self, source: &ProjectSource) -> Option<String> {
    source
      .pyproject
      .as_ref()
      .and_then(|p| p.get_str(&["project", "name"]))
      .or_else(|| source.setup_cfg.as_ref().and_then(|c| c.get("metadata", "name")))
      .map(str::to_string)
  }

  fn version_ref(&self, source: &ProjectSource, project: &str) -> Option<VersionRef> {
    source
      .pyproject
      .as_ref()
      .and_then(|p| toml_version_ref(p, "project", project))
      .or_else(|| source.setup_cfg.as_ref().and_then(|c| setup_cfg_version_ref(c, project)))
  }

  fn dependencies(&self, source: &ProjectSource) -> Vec<Dependency> {
    if let Some(pyproject) = &source.pyproject
      && (pyproject.get(&["project", "dependencies"]).is_some()
        || pyproject.get(&["project", "optional-dependencies"]).is_some())
    {
      return pep621_dependencies(pyproject);
    }
    source
      .setup_cfg
      .as_ref()
      .map(|cfg| {
        let mut requirements = cfg.get_list("options", "install_requires");
        requirements.extend(cfg.section_lists("options.extras_require"));
        requirements.iter().filter_map(|r| Dependency::parse_pep508(r)).collect()
      })
      .unwrap_or_default()
  }

  fn interdependency_refs(&self, source: &ProjectSource, dependency: &str) -> Vec<VersionRef> {
    let dependent = self.dist_name(source).unwrap_or_default();
    let mut refs = Vec::new();
    if let Some(pyproject) = &source.pyproject {
      refs.extend(pyproject_constraint_refs(pyproject, dependency, &dependent));
    }
    if let Some(cfg) = &source.setup_cfg {
      refs.extend(setup_cfg_constraint_refs(cfg, dependency, &dependent));
    }
    refs
  }
}
