//! Repository discovery and the inter-dependency graph
//!
//! The repository root is found by walking up from the working directory
//! (see [`find_root`]). The root may itself be a project. Child projects are
//! its immediate subdirectories, or the directories matched by
//! `repository.include`. Discovery order is the root first, then directory
//! names in sorted order.

use crate::core::config::PyrailConfig;
use crate::core::error::{ConfigError, RailError, RailResult};
use crate::plugins::PluginRegistry;
use crate::project::{Project, normalize_name};
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Files that mark a directory as holding a Python project or pyrail config
const MARKERS: &[&str] = &["pyrail.toml", ".pyrail.toml", "pyproject.toml", "setup.cfg", "setup.py"];

/// Repository root for a command started in `start`.
///
/// Walks up to `toplevel` (the git work tree root) and keeps the highest
/// directory that holds a marker file itself or in an immediate subdirectory.
/// Outside a work tree the start directory is the root.
pub fn find_root(start: &Path, toplevel: Option<&Path>) -> PathBuf {
  let Some(toplevel) = toplevel.filter(|t| t.is_absolute() && start.starts_with(t)) else {
    return start.to_path_buf();
  };

  let mut root = start.to_path_buf();
  for dir in start.ancestors() {
    if has_marker(dir) || child_dirs(dir).iter().any(|child| has_marker(child)) {
      root = dir.to_path_buf();
    }
    if dir == toplevel {
      break;
    }
  }
  debug!(start = %start.display(), root = %root.display(), "repository root");
  root
}

fn has_marker(dir: &Path) -> bool {
  MARKERS.iter().any(|m| dir.join(m).is_file())
}

/// Non-hidden subdirectories, sorted
fn child_dirs(dir: &Path) -> Vec<PathBuf> {
  let Ok(entries) = fs::read_dir(dir) else {
    return Vec::new();
  };
  let mut children: Vec<PathBuf> = entries
    .filter_map(|e| e.ok())
    .map(|e| e.path())
    .filter(|p| p.is_dir())
    .filter(|p| {
      p.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| !n.starts_with('.'))
    })
    .collect();
  children.sort();
  children
}

/// A root directory and the projects below it
pub struct Repository {
  pub root: PathBuf,
  pub config: PyrailConfig,
  projects: Vec<Project>,
}

impl Repository {
  /// Discover all projects under `root`
  pub fn discover(root: &Path, registry: &PluginRegistry) -> RailResult<Self> {
    let config = PyrailConfig::load(root)?;

    let mut projects: Vec<Project> = Vec::new();
    for dir in candidate_dirs(root, &config)? {
      let Some(project) = Project::load(&dir, registry)? else {
        continue;
      };
      if let Some(existing) = projects
        .iter()
        .find(|p| normalize_name(&p.name) == normalize_name(&project.name))
      {
        return Err(RailError::Config(ConfigError::DuplicateProject {
          name: project.name.clone(),
          first: existing.directory.clone(),
          second: project.directory.clone(),
        }));
      }
      projects.push(project);
    }

    if projects.is_empty() {
      return Err(RailError::Config(ConfigError::NoProjects {
        root: root.to_path_buf(),
      }));
    }

    if config.release.interdependencies {
      link_interdependencies(&mut projects);
    }
    info!(root = %root.display(), projects = projects.len(), "repository discovered");

    Ok(Self {
      root: root.to_path_buf(),
      config,
      projects,
    })
  }

  /// Projects in discovery order
  pub fn projects(&self) -> &[Project] {
    &self.projects
  }

  pub fn project(&self, name: &str) -> Option<&Project> {
    let wanted = normalize_name(name);
    self.projects.iter().find(|p| normalize_name(&p.name) == wanted)
  }

  /// Whether more than one project lives here
  pub fn is_monorepo(&self) -> bool {
    self.projects.len() > 1
  }

  /// Projects that declare a dependency on `name`
  pub fn dependents_of(&self, name: &str) -> Vec<&Project> {
    self
      .projects
      .iter()
      .filter(|p| p.constraint_on(name).is_some())
      .collect()
  }

  /// The innermost project containing `dir`, or the only project
  pub fn project_for(&self, dir: &Path) -> Option<&Project> {
    self
      .projects
      .iter()
      .filter(|p| dir.starts_with(&p.directory))
      .max_by_key(|p| p.directory.components().count())
      .or_else(|| if self.projects.len() == 1 { self.projects.first() } else { None })
  }

  fn graph(&self) -> DiGraph<usize, ()> {
    let mut graph = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..self.projects.len()).map(|i| graph.add_node(i)).collect();

    for (dependent, project) in self.projects.iter().enumerate() {
      for (dependency, _) in &project.interdependencies {
        if let Some(index) = self
          .projects
          .iter()
          .position(|p| normalize_name(&p.name) == normalize_name(dependency))
        {
          // dependency -> dependent, so dependencies sort first
          graph.add_edge(nodes[index], nodes[dependent], ());
        }
      }
    }
    graph
  }

  /// Projects with dependencies before their dependents.
  ///
  /// # Errors
  /// A cycle in the inter-dependency graph is a configuration error.
  pub fn topological_order(&self) -> RailResult<Vec<&Project>> {
    let graph = self.graph();
    let order = algo::toposort(&graph, None).map_err(|_| {
      let projects = self.find_cycles().into_iter().next().unwrap_or_default();
      RailError::Config(ConfigError::DependencyCycle { projects })
    })?;
    Ok(order.into_iter().map(|idx| &self.projects[graph[idx]]).collect())
  }

  /// Strongly connected components with more than one project
  pub fn find_cycles(&self) -> Vec<Vec<String>> {
    let graph = self.graph();
    algo::tarjan_scc(&graph)
      .into_iter()
      .filter(|component| component.len() > 1)
      .map(|component| {
        let mut names: Vec<String> = component
          .into_iter()
          .map(|idx| self.projects[graph[idx]].name.clone())
          .collect();
        names.sort();
        names
      })
      .collect()
  }
}

fn candidate_dirs(root: &Path, config: &PyrailConfig) -> RailResult<Vec<PathBuf>> {
  let mut dirs = vec![root.to_path_buf()];

  match &config.repository.include {
    Some(patterns) => {
      for pattern in patterns {
        let full = root.join(pattern);
        let mut matched: Vec<PathBuf> = glob::glob(&full.to_string_lossy())?
          .filter_map(|entry| entry.ok())
          .filter(|p| p.is_dir())
          .collect();
        matched.sort();
        debug!(pattern = %pattern, matches = matched.len(), "repository.include");
        dirs.extend(matched);
      }
    }
    None => dirs.extend(child_dirs(root)),
  }

  let mut seen: Vec<PathBuf> = Vec::new();
  dirs.retain(|d| {
    if seen.contains(d) {
      false
    } else {
      seen.push(d.clone());
      true
    }
  });
  Ok(dirs)
}

/// Record, for every project, the constraints it places on sibling projects
fn link_interdependencies(projects: &mut [Project]) {
  let names: Vec<String> = projects.iter().map(|p| p.name.clone()).collect();

  for project in projects.iter_mut() {
    let own = normalize_name(&project.name);
    let mut links: Vec<(String, String)> = Vec::new();
    for dep in &project.dependencies {
      let wanted = normalize_name(&dep.name);
      if wanted == own {
        continue;
      }
      let Some(target) = names.iter().find(|n| normalize_name(n) == wanted) else {
        continue;
      };
      // the same sibling may appear in several groups; the first one wins
      if links.iter().any(|(name, _)| name == target) {
        continue;
      }
      links.push((target.clone(), dep.constraint.clone().unwrap_or_else(|| "*".to_string())));
    }
    project.interdependencies = links;
  }
}
