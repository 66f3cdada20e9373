//! `pyrail info` - show discovered projects

use crate::core::context::AppContext;
use crate::core::error::RailResult;
use crate::plugins::{Plugin, PluginGroup};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
struct ProjectInfo {
  name: String,
  directory: PathBuf,
  handler: String,
  version: Option<String>,
  packages: Vec<String>,
  /// `(dependency, constraint)` on other projects of the repository
  interdependencies: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
struct RepositoryInfo {
  root: PathBuf,
  host: Option<String>,
  monorepo: bool,
  projects: Vec<ProjectInfo>,
  plugins: Vec<(String, Vec<String>)>,
}

fn collect(ctx: &AppContext) -> RepositoryInfo {
  let projects = ctx
    .repository
    .projects()
    .iter()
    .map(|p| ProjectInfo {
      name: p.name.clone(),
      directory: pathdiff::diff_paths(&p.directory, &ctx.root).unwrap_or_else(|| p.directory.clone()),
      handler: p.handler.name().to_string(),
      version: p.version.clone(),
      packages: p.packages.iter().map(|pkg| pkg.name.clone()).collect(),
      interdependencies: p.interdependencies.clone(),
    })
    .collect();

  let plugins = PluginGroup::ALL
    .iter()
    .map(|group| (group.as_str().to_string(), ctx.registry.names(group.as_str())))
    .collect();

  RepositoryInfo {
    root: ctx.root.clone(),
    host: ctx.host().map(|h| h.name().to_string()),
    monorepo: ctx.repository.is_monorepo(),
    projects,
    plugins,
  }
}

/// Run the info command
pub fn run_info(ctx: &AppContext, json: bool) -> RailResult<()> {
  let info = collect(ctx);
  if json {
    println!("{}", serde_json::to_string_pretty(&info)?);
    return Ok(());
  }

  println!("📂 {}", info.root.display());
  if let Some(host) = &info.host {
    println!("   host: {}", host);
  }
  println!();
  for project in &info.projects {
    println!(
      "📦 {} {} ({})",
      project.name,
      project.version.as_deref().unwrap_or("<no version>"),
      project.handler
    );
    println!("   directory: {}", project.directory.display());
    if !project.packages.is_empty() {
      println!("   packages:  {}", project.packages.join(", "));
    }
    for (dependency, constraint) in &project.interdependencies {
      println!("   ⬆  {} {}", dependency, constraint);
    }
  }
  println!();
  for (group, names) in &info.plugins {
    println!("🔌 {}: {}", group, names.join(", "));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::vcs::runner::fake::FakeRunner;
  use crate::testing::monorepo;
  use std::sync::Arc;

  #[test]
  fn test_collect() {
    let (dir, _) = monorepo();
    let ctx = AppContext::build(dir.path(), Arc::new(FakeRunner::new().fail("--show-toplevel", "fatal"))).unwrap();
    let info = collect(&ctx);

    assert!(info.monorepo);
    let b = info.projects.iter().find(|p| p.name == "pkg-b").unwrap();
    assert_eq!(b.handler, "poetry");
    assert_eq!(b.interdependencies, vec![("pkg-a".to_string(), "^1.2.4".to_string())]);
    assert!(info.plugins.iter().any(|(g, names)| g == "version-rules" && names.contains(&"minor".to_string())));
  }
}
