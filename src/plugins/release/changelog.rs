use crate::changelog::ChangelogManager;
use crate::core::error::RailResult;
use crate::plugins::{Plugin, ReleaseContext, ReleasePlugin};
use crate::project::Project;
use std::path::PathBuf;
use tracing::info;

/// Moves `_unreleased.toml` to `<version>.toml` on release
pub struct ChangelogReleasePlugin;

impl Plugin for ChangelogReleasePlugin {
  fn name(&self) -> &str {
    "changelog"
  }

  fn description(&self) -> &str {
    "Stage the unreleased changelog as the new version"
  }
}

impl ReleasePlugin for ChangelogReleasePlugin {
  fn create_release(&self, project: &Project, version: &str, ctx: &ReleaseContext) -> RailResult<Vec<PathBuf>> {
    let config = &project.config().changelog;
    if !config.enabled {
      return Ok(Vec::new());
    }
    let manager = ChangelogManager::for_project(project);
    let unreleased = manager.unreleased();
    if !unreleased.exists() {
      return Ok(Vec::new());
    }

    let target = manager.version(version);
    if ctx.dry {
      info!(project = %project.name, to = %target.path.display(), "would release changelog");
      return Ok(vec![unreleased.path, target.path]);
    }

    Ok(match manager.release(version, ctx.today)? {
      Some((old, new)) => vec![old, new],
      None => Vec::new(),
    })
  }
}
