//! Application context - build once, pass everywhere
//!
//! Holds the plugin registry, the discovered repository and the optional
//! version control and hosting collaborators. Commands receive `&AppContext`.

use crate::core::config::PyrailConfig;
use crate::core::error::{RailError, RailResult};
use crate::core::host::{RepositoryHost, detect_host};
use crate::core::vcs::{CommandRunner, SystemGit, Vcs};
use crate::plugins::PluginRegistry;
use crate::project::repository::find_root;
use crate::project::{Project, Repository};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct AppContext {
  /// Repository root (absolute path)
  pub root: PathBuf,
  /// Directory the command was started in
  pub cwd: PathBuf,
  pub registry: PluginRegistry,
  pub repository: Repository,
  /// `None` outside a git work tree
  pub vcs: Option<Box<dyn Vcs>>,
  pub host: Option<Box<dyn RepositoryHost>>,
}

impl AppContext {
  /// Locate the repository around `cwd`, then load configuration, plugins,
  /// projects and collaborators.
  ///
  /// Plugin names are validated here, before any command runs.
  pub fn build(cwd: &Path, runner: Arc<dyn CommandRunner>) -> RailResult<Self> {
    let git = SystemGit::open(cwd, runner)?;
    let root = find_root(cwd, git.as_ref().map(|g| g.toplevel()));

    let config = PyrailConfig::load(&root)?;
    let registry = PluginRegistry::builtin(&config.plugins)?;
    registry.select_release_plugins(&config.release.plugins)?;
    let repository = Repository::discover(&root, &registry)?;

    let vcs = git.map(|git| Box::new(git) as Box<dyn Vcs>);
    let remotes = match &vcs {
      Some(vcs) => vcs.remotes().unwrap_or_else(|e| {
        warn!(error = %e, "could not list git remotes");
        Vec::new()
      }),
      None => Vec::new(),
    };
    let host = detect_host(config.repository.host.as_deref(), &remotes);
    debug!(
      root = %root.display(),
      vcs = vcs.is_some(),
      host = host.as_ref().map(|h| h.name()),
      "context ready"
    );

    Ok(Self {
      root,
      cwd: cwd.to_path_buf(),
      registry,
      repository,
      vcs,
      host,
    })
  }

  pub fn vcs(&self) -> Option<&dyn Vcs> {
    self.vcs.as_deref()
  }

  pub fn host(&self) -> Option<&dyn RepositoryHost> {
    self.host.as_deref()
  }

  /// Require a git work tree
  pub fn require_vcs(&self, action: &str) -> RailResult<&dyn Vcs> {
    self.vcs().ok_or_else(|| {
      RailError::with_help(
        format!("not in a git repository, cannot {}", action),
        "Run pyrail inside a git work tree.",
      )
    })
  }

  /// The named project, or the one the command was started in, or the only project
  pub fn select_project(&self, name: Option<&str>) -> RailResult<&Project> {
    match name {
      Some(name) => self.repository.project(name).ok_or_else(|| {
        RailError::with_help(
          format!("unknown project '{}'", name),
          "Run `pyrail info` to list projects.",
        )
      }),
      None => self.repository.project_for(&self.cwd).ok_or_else(|| {
        RailError::with_help(
          "the repository has several projects",
          "Choose one with --project <name>.",
        )
      }),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::vcs::runner::fake::FakeRunner;
  use crate::testing::{monorepo, write};

  #[test]
  fn test_build_outside_git() {
    let (dir, _) = monorepo();
    let runner = Arc::new(FakeRunner::new().fail("--show-toplevel", "fatal: not a git repository"));
    let ctx = AppContext::build(dir.path(), runner).unwrap();
    assert!(ctx.vcs().is_none());
    assert!(ctx.host().is_none());
    assert!(ctx.require_vcs("tag").is_err());
    assert!(ctx.select_project(None).is_err());
    assert_eq!(ctx.select_project(Some("pkg_b")).unwrap().name, "pkg-b");
  }

  #[test]
  fn test_host_from_origin() {
    let (dir, _) = monorepo();
    let root = dir.path().display().to_string();
    let runner = Arc::new(
      FakeRunner::new()
        .respond("--show-toplevel", &root)
        .respond("remote -v", "origin\tgit@github.com:owner/repo.git (fetch)\n"),
    );
    let ctx = AppContext::build(dir.path(), runner).unwrap();
    assert_eq!(ctx.host().unwrap().issue_url("7").unwrap(), "https://github.com/owner/repo/issues/7");
  }

  #[test]
  fn test_started_inside_a_project() {
    let (dir, _) = monorepo();
    let runner = Arc::new(FakeRunner::new().respond("--show-toplevel", &dir.path().display().to_string()));
    let ctx = AppContext::build(&dir.path().join("a/src"), runner).unwrap();

    assert_eq!(ctx.root, dir.path());
    assert_eq!(ctx.repository.projects().len(), 2);
    assert_eq!(ctx.select_project(None).unwrap().name, "pkg-a");
    assert_eq!(ctx.repository.dependents_of("pkg-a")[0].name, "pkg-b");
  }

  #[test]
  fn test_unknown_release_plugin_fails_early() {
    let (dir, _) = monorepo();
    write(dir.path(), "pyrail.toml", "[release]\nplugins = [\"nope\"]\n");
    let runner = Arc::new(FakeRunner::new().fail("--show-toplevel", "fatal"));
    assert!(AppContext::build(dir.path(), runner).is_err());
  }
}
