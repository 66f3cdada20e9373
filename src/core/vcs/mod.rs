//! Version-control collaborator
//!
//! pyrail only needs a handful of operations from version control, captured by
//! the [`Vcs`] trait. [`SystemGit`] implements it on top of the `git` binary
//! through a [`CommandRunner`].

pub mod runner;
pub mod system_git;

pub use runner::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use system_git::SystemGit;

use crate::core::error::RailResult;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Identity configured for commits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Author {
  pub name: Option<String>,
  pub email: Option<String>,
}

impl Author {
  /// Preferred identifier for changelog entries: email, then name
  pub fn identifier(&self) -> Option<&str> {
    self.email.as_deref().or(self.name.as_deref())
  }
}

/// A configured remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Remote {
  pub name: String,
  pub url: String,
}

/// One `git status --porcelain` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
  /// Index (staged) status letter, `' '` when unchanged
  pub index: char,
  /// Work tree status letter, `' '` when unchanged
  pub worktree: char,
  /// Path relative to the toplevel
  pub path: PathBuf,
}

impl StatusEntry {
  pub fn is_untracked(&self) -> bool {
    self.index == '?' && self.worktree == '?'
  }

  /// Tracked file with changes that are not staged
  pub fn is_unstaged(&self) -> bool {
    !self.is_untracked() && self.worktree != ' '
  }

  /// Tracked file with staged changes only
  pub fn is_staged_only(&self) -> bool {
    !self.is_untracked() && self.index != ' ' && self.worktree == ' '
  }
}

/// Operations pyrail consumes from version control
pub trait Vcs: Send + Sync {
  /// Root of the working tree
  fn toplevel(&self) -> &Path;

  /// Current branch, `None` on a detached HEAD
  fn current_branch(&self) -> RailResult<Option<String>>;

  fn author(&self) -> RailResult<Author>;

  fn remotes(&self) -> RailResult<Vec<Remote>>;

  /// Contents of `path` (relative to the toplevel) at `revision`, `None` if absent there
  fn file_at_revision(&self, revision: &str, path: &Path) -> RailResult<Option<Vec<u8>>>;

  /// Changed and untracked files of the work tree
  fn status(&self) -> RailResult<Vec<StatusEntry>>;

  /// Stage `files` and commit exactly those paths
  fn commit(&self, files: &[PathBuf], message: &str) -> RailResult<()>;

  fn tag(&self, name: &str, force: bool) -> RailResult<()>;

  /// Push `refs` (branch names and tags) to `remote`
  fn push(&self, remote: &str, refs: &[String], force: bool) -> RailResult<()>;
}
