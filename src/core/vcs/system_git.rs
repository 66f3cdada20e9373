//! System git backend
//!
//! Every call goes through a [`CommandRunner`] with an isolated environment
//! (only PATH and HOME survive) and a few `-c` overrides.

use crate::core::error::{GitError, RailError, RailResult};
use crate::core::vcs::{Author, CommandOutput, CommandRunner, CommandSpec, Remote, StatusEntry, Vcs};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Git backend using system git
pub struct SystemGit {
  /// Working tree root
  work_tree: PathBuf,
  runner: Arc<dyn CommandRunner>,
}

impl SystemGit {
  /// Open the repository containing `path`.
  ///
  /// Returns `Ok(None)` when `path` is not inside a git work tree.
  pub fn open(path: &Path, runner: Arc<dyn CommandRunner>) -> RailResult<Option<Self>> {
    let spec = CommandSpec::new("git", path)
      .args(["rev-parse", "--show-toplevel"])
      .isolated();
    let output = runner.run(&spec)?;

    if !output.success() {
      debug!(path = %path.display(), stderr = %output.stderr_str(), "not a git work tree");
      return Ok(None);
    }

    Ok(Some(Self {
      work_tree: PathBuf::from(output.stdout_str()),
      runner,
    }))
  }

  /// Build a git invocation rooted at the work tree
  fn git_cmd<I, S>(&self, args: I) -> CommandSpec
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    CommandSpec::new("git", &self.work_tree)
      .args(["-c", "core.quotePath=false", "-c", "advice.detachedHead=false"])
      .args(args)
      .isolated()
  }

  /// Run and map a non-zero exit to `GitError::CommandFailed`
  fn run_checked(&self, spec: CommandSpec) -> RailResult<CommandOutput> {
    let output = self.runner.run(&spec)?;
    if !output.success() {
      return Err(RailError::Git(GitError::CommandFailed {
        command: spec.display(),
        stderr: output.stderr_str(),
      }));
    }
    Ok(output)
  }

  fn config_value(&self, key: &str) -> RailResult<Option<String>> {
    let output = self.runner.run(&self.git_cmd(["config", "--get", key]))?;
    // exit 1 means "not set"
    if !output.success() {
      return Ok(None);
    }
    let value = output.stdout_str();
    Ok(if value.is_empty() { None } else { Some(value) })
  }
}

impl Vcs for SystemGit {
  fn toplevel(&self) -> &Path {
    &self.work_tree
  }

  fn current_branch(&self) -> RailResult<Option<String>> {
    let output = self.runner.run(&self.git_cmd(["rev-parse", "--abbrev-ref", "HEAD"]))?;
    if !output.success() {
      // No commits yet: fall back to the symbolic ref
      let symbolic = self.runner.run(&self.git_cmd(["symbolic-ref", "--short", "HEAD"]))?;
      return Ok(symbolic.success().then(|| symbolic.stdout_str()));
    }
    let branch = output.stdout_str();
    Ok(if branch == "HEAD" { None } else { Some(branch) })
  }

  fn author(&self) -> RailResult<Author> {
    Ok(Author {
      name: self.config_value("user.name")?,
      email: self.config_value("user.email")?,
    })
  }

  fn remotes(&self) -> RailResult<Vec<Remote>> {
    let output = self.run_checked(self.git_cmd(["remote", "-v"]))?;
    let stdout = output.stdout_str();

    let mut remotes: Vec<Remote> = Vec::new();
    for line in stdout.lines() {
      let parts: Vec<&str> = line.split_whitespace().collect();
      if parts.len() >= 2 && !remotes.iter().any(|r| r.name == parts[0]) {
        remotes.push(Remote {
          name: parts[0].to_string(),
          url: parts[1].to_string(),
        });
      }
    }
    Ok(remotes)
  }

  fn file_at_revision(&self, revision: &str, path: &Path) -> RailResult<Option<Vec<u8>>> {
    let rel = path.to_string_lossy().replace('\\', "/");
    let spec = self.git_cmd(["show".to_string(), format!("{}:{}", revision, rel)]);
    let output = self.runner.run(&spec)?;

    if output.success() {
      return Ok(Some(output.stdout));
    }
    let stderr = output.stderr_str();
    if stderr.contains("does not exist") || stderr.contains("exists on disk, but not in") {
      return Ok(None);
    }
    Err(RailError::Git(GitError::CommandFailed {
      command: spec.display(),
      stderr,
    }))
  }

  fn status(&self) -> RailResult<Vec<StatusEntry>> {
    let output = self.run_checked(self.git_cmd(["status", "--porcelain", "-z", "--untracked-files=all"]))?;
    // Raw stdout: the leading status column may be a space
    Ok(parse_status(&String::from_utf8_lossy(&output.stdout)))
  }

  fn commit(&self, files: &[PathBuf], message: &str) -> RailResult<()> {
    let paths: Vec<String> = files.iter().map(|f| f.to_string_lossy().into_owned()).collect();

    let mut add = vec!["add".to_string(), "--".to_string()];
    add.extend(paths.iter().cloned());
    self.run_checked(self.git_cmd(add))?;

    // A pathspec keeps unrelated staged changes out of the commit
    let mut commit = vec!["commit".to_string(), "-m".to_string(), message.to_string(), "--".to_string()];
    commit.extend(paths);
    self.run_checked(self.git_cmd(commit))?;
    Ok(())
  }

  fn tag(&self, name: &str, force: bool) -> RailResult<()> {
    let mut args = vec!["tag".to_string()];
    if force {
      args.push("-f".to_string());
    }
    args.push(name.to_string());
    self.run_checked(self.git_cmd(args))?;
    Ok(())
  }

  fn push(&self, remote: &str, refs: &[String], force: bool) -> RailResult<()> {
    let mut args = vec!["push".to_string()];
    if force {
      args.push("--force".to_string());
    }
    args.push(remote.to_string());
    args.extend(refs.iter().cloned());

    let output = self.runner.run(&self.git_cmd(args))?;
    if !output.success() {
      return Err(RailError::Git(GitError::PushFailed {
        remote: remote.to_string(),
        reason: output.stderr_str(),
      }));
    }
    Ok(())
  }
}

/// Parse `git status --porcelain -z` output
fn parse_status(raw: &str) -> Vec<StatusEntry> {
  let mut entries = Vec::new();
  let mut fields = raw.split('\0').filter(|f| !f.is_empty());

  while let Some(field) = fields.next() {
    let mut letters = field.chars();
    let (Some(index), Some(worktree)) = (letters.next(), letters.next()) else {
      continue;
    };
    // Renames and copies are followed by their source path
    if matches!(index, 'R' | 'C') {
      fields.next();
    }
    entries.push(StatusEntry {
      index,
      worktree,
      path: PathBuf::from(field.get(3..).unwrap_or_default()),
    });
  }
  entries
}
