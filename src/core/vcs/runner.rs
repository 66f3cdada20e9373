//! Narrow synchronous interface to external programs
//!
//! Everything pyrail executes (git today) goes through [`CommandRunner`], so
//! release control flow can be tested with a scripted runner instead of real
//! processes.

use crate::core::error::{RailResult, ResultExt};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// A program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: PathBuf,
  /// Clear the environment except PATH and HOME
  pub isolated: bool,
}

impl CommandSpec {
  pub fn new(program: impl Into<String>, cwd: &Path) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: cwd.to_path_buf(),
      isolated: false,
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn isolated(mut self) -> Self {
    self.isolated = true;
    self
  }

  /// Human readable form for error messages
  pub fn display(&self) -> String {
    let mut out = self.program.clone();
    for arg in &self.args {
      out.push(' ');
      out.push_str(arg);
    }
    out
  }
}

/// Exit status and captured output of a finished program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
  /// `None` when the process was killed by a signal
  pub status: Option<i32>,
  pub stdout: Vec<u8>,
  pub stderr: Vec<u8>,
}

impl CommandOutput {
  pub fn success(&self) -> bool {
    self.status == Some(0)
  }

  pub fn stdout_str(&self) -> String {
    String::from_utf8_lossy(&self.stdout).trim().to_string()
  }

  pub fn stderr_str(&self) -> String {
    String::from_utf8_lossy(&self.stderr).trim().to_string()
  }
}

/// Runs external programs to completion
pub trait CommandRunner: Send + Sync {
  fn run(&self, spec: &CommandSpec) -> RailResult<CommandOutput>;
}

/// Runs programs with `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
  fn run(&self, spec: &CommandSpec) -> RailResult<CommandOutput> {
    debug!(command = %spec.display(), cwd = %spec.cwd.display(), "running");

    let mut cmd = Command::new(&spec.program);
    cmd.current_dir(&spec.cwd).args(&spec.args);

    if spec.isolated {
      cmd.env_clear();
      if let Ok(path) = std::env::var("PATH") {
        cmd.env("PATH", path);
      }
      if let Ok(home) = std::env::var("HOME") {
        cmd.env("HOME", home);
      }
    }

    let output = cmd
      .output()
      .with_context(|| format!("Failed to execute {}", spec.display()))?;

    Ok(CommandOutput {
      status: output.status.code(),
      stdout: output.stdout,
      stderr: output.stderr,
    })
  }
}
