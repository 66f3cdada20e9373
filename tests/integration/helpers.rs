//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A git repository on the `develop` branch with one initial commit
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestWorkspace {
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().canonicalize()?;

    git(&path, &["init", "--initial-branch=develop"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;
    git(&path, &["config", "commit.gpgsign", "false"])?;
    git(&path, &["config", "tag.gpgsign", "false"])?;

    std::fs::write(path.join("README.md"), "# test repository\n")?;
    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial commit"])?;

    Ok(Self { _root: root, path })
  }

  /// Add a Poetry project under `dir` ("" for the repository root)
  pub fn add_poetry_project(&self, dir: &str, name: &str, version: &str, deps: &[(&str, &str)]) -> Result<PathBuf> {
    let project = self.path.join(dir);
    let module = name.replace('-', "_");

    let mut pyproject = format!(
      r#"[tool.poetry]
name = "{name}"
version = "{version}"
description = "A test project"
authors = ["Test User <test@example.com>"]
packages = [{{ include = "{module}", from = "src" }}]

[tool.poetry.dependencies]
python = "^3.8"
"#
    );
    for (dep, constraint) in deps {
      pyproject.push_str(&format!("{} = \"{}\"\n", dep, constraint));
    }
    pyproject.push_str(
      r#"
[build-system]
requires = ["poetry-core"]
build-backend = "poetry.core.masonry.api"
"#,
    );

    self.write_file(&join(dir, "pyproject.toml"), &pyproject)?;
    self.write_file(
      &join(dir, &format!("src/{}/__init__.py", module)),
      &format!("\"\"\"The {name} package.\"\"\"\n\n__version__ = \"{version}\"\n"),
    )?;
    Ok(project)
  }

  /// Add a setuptools project configured through `setup.cfg`
  pub fn add_setuptools_project(&self, dir: &str, name: &str, version: &str) -> Result<PathBuf> {
    let module = name.replace('-', "_");
    self.write_file(
      &join(dir, "setup.cfg"),
      &format!("[metadata]\nname = {name}\nversion = {version}\n\n[options]\npackages = find:\n"),
    )?;
    self.write_file(&join(dir, "setup.py"), "from setuptools import setup\n\nsetup()\n")?;
    self.write_file(
      &join(dir, &format!("{}/__init__.py", module)),
      &format!("__version__ = '{version}'\n"),
    )?;
    Ok(self.path.join(dir))
  }

  /// Commit everything and return the new HEAD
  pub fn commit(&self, message: &str) -> Result<String> {
    git(&self.path, &["add", "."])?;
    git(&self.path, &["commit", "-m", message])?;
    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  pub fn git_stdout(&self, args: &[&str]) -> Result<String> {
    let output = git(&self.path, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
    let path = self.path.join(path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
  }

  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }

  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }
}

fn join(dir: &str, rel: &str) -> String {
  if dir.is_empty() { rel.to_string() } else { format!("{}/{}", dir, rel) }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run pyrail and return its output whatever the exit status
pub fn run_pyrail_status(cwd: &Path, args: &[&str]) -> Result<Output> {
  Command::new(env!("CARGO_BIN_EXE_pyrail"))
    .current_dir(cwd)
    .env_remove("PYRAIL_LOG")
    .env("NO_COLOR", "1")
    .args(args)
    .output()
    .context("Failed to run pyrail")
}

/// Run pyrail, failing unless it exits successfully
pub fn run_pyrail(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_pyrail_status(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "pyrail command failed: pyrail {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).to_string()
}
