//! Integration tests for `pyrail release`

use crate::helpers::{TestWorkspace, run_pyrail, run_pyrail_status, stdout};
use anyhow::Result;

fn single_project(version: &str) -> Result<TestWorkspace> {
  let ws = TestWorkspace::new()?;
  ws.add_poetry_project("", "solo", version, &[])?;
  ws.commit("Add solo")?;
  Ok(ws)
}

fn monorepo() -> Result<TestWorkspace> {
  let ws = TestWorkspace::new()?;
  ws.add_poetry_project("a", "pkg-a", "1.2.4", &[])?;
  ws.add_poetry_project("b", "pkg-b", "0.3.0", &[("pkg-a", "^1.2.4")])?;
  ws.commit("Add pkg-a and pkg-b")?;
  Ok(ws)
}

#[test]
fn test_minor_and_patch_rules() -> Result<()> {
  let ws = single_project("1.2.4")?;
  run_pyrail(&ws.path, &["release", "minor", "--no-commit"])?;
  assert!(ws.read_file("pyproject.toml")?.contains("version = \"1.3.0\""));
  assert!(ws.read_file("src/solo/__init__.py")?.contains("__version__ = \"1.3.0\""));

  let ws = single_project("1.2.4")?;
  run_pyrail(&ws.path, &["release", "patch", "--no-commit"])?;
  assert!(ws.read_file("pyproject.toml")?.contains("version = \"1.2.5\""));
  Ok(())
}

#[test]
fn test_rewrite_only_touches_version_spans() -> Result<()> {
  let ws = single_project("1.2.4")?;
  let pyproject = ws.read_file("pyproject.toml")?;
  let init = ws.read_file("src/solo/__init__.py")?;

  run_pyrail(&ws.path, &["release", "1.3.0", "--no-commit"])?;

  assert_eq!(ws.read_file("pyproject.toml")?, pyproject.replace("1.2.4", "1.3.0"));
  assert_eq!(ws.read_file("src/solo/__init__.py")?, init.replace("1.2.4", "1.3.0"));
  assert_eq!(ws.read_file("README.md")?, "# test repository\n");
  Ok(())
}

#[test]
fn test_validate_agreement_and_single_mismatch() -> Result<()> {
  let ws = single_project("1.2.4")?;
  let output = run_pyrail(&ws.path, &["release", "--validate"])?;
  assert!(stdout(&output).contains("solo: 2 reference(s) agree"), "{}", stdout(&output));

  ws.write_file("src/solo/__init__.py", "__version__ = \"1.2.3\"\n")?;
  let output = run_pyrail_status(&ws.path, &["release", "--validate"])?;
  assert_eq!(output.status.code(), Some(3));
  let out = stdout(&output);
  assert!(out.contains("1 version mismatch(es)"), "{}", out);
  assert!(out.contains("expected 1.2.4, found 1.2.3"), "{}", out);
  Ok(())
}

#[test]
fn test_interdependency_constraint_follows_dependency() -> Result<()> {
  let ws = monorepo()?;
  run_pyrail(&ws.path, &["release", "minor", "--project", "pkg-a", "--no-commit"])?;

  assert!(ws.read_file("a/pyproject.toml")?.contains("version = \"1.3.0\""));
  let b = ws.read_file("b/pyproject.toml")?;
  assert!(b.contains("pkg-a = \"^1.3.0\""), "{}", b);
  assert!(b.contains("version = \"0.3.0\""), "{}", b);
  assert!(ws.read_file("b/src/pkg_b/__init__.py")?.contains("0.3.0"));
  Ok(())
}

#[test]
fn test_cycle_rejected_before_any_write() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_poetry_project("a", "pkg-a", "1.0.0", &[("pkg-b", "^1.0.0")])?;
  ws.add_poetry_project("b", "pkg-b", "1.0.0", &[("pkg-a", "^1.0.0")])?;
  ws.commit("Add cycle")?;
  let a = ws.read_file("a/pyproject.toml")?;
  let b = ws.read_file("b/pyproject.toml")?;

  let output = run_pyrail_status(&ws.path, &["release", "patch"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("pkg-a"));
  assert_eq!(ws.read_file("a/pyproject.toml")?, a);
  assert_eq!(ws.read_file("b/pyproject.toml")?, b);
  Ok(())
}

#[test]
fn test_commit_and_tag() -> Result<()> {
  let ws = single_project("0.1.0")?;
  run_pyrail(&ws.path, &["release", "minor", "--tag"])?;

  assert_eq!(ws.git_stdout(&["log", "-1", "--format=%s"])?, "release 0.2.0");
  assert_eq!(ws.git_stdout(&["tag", "--list"])?, "0.2.0");
  assert_eq!(ws.git_stdout(&["status", "--porcelain"])?, "");
  Ok(())
}

#[test]
fn test_release_branch_gate() -> Result<()> {
  let ws = single_project("0.1.0")?;
  ws.git_stdout(&["checkout", "-b", "feature/x"])?;

  let output = run_pyrail_status(&ws.path, &["release", "patch"])?;
  assert_eq!(output.status.code(), Some(2));
  assert!(ws.read_file("pyproject.toml")?.contains("0.1.0"));

  run_pyrail(&ws.path, &["release", "patch", "--no-branch-check", "--no-commit"])?;
  assert!(ws.read_file("pyproject.toml")?.contains("0.1.1"));
  Ok(())
}

#[test]
fn test_dry_run_prints_diff() -> Result<()> {
  let ws = single_project("1.0.0")?;
  let output = run_pyrail(&ws.path, &["release", "major", "--dry"])?;
  let out = stdout(&output);

  assert!(out.contains("-version = \"1.0.0\""), "{}", out);
  assert!(out.contains("+version = \"2.0.0\""), "{}", out);
  assert!(ws.read_file("pyproject.toml")?.contains("1.0.0"));
  Ok(())
}

#[test]
fn test_push_requires_known_remote() -> Result<()> {
  let ws = single_project("1.0.0")?;
  let output = run_pyrail_status(&ws.path, &["release", "patch", "--tag", "--push"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("origin"));
  assert!(ws.read_file("pyproject.toml")?.contains("1.0.0"));
  Ok(())
}

#[test]
fn test_push_to_local_remote() -> Result<()> {
  let ws = single_project("1.0.0")?;
  let remote = tempfile::TempDir::new()?;
  crate::helpers::git(remote.path(), &["init", "--bare"])?;
  ws.git_stdout(&["remote", "add", "origin", &remote.path().display().to_string()])?;

  run_pyrail(&ws.path, &["release", "patch", "--tag", "--push"])?;

  let tags = crate::helpers::git(remote.path(), &["tag", "--list"])?;
  assert_eq!(String::from_utf8_lossy(&tags.stdout).trim(), "1.0.1");
  Ok(())
}

#[test]
fn test_setuptools_project() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_setuptools_project("", "legacy-tool", "2.1")?;
  ws.commit("Add legacy-tool")?;

  run_pyrail(&ws.path, &["release", "--validate", "2.1"])?;
  run_pyrail(&ws.path, &["release", "minor", "--no-commit"])?;
  assert!(ws.read_file("setup.cfg")?.contains("version = 2.2.0"));
  assert!(ws.read_file("legacy_tool/__init__.py")?.contains("__version__ = '2.2.0'"));
  Ok(())
}

#[test]
fn test_configured_reference() -> Result<()> {
  let ws = single_project("1.2.4")?;
  ws.write_file("README.md", "# solo\n\nInstall with `pip install solo==1.2.4`.\n")?;
  ws.write_file(
    "pyrail.toml",
    "[release]\nreferences = [{ file = \"README.md\", pattern = \"solo=={version}`\" }]\n",
  )?;
  ws.commit("Document install")?;

  run_pyrail(&ws.path, &["release", "patch"])?;
  assert!(ws.read_file("README.md")?.contains("solo==1.2.5`"));
  Ok(())
}

#[test]
fn test_release_from_project_subdirectory() -> Result<()> {
  let ws = monorepo()?;
  run_pyrail(&ws.path.join("a/src/pkg_a"), &["release", "minor", "--no-commit"])?;

  assert!(ws.read_file("a/pyproject.toml")?.contains("version = \"1.3.0\""));
  let b = ws.read_file("b/pyproject.toml")?;
  assert!(b.contains("pkg-a = \"^1.3.0\""), "{}", b);
  assert!(b.contains("version = \"0.3.0\""), "{}", b);
  Ok(())
}

#[test]
fn test_dirty_worktree_refused() -> Result<()> {
  let ws = single_project("1.0.0")?;
  ws.write_file("README.md", "# edited\n")?;

  let output = run_pyrail_status(&ws.path, &["release", "patch"])?;
  assert_eq!(output.status.code(), Some(2));
  assert!(String::from_utf8_lossy(&output.stderr).contains("README.md"));
  assert!(ws.read_file("pyproject.toml")?.contains("1.0.0"));

  run_pyrail(&ws.path, &["release", "patch", "--no-worktree-check"])?;
  assert_eq!(ws.git_stdout(&["log", "-1", "--format=%s"])?, "release 1.0.1");
  assert_eq!(ws.git_stdout(&["status", "--porcelain"])?, "M README.md");
  Ok(())
}

#[test]
fn test_dev_group_constraint_follows_dependency() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_poetry_project("a", "pkg-a", "1.2.4", &[])?;
  ws.add_poetry_project("b", "pkg-b", "0.3.0", &[])?;
  let b = ws.read_file("b/pyproject.toml")?;
  ws.write_file(
    "b/pyproject.toml",
    &format!("{}\n[tool.poetry.group.dev.dependencies]\npkg-a = \"^1.2.4\"\n", b),
  )?;
  ws.commit("Add pkg-a and pkg-b")?;

  run_pyrail(&ws.path, &["release", "minor", "--project", "pkg-a", "--no-commit"])?;
  let b = ws.read_file("b/pyproject.toml")?;
  assert!(b.contains("[tool.poetry.group.dev.dependencies]\npkg-a = \"^1.3.0\""), "{}", b);
  assert!(b.contains("version = \"0.3.0\""), "{}", b);
  Ok(())
}
