//! Integration tests for `pyrail changelog`

use crate::helpers::{TestWorkspace, run_pyrail, run_pyrail_status, stdout};
use anyhow::Result;

fn workspace() -> Result<TestWorkspace> {
  let ws = TestWorkspace::new()?;
  ws.add_poetry_project("", "solo", "1.0.0", &[])?;
  ws.write_file("pyrail.toml", "[repository]\nhost = \"github.com/owner/repo\"\n")?;
  ws.commit("Add solo")?;
  Ok(ws)
}

fn add(ws: &TestWorkspace, change_type: &str, description: &str) -> Result<String> {
  let output = run_pyrail(
    &ws.path,
    &["changelog", "add", "-t", change_type, "-d", description, "--json"],
  )?;
  let entry: serde_json::Value = serde_json::from_str(&stdout(&output))?;
  Ok(entry["id"].as_str().unwrap_or_default().to_string())
}

#[test]
fn test_add_then_validate() -> Result<()> {
  let ws = workspace()?;
  add(&ws, "fix", "Fix the documentation")?;

  let text = ws.read_file(".changelog/_unreleased.toml")?;
  assert!(text.contains("test@example.com"), "{}", text);
  run_pyrail(&ws.path, &["changelog", "validate"])?;
  Ok(())
}

#[test]
fn test_unknown_type_fails_before_writing() -> Result<()> {
  let ws = workspace()?;
  let output = run_pyrail_status(&ws.path, &["changelog", "add", "-t", "whatever", "-d", "x"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(!ws.file_exists(".changelog/_unreleased.toml"));
  Ok(())
}

#[test]
fn test_issue_numbers_become_urls() -> Result<()> {
  let ws = workspace()?;
  run_pyrail(
    &ws.path,
    &["changelog", "add", "-t", "feature", "-d", "New API", "-i", "#231", "--pr", "240"],
  )?;
  let text = ws.read_file(".changelog/_unreleased.toml")?;
  assert!(text.contains("https://github.com/owner/repo/issues/231"), "{}", text);
  assert!(text.contains("https://github.com/owner/repo/pull/240"), "{}", text);
  Ok(())
}

#[test]
fn test_invalid_bucket_reported() -> Result<()> {
  let ws = workspace()?;
  ws.write_file(
    ".changelog/_unreleased.toml",
    "[[entries]]\nid = \"a\"\ntype = \"nope\"\ndescription = \"\"\nauthor = \"x\"\n",
  )?;
  let output = run_pyrail_status(&ws.path, &["changelog", "validate"])?;
  assert_eq!(output.status.code(), Some(3));
  assert!(stdout(&output).contains("2 changelog problem(s)"), "{}", stdout(&output));
  Ok(())
}

#[test]
fn test_release_stages_unreleased_bucket() -> Result<()> {
  let ws = workspace()?;
  add(&ws, "fix", "Fix a bug")?;
  add(&ws, "feature", "Add a feature")?;
  ws.commit("Add changelog entries")?;

  run_pyrail(&ws.path, &["release", "minor"])?;

  assert!(ws.file_exists(".changelog/_unreleased.toml"));
  assert_eq!(ws.read_file(".changelog/_unreleased.toml")?.trim(), "");
  let released = ws.read_file(".changelog/1.1.0.toml")?;
  assert!(released.contains("release-date"), "{}", released);
  assert!(released.contains("Fix a bug") && released.contains("Add a feature"));
  assert_eq!(ws.git_stdout(&["status", "--porcelain"])?, "");

  let output = run_pyrail(&ws.path, &["changelog", "format", "--all", "--markdown"])?;
  let out = stdout(&output);
  assert!(out.contains("## 1.1.0 ("), "{}", out);
  assert!(out.contains("## Unreleased"), "{}", out);
  Ok(())
}

#[test]
fn test_update_pr_touches_only_added_entries() -> Result<()> {
  let ws = workspace()?;
  let old = add(&ws, "fix", "Already merged")?;
  ws.commit("Add first entry")?;
  ws.git_stdout(&["checkout", "-b", "feature/x"])?;
  let new = add(&ws, "feature", "On this branch")?;

  run_pyrail(&ws.path, &["changelog", "update-pr", "develop", "42"])?;

  let text = ws.read_file(".changelog/_unreleased.toml")?;
  let doc: toml_edit::DocumentMut = text.parse()?;
  let entries = doc["entries"].as_array_of_tables().map(|a| a.iter().collect::<Vec<_>>()).unwrap_or_default();
  let by_id = |id: &str| entries.iter().find(|e| e["id"].as_str() == Some(id)).copied();

  assert!(by_id(&old).is_some_and(|e| e.get("pr").is_none()), "{}", text);
  assert_eq!(
    by_id(&new).and_then(|e| e["pr"].as_str()),
    Some("https://github.com/owner/repo/pull/42")
  );
  Ok(())
}

#[test]
fn test_assert_added() -> Result<()> {
  let ws = workspace()?;
  let output = run_pyrail_status(&ws.path, &["changelog", "assert-added", "develop"])?;
  assert_eq!(output.status.code(), Some(3));

  add(&ws, "docs", "Document the CLI")?;
  run_pyrail(&ws.path, &["changelog", "assert-added", "develop"])?;
  Ok(())
}

#[test]
fn test_branch_checks_cover_every_project() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_poetry_project("a", "pkg-a", "1.0.0", &[])?;
  ws.add_poetry_project("b", "pkg-b", "1.0.0", &[("pkg-a", "^1.0.0")])?;
  ws.commit("Add pkg-a and pkg-b")?;
  ws.git_stdout(&["checkout", "-b", "feature/x"])?;

  let output = run_pyrail_status(&ws.path, &["changelog", "assert-added", "develop"])?;
  assert_eq!(output.status.code(), Some(3));

  // started inside b/, so no --project is needed
  run_pyrail(&ws.path.join("b"), &["changelog", "add", "-t", "fix", "-d", "Fix pkg-b"])?;
  assert!(ws.file_exists("b/.changelog/_unreleased.toml"));
  assert!(!ws.file_exists("a/.changelog/_unreleased.toml"));

  let output = run_pyrail(&ws.path, &["changelog", "assert-added", "develop"])?;
  assert!(stdout(&output).contains("pkg-b: 1 changelog entr(y/ies)"), "{}", stdout(&output));

  let pr = "https://github.com/owner/repo/pull/42";
  run_pyrail(&ws.path, &["changelog", "update-pr", "develop", pr])?;
  assert!(ws.read_file("b/.changelog/_unreleased.toml")?.contains(pr));
  assert!(!ws.file_exists("a/.changelog/_unreleased.toml"));
  Ok(())
}
