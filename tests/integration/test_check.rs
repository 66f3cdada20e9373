//! Integration tests for `pyrail check` and `pyrail info`

use crate::helpers::{TestWorkspace, run_pyrail, run_pyrail_status, stdout};
use anyhow::Result;

fn monorepo() -> Result<TestWorkspace> {
  let ws = TestWorkspace::new()?;
  ws.add_poetry_project("a", "pkg-a", "1.2.4", &[])?;
  ws.add_poetry_project("b", "pkg-b", "0.3.0", &[("pkg-a", "^1.2.4")])?;
  ws.commit("Add projects")?;
  Ok(ws)
}

#[test]
fn test_discovery_is_idempotent() -> Result<()> {
  let ws = monorepo()?;
  let first = stdout(&run_pyrail(&ws.path, &["info", "--json"])?);
  let second = stdout(&run_pyrail(&ws.path, &["info", "--json"])?);
  assert_eq!(first, second);

  let info: serde_json::Value = serde_json::from_str(&first)?;
  let names: Vec<&str> = info["projects"]
    .as_array()
    .map(|p| p.iter().filter_map(|p| p["name"].as_str()).collect())
    .unwrap_or_default();
  assert_eq!(names, vec!["pkg-a", "pkg-b"]);
  Ok(())
}

#[test]
fn test_check_passes_on_consistent_repository() -> Result<()> {
  let ws = monorepo()?;
  let output = run_pyrail(&ws.path, &["check", "--json"])?;
  let results: serde_json::Value = serde_json::from_str(&stdout(&output))?;
  assert!(results.as_array().is_some_and(|r| !r.is_empty()));
  Ok(())
}

#[test]
fn test_check_fails_on_drift() -> Result<()> {
  let ws = monorepo()?;
  ws.write_file("b/src/pkg_b/__init__.py", "__version__ = \"0.2.9\"\n")?;
  let output = run_pyrail_status(&ws.path, &["check"])?;
  assert_eq!(output.status.code(), Some(3));
  assert!(stdout(&output).contains("release:consistent-versions"), "{}", stdout(&output));
  Ok(())
}

#[test]
fn test_unknown_plugin_is_configuration_error() -> Result<()> {
  let ws = monorepo()?;
  ws.write_file("pyrail.toml", "[plugins]\ndisable = [\"does-not-exist\"]\n")?;
  let output = run_pyrail_status(&ws.path, &["info"])?;
  assert_eq!(output.status.code(), Some(1));
  Ok(())
}
