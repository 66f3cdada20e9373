use crate::core::error::RailResult;
use crate::plugins::{CheckContext, CheckPlugin, CheckResult, Plugin};
use serde_json::json;

/// Repository-wide structure checks
pub struct RepositoryCheck;

impl Plugin for RepositoryCheck {
  fn name(&self) -> &str {
    "repository"
  }

  fn description(&self) -> &str {
    "Detect cycles between projects"
  }
}

impl CheckPlugin for RepositoryCheck {
  fn check_repository(&self, ctx: &CheckContext) -> RailResult<Vec<CheckResult>> {
    let cycles = ctx.repository.find_cycles();
    if cycles.is_empty() {
      return Ok(vec![CheckResult::pass(
        "repository:cycles",
        format!(
          "No inter-dependency cycles among {} project(s)",
          ctx.repository.projects().len()
        ),
      )]);
    }

    let cycle_list: Vec<String> = cycles
      .iter()
      .enumerate()
      .map(|(i, cycle)| format!("Cycle {}: {}", i + 1, cycle.join(" -> ")))
      .collect();
    Ok(vec![
      CheckResult::error(
        "repository:cycles",
        format!("Found {} inter-dependency cycle(s)", cycles.len()),
        Some("Projects cannot be released in order until the cycle is removed"),
      )
      .with_details(json!({ "cycles": cycle_list })),
    ])
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::project::Repository;
  use crate::testing::{poetry_project, registry};
  use tempfile::TempDir;

  #[test]
  fn test_cycle_reported() {
    let dir = TempDir::new().unwrap();
    poetry_project(dir.path(), "a", "pkg-a", "1.0.0", &[("pkg-b", "^1.0.0")]);
    poetry_project(dir.path(), "b", "pkg-b", "1.0.0", &[("pkg-a", "^1.0.0")]);
    let registry = registry();
    let repo = Repository::discover(dir.path(), &registry).unwrap();
    let ctx = CheckContext::new(&repo, &registry).unwrap();

    let results = RepositoryCheck.check_repository(&ctx).unwrap();
    assert!(results[0].is_blocking());
    assert_eq!(results[0].details.as_ref().unwrap()["cycles"][0], "Cycle 1: pkg-a -> pkg-b");
  }
}
