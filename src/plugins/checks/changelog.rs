use crate::changelog::ChangelogManager;
use crate::core::error::RailResult;
use crate::plugins::{CheckContext, CheckPlugin, CheckResult, Plugin};
use crate::project::Project;
use serde_json::json;

/// Validates every changelog bucket of a project
pub struct ChangelogCheck;

impl Plugin for ChangelogCheck {
  fn name(&self) -> &str {
    "changelog"
  }

  fn description(&self) -> &str {
    "Structured changelog validation"
  }
}

impl CheckPlugin for ChangelogCheck {
  fn check_project(&self, project: &Project, _ctx: &CheckContext) -> RailResult<Vec<CheckResult>> {
    let config = &project.config().changelog;
    if !config.enabled {
      return Ok(Vec::new());
    }
    let manager = ChangelogManager::for_project(project);
    let count = manager.all()?.len();
    if count == 0 {
      return Ok(vec![CheckResult::pass("changelog:validate", "No changelogs")]);
    }

    let violations = manager.validate(true)?;
    let result = if violations.is_empty() {
      CheckResult::pass("changelog:validate", format!("All {} changelogs are valid", count))
    } else {
      let lines: Vec<String> = violations
        .iter()
        .map(|v| {
          let file = v.file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
          match &v.entry {
            Some(id) => format!("{}: id={}: {}", file, id, v.message),
            None => format!("{}: {}", file, v.message),
          }
        })
        .collect();
      CheckResult::error(
        "changelog:validate",
        format!("{} changelog violation(s)", violations.len()),
        Some("Run `pyrail changelog validate --all` for details"),
      )
      .with_details(json!({ "violations": lines }))
    };
    Ok(vec![result])
  }
}
