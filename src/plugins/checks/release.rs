use crate::core::error::RailResult;
use crate::plugins::release::SourceCodeVersionPlugin;
use crate::plugins::{CheckContext, CheckPlugin, CheckResult, Plugin, ReleasePlugin};
use crate::project::Project;
use crate::version::bump::validate;
use crate::version::scan::VersionScanner;
use serde_json::json;

/// Checks that `pyrail release` depends on
pub struct ReleaseCheck;

impl Plugin for ReleaseCheck {
  fn name(&self) -> &str {
    "release"
  }

  fn description(&self) -> &str {
    "Source code versions and version reference consistency"
  }
}

impl CheckPlugin for ReleaseCheck {
  fn check_project(&self, project: &Project, _ctx: &CheckContext) -> RailResult<Vec<CheckResult>> {
    if project.packages.is_empty() {
      return Ok(vec![CheckResult::warning(
        "release:source-code-version",
        "No packages detected",
        None::<String>,
      )]);
    }

    let found = SourceCodeVersionPlugin.version_refs(project);
    let result = match (found.refs.first(), found.inconsistencies.first()) {
      (Some(reference), _) => CheckResult::pass(
        "release:source-code-version",
        format!("Found __version__ = {:?} in {}", reference.value, reference.location(&project.directory)),
      ),
      (None, Some(problem)) => CheckResult::error(
        "release:source-code-version",
        problem.message.clone(),
        Some("Add a single top-level __version__ = \"x.y.z\" to the package's __init__.py"),
      ),
      (None, None) => CheckResult::warning("release:source-code-version", "No primary package", None::<String>),
    };
    Ok(vec![result])
  }

  fn check_repository(&self, ctx: &CheckContext) -> RailResult<Vec<CheckResult>> {
    let scanner = VersionScanner::new(ctx.repository, ctx.release_plugins.clone());
    let report = scanner.scan_all()?;
    let validation = validate(&report, &ctx.repository.root, None);

    let result = if report.all_refs().next().is_none() {
      CheckResult::warning("release:consistent-versions", "No version references found", None::<String>)
    } else if validation.is_ok() && !report.has_inconsistencies() {
      CheckResult::pass(
        "release:consistent-versions",
        format!("All {} version references agree", report.all_refs().count()),
      )
    } else {
      CheckResult::error(
        "release:consistent-versions",
        format!(
          "{} mismatching and {} undiscoverable version references",
          validation.mismatches.len(),
          report.inconsistencies.len()
        ),
        Some("Run `pyrail release --validate` for the full report"),
      )
      .with_details(json!({
        "mismatches": validation.mismatches,
        "inconsistencies": report.inconsistencies,
      }))
    };
    Ok(vec![result])
  }
}
