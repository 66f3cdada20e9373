use crate::core::error::RailResult;
use crate::plugins::{CheckContext, CheckPlugin, CheckResult, Plugin};
use crate::project::Project;

/// Checks applicable to every project
pub struct GeneralCheck;

impl Plugin for GeneralCheck {
  fn name(&self) -> &str {
    "general"
  }

  fn description(&self) -> &str {
    "Package detection and py.typed markers"
  }
}

impl GeneralCheck {
  fn packages(&self, project: &Project) -> CheckResult {
    if project.packages.is_empty() {
      return CheckResult::error(
        "general:packages",
        "No Python packages detected",
        Some("Set project.source-directory or the backend's package list"),
      );
    }
    let names: Vec<String> = project
      .packages
      .iter()
      .map(|p| {
        let root = pathdiff::diff_paths(&p.root, &project.directory).unwrap_or_else(|| p.root.clone());
        root.join(&p.name).display().to_string()
      })
      .collect();
    CheckResult::pass("general:packages", format!("Detected {}", names.join(", ")))
  }

  fn typed(&self, project: &Project) -> CheckResult {
    let Some(expect_typed) = project.config().project.typed else {
      return CheckResult::warning(
        "general:typed",
        "project.typed is not set",
        Some("Set project.typed = true or false"),
      );
    };

    let (typed, untyped): (Vec<_>, Vec<_>) = project
      .packages
      .iter()
      .filter(|p| !p.is_module())
      .partition(|p| p.path.join("py.typed").is_file());
    let names = |packages: &[&crate::project::Package]| -> String {
      packages.iter().map(|p| p.name.as_str()).collect::<Vec<_>>().join(", ")
    };

    if expect_typed && !untyped.is_empty() {
      CheckResult::error(
        "general:typed",
        format!("py.typed missing in {}", names(&untyped)),
        Some("Add an empty py.typed file to each package"),
      )
    } else if !expect_typed && !typed.is_empty() {
      CheckResult::error(
        "general:typed",
        format!("py.typed should not exist in {}", names(&typed)),
        Some("Remove py.typed or set project.typed = true"),
      )
    } else if expect_typed {
      CheckResult::pass("general:typed", "py.typed exists as expected")
    } else {
      CheckResult::pass("general:typed", "py.typed does not exist as expected")
    }
  }
}

impl CheckPlugin for GeneralCheck {
  fn check_project(&self, project: &Project, _ctx: &CheckContext) -> RailResult<Vec<CheckResult>> {
    Ok(vec![self.packages(project), self.typed(project)])
  }
}
