//! Validate mode and bump planning
//!
//! Validation compares each project's references against that project's own
//! declared version. Projects without a declared version are skipped and
//! listed as such.
//!
//! Planning resolves the target version of every selected project and turns
//! its reference set into edits. Projects are planned in inter-dependency
//! order, and a cycle aborts planning before any file is read for rewriting.

use crate::core::error::{RailError, RailResult, ValidationError};
use crate::plugins::{PluginRegistry, VersionRule};
use crate::project::{Project, Repository};
use crate::version::scan::{ScanReport, VersionScanner};
use crate::version::{Version, VersionRef};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// A reference whose value differs from its project's version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
  pub project: String,
  pub expected: String,
  pub found: String,
  /// `path:line` relative to the repository root
  pub location: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
  /// Projects whose references were compared
  pub checked: Vec<String>,
  /// Projects without a declared version
  pub skipped: Vec<String>,
  pub mismatches: Vec<Mismatch>,
}

impl ValidationReport {
  pub fn is_ok(&self) -> bool {
    self.mismatches.is_empty()
  }

  /// Convert into an error when any reference disagrees
  pub fn into_result(self) -> RailResult<Self> {
    if self.is_ok() {
      Ok(self)
    } else {
      Err(RailError::Validation(ValidationError::VersionMismatch {
        count: self.mismatches.len(),
      }))
    }
  }
}

/// Compare every reference against its project's version.
///
/// `expected` replaces the declared versions as the value to compare with.
pub fn validate(report: &ScanReport, root: &Path, expected: Option<&str>) -> ValidationReport {
  let mut result = ValidationReport::default();

  for project in &report.projects {
    let Some(version) = expected.or(project.version.as_deref()) else {
      debug!(project = %project.project, "no declared version, skipping validation");
      result.skipped.push(project.project.clone());
      continue;
    };
    result.checked.push(project.project.clone());

    for reference in &project.refs {
      if reference.value != version {
        result.mismatches.push(Mismatch {
          project: project.project.clone(),
          expected: version.to_string(),
          found: reference.value.clone(),
          location: reference.location(root),
        });
      }
    }
  }
  result
}

/// What to bump to
#[derive(Clone)]
pub enum BumpTarget {
  Explicit(Version),
  Rule(Arc<dyn VersionRule>),
}

impl BumpTarget {
  /// A version string, or the name of a registered version rule
  pub fn parse(input: &str, registry: &PluginRegistry) -> RailResult<Self> {
    if let Ok(version) = input.parse::<Version>() {
      return Ok(BumpTarget::Explicit(version));
    }
    registry.rule(input).map(BumpTarget::Rule).ok_or_else(|| {
      RailError::with_help(
        format!("'{}' is neither a version nor a version rule", input),
        format!("Rules: {}", registry.names("version-rules").join(", ")),
      )
    })
  }

  /// Next version for a project currently at `current`
  pub fn next(&self, project: &str, current: Option<&str>) -> RailResult<Version> {
    match self {
      BumpTarget::Explicit(version) => Ok(version.clone()),
      BumpTarget::Rule(rule) => {
        let current = current.ok_or_else(|| {
          RailError::with_help(
            format!("cannot apply rule '{}' to {}: it has no declared version", rule.name(), project),
            "Pass an explicit version instead.",
          )
        })?;
        let parsed = current.parse::<Version>().map_err(|e| {
          RailError::message(format!("cannot apply rule '{}' to {} {}: {}", rule.name(), project, current, e))
        })?;
        rule.apply(&parsed)
      }
    }
  }
}

/// Replace one reference's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edit {
  pub reference: VersionRef,
  pub replacement: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectBump {
  pub project: String,
  pub from: Option<String>,
  pub to: String,
  pub refs: usize,
}

/// Every edit of a bump, grouped by project in dependency order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BumpPlan {
  pub projects: Vec<ProjectBump>,
  pub edits: Vec<Edit>,
}

impl BumpPlan {
  /// Target versions, once each
  pub fn versions(&self) -> Vec<&str> {
    let mut versions: Vec<&str> = Vec::new();
    for bump in &self.projects {
      if !versions.contains(&bump.to.as_str()) {
        versions.push(&bump.to);
      }
    }
    versions
  }

  pub fn is_empty(&self) -> bool {
    self.edits.is_empty()
  }
}

/// Plan a bump of `selected` (all projects when empty).
///
/// # Errors
/// - a cycle in the inter-dependency graph
/// - any reference inconsistency among the selected projects
/// - a rule applied to a project without a parsable version
pub fn plan(
  repository: &Repository,
  scanner: &VersionScanner,
  selected: &[String],
  target: &BumpTarget,
) -> RailResult<BumpPlan> {
  let order = repository.topological_order()?;
  let projects: Vec<&Project> = order
    .into_iter()
    .filter(|p| selected.is_empty() || selected.iter().any(|s| repository.project(s).is_some_and(|q| q.name == p.name)))
    .collect();

  for name in selected {
    if repository.project(name).is_none() {
      return Err(RailError::with_help(
        format!("unknown project '{}'", name),
        "Run `pyrail info` to list projects.",
      ));
    }
  }

  let report = scanner.scan(&projects)?;
  if report.has_inconsistencies() {
    return Err(RailError::Validation(ValidationError::Inconsistent {
      count: report.inconsistencies.len(),
    }));
  }

  let mut plan = BumpPlan::default();
  for project in projects {
    let next = target.next(&project.name, project.version.as_deref())?.to_string();
    let refs = report.refs_of(&project.name);
    if refs.is_empty() {
      warn!(project = %project.name, "no version references found, nothing to bump");
    }

    plan.edits.extend(refs.iter().map(|r| Edit {
      reference: r.clone(),
      replacement: next.clone(),
    }));
    plan.projects.push(ProjectBump {
      project: project.name.clone(),
      from: project.version.clone(),
      to: next,
      refs: refs.len(),
    });
  }
  Ok(plan)
}
