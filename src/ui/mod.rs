//! Terminal output shared by commands
//!
//! Reports are built by library code; these helpers only print them.

use crate::changelog::Violation;
use crate::plugins::{CheckResult, Severity};
use crate::version::{Inconsistency, Mismatch};
use std::path::Path;

/// Icon for a check outcome
pub fn check_icon(result: &CheckResult) -> &'static str {
  match (result.passed, result.severity) {
    (true, _) => "✅",
    (false, Severity::Error) => "🚫",
    (false, Severity::Warning) => "⚠️ ",
    (false, Severity::Info) => "ℹ️ ",
  }
}

pub fn print_check_results(results: &[CheckResult]) {
  let failed = results.iter().filter(|r| !r.passed).count();
  let errors = results.iter().filter(|r| r.is_blocking()).count();

  println!("📋 Checks");
  println!();
  if failed == 0 {
    println!("✅ All checks passed ({} total)", results.len());
    println!();
  } else {
    println!("⚠️  {} issue(s) found", failed);
    if errors > 0 {
      println!("   🚫 {} error(s)", errors);
    }
    if failed > errors {
      println!("   ⚠️  {} warning(s)", failed - errors);
    }
    println!();
  }

  for result in results {
    let scope = result.project.as_deref().map(|p| format!(" [{}]", p)).unwrap_or_default();
    println!("{} {}{} - {}", check_icon(result), result.check_name, scope, result.message);
    if let Some(suggestion) = &result.suggestion {
      println!("   💡 {}", suggestion);
    }
    if let Some(entries) = result
      .details
      .as_ref()
      .and_then(|d| d.get("entries"))
      .and_then(|e| e.as_array())
    {
      for entry in entries.iter().filter_map(|e| e.as_str()) {
        println!("      - {}", entry);
      }
    }
  }
}

pub fn print_inconsistencies(inconsistencies: &[Inconsistency], root: &Path) {
  println!("🚫 {} inconsistent version reference(s)", inconsistencies.len());
  for issue in inconsistencies {
    let file = issue
      .file
      .as_ref()
      .map(|f| pathdiff::diff_paths(f, root).unwrap_or_else(|| f.clone()))
      .map(|f| format!(" ({})", f.display()))
      .unwrap_or_default();
    println!("   {} [{}]{}: {}", issue.project, issue.category, file, issue.message);
  }
}

pub fn print_mismatches(mismatches: &[Mismatch]) {
  println!("🚫 {} version mismatch(es)", mismatches.len());
  for m in mismatches {
    println!("   {}: expected {}, found {} at {}", m.project, m.expected, m.found, m.location);
  }
}

pub fn print_violations(violations: &[Violation], root: &Path) {
  println!("🚫 {} changelog problem(s)", violations.len());
  for v in violations {
    let file = pathdiff::diff_paths(&v.file, root).unwrap_or_else(|| v.file.clone());
    match &v.entry {
      Some(id) => println!("   {} [{}]: {}", file.display(), id, v.message),
      None => println!("   {}: {}", file.display(), v.message),
    }
  }
}
