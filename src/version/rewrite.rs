//! Span-local rewriting of version references
//!
//! Each file is read once, every span is checked against the value recorded
//! at discovery, and replacements are applied from the highest offset down so
//! earlier offsets stay valid. Bytes outside the spans are never touched.
//!
//! There is no rollback: when a file fails, the error lists the references
//! already written and those not reached.

use crate::core::error::{RailError, RailResult};
use crate::version::bump::Edit;
use similar::TextDiff;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Edits of one file, in discovery order
struct FileEdits<'a> {
  file: PathBuf,
  edits: Vec<&'a Edit>,
}

fn group_by_file(edits: &[Edit]) -> Vec<FileEdits<'_>> {
  let mut groups: Vec<FileEdits> = Vec::new();
  for edit in edits {
    match groups.iter_mut().find(|g| g.file == edit.reference.file) {
      Some(group) => group.edits.push(edit),
      None => groups.push(FileEdits {
        file: edit.reference.file.clone(),
        edits: vec![edit],
      }),
    }
  }
  groups
}

/// Content of `group.file` with every edit applied
fn render(group: &FileEdits) -> RailResult<(String, String)> {
  let original = fs::read_to_string(&group.file)?;

  let mut edits = group.edits.clone();
  edits.sort_by_key(|e| std::cmp::Reverse(e.reference.start));

  let mut content = original.clone();
  let mut floor = usize::MAX;
  for edit in edits {
    let reference = &edit.reference;
    let current = original.get(reference.span());
    if current != Some(reference.value.as_str()) {
      return Err(RailError::with_help(
        format!(
          "version reference at {}:{} changed since it was discovered (expected '{}')",
          group.file.display(),
          reference.line,
          reference.value
        ),
        "Re-run the command on an unmodified working tree.",
      ));
    }
    if reference.end > floor {
      return Err(RailError::message(format!(
        "overlapping version references in {}",
        group.file.display()
      )));
    }
    content.replace_range(reference.span(), &edit.replacement);
    floor = reference.start;
  }
  Ok((original, content))
}

/// Write all edits; returns the files changed, in first-seen order
pub fn apply(edits: &[Edit], root: &Path) -> RailResult<Vec<PathBuf>> {
  let groups = group_by_file(edits);
  let mut written: Vec<PathBuf> = Vec::new();

  for (index, group) in groups.iter().enumerate() {
    let result = render(group).and_then(|(_, content)| fs::write(&group.file, content).map_err(RailError::from));
    if let Err(cause) = result {
      if written.is_empty() {
        return Err(cause);
      }
      let locations = |groups: &[FileEdits]| -> Vec<String> {
        groups
          .iter()
          .flat_map(|g| g.edits.iter().map(|e| e.reference.location(root)))
          .collect()
      };
      return Err(RailError::PartialRewrite {
        rewritten: locations(&groups[..index]),
        pending: locations(&groups[index..]),
        cause: Box::new(cause),
      });
    }
    debug!(file = %group.file.display(), refs = group.edits.len(), "rewrote");
    written.push(group.file.clone());
  }
  Ok(written)
}

/// Unified diffs of what [`apply`] would write
pub fn preview(edits: &[Edit], root: &Path) -> RailResult<Vec<(PathBuf, String)>> {
  group_by_file(edits)
    .iter()
    .map(|group| {
      let (original, content) = render(group)?;
      let path = pathdiff::diff_paths(&group.file, root).unwrap_or_else(|| group.file.clone());
      let from = format!("a/{}", path.display());
      let to = format!("b/{}", path.display());
      let diff = TextDiff::from_lines(&original, &content)
        .unified_diff()
        .context_radius(1)
        .header(&from, &to)
        .to_string();
      Ok((group.file.clone(), diff))
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::plugins::release::builtin_release_plugins;
  use crate::testing::{monorepo, registry};
  use crate::version::bump::{BumpTarget, plan};
  use crate::version::scan::VersionScanner;
  use crate::version::{RefCategory, VersionRef};

  fn edit(file: &Path, text: &str, needle: &str, replacement: &str) -> Edit {
    let start = text.find(needle).unwrap();
    Edit {
      reference: VersionRef::new("p", file, text, start..start + needle.len(), RefCategory::Declared),
      replacement: replacement.to_string(),
    }
  }

  #[test]
  fn test_rewrite_is_local() {
    let (dir, repo) = monorepo();
    let file_a = dir.path().join("a/pyproject.toml");
    let file_b = dir.path().join("b/pyproject.toml");
    let before_a = fs::read_to_string(&file_a).unwrap();
    let before_b = fs::read_to_string(&file_b).unwrap();

    let scanner = VersionScanner::new(&repo, builtin_release_plugins());
    let target = BumpTarget::parse("1.3.0", &registry()).unwrap();
    let plan = plan(&repo, &scanner, &["pkg-a".to_string()], &target).unwrap();
    let files = apply(&plan.edits, &repo.root).unwrap();
    assert_eq!(files.len(), 3);

    let after_a = fs::read_to_string(&file_a).unwrap();
    assert_eq!(after_a, before_a.replacen("version = \"1.2.4\"", "version = \"1.3.0\"", 1));

    // the constraint keeps its operator; pkg-b's own version is untouched
    let after_b = fs::read_to_string(&file_b).unwrap();
    assert_eq!(after_b, before_b.replace("pkg-a = \"^1.2.4\"", "pkg-a = \"^1.3.0\""));
    assert!(after_b.contains("version = \"0.3.0\""));

    // discovery on the rewritten tree finds the same locations
    let repo = crate::project::Repository::discover(dir.path(), &registry()).unwrap();
    let scanner = VersionScanner::new(&repo, builtin_release_plugins());
    let refs = scanner.scan_all().unwrap();
    let spans: Vec<_> = refs.refs_of("pkg-a").iter().map(|r| (r.file.clone(), r.value.clone())).collect();
    assert_eq!(spans.len(), 3);
    assert!(spans.iter().all(|(_, v)| v == "1.3.0"));
  }

  #[test]
  fn test_stale_reference_is_rejected() {
    let (dir, _repo) = monorepo();
    let file = dir.path().join("a/pyproject.toml");
    let text = fs::read_to_string(&file).unwrap();
    let stale = edit(&file, &text, "1.2.4", "2.0.0");
    fs::write(&file, text.replace("1.2.4", "1.2.9")).unwrap();

    assert!(apply(&[stale], dir.path()).is_err());
    assert!(fs::read_to_string(&file).unwrap().contains("1.2.9"));
  }

  #[test]
  fn test_partial_rewrite_reports_progress() {
    let (dir, _repo) = monorepo();
    let good = dir.path().join("a/pyproject.toml");
    let bad = dir.path().join("b/pyproject.toml");
    let good_text = fs::read_to_string(&good).unwrap();
    let bad_text = fs::read_to_string(&bad).unwrap();
    let edits = vec![
      edit(&good, &good_text, "1.2.4", "1.3.0"),
      edit(&bad, &bad_text, "0.3.0", "0.4.0"),
    ];
    fs::write(&bad, bad_text.replace("0.3.0", "0.3.5")).unwrap();

    match apply(&edits, dir.path()).unwrap_err() {
      RailError::PartialRewrite { rewritten, pending, .. } => {
        assert_eq!(rewritten, vec!["a/pyproject.toml:3"]);
        assert_eq!(pending, vec!["b/pyproject.toml:3"]);
      }
      other => panic!("unexpected error: {}", other),
    }
    assert!(fs::read_to_string(&good).unwrap().contains("1.3.0"));
  }

  #[test]
  fn test_preview_leaves_files_alone() {
    let (dir, _repo) = monorepo();
    let file = dir.path().join("a/pyproject.toml");
    let text = fs::read_to_string(&file).unwrap();
    let diffs = preview(&[edit(&file, &text, "1.2.4", "1.3.0")], dir.path()).unwrap();

    assert_eq!(diffs.len(), 1);
    assert!(diffs[0].1.contains("--- a/a/pyproject.toml"));
    assert!(diffs[0].1.contains("-version = \"1.2.4\""));
    assert!(diffs[0].1.contains("+version = \"1.3.0\""));
    assert_eq!(fs::read_to_string(&file).unwrap(), text);
  }
}
