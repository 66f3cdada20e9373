//! Structural diff of the unreleased bucket between revisions
//!
//! Entries are compared by id. The diff is only trusted when it is a pure
//! addition: ids removed since the base revision, or ids appearing twice,
//! make the add-set ambiguous.

use crate::changelog::entry::Changelog;
use crate::changelog::store::ChangelogManager;
use crate::core::error::{RailError, RailResult, ResultExt, ValidationError};
use crate::core::vcs::Vcs;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Entry ids added and removed since a base revision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryDiff {
  pub file: PathBuf,
  pub added: Vec<String>,
  pub removed: Vec<String>,
  pub duplicates: Vec<String>,
}

impl EntryDiff {
  /// Whether `added` can be acted on without guessing
  pub fn is_unambiguous(&self) -> bool {
    self.removed.is_empty() && self.duplicates.is_empty()
  }
}

/// Outcome of a PR backfill
#[derive(Debug, Clone, Default, Serialize)]
pub struct PrUpdate {
  pub file: PathBuf,
  pub updated: Vec<String>,
  /// Set when the diff was ambiguous and nothing was touched
  pub skipped: Option<String>,
}

/// Compare the unreleased bucket with its content at `base`
pub fn diff_unreleased(manager: &ChangelogManager, vcs: &dyn Vcs, base: &str) -> RailResult<EntryDiff> {
  let file = manager.unreleased();
  let current = file.load()?;

  let relative = file
    .path
    .strip_prefix(vcs.toplevel())
    .map(PathBuf::from)
    .unwrap_or_else(|_| file.path.clone());
  let previous = match vcs.file_at_revision(base, &relative)? {
    Some(bytes) => {
      let text = String::from_utf8(bytes)?;
      Changelog::parse(&text).with_context(|| format!("Failed to parse {}:{}", base, relative.display()))?
    }
    None => Changelog::default(),
  };

  let base_ids: Vec<&str> = previous.entries.iter().map(|e| e.id.as_str()).collect();
  let head_ids: Vec<&str> = current.entries.iter().map(|e| e.id.as_str()).collect();

  let mut duplicates: Vec<String> = Vec::new();
  for (i, id) in head_ids.iter().enumerate() {
    if head_ids[..i].contains(id) && !duplicates.iter().any(|d| d == id) {
      duplicates.push(id.to_string());
    }
  }

  let diff = EntryDiff {
    file: file.path,
    added: head_ids
      .iter()
      .filter(|id| !base_ids.contains(id))
      .map(|id| id.to_string())
      .collect(),
    removed: base_ids
      .iter()
      .filter(|id| !head_ids.contains(id))
      .map(|id| id.to_string())
      .collect(),
    duplicates,
  };
  debug!(base, added = diff.added.len(), removed = diff.removed.len(), "changelog diff");
  Ok(diff)
}

/// Set `pr` on every entry added since `base`.
///
/// Entries that already carry a PR are kept unless `overwrite` is set.
pub fn update_pr(
  manager: &ChangelogManager,
  vcs: &dyn Vcs,
  base: &str,
  pr: &str,
  overwrite: bool,
  dry: bool,
) -> RailResult<PrUpdate> {
  let diff = diff_unreleased(manager, vcs, base)?;
  let mut update = PrUpdate {
    file: diff.file.clone(),
    ..Default::default()
  };

  if !diff.is_unambiguous() {
    let reason = format!(
      "entries were removed ({}) or duplicated ({}) since {}",
      diff.removed.join(", "),
      diff.duplicates.join(", "),
      base
    );
    warn!(file = %diff.file.display(), "{}", reason);
    update.skipped = Some(reason);
    return Ok(update);
  }

  let current = manager.unreleased().load()?;
  update.updated = current
    .entries
    .iter()
    .filter(|e| diff.added.contains(&e.id))
    .filter(|e| match &e.pr {
      None => true,
      Some(existing) => overwrite && existing != pr,
    })
    .map(|e| e.id.clone())
    .collect();

  if !dry && !update.updated.is_empty() {
    manager.unreleased().set_pr(&update.updated, pr)?;
  }
  Ok(update)
}

/// Fail unless at least one of the buckets gained an entry since `base`.
///
/// Returns the diff of every bucket, including the unchanged ones.
pub fn assert_added(managers: &[ChangelogManager], vcs: &dyn Vcs, base: &str) -> RailResult<Vec<EntryDiff>> {
  let diffs = managers
    .iter()
    .map(|manager| diff_unreleased(manager, vcs, base))
    .collect::<RailResult<Vec<_>>>()?;

  if diffs.iter().all(|diff| diff.added.is_empty()) {
    let files: Vec<String> = diffs.iter().map(|d| d.file.display().to_string()).collect();
    return Err(RailError::Validation(ValidationError::ChangelogDiff {
      message: format!("no changelog entries were added since {} ({})", base, files.join(", ")),
    }));
  }
  Ok(diffs)
}
