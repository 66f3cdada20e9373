//! One-file-per-bucket changelog storage
//!
//! Entries accumulate in `_unreleased.toml`. A release moves that content to
//! `<version>.toml` with a `release-date` and leaves an empty unreleased file.
//! Writes go through `toml_edit` documents so existing formatting survives.

use crate::changelog::entry::{Changelog, ChangelogEntry};
use crate::core::config::ChangelogConfig;
use crate::core::error::{RailError, RailResult, ResultExt, ValidationError};
use crate::core::host::{RepositoryHost, require_url};
use crate::core::vcs::Vcs;
use crate::project::Project;
use crate::version::Version;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::fs;
use std::path::PathBuf;
use toml_edit::{Array, ArrayOfTables, DocumentMut, Item, Table, value};
use tracing::{debug, info};

pub const UNRELEASED_FILE: &str = "_unreleased.toml";

/// A bucket file on disk, which may not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogFile {
  pub path: PathBuf,
  /// `None` for the unreleased bucket
  pub version: Option<String>,
}

impl ChangelogFile {
  pub fn exists(&self) -> bool {
    self.path.is_file()
  }

  pub fn label(&self) -> &str {
    self.version.as_deref().unwrap_or("Unreleased")
  }

  /// Parsed content; a missing file is an empty bucket
  pub fn load(&self) -> RailResult<Changelog> {
    if !self.exists() {
      return Ok(Changelog::default());
    }
    let text = fs::read_to_string(&self.path)?;
    Changelog::parse(&text).with_context(|| format!("Failed to parse {}", self.path.display()))
  }

  fn document(&self) -> RailResult<DocumentMut> {
    if !self.exists() {
      return Ok(DocumentMut::new());
    }
    let text = fs::read_to_string(&self.path)?;
    text
      .parse::<DocumentMut>()
      .map_err(RailError::from)
      .with_context(|| format!("Failed to parse {}", self.path.display()))
  }

  fn write(&self, doc: &DocumentMut) -> RailResult<()> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(&self.path, doc.to_string())?;
    Ok(())
  }

  /// Set `pr` on the entries with the given ids, keeping everything else as written
  pub fn set_pr(&self, ids: &[String], pr: &str) -> RailResult<usize> {
    let mut doc = self.document()?;
    let mut updated = 0;
    if let Some(entries) = doc.get_mut("entries").and_then(Item::as_array_of_tables_mut) {
      for table in entries.iter_mut() {
        let id = table.get("id").and_then(Item::as_str).unwrap_or_default();
        if ids.iter().any(|wanted| wanted == id) {
          table["pr"] = value(pr);
          updated += 1;
        }
      }
    }
    if updated > 0 {
      self.write(&doc)?;
    }
    Ok(updated)
  }
}

/// Fields of an entry to add; missing values are resolved by the manager
#[derive(Debug, Clone, Default)]
pub struct NewEntry {
  pub types: Vec<String>,
  pub description: String,
  pub author: Option<String>,
  pub issues: Vec<String>,
  pub pr: Option<String>,
}

/// A rule broken by a stored entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
  pub file: PathBuf,
  pub entry: Option<String>,
  pub message: String,
}

/// Manages the bucket files of one changelog directory
pub struct ChangelogManager<'a> {
  pub directory: PathBuf,
  pub valid_types: Vec<String>,
  pub enabled: bool,
  host: Option<&'a dyn RepositoryHost>,
}

impl<'a> ChangelogManager<'a> {
  pub fn new(directory: PathBuf, valid_types: Vec<String>) -> Self {
    Self {
      directory,
      valid_types,
      enabled: true,
      host: None,
    }
  }

  /// Manager for an already resolved changelog directory
  pub fn from_config(directory: PathBuf, config: &ChangelogConfig) -> Self {
    Self {
      directory,
      valid_types: config.valid_types.clone(),
      enabled: config.enabled,
      host: None,
    }
  }

  /// Manager for `<project>/<changelog.directory>`
  pub fn for_project(project: &Project) -> Self {
    Self::from_config(project.changelog_directory(), &project.config().changelog)
  }

  pub fn with_host(mut self, host: Option<&'a dyn RepositoryHost>) -> Self {
    self.host = host;
    self
  }

  pub fn unreleased(&self) -> ChangelogFile {
    ChangelogFile {
      path: self.directory.join(UNRELEASED_FILE),
      version: None,
    }
  }

  pub fn version(&self, version: &str) -> ChangelogFile {
    ChangelogFile {
      path: self.directory.join(format!("{}.toml", version)),
      version: Some(version.to_string()),
    }
  }

  /// Existing buckets: unreleased first, then releases newest first
  pub fn all(&self) -> RailResult<Vec<ChangelogFile>> {
    if !self.directory.is_dir() {
      return Ok(Vec::new());
    }

    let mut released: Vec<ChangelogFile> = Vec::new();
    for entry in fs::read_dir(&self.directory)? {
      let path = entry?.path();
      let is_toml = path.extension().is_some_and(|e| e == "toml");
      let is_unreleased = path.file_name().is_some_and(|n| n == UNRELEASED_FILE);
      if !is_toml || is_unreleased {
        continue;
      }
      if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
        released.push(self.version(stem));
      }
    }
    released.sort_by(|a, b| compare_versions(b.label(), a.label()));

    let unreleased = self.unreleased();
    let mut all = Vec::with_capacity(released.len() + 1);
    if unreleased.exists() {
      all.push(unreleased);
    }
    all.extend(released);
    Ok(all)
  }

  fn check_types(&self, types: &[String]) -> RailResult<()> {
    if types.is_empty() {
      return Err(RailError::with_help(
        "a changelog entry needs at least one type",
        format!("Valid types: {}", self.valid_types.join(", ")),
      ));
    }
    for change_type in types {
      if !self.valid_types.contains(change_type) {
        return Err(RailError::with_help(
          format!("unknown changelog type '{}'", change_type),
          format!("Valid types: {}", self.valid_types.join(", ")),
        ));
      }
    }
    Ok(())
  }

  fn issue_url(&self, reference: &str) -> RailResult<String> {
    match self.host {
      Some(host) => host.issue_url(reference),
      None => require_url(reference),
    }
  }

  /// Resolve a PR reference through the host, or require a URL
  pub fn pr_url(&self, reference: &str) -> RailResult<String> {
    match self.host {
      Some(host) => host.pr_url(reference),
      None => require_url(reference),
    }
  }

  /// Validate, complete and append an entry to the unreleased bucket.
  ///
  /// Nothing is written unless every field is valid.
  pub fn add(&self, new: NewEntry, vcs: Option<&dyn Vcs>) -> RailResult<ChangelogEntry> {
    if !self.enabled {
      return Err(RailError::with_help(
        format!("the changelog in {} is disabled", self.directory.display()),
        "Set changelog.enabled = true for this project.",
      ));
    }
    self.check_types(&new.types)?;
    if new.description.trim().is_empty() {
      return Err(RailError::message("a changelog entry needs a description"));
    }

    let author = match new.author {
      Some(author) => author,
      None => vcs
        .map(|v| v.author())
        .transpose()?
        .and_then(|a| a.identifier().map(str::to_string))
        .ok_or_else(|| {
          RailError::with_help(
            "cannot determine the changelog author",
            "Pass --author or configure git user.email.",
          )
        })?,
    };

    let issues = new
      .issues
      .iter()
      .map(|i| self.issue_url(i))
      .collect::<RailResult<Vec<_>>>()?;
    let pr = new.pr.as_deref().map(|p| self.pr_url(p)).transpose()?;

    let unreleased = self.unreleased();
    let existing = unreleased.load()?;
    let entry = ChangelogEntry {
      id: fresh_id(&existing),
      types: new.types,
      description: new.description,
      authors: vec![author],
      issues,
      pr,
    };

    let mut doc = unreleased.document()?;
    let entries = doc
      .entry("entries")
      .or_insert_with(|| Item::ArrayOfTables(ArrayOfTables::new()));
    let Some(entries) = entries.as_array_of_tables_mut() else {
      return Err(RailError::message(format!(
        "'entries' in {} is not an array of tables",
        unreleased.path.display()
      )));
    };
    entries.push(entry_table(&entry));
    unreleased.write(&doc)?;

    info!(id = %entry.id, file = %unreleased.path.display(), "changelog entry added");
    Ok(entry)
  }

  /// Check the unreleased bucket, or every bucket when `all` is set.
  ///
  /// All violations are collected.
  pub fn validate(&self, all: bool) -> RailResult<Vec<Violation>> {
    let files = if all {
      self.all()?
    } else {
      let unreleased = self.unreleased();
      if unreleased.exists() { vec![unreleased] } else { Vec::new() }
    };

    let mut violations = Vec::new();
    for file in files {
      let changelog = match file.load() {
        Ok(changelog) => changelog,
        Err(err) => {
          violations.push(Violation {
            file: file.path.clone(),
            entry: None,
            message: err.to_string(),
          });
          continue;
        }
      };
      violations.extend(self.validate_bucket(&file, &changelog));
    }
    debug!(violations = violations.len(), all, "changelog validated");
    Ok(violations)
  }

  fn validate_bucket(&self, file: &ChangelogFile, changelog: &Changelog) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut push = |entry: Option<&str>, message: String| {
      violations.push(Violation {
        file: file.path.clone(),
        entry: entry.map(str::to_string),
        message,
      })
    };

    match (&file.version, changelog.release_date) {
      (Some(_), None) => push(None, "released changelog has no release-date".to_string()),
      (None, Some(_)) => push(None, "unreleased changelog must not have a release-date".to_string()),
      _ => {}
    }

    let mut seen: Vec<&str> = Vec::new();
    for (index, entry) in changelog.entries.iter().enumerate() {
      let label = if entry.id.is_empty() {
        format!("#{}", index + 1)
      } else {
        entry.id.clone()
      };
      let label = Some(label.as_str());

      if entry.id.trim().is_empty() {
        push(label, "missing id".to_string());
      } else if seen.contains(&entry.id.as_str()) {
        push(label, format!("duplicate id '{}'", entry.id));
      } else {
        seen.push(&entry.id);
      }

      if entry.types.is_empty() {
        push(label, "missing type".to_string());
      }
      for change_type in &entry.types {
        if !self.valid_types.contains(change_type) {
          push(label, format!("unknown type '{}'", change_type));
        }
      }
      if entry.description.trim().is_empty() {
        push(label, "missing description".to_string());
      }
      if entry.authors.iter().all(|a| a.trim().is_empty()) {
        push(label, "missing author".to_string());
      }
    }
    violations
  }

  /// Like [`validate`](Self::validate) but fails on any violation
  pub fn require_valid(&self, all: bool) -> RailResult<()> {
    let violations = self.validate(all)?;
    if violations.is_empty() {
      Ok(())
    } else {
      Err(RailError::Validation(ValidationError::Changelog {
        count: violations.len(),
      }))
    }
  }

  /// Move the unreleased bucket to `version`, dated `date`.
  ///
  /// Returns the touched files, or `None` when nothing is unreleased.
  pub fn release(&self, version: &str, date: NaiveDate) -> RailResult<Option<(PathBuf, PathBuf)>> {
    let unreleased = self.unreleased();
    if !unreleased.exists() {
      return Ok(None);
    }
    let target = self.version(version);
    if target.exists() {
      return Err(RailError::with_help(
        format!("changelog for version {} already exists", version),
        format!("Remove or rename {} first.", target.path.display()),
      ));
    }

    let mut doc = unreleased.document()?;
    doc.insert("release-date", value(date.format("%Y-%m-%d").to_string()));
    target.write(&doc)?;
    unreleased.write(&DocumentMut::new())?;

    info!(version, file = %target.path.display(), "changelog released");
    Ok(Some((unreleased.path, target.path)))
  }
}

/// 8 hex characters, unique within the bucket
fn fresh_id(existing: &Changelog) -> String {
  loop {
    let id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
    if existing.entry(&id).is_none() {
      return id;
    }
  }
}

fn string_array<'s>(values: impl IntoIterator<Item = &'s String>) -> Array {
  values.into_iter().map(String::as_str).collect()
}

fn entry_table(entry: &ChangelogEntry) -> Table {
  let mut table = Table::new();
  table["id"] = value(entry.id.as_str());
  table["type"] = value(string_array(&entry.types));
  table["description"] = value(entry.description.as_str());
  table["author"] = value(string_array(&entry.authors));
  if !entry.issues.is_empty() {
    table["issues"] = value(string_array(&entry.issues));
  }
  if let Some(pr) = &entry.pr {
    table["pr"] = value(pr.as_str());
  }
  table
}

/// PEP 440 order, falling back to text for unparsable names
fn compare_versions(a: &str, b: &str) -> Ordering {
  match (a.parse::<Version>(), b.parse::<Version>()) {
    (Ok(a), Ok(b)) => a.cmp(&b),
    _ => a.cmp(b),
  }
}
