//! Version references: discovery, validation, bumping and rewriting
//!
//! - `pep440`: version grammar and ordering
//! - `rules`: bump rules (`major`, `minor`, `patch`, pre-releases)
//! - `patterns`: regexes locating versions in metadata and source files
//! - `scan`: assembles the reference set of every project
//! - `bump`: validate mode and bump planning
//! - `rewrite`: span-local file rewriting

pub mod bump;
pub mod patterns;
pub mod pep440;
pub mod rewrite;
pub mod rules;
pub mod scan;

pub use bump::{BumpPlan, BumpTarget, Mismatch, ValidationReport};
pub use pep440::Version;
pub use scan::{Inconsistency, ScanReport};

use serde::Serialize;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Where a reference came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum RefCategory {
  /// The build backend's own version field
  Declared,
  /// `__version__` in the primary package
  Source,
  /// A `release.references` entry
  Configured,
  /// A constraint on this project written in another project's metadata
  Interdependency { dependent: String },
}

impl fmt::Display for RefCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RefCategory::Declared => write!(f, "declared"),
      RefCategory::Source => write!(f, "source"),
      RefCategory::Configured => write!(f, "configured"),
      RefCategory::Interdependency { dependent } => write!(f, "dependency of {}", dependent),
    }
  }
}

/// A located occurrence of a version string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionRef {
  /// Project whose version this is
  pub project: String,
  pub file: PathBuf,
  /// Byte offsets of the version text in `file`
  pub start: usize,
  pub end: usize,
  /// 1-based line of `start`
  pub line: usize,
  pub value: String,
  pub category: RefCategory,
}

impl VersionRef {
  /// Build a reference from a span of `text`, the content of `file`
  pub fn new(project: &str, file: &Path, text: &str, span: Range<usize>, category: RefCategory) -> Self {
    Self {
      project: project.to_string(),
      file: file.to_path_buf(),
      line: text[..span.start].matches('\n').count() + 1,
      value: text[span.clone()].to_string(),
      start: span.start,
      end: span.end,
      category,
    }
  }

  pub fn span(&self) -> Range<usize> {
    self.start..self.end
  }

  /// `path:line` relative to `root` when possible
  pub fn location(&self, root: &Path) -> String {
    let path = pathdiff::diff_paths(&self.file, root).unwrap_or_else(|| self.file.clone());
    format!("{}:{}", path.display(), self.line)
  }
}
