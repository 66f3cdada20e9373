//! PEP 440 versions
//!
//! Parsing, normalisation and ordering come from `pep440_rs`; this wrapper
//! adds the release arithmetic the bump rules need and maps parse failures
//! onto [`RailError`]. `Display` prints the normalised form, so
//! `v1.0-beta.1` becomes `1.0b1`.

use crate::core::error::{RailError, RailResult};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Pre-release phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PreKind {
  Alpha,
  Beta,
  Rc,
}

impl PreKind {
  fn as_str(self) -> &'static str {
    match self {
      PreKind::Alpha => "a",
      PreKind::Beta => "b",
      PreKind::Rc => "rc",
    }
  }
}

/// A parsed, normalised version
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(pep440_rs::Version);

impl Version {
  /// Build `epoch!release` with an optional pre-release segment
  pub fn from_parts(epoch: u64, release: &[u64], pre: Option<(PreKind, u64)>) -> RailResult<Self> {
    let mut text = release_text(epoch, release);
    if let Some((kind, n)) = pre {
      text.push_str(&format!("{}{}", kind.as_str(), n));
    }
    text.parse()
  }

  pub fn epoch(&self) -> u64 {
    self.0.epoch()
  }

  pub fn release(&self) -> &[u64] {
    self.0.release()
  }

  /// Numeric component `index`, zero when missing
  pub fn component(&self, index: usize) -> u64 {
    self.release().get(index).copied().unwrap_or(0)
  }

  /// Release components padded with zeros to at least `len`
  pub fn padded(&self, len: usize) -> Vec<u64> {
    let mut release = self.release().to_vec();
    if release.len() < len {
      release.resize(len, 0);
    }
    release
  }

  /// `a`, `b` or `rc` segment with its number
  pub fn pre(&self) -> Option<(PreKind, u64)> {
    let text = self.0.to_string();
    let rest = text.strip_prefix(&release_text(self.epoch(), self.release()))?;
    let (kind, rest) = if let Some(rest) = rest.strip_prefix("rc") {
      (PreKind::Rc, rest)
    } else if let Some(rest) = rest.strip_prefix('a') {
      (PreKind::Alpha, rest)
    } else if let Some(rest) = rest.strip_prefix('b') {
      (PreKind::Beta, rest)
    } else {
      return None;
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    Some((kind, digits.parse().ok()?))
  }

  /// Pre-release or development release
  pub fn is_prerelease(&self) -> bool {
    self.0.any_prerelease()
  }
}

/// Normalised `epoch!release` prefix, epoch omitted when zero
fn release_text(epoch: u64, release: &[u64]) -> String {
  let release: Vec<String> = release.iter().map(u64::to_string).collect();
  match epoch {
    0 => release.join("."),
    epoch => format!("{}!{}", epoch, release.join(".")),
  }
}

impl FromStr for Version {
  type Err = RailError;

  fn from_str(s: &str) -> RailResult<Self> {
    pep440_rs::Version::from_str(s.trim()).map(Version).map_err(|e| {
      RailError::with_help(
        format!("'{}' is not a valid version: {}", s, e),
        "Versions look like 1.2.3, 1.2.3a1, 1.2.3.post1 or 1.2.3.dev0.",
      )
    })
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl Serialize for Version {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}
