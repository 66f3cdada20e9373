//! Version bump rules
//!
//! Rules are plugins in the `version-rules` group so they can be listed,
//! disabled and extended like any other capability. A rule applied to a
//! pre-release of the version it would produce finalises that pre-release
//! (`1.3.0a1` + `minor` = `1.3.0`).

use crate::core::error::RailResult;
use crate::plugins::{Plugin, VersionRule};
use crate::version::pep440::{PreKind, Version};
use std::sync::Arc;

/// Numeric position a rule increments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
  Major = 0,
  Minor = 1,
  Patch = 2,
}

/// Increment `position`, zero everything after it and drop all suffixes
fn increment(current: &Version, position: Position, pre: Option<(PreKind, u64)>) -> RailResult<Version> {
  let index = position as usize;
  let mut release = current.padded(3);

  // a fresh pre-release target never takes the finalising shortcut
  let finalises = pre.is_none() && current.is_prerelease() && release[index + 1..].iter().all(|&c| c == 0);
  if !finalises {
    release[index] += 1;
    for c in release.iter_mut().skip(index + 1) {
      *c = 0;
    }
  }

  Version::from_parts(current.epoch(), &release, pre)
}

/// `major` / `minor` / `patch`
pub struct IncrementRule {
  name: &'static str,
  position: Position,
  pre: bool,
}

impl Plugin for IncrementRule {
  fn name(&self) -> &str {
    self.name
  }

  fn description(&self) -> &str {
    match (self.position, self.pre) {
      (Position::Major, false) => "Increment the major version, reset minor and patch",
      (Position::Minor, false) => "Increment the minor version, reset patch",
      (Position::Patch, false) => "Increment the patch version",
      (Position::Major, true) => "Next major version as alpha 0",
      (Position::Minor, true) => "Next minor version as alpha 0",
      (Position::Patch, true) => "Next patch version as alpha 0",
    }
  }
}

impl VersionRule for IncrementRule {
  fn apply(&self, current: &Version) -> RailResult<Version> {
    let pre = self.pre.then_some((PreKind::Alpha, 0));
    increment(current, self.position, pre)
  }
}

/// `prerelease`: bump the pre-release number, or start `a0` on the next patch
pub struct PrereleaseRule;

impl Plugin for PrereleaseRule {
  fn name(&self) -> &str {
    "prerelease"
  }

  fn description(&self) -> &str {
    "Increment the pre-release number, or start a0 on the next patch"
  }
}

impl VersionRule for PrereleaseRule {
  fn apply(&self, current: &Version) -> RailResult<Version> {
    match current.pre() {
      Some((kind, n)) => Version::from_parts(current.epoch(), current.release(), Some((kind, n + 1))),
      // a development release of the upcoming version
      None if current.is_prerelease() => {
        Version::from_parts(current.epoch(), current.release(), Some((PreKind::Alpha, 0)))
      }
      None => increment(current, Position::Patch, Some((PreKind::Alpha, 0))),
    }
  }
}

/// Built-in rules in registry order
pub fn builtin_rules() -> Vec<Arc<dyn VersionRule>> {
  let rule = |name, position, pre| Arc::new(IncrementRule { name, position, pre }) as Arc<dyn VersionRule>;
  vec![
    rule("major", Position::Major, false),
    rule("premajor", Position::Major, true),
    rule("minor", Position::Minor, false),
    rule("preminor", Position::Minor, true),
    rule("patch", Position::Patch, false),
    rule("prepatch", Position::Patch, true),
    Arc::new(PrereleaseRule),
  ]
}
