//! Regexes that locate version strings
//!
//! Inter-dependency patterns capture only the version number in a group named
//! `version`, so rewriting the span keeps the constraint operator as written.

use regex::{Regex, RegexBuilder};
use std::ops::Range;
use std::sync::LazyLock;

/// Constraint operators that may precede a version
const OPERATORS: &str = r"[\^<>=!~*]*";

/// A version number inside a constraint
const VERSION_GROUP: &str = r"(?P<version>\d+(?:\.\w+)*(?:[-+][\w.]+)?)";

/// Top-level `__version__ = "..."` (an optional `: str` annotation is allowed)
pub static DUNDER_VERSION: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"(?m)^__version__[ \t]*(?::[ \t]*str[ \t]*)?=[ \t]*['"]([^'"\n]+)['"]"#).expect("valid pattern")
});

/// A `version = "..."` key inside a TOML table body
pub static TOML_VERSION_KEY: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"(?m)^[ \t]*version[ \t]*=[ \t]*["']([^"'\n]*)["']"#).expect("valid pattern"));

/// A `version = ...` key inside an INI section body
pub static INI_VERSION_KEY: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?m)^version[ \t]*[=:][ \t]*(\S+)[ \t]*$").expect("valid pattern"));

/// Outcome of requiring exactly one match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
  One(Range<usize>),
  Missing,
  Ambiguous(usize),
}

/// Locate capture group 1 of `regex`, requiring exactly one match
pub fn locate_one(regex: &Regex, text: &str) -> Located {
  let spans: Vec<Range<usize>> = regex
    .captures_iter(text)
    .filter_map(|c| c.get(1).map(|m| m.range()))
    .collect();
  match spans.len() {
    0 => Located::Missing,
    1 => Located::One(spans[0].clone()),
    n => Located::Ambiguous(n),
  }
}

/// Locate the first `version =` key of a table, in absolute offsets
pub fn locate_in_section(regex: &Regex, text: &str, section: Range<usize>) -> Option<Range<usize>> {
  let body = &text[section.clone()];
  let caps = regex.captures(body)?;
  let m = caps.get(1)?;
  Some(section.start + m.start()..section.start + m.end())
}

/// Case-insensitive pattern for a distribution name where `-`, `_` and `.` are interchangeable
pub fn name_pattern(name: &str) -> String {
  let mut out = String::from("(?i:");
  let mut last_sep = false;
  for ch in name.chars() {
    if matches!(ch, '-' | '_' | '.') {
      if !last_sep {
        out.push_str("[-_.]+");
      }
      last_sep = true;
    } else {
      out.push_str(&regex::escape(&ch.to_string()));
      last_sep = false;
    }
  }
  out.push(')');
  out
}

fn build(pattern: &str) -> Option<Regex> {
  RegexBuilder::new(pattern).multi_line(true).build().ok()
}

/// Patterns matching constraints on `name` inside a `pyproject.toml`:
/// `name = "^1.2"`, `name = { version = "^1.2" }` and `"name >=1.2"`
pub fn pyproject_dependency_patterns(name: &str) -> Vec<Regex> {
  let n = name_pattern(name);
  [
    format!(r#"^[ \t]*["']?{n}["']?[ \t]*=[ \t]*["'][ \t]*{OPERATORS}[ \t]*{VERSION_GROUP}"#),
    format!(r#"^[ \t]*["']?{n}["']?[ \t]*=[ \t]*\{{[^}}\n]*?\bversion[ \t]*=[ \t]*["'][ \t]*{OPERATORS}[ \t]*{VERSION_GROUP}"#),
    format!(r#"["']{n}[ \t]*(?:\[[^\]"'\n]*\])?[ \t]*\(?[ \t]*[\^<>=!~]+[ \t]*{VERSION_GROUP}"#),
  ]
  .iter()
  .filter_map(|p| build(p))
  .collect()
}

/// Pattern matching `name >= 1.2` entries of `setup.cfg` requirement lists
pub fn setup_cfg_dependency_pattern(name: &str) -> Option<Regex> {
  let n = name_pattern(name);
  build(&format!(
    r"(?:^[ \t]+|=[ \t]*|;[ \t]*){n}[ \t]*(?:\[[^\]\n]*\])?[ \t]*(?:==|>=|<=|~=|!=|>|<)[ \t]*{VERSION_GROUP}"
  ))
}

/// All `version` group spans matched by any of `patterns`, deduplicated and sorted
pub fn version_spans(patterns: &[Regex], text: &str) -> Vec<Range<usize>> {
  let mut spans: Vec<Range<usize>> = patterns
    .iter()
    .flat_map(|re| re.captures_iter(text).filter_map(|c| c.name("version").map(|m| m.range())))
    .collect();
  spans.sort_by_key(|r| (r.start, r.end));
  spans.dedup();
  spans
}

#[cfg(test)]
mod tests {
  use super::*;

  fn values(patterns: &[Regex], text: &str) -> Vec<String> {
    version_spans(patterns, text)
      .into_iter()
      .map(|r| text[r].to_string())
      .collect()
  }

  #[test]
  fn test_dunder_version() {
    let text = "\"\"\"Docs.\"\"\"\n\n__version__ = '1.2.4'\n";
    match locate_one(&DUNDER_VERSION, text) {
      Located::One(r) => assert_eq!(&text[r], "1.2.4"),
      other => panic!("unexpected {:?}", other),
    }
    let twice = "__version__ = '1'\n__version__: str = \"2\"\n";
    assert_eq!(locate_one(&DUNDER_VERSION, twice), Located::Ambiguous(2));
    let nested = "def f():\n    __version__ = '1'\n";
    assert_eq!(locate_one(&DUNDER_VERSION, nested), Located::Missing);
  }

  #[test]
  fn test_name_pattern_normalisation() {
    let re = Regex::new(&format!("^{}$", name_pattern("pkg-a"))).unwrap();
    assert!(re.is_match("pkg_a"));
    assert!(re.is_match("PKG.A"));
    assert!(!re.is_match("pkga"));
  }

  #[test]
  fn test_poetry_constraints() {
    let patterns = pyproject_dependency_patterns("pkg-a");
    let text = "[tool.poetry.dependencies]\npython = \"^3.8\"\npkg-a = \"^1.2.4\"\npkg-ab = \"^9.9.9\"\n";
    assert_eq!(values(&patterns, text), vec!["1.2.4"]);

    let inline = "[tool.poetry.dependencies]\npkg_a = { version = \"~1.2\", develop = true }\n";
    assert_eq!(values(&patterns, inline), vec!["1.2"]);
  }

  #[test]
  fn test_pep508_constraints() {
    let patterns = pyproject_dependency_patterns("pkg-a");
    let text = "[project]\ndependencies = [\n  \"pkg-a >=1.2.4\",\n  \"pkg-a-extra==3.0\",\n  'pkg-a[cli]==1.2.4',\n]\n";
    assert_eq!(values(&patterns, text), vec!["1.2.4", "1.2.4"]);
  }

  #[test]
  fn test_setup_cfg_constraint() {
    let re = setup_cfg_dependency_pattern("pkg-a").unwrap();
    let text = "[options]\ninstall_requires =\n    pkg-a >= 1.2.4\n    requests\n";
    let spans = version_spans(&[re], text);
    assert_eq!(spans.len(), 1);
    assert_eq!(&text[spans[0].clone()], "1.2.4");
  }

  #[test]
  fn test_locate_in_section() {
    let text = "[project]\nname = \"x\"\n\n[tool.other]\nversion = \"9\"\n";
    let section = crate::project::pyproject::section_range(text, "project").unwrap();
    assert!(locate_in_section(&TOML_VERSION_KEY, text, section).is_none());
  }
}
