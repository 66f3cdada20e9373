//! Changelog rendering
//!
//! [`ChangelogView::lines`] yields formatted lines lazily. The view holds the
//! parsed buckets, so the sequence can be restarted by calling `lines` again.

use crate::changelog::entry::{Changelog, ChangelogEntry};
use crate::changelog::store::ChangelogFile;
use crate::core::error::RailResult;
use anstyle::{AnsiColor, Color, Effects, Style};
use regex::Regex;
use std::sync::LazyLock;

static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
  /// ANSI-styled text
  Terminal { color: bool },
  /// HTML tables inside Markdown sections
  Markdown,
}

/// Buckets in render order
pub struct ChangelogView {
  buckets: Vec<(ChangelogFile, Changelog)>,
}

impl ChangelogView {
  /// Parse `files` in the order given
  pub fn load(files: Vec<ChangelogFile>) -> RailResult<Self> {
    let buckets = files
      .into_iter()
      .map(|file| {
        let content = file.load()?;
        Ok((file, content))
      })
      .collect::<RailResult<Vec<_>>>()?;
    Ok(Self { buckets })
  }

  pub fn is_empty(&self) -> bool {
    self.buckets.is_empty()
  }

  /// All lines of all buckets
  pub fn lines(&self, format: Format) -> impl Iterator<Item = String> + '_ {
    self.buckets.iter().enumerate().flat_map(move |(index, (file, changelog))| {
      let separator = (index > 0).then(String::new);
      separator
        .into_iter()
        .chain(header(file, changelog, format))
        .chain(changelog.entries.iter().map(move |entry| entry_line(entry, format)))
        .chain(footer(changelog, format))
    })
  }
}

fn styles(format: Format) -> (Style, Style, Style, Style) {
  match format {
    Format::Terminal { color: true } => (
      Style::new().effects(Effects::BOLD),
      Style::new()
        .fg_color(Some(Color::Ansi(AnsiColor::Cyan)))
        .effects(Effects::ITALIC),
      Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
      Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))),
    ),
    _ => (Style::new(), Style::new(), Style::new(), Style::new()),
  }
}

fn header(file: &ChangelogFile, changelog: &Changelog, format: Format) -> Vec<String> {
  let title = match (&file.version, changelog.release_date) {
    (Some(version), Some(date)) => format!("{} ({})", version, date.format("%Y-%m-%d")),
    _ => file.label().to_string(),
  };
  match format {
    Format::Terminal { .. } => {
      let (bold, ..) = styles(format);
      vec![format!("{bold}{title}{bold:#}")]
    }
    Format::Markdown if changelog.entries.is_empty() => vec![format!("## {}", title)],
    Format::Markdown => vec![
      format!("## {}", title),
      String::new(),
      "<table><tr><th>Type</th><th>Description</th><th>PR</th><th>Issues</th><th>Author</th></tr>".to_string(),
    ],
  }
}

fn footer(changelog: &Changelog, format: Format) -> Option<String> {
  (format == Format::Markdown && !changelog.entries.is_empty()).then(|| "</table>".to_string())
}

fn entry_line(entry: &ChangelogEntry, format: Format) -> String {
  match format {
    Format::Terminal { .. } => {
      let (_, kind, author, code) = styles(format);
      let description = INLINE_CODE.replace_all(&entry.description, format!("{code}$1{code:#}"));
      format!(
        "  {kind}{}{kind:#} - {} ({author}{}{author:#})",
        entry.types.join(", "),
        description,
        entry.authors.join(", ")
      )
    }
    Format::Markdown => {
      let pr = entry.pr.as_deref().map(anchor).unwrap_or_default();
      let issues: Vec<String> = entry.issues.iter().map(|i| anchor(i)).collect();
      format!(
        "  <tr><td>{}</td><td>\n\n{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
        entry.types.iter().map(|t| capitalize(t)).collect::<Vec<_>>().join(", "),
        entry.description,
        pr,
        issues.join(", "),
        entry.authors.join(", ")
      )
    }
  }
}

/// `<a>` whose text is the last path segment (the issue or PR number)
fn anchor(url: &str) -> String {
  let text = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
  format!("<a href=\"{}\">{}</a>", url, text)
}

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::changelog::store::ChangelogManager;
  use std::fs;
  use tempfile::TempDir;

  fn view() -> (TempDir, ChangelogView) {
    let dir = TempDir::new().unwrap();
    let manager = ChangelogManager::new(dir.path().to_path_buf(), vec!["fix".to_string()]);
    fs::write(
      manager.unreleased().path,
      "[[entries]]\nid = \"a\"\ntype = \"fix\"\ndescription = \"Fix `foo`\"\nauthor = \"me\"\nissues = [\"https://github.com/o/r/issues/3\"]\n",
    )
    .unwrap();
    fs::write(
      manager.version("1.0.0").path,
      "release-date = \"2026-10-18\"\n\n[[entries]]\nid = \"b\"\ntype = \"fix\"\ndescription = \"Older\"\nauthor = \"you\"\n",
    )
    .unwrap();
    let view = ChangelogView::load(manager.all().unwrap()).unwrap();
    (dir, view)
  }

  #[test]
  fn test_plain_terminal_lines() {
    let (_dir, view) = view();
    let lines: Vec<String> = view.lines(Format::Terminal { color: false }).collect();
    assert_eq!(
      lines,
      vec![
        "Unreleased",
        "  fix - Fix foo (me)",
        "",
        "1.0.0 (2026-10-18)",
        "  fix - Older (you)",
      ]
    );
  }

  #[test]
  fn test_lines_restart() {
    let (_dir, view) = view();
    let first: Vec<String> = view.lines(Format::Markdown).collect();
    let second: Vec<String> = view.lines(Format::Markdown).collect();
    assert_eq!(first, second);
    assert_eq!(first[0], "## Unreleased");
    assert!(first[3].contains("<a href=\"https://github.com/o/r/issues/3\">3</a>"));
    assert!(first.iter().any(|l| l == "## 1.0.0 (2026-10-18)"));
  }

  #[test]
  fn test_lazy_take() {
    let (_dir, view) = view();
    assert_eq!(view.lines(Format::Terminal { color: true }).take(1).count(), 1);
  }
}
