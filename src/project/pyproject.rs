//! Read-only views over `pyproject.toml` and `setup.cfg`
//!
//! Values are read through `toml_edit`; byte ranges for version references are
//! located on the raw text, scoped to the owning table or section. Table
//! bodies come from the parser's header spans, so brackets inside strings or
//! multi-line arrays never end a table.

use crate::core::error::{RailResult, ResultExt};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use toml_edit::{Document, DocumentMut, Item, Table};

/// A parsed `pyproject.toml`
#[derive(Debug, Clone)]
pub struct Pyproject {
  pub path: PathBuf,
  pub text: String,
  pub doc: DocumentMut,
  /// `[header]` name and byte span, `None` names for `[[array]]` entries
  headers: Vec<(Option<String>, Range<usize>)>,
}

impl Pyproject {
  /// Read `<dir>/pyproject.toml` if present
  pub fn read(dir: &Path) -> RailResult<Option<Self>> {
    let path = dir.join("pyproject.toml");
    if !path.is_file() {
      return Ok(None);
    }
    let text = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed = Document::parse(text.clone()).with_context(|| format!("Failed to parse {}", path.display()))?;

    let mut headers = Vec::new();
    table_headers(parsed.as_table(), &mut Vec::new(), &mut headers);
    headers.sort_by_key(|(_, span)| span.start);

    Ok(Some(Self {
      path,
      text,
      doc: parsed.into_mut(),
      headers,
    }))
  }

  /// Look up a dotted key path
  pub fn get(&self, keys: &[&str]) -> Option<&Item> {
    let mut item = self.doc.as_item();
    for key in keys {
      item = item.get(key)?;
    }
    Some(item)
  }

  pub fn get_str(&self, keys: &[&str]) -> Option<&str> {
    self.get(keys).and_then(|i| i.as_str())
  }

  /// String array at a key path, ignoring non-string members
  pub fn get_str_array(&self, keys: &[&str]) -> Vec<String> {
    self
      .get(keys)
      .and_then(|i| i.as_array())
      .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
      .unwrap_or_default()
  }

  pub fn has_table(&self, keys: &[&str]) -> bool {
    self.get(keys).is_some_and(|i| i.is_table() || i.is_inline_table())
  }

  pub fn build_backend(&self) -> Option<&str> {
    self.get_str(&["build-system", "build-backend"])
  }

  /// Whether `[project] dynamic` lists `field`
  pub fn is_dynamic(&self, field: &str) -> bool {
    self.get_str_array(&["project", "dynamic"]).iter().any(|f| f == field)
  }

  /// Byte range of the body of table `[header]`, up to the next header
  pub fn table_range(&self, header: &str) -> Option<Range<usize>> {
    let start = self.headers.iter().find(|(name, _)| name.as_deref() == Some(header))?.1.end;
    let end = self
      .headers
      .iter()
      .map(|(_, span)| span.start)
      .find(|&s| s >= start)
      .unwrap_or(self.text.len());
    Some(start..end)
  }
}

fn table_headers(table: &Table, path: &mut Vec<String>, out: &mut Vec<(Option<String>, Range<usize>)>) {
  for (key, item) in table.iter() {
    path.push(key.to_string());
    match item {
      Item::Table(child) => {
        // implicit and dotted-key tables have no header of their own
        if !child.is_implicit()
          && !child.is_dotted()
          && let Some(span) = child.span()
        {
          out.push((Some(path.join(".")), span));
        }
        table_headers(child, path, out);
      }
      Item::ArrayOfTables(array) => {
        for child in array.iter() {
          if let Some(span) = child.span() {
            out.push((None, span));
          }
          table_headers(child, path, out);
        }
      }
      _ => {}
    }
    path.pop();
  }
}

/// Byte range of the lines following `[header]` up to the next section of
/// an INI file.
///
/// Whitespace inside the brackets is tolerated; `[[...]]` lines never match.
pub fn section_range(text: &str, header: &str) -> Option<Range<usize>> {
  let mut offset = 0;
  let mut start = None;

  for line in text.split_inclusive('\n') {
    let trimmed = line.trim();
    if trimmed.starts_with('[') {
      if start.is_some() {
        return start.map(|s| s..offset);
      }
      let name = trimmed
        .split('#')
        .next()
        .unwrap_or("")
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']');
      if !trimmed.starts_with("[[") && name.trim() == header {
        start = Some(offset + line.len());
      }
    }
    offset += line.len();
  }
  start.map(|s| s..text.len())
}

/// A `setup.cfg` file read as INI
#[derive(Debug, Clone)]
pub struct SetupCfg {
  pub path: PathBuf,
  pub text: String,
  sections: Vec<(String, Vec<(String, String)>)>,
}

impl SetupCfg {
  pub fn read(dir: &Path) -> RailResult<Option<Self>> {
    let path = dir.join("setup.cfg");
    if !path.is_file() {
      return Ok(None);
    }
    let text = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let sections = parse_ini(&text);
    Ok(Some(Self { path, text, sections }))
  }

  pub fn get(&self, section: &str, key: &str) -> Option<&str> {
    self
      .sections
      .iter()
      .find(|(name, _)| name == section)
      .and_then(|(_, entries)| entries.iter().find(|(k, _)| k == key))
      .map(|(_, v)| v.as_str())
  }

  /// A "list-semi" value: newline or `;` separated, comments dropped
  pub fn get_list(&self, section: &str, key: &str) -> Vec<String> {
    self
      .get(section, key)
      .map(|v| {
        v.split(['\n', ';'])
          .map(str::trim)
          .filter(|s| !s.is_empty() && !s.starts_with('#'))
          .map(str::to_string)
          .collect()
      })
      .unwrap_or_default()
  }

  /// Every list value of a section, e.g. all extras of `options.extras_require`
  pub fn section_lists(&self, section: &str) -> Vec<String> {
    let keys: Vec<&str> = self
      .sections
      .iter()
      .filter(|(name, _)| name == section)
      .flat_map(|(_, entries)| entries.iter().map(|(k, _)| k.as_str()))
      .collect();
    keys.into_iter().flat_map(|key| self.get_list(section, key)).collect()
  }

  pub fn section_range(&self, section: &str) -> Option<Range<usize>> {
    section_range(&self.text, section)
  }
}

fn parse_ini(text: &str) -> Vec<(String, Vec<(String, String)>)> {
  let mut sections: Vec<(String, Vec<(String, String)>)> = Vec::new();

  for line in text.lines() {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
      continue;
    }
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
      sections.push((trimmed[1..trimmed.len() - 1].trim().to_string(), Vec::new()));
      continue;
    }
    let Some((_, entries)) = sections.last_mut() else {
      continue;
    };
    let continuation = line.starts_with(' ') || line.starts_with('\t');
    if continuation && let Some((_, value)) = entries.last_mut() {
      if !value.is_empty() {
        value.push('\n');
      }
      value.push_str(trimmed);
      continue;
    }
    if let Some((key, value)) = trimmed.split_once(['=', ':']) {
      entries.push((key.trim().to_string(), value.trim().to_string()));
    }
  }
  sections
}
