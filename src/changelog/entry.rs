//! Changelog entry and bucket documents

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// A single string or a list of strings
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
  One(String),
  Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match OneOrMany::deserialize(deserializer)? {
    OneOrMany::One(value) => vec![value],
    OneOrMany::Many(values) => values,
  })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
  #[serde(default)]
  pub id: String,

  #[serde(rename = "type", default, deserialize_with = "one_or_many")]
  pub types: Vec<String>,

  #[serde(default, alias = "message")]
  pub description: String,

  #[serde(rename = "author", alias = "authors", default, deserialize_with = "one_or_many")]
  pub authors: Vec<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub issues: Vec<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pr: Option<String>,
}

/// Parsed content of one bucket file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changelog {
  #[serde(rename = "release-date", default, skip_serializing_if = "Option::is_none")]
  pub release_date: Option<NaiveDate>,

  #[serde(default)]
  pub entries: Vec<ChangelogEntry>,
}

impl Changelog {
  pub fn parse(text: &str) -> Result<Self, toml_edit::de::Error> {
    toml_edit::de::from_str(text)
  }

  pub fn entry(&self, id: &str) -> Option<&ChangelogEntry> {
    self.entries.iter().find(|e| e.id == id)
  }
}
