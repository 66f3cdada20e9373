//! Configuration loading for repositories and projects
//!
//! Searched in order: `pyrail.toml`, `.pyrail.toml`, then the `[tool.pyrail]`
//! table of `pyproject.toml`. A directory without any of them gets the
//! defaults. The repository root's file supplies `[plugins]`, `[repository]`
//! and the release gate/templates; every project reads its own `[project]`,
//! `[changelog]` and `release.references`.

use crate::core::error::{ConfigError, RailError, RailResult, ResultExt};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder accepted in reference patterns and templates
pub const VERSION_TOKEN: &str = "{version}";

/// Configuration for pyrail
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PyrailConfig {
  #[serde(default)]
  pub plugins: PluginsConfig,
  #[serde(default)]
  pub project: ProjectConfig,
  #[serde(default)]
  pub repository: RepositoryConfig,
  #[serde(default)]
  pub changelog: ChangelogConfig,
  #[serde(default)]
  pub release: ReleaseConfig,
}

/// Plugin enable/disable lists, validated against the registry at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PluginsConfig {
  #[serde(default)]
  pub enable: Vec<String>,
  #[serde(default)]
  pub disable: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
  /// Force a project handler instead of detecting one
  #[serde(default)]
  pub handler: Option<String>,

  /// Directory holding the packages (default: `src`, then the project root)
  #[serde(default)]
  pub source_directory: Option<PathBuf>,

  /// Whether the packages are expected to ship a `py.typed` marker
  #[serde(default)]
  pub typed: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepositoryConfig {
  /// Glob patterns (relative to the root) of project directories
  #[serde(default)]
  pub include: Option<Vec<String>>,

  /// Hosting service override, e.g. `github.com/owner/repo`
  #[serde(default)]
  pub host: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChangelogConfig {
  #[serde(default = "default_true")]
  pub enabled: bool,

  #[serde(default = "default_changelog_directory")]
  pub directory: PathBuf,

  #[serde(default = "default_valid_types")]
  pub valid_types: Vec<String>,
}

fn default_true() -> bool {
  true
}

fn default_changelog_directory() -> PathBuf {
  PathBuf::from(".changelog")
}

fn default_valid_types() -> Vec<String> {
  [
    "breaking change",
    "deprecation",
    "docs",
    "feature",
    "fix",
    "hygiene",
    "improvement",
    "refactor",
    "tests",
  ]
  .iter()
  .map(|s| s.to_string())
  .collect()
}

impl Default for ChangelogConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      directory: default_changelog_directory(),
      valid_types: default_valid_types(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReleaseConfig {
  /// Branch releases must be created from
  #[serde(default = "default_release_branch")]
  pub branch: String,

  #[serde(default = "default_commit_message")]
  pub commit_message: String,

  #[serde(default = "default_tag_format")]
  pub tag_format: String,

  /// Supplementary version references
  #[serde(default)]
  pub references: Vec<ReferenceConfig>,

  /// Track version constraints between projects of the same repository
  #[serde(default = "default_true")]
  pub interdependencies: bool,

  /// Release plugins taking part in a release, in order
  #[serde(default = "default_release_plugins")]
  pub plugins: Vec<String>,
}

fn default_release_branch() -> String {
  "develop".to_string()
}

fn default_commit_message() -> String {
  "release {version}".to_string()
}

fn default_tag_format() -> String {
  "{version}".to_string()
}

fn default_release_plugins() -> Vec<String> {
  vec!["changelog".to_string(), "source-code-version".to_string()]
}

impl Default for ReleaseConfig {
  fn default() -> Self {
    Self {
      branch: default_release_branch(),
      commit_message: default_commit_message(),
      tag_format: default_tag_format(),
      references: Vec::new(),
      interdependencies: true,
      plugins: default_release_plugins(),
    }
  }
}

/// A user-declared version reference: a file and a pattern with one capture group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceConfig {
  pub file: PathBuf,
  pub pattern: String,
}

impl ReferenceConfig {
  /// Compile the pattern; `{version}` expands to a lazy capture group.
  ///
  /// Matching is multi-line with `.` crossing newlines.
  pub fn regex(&self) -> RailResult<Regex> {
    let source = self.pattern.replace(VERSION_TOKEN, "(.*?)");
    let regex = RegexBuilder::new(&source)
      .multi_line(true)
      .dot_matches_new_line(true)
      .build()
      .map_err(|e| self.bad_pattern(e.to_string()))?;

    // captures_len counts the implicit whole-match group
    if regex.captures_len() != 2 {
      return Err(self.bad_pattern(format!(
        "expected exactly one capturing group, found {}",
        regex.captures_len() - 1
      )));
    }
    Ok(regex)
  }

  fn bad_pattern(&self, reason: String) -> RailError {
    RailError::Config(ConfigError::BadReferencePattern {
      file: self.file.display().to_string(),
      pattern: self.pattern.clone(),
      reason,
    })
  }
}

#[derive(Deserialize)]
struct PyprojectTool {
  #[serde(default)]
  tool: Option<ToolTable>,
}

#[derive(Deserialize)]
struct ToolTable {
  #[serde(default)]
  pyrail: Option<PyrailConfig>,
}

impl PyrailConfig {
  /// Find a dedicated config file: pyrail.toml, .pyrail.toml
  pub fn find_config_path(dir: &Path) -> Option<PathBuf> {
    let candidates = [dir.join("pyrail.toml"), dir.join(".pyrail.toml")];
    candidates.into_iter().find(|p| p.is_file())
  }

  /// Load the configuration that applies to `dir`, falling back to defaults
  pub fn load(dir: &Path) -> RailResult<Self> {
    let config = if let Some(config_path) = Self::find_config_path(dir) {
      let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
      toml_edit::de::from_str::<PyrailConfig>(&content)
        .map_err(|e| RailError::config(format!("{}: {}", config_path.display(), e)))?
    } else {
      let pyproject = dir.join("pyproject.toml");
      if pyproject.is_file() {
        let content = fs::read_to_string(&pyproject)
          .with_context(|| format!("Failed to read {}", pyproject.display()))?;
        let parsed: PyprojectTool = toml_edit::de::from_str(&content)
          .map_err(|e| RailError::config(format!("{}: {}", pyproject.display(), e)))?;
        parsed.tool.and_then(|t| t.pyrail).unwrap_or_default()
      } else {
        PyrailConfig::default()
      }
    };

    config
      .validate()
      .with_context(|| format!("Invalid configuration in {}", dir.display()))?;
    Ok(config)
  }

  /// Check templates and reference patterns
  pub fn validate(&self) -> RailResult<()> {
    if !self.release.tag_format.contains(VERSION_TOKEN) {
      return Err(RailError::config(format!(
        "release.tag-format {:?} must contain {}",
        self.release.tag_format, VERSION_TOKEN
      )));
    }
    if !self.release.commit_message.contains(VERSION_TOKEN) {
      return Err(RailError::config(format!(
        "release.commit-message {:?} must contain {}",
        self.release.commit_message, VERSION_TOKEN
      )));
    }
    for reference in &self.release.references {
      reference.regex()?;
    }
    if self.changelog.valid_types.is_empty() {
      return Err(RailError::config("changelog.valid-types must not be empty"));
    }
    Ok(())
  }
}
