//! Error types for pyrail with contextual messages and exit codes
//!
//! Every error maps to an exit code and may carry a help line. Discovery
//! inconsistencies and version mismatches are collected into reports first and
//! only become a `RailError::Validation` once a whole run has finished.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for pyrail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (git, I/O, partially applied rewrites)
  System = 2,
  /// Validation failure (mismatched versions, inconsistent references, failed checks)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for pyrail
#[derive(Debug)]
pub enum RailError {
  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Validation errors (reports that were already printed or aggregated)
  Validation(ValidationError),

  /// A bump stopped part way through rewriting files
  PartialRewrite {
    rewritten: Vec<String>,
    pending: Vec<String>,
    cause: Box<RailError>,
  },

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl RailError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    RailError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    RailError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Shorthand for `RailError::Config(ConfigError::Invalid { .. })`
  pub fn config(msg: impl Into<String>) -> Self {
    RailError::Config(ConfigError::Invalid { message: msg.into() })
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      RailError::Message { message, context, help } => RailError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      RailError::Io(err) => RailError::Message {
        message: format!("{}: {}", ctx_str, err),
        context: None,
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      RailError::Config(_) => ExitCode::User,
      RailError::Git(_) => ExitCode::System,
      RailError::Validation(_) => ExitCode::Validation,
      RailError::PartialRewrite { .. } => ExitCode::System,
      RailError::Io(_) => ExitCode::System,
      RailError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      RailError::Config(e) => e.help_message(),
      RailError::Git(e) => e.help_message(),
      RailError::Validation(e) => e.help_message(),
      RailError::PartialRewrite { .. } => Some(
        "Files listed as rewritten were changed on disk. Use `git diff` to finish or `git checkout -- <file>` to revert."
          .to_string(),
      ),
      RailError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for RailError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RailError::Config(e) => write!(f, "{}", e),
      RailError::Git(e) => write!(f, "{}", e),
      RailError::Validation(e) => write!(f, "{}", e),
      RailError::PartialRewrite {
        rewritten,
        pending,
        cause,
      } => {
        writeln!(f, "Version bump stopped part way: {}", cause)?;
        writeln!(f, "Rewritten ({}):", rewritten.len())?;
        for r in rewritten {
          writeln!(f, "  {}", r)?;
        }
        write!(f, "Not reached ({}):", pending.len())?;
        for p in pending {
          write!(f, "\n  {}", p)?;
        }
        Ok(())
      }
      RailError::Io(e) => write!(f, "I/O error: {}", e),
      RailError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for RailError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      RailError::Io(e) => Some(e),
      RailError::PartialRewrite { cause, .. } => Some(cause.as_ref()),
      _ => None,
    }
  }
}

impl From<io::Error> for RailError {
  fn from(err: io::Error) -> Self {
    RailError::Io(err)
  }
}

impl From<String> for RailError {
  fn from(msg: String) -> Self {
    RailError::message(msg)
  }
}

impl From<&str> for RailError {
  fn from(msg: &str) -> Self {
    RailError::message(msg)
  }
}

impl From<toml_edit::TomlError> for RailError {
  fn from(err: toml_edit::TomlError) -> Self {
    RailError::message(format!("TOML parse error: {}", err))
  }
}

impl From<toml_edit::de::Error> for RailError {
  fn from(err: toml_edit::de::Error) -> Self {
    RailError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<toml_edit::ser::Error> for RailError {
  fn from(err: toml_edit::ser::Error) -> Self {
    RailError::message(format!("TOML serialization error: {}", err))
  }
}

impl From<serde_json::Error> for RailError {
  fn from(err: serde_json::Error) -> Self {
    RailError::message(format!("JSON error: {}", err))
  }
}

impl From<regex::Error> for RailError {
  fn from(err: regex::Error) -> Self {
    RailError::config(format!("invalid regular expression: {}", err))
  }
}

impl From<glob::PatternError> for RailError {
  fn from(err: glob::PatternError) -> Self {
    RailError::config(format!("invalid glob pattern: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for RailError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    RailError::message(format!("UTF-8 conversion error: {}", err))
  }
}

impl From<std::path::StripPrefixError> for RailError {
  fn from(err: std::path::StripPrefixError) -> Self {
    RailError::message(format!("Path strip prefix error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// Malformed or contradictory configuration
  Invalid { message: String },

  /// A plugin name in `plugins.enable`, `plugins.disable` or `release.plugins` is not registered
  UnknownPlugin { name: String, known: Vec<String> },

  /// Two projects in one repository share a name
  DuplicateProject { name: String, first: PathBuf, second: PathBuf },

  /// The inter-dependency graph is not a DAG
  DependencyCycle { projects: Vec<String> },

  /// A `release.references` pattern cannot be used
  BadReferencePattern { file: String, pattern: String, reason: String },

  /// No recognised project below the working directory
  NoProjects { root: PathBuf },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::UnknownPlugin { known, .. } => Some(format!("Registered plugins: {}", known.join(", "))),
      ConfigError::DuplicateProject { .. } => {
        Some("Rename one of the projects or limit discovery with `repository.include`.".to_string())
      }
      ConfigError::DependencyCycle { .. } => {
        Some("Projects in a repository must not depend on each other in a loop.".to_string())
      }
      ConfigError::BadReferencePattern { .. } => Some(
        "A reference pattern needs exactly one capturing group, or the `{version}` placeholder.".to_string(),
      ),
      ConfigError::NoProjects { .. } => {
        Some("Run pyrail from a directory containing pyproject.toml or setup.cfg.".to_string())
      }
      ConfigError::Invalid { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::Invalid { message } => write!(f, "Configuration error: {}", message),
      ConfigError::UnknownPlugin { name, .. } => write!(f, "Configuration error: unknown plugin '{}'", name),
      ConfigError::DuplicateProject { name, first, second } => write!(
        f,
        "Configuration error: project name '{}' is used by both {} and {}",
        name,
        first.display(),
        second.display()
      ),
      ConfigError::DependencyCycle { projects } => write!(
        f,
        "Configuration error: cyclic inter-dependency between {}",
        projects.join(" -> ")
      ),
      ConfigError::BadReferencePattern { file, pattern, reason } => write!(
        f,
        "Configuration error: reference pattern {:?} for {}: {}",
        pattern, file, reason
      ),
      ConfigError::NoProjects { root } => write!(f, "No Python project found at {}", root.display()),
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Branch gate refused the release
  BranchError { message: String },

  /// Push failed
  PushFailed { remote: String, reason: String },

  /// Uncommitted changes would leak into or be mixed with the release commit
  DirtyWorktree { files: Vec<String> },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::PushFailed { reason, .. } => {
        if reason.contains("non-fast-forward") || reason.contains("rejected") {
          Some("The remote has commits you don't have. Pull first or push with --force (dangerous).".to_string())
        } else {
          Some("The local commit and tag were kept. Push them manually once the remote is reachable.".to_string())
        }
      }
      GitError::BranchError { .. } => Some("Use --no-branch-check to release from another branch.".to_string()),
      GitError::DirtyWorktree { .. } => {
        Some("Commit or stash these changes first, or pass --no-worktree-check.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::BranchError { message } => {
        write!(f, "Branch check failed: {}", message)
      }
      GitError::DirtyWorktree { files } => {
        write!(f, "Work tree has uncommitted changes:")?;
        for file in files {
          write!(f, "\n  {}", file)?;
        }
        Ok(())
      }
      GitError::PushFailed { remote, reason } => {
        write!(f, "Push to {} failed: {}", remote, reason)
      }
    }
  }
}

/// Validation errors
#[derive(Debug)]
pub enum ValidationError {
  /// Declared versions disagree with discovered references
  VersionMismatch { count: usize },

  /// References could not be discovered unambiguously
  Inconsistent { count: usize },

  /// Changelog entries break the bucket rules
  Changelog { count: usize },

  /// A changelog diff between revisions was empty or ambiguous
  ChangelogDiff { message: String },

  /// One or more checks failed
  ChecksFailed { count: usize },
}

impl ValidationError {
  fn help_message(&self) -> Option<String> {
    match self {
      ValidationError::VersionMismatch { .. } => {
        Some("Bump the project with `pyrail release <version>` to bring all references in line.".to_string())
      }
      ValidationError::ChangelogDiff { .. } => {
        Some("Add an entry with `pyrail changelog add -t <type> -d <description>`.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ValidationError::VersionMismatch { count } => write!(f, "{} version reference(s) do not match", count),
      ValidationError::Inconsistent { count } => {
        write!(f, "{} version reference(s) could not be discovered", count)
      }
      ValidationError::Changelog { count } => write!(f, "{} changelog violation(s) found", count),
      ValidationError::ChangelogDiff { message } => write!(f, "{}", message),
      ValidationError::ChecksFailed { count } => write!(f, "{} check(s) failed", count),
    }
  }
}

/// Result type alias for pyrail
pub type RailResult<T> = Result<T, RailError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> RailResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> RailResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<RailError>,
{
  fn context(self, ctx: impl Into<String>) -> RailResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> RailResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &RailError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exit_codes() {
    assert_eq!(RailError::config("bad").exit_code(), ExitCode::User);
    assert_eq!(
      RailError::Validation(ValidationError::VersionMismatch { count: 1 })
        .exit_code()
        .as_i32(),
      3
    );
    let git = RailError::Git(GitError::CommandFailed {
      command: "git tag".to_string(),
      stderr: String::new(),
    });
    assert_eq!(git.exit_code(), ExitCode::System);
  }

  #[test]
  fn test_context_chains_on_messages() {
    let err = RailError::message("inner").context("outer");
    assert_eq!(err.to_string(), "inner\nouter");
  }

  #[test]
  fn test_partial_rewrite_lists_both_sides() {
    let err = RailError::PartialRewrite {
      rewritten: vec!["a/pyproject.toml".to_string()],
      pending: vec!["b/pyproject.toml".to_string()],
      cause: Box::new(RailError::message("disk full")),
    };
    let text = err.to_string();
    assert!(text.contains("disk full"));
    assert!(text.contains("Rewritten (1):\n  a/pyproject.toml"));
    assert!(text.contains("Not reached (1):\n  b/pyproject.toml"));
    assert_eq!(err.exit_code(), ExitCode::System);
  }

  #[test]
  fn test_git_errors_carry_help() {
    let dirty = RailError::Git(GitError::DirtyWorktree {
      files: vec!["a/pyproject.toml".to_string()],
    });
    assert_eq!(dirty.to_string(), "Work tree has uncommitted changes:\n  a/pyproject.toml");
    assert!(dirty.help_message().unwrap().contains("--no-worktree-check"));
    assert_eq!(dirty.exit_code(), ExitCode::System);

    let failed = RailError::Git(GitError::CommandFailed {
      command: "git status".to_string(),
      stderr: String::new(),
    });
    assert!(failed.help_message().is_none());
  }

  #[test]
  fn test_unknown_plugin_help_lists_known() {
    let err = RailError::Config(ConfigError::UnknownPlugin {
      name: "nope".to_string(),
      known: vec!["poetry".to_string(), "flit".to_string()],
    });
    assert_eq!(err.help_message().as_deref(), Some("Registered plugins: poetry, flit"));
  }
}
