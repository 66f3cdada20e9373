//! Repository hosting services
//!
//! Converts bare issue and pull request numbers into URLs. Only GitHub is
//! recognised; detection reads the `origin` remote or `repository.host`.

use crate::core::error::{RailError, RailResult};
use crate::core::vcs::Remote;
use regex::Regex;
use std::sync::LazyLock;

/// A hosting service that can turn references into URLs
pub trait RepositoryHost: Send + Sync {
  fn name(&self) -> &str;

  /// Normalise an issue reference (`231`, `#231`, or a full URL)
  fn issue_url(&self, reference: &str) -> RailResult<String>;

  /// Normalise a pull request reference
  fn pr_url(&self, reference: &str) -> RailResult<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubHost {
  pub owner: String,
  pub repo: String,
}

// https://github.com/o/r(.git), git@github.com:o/r(.git), github.com/o/r
static GITHUB_URL: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"github\.com[:/]([^/\s]+)/([^/\s]+?)(?:\.git)?/?$").expect("valid pattern"));

impl GitHubHost {
  /// Parse `github.com/owner/repo` or any GitHub remote URL
  pub fn parse(url: &str) -> Option<Self> {
    let caps = GITHUB_URL.captures(url.trim())?;
    Some(Self {
      owner: caps[1].to_string(),
      repo: caps[2].to_string(),
    })
  }

  fn base_url(&self) -> String {
    format!("https://github.com/{}/{}", self.owner, self.repo)
  }

  fn normalize(&self, reference: &str, kind: &str) -> RailResult<String> {
    let reference = reference.trim();
    if reference.starts_with("https://") || reference.starts_with("http://") {
      return Ok(reference.to_string());
    }
    let number = reference.trim_start_matches('#');
    if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
      return Ok(format!("{}/{}/{}", self.base_url(), kind, number));
    }
    Err(RailError::with_help(
      format!("'{}' is not a valid reference for {}/{}", reference, self.owner, self.repo),
      "Use a number such as 231, #231, or a full URL.",
    ))
  }
}

impl RepositoryHost for GitHubHost {
  fn name(&self) -> &str {
    "github"
  }

  fn issue_url(&self, reference: &str) -> RailResult<String> {
    self.normalize(reference, "issues")
  }

  fn pr_url(&self, reference: &str) -> RailResult<String> {
    self.normalize(reference, "pull")
  }
}

/// Pick a host from an explicit override or the `origin` remote
pub fn detect_host(override_url: Option<&str>, remotes: &[Remote]) -> Option<Box<dyn RepositoryHost>> {
  if let Some(url) = override_url {
    return GitHubHost::parse(url).map(|h| Box::new(h) as Box<dyn RepositoryHost>);
  }
  remotes
    .iter()
    .find(|r| r.name == "origin")
    .and_then(|r| GitHubHost::parse(&r.url))
    .map(|h| Box::new(h) as Box<dyn RepositoryHost>)
}

/// Accept only URLs when no host is known
pub fn require_url(reference: &str) -> RailResult<String> {
  let reference = reference.trim();
  if reference.starts_with("https://") || reference.starts_with("http://") {
    Ok(reference.to_string())
  } else {
    Err(RailError::with_help(
      format!("cannot turn '{}' into a URL: no repository host detected", reference),
      "Pass a full URL or set repository.host = \"github.com/<owner>/<repo>\".",
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_remote_urls() {
    let expected = GitHubHost {
      owner: "owner".to_string(),
      repo: "repo".to_string(),
    };
    assert_eq!(GitHubHost::parse("git@github.com:owner/repo.git"), Some(expected.clone()));
    assert_eq!(GitHubHost::parse("https://github.com/owner/repo"), Some(expected.clone()));
    assert_eq!(GitHubHost::parse("github.com/owner/repo"), Some(expected));
    assert_eq!(GitHubHost::parse("https://gitlab.com/owner/repo"), None);
  }

  #[test]
  fn test_issue_normalisation() {
    let host = GitHubHost::parse("github.com/owner/repo").unwrap();
    assert_eq!(host.issue_url("231").unwrap(), "https://github.com/owner/repo/issues/231");
    assert_eq!(host.issue_url("#234").unwrap(), "https://github.com/owner/repo/issues/234");
    assert_eq!(host.pr_url("12").unwrap(), "https://github.com/owner/repo/pull/12");
    assert_eq!(
      host.issue_url("https://example.org/x").unwrap(),
      "https://example.org/x"
    );
    assert!(host.issue_url("abc").is_err());
  }

  #[test]
  fn test_detect_prefers_origin() {
    let remotes = vec![
      Remote {
        name: "upstream".to_string(),
        url: "git@github.com:up/stream.git".to_string(),
      },
      Remote {
        name: "origin".to_string(),
        url: "git@github.com:me/fork.git".to_string(),
      },
    ];
    let host = detect_host(None, &remotes).unwrap();
    assert_eq!(host.issue_url("1").unwrap(), "https://github.com/me/fork/issues/1");
    assert!(detect_host(None, &[]).is_none());
  }

  #[test]
  fn test_require_url_without_host() {
    assert!(require_url("231").is_err());
    assert_eq!(require_url("https://x.y/1").unwrap(), "https://x.y/1");
  }
}
