//! `pyrail changelog` - manage structured changelog entries
//!
//! Subcommands map onto [`ChangelogManager`]:
//! - **add**: append an entry to `_unreleased.toml`
//! - **validate**: report malformed entries
//! - **format**: print buckets for terminals or Markdown
//! - **update-pr**: backfill the PR URL of entries added since a revision
//! - **assert-added**: fail when a branch added no entry
//!
//! The last two cover every project with a changelog when no project is
//! selected, so they run unchanged in the CI of a mono-repository.

use crate::changelog::{self, ChangelogManager, ChangelogView, Format, NewEntry};
use crate::core::context::AppContext;
use crate::core::error::{RailError, RailResult};
use crate::project::Project;
use crate::ui;
use std::io::IsTerminal;
use tracing::debug;

/// Changelog manager for the selected project, with the detected host
fn manager<'a>(ctx: &'a AppContext, project: Option<&str>) -> RailResult<ChangelogManager<'a>> {
  let project = ctx.select_project(project)?;
  Ok(ChangelogManager::for_project(project).with_host(ctx.host()))
}

/// The selected project, else every project with the changelog enabled
fn managers<'a>(ctx: &'a AppContext, project: Option<&str>) -> RailResult<Vec<(&'a Project, ChangelogManager<'a>)>> {
  let projects: Vec<&Project> = match (project, ctx.repository.project_for(&ctx.cwd)) {
    (Some(name), _) => vec![ctx.select_project(Some(name))?],
    (None, Some(project)) => vec![project],
    (None, None) => ctx
      .repository
      .projects()
      .iter()
      .filter(|p| p.config().changelog.enabled)
      .collect(),
  };
  if projects.is_empty() {
    return Err(RailError::message("no project has a changelog"));
  }
  debug!(count = projects.len(), "comparing changelogs");

  Ok(
    projects
      .into_iter()
      .map(|p| (p, ChangelogManager::for_project(p).with_host(ctx.host())))
      .collect(),
  )
}

/// Run `changelog add`
pub fn run_changelog_add(ctx: &AppContext, project: Option<&str>, new: NewEntry, json: bool) -> RailResult<()> {
  let manager = manager(ctx, project)?;
  let entry = manager.add(new, ctx.vcs())?;

  if json {
    println!("{}", serde_json::to_string_pretty(&entry)?);
  } else {
    println!("✅ Added changelog entry {}", entry.id);
    println!("   {} - {}", entry.types.join(", "), entry.description);
    println!(
      "   {}",
      pathdiff::diff_paths(manager.unreleased().path, &ctx.root)
        .unwrap_or_default()
        .display()
    );
  }
  Ok(())
}

/// Run `changelog validate`
pub fn run_changelog_validate(ctx: &AppContext, project: Option<&str>, all: bool, json: bool) -> RailResult<()> {
  let manager = manager(ctx, project)?;
  let violations = manager.validate(all)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&violations)?);
  } else if violations.is_empty() {
    println!("✅ Changelog is valid");
  } else {
    ui::print_violations(&violations, &ctx.root);
  }
  manager.require_valid(all)
}

/// Run `changelog format`
pub fn run_changelog_format(
  ctx: &AppContext,
  project: Option<&str>,
  version: Option<&str>,
  all: bool,
  markdown: bool,
) -> RailResult<()> {
  let manager = manager(ctx, project)?;
  let files = match version {
    Some(version) => {
      let file = manager.version(version);
      if !file.exists() {
        return Err(RailError::with_help(
          format!("no changelog for version {}", version),
          format!("Expected {}", file.path.display()),
        ));
      }
      vec![file]
    }
    None if all => manager.all()?,
    None => {
      let unreleased = manager.unreleased();
      if unreleased.exists() { vec![unreleased] } else { Vec::new() }
    }
  };

  let view = ChangelogView::load(files)?;
  if view.is_empty() {
    println!("No changelog entries");
    return Ok(());
  }

  let format = if markdown {
    Format::Markdown
  } else {
    Format::Terminal {
      color: std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
  };
  for line in view.lines(format) {
    println!("{}", line);
  }
  Ok(())
}

/// Run `changelog update-pr`
pub fn run_changelog_update_pr(
  ctx: &AppContext,
  project: Option<&str>,
  base: &str,
  pr: &str,
  overwrite: bool,
  dry: bool,
) -> RailResult<()> {
  let vcs = ctx.require_vcs("compare changelogs")?;
  let managers = managers(ctx, project)?;
  let several = managers.len() > 1;

  for (project, manager) in &managers {
    let pr = manager.pr_url(pr)?;
    let update = changelog::update_pr(manager, vcs, base, &pr, overwrite, dry)?;
    let prefix = if several { format!("{}: ", project.name) } else { String::new() };

    if let Some(reason) = &update.skipped {
      println!("⚠️  {}Not updating PR references: {}", prefix, reason);
      continue;
    }
    if update.updated.is_empty() {
      println!("✅ {}No entries to update", prefix);
      continue;
    }

    let verb = if dry { "Would set" } else { "Set" };
    println!("✅ {}{} pr = {} on {} entr(y/ies)", prefix, verb, pr, update.updated.len());
    for id in &update.updated {
      println!("   {}", id);
    }
  }
  Ok(())
}

/// Run `changelog assert-added`
pub fn run_changelog_assert_added(ctx: &AppContext, project: Option<&str>, base: &str) -> RailResult<()> {
  let vcs = ctx.require_vcs("compare changelogs")?;
  let (projects, managers): (Vec<_>, Vec<_>) = managers(ctx, project)?.into_iter().unzip();
  let diffs = changelog::assert_added(&managers, vcs, base)?;

  for (project, diff) in projects.iter().zip(&diffs) {
    if !diff.added.is_empty() {
      println!("✅ {}: {} changelog entr(y/ies) added since {}", project.name, diff.added.len(), base);
    }
  }
  Ok(())
}
