//! `pyrail release` - validate, bump and publish versions
//!
//! Steps of a bump:
//! 1. Option and branch checks
//! 2. Plan: scan references, compute targets in dependency order, check the work tree
//! 3. Rewrite version spans (or print diffs with `--dry`)
//! 4. Release plugins (changelog staging)
//! 5. Commit, tag and push through git

use crate::core::context::AppContext;
use crate::core::error::{GitError, RailError, RailResult, ValidationError};
use crate::core::vcs::Vcs;
use crate::plugins::{Plugin, ReleaseContext, ReleasePlugin};
use crate::project::Project;
use crate::ui;
use crate::version::bump::{self, BumpPlan, BumpTarget};
use crate::version::rewrite;
use crate::version::scan::{ScanReport, VersionScanner};
use chrono::{Local, NaiveDate};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Flags of the release command
#[derive(Debug, Clone, Default)]
pub struct ReleaseOptions {
  /// Explicit version or rule name; the expected version with `--validate`
  pub target: Option<String>,
  pub validate: bool,
  /// Restrict to these projects (all when empty)
  pub projects: Vec<String>,
  pub dry: bool,
  pub tag: bool,
  pub push: bool,
  pub remote: Option<String>,
  pub force: bool,
  pub no_branch_check: bool,
  pub no_worktree_check: bool,
  pub no_commit: bool,
  pub json: bool,
}

impl ReleaseOptions {
  fn remote(&self) -> &str {
    self.remote.as_deref().unwrap_or("origin")
  }

  /// Reject flag combinations that make no sense together
  fn check(&self, vcs: Option<&dyn Vcs>) -> RailResult<()> {
    let usage = |msg: &str| RailError::with_help(msg, "Run `pyrail release --help` for usage.");

    if self.dry && self.validate {
      return Err(usage("--dry cannot be combined with --validate"));
    }
    if (self.tag || self.push) && (self.validate || self.dry) {
      return Err(usage("--tag and --push cannot be combined with --validate or --dry"));
    }
    if self.tag && self.no_commit {
      return Err(usage("--tag needs the release commit, drop --no-commit"));
    }
    if self.push && !self.tag && self.no_commit {
      return Err(usage("--push needs a tag or a commit to push"));
    }
    if self.force && !(self.tag || self.push) {
      return Err(usage("--force can only be combined with --tag or --push"));
    }
    if self.remote.is_some() && !self.push {
      return Err(usage("--remote can only be combined with --push"));
    }
    if self.target.is_none() && !self.validate {
      return Err(usage("a version or bump rule is required"));
    }

    if self.tag || self.push {
      let flag = if self.push { "--push" } else { "--tag" };
      let vcs = vcs.ok_or_else(|| {
        RailError::with_help(
          format!("not in a git repository, cannot use {}", flag),
          "Run pyrail inside a git work tree.",
        )
      })?;
      if self.push && !vcs.remotes()?.iter().any(|r| r.name == self.remote()) {
        return Err(RailError::with_help(
          format!("git remote '{}' does not exist", self.remote()),
          "Check `git remote -v` or pass --remote <name>.",
        ));
      }
    }
    Ok(())
  }
}

/// Run the release command
pub fn run_release(ctx: &AppContext, opts: &ReleaseOptions) -> RailResult<()> {
  run_release_on(ctx, opts, Local::now().date_naive())
}

fn run_release_on(ctx: &AppContext, opts: &ReleaseOptions, today: NaiveDate) -> RailResult<()> {
  opts.check(ctx.vcs())?;

  let config = &ctx.repository.config.release;
  let plugins = ctx.registry.select_release_plugins(&config.plugins)?;
  let scanner = VersionScanner::new(&ctx.repository, plugins.clone());
  let selected = selected_projects(ctx, &opts.projects);

  if opts.validate {
    return run_validate(ctx, opts, &scanner, &selected);
  }

  if !opts.dry && !opts.no_branch_check {
    check_release_branch(ctx.vcs(), &config.branch)?;
  }

  let Some(input) = opts.target.as_deref() else {
    return Err(RailError::message("a version or bump rule is required"));
  };
  let target = BumpTarget::parse(input, &ctx.registry)?;

  let plan = match bump::plan(&ctx.repository, &scanner, &selected, &target) {
    Err(RailError::Validation(ValidationError::Inconsistent { count })) => {
      let report = scan_selected(ctx, &scanner, &selected)?;
      ui::print_inconsistencies(&report.inconsistencies, &ctx.root);
      return Err(RailError::Validation(ValidationError::Inconsistent { count }));
    }
    other => other?,
  };

  if plan.is_empty() {
    println!("⚠️  No version references found, nothing to bump");
    return Ok(());
  }

  if !opts.dry
    && !opts.no_commit
    && !opts.no_worktree_check
    && let Some(vcs) = ctx.vcs()
  {
    check_worktree(vcs, &plan)?;
  }

  if opts.json {
    println!("{}", serde_json::to_string_pretty(&json!({ "dry": opts.dry, "plan": plan }))?);
  } else {
    print_plan(ctx, &plan);
  }

  let release_ctx = ReleaseContext { today, dry: opts.dry };

  if opts.dry {
    for (file, diff) in rewrite::preview(&plan.edits, &ctx.root)? {
      debug!(file = %file.display(), "previewing");
      if !opts.json {
        print!("{}", diff);
      }
    }
    let staged = run_plugins(ctx, &plugins, &plan, &release_ctx)?;
    if !opts.json {
      for file in &staged {
        println!("   would update {}", relative(ctx, file));
      }
      println!();
      println!("🔍 Dry-run mode (no changes applied)");
    }
    return Ok(());
  }

  let mut changed = rewrite::apply(&plan.edits, &ctx.root)?;
  changed.extend(run_plugins(ctx, &plugins, &plan, &release_ctx)?);
  changed.sort();
  changed.dedup();
  if !opts.json {
    println!("✅ Updated {} file(s)", changed.len());
  }

  let Some(vcs) = ctx.vcs() else {
    if !opts.json {
      println!("   Not a git repository, skipping commit");
    }
    return Ok(());
  };
  if opts.no_commit {
    return Ok(());
  }

  let message = config.commit_message.replace("{version}", &plan.versions().join(", "));
  vcs.commit(&changed, &message)?;
  if !opts.json {
    println!("   Committed: {}", message);
  }

  let tags = if opts.tag { tag_names(&config.tag_format, &plan)? } else { Vec::new() };
  for tag in &tags {
    vcs.tag(tag, opts.force)?;
    if !opts.json {
      println!("   Tagged: {}", tag);
    }
  }

  if opts.push {
    let mut refs: Vec<String> = vcs.current_branch()?.into_iter().collect();
    refs.extend(tags.iter().cloned());
    vcs.push(opts.remote(), &refs, opts.force)?;
    if !opts.json {
      println!("   Pushed {} to {}", refs.join(", "), opts.remote());
    }
  }

  if !opts.json {
    println!();
    println!("✅ Release {} completed!", plan.versions().join(", "));
  }
  Ok(())
}

/// `--validate`: compare every reference with its project's version
fn run_validate(
  ctx: &AppContext,
  opts: &ReleaseOptions,
  scanner: &VersionScanner,
  selected: &[String],
) -> RailResult<()> {
  if let Some(expected) = opts.target.as_deref() {
    expected.parse::<crate::version::Version>()?;
  }

  let report = scan_selected(ctx, scanner, selected)?;
  let validation = bump::validate(&report, &ctx.root, opts.target.as_deref());

  if opts.json {
    println!(
      "{}",
      serde_json::to_string_pretty(&json!({
        "inconsistencies": report.inconsistencies,
        "validation": validation,
      }))?
    );
  } else {
    if report.has_inconsistencies() {
      ui::print_inconsistencies(&report.inconsistencies, &ctx.root);
    }
    if !validation.mismatches.is_empty() {
      ui::print_mismatches(&validation.mismatches);
    }
    for name in &validation.checked {
      let refs = report.refs_of(name);
      if validation.mismatches.iter().all(|m| &m.project != name) {
        println!("✅ {}: {} reference(s) agree", name, refs.len());
      }
      for r in refs {
        println!("   {:<40} {}", r.location(&ctx.root), r.value);
      }
    }
    for name in &validation.skipped {
      println!("⏭️  {}: no declared version, skipped", name);
    }
  }

  if report.has_inconsistencies() {
    return Err(RailError::Validation(ValidationError::Inconsistent {
      count: report.inconsistencies.len(),
    }));
  }
  validation.into_result().map(|_| ())
}

/// `--project` names; without any, the project holding the start directory
/// when started below the root, else every project (empty)
fn selected_projects(ctx: &AppContext, named: &[String]) -> Vec<String> {
  if !named.is_empty() || ctx.cwd == ctx.root {
    return named.to_vec();
  }
  match ctx.repository.project_for(&ctx.cwd) {
    Some(project) => {
      debug!(project = %project.name, "releasing the project of the working directory");
      vec![project.name.clone()]
    }
    None => Vec::new(),
  }
}

fn scan_selected(ctx: &AppContext, scanner: &VersionScanner, selected: &[String]) -> RailResult<ScanReport> {
  if selected.is_empty() {
    return scanner.scan_all();
  }
  let projects = selected
    .iter()
    .map(|name| ctx.select_project(Some(name)))
    .collect::<RailResult<Vec<&Project>>>()?;
  scanner.scan(&projects)
}

/// Releases must start from the configured branch
fn check_release_branch(vcs: Option<&dyn Vcs>, branch: &str) -> RailResult<()> {
  let Some(vcs) = vcs else {
    return Ok(());
  };
  match vcs.current_branch()? {
    None => Err(RailError::Git(GitError::BranchError {
      message: "not currently on a git branch".to_string(),
    })),
    Some(current) if current != branch => Err(RailError::Git(GitError::BranchError {
      message: format!("current branch is '{}' but releases are made from '{}'", current, branch),
    })),
    Some(_) => Ok(()),
  }
}

/// Refuse to commit a release over uncommitted work.
///
/// Unstaged changes to tracked files block, as does any pending change to a
/// file the bump rewrites. Staged changes elsewhere stay out of the commit.
fn check_worktree(vcs: &dyn Vcs, plan: &BumpPlan) -> RailResult<()> {
  let toplevel = vcs.toplevel();
  let rewritten: Vec<&Path> = plan.edits.iter().map(|e| e.reference.file.as_path()).collect();

  let mut blocking = Vec::new();
  for entry in vcs.status()? {
    let touched = rewritten.iter().any(|file| *file == toplevel.join(&entry.path));
    if entry.is_unstaged() || touched {
      blocking.push(entry.path.display().to_string());
    } else if entry.is_staged_only() {
      warn!(file = %entry.path.display(), "staged change is left out of the release commit");
    }
  }

  if blocking.is_empty() {
    Ok(())
  } else {
    Err(RailError::Git(GitError::DirtyWorktree { files: blocking }))
  }
}

fn run_plugins(
  ctx: &AppContext,
  plugins: &[Arc<dyn ReleasePlugin>],
  plan: &BumpPlan,
  release_ctx: &ReleaseContext,
) -> RailResult<Vec<PathBuf>> {
  let mut files = Vec::new();
  for step in &plan.projects {
    let Some(project) = ctx.repository.project(&step.project) else {
      continue;
    };
    for plugin in plugins {
      let touched = plugin
        .create_release(project, &step.to, release_ctx)
        .map_err(|e| e.context(format!("release plugin '{}' failed for {}", plugin.name(), project.name)))?;
      files.extend(touched);
    }
  }
  Ok(files)
}

/// Tag names for the plan.
///
/// One tag when every project ends at the same version, otherwise one per
/// project, which needs `{name}` in the format.
fn tag_names(format: &str, plan: &BumpPlan) -> RailResult<Vec<String>> {
  let versions = plan.versions();
  if let [version] = versions.as_slice() {
    let name = plan.projects.first().map(|p| p.project.as_str()).unwrap_or_default();
    return Ok(vec![format.replace("{name}", name).replace("{version}", version)]);
  }
  if !format.contains("{name}") {
    return Err(RailError::config(format!(
      "projects are released at different versions ({}) but release.tag-format '{}' has no {{name}}",
      versions.join(", "),
      format
    )));
  }
  Ok(
    plan
      .projects
      .iter()
      .map(|p| format.replace("{name}", &p.project).replace("{version}", &p.to))
      .collect(),
  )
}

fn print_plan(ctx: &AppContext, plan: &BumpPlan) {
  println!("📦 Release Plan");
  println!();
  for step in &plan.projects {
    let from = step.from.as_deref().unwrap_or("?");
    println!("  {}: {} → {} ({} reference(s))", step.project, from, step.to, step.refs);
  }
  println!();
  for edit in &plan.edits {
    println!(
      "  {:<40} {} → {}",
      edit.reference.location(&ctx.root),
      edit.reference.value,
      edit.replacement
    );
  }
  if plan.edits.iter().any(|e| e.reference.value == e.replacement) {
    warn!("some references already carry the target version");
  }
  println!();
}

fn relative(ctx: &AppContext, file: &Path) -> String {
  pathdiff::diff_paths(file, &ctx.root)
    .unwrap_or_else(|| file.to_path_buf())
    .display()
    .to_string()
}
