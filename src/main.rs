use clap::{Args, Parser, Subcommand};
use pyrail::changelog::NewEntry;
use pyrail::commands::{self, ReleaseOptions};
use pyrail::core::context::AppContext;
use pyrail::core::error::{RailError, RailResult, print_error};
use pyrail::core::vcs::SystemRunner;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Version bumping, structured changelogs and release checks for Python projects
#[derive(Parser)]
#[command(name = "pyrail")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Print debug logs to stderr (overrides PYRAIL_LOG)
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Directory to run in (defaults to the current directory)
  #[arg(short = 'C', long, global = true, value_name = "DIR")]
  directory: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  // ============================================================================
  // Versions
  // ============================================================================
  /// Validate or bump version references, then commit, tag and push
  Release {
    /// Target version or bump rule (major, minor, patch, premajor, preminor, prepatch, prerelease)
    #[arg(value_name = "VERSION")]
    target: Option<String>,
    /// Check that all version references agree (with VERSION: equal VERSION)
    #[arg(long)]
    validate: bool,
    /// Only release these projects (repeatable)
    #[arg(short, long = "project", value_name = "NAME")]
    projects: Vec<String>,
    /// Show the changes without writing anything
    #[arg(short, long)]
    dry: bool,
    /// Tag the release commit
    #[arg(short, long)]
    tag: bool,
    /// Push the branch and tags
    #[arg(long)]
    push: bool,
    /// Remote to push to (default: origin)
    #[arg(short, long)]
    remote: Option<String>,
    /// Force tag creation and push
    #[arg(short, long)]
    force: bool,
    /// Do not require the configured release branch
    #[arg(long)]
    no_branch_check: bool,
    /// Commit even when the work tree has uncommitted changes
    #[arg(long)]
    no_worktree_check: bool,
    /// Leave the changes uncommitted
    #[arg(long)]
    no_commit: bool,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  // ============================================================================
  // Changelogs
  // ============================================================================
  /// Manage structured changelog entries
  #[command(subcommand)]
  Changelog(ChangelogCommands),

  // ============================================================================
  // Inspection
  // ============================================================================
  /// Run check plugins against every project
  Check {
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Show discovered projects and loaded plugins
  Info {
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },
}

#[derive(Args)]
struct ProjectArg {
  /// Project to operate on (required in mono-repositories)
  #[arg(long, value_name = "NAME")]
  project: Option<String>,
}

#[derive(Subcommand)]
enum ChangelogCommands {
  /// Add an entry to the unreleased changelog
  Add {
    #[command(flatten)]
    project: ProjectArg,
    /// Change type (repeatable)
    #[arg(short, long = "type", value_name = "TYPE", required = true)]
    types: Vec<String>,
    /// What changed
    #[arg(short, long)]
    description: String,
    /// Author (default: git user.email, then user.name)
    #[arg(short, long)]
    author: Option<String>,
    /// Issue number or URL (repeatable)
    #[arg(short, long = "issue", value_name = "ISSUE")]
    issues: Vec<String>,
    /// Pull request number or URL
    #[arg(long)]
    pr: Option<String>,
    /// Output the entry in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Validate changelog entries
  Validate {
    #[command(flatten)]
    project: ProjectArg,
    /// Validate released changelogs too
    #[arg(short, long)]
    all: bool,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Print changelog entries
  Format {
    #[command(flatten)]
    project: ProjectArg,
    /// Released version to print (default: unreleased)
    #[arg(value_name = "VERSION")]
    release: Option<String>,
    /// Print every changelog, newest first
    #[arg(short, long, conflicts_with = "release")]
    all: bool,
    /// Render Markdown with HTML tables
    #[arg(long)]
    markdown: bool,
  },

  /// Set the PR URL on entries added since BASE
  UpdatePr {
    #[command(flatten)]
    project: ProjectArg,
    /// Base revision to compare the unreleased changelog with
    base: String,
    /// Pull request number or URL
    pr: String,
    /// Replace PR URLs that are already set
    #[arg(long)]
    overwrite: bool,
    /// Show what would change without writing
    #[arg(long)]
    dry: bool,
  },

  /// Fail unless entries were added since BASE
  AssertAdded {
    #[command(flatten)]
    project: ProjectArg,
    /// Base revision to compare the unreleased changelog with
    base: String,
  },
}

fn get_styles() -> clap::builder::Styles {
  let yellow = Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow));
  let green = Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green));
  let red = Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red));

  clap::builder::Styles::styled()
    .usage(anstyle::Style::new().bold().underline().fg_color(yellow))
    .header(anstyle::Style::new().bold().underline().fg_color(yellow))
    .literal(anstyle::Style::new().fg_color(green))
    .invalid(anstyle::Style::new().bold().fg_color(red))
    .error(anstyle::Style::new().bold().fg_color(red))
    .valid(anstyle::Style::new().bold().underline().fg_color(green))
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_tracing(verbose: bool) {
  let filter = if verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_env("PYRAIL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let cwd = match cli.directory.clone().map_or_else(std::env::current_dir, Ok) {
    Ok(dir) => dir,
    Err(e) => handle_error(RailError::Io(e)),
  };
  let cwd = match cwd.canonicalize() {
    Ok(cwd) => cwd,
    Err(e) => handle_error(RailError::message(format!("cannot open {}: {}", cwd.display(), e))),
  };

  // Config, plugins and projects are loaded once for every command
  let ctx = match AppContext::build(&cwd, Arc::new(SystemRunner)) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  if let Err(err) = dispatch(&ctx, cli.command) {
    handle_error(err);
  }
}

fn dispatch(ctx: &AppContext, command: Commands) -> RailResult<()> {
  match command {
    Commands::Release {
      target,
      validate,
      projects,
      dry,
      tag,
      push,
      remote,
      force,
      no_branch_check,
      no_worktree_check,
      no_commit,
      json,
    } => commands::run_release(
      ctx,
      &ReleaseOptions {
        target,
        validate,
        projects,
        dry,
        tag,
        push,
        remote,
        force,
        no_branch_check,
        no_worktree_check,
        no_commit,
        json,
      },
    ),

    Commands::Changelog(changelog_cmd) => match changelog_cmd {
      ChangelogCommands::Add {
        project,
        types,
        description,
        author,
        issues,
        pr,
        json,
      } => commands::run_changelog_add(
        ctx,
        project.project.as_deref(),
        NewEntry {
          types,
          description,
          author,
          issues,
          pr,
        },
        json,
      ),
      ChangelogCommands::Validate { project, all, json } => {
        commands::run_changelog_validate(ctx, project.project.as_deref(), all, json)
      }
      ChangelogCommands::Format {
        project,
        release,
        all,
        markdown,
      } => commands::run_changelog_format(ctx, project.project.as_deref(), release.as_deref(), all, markdown),
      ChangelogCommands::UpdatePr {
        project,
        base,
        pr,
        overwrite,
        dry,
      } => commands::run_changelog_update_pr(ctx, project.project.as_deref(), &base, &pr, overwrite, dry),
      ChangelogCommands::AssertAdded { project, base } => {
        commands::run_changelog_assert_added(ctx, project.project.as_deref(), &base)
      }
    },

    Commands::Check { json } => commands::run_check(ctx, json),
    Commands::Info { json } => commands::run_info(ctx, json),
  }
}

fn handle_error(err: RailError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
