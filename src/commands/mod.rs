//! CLI commands for pyrail
//!
//! ## Versions
//! - **release**: validate, bump, commit, tag and push versions
//!
//! ## Changelogs
//! - **changelog**: add, validate, format, update-pr, assert-added
//!
//! ## Inspection
//! - **check**: run check plugins
//! - **info**: list projects, handlers and plugins
//!
//! All commands accept `&AppContext` so the repository is discovered once.

pub mod changelog;
pub mod check;
pub mod info;
pub mod release;

pub use changelog::{
  run_changelog_add, run_changelog_assert_added, run_changelog_format, run_changelog_update_pr,
  run_changelog_validate,
};
pub use check::run_check;
pub use info::run_info;
pub use release::{ReleaseOptions, run_release};
