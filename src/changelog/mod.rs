//! Structured changelogs
//!
//! - `entry`: the bucket document model
//! - `store`: add, validate and release over a changelog directory
//! - `render`: terminal and Markdown output
//! - `diff`: entry additions between revisions, PR backfill

pub mod diff;
pub mod entry;
pub mod render;
pub mod store;

pub use diff::{EntryDiff, PrUpdate, assert_added, update_pr};
pub use entry::{Changelog, ChangelogEntry};
pub use render::{ChangelogView, Format};
pub use store::{ChangelogFile, ChangelogManager, NewEntry, UNRELEASED_FILE, Violation};
