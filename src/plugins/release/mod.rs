//! Built-in release plugins

mod changelog;
mod source_code;

pub use changelog::ChangelogReleasePlugin;
pub use source_code::SourceCodeVersionPlugin;

use crate::plugins::ReleasePlugin;
use std::sync::Arc;

pub fn builtin_release_plugins() -> Vec<Arc<dyn ReleasePlugin>> {
  vec![Arc::new(ChangelogReleasePlugin), Arc::new(SourceCodeVersionPlugin)]
}
