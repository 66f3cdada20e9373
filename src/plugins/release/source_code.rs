use crate::plugins::{Plugin, ReleasePlugin};
use crate::project::Project;
use crate::version::patterns::{DUNDER_VERSION, Located, locate_one};
use crate::version::scan::{Discovered, Inconsistency};
use crate::version::{RefCategory, VersionRef};
use std::fs;

/// `__version__` in the project's primary package
pub struct SourceCodeVersionPlugin;

impl Plugin for SourceCodeVersionPlugin {
  fn name(&self) -> &str {
    "source-code-version"
  }

  fn description(&self) -> &str {
    "Find __version__ in __init__.py, __about__.py or _version.py"
  }
}

impl ReleasePlugin for SourceCodeVersionPlugin {
  fn version_refs(&self, project: &Project) -> Discovered {
    let mut found = Discovered::default();
    let Some(package) = project.primary_package() else {
      return found;
    };

    let inconsistency = |file, message| Inconsistency {
      project: project.name.clone(),
      file,
      category: RefCategory::Source,
      message,
    };

    for file in package.version_candidates() {
      let Ok(text) = fs::read_to_string(&file) else {
        continue;
      };
      match locate_one(&DUNDER_VERSION, &text) {
        Located::One(span) => {
          found
            .refs
            .push(VersionRef::new(&project.name, &file, &text, span, RefCategory::Source));
          return found;
        }
        Located::Ambiguous(n) => {
          found.inconsistencies.push(inconsistency(
            Some(file),
            format!("{} top-level __version__ assignments, expected one", n),
          ));
          return found;
        }
        Located::Missing => {}
      }
    }

    found.inconsistencies.push(inconsistency(
      Some(package.path.clone()),
      format!("no __version__ assignment in package '{}'", package.name),
    ));
    found
  }
}
