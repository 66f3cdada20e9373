//! Python package detection

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Directories never treated as packages
const IGNORED: &[&str] = &["test", "tests", "docs", "build", "dist"];

/// An importable package or single-file module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
  pub name: String,
  /// Package directory, or the `.py` file of a single-module distribution
  pub path: PathBuf,
  /// Directory the package is importable from
  pub root: PathBuf,
}

impl Package {
  pub fn is_module(&self) -> bool {
    self.path.is_file()
  }

  /// Files that may carry `__version__`, in lookup order
  pub fn version_candidates(&self) -> Vec<PathBuf> {
    if self.is_module() {
      return vec![self.path.clone()];
    }
    ["__init__.py", "__about__.py", "_version.py"]
      .iter()
      .map(|f| self.path.join(f))
      .collect()
  }
}

/// Module name a distribution name would be imported as
pub fn module_name(dist_name: &str) -> String {
  dist_name.replace(['-', '.'], "_").to_lowercase()
}

/// Find packages below `source_dir` (or `src/`, then the project root).
///
/// Package directories are those holding `__init__.py`; when none exist, a
/// top-level `<module>.py` matching the distribution name is used.
pub fn detect_packages(project_dir: &Path, source_dir: Option<&Path>, dist_name: &str) -> Vec<Package> {
  let roots: Vec<PathBuf> = match source_dir {
    Some(dir) => vec![project_dir.join(dir)],
    None => vec![project_dir.join("src"), project_dir.to_path_buf()],
  };

  for root in roots.iter().filter(|r| r.is_dir()) {
    let mut found = package_dirs(root);
    if found.is_empty() {
      let module = root.join(format!("{}.py", module_name(dist_name)));
      if module.is_file() {
        found.push(Package {
          name: module_name(dist_name),
          path: module,
          root: root.clone(),
        });
      }
    }
    if !found.is_empty() {
      return found;
    }
  }
  Vec::new()
}

fn package_dirs(root: &Path) -> Vec<Package> {
  let Ok(entries) = fs::read_dir(root) else {
    return Vec::new();
  };

  let mut packages: Vec<Package> = entries
    .filter_map(|e| e.ok())
    .map(|e| e.path())
    .filter(|p| p.is_dir() && p.join("__init__.py").is_file())
    .filter_map(|p| {
      let name = p.file_name()?.to_str()?.to_string();
      if IGNORED.contains(&name.as_str()) || name.starts_with('.') {
        return None;
      }
      Some(Package {
        name,
        path: p.clone(),
        root: root.to_path_buf(),
      })
    })
    .collect();

  packages.sort_by(|a, b| a.name.cmp(&b.name));
  packages
}
