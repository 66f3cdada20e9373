//! Fixtures shared by unit tests

use crate::core::config::PluginsConfig;
use crate::plugins::PluginRegistry;
use crate::project::Repository;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub fn write(root: &Path, rel: &str, content: &str) {
  let path = root.join(rel);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
}

pub fn registry() -> PluginRegistry {
  PluginRegistry::builtin(&PluginsConfig::default()).unwrap()
}

/// A Poetry project `<dir>/` named `name` with `src/<module>/__init__.py`
pub fn poetry_project(root: &Path, dir: &str, name: &str, version: &str, deps: &[(&str, &str)]) {
  let prefix = if dir.is_empty() { String::new() } else { format!("{}/", dir) };
  let module = name.replace('-', "_");
  let deps: String = deps.iter().map(|(n, c)| format!("{} = \"{}\"\n", n, c)).collect();
  write(
    root,
    &format!("{}pyproject.toml", prefix),
    &format!(
      "[tool.poetry]\nname = \"{name}\"\nversion = \"{version}\"\n\n[tool.poetry.dependencies]\npython = \"^3.8\"\n{deps}\n[build-system]\nbuild-backend = \"poetry.core.masonry.api\"\n"
    ),
  );
  write(
    root,
    &format!("{}src/{}/__init__.py", prefix, module),
    &format!("\"\"\"{name}\"\"\"\n\n__version__ = \"{version}\"\n"),
  );
}

/// Two projects, `pkg-b` depending on `pkg-a` with `^1.2.4`
pub fn monorepo() -> (TempDir, Repository) {
  let dir = TempDir::new().unwrap();
  poetry_project(dir.path(), "a", "pkg-a", "1.2.4", &[]);
  poetry_project(dir.path(), "b", "pkg-b", "0.3.0", &[("pkg-a", "^1.2.4")]);
  let repo = Repository::discover(dir.path(), &registry()).unwrap();
  (dir, repo)
}
