//! Plugin registry
//!
//! Built once per invocation from the built-in plugins plus anything an
//! embedder registers, filtered by `[plugins]` configuration, and passed down
//! by reference. Group lookups never fail; an unknown group is empty.

use crate::core::config::PluginsConfig;
use crate::core::error::{ConfigError, RailError, RailResult};
use crate::plugins::{CheckPlugin, Plugin, ProjectHandler, ReleasePlugin, VersionRule};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Capability groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginGroup {
  ProjectHandlers,
  CheckPlugins,
  ReleasePlugins,
  VersionRules,
}

impl PluginGroup {
  pub const ALL: [PluginGroup; 4] = [
    PluginGroup::ProjectHandlers,
    PluginGroup::CheckPlugins,
    PluginGroup::ReleasePlugins,
    PluginGroup::VersionRules,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      PluginGroup::ProjectHandlers => "project-handlers",
      PluginGroup::CheckPlugins => "check-plugins",
      PluginGroup::ReleasePlugins => "release-plugins",
      PluginGroup::VersionRules => "version-rules",
    }
  }

  pub fn parse(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|g| g.as_str() == name)
  }
}

impl fmt::Display for PluginGroup {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Immutable plugin lookup, ordered by priority within each group
pub struct PluginRegistry {
  handlers: Vec<Arc<dyn ProjectHandler>>,
  checks: Vec<Arc<dyn CheckPlugin>>,
  release: Vec<Arc<dyn ReleasePlugin>>,
  rules: Vec<Arc<dyn VersionRule>>,
  /// Every registered name, loaded or not
  known: Vec<(PluginGroup, String)>,
}

impl PluginRegistry {
  pub fn builder() -> PluginRegistryBuilder {
    PluginRegistryBuilder::default()
  }

  /// Built-in plugins filtered by configuration
  pub fn builtin(config: &PluginsConfig) -> RailResult<Self> {
    Self::builder().with_builtins().build(config)
  }

  /// Names of the loaded plugins of a group, in priority order
  pub fn names(&self, group: &str) -> Vec<String> {
    let Some(group) = PluginGroup::parse(group) else {
      return Vec::new();
    };
    match group {
      PluginGroup::ProjectHandlers => names_of(&self.handlers),
      PluginGroup::CheckPlugins => names_of(&self.checks),
      PluginGroup::ReleasePlugins => names_of(&self.release),
      PluginGroup::VersionRules => names_of(&self.rules),
    }
  }

  pub fn handlers(&self) -> &[Arc<dyn ProjectHandler>] {
    &self.handlers
  }

  pub fn handler(&self, name: &str) -> Option<Arc<dyn ProjectHandler>> {
    self.handlers.iter().find(|p| p.name() == name).cloned()
  }

  pub fn checks(&self) -> &[Arc<dyn CheckPlugin>] {
    &self.checks
  }

  pub fn release_plugins(&self) -> &[Arc<dyn ReleasePlugin>] {
    &self.release
  }

  pub fn rules(&self) -> &[Arc<dyn VersionRule>] {
    &self.rules
  }

  pub fn rule(&self, name: &str) -> Option<Arc<dyn VersionRule>> {
    self.rules.iter().find(|p| p.name() == name).cloned()
  }

  /// Resolve `release.plugins`.
  ///
  /// Names must be registered release plugins; disabled ones are skipped.
  pub fn select_release_plugins(&self, names: &[String]) -> RailResult<Vec<Arc<dyn ReleasePlugin>>> {
    let mut selected = Vec::new();
    for name in names {
      let registered = self
        .known
        .iter()
        .any(|(g, n)| *g == PluginGroup::ReleasePlugins && n == name);
      if !registered {
        return Err(RailError::Config(ConfigError::UnknownPlugin {
          name: name.clone(),
          known: self.known_in(PluginGroup::ReleasePlugins),
        }));
      }
      match self.release.iter().find(|p| p.name() == name) {
        Some(plugin) => selected.push(plugin.clone()),
        None => debug!(plugin = %name, "release plugin disabled, skipping"),
      }
    }
    Ok(selected)
  }

  fn known_in(&self, group: PluginGroup) -> Vec<String> {
    self
      .known
      .iter()
      .filter(|(g, _)| *g == group)
      .map(|(_, n)| n.clone())
      .collect()
  }
}

fn names_of<T: Plugin + ?Sized>(plugins: &[Arc<T>]) -> Vec<String> {
  plugins.iter().map(|p| p.name().to_string()).collect()
}

/// Collects plugins before configuration is applied
#[derive(Default)]
pub struct PluginRegistryBuilder {
  handlers: Vec<Arc<dyn ProjectHandler>>,
  checks: Vec<Arc<dyn CheckPlugin>>,
  release: Vec<Arc<dyn ReleasePlugin>>,
  rules: Vec<Arc<dyn VersionRule>>,
}

impl PluginRegistryBuilder {
  /// Register the built-in plugins in their priority order
  pub fn with_builtins(mut self) -> Self {
    self.handlers.extend(crate::plugins::handlers::builtin_handlers());
    self.checks.extend(crate::plugins::checks::builtin_checks());
    self.release.extend(crate::plugins::release::builtin_release_plugins());
    self.rules.extend(crate::version::rules::builtin_rules());
    self
  }

  /// Handlers registered later have lower priority
  pub fn register_handler(mut self, handler: Arc<dyn ProjectHandler>) -> Self {
    self.handlers.push(handler);
    self
  }

  pub fn register_check(mut self, check: Arc<dyn CheckPlugin>) -> Self {
    self.checks.push(check);
    self
  }

  pub fn register_release_plugin(mut self, plugin: Arc<dyn ReleasePlugin>) -> Self {
    self.release.push(plugin);
    self
  }

  pub fn register_rule(mut self, rule: Arc<dyn VersionRule>) -> Self {
    self.rules.push(rule);
    self
  }

  /// Apply `plugins.enable` / `plugins.disable` and freeze the registry
  pub fn build(self, config: &PluginsConfig) -> RailResult<PluginRegistry> {
    let mut known: Vec<(PluginGroup, String)> = Vec::new();
    let groups: [(PluginGroup, Vec<String>); 4] = [
      (PluginGroup::ProjectHandlers, names_of(&self.handlers)),
      (PluginGroup::CheckPlugins, names_of(&self.checks)),
      (PluginGroup::ReleasePlugins, names_of(&self.release)),
      (PluginGroup::VersionRules, names_of(&self.rules)),
    ];
    for (group, names) in groups {
      for name in names {
        if known.iter().any(|(g, n)| *g == group && *n == name) {
          return Err(RailError::config(format!("plugin '{}' is registered twice in {}", name, group)));
        }
        known.push((group, name));
      }
    }

    for name in config.enable.iter().chain(&config.disable) {
      if !known.iter().any(|(_, n)| n == name) {
        return Err(RailError::Config(ConfigError::UnknownPlugin {
          name: name.clone(),
          known: known.iter().map(|(_, n)| n.clone()).collect(),
        }));
      }
      if config.enable.contains(name) && config.disable.contains(name) {
        return Err(RailError::config(format!(
          "plugin '{}' is listed in both plugins.enable and plugins.disable",
          name
        )));
      }
    }

    let keep = |name: &str, default: bool| {
      let enabled = default || config.enable.iter().any(|n| n == name);
      enabled && !config.disable.iter().any(|n| n == name)
    };

    let registry = PluginRegistry {
      handlers: self
        .handlers
        .into_iter()
        .filter(|p| keep(p.name(), p.enabled_by_default()))
        .collect(),
      checks: self
        .checks
        .into_iter()
        .filter(|p| keep(p.name(), p.enabled_by_default()))
        .collect(),
      release: self
        .release
        .into_iter()
        .filter(|p| keep(p.name(), p.enabled_by_default()))
        .collect(),
      rules: self
        .rules
        .into_iter()
        .filter(|p| keep(p.name(), p.enabled_by_default()))
        .collect(),
      known,
    };

    for group in PluginGroup::ALL {
      debug!(group = %group, plugins = ?registry.names(group.as_str()), "plugins loaded");
    }
    Ok(registry)
  }
}
