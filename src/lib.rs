//! pyrail - version bumping, structured changelogs and release checks for
//! Python projects and mono-repositories.
//!
//! The binary is a thin clap front end over these modules. Embedders can
//! build their own [`plugins::PluginRegistry`] to add project handlers,
//! checks, release plugins or version rules.

pub mod changelog;
pub mod commands;
pub mod core;
pub mod plugins;
pub mod project;
pub mod ui;
pub mod version;

#[cfg(test)]
mod testing;
