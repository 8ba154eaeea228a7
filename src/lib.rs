pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::process::SystemRunner;
pub use crate::config::settings::{InstallPolicy, LaunchSettings};
pub use crate::config::toml_config::TomlConfig;
pub use crate::core::{launcher::Launcher, placer::Placer};
pub use crate::utils::error::{GeoOwlError, Result};
