pub mod settings;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "geo-owl")]
#[command(about = "Prepare the Python environment and launch the Geo Owl dashboard")]
pub struct CliConfig {
    /// Path to a TOML configuration file (defaults to <project-dir>/geo-owl.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the application, manifest and environment
    #[arg(long, env = "GEO_OWL_HOME")]
    pub project_dir: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Show the launch plan without running anything
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn project_dir(&self) -> std::io::Result<PathBuf> {
        match &self.project_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir(),
        }
    }
}
