//! `shelf build` command implementation.

use std::path::PathBuf;

use clap::Args;
use shelf_config::{CliSettings, Config};
use shelf_site::ThemeConfig;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover shelf.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Theme config output file (overrides config).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl BuildArgs {
    /// Execute the build command.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            theme_file: self.output,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(config = ?config.config_path, "Loaded configuration");

        if let Some(path) = &config.config_path {
            output.info(&format!("Config: {}", path.display()));
        }

        let theme = ThemeConfig::from_config(&config)?;
        let theme_file = &config.output_resolved.theme_file;
        theme.write(theme_file)?;

        output.success(&format!(
            "Wrote {} sidebar(s) to {}",
            theme.sidebar.len(),
            theme_file.display()
        ));
        Ok(())
    }
}
