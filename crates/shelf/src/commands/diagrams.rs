//! `shelf diagrams` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use shelf_config::{CliSettings, Config};
use shelf_diagrams::{DiagramController, FsPage, KrokiLoader};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the diagrams command.
#[derive(Args)]
pub(crate) struct DiagramsArgs {
    /// Path to configuration file (default: auto-discover shelf.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Built site directory (overrides config).
    #[arg(short, long)]
    site_dir: Option<PathBuf>,

    /// Appearance file holding the root class list and palette (overrides config).
    #[arg(short, long)]
    appearance: Option<PathBuf>,

    /// Kroki server URL for diagram rendering (overrides config).
    #[arg(long, env = "SHELF_KROKI_URL")]
    kroki_url: Option<String>,

    /// Enable verbose output (show render and watcher logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl DiagramsArgs {
    /// Execute the diagrams command.
    ///
    /// Runs until interrupted or until both watchers stop.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            kroki_url: self.kroki_url,
            site_dir: self.site_dir,
            appearance_file: self.appearance,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(config = ?config.config_path, "Loaded configuration");
        let diagrams = &config.diagrams_resolved;

        let kroki_url = diagrams.kroki_url.clone().ok_or_else(|| {
            CliError::Validation(
                "diagram rendering needs a Kroki URL: set diagrams.kroki_url or pass --kroki-url"
                    .to_owned(),
            )
        })?;

        output.highlight("Diagram controller");
        output.info(&format!("Kroki URL: {kroki_url}"));
        output.info(&format!("Site directory: {}", diagrams.site_dir.display()));
        output.info(&format!(
            "Appearance file: {}",
            diagrams.appearance_file.display()
        ));
        if !diagrams.site_dir.is_dir() {
            output.info("Site directory not found; content changes will not be watched");
        }

        let page = Arc::new(FsPage::new(
            diagrams.appearance_file.clone(),
            diagrams.site_dir.clone(),
        ));
        let loader = Arc::new(
            KrokiLoader::new(kroki_url, diagrams.site_dir.clone()).timeout(diagrams.timeout),
        );
        let controller = Arc::new(DiagramController::new(
            page,
            loader,
            diagrams.selector.clone(),
        ));
        output.info(&format!("Selector: {}", controller.selector()));

        tokio::select! {
            result = controller.run() => {
                result?;
                output.info("All watchers closed");
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                output.info("Interrupted");
            }
        }

        Ok(())
    }
}
