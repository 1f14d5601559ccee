//! `shelf sidebar` command implementation.

use std::path::PathBuf;

use clap::Args;
use shelf_config::Config;
use shelf_site::{ThemeConfig, sidebar_for};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the sidebar command.
#[derive(Args)]
pub(crate) struct SidebarArgs {
    /// Path to configuration file (default: auto-discover shelf.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print only the sidebar for this path prefix (e.g. /mca/).
    #[arg(short, long)]
    path: Option<String>,
}

impl SidebarArgs {
    /// Execute the sidebar command.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let config = Config::load(self.config.as_deref(), None)?;
        let json = render(&config, self.path.as_deref())?;
        Output::data(&json)?;
        Ok(())
    }
}

/// Pretty JSON for one sidebar, or every sidebar keyed by path prefix.
fn render(config: &Config, path: Option<&str>) -> Result<String, CliError> {
    tracing::debug!(
        path = path.unwrap_or("*"),
        sidebars = config.sidebars_resolved.len(),
        "Rendering sidebars"
    );
    let json = match path {
        Some(path) => serde_json::to_string_pretty(&sidebar_for(config, path)?)?,
        None => serde_json::to_string_pretty(&ThemeConfig::from_config(config)?.sidebar)?,
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn config_in(dir: &std::path::Path) -> Config {
        std::fs::write(
            dir.join("java.yaml"),
            "- title: Java\n  items:\n    - label: Intro\n      link: /java/intro\n",
        )
        .unwrap();
        std::fs::write(dir.join("empty.yaml"), "[]\n").unwrap();
        std::fs::write(
            dir.join("shelf.toml"),
            "[[sidebar]]\npath = \"/java/\"\noutlines = [\"java.yaml\"]\n\n[[sidebar]]\npath = \"/empty/\"\noutlines = [\"empty.yaml\"]\n",
        )
        .unwrap();
        Config::load(Some(dir.join("shelf.toml").as_path()), None).unwrap()
    }

    #[test]
    fn test_render_single_sidebar() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let out: Value = serde_json::from_str(&render(&config, Some("/java/")).unwrap()).unwrap();

        assert_eq!(
            out,
            json!([{
                "text": "Java",
                "collapsed": true,
                "items": [{"text": "Intro", "link": "/java/intro"}]
            }])
        );
    }

    #[test]
    fn test_render_all_sidebars() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let out: Value = serde_json::from_str(&render(&config, None).unwrap()).unwrap();

        assert_eq!(out["/empty/"], json!([]));
        assert_eq!(out["/java/"][0]["text"], "Java");
    }

    #[test]
    fn test_render_unknown_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let err = render(&config, Some("/nope/")).unwrap_err();

        assert_eq!(err.to_string(), "no sidebar configured for /nope/");
    }
}
