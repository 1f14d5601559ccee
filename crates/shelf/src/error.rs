//! CLI error types.

use shelf_config::ConfigError;
use shelf_diagrams::ControllerError;
use shelf_site::SiteError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Site(#[from] SiteError),

    #[error("{0}")]
    Diagrams(#[from] ControllerError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),
}
