//! Diagram library traits.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::appearance::InitOptions;

/// Error acquiring the diagram library.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The rendering service could not be reached.
    #[error("diagram service at {url} is unreachable: {message}")]
    Unreachable {
        /// Probed URL.
        url: String,
        /// Transport error.
        message: String,
    },
    /// The rendering service answered with a failure status.
    #[error("diagram service at {url} returned HTTP {status}")]
    Status {
        /// Probed URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// Loading was interrupted.
    #[error("diagram library load aborted: {0}")]
    Aborted(String),
}

/// Error from `initialize` or `render`.
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    /// Selector is not a single class selector.
    #[error("unsupported diagram selector {0:?}: expected a class selector like \".mermaid\"")]
    InvalidSelector(String),
    /// `render` was called before `initialize`.
    #[error("diagram library is not initialized")]
    NotInitialized,
    /// A page file could not be read or written.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Page file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A rendering task failed to complete.
    #[error("render task failed: {0}")]
    Task(String),
}

/// Outcome of one `render` pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderSummary {
    /// Page files scanned.
    pub pages: usize,
    /// Page files rewritten.
    pub pages_updated: usize,
    /// Diagrams rendered.
    pub rendered: usize,
    /// Diagrams already current for the active theme.
    pub up_to_date: usize,
    /// Diagrams that failed to render and were left in place.
    pub failed: usize,
}

/// Diagramming library as seen by the controller.
#[async_trait]
pub trait DiagramLibrary: Send + Sync {
    /// Configure theme and palette for subsequent renders.
    async fn initialize(&self, options: InitOptions) -> Result<(), DiagramError>;

    /// Render every placeholder matching `selector`.
    async fn render(&self, selector: &str) -> Result<RenderSummary, DiagramError>;
}

/// Asynchronous acquisition of a [`DiagramLibrary`].
#[async_trait]
pub trait LibraryLoader: Send + Sync {
    /// Load the library.
    async fn load(&self) -> Result<Arc<dyn DiagramLibrary>, LoadError>;
}
