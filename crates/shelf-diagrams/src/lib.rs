//! Theme-reactive diagram rendering for shelf sites.
//!
//! This crate provides:
//! - [`DiagramController`]: renders diagrams and re-renders them on appearance or content changes
//! - [`Page`]: the root element and content container the controller observes
//! - [`FsPage`]: a page backed by an appearance file and a built site directory
//! - [`KrokiLoader`]: a diagram library rendering Mermaid via a Kroki server
//!
//! # Quick Start
//!
//! ```no_run
//! # async fn example() -> Result<(), shelf_diagrams::ControllerError> {
//! use std::sync::Arc;
//! use shelf_diagrams::{DiagramController, FsPage, KrokiLoader};
//!
//! let page = Arc::new(FsPage::new("appearance.toml", "docs/.vitepress/dist"));
//! let loader = Arc::new(KrokiLoader::new("https://kroki.io", "docs/.vitepress/dist"));
//! let controller = Arc::new(DiagramController::new(page, loader, ".mermaid"));
//! controller.run().await?;
//! # Ok(())
//! # }
//! ```

mod appearance;
mod controller;
mod debouncer;
mod fs_page;
mod html_embed;
mod kroki;
mod library;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod page;

pub use appearance::{Appearance, InitOptions, ThemeVariables};
pub use controller::{ControllerError, ControllerState, DiagramController};
pub use fs_page::FsPage;
pub use kroki::{KrokiLibrary, KrokiLoader};
pub use library::{DiagramError, DiagramLibrary, LibraryLoader, LoadError, RenderSummary};
pub use page::{
    ChangeReceiver, Mutation, MutationBatch, Page, RootElement, Subscription, WatchError,
    WatchHandle, WatchTarget,
};
