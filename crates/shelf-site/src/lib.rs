//! Sidebar and theme config generation for shelf.
//!
//! This crate provides:
//! - [`OutlineNode`]: author-facing topic trees loaded from YAML
//! - [`transform`]: outline to sidebar conversion
//! - [`ThemeConfig`]: site metadata, navigation and sidebars as one JSON document
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use shelf_config::Config;
//! use shelf_site::ThemeConfig;
//!
//! let config = Config::load(None, None)?;
//! let theme = ThemeConfig::from_config(&config)?;
//! theme.write(&config.output_resolved.theme_file)?;
//! # Ok(())
//! # }
//! ```

mod outline;
mod sidebar;
mod theme;

pub use outline::{OutlineError, OutlineNode, load_outline, load_outlines, parse_outline};
pub use sidebar::{AuthoredSidebarError, SidebarNode, load_authored_sidebar, transform};
pub use theme::{SidebarMap, SiteError, ThemeConfig, build_sidebar, sidebar_for};
