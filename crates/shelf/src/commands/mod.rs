//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod diagrams;
pub(crate) mod sidebar;

pub(crate) use build::BuildArgs;
pub(crate) use diagrams::DiagramsArgs;
pub(crate) use sidebar::SidebarArgs;
