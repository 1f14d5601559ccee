//! Sidebar widget tree and the outline transform.
//!
//! [`transform`] turns validated [`OutlineNode`]s into [`SidebarNode`]s for
//! the documentation framework's sidebar renderer. Sections become groups
//! that start collapsed, leaves become entries, and the tree keeps the exact
//! shape and order of the outline.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::outline::OutlineNode;

/// Sidebar menu node.
///
/// Serializes to the framework's sidebar item shape: groups as
/// `{text, collapsed, items}`, entries as `{text, link}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SidebarNode {
    /// Collapsible group of nested nodes.
    Group {
        /// Group heading.
        text: String,
        /// Initial collapse state. `None` renders a group that cannot collapse.
        #[serde(skip_serializing_if = "Option::is_none")]
        collapsed: Option<bool>,
        /// Child nodes.
        items: Vec<SidebarNode>,
    },
    /// Link to a page.
    Entry {
        /// Link text.
        text: String,
        /// Link target path.
        link: String,
    },
}

impl SidebarNode {
    /// Create a group that starts collapsed.
    #[must_use]
    pub fn group(text: impl Into<String>, items: Vec<SidebarNode>) -> Self {
        Self::Group {
            text: text.into(),
            collapsed: Some(true),
            items,
        }
    }

    /// Create an entry.
    #[must_use]
    pub fn entry(text: impl Into<String>, link: impl Into<String>) -> Self {
        Self::Entry {
            text: text.into(),
            link: link.into(),
        }
    }

    /// Display text of this node.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Group { text, .. } | Self::Entry { text, .. } => text,
        }
    }

    /// Child nodes (empty for entries).
    #[must_use]
    pub fn items(&self) -> &[SidebarNode] {
        match self {
            Self::Group { items, .. } => items,
            Self::Entry { .. } => &[],
        }
    }
}

/// One level of the transform still being filled in.
struct Frame<'a> {
    /// Heading of the group this level becomes (unused for the root level).
    text: &'a str,
    rest: std::slice::Iter<'a, OutlineNode>,
    items: Vec<SidebarNode>,
}

impl<'a> Frame<'a> {
    fn new(text: &'a str, nodes: &'a [OutlineNode]) -> Self {
        Self {
            text,
            rest: nodes.iter(),
            items: Vec::with_capacity(nodes.len()),
        }
    }
}

/// Convert an outline into sidebar nodes.
///
/// Every section becomes a collapsed [`SidebarNode::Group`], every leaf a
/// [`SidebarNode::Entry`]; shape and order are preserved and empty sections
/// stay as empty groups. The transform itself walks an explicit stack and
/// never recurses. Dropping or serializing the trees still recurses; outlines
/// read through [`parse_outline`](crate::parse_outline) are already limited
/// by the YAML parser's nesting limit.
#[must_use]
pub fn transform(outline: &[OutlineNode]) -> Vec<SidebarNode> {
    let mut stack = vec![Frame::new("", outline)];
    let mut result = Vec::new();

    while let Some(frame) = stack.last_mut() {
        match frame.rest.next() {
            Some(OutlineNode::Leaf { label, link }) => {
                frame.items.push(SidebarNode::entry(label.as_str(), link.as_str()));
            }
            Some(OutlineNode::Section { title, items }) => {
                stack.push(Frame::new(title, items));
            }
            None => {
                let Some(done) = stack.pop() else { break };
                match stack.last_mut() {
                    Some(parent) => parent.items.push(SidebarNode::group(done.text, done.items)),
                    None => result = done.items,
                }
            }
        }
    }

    result
}

/// Hand-written sidebar node as found in authored sidebar files.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSidebarNode {
    text: String,
    link: Option<String>,
    collapsed: Option<bool>,
    items: Option<Vec<RawSidebarNode>>,
}

/// Authored sidebar loading error.
#[derive(Debug, thiserror::Error)]
pub enum AuthoredSidebarError {
    /// File could not be read.
    #[error("failed to read sidebar {}: {source}", .path.display())]
    Io {
        /// Sidebar file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// File is not valid YAML or has unexpected keys.
    #[error("invalid sidebar {}: {message}", .path.display())]
    Parse {
        /// Sidebar file.
        path: std::path::PathBuf,
        /// Parser message.
        message: String,
    },
    /// A node is neither a group nor an entry.
    #[error("invalid sidebar {}: node {text:?} {reason}", .path.display())]
    Malformed {
        /// Sidebar file.
        path: std::path::PathBuf,
        /// Text of the offending node.
        text: String,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Load a hand-written sidebar (already in sidebar shape) from YAML.
///
/// Groups may omit `collapsed`; a group with both `link` and `items` or an
/// entry without `link` is rejected.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or validated.
pub fn load_authored_sidebar(path: &Path) -> Result<Vec<SidebarNode>, AuthoredSidebarError> {
    let content = std::fs::read_to_string(path).map_err(|source| AuthoredSidebarError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let raw: Vec<RawSidebarNode> =
        serde_yaml::from_str(trimmed).map_err(|e| AuthoredSidebarError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    raw.into_iter()
        .map(|node| authored_node(node, path))
        .collect()
}

fn authored_node(raw: RawSidebarNode, path: &Path) -> Result<SidebarNode, AuthoredSidebarError> {
    let malformed = |text: String, reason| AuthoredSidebarError::Malformed {
        path: path.to_path_buf(),
        text,
        reason,
    };

    match (raw.items, raw.link) {
        (Some(_), Some(_)) => Err(malformed(raw.text, "has both link and items")),
        (Some(items), None) => Ok(SidebarNode::Group {
            text: raw.text,
            collapsed: raw.collapsed,
            items: items
                .into_iter()
                .map(|item| authored_node(item, path))
                .collect::<Result<_, _>>()?,
        }),
        (None, Some(_)) if raw.collapsed.is_some() => {
            Err(malformed(raw.text, "sets collapsed without items"))
        }
        (None, Some(link)) => Ok(SidebarNode::Entry {
            text: raw.text,
            link,
        }),
        (None, None) => Err(malformed(raw.text, "has neither link nor items")),
    }
}
