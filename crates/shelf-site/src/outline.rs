//! Author-facing outline tree.
//!
//! Outlines are YAML lists of nested topics. A node with `items` is a
//! section, a node with `link` is a leaf:
//!
//! ```yaml
//! - title: Java
//!   items:
//!     - title: Unit-1
//!       items:
//!         - label: Intro
//!           link: /java/u1/intro
//! ```
//!
//! Nested sections in existing data name themselves with `label` as often as
//! with `title`, so sections accept either key (`title` wins when both are
//! set and non-empty). The raw shape is validated once, in
//! [`parse_outline`], and everything downstream works on [`OutlineNode`].

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Validated outline node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutlineNode {
    /// Topic grouping nested nodes.
    Section {
        /// Display title.
        title: String,
        /// Child nodes in authored order.
        items: Vec<OutlineNode>,
    },
    /// Link to a single page.
    Leaf {
        /// Display label.
        label: String,
        /// Link target path.
        link: String,
    },
}

impl OutlineNode {
    /// Create a section node.
    #[must_use]
    pub fn section(title: impl Into<String>, items: Vec<OutlineNode>) -> Self {
        Self::Section {
            title: title.into(),
            items,
        }
    }

    /// Create a leaf node.
    #[must_use]
    pub fn leaf(label: impl Into<String>, link: impl Into<String>) -> Self {
        Self::Leaf {
            label: label.into(),
            link: link.into(),
        }
    }
}

/// Outline node as written in YAML, before validation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOutlineNode {
    title: Option<String>,
    label: Option<String>,
    link: Option<String>,
    items: Option<Vec<RawOutlineNode>>,
}

impl RawOutlineNode {
    /// Name used for this node in error breadcrumbs.
    fn display_name(&self, index: usize) -> String {
        self.title
            .as_deref()
            .or(self.label.as_deref())
            .filter(|name| !name.is_empty())
            .map_or_else(|| format!("#{}", index + 1), |name| format!("{name:?}"))
    }
}

/// Outline loading and validation error.
#[derive(Debug, thiserror::Error)]
pub enum OutlineError {
    /// Outline file could not be read.
    #[error("failed to read outline {}: {source}", .path.display())]
    Io {
        /// Outline file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Outline is not valid YAML or has unexpected keys.
    #[error("invalid outline{}: {message}", file_suffix(.path.as_deref()))]
    Parse {
        /// Outline file, when loaded from disk.
        path: Option<PathBuf>,
        /// Parser message.
        message: String,
    },
    /// A node is neither a valid section nor a valid leaf.
    #[error("malformed outline node at {location}: {reason}")]
    Malformed {
        /// Breadcrumb to the node (e.g., `data/mca.yaml: "Java" > "Unit-1" > #3`).
        location: String,
        /// What is wrong with it.
        reason: &'static str,
    },
}

fn file_suffix(path: Option<&Path>) -> String {
    path.map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}

impl OutlineError {
    /// Attach the source file to a parse or validation error.
    fn in_file(self, file: &Path) -> Self {
        match self {
            Self::Parse { message, .. } => Self::Parse {
                path: Some(file.to_path_buf()),
                message,
            },
            Self::Malformed { location, reason } => Self::Malformed {
                location: format!("{}: {location}", file.display()),
                reason,
            },
            io @ Self::Io { .. } => io,
        }
    }
}

/// Parse and validate an outline from YAML (or JSON) text.
///
/// Empty input is an empty outline.
///
/// # Errors
///
/// Returns [`OutlineError::Parse`] for invalid YAML and
/// [`OutlineError::Malformed`] for the first node that is neither a section
/// nor a leaf.
pub fn parse_outline(content: &str) -> Result<Vec<OutlineNode>, OutlineError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let raw: Vec<RawOutlineNode> =
        serde_yaml::from_str(trimmed).map_err(|e| OutlineError::Parse {
            path: None,
            message: e.to_string(),
        })?;

    let mut breadcrumb = Vec::new();
    validate_nodes(raw, &mut breadcrumb)
}

/// Load one outline file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation; the
/// error names the file.
pub fn load_outline(path: &Path) -> Result<Vec<OutlineNode>, OutlineError> {
    let content = std::fs::read_to_string(path).map_err(|source| OutlineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let nodes = parse_outline(&content).map_err(|e| e.in_file(path))?;
    tracing::debug!(path = %path.display(), nodes = nodes.len(), "Loaded outline");
    Ok(nodes)
}

/// Load several outline files and concatenate their top-level nodes in order.
///
/// # Errors
///
/// Fails on the first file that cannot be loaded.
pub fn load_outlines(paths: &[PathBuf]) -> Result<Vec<OutlineNode>, OutlineError> {
    let mut nodes = Vec::new();
    for path in paths {
        nodes.extend(load_outline(path)?);
    }
    Ok(nodes)
}

fn validate_nodes(
    raw: Vec<RawOutlineNode>,
    breadcrumb: &mut Vec<String>,
) -> Result<Vec<OutlineNode>, OutlineError> {
    raw.into_iter()
        .enumerate()
        .map(|(index, node)| validate_node(node, index, breadcrumb))
        .collect()
}

fn validate_node(
    raw: RawOutlineNode,
    index: usize,
    breadcrumb: &mut Vec<String>,
) -> Result<OutlineNode, OutlineError> {
    let name = raw.display_name(index);

    match (raw.items, raw.link) {
        (Some(_), Some(_)) => Err(malformed(breadcrumb, &name, "node has both items and link")),
        (Some(items), None) => {
            let title = match (raw.title, raw.label) {
                (Some(title), _) if !title.is_empty() => title,
                (_, Some(label)) => label,
                (Some(title), None) => title,
                (None, None) => {
                    return Err(malformed(
                        breadcrumb,
                        &name,
                        "section has neither title nor label",
                    ));
                }
            };
            breadcrumb.push(name);
            let items = validate_nodes(items, breadcrumb);
            breadcrumb.pop();
            Ok(OutlineNode::Section { title, items: items? })
        }
        (None, Some(link)) => match raw.label {
            Some(label) => Ok(OutlineNode::Leaf { label, link }),
            None => Err(malformed(breadcrumb, &name, "leaf has no label")),
        },
        (None, None) => Err(malformed(
            breadcrumb,
            &name,
            "node has neither items nor link",
        )),
    }
}

fn malformed(breadcrumb: &[String], name: &str, reason: &'static str) -> OutlineError {
    OutlineError::Malformed {
        location: location(breadcrumb, name),
        reason,
    }
}

fn location(breadcrumb: &[String], name: &str) -> String {
    let mut out = String::new();
    for segment in breadcrumb {
        let _ = write!(out, "{segment} > ");
    }
    out.push_str(name);
    out
}
