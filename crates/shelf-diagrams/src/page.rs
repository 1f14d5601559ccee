//! Page abstraction observed by the diagram controller.
//!
//! A [`Page`] exposes a root element (class list and custom properties) and
//! lets callers subscribe to mutation batches on the root or on the main
//! content container.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};

/// Snapshot of the page's root element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RootElement {
    /// Class list, in document order.
    pub classes: Vec<String>,
    /// Computed custom properties (e.g. `--mm-bg`), keyed by property name.
    pub properties: HashMap<String, String>,
}

impl RootElement {
    /// Whether the class list contains `class`.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Trimmed value of a custom property.
    ///
    /// Returns `None` when the property is unset or whitespace-only.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// Element a subscription observes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WatchTarget {
    /// Root element attributes.
    Root,
    /// Main content container subtree.
    Content,
}

/// Single observed change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// An attribute of the observed element changed.
    Attributes {
        /// Attribute name (e.g. `class`, `style`).
        name: String,
    },
    /// Children were added to or removed from the observed subtree.
    ChildList {
        /// Number of added nodes.
        added: usize,
        /// Number of removed nodes.
        removed: usize,
    },
}

impl Mutation {
    /// Attribute mutation for `name`.
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::Attributes { name: name.into() }
    }
}

/// Mutations delivered together in one notification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutationBatch(Vec<Mutation>);

impl MutationBatch {
    /// Create a batch from mutations.
    #[must_use]
    pub fn new(mutations: Vec<Mutation>) -> Self {
        Self(mutations)
    }

    /// Mutations in delivery order.
    #[must_use]
    pub fn mutations(&self) -> &[Mutation] {
        &self.0
    }

    /// Whether any mutation changed the `class` attribute.
    #[must_use]
    pub fn touches_class(&self) -> bool {
        self.0
            .iter()
            .any(|m| matches!(m, Mutation::Attributes { name } if name == "class"))
    }

    /// Whether any mutation added child nodes.
    #[must_use]
    pub fn adds_children(&self) -> bool {
        self.0
            .iter()
            .any(|m| matches!(m, Mutation::ChildList { added, .. } if *added > 0))
    }
}

/// Receiver for mutation batches.
pub struct ChangeReceiver {
    rx: mpsc::UnboundedReceiver<MutationBatch>,
}

impl ChangeReceiver {
    /// Wrap a channel receiver.
    #[must_use]
    pub fn new(rx: mpsc::UnboundedReceiver<MutationBatch>) -> Self {
        Self { rx }
    }

    /// Wait for the next batch.
    ///
    /// Returns `None` once the watcher has stopped.
    pub async fn recv(&mut self) -> Option<MutationBatch> {
        self.rx.recv().await
    }
}

/// Handle to stop watching.
///
/// Dropping the handle disconnects the watcher.
pub struct WatchHandle {
    _shutdown: Option<oneshot::Sender<()>>,
}

impl WatchHandle {
    /// Create a handle that signals `shutdown` when dropped.
    #[must_use]
    pub fn new(shutdown: oneshot::Sender<()>) -> Self {
        Self {
            _shutdown: Some(shutdown),
        }
    }

    /// Create a handle with nothing to disconnect.
    #[must_use]
    pub fn no_op() -> Self {
        Self { _shutdown: None }
    }

    /// Stop watching now.
    pub fn stop(mut self) {
        self._shutdown.take();
    }
}

/// An active watch: the batch stream plus its unsubscribe handle.
pub struct Subscription {
    /// Incoming mutation batches.
    pub changes: ChangeReceiver,
    /// Unsubscribe handle.
    pub handle: WatchHandle,
}

/// Error installing a watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The underlying file watcher failed.
    #[error("file watcher error: {0}")]
    Notify(#[from] notify::Error),
    /// The watched location is unusable.
    #[error("cannot watch {}: {reason}", .path.display())]
    Unavailable {
        /// Watched location.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },
}

/// A rendered page the diagram controller reacts to.
pub trait Page: Send + Sync {
    /// Read the root element as it is now.
    fn root(&self) -> RootElement;

    /// Subscribe to mutations of `target`.
    ///
    /// Returns `Ok(None)` when the target element does not exist.
    fn watch(&self, target: WatchTarget) -> Result<Option<Subscription>, WatchError>;
}
