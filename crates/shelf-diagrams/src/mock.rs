//! In-memory page and library for testing the controller.
//!
//! [`MockPage`] lets a test change the root element and push mutation
//! batches by hand; [`MockLoader`] hands out a [`MockLibrary`] that records
//! every call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};

use crate::appearance::InitOptions;
use crate::library::{DiagramError, DiagramLibrary, LibraryLoader, LoadError, RenderSummary};
use crate::page::{
    ChangeReceiver, MutationBatch, Page, RootElement, Subscription, WatchError, WatchHandle,
    WatchTarget,
};

type Sender = mpsc::UnboundedSender<MutationBatch>;
type Receiver = mpsc::UnboundedReceiver<MutationBatch>;

/// Page driven entirely by the test.
///
/// Channels exist from construction, so batches emitted before the
/// controller subscribes are still delivered.
pub struct MockPage {
    root: Mutex<RootElement>,
    senders: Mutex<HashMap<WatchTarget, Sender>>,
    receivers: Mutex<HashMap<WatchTarget, Receiver>>,
    watched: Mutex<Vec<WatchTarget>>,
}

impl Default for MockPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPage {
    /// Page with both a root element and a content container.
    #[must_use]
    pub fn new() -> Self {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for target in [WatchTarget::Root, WatchTarget::Content] {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(target, tx);
            receivers.insert(target, rx);
        }
        Self {
            root: Mutex::new(RootElement::default()),
            senders: Mutex::new(senders),
            receivers: Mutex::new(receivers),
            watched: Mutex::new(Vec::new()),
        }
    }

    /// Remove the content container.
    #[must_use]
    pub fn without_content(self) -> Self {
        self.close(WatchTarget::Content);
        lock(&self.receivers).remove(&WatchTarget::Content);
        self
    }

    /// Replace the root class list.
    pub fn set_classes(&self, classes: &[&str]) {
        lock(&self.root).classes = classes.iter().map(|c| (*c).to_owned()).collect();
    }

    /// Set a custom property on the root.
    pub fn set_property(&self, name: &str, value: &str) {
        lock(&self.root)
            .properties
            .insert(name.to_owned(), value.to_owned());
    }

    /// Deliver a batch to subscribers of `target`.
    ///
    /// # Panics
    ///
    /// Panics if `target` was closed.
    pub fn emit(&self, target: WatchTarget, batch: MutationBatch) {
        lock(&self.senders)
            .get(&target)
            .expect("target is closed")
            .send(batch)
            .expect("subscriber is gone");
    }

    /// End the stream for `target`.
    pub fn close(&self, target: WatchTarget) {
        lock(&self.senders).remove(&target);
    }

    /// End every stream.
    pub fn close_all(&self) {
        lock(&self.senders).clear();
    }

    /// Targets that returned a subscription, in subscription order.
    #[must_use]
    pub fn watched(&self) -> Vec<WatchTarget> {
        lock(&self.watched).clone()
    }
}

impl Page for MockPage {
    fn root(&self) -> RootElement {
        lock(&self.root).clone()
    }

    fn watch(&self, target: WatchTarget) -> Result<Option<Subscription>, WatchError> {
        let Some(rx) = lock(&self.receivers).remove(&target) else {
            return Ok(None);
        };
        lock(&self.watched).push(target);
        Ok(Some(Subscription {
            changes: ChangeReceiver::new(rx),
            handle: WatchHandle::no_op(),
        }))
    }
}

/// Call recorded by [`MockLibrary`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LibraryCall {
    /// `initialize` with these options.
    Initialize(InitOptions),
    /// `render` with this selector.
    Render(String),
}

/// Library that records calls and renders nothing.
#[derive(Default)]
pub struct MockLibrary {
    calls: Mutex<Vec<LibraryCall>>,
    fail_render: AtomicBool,
}

impl MockLibrary {
    /// Calls so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<LibraryCall> {
        lock(&self.calls).clone()
    }

    /// Themes passed to `initialize`, in order.
    #[must_use]
    pub fn themes(&self) -> Vec<&'static str> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                LibraryCall::Initialize(options) => Some(options.theme.theme()),
                LibraryCall::Render(_) => None,
            })
            .collect()
    }

    /// Number of `render` calls.
    #[must_use]
    pub fn renders(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| matches!(call, LibraryCall::Render(_)))
            .count()
    }

    /// Make every subsequent `render` fail.
    pub fn fail_renders(&self) {
        self.fail_render.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DiagramLibrary for MockLibrary {
    async fn initialize(&self, options: InitOptions) -> Result<(), DiagramError> {
        lock(&self.calls).push(LibraryCall::Initialize(options));
        Ok(())
    }

    async fn render(&self, selector: &str) -> Result<RenderSummary, DiagramError> {
        lock(&self.calls).push(LibraryCall::Render(selector.to_owned()));
        if self.fail_render.load(Ordering::SeqCst) {
            return Err(DiagramError::Task("render failed".to_owned()));
        }
        Ok(RenderSummary::default())
    }
}

/// Loader counting loads, optionally gated or failing.
pub struct MockLoader {
    library: Arc<MockLibrary>,
    loads: AtomicUsize,
    gate: Option<Arc<Notify>>,
    fail: bool,
}

impl Default for MockLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLoader {
    /// Loader that succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self {
            library: Arc::new(MockLibrary::default()),
            loads: AtomicUsize::new(0),
            gate: None,
            fail: false,
        }
    }

    /// Loader that always fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Hold every load until `gate` is notified.
    #[must_use]
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// The library this loader hands out.
    #[must_use]
    pub fn library(&self) -> Arc<MockLibrary> {
        Arc::clone(&self.library)
    }

    /// Number of `load` calls.
    #[must_use]
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LibraryLoader for MockLoader {
    async fn load(&self) -> Result<Arc<dyn DiagramLibrary>, LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            return Err(LoadError::Unreachable {
                url: "mock://diagrams".to_owned(),
                message: "connection refused".to_owned(),
            });
        }
        let library: Arc<dyn DiagramLibrary> = self.library();
        Ok(library)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
