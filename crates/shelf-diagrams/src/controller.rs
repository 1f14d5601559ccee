//! Theme-reactive diagram controller.
//!
//! Loads the diagram library once, renders every placeholder, then re-renders
//! whenever the page switches between light and dark or new content appears.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --run()--> Ready --trigger--> Reacting --done--> Ready
//! ```
//!
//! Reactions are spawned independently; overlapping reactions are neither
//! sequenced nor cancelled, so the last one to finish wins.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::OnceCell;
use tokio::task::JoinSet;

use crate::appearance::InitOptions;
use crate::library::{DiagramError, DiagramLibrary, LibraryLoader, LoadError, RenderSummary};
use crate::page::{ChangeReceiver, MutationBatch, Page, WatchError, WatchHandle, WatchTarget};

/// Memoized outcome of the one library load.
type LoadResult = Result<Arc<dyn DiagramLibrary>, Arc<LoadError>>;

/// Controller error.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The diagram library could not be loaded.
    #[error("failed to load diagram library: {0}")]
    Load(#[from] Arc<LoadError>),
    /// `initialize` or `render` failed.
    #[error(transparent)]
    Diagram(#[from] DiagramError),
    /// A watcher could not be installed.
    #[error(transparent)]
    Watch(#[from] WatchError),
}

/// Observable controller state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    /// The library has not finished loading.
    Uninitialized,
    /// Loaded and idle.
    Ready,
    /// At least one reaction is in flight.
    Reacting,
    /// Loading failed; the failure is final.
    Failed,
}

/// What caused a reaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Trigger {
    Start,
    Appearance,
    Content,
}

impl Trigger {
    fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Appearance => "appearance",
            Self::Content => "content",
        }
    }
}

/// Keeps the reaction counter raised for the lifetime of a reaction.
struct Reacting<'a>(&'a AtomicUsize);

impl<'a> Reacting<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Reacting<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Re-renders diagrams when the page's appearance or content changes.
pub struct DiagramController {
    page: Arc<dyn Page>,
    loader: Arc<dyn LibraryLoader>,
    selector: String,
    library: OnceCell<LoadResult>,
    reacting: AtomicUsize,
}

impl DiagramController {
    /// Create a controller rendering placeholders matching `selector`.
    pub fn new(
        page: Arc<dyn Page>,
        loader: Arc<dyn LibraryLoader>,
        selector: impl Into<String>,
    ) -> Self {
        Self {
            page,
            loader,
            selector: selector.into(),
            library: OnceCell::new(),
            reacting: AtomicUsize::new(0),
        }
    }

    /// Placeholder selector.
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        match self.library.get() {
            None => ControllerState::Uninitialized,
            Some(Err(_)) => ControllerState::Failed,
            Some(Ok(_)) if self.reacting.load(Ordering::SeqCst) > 0 => ControllerState::Reacting,
            Some(Ok(_)) => ControllerState::Ready,
        }
    }

    /// Get the diagram library, loading it on first use.
    ///
    /// Concurrent callers share a single pending load. The outcome is
    /// memoized, failure included: a failed load is never retried.
    pub async fn library(&self) -> Result<Arc<dyn DiagramLibrary>, Arc<LoadError>> {
        let result = self
            .library
            .get_or_init(|| async {
                tracing::debug!("Loading diagram library");
                self.loader.load().await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to load diagram library");
                    Arc::new(e)
                })
            })
            .await;

        result.as_ref().map(Arc::clone).map_err(Arc::clone)
    }

    /// Init options for the page as it looks right now.
    #[must_use]
    pub fn init_options(&self) -> InitOptions {
        InitOptions::from_root(&self.page.root())
    }

    /// Re-initialize the library for the current appearance and re-render.
    ///
    /// The appearance is read fresh on every call.
    pub async fn reprocess(&self) -> Result<RenderSummary, ControllerError> {
        let library = self.library().await?;
        let _reacting = Reacting::enter(&self.reacting);

        let options = self.init_options();
        tracing::debug!(theme = options.theme.theme(), selector = %self.selector, "Re-rendering diagrams");
        library.initialize(options).await?;
        Ok(library.render(&self.selector).await?)
    }

    /// Reprocess, logging instead of returning errors.
    async fn react(&self, trigger: Trigger) {
        match self.reprocess().await {
            Ok(summary) => tracing::debug!(
                trigger = trigger.as_str(),
                rendered = summary.rendered,
                failed = summary.failed,
                "Reaction finished"
            ),
            Err(ControllerError::Load(_)) => {}
            Err(e) => tracing::warn!(trigger = trigger.as_str(), error = %e, "Diagram reaction failed"),
        }
    }

    /// Start the controller and react to changes until every watcher closes.
    ///
    /// Loads the library and renders once, then installs the appearance and
    /// content watchers. A missing content container is skipped. Dropping
    /// the returned future drops both watch handles.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Load`] if the library cannot be loaded, in
    /// which case no watcher is installed, or [`ControllerError::Watch`] if a
    /// watcher fails to install.
    pub async fn run(self: Arc<Self>) -> Result<(), ControllerError> {
        self.library().await?;
        self.react(Trigger::Start).await;

        let mut handles: Vec<WatchHandle> = Vec::with_capacity(2);
        let mut appearance = self.subscribe(WatchTarget::Root, &mut handles)?;
        let mut content = self.subscribe(WatchTarget::Content, &mut handles)?;
        if content.is_none() {
            tracing::debug!("No content container; content changes will not trigger renders");
        }

        let mut reactions = JoinSet::new();
        loop {
            tokio::select! {
                batch = next_batch(&mut appearance), if appearance.is_some() => match batch {
                    Some(batch) if batch.touches_class() => {
                        self.spawn_reaction(&mut reactions, Trigger::Appearance);
                    }
                    Some(_) => {}
                    None => appearance = None,
                },
                batch = next_batch(&mut content), if content.is_some() => match batch {
                    Some(batch) if batch.adds_children() => {
                        self.spawn_reaction(&mut reactions, Trigger::Content);
                    }
                    Some(_) => {}
                    None => content = None,
                },
                Some(joined) = reactions.join_next() => {
                    if let Err(e) = joined {
                        tracing::warn!(error = %e, "Diagram reaction panicked");
                    }
                }
                else => break,
            }
        }

        tracing::debug!("Watchers closed; diagram controller stopping");
        drop(handles);
        Ok(())
    }

    fn subscribe(
        &self,
        target: WatchTarget,
        handles: &mut Vec<WatchHandle>,
    ) -> Result<Option<ChangeReceiver>, WatchError> {
        Ok(self.page.watch(target)?.map(|subscription| {
            handles.push(subscription.handle);
            subscription.changes
        }))
    }

    fn spawn_reaction(self: &Arc<Self>, reactions: &mut JoinSet<()>, trigger: Trigger) {
        tracing::debug!(trigger = trigger.as_str(), "Change detected");
        let controller = Arc::clone(self);
        reactions.spawn(async move { controller.react(trigger).await });
    }
}

/// Next batch from an optional receiver; only polled while it is `Some`.
async fn next_batch(changes: &mut Option<ChangeReceiver>) -> Option<MutationBatch> {
    match changes {
        Some(changes) => changes.recv().await,
        None => None,
    }
}
