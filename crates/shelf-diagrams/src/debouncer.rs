//! Coalescing of raw file watcher events.
//!
//! Editors and site builders emit bursts of events per file; the debouncer
//! folds them into one change per path once the path has been quiet for the
//! debounce window.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// What happened to a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    /// Map a notify event kind, ignoring access and metadata-only kinds.
    pub(crate) fn from_notify(kind: notify::EventKind) -> Option<Self> {
        match kind {
            notify::EventKind::Create(_) => Some(Self::Created),
            notify::EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => None,
            notify::EventKind::Modify(_) => Some(Self::Modified),
            notify::EventKind::Remove(_) => Some(Self::Removed),
            _ => None,
        }
    }

    /// Fold a later change into an earlier one.
    ///
    /// Returns `None` when the file appeared and vanished within the window.
    fn then(self, later: Self) -> Option<Self> {
        match (self, later) {
            (Self::Created, Self::Removed) => None,
            (Self::Created, _) => Some(Self::Created),
            (Self::Removed, Self::Created) => Some(Self::Modified),
            (_, later) => Some(later),
        }
    }
}

struct Pending {
    kind: ChangeKind,
    deadline: Instant,
}

/// Thread-safe per-path debouncer.
pub(crate) struct ChangeDebouncer {
    pending: Mutex<HashMap<PathBuf, Pending>>,
    window: Duration,
}

impl ChangeDebouncer {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            window,
        }
    }

    /// Record a change; called from the watcher callback thread.
    pub(crate) fn record(&self, path: PathBuf, kind: ChangeKind) {
        use std::collections::hash_map::Entry;

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let deadline = Instant::now() + self.window;

        match pending.entry(path) {
            Entry::Vacant(entry) => {
                entry.insert(Pending { kind, deadline });
            }
            Entry::Occupied(mut entry) => match entry.get().kind.then(kind) {
                Some(folded) => {
                    *entry.get_mut() = Pending {
                        kind: folded,
                        deadline,
                    };
                }
                None => {
                    entry.remove();
                }
            },
        }
    }

    /// Take every change whose path has been quiet for the window.
    pub(crate) fn drain_ready(&self) -> Vec<(PathBuf, ChangeKind)> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        let mut ready: Vec<_> = pending
            .extract_if(|_, change| change.deadline <= now)
            .map(|(path, change)| (path, change.kind))
            .collect();
        ready.sort_by(|a, b| a.0.cmp(&b.0));
        ready
    }
}
