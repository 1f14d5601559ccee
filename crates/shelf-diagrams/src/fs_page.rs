//! Filesystem-backed [`Page`].
//!
//! The root element is an appearance file:
//!
//! ```toml
//! class = ["dark"]
//!
//! [style]
//! "--mm-bg" = "#0b0f14"
//! ```
//!
//! The content container is the built site directory. Watching uses `notify`
//! with a debouncer drained by a tokio task; each drain that yields changes
//! becomes one [`MutationBatch`].

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecursiveMode, Watcher};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};

use crate::debouncer::{ChangeDebouncer, ChangeKind};
use crate::page::{
    ChangeReceiver, Mutation, MutationBatch, Page, RootElement, Subscription, WatchError,
    WatchHandle, WatchTarget,
};

/// Default quiet period before changes are delivered.
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Interval between debouncer drains.
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AppearanceFile {
    class: Vec<String>,
    style: HashMap<String, String>,
}

/// Page whose root is an appearance file and whose content is a site directory.
#[derive(Debug, Clone)]
pub struct FsPage {
    appearance_file: PathBuf,
    content_dir: PathBuf,
    debounce: Duration,
}

impl FsPage {
    /// Create a page over `appearance_file` and `content_dir`.
    #[must_use]
    pub fn new(appearance_file: impl Into<PathBuf>, content_dir: impl Into<PathBuf>) -> Self {
        Self {
            appearance_file: appearance_file.into(),
            content_dir: content_dir.into(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Override the debounce window.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    fn watch_root(&self) -> Result<Subscription, WatchError> {
        let file = self.appearance_file.clone();
        let dir = parent_dir(&file);
        if !dir.is_dir() {
            return Err(WatchError::Unavailable {
                path: dir,
                reason: "directory does not exist".to_owned(),
            });
        }
        let name = file.file_name().map(OsString::from);
        let mut classes = read_root(&file).classes;

        spawn_watch(
            &dir,
            RecursiveMode::NonRecursive,
            self.debounce,
            move |path| name.is_some() && path.file_name() == name.as_deref(),
            move |_changes| {
                let current = read_root(&file).classes;
                let attribute = if current == classes { "style" } else { "class" };
                classes = current;
                Some(MutationBatch::new(vec![Mutation::attribute(attribute)]))
            },
        )
    }

    fn watch_content(&self) -> Result<Subscription, WatchError> {
        spawn_watch(
            &self.content_dir,
            RecursiveMode::Recursive,
            self.debounce,
            |path| path.extension().is_some_and(|ext| ext == "html"),
            |changes| {
                let removed = changes
                    .iter()
                    .filter(|(_, kind)| *kind == ChangeKind::Removed)
                    .count();
                let added = changes.len() - removed;
                Some(MutationBatch::new(vec![Mutation::ChildList {
                    added,
                    removed,
                }]))
            },
        )
    }
}

impl Page for FsPage {
    fn root(&self) -> RootElement {
        read_root(&self.appearance_file)
    }

    /// Watch the appearance file or the site directory.
    ///
    /// Must be called from within a tokio runtime.
    fn watch(&self, target: WatchTarget) -> Result<Option<Subscription>, WatchError> {
        match target {
            WatchTarget::Root => self.watch_root().map(Some),
            WatchTarget::Content if self.content_dir.is_dir() => self.watch_content().map(Some),
            WatchTarget::Content => Ok(None),
        }
    }
}

/// Directory containing `file`, treating a bare filename as the current directory.
fn parent_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Read the appearance file; a missing or invalid file yields an empty root.
fn read_root(path: &Path) -> RootElement {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return RootElement::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot read appearance file");
            return RootElement::default();
        }
    };

    match toml::from_str::<AppearanceFile>(&content) {
        Ok(file) => RootElement {
            classes: file.class,
            properties: file.style,
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Invalid appearance file");
            RootElement::default()
        }
    }
}

/// Install a notify watcher on `dir` and spawn the drain task.
///
/// `accept` filters event paths; `to_batch` turns each non-empty drain into
/// at most one batch. The task owns the watcher and stops when the returned
/// handle is dropped or the receiver goes away.
fn spawn_watch<A, B>(
    dir: &Path,
    mode: RecursiveMode,
    debounce: Duration,
    accept: A,
    mut to_batch: B,
) -> Result<Subscription, WatchError>
where
    A: Fn(&Path) -> bool + Send + 'static,
    B: FnMut(Vec<(PathBuf, ChangeKind)>) -> Option<MutationBatch> + Send + 'static,
{
    let debouncer = Arc::new(ChangeDebouncer::new(debounce));
    let recorder = Arc::clone(&debouncer);

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "File watcher error");
                return;
            }
        };
        let Some(kind) = ChangeKind::from_notify(event.kind) else {
            return;
        };
        for path in event.paths {
            if accept(&path) {
                recorder.record(path, kind);
            }
        }
    })?;
    watcher.watch(dir, mode)?;

    let (batch_tx, batch_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let watched = dir.to_path_buf();

    tokio::spawn(async move {
        let _watcher = watcher;
        let mut ticker = tokio::time::interval(DRAIN_INTERVAL);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {}
            }

            let changes = debouncer.drain_ready();
            if changes.is_empty() {
                continue;
            }
            tracing::debug!(dir = %watched.display(), changes = changes.len(), "Detected changes");
            if let Some(batch) = to_batch(changes)
                && batch_tx.send(batch).is_err()
            {
                break;
            }
        }

        tracing::debug!(dir = %watched.display(), "Stopped watching");
    });

    Ok(Subscription {
        changes: ChangeReceiver::new(batch_rx),
        handle: WatchHandle::new(shutdown_tx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const QUICK: Duration = Duration::from_millis(20);
    const PATIENCE: Duration = Duration::from_secs(5);

    /// Wait for a batch satisfying `wanted`, skipping intermediate ones.
    async fn wait_for(subscription: &mut Subscription, wanted: impl Fn(&MutationBatch) -> bool) {
        tokio::time::timeout(PATIENCE, async {
            loop {
                let batch = subscription.changes.recv().await.expect("watcher stopped");
                if wanted(&batch) {
                    break;
                }
            }
        })
        .await
        .expect("timed out waiting for batch");
    }

    #[test]
    fn test_root_from_appearance_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("appearance.toml");
        std::fs::write(
            &file,
            "class = [\"dark\", \"wide\"]\n\n[style]\n\"--mm-bg\" = \"#000\"\n",
        )
        .unwrap();
        let page = FsPage::new(&file, dir.path());

        let root = page.root();

        assert_eq!(root.classes, vec!["dark".to_owned(), "wide".to_owned()]);
        assert_eq!(root.property("--mm-bg"), Some("#000"));
    }

    #[test]
    fn test_missing_appearance_file_is_default_root() {
        let dir = tempfile::tempdir().unwrap();
        let page = FsPage::new(dir.path().join("nope.toml"), dir.path());

        assert_eq!(page.root(), RootElement::default());
    }

    #[test]
    fn test_invalid_appearance_file_is_default_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("appearance.toml");
        std::fs::write(&file, "class = \"dark\"\n").unwrap();

        assert_eq!(FsPage::new(&file, dir.path()).root(), RootElement::default());
    }

    #[test]
    fn test_parent_dir_of_bare_filename() {
        assert_eq!(parent_dir(Path::new("appearance.toml")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("a/b.toml")), PathBuf::from("a"));
    }

    #[tokio::test]
    async fn test_missing_content_dir_is_not_watched() {
        let dir = tempfile::tempdir().unwrap();
        let page = FsPage::new(dir.path().join("appearance.toml"), dir.path().join("dist"));

        assert!(page.watch(WatchTarget::Content).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_root_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let page = FsPage::new(dir.path().join("gone/appearance.toml"), dir.path());

        let result = page.watch(WatchTarget::Root);

        assert!(matches!(result, Err(WatchError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_class_change_reports_class_attribute() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("appearance.toml");
        std::fs::write(&file, "class = []\n").unwrap();
        let page = FsPage::new(&file, dir.path()).with_debounce(QUICK);
        let mut subscription = page.watch(WatchTarget::Root).unwrap().unwrap();

        std::fs::write(&file, "class = [\"dark\"]\n").unwrap();

        wait_for(&mut subscription, MutationBatch::touches_class).await;
    }

    #[tokio::test]
    async fn test_style_change_reports_style_attribute() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("appearance.toml");
        std::fs::write(&file, "class = [\"dark\"]\n").unwrap();
        let page = FsPage::new(&file, dir.path()).with_debounce(QUICK);
        let mut subscription = page.watch(WatchTarget::Root).unwrap().unwrap();

        std::fs::write(&file, "class = [\"dark\"]\n[style]\n\"--mm-bg\" = \"#111\"\n").unwrap();

        wait_for(&mut subscription, |batch| {
            batch.mutations() == [Mutation::attribute("style")]
        })
        .await;
    }

    #[tokio::test]
    async fn test_new_html_file_reports_added_children() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("dist");
        std::fs::create_dir_all(site.join("guide")).unwrap();
        let page = FsPage::new(dir.path().join("appearance.toml"), &site).with_debounce(QUICK);
        let mut subscription = page.watch(WatchTarget::Content).unwrap().unwrap();

        std::fs::write(site.join("notes.txt"), "ignored").unwrap();
        std::fs::write(site.join("guide/index.html"), "<p>hi</p>").unwrap();

        wait_for(&mut subscription, MutationBatch::adds_children).await;
    }

    #[tokio::test]
    async fn test_dropping_handle_closes_stream() {
        let dir = tempfile::tempdir().unwrap();
        let page = FsPage::new(dir.path().join("appearance.toml"), dir.path());
        let Subscription {
            mut changes,
            handle,
        } = page.watch(WatchTarget::Content).unwrap().unwrap();

        drop(handle);

        let end = tokio::time::timeout(PATIENCE, changes.recv()).await.unwrap();
        assert_eq!(end, None);
    }
}
