//! File-event debouncing for `workspace/didChangeWatchedFiles`
//!
//! An external watcher calls [`FileEventDebouncer::notify_file_event`] from any
//! thread. Bursts on the same path inside the debounce window collapse into a
//! single net change, and each window is delivered as one ordered batch.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::infra::file_filter::FileFilter;
use crate::models::lsp::FileChangeType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub change: FileChangeType,
}

#[derive(Default)]
struct PendingEvents {
    order: Vec<PathBuf>,
    changes: HashMap<PathBuf, FileChangeType>,
    flush_scheduled: bool,
}

pub struct FileEventDebouncer {
    pending: Arc<Mutex<PendingEvents>>,
    filter: FileFilter,
    window: Duration,
    tx: mpsc::UnboundedSender<Vec<FileEvent>>,
    runtime: Handle,
}

fn lock(pending: &Mutex<PendingEvents>) -> MutexGuard<'_, PendingEvents> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FileEventDebouncer {
    /// Must be called inside a tokio runtime; flush timers run on it
    pub fn new(
        filter: FileFilter,
        window: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Vec<FileEvent>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                pending: Arc::new(Mutex::new(PendingEvents::default())),
                filter,
                window,
                tx,
                runtime: Handle::current(),
            },
            rx,
        )
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn notify_file_event(&self, path: impl Into<PathBuf>, change: FileChangeType) {
        let path = path.into();
        if !self.filter.should_include(&path) {
            tracing::trace!("Ignoring file event in excluded directory: {}", path.display());
            return;
        }

        let schedule = {
            let mut pending = lock(&self.pending);
            match pending.changes.get_mut(&path) {
                Some(existing) => *existing = existing.merge(change),
                None => {
                    pending.order.push(path.clone());
                    pending.changes.insert(path, change);
                }
            }
            !std::mem::replace(&mut pending.flush_scheduled, true)
        };

        if schedule {
            let pending = Arc::clone(&self.pending);
            let tx = self.tx.clone();
            let window = self.window;
            self.runtime.spawn(async move {
                tokio::time::sleep(window).await;
                flush(&pending, &tx);
            });
        }
    }
}

fn flush(pending: &Mutex<PendingEvents>, tx: &mpsc::UnboundedSender<Vec<FileEvent>>) {
    let batch: Vec<FileEvent> = {
        let mut pending = lock(pending);
        pending.flush_scheduled = false;
        let PendingEvents { order, changes, .. } = &mut *pending;
        order
            .drain(..)
            .filter_map(|path| {
                changes
                    .remove(&path)
                    .map(|change| FileEvent { path, change })
            })
            .collect()
    };

    if batch.is_empty() {
        return;
    }
    tracing::debug!("Flushing {} debounced file events", batch.len());
    if tx.send(batch).is_err() {
        tracing::debug!("File event receiver dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn debouncer(window_ms: u64) -> (FileEventDebouncer, mpsc::UnboundedReceiver<Vec<FileEvent>>) {
        let filter = FileFilter::with_ignored_dirs("/w", &["target"]);
        FileEventDebouncer::new(filter, Duration::from_millis(window_ms))
    }

    #[tokio::test]
    async fn test_burst_on_same_path_coalesces() {
        let (debouncer, mut rx) = debouncer(50);
        debouncer.notify_file_event("/w/src/a.rs", FileChangeType::Changed);
        debouncer.notify_file_event("/w/src/b.rs", FileChangeType::Created);
        debouncer.notify_file_event("/w/src/a.rs", FileChangeType::Changed);
        debouncer.notify_file_event("/w/src/a.rs", FileChangeType::Deleted);

        let batch = rx.recv().await.unwrap();
        assert_eq!(
            batch,
            vec![
                FileEvent {
                    path: PathBuf::from("/w/src/a.rs"),
                    change: FileChangeType::Deleted
                },
                FileEvent {
                    path: PathBuf::from("/w/src/b.rs"),
                    change: FileChangeType::Created
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_separate_windows_produce_separate_batches() {
        let (debouncer, mut rx) = debouncer(20);
        debouncer.notify_file_event("/w/a.rs", FileChangeType::Changed);
        assert_eq!(rx.recv().await.unwrap().len(), 1);

        debouncer.notify_file_event("/w/a.rs", FileChangeType::Deleted);
        let second = rx.recv().await.unwrap();
        assert_eq!(second[0].change, FileChangeType::Deleted);
    }

    #[tokio::test]
    async fn test_ignored_directories_filtered() {
        let (debouncer, mut rx) = debouncer(20);
        debouncer.notify_file_event("/w/target/debug/build.rs", FileChangeType::Changed);
        debouncer.notify_file_event("/w/.git/index", FileChangeType::Changed);
        debouncer.notify_file_event(Path::new("/w/main.rs"), FileChangeType::Created);

        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].path, PathBuf::from("/w/main.rs"));
    }

    #[tokio::test]
    async fn test_events_from_other_threads() {
        let (debouncer, mut rx) = debouncer(200);
        let debouncer = Arc::new(debouncer);
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let debouncer = Arc::clone(&debouncer);
                std::thread::spawn(move || {
                    debouncer.notify_file_event(format!("/w/f{}.rs", i % 2), FileChangeType::Changed);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.len(), 2);
    }
}
