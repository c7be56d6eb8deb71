//! Open-document tracking with LRU eviction
//!
//! Decides whether a file needs `didOpen`, `didChange` or nothing before a
//! position query, and which document to `didClose` when the set is full.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::infra::hash_content;
use crate::models::lsp::path_to_uri;

pub const DEFAULT_CAPACITY: usize = 100;

struct OpenDocument {
    uri: String,
    content_hash: u64,
    version: i32,
    last_used: u64,
}

/// What the server must be told to match the file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Open { uri: String, version: i32 },
    Change { uri: String, version: i32 },
    Unchanged { uri: String },
}

impl SyncAction {
    pub fn uri(&self) -> &str {
        match self {
            Self::Open { uri, .. } | Self::Change { uri, .. } | Self::Unchanged { uri } => uri,
        }
    }
}

/// Result of [`DocumentCache::sync`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub action: SyncAction,
    /// URI to `didClose` before opening, when capacity forced an eviction
    pub evicted: Option<String>,
}

pub struct DocumentCache {
    entries: HashMap<PathBuf, OpenDocument>,
    capacity: usize,
    tick: u64,
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl DocumentCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            tick: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Record `content` for `path` and return the notifications it needs
    pub fn sync(&mut self, path: &Path, content: &str) -> SyncPlan {
        self.tick += 1;
        let hash = hash_content(content);

        if let Some(doc) = self.entries.get_mut(path) {
            doc.last_used = self.tick;
            let action = if doc.content_hash == hash {
                SyncAction::Unchanged {
                    uri: doc.uri.clone(),
                }
            } else {
                doc.content_hash = hash;
                doc.version += 1;
                SyncAction::Change {
                    uri: doc.uri.clone(),
                    version: doc.version,
                }
            };
            return SyncPlan {
                action,
                evicted: None,
            };
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict_lru()
        } else {
            None
        };

        let uri = path_to_uri(path);
        self.entries.insert(
            path.to_path_buf(),
            OpenDocument {
                uri: uri.clone(),
                content_hash: hash,
                version: 1,
                last_used: self.tick,
            },
        );

        SyncPlan {
            action: SyncAction::Open { uri, version: 1 },
            evicted,
        }
    }

    /// Forget `path`; returns its URI when it was open
    pub fn close(&mut self, path: &Path) -> Option<String> {
        self.entries.remove(path).map(|doc| doc.uri)
    }

    /// Drop every entry, returning URIs to close
    pub fn drain(&mut self) -> Vec<String> {
        self.entries.drain().map(|(_, doc)| doc.uri).collect()
    }

    fn evict_lru(&mut self) -> Option<String> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, doc)| doc.last_used)
            .map(|(path, _)| path.clone())?;
        let doc = self.entries.remove(&oldest)?;
        tracing::trace!("Evicted open document: {}", oldest.display());
        Some(doc.uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_change_unchanged() {
        let mut cache = DocumentCache::new(4);
        let path = Path::new("/w/a.rs");

        let plan = cache.sync(path, "fn a() {}");
        assert!(matches!(plan.action, SyncAction::Open { version: 1, .. }));
        assert!(plan.evicted.is_none());

        assert!(matches!(cache.sync(path, "fn a() {}").action, SyncAction::Unchanged { .. }));
        assert!(matches!(
            cache.sync(path, "fn a() { 1 }").action,
            SyncAction::Change { version: 2, .. }
        ));
        assert!(cache.is_open(path));
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = DocumentCache::new(2);
        cache.sync(Path::new("/w/a.rs"), "a");
        cache.sync(Path::new("/w/b.rs"), "b");
        // Touch a so b becomes the oldest
        cache.sync(Path::new("/w/a.rs"), "a");

        let plan = cache.sync(Path::new("/w/c.rs"), "c");
        assert_eq!(plan.evicted.as_deref(), Some("file:///w/b.rs"));
        assert_eq!(cache.len(), 2);
        assert!(!cache.is_open(Path::new("/w/b.rs")));
    }

    #[test]
    fn test_close_and_drain() {
        let mut cache = DocumentCache::default();
        cache.sync(Path::new("/w/a.rs"), "a");
        assert_eq!(cache.close(Path::new("/w/a.rs")).as_deref(), Some("file:///w/a.rs"));
        assert!(cache.close(Path::new("/w/a.rs")).is_none());

        cache.sync(Path::new("/w/b.rs"), "b");
        assert_eq!(cache.drain(), vec!["file:///w/b.rs".to_string()]);
        assert!(cache.is_empty());
    }
}
