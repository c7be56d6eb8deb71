//! Workspace traversal with backend-specific ignored directories
//!
//! Uses the `ignore` crate (from ripgrep) for gitignore-style filtering.
//! Traversal order is lexicographic so bounded scans are reproducible.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;

/// Directories skipped for every backend
pub const COMMON_IGNORED_DIRS: &[&str] = &[".git", ".hg", ".svn", "node_modules", ".polylsp"];

/// File filter configuration
#[derive(Debug, Clone)]
pub struct FileFilterConfig {
    pub root: PathBuf,
    /// Directory names excluded on top of [`COMMON_IGNORED_DIRS`]; a trailing `*` matches a prefix
    pub ignored_dirs: Vec<String>,
    pub respect_gitignore: bool,
    pub include_hidden: bool,
}

impl Default for FileFilterConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            ignored_dirs: Vec::new(),
            respect_gitignore: true,
            include_hidden: false,
        }
    }
}

/// Deterministic, bounded source file discovery
#[derive(Debug, Clone)]
pub struct FileFilter {
    config: FileFilterConfig,
    exact: HashSet<String>,
    prefixes: Vec<String>,
}

impl FileFilter {
    pub fn new(config: FileFilterConfig) -> Self {
        let mut exact: HashSet<String> = COMMON_IGNORED_DIRS.iter().map(|s| s.to_string()).collect();
        let mut prefixes = Vec::new();
        for dir in &config.ignored_dirs {
            match dir.strip_suffix('*') {
                Some(prefix) => prefixes.push(prefix.to_string()),
                None => {
                    exact.insert(dir.clone());
                }
            }
        }
        Self {
            config,
            exact,
            prefixes,
        }
    }

    pub fn with_ignored_dirs(root: impl AsRef<Path>, dirs: &[&str]) -> Self {
        Self::new(FileFilterConfig {
            root: root.as_ref().to_path_buf(),
            ignored_dirs: dirs.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        })
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Check a single directory name against the ignore set
    pub fn is_ignored_dir_name(&self, name: &str) -> bool {
        if !self.config.include_hidden && name.starts_with('.') && name.len() > 1 {
            return true;
        }
        self.exact.contains(name) || self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    /// Check whether any directory component of `path` (relative to root) is ignored
    pub fn is_ignored(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.config.root).unwrap_or(path);
        let mut components: Vec<&str> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => name.to_str(),
                _ => None,
            })
            .collect();
        // The last component is the file itself unless the path is a directory
        if !path.is_dir() {
            components.pop();
        }
        components.iter().any(|name| self.is_ignored_dir_name(name))
    }

    pub fn should_include(&self, path: &Path) -> bool {
        !self.is_ignored(path)
    }

    /// Walk the root in lexicographic order, returning at most `limit` files
    /// whose extension is in `extensions` (all files when empty).
    pub fn discover_files(&self, extensions: &[&str], limit: usize) -> Vec<PathBuf> {
        self.discover_bounded(extensions, limit).files
    }

    /// Like [`discover_files`](Self::discover_files), also reporting whether
    /// matching files were left out by `limit`
    pub fn discover_bounded(&self, extensions: &[&str], limit: usize) -> Discovery {
        let filter = self.clone();
        let walker = WalkBuilder::new(&self.config.root)
            .hidden(false)
            .git_ignore(self.config.respect_gitignore)
            .git_global(false)
            .git_exclude(self.config.respect_gitignore)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                if !is_dir || entry.depth() == 0 {
                    return true;
                }
                entry
                    .file_name()
                    .to_str()
                    .is_none_or(|name| !filter.is_ignored_dir_name(name))
            })
            .build();

        let mut files = Vec::new();
        let mut truncated = false;
        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            if !extensions.is_empty() {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                if !extensions.contains(&ext) {
                    continue;
                }
            }
            if files.len() >= limit {
                tracing::debug!("Scan bound of {} files reached", limit);
                truncated = true;
                break;
            }
            files.push(path.to_path_buf());
        }
        Discovery { files, truncated }
    }
}

/// Result of a bounded walk
#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<PathBuf>,
    /// More matching files existed past the bound
    pub truncated: bool,
}
