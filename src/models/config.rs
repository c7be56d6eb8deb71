//! Configuration model for polylsp

use serde::{Deserialize, Serialize};

/// polylsp configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PolylspConfig {
    #[serde(default)]
    pub lsp: LspConfig,

    #[serde(default)]
    pub hierarchy: HierarchyConfig,

    #[serde(default)]
    pub watcher: WatcherConfig,
}

/// LSP client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LspConfig {
    #[serde(default = "defaults::timeout_secs")]
    pub timeout_secs: u64,

    /// Upper bound on waiting for a backend's readiness signal
    #[serde(default = "defaults::ready_timeout_secs")]
    pub ready_timeout_secs: u64,

    /// Time between `exit` and killing the process
    #[serde(default = "defaults::shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    #[serde(default)]
    pub servers: ServerCommands,
}

impl Default for LspConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::timeout_secs(),
            ready_timeout_secs: defaults::ready_timeout_secs(),
            shutdown_grace_secs: defaults::shutdown_grace_secs(),
            servers: ServerCommands::default(),
        }
    }
}

/// Command overrides per backend (whitespace separated: program then args)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ServerCommands {
    #[serde(default)]
    pub clangd: Option<String>,

    #[serde(default)]
    pub gopls: Option<String>,

    #[serde(default)]
    pub rust_analyzer: Option<String>,

    #[serde(default)]
    pub jedi: Option<String>,

    #[serde(default)]
    pub metals: Option<String>,

    #[serde(default)]
    pub julia: Option<String>,
}

/// Heuristic type hierarchy configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HierarchyConfig {
    /// Bound on files visited by project-wide scans
    #[serde(default = "defaults::max_scan_files")]
    pub max_scan_files: usize,

    /// Lines scanned past a declaration line looking for its body
    #[serde(default = "defaults::forward_scan_lines")]
    pub forward_scan_lines: usize,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_scan_files: defaults::max_scan_files(),
            forward_scan_lines: defaults::forward_scan_lines(),
        }
    }
}

/// File event coalescing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatcherConfig {
    #[serde(default = "defaults::debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: defaults::debounce_ms(),
        }
    }
}

mod defaults {
    // LSP
    pub fn timeout_secs() -> u64 {
        30
    }
    pub fn ready_timeout_secs() -> u64 {
        60
    }
    pub fn shutdown_grace_secs() -> u64 {
        5
    }

    // Hierarchy
    pub fn max_scan_files() -> usize {
        200
    }
    pub fn forward_scan_lines() -> usize {
        8
    }

    // Watcher
    pub fn debounce_ms() -> u64 {
        100
    }
}
