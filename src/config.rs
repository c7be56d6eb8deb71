//! Global Configuration Singleton

use std::sync::OnceLock;
use std::time::Duration;

use crate::infra::lsp::capabilities::Backend;
use crate::models::config::PolylspConfig;

static CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

/// Per-backend timeout scaling
#[derive(Debug, Clone, Copy)]
pub struct BackendProfile {
    pub timeout_multiplier: f64,
}

impl BackendProfile {
    pub const fn new(timeout_multiplier: f64) -> Self {
        Self { timeout_multiplier }
    }

    pub fn for_backend(backend: Backend) -> Self {
        match backend {
            // Metals: build import and bloop compilation
            Backend::Metals => Self::new(4.0),
            // LanguageServer.jl: package precompilation on first start
            Backend::Julia => Self::new(4.0),
            // rust-analyzer: Cargo workspace indexing
            Backend::RustAnalyzer => Self::new(1.5),
            // clangd: compile_commands.json parsing
            Backend::Clangd => Self::new(1.5),
            Backend::Gopls | Backend::Jedi => Self::new(1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Request,
    WorkspaceOperation,
    Initialization,
    Shutdown,
}

impl OperationType {
    pub fn from_method(method: &str) -> Self {
        match method {
            "workspace/symbol"
            | "textDocument/references"
            | "typeHierarchy/supertypes"
            | "typeHierarchy/subtypes" => Self::WorkspaceOperation,
            "initialize" => Self::Initialization,
            "shutdown" => Self::Shutdown,
            _ => Self::Request,
        }
    }

    fn base_multiplier(self) -> f64 {
        match self {
            Self::Request => 1.0,
            Self::WorkspaceOperation => 6.0,
            Self::Initialization => 2.0,
            Self::Shutdown => 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    base_timeout: Duration,
    pub ready_timeout: Duration,
    pub shutdown_grace: Duration,
    pub max_scan_files: usize,
    pub forward_scan_lines: usize,
    pub debounce: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from(&PolylspConfig::default())
    }
}

impl From<&PolylspConfig> for RuntimeConfig {
    fn from(config: &PolylspConfig) -> Self {
        Self {
            base_timeout: Duration::from_secs(config.lsp.timeout_secs),
            ready_timeout: Duration::from_secs(config.lsp.ready_timeout_secs),
            shutdown_grace: Duration::from_secs(config.lsp.shutdown_grace_secs),
            max_scan_files: config.hierarchy.max_scan_files,
            forward_scan_lines: config.hierarchy.forward_scan_lines,
            debounce: Duration::from_millis(config.watcher.debounce_ms),
        }
    }
}

impl RuntimeConfig {
    pub fn timeout_for(&self, backend: Backend, method: &str) -> Duration {
        let profile = BackendProfile::for_backend(backend);
        let op_type = OperationType::from_method(method);
        let multiplier = profile.timeout_multiplier * op_type.base_multiplier();
        Duration::from_secs_f64(self.base_timeout.as_secs_f64() * multiplier)
    }
}

pub fn init(config: &PolylspConfig) {
    let _ = CONFIG.set(RuntimeConfig::from(config));
}

pub fn timeout_for(backend: Backend, method: &str) -> Duration {
    config().timeout_for(backend, method)
}

pub fn ready_timeout() -> Duration {
    config().ready_timeout
}

pub fn shutdown_grace() -> Duration {
    config().shutdown_grace
}

pub fn max_scan_files() -> usize {
    config().max_scan_files
}

pub fn forward_scan_lines() -> usize {
    config().forward_scan_lines
}

pub fn debounce() -> Duration {
    config().debounce
}

fn config() -> RuntimeConfig {
    CONFIG.get().cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_calculation() {
        let config = RuntimeConfig::default();

        // rust-analyzer hover: 30s * 1.5 * 1.0 = 45s
        assert_eq!(
            config.timeout_for(Backend::RustAnalyzer, "textDocument/hover"),
            Duration::from_secs(45)
        );

        // gopls references: 30s * 1.0 * 6.0 = 180s
        assert_eq!(
            config.timeout_for(Backend::Gopls, "textDocument/references"),
            Duration::from_secs(180)
        );

        // Metals initialization: 30s * 4.0 * 2.0 = 240s
        assert_eq!(
            config.timeout_for(Backend::Metals, "initialize"),
            Duration::from_secs(240)
        );

        // jedi shutdown: 30s * 1.0 * 0.5 = 15s
        assert_eq!(
            config.timeout_for(Backend::Jedi, "shutdown"),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn test_operation_type_parsing() {
        assert_eq!(
            OperationType::from_method("textDocument/hover"),
            OperationType::Request
        );
        assert_eq!(
            OperationType::from_method("textDocument/references"),
            OperationType::WorkspaceOperation
        );
        assert_eq!(
            OperationType::from_method("initialize"),
            OperationType::Initialization
        );
        assert_eq!(
            OperationType::from_method("shutdown"),
            OperationType::Shutdown
        );
    }

    #[test]
    fn test_runtime_config_from_model() {
        let mut model = PolylspConfig::default();
        model.watcher.debounce_ms = 250;
        model.hierarchy.max_scan_files = 12;
        let runtime = RuntimeConfig::from(&model);
        assert_eq!(runtime.debounce, Duration::from_millis(250));
        assert_eq!(runtime.max_scan_files, 12);
        assert_eq!(runtime.shutdown_grace, Duration::from_secs(5));
    }
}
