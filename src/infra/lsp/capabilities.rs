//! Per-backend capability strategies
//!
//! Every supported language server is described by one [`CapabilityProfile`]
//! value: how it signals readiness, which directories it never wants to see,
//! which capabilities the initialize response must carry, how long cross-file
//! results need to settle and which structural matcher infers its type hierarchy.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::init_options;
use crate::error::LspError;
use crate::models::symbol::Language;

/// Supported language server backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    Clangd,
    Gopls,
    RustAnalyzer,
    Jedi,
    Metals,
    Julia,
}

impl Backend {
    pub const ALL: [Backend; 6] = [
        Self::Clangd,
        Self::Gopls,
        Self::RustAnalyzer,
        Self::Jedi,
        Self::Metals,
        Self::Julia,
    ];

    pub fn for_language(language: Language) -> Option<Self> {
        match language {
            Language::Cpp => Some(Self::Clangd),
            Language::Go => Some(Self::Gopls),
            Language::Rust => Some(Self::RustAnalyzer),
            Language::Python => Some(Self::Jedi),
            Language::Scala => Some(Self::Metals),
            Language::Julia => Some(Self::Julia),
            _ => None,
        }
    }

    pub fn language(self) -> Language {
        match self {
            Self::Clangd => Language::Cpp,
            Self::Gopls => Language::Go,
            Self::RustAnalyzer => Language::Rust,
            Self::Jedi => Language::Python,
            Self::Metals => Language::Scala,
            Self::Julia => Language::Julia,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Clangd => "clangd",
            Self::Gopls => "gopls",
            Self::RustAnalyzer => "rust-analyzer",
            Self::Jedi => "jedi-language-server",
            Self::Metals => "metals",
            Self::Julia => "julia",
        }
    }

    pub fn profile(self) -> CapabilityProfile {
        CapabilityProfile::for_backend(self)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clangd" => Ok(Self::Clangd),
            "gopls" => Ok(Self::Gopls),
            "rust-analyzer" | "rust_analyzer" => Ok(Self::RustAnalyzer),
            "jedi" | "jedi-language-server" => Ok(Self::Jedi),
            "metals" => Ok(Self::Metals),
            "julia" | "languageserver.jl" => Ok(Self::Julia),
            _ => Err(format!("Unknown backend: {}", s)),
        }
    }
}

// ============================================================================
// Readiness
// ============================================================================

/// Backend-specific evidence that indexing has settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessSignal {
    /// `experimental/serverStatus { quiescent: true }`
    ServerStatusQuiescent,
    /// `language/status { type: "ServiceReady" }`
    LanguageStatusServiceReady,
}

impl ReadinessSignal {
    /// Method carrying the signal
    pub fn method(&self) -> &'static str {
        match self {
            Self::ServerStatusQuiescent => "experimental/serverStatus",
            Self::LanguageStatusServiceReady => "language/status",
        }
    }

    pub fn matches(&self, params: &Value) -> bool {
        match self {
            Self::ServerStatusQuiescent => params.get("quiescent").and_then(Value::as_bool) == Some(true),
            Self::LanguageStatusServiceReady => {
                params.get("type").and_then(Value::as_str) == Some("ServiceReady")
            }
        }
    }
}

/// When a backend counts as ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// As soon as the initialize response passes the assertions
    OnInitializeResponse,
    /// Right after `initialized` is sent (no reliable signal exists)
    OnInitialized,
    /// When any of the signals arrives
    AwaitSignal(&'static [ReadinessSignal]),
}

impl Readiness {
    /// Signals that must be observed before the server counts as ready
    pub fn signals(&self) -> &'static [ReadinessSignal] {
        match self {
            Self::AwaitSignal(signals) => signals,
            _ => &[],
        }
    }

    /// Whether `method(params)` is one of the awaited signals
    pub fn is_signal(&self, method: &str, params: &Value) -> bool {
        self.signals()
            .iter()
            .any(|s| s.method() == method && s.matches(params))
    }
}

// ============================================================================
// Capability assertions
// ============================================================================

/// A property the initialize response must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityAssertion {
    /// Dotted path into `capabilities` must exist
    Present(&'static str),
    /// Dotted path into `capabilities` must be `true`
    Enabled(&'static str),
    /// `textDocumentSync.change` (or a bare numeric `textDocumentSync`) equals this kind
    SyncChange(u64),
    /// Completion trigger characters (as a set) and resolve flag
    Completion {
        triggers: &'static [&'static str],
        resolve: bool,
    },
}

impl CapabilityAssertion {
    pub fn check(&self, backend: Backend, capabilities: &Value) -> Result<(), LspError> {
        match self {
            Self::Present(path) => {
                if lookup(capabilities, path).is_some_and(|v| !v.is_null()) {
                    Ok(())
                } else {
                    Err(LspError::capability_mismatch(
                        backend.name(),
                        path,
                        "present",
                        "missing",
                    ))
                }
            }
            Self::Enabled(path) => {
                let actual = lookup(capabilities, path);
                if actual.and_then(Value::as_bool) == Some(true) {
                    Ok(())
                } else {
                    Err(LspError::capability_mismatch(
                        backend.name(),
                        path,
                        "true",
                        actual.map_or_else(|| "missing".to_string(), |v| v.to_string()),
                    ))
                }
            }
            Self::SyncChange(expected) => {
                let sync = capabilities.get("textDocumentSync");
                let actual = sync
                    .and_then(|s| s.get("change").and_then(Value::as_u64).or_else(|| s.as_u64()));
                if actual == Some(*expected) {
                    Ok(())
                } else {
                    Err(LspError::capability_mismatch(
                        backend.name(),
                        "textDocumentSync.change",
                        expected.to_string(),
                        actual.map_or_else(|| "missing".to_string(), |a| a.to_string()),
                    ))
                }
            }
            Self::Completion { triggers, resolve } => {
                let Some(completion) = capabilities.get("completionProvider") else {
                    return Err(LspError::capability_mismatch(
                        backend.name(),
                        "completionProvider",
                        "present",
                        "missing",
                    ));
                };
                let mut actual_triggers: Vec<&str> = completion
                    .get("triggerCharacters")
                    .and_then(Value::as_array)
                    .map(|a| a.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();
                actual_triggers.sort_unstable();
                actual_triggers.dedup();
                let mut expected_triggers = triggers.to_vec();
                expected_triggers.sort_unstable();

                if actual_triggers != expected_triggers {
                    return Err(LspError::capability_mismatch(
                        backend.name(),
                        "completionProvider.triggerCharacters",
                        format!("{:?}", expected_triggers),
                        format!("{:?}", actual_triggers),
                    ));
                }

                let actual_resolve = completion
                    .get("resolveProvider")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if actual_resolve != *resolve {
                    return Err(LspError::capability_mismatch(
                        backend.name(),
                        "completionProvider.resolveProvider",
                        resolve.to_string(),
                        actual_resolve.to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

fn lookup<'a>(value: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(value, |current, key| current.get(key))
}

// ============================================================================
// Hierarchy matcher selection
// ============================================================================

/// Structural matcher family used by the heuristic type hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherFamily {
    /// `:` / `extends` / `implements` clause before the body (C++, Java, PHP, TypeScript)
    ColonClause,
    /// Anonymous struct fields (Go)
    Embedding,
    /// `#[derive]` and `impl Trait for Type` (Rust)
    Attribute,
    /// `class C(Base):` (Python)
    PythonBases,
    /// `extends A with B` (Scala)
    ScalaExtends,
    /// `struct C <: Base` (Julia)
    JuliaSubtype,
}

impl MatcherFamily {
    pub fn for_language(language: Language) -> Option<Self> {
        match language {
            Language::Cpp | Language::Java | Language::PHP | Language::TypeScript => {
                Some(Self::ColonClause)
            }
            Language::Go => Some(Self::Embedding),
            Language::Rust => Some(Self::Attribute),
            Language::Python => Some(Self::PythonBases),
            Language::Scala => Some(Self::ScalaExtends),
            Language::Julia => Some(Self::JuliaSubtype),
            Language::Unknown => None,
        }
    }
}

// ============================================================================
// Profile
// ============================================================================

#[derive(Debug, Clone)]
pub struct CapabilityProfile {
    pub backend: Backend,
    pub readiness: Readiness,
    /// Directory names excluded from workspace traversal; `*` suffix matches a prefix
    pub ignored_dirs: &'static [&'static str],
    pub assertions: &'static [CapabilityAssertion],
    /// Wait for the recompute signal after a references query
    pub settle_timeout: Option<Duration>,
    /// One-time warm-up before the first cross-file query
    pub cross_file_wait: Duration,
    /// Native `typeHierarchy/*` results are trustworthy
    pub native_type_hierarchy: bool,
    pub matcher: MatcherFamily,
}

const RUST_ANALYZER_READY: &[ReadinessSignal] = &[
    ReadinessSignal::ServerStatusQuiescent,
    ReadinessSignal::LanguageStatusServiceReady,
];

impl CapabilityProfile {
    pub fn for_backend(backend: Backend) -> Self {
        use CapabilityAssertion::*;

        match backend {
            Backend::Clangd => Self {
                backend,
                readiness: Readiness::OnInitializeResponse,
                ignored_dirs: &["build", "cmake-build-*", "out"],
                assertions: &[
                    SyncChange(2),
                    Completion {
                        triggers: &[".", "<", ">", ":", "\"", "/", "*"],
                        resolve: false,
                    },
                ],
                settle_timeout: None,
                cross_file_wait: Duration::ZERO,
                native_type_hierarchy: true,
                matcher: MatcherFamily::ColonClause,
            },
            Backend::Gopls => Self {
                backend,
                readiness: Readiness::OnInitialized,
                ignored_dirs: &["vendor", "node_modules", "dist", "build"],
                assertions: &[
                    Present("textDocumentSync"),
                    Present("completionProvider"),
                    Present("definitionProvider"),
                ],
                settle_timeout: None,
                cross_file_wait: Duration::ZERO,
                native_type_hierarchy: false,
                matcher: MatcherFamily::Embedding,
            },
            Backend::RustAnalyzer => Self {
                backend,
                readiness: Readiness::AwaitSignal(RUST_ANALYZER_READY),
                ignored_dirs: &["target"],
                assertions: &[
                    SyncChange(2),
                    Completion {
                        triggers: &[":", ".", "'", "("],
                        resolve: true,
                    },
                    Enabled("completionProvider.completionItem.labelDetailsSupport"),
                ],
                settle_timeout: None,
                cross_file_wait: Duration::ZERO,
                native_type_hierarchy: false,
                matcher: MatcherFamily::Attribute,
            },
            Backend::Jedi => Self {
                backend,
                readiness: Readiness::OnInitialized,
                ignored_dirs: &["__pycache__", ".venv", "venv", "build", "dist"],
                assertions: &[
                    SyncChange(2),
                    Completion {
                        triggers: &[".", "'", "\""],
                        resolve: true,
                    },
                ],
                settle_timeout: None,
                cross_file_wait: Duration::ZERO,
                native_type_hierarchy: false,
                matcher: MatcherFamily::PythonBases,
            },
            Backend::Metals => Self {
                backend,
                // Metals has no dependable ready notification
                readiness: Readiness::OnInitialized,
                ignored_dirs: &[".bloop", ".metals", ".bsp", "target"],
                assertions: &[Present("textDocumentSync")],
                settle_timeout: Some(Duration::from_secs(10)),
                cross_file_wait: Duration::ZERO,
                native_type_hierarchy: false,
                matcher: MatcherFamily::ScalaExtends,
            },
            Backend::Julia => Self {
                backend,
                readiness: Readiness::OnInitialized,
                ignored_dirs: &[".julia", "docs"],
                assertions: &[Present("textDocumentSync")],
                settle_timeout: None,
                cross_file_wait: Duration::from_secs(5),
                native_type_hierarchy: false,
                matcher: MatcherFamily::JuliaSubtype,
            },
        }
    }

    /// Fill the backend's initialize template for `root`
    pub fn initialize_params(&self, root: &Path, process_id: Option<u32>) -> Value {
        init_options::initialize_params(self.backend, root, process_id)
    }

    /// Fail fast on the first assertion the initialize response violates
    pub fn verify(&self, capabilities: &Value) -> Result<(), LspError> {
        for assertion in self.assertions {
            assertion.check(self.backend, capabilities)?;
        }
        Ok(())
    }

    pub fn has_recompute_signal(&self) -> bool {
        self.settle_timeout.is_some()
    }

    /// File extensions the backend's language owns
    pub fn extensions(&self) -> &'static [&'static str] {
        self.backend.language().extensions()
    }
}

// ============================================================================
// Recompute detection
// ============================================================================

/// Tracks Metals background compilation and reports when results may have changed
#[derive(Debug, Default)]
pub struct RecomputeDetector {
    compiling: AtomicBool,
}

impl RecomputeDetector {
    /// Feed a `metals/status` payload; true when a compile indicator was hidden
    pub fn observe_status(&self, params: &Value) -> bool {
        let text = params.get("text").and_then(Value::as_str).unwrap_or("");
        let show = params.get("show").and_then(Value::as_bool).unwrap_or(false);
        let hide = params.get("hide").and_then(Value::as_bool).unwrap_or(false);

        if show && text.to_lowercase().contains("compil") {
            self.compiling.store(true, Ordering::SeqCst);
        }
        hide && self.compiling.swap(false, Ordering::SeqCst)
    }

    /// Feed a `window/logMessage` payload
    pub fn observe_log(params: &Value) -> bool {
        let message = params
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_lowercase();
        message.contains("find references") || message.contains("references again")
    }
}
