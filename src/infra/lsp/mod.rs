//! LSP client core
//!
//! Provides uniform Language Server Protocol communication over several backends:
//! - JSON-RPC 2.0 protocol types and Content-Length framing
//! - Request routing with id correlation, per-request timeouts and cancellation
//! - Child process hosting
//! - Lifecycle state machine and per-backend capability profiles
//! - Debounced file-change forwarding

pub mod capabilities;
pub mod converters;
pub mod documents;
pub mod init_options;
pub mod process;
pub mod protocol;
pub mod router;
pub mod server;
pub mod servers;
pub mod state;
pub mod transport;
pub mod watcher;

pub use capabilities::{Backend, CapabilityProfile, MatcherFamily, Readiness};
pub use process::{LaunchSpec, ProcessHost, ProcessLauncher, TokioLauncher};
pub use router::RequestRouter;
pub use server::{LanguageServer, merge_locations};
pub use servers::{ServerHealth, check_all};
pub use state::{ServerState, StateMachine};
pub use watcher::{FileEvent, FileEventDebouncer};
