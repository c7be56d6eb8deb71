//! polylsp - one language server client core, many backends
//!
//! Drives clangd, gopls, rust-analyzer, jedi-language-server, Metals and
//! LanguageServer.jl over stdio with per-backend capability profiles, and
//! fills the gaps some of them leave with a heuristic type hierarchy.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod infra;
pub mod models;
pub mod services;

pub use error::{PolylspError, PolylspResult};
