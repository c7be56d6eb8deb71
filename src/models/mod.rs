//! Data models for polylsp
//!
//! Contains core type definitions used throughout the application.

pub mod config;
pub mod hierarchy;
pub mod lsp;
pub mod symbol;

// Re-export commonly used types
pub use config::PolylspConfig;
pub use hierarchy::{Evidence, EvidenceKind, HierarchyRelation, TypeRef};
pub use lsp::{
    Diagnostic, FileChangeType, HoverInfo, Location, Position, Range, SignatureHelp,
    TypeHierarchyItem,
};
pub use symbol::{Language, SymbolInfo, SymbolKind};
