//! Service layer for polylsp

pub mod config;
pub mod hierarchy;
pub mod source;
pub mod symbols;

pub use config::{ConfigService, DefaultConfigService};
pub use hierarchy::TypeHierarchyFallbackEngine;
pub use source::SemanticSource;
pub use symbols::{SearchScope, SymbolManager, SymbolMatch};
