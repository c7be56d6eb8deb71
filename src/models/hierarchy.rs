//! Type hierarchy models
//!
//! Relations produced by the heuristic fallback engine.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::lsp::{Location, Position};
use super::symbol::SymbolKind;

/// Syntactic construct a relation was inferred from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    /// `class A : public B`, `class A extends B`, `class A(B)`
    ExtendsClause,
    /// `implements I`, Scala `with T`
    ImplementsClause,
    /// Go anonymous struct field
    StructEmbedding,
    /// Rust `#[derive(T)]`
    DeriveAttribute,
    /// Rust `impl T for S`
    ImplBlock,
    /// Julia `struct S <: T`
    SubtypeDeclaration,
}

impl fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ExtendsClause => "extends",
            Self::ImplementsClause => "implements",
            Self::StructEmbedding => "embedding",
            Self::DeriveAttribute => "derive",
            Self::ImplBlock => "impl",
            Self::SubtypeDeclaration => "subtype",
        };
        write!(f, "{}", s)
    }
}

/// A single piece of textual evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub kind: EvidenceKind,
    /// 0-indexed line the evidence was found on, in `file` of the owning relation
    pub line: u32,
}

impl Evidence {
    pub fn new(kind: EvidenceKind, line: u32) -> Self {
        Self { kind, line }
    }
}

/// A type-like symbol in the project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: String,
    pub kind: SymbolKind,
    pub file: PathBuf,
    /// Position of the type's identifier
    pub position: Position,
}

impl TypeRef {
    pub fn from_location(name: impl Into<String>, kind: SymbolKind, location: &Location) -> Self {
        Self {
            name: name.into(),
            kind,
            file: location.path(),
            position: location.range.start,
        }
    }
}

/// `subject` derives from, implements or embeds `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyRelation {
    pub subject: TypeRef,
    pub target: String,
    pub evidence: Evidence,
    /// File holding the evidence (differs from the subject's file for remote impl blocks)
    pub evidence_file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lsp::Range;

    #[test]
    fn test_type_ref_from_location() {
        let loc = Location::new(
            "file:///src/a.rs",
            Range::new(Position::new(3, 7), Position::new(3, 12)),
        );
        let r = TypeRef::from_location("Child", SymbolKind::Struct, &loc);
        assert_eq!(r.file, PathBuf::from("/src/a.rs"));
        assert_eq!(r.position, Position::new(3, 7));
    }

    #[test]
    fn test_evidence_serialization() {
        let ev = Evidence::new(EvidenceKind::StructEmbedding, 4);
        let json = serde_json::to_value(ev).unwrap();
        assert_eq!(json["kind"], "struct_embedding");
        assert_eq!(EvidenceKind::ImplBlock.to_string(), "impl");
    }
}
