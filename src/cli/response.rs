//! JSON response shapes for CLI commands
//!
//! Positions are 1-indexed and paths are relative to the project root when
//! they fall inside it.

use std::path::Path;

use serde::Serialize;

use crate::models::hierarchy::{HierarchyRelation, TypeRef};
use crate::models::lsp::{Location, Position, TypeHierarchyItem};
use crate::models::symbol::SymbolInfo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationOutput {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl LocationOutput {
    /// From a 0-indexed position
    pub fn from_position(path: &Path, position: Position, root: &Path) -> Self {
        let (line, column) = position.to_display();
        let file = path
            .strip_prefix(root)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| path.display().to_string());
        Self { file, line, column }
    }

    pub fn from_location(location: &Location, root: &Path) -> Self {
        Self::from_position(&location.path(), location.range.start, root)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolOutput {
    pub name: String,
    pub name_path: String,
    pub kind: String,
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SymbolOutput>,
}

impl From<&SymbolInfo> for SymbolOutput {
    fn from(symbol: &SymbolInfo) -> Self {
        let (line, column) = symbol.selection_range.start.to_display();
        Self {
            name: symbol.name.clone(),
            name_path: symbol.name_path.clone(),
            kind: symbol.kind.to_string(),
            line,
            column,
            end_line: symbol.range.end.line + 1,
            detail: symbol.detail.clone(),
            signature: symbol.signature.clone(),
            docstring: symbol.docstring.clone(),
            children: symbol.children.iter().map(Self::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SymbolsResponse {
    pub file: String,
    pub count: usize,
    pub symbols: Vec<SymbolOutput>,
}

#[derive(Debug, Serialize)]
pub struct ReferencesResponse {
    pub count: usize,
    pub references: Vec<LocationOutput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeOutput {
    pub name: String,
    pub kind: String,
    pub location: LocationOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<EvidenceOutput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvidenceOutput {
    pub kind: String,
    pub location: LocationOutput,
}

impl TypeOutput {
    pub fn from_type_ref(type_ref: &TypeRef, root: &Path) -> Self {
        Self {
            name: type_ref.name.clone(),
            kind: type_ref.kind.to_string(),
            location: LocationOutput::from_position(&type_ref.file, type_ref.position, root),
            evidence: None,
        }
    }

    pub fn from_symbol(symbol: &SymbolInfo, file: &Path, root: &Path) -> Self {
        Self {
            name: SymbolInfo::strip_type_parameters(&symbol.name),
            kind: symbol.kind.to_string(),
            location: LocationOutput::from_position(file, symbol.selection_range.start, root),
            evidence: None,
        }
    }

    pub fn from_item(item: &TypeHierarchyItem, root: &Path) -> Self {
        Self {
            name: item.name.clone(),
            kind: item.kind.to_string(),
            location: LocationOutput::from_location(&item.location, root),
            evidence: None,
        }
    }

    /// A supertype named by `relation`; its declaration site is unknown, so
    /// the location points at the evidence
    pub fn from_relation(relation: &HierarchyRelation, root: &Path) -> Self {
        let evidence = EvidenceOutput::from_relation(relation, root);
        Self {
            name: relation.target.clone(),
            kind: "type".to_string(),
            location: evidence.location.clone(),
            evidence: Some(evidence),
        }
    }
}

impl EvidenceOutput {
    pub fn from_relation(relation: &HierarchyRelation, root: &Path) -> Self {
        Self {
            kind: relation.evidence.kind.to_string(),
            location: LocationOutput::from_position(
                &relation.evidence_file,
                Position::new(relation.evidence.line, 0),
                root,
            ),
        }
    }
}

/// Where hierarchy answers came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchySource {
    Native,
    Heuristic,
}

#[derive(Debug, Serialize)]
pub struct HierarchyResponse {
    pub source: HierarchySource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<TypeOutput>,
    pub supertypes: Vec<TypeOutput>,
    pub subtypes: Vec<TypeOutput>,
}

#[derive(Debug, Serialize)]
pub struct RelationResponse {
    pub source: HierarchySource,
    pub target: String,
    pub related: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<TypeOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<EvidenceOutput>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::hierarchy::{Evidence, EvidenceKind};
    use crate::models::lsp::Range;
    use crate::models::symbol::SymbolKind;
    use std::path::PathBuf;

    #[test]
    fn test_location_output_is_one_indexed_and_relative() {
        let out = LocationOutput::from_position(
            Path::new("/project/src/main.rs"),
            Position::new(9, 4),
            Path::new("/project"),
        );
        assert_eq!(out, LocationOutput { file: "src/main.rs".into(), line: 10, column: 5 });

        let outside = LocationOutput::from_position(
            Path::new("/other/lib.rs"),
            Position::new(0, 0),
            Path::new("/project"),
        );
        assert_eq!(outside.file, "/other/lib.rs");
    }

    #[test]
    fn test_symbol_output_uses_selection_start() {
        let mut symbols = vec![
            SymbolInfo::new(
                "Shape",
                SymbolKind::Class,
                Range::new(Position::new(2, 0), Position::new(8, 1)),
            )
            .with_selection_range(Range::new(Position::new(2, 6), Position::new(2, 11))),
        ];
        SymbolInfo::compute_paths_for_all(&mut symbols);

        let out = SymbolOutput::from(&symbols[0]);
        assert_eq!((out.line, out.column, out.end_line), (3, 7, 9));
        assert_eq!(out.kind, "class");
        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("children").is_none());
        assert!(json.get("signature").is_none());
    }

    #[test]
    fn test_relation_output_points_at_evidence() {
        let relation = HierarchyRelation {
            subject: TypeRef {
                name: "Circle".into(),
                kind: SymbolKind::Struct,
                file: PathBuf::from("/p/src/shapes.rs"),
                position: Position::new(3, 11),
            },
            target: "Shape".into(),
            evidence: Evidence::new(EvidenceKind::ImplBlock, 20),
            evidence_file: PathBuf::from("/p/src/impls.rs"),
        };
        let out = TypeOutput::from_relation(&relation, Path::new("/p"));
        assert_eq!(out.name, "Shape");
        assert_eq!(out.location.file, "src/impls.rs");
        assert_eq!(out.location.line, 21);
        assert_eq!(out.evidence.unwrap().kind, "impl");
    }
}
