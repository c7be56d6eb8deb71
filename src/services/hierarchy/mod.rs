//! Heuristic type hierarchy
//!
//! Answers "does S derive from T" and "what are T's sub/supertypes" for
//! backends whose native `typeHierarchy` is missing or unreliable:
//!
//! 1. Resolve the type declared at a position via document symbols
//! 2. Run the backend's structural matcher over the source text
//! 3. For Rust, fall back to a bounded project-wide `impl` scan
//!
//! Results are best effort. A lack of evidence is an empty answer, never an error.

pub mod matchers;
pub mod text;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config;
use crate::error::LspError;
use crate::infra::file_filter::FileFilter;
use crate::infra::lsp::{CapabilityProfile, MatcherFamily};
use crate::models::hierarchy::{Evidence, EvidenceKind, HierarchyRelation, TypeRef};
use crate::models::lsp::Position;
use crate::models::symbol::{Language, SymbolInfo, SymbolKind};
use crate::services::source::SemanticSource;

use self::text::last_segment;

pub use matchers::{BaseRef, Declaration, ImplBlock, extract_bases, find_evidence, rust_impl_blocks};

pub struct TypeHierarchyFallbackEngine {
    source: Arc<dyn SemanticSource>,
    root: PathBuf,
    language: Language,
    family: MatcherFamily,
    filter: FileFilter,
    forward_lines: usize,
    max_scan_files: usize,
}

impl TypeHierarchyFallbackEngine {
    pub fn new(
        source: Arc<dyn SemanticSource>,
        root: impl Into<PathBuf>,
        profile: &CapabilityProfile,
    ) -> Self {
        let root = root.into();
        Self {
            filter: FileFilter::with_ignored_dirs(&root, profile.ignored_dirs),
            source,
            root,
            language: profile.backend.language(),
            family: profile.matcher,
            forward_lines: config::forward_scan_lines(),
            max_scan_files: config::max_scan_files(),
        }
    }

    pub fn with_limits(mut self, forward_lines: usize, max_scan_files: usize) -> Self {
        self.forward_lines = forward_lines;
        self.max_scan_files = max_scan_files;
        self
    }

    pub fn family(&self) -> MatcherFamily {
        self.family
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Source files in scan order: lexicographic, ignored dirs skipped, bounded.
    /// Hitting the bound is reported since results may then be incomplete.
    fn scan_files(&self, purpose: &str) -> Vec<PathBuf> {
        let discovery = self
            .filter
            .discover_bounded(self.language.extensions(), self.max_scan_files);
        if discovery.truncated {
            tracing::warn!(
                "{} stopped after {} files (hierarchy.max_scan_files); results may be incomplete",
                purpose,
                self.max_scan_files
            );
        }
        discovery.files
    }

    /// The innermost type whose declaration `position` lands on
    pub async fn declaration_at(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<Option<SymbolInfo>, LspError> {
        let symbols = self.source.document_symbols(&self.absolute(path)).await?;
        Ok(SymbolInfo::flatten(&symbols)
            .into_iter()
            .filter(|s| s.kind.is_type() && on_declaration(s, position))
            .next_back()
            .cloned())
    }

    /// Evidence that the type at `position` derives from, implements or embeds `target`
    pub async fn relation(
        &self,
        path: &Path,
        position: Position,
        target: &str,
    ) -> Result<Option<HierarchyRelation>, LspError> {
        let path = self.absolute(path);
        let Some(symbol) = self.declaration_at(&path, position).await? else {
            tracing::debug!(
                "No type declaration at {}:{}",
                path.display(),
                position.line + 1
            );
            return Ok(None);
        };

        let name = SymbolInfo::strip_type_parameters(&symbol.name);
        let text = tokio::fs::read_to_string(&path).await?;
        let subject = type_ref(&symbol, &name, &path);
        let decl = Declaration {
            name: &name,
            line: symbol.selection_range.start.line,
        };

        if let Some(evidence) = find_evidence(self.family, &text, decl, target, self.forward_lines) {
            return Ok(Some(HierarchyRelation {
                subject,
                target: target.to_string(),
                evidence,
                evidence_file: path,
            }));
        }

        if self.family == MatcherFamily::Attribute {
            let trait_name = last_segment(target);
            let remote = self
                .remote_impls(&path)
                .await
                .into_iter()
                .find(|(_, block)| block.self_type == name && block.trait_name == trait_name);
            if let Some((file, block)) = remote {
                return Ok(Some(HierarchyRelation {
                    subject,
                    target: target.to_string(),
                    evidence: Evidence::new(EvidenceKind::ImplBlock, block.line),
                    evidence_file: file,
                }));
            }
        }

        tracing::debug!("No evidence that {} derives from {}", name, target);
        Ok(None)
    }

    pub async fn is_inheriting_from(
        &self,
        path: &Path,
        position: Position,
        target: &str,
    ) -> Result<bool, LspError> {
        Ok(self.relation(path, position, target).await?.is_some())
    }

    /// Every base the source names for the type at `position`, first evidence per name
    pub async fn supertypes(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<Vec<HierarchyRelation>, LspError> {
        let path = self.absolute(path);
        let Some(symbol) = self.declaration_at(&path, position).await? else {
            return Ok(Vec::new());
        };

        let name = SymbolInfo::strip_type_parameters(&symbol.name);
        let text = tokio::fs::read_to_string(&path).await?;
        let subject = type_ref(&symbol, &name, &path);
        let decl = Declaration {
            name: &name,
            line: symbol.selection_range.start.line,
        };

        let mut relations: Vec<HierarchyRelation> =
            extract_bases(self.family, &text, decl, self.forward_lines)
                .into_iter()
                .map(|base| HierarchyRelation {
                    subject: subject.clone(),
                    target: base.name,
                    evidence: base.evidence,
                    evidence_file: path.clone(),
                })
                .collect();

        if self.family == MatcherFamily::Attribute {
            for (file, block) in self.remote_impls(&path).await {
                if block.self_type == name {
                    relations.push(HierarchyRelation {
                        subject: subject.clone(),
                        target: block.trait_name,
                        evidence: Evidence::new(EvidenceKind::ImplBlock, block.line),
                        evidence_file: file,
                    });
                }
            }
        }

        let mut seen = HashSet::new();
        relations.retain(|r| seen.insert(r.target.clone()));
        Ok(relations)
    }

    /// Project types with evidence of deriving from `target`
    ///
    /// Semantically an unordered set; returned de-duplicated by (file, line)
    /// and sorted by path then line.
    pub async fn subtypes(&self, target: &str) -> Result<Vec<TypeRef>, LspError> {
        let target_name = last_segment(target).to_string();
        let mut found: Vec<TypeRef> = Vec::new();
        let mut index: HashMap<String, TypeRef> = HashMap::new();
        let mut impls: Vec<(PathBuf, ImplBlock)> = Vec::new();

        for file in self.scan_files("Subtype scan") {
            let Ok(text) = tokio::fs::read_to_string(&file).await else {
                tracing::debug!("Skipping unreadable file {}", file.display());
                continue;
            };
            let symbols = match self.source.document_symbols(&file).await {
                Ok(symbols) => symbols,
                Err(e) if e.needs_restart() || matches!(e, LspError::NotReady(_)) => return Err(e),
                Err(e) => {
                    tracing::debug!("No symbols for {}: {}", file.display(), e);
                    continue;
                }
            };

            for symbol in SymbolInfo::flatten(&symbols) {
                if !symbol.kind.is_type() {
                    continue;
                }
                let name = SymbolInfo::strip_type_parameters(&symbol.name);
                if name == target_name {
                    continue;
                }
                let subject = type_ref(symbol, &name, &file);
                let decl = Declaration {
                    name: &name,
                    line: symbol.selection_range.start.line,
                };
                if find_evidence(self.family, &text, decl, &target_name, self.forward_lines).is_some() {
                    found.push(subject.clone());
                }
                index.entry(name).or_insert(subject);
            }

            if self.family == MatcherFamily::Attribute {
                impls.extend(
                    rust_impl_blocks(&text)
                        .into_iter()
                        .filter(|b| b.trait_name == target_name)
                        .map(|b| (file.clone(), b)),
                );
            }
        }

        for (file, block) in impls {
            let subject = index.get(&block.self_type).cloned().unwrap_or_else(|| TypeRef {
                name: block.self_type.clone(),
                kind: SymbolKind::Struct,
                file,
                position: Position::new(block.line, 0),
            });
            found.push(subject);
        }

        let mut seen = HashSet::new();
        found.retain(|t| seen.insert((t.file.clone(), t.position.line)));
        found.sort_by(|a, b| a.file.cmp(&b.file).then(a.position.line.cmp(&b.position.line)));
        tracing::debug!("{} subtypes of {} found", found.len(), target_name);
        Ok(found)
    }

    /// `impl` blocks in every scanned Rust file except `current`
    async fn remote_impls(&self, current: &Path) -> Vec<(PathBuf, ImplBlock)> {
        let mut blocks = Vec::new();
        for file in self.scan_files("impl block scan") {
            if file == current {
                continue;
            }
            match tokio::fs::read_to_string(&file).await {
                Ok(text) => blocks.extend(rust_impl_blocks(&text).into_iter().map(|b| (file.clone(), b))),
                Err(e) => tracing::debug!("Skipping {}: {}", file.display(), e),
            }
        }
        blocks
    }
}

/// `position` is on the identifier or between the declaration start and the identifier
fn on_declaration(symbol: &SymbolInfo, position: Position) -> bool {
    symbol.selection_range.contains(position)
        || (symbol.range.start <= position && position.line <= symbol.selection_range.start.line)
}

fn type_ref(symbol: &SymbolInfo, name: &str, file: &Path) -> TypeRef {
    TypeRef {
        name: name.to_string(),
        kind: symbol.kind,
        file: file.to_path_buf(),
        position: symbol.selection_range.start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::lsp::Backend;
    use crate::models::lsp::Range;
    use crate::services::source::fake::FakeSource;
    use tempfile::TempDir;

    fn symbol(name: &str, kind: SymbolKind, line: u32, col: u32) -> SymbolInfo {
        let len = name.len() as u32;
        SymbolInfo::new(
            name,
            kind,
            Range::new(Position::new(line, 0), Position::new(line, col + len + 2)),
        )
        .with_selection_range(Range::new(
            Position::new(line, col),
            Position::new(line, col + len),
        ))
    }

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    fn engine(source: FakeSource, root: &Path, backend: Backend, max_files: usize) -> TypeHierarchyFallbackEngine {
        TypeHierarchyFallbackEngine::new(Arc::new(source), root, &backend.profile()).with_limits(8, max_files)
    }

    #[tokio::test]
    async fn test_cpp_inheritance_is_directional() {
        let dir = TempDir::new().unwrap();
        let file = write(dir.path(), "shapes.cpp", "class Base {};\nclass Child : public Base {};\n");
        let mut source = FakeSource::default();
        source.symbols.insert(
            file.clone(),
            vec![symbol("Base", SymbolKind::Class, 0, 6), symbol("Child", SymbolKind::Class, 1, 6)],
        );
        let engine = engine(source, dir.path(), Backend::Clangd, 50);

        let relation = engine
            .relation(&file, Position::new(1, 8), "Base")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(relation.subject.name, "Child");
        assert_eq!(relation.evidence, Evidence::new(EvidenceKind::ExtendsClause, 1));

        assert!(!engine.is_inheriting_from(&file, Position::new(0, 7), "Child").await.unwrap());
        // Past the end of the file
        assert!(!engine.is_inheriting_from(&file, Position::new(40, 0), "Base").await.unwrap());
    }

    #[tokio::test]
    async fn test_rust_impl_found_by_project_scan() {
        let dir = TempDir::new().unwrap();
        let shape = write(dir.path(), "src/a_shape.rs", "pub struct Circle;\n");
        write(dir.path(), "src/z_impls.rs", "use crate::Shape;\n\nimpl Shape for Circle {}\n");
        write(dir.path(), "target/debug/gen.rs", "impl Hidden for Circle {}\n");

        let make = || {
            let mut source = FakeSource::default();
            source
                .symbols
                .insert(shape.clone(), vec![symbol("Circle", SymbolKind::Struct, 0, 11)]);
            source
        };

        let scanning = engine(make(), dir.path(), Backend::RustAnalyzer, 50);
        let relation = scanning
            .relation(&shape, Position::new(0, 12), "Shape")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(relation.evidence, Evidence::new(EvidenceKind::ImplBlock, 2));
        assert!(relation.evidence_file.ends_with("src/z_impls.rs"));
        assert!(!scanning.is_inheriting_from(&shape, Position::new(0, 12), "Hidden").await.unwrap());

        // Bound of one file stops before the impl file
        let bounded = engine(make(), dir.path(), Backend::RustAnalyzer, 1);
        assert!(!bounded.is_inheriting_from(&shape, Position::new(0, 12), "Shape").await.unwrap());
    }

    #[tokio::test]
    async fn test_rust_supertypes_merge_derive_and_impls() {
        let dir = TempDir::new().unwrap();
        let file = write(
            dir.path(),
            "lib.rs",
            "#[derive(Debug, Clone)]\npub struct Point;\n\nimpl Display for Point {}\nimpl Debug for Point {}\n",
        );
        let mut source = FakeSource::default();
        source
            .symbols
            .insert(file.clone(), vec![symbol("Point", SymbolKind::Struct, 1, 11)]);
        let engine = engine(source, dir.path(), Backend::RustAnalyzer, 50);

        let supers = engine.supertypes(&file, Position::new(1, 12)).await.unwrap();
        let targets: Vec<&str> = supers.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["Debug", "Clone", "Display"]);
    }

    #[tokio::test]
    async fn test_go_subtypes_sorted_and_exclude_named_fields() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.go", "type Base struct{}\ntype Child struct {\n\tBase\n}\n");
        let b = write(dir.path(), "b.go", "type Other struct { base Base }\ntype Second struct { *Base }\n");
        let mut source = FakeSource::default();
        source.symbols.insert(
            a.clone(),
            vec![symbol("Base", SymbolKind::Struct, 0, 5), symbol("Child", SymbolKind::Struct, 1, 5)],
        );
        source.symbols.insert(
            b.clone(),
            vec![symbol("Other", SymbolKind::Struct, 0, 5), symbol("Second", SymbolKind::Struct, 1, 5)],
        );
        let engine = engine(source, dir.path(), Backend::Gopls, 50);

        let subs = engine.subtypes("Base").await.unwrap();
        let names: Vec<&str> = subs.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Child", "Second"]);
        assert_eq!(subs[0].file, a);
        assert_eq!(subs[1].position, Position::new(1, 5));
        assert!(engine.subtypes("Missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subtypes_stop_at_scan_bound() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.go", "type Alias int
type Child struct { Base }
");
        let b = write(dir.path(), "b.go", "type Second struct { *Base }
");
        let mut source = FakeSource::default();
        source.symbols.insert(
            a.clone(),
            vec![symbol("Alias", SymbolKind::Class, 0, 5), symbol("Child", SymbolKind::Struct, 1, 5)],
        );
        source
            .symbols
            .insert(b.clone(), vec![symbol("Second", SymbolKind::Struct, 0, 5)]);
        let engine = engine(source, dir.path(), Backend::Gopls, 1);

        assert!(engine.filter.discover_bounded(&["go"], 1).truncated);
        let subs = engine.subtypes("Base").await.unwrap();
        let names: Vec<&str> = subs.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Child"]);
    }

    #[tokio::test]
    async fn test_rust_subtypes_from_impls_dedupe_with_derives() {
        let dir = TempDir::new().unwrap();
        let types = write(dir.path(), "src/types.rs", "#[derive(Marker)]\npub struct A;\npub struct B;\n");
        write(dir.path(), "src/impls.rs", "impl Marker for A {}\nimpl Marker for B {}\n");
        let mut source = FakeSource::default();
        source.symbols.insert(
            types.clone(),
            vec![symbol("A", SymbolKind::Struct, 1, 11), symbol("B", SymbolKind::Struct, 2, 11)],
        );
        let engine = engine(source, dir.path(), Backend::RustAnalyzer, 50);

        let subs = engine.subtypes("Marker").await.unwrap();
        let names: Vec<(&str, u32)> = subs.iter().map(|t| (t.name.as_str(), t.position.line)).collect();
        assert_eq!(names, vec![("A", 1), ("B", 2)]);
    }
}
