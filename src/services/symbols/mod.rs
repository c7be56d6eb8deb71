//! Symbol trees, lookup by name path, and signature/docstring enrichment

pub mod enrich;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::config;
use crate::error::LspError;
use crate::infra::file_filter::FileFilter;
use crate::infra::lsp::CapabilityProfile;
use crate::models::symbol::{Language, SymbolInfo};
use crate::services::source::SemanticSource;

pub use enrich::{SignatureDoc, signature_and_docstring, split_markdown};

/// Parallel enrichment requests per tree
const ENRICH_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub enum SearchScope {
    File(PathBuf),
    Project,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolMatch {
    pub file: PathBuf,
    #[serde(flatten)]
    pub symbol: SymbolInfo,
}

pub struct SymbolManager {
    source: Arc<dyn SemanticSource>,
    root: PathBuf,
    language: Language,
    filter: FileFilter,
    max_scan_files: usize,
}

impl SymbolManager {
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
            max_scan_files: config::max_scan_files(),
        }
    }

    pub fn with_max_scan_files(mut self, max: usize) -> Self {
        self.max_scan_files = max;
        self
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Nested symbols with name paths computed
    pub async fn document_tree(&self, path: &Path) -> Result<Vec<SymbolInfo>, LspError> {
        self.source.document_symbols(&self.absolute(path)).await
    }

    /// Symbols whose name path matches `pattern`, in file then pre-order
    pub async fn find_by_name(
        &self,
        pattern: &str,
        scope: &SearchScope,
    ) -> Result<Vec<SymbolMatch>, LspError> {
        let files = match scope {
            SearchScope::File(path) => vec![self.absolute(path)],
            SearchScope::Project => self
                .filter
                .discover_files(self.language.extensions(), self.max_scan_files),
        };
        let single = matches!(scope, SearchScope::File(_));

        let mut found = Vec::new();
        for file in files {
            let tree = match self.source.document_symbols(&file).await {
                Ok(tree) => tree,
                Err(e) if single || e.needs_restart() || matches!(e, LspError::NotReady(_)) => {
                    return Err(e);
                }
                Err(e) => {
                    tracing::debug!("No symbols for {}: {}", file.display(), e);
                    continue;
                }
            };
            found.extend(
                SymbolInfo::filter_by_path(&tree, pattern)
                    .into_iter()
                    .map(|symbol| SymbolMatch {
                        file: file.clone(),
                        symbol,
                    }),
            );
        }
        Ok(found)
    }

    /// Fill `signature` and `docstring` in place; never fails
    pub async fn enrich(&self, symbol: &mut SymbolInfo, path: &Path) {
        let path = self.absolute(path);
        let (signature, docstring) =
            signature_and_docstring(self.source.as_ref(), &path, symbol.selection_range.start).await;
        symbol.signature = signature;
        symbol.docstring = docstring;
    }

    /// Enrich every symbol of a tree
    pub async fn enrich_tree(&self, symbols: &mut [SymbolInfo], path: &Path) {
        let path = self.absolute(path);
        let positions: Vec<_> = SymbolInfo::flatten(symbols)
            .into_iter()
            .map(|s| s.selection_range.start)
            .collect();

        let results: Vec<SignatureDoc> = stream::iter(positions)
            .map(|position| signature_and_docstring(self.source.as_ref(), &path, position))
            .buffered(ENRICH_CONCURRENCY)
            .collect()
            .await;

        let mut results = results.into_iter();
        assign_preorder(symbols, &mut results);
    }
}

fn assign_preorder(symbols: &mut [SymbolInfo], results: &mut impl Iterator<Item = SignatureDoc>) {
    for symbol in symbols {
        if let Some((signature, docstring)) = results.next() {
            symbol.signature = signature;
            symbol.docstring = docstring;
        }
        assign_preorder(&mut symbol.children, results);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::lsp::Backend;
    use crate::models::lsp::{HoverInfo, Position, Range, SignatureHelp, SignatureInfo};
    use crate::models::symbol::SymbolKind;
    use crate::services::source::fake::FakeSource;
    use tempfile::TempDir;

    fn symbol(name: &str, kind: SymbolKind, line: u32) -> SymbolInfo {
        SymbolInfo::new(
            name,
            kind,
            Range::new(Position::new(line, 0), Position::new(line + 2, 0)),
        )
        .with_selection_range(Range::new(
            Position::new(line, 4),
            Position::new(line, 4 + name.len() as u32),
        ))
    }

    fn tree(children: Vec<SymbolInfo>) -> Vec<SymbolInfo> {
        let mut symbols = vec![symbol("UserService", SymbolKind::Class, 0).with_children(children)];
        SymbolInfo::compute_paths_for_all(&mut symbols);
        symbols
    }

    fn write(dir: &Path, rel: &str) -> PathBuf {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "").unwrap();
        path
    }

    fn documented(label: &str, doc: &str) -> SignatureHelp {
        SignatureHelp {
            signatures: vec![SignatureInfo {
                label: label.into(),
                documentation: Some(doc.into()),
                parameters: vec![],
                active_parameter: None,
            }],
            active_signature: Some(0),
            active_parameter: None,
        }
    }

    fn manager(source: FakeSource, root: &Path) -> SymbolManager {
        SymbolManager::new(Arc::new(source), root, &Backend::Jedi.profile()).with_max_scan_files(100)
    }

    #[tokio::test]
    async fn test_find_by_name_in_file() {
        let dir = TempDir::new().unwrap();
        let file = write(dir.path(), "services.py");
        let mut source = FakeSource::default();
        source.symbols.insert(
            file.clone(),
            tree(vec![
                symbol("__init__", SymbolKind::Method, 1),
                symbol("create_user", SymbolKind::Method, 4),
            ]),
        );
        let manager = manager(source, dir.path());

        let found = manager
            .find_by_name("UserService/create_user", &SearchScope::File("services.py".into()))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file, file);
        assert_eq!(found[0].symbol.name_path, "UserService/create_user");

        let none = manager
            .find_by_name("delete_user", &SearchScope::File(file))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_name_across_project_skips_ignored_dirs() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.py");
        let b = write(dir.path(), "pkg/b.py");
        let cached = write(dir.path(), "__pycache__/c.py");
        let mut source = FakeSource::default();
        for file in [&a, &b, &cached] {
            source.symbols.insert(file.clone(), tree(vec![symbol("run", SymbolKind::Method, 1)]));
        }
        let manager = manager(source, dir.path());

        let found = manager.find_by_name("run", &SearchScope::Project).await.unwrap();
        let files: Vec<_> = found.iter().map(|m| m.file.clone()).collect();
        assert_eq!(files, vec![a, b]);
    }

    #[tokio::test]
    async fn test_enrich_prefers_documented_signature() {
        let dir = TempDir::new().unwrap();
        let file = write(dir.path(), "services.py");
        let mut sym = symbol("create_user", SymbolKind::Method, 4);
        let mut source = FakeSource::default();
        source.signatures.insert(
            (file.clone(), sym.selection_range.start),
            documented("create_user(self, id: str) -> User", "Create a new user."),
        );
        source.hovers.insert(
            (file.clone(), sym.selection_range.start),
            HoverInfo {
                content: "```python\nignored\n```".into(),
                range: None,
            },
        );

        manager(source, dir.path()).enrich(&mut sym, &file).await;
        assert_eq!(sym.signature.as_deref(), Some("create_user(self, id: str) -> User"));
        assert_eq!(sym.docstring.as_deref(), Some("Create a new user."));
    }

    #[tokio::test]
    async fn test_enrich_falls_back_to_hover() {
        let dir = TempDir::new().unwrap();
        let file = write(dir.path(), "services.py");
        let mut sym = symbol("get_user", SymbolKind::Method, 7);
        let mut source = FakeSource::default();
        source.hovers.insert(
            (file.clone(), sym.selection_range.start),
            HoverInfo {
                content: "```python\ndef get_user(self, id: str) -> User\n```\n---\nFetch a user.".into(),
                range: None,
            },
        );

        manager(source, dir.path()).enrich(&mut sym, &file).await;
        assert_eq!(sym.signature.as_deref(), Some("def get_user(self, id: str) -> User"));
        assert_eq!(sym.docstring.as_deref(), Some("Fetch a user."));
    }

    #[tokio::test]
    async fn test_enrich_failure_degrades_to_none() {
        let dir = TempDir::new().unwrap();
        let file = write(dir.path(), "services.py");
        let mut sym = symbol("get_user", SymbolKind::Method, 7);
        sym.signature = Some("stale".into());
        let mut source = FakeSource {
            fail_signature_help: true,
            ..Default::default()
        };
        source.hovers.insert(
            (file.clone(), sym.selection_range.start),
            HoverInfo {
                content: "```python\ndef get_user()\n```".into(),
                range: None,
            },
        );

        manager(source, dir.path()).enrich(&mut sym, &file).await;
        assert_eq!((sym.signature, sym.docstring), (None, None));
    }

    #[tokio::test]
    async fn test_enrich_tree_fills_children() {
        let dir = TempDir::new().unwrap();
        let file = write(dir.path(), "services.py");
        let mut symbols = tree(vec![
            symbol("create_user", SymbolKind::Method, 4),
            symbol("get_user", SymbolKind::Method, 7),
        ]);
        let mut source = FakeSource::default();
        source.signatures.insert(
            (file.clone(), Position::new(4, 4)),
            documented("create_user()", "Create."),
        );
        source.hovers.insert(
            (file.clone(), Position::new(0, 4)),
            HoverInfo {
                content: "```python\nclass UserService\n```\nUser operations.".into(),
                range: None,
            },
        );

        manager(source, dir.path()).enrich_tree(&mut symbols, &file).await;
        assert_eq!(symbols[0].signature.as_deref(), Some("class UserService"));
        assert_eq!(symbols[0].children[0].docstring.as_deref(), Some("Create."));
        assert_eq!(symbols[0].children[1].signature, None);
        assert_eq!(symbols[0].children[1].docstring, None);
    }
}
