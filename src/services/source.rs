//! Query seam between the services and a live language server

use std::path::Path;

use async_trait::async_trait;

use crate::error::LspError;
use crate::infra::lsp::LanguageServer;
use crate::models::lsp::{HoverInfo, Position, SignatureHelp};
use crate::models::symbol::SymbolInfo;

/// The subset of server queries the symbol and hierarchy services consume
#[async_trait]
pub trait SemanticSource: Send + Sync {
    async fn document_symbols(&self, path: &Path) -> Result<Vec<SymbolInfo>, LspError>;

    async fn hover(&self, path: &Path, position: Position) -> Result<Option<HoverInfo>, LspError>;

    async fn signature_help(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<Option<SignatureHelp>, LspError>;
}

#[async_trait]
impl SemanticSource for LanguageServer {
    async fn document_symbols(&self, path: &Path) -> Result<Vec<SymbolInfo>, LspError> {
        LanguageServer::document_symbols(self, path).await
    }

    async fn hover(&self, path: &Path, position: Position) -> Result<Option<HoverInfo>, LspError> {
        LanguageServer::hover(self, path, position).await
    }

    async fn signature_help(
        &self,
        path: &Path,
        position: Position,
    ) -> Result<Option<SignatureHelp>, LspError> {
        LanguageServer::signature_help(self, path, position).await
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;

    /// Canned answers keyed by file; unknown files have no symbols
    #[derive(Default)]
    pub struct FakeSource {
        pub symbols: HashMap<PathBuf, Vec<SymbolInfo>>,
        pub hovers: HashMap<(PathBuf, Position), HoverInfo>,
        pub signatures: HashMap<(PathBuf, Position), SignatureHelp>,
        pub fail_signature_help: bool,
        pub symbol_calls: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl SemanticSource for FakeSource {
        async fn document_symbols(&self, path: &Path) -> Result<Vec<SymbolInfo>, LspError> {
            self.symbol_calls.lock().unwrap().push(path.to_path_buf());
            Ok(self.symbols.get(path).cloned().unwrap_or_default())
        }

        async fn hover(&self, path: &Path, position: Position) -> Result<Option<HoverInfo>, LspError> {
            Ok(self.hovers.get(&(path.to_path_buf(), position)).cloned())
        }

        async fn signature_help(
            &self,
            path: &Path,
            position: Position,
        ) -> Result<Option<SignatureHelp>, LspError> {
            if self.fail_signature_help {
                return Err(LspError::timeout("textDocument/signatureHelp", std::time::Duration::from_secs(1)));
            }
            Ok(self.signatures.get(&(path.to_path_buf(), position)).cloned())
        }
    }
}
