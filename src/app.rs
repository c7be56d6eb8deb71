//! Application container for the polylsp CLI

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::cli::OutputContext;
use crate::config;
use crate::infra::lsp::{Backend, LanguageServer, TokioLauncher, servers};
use crate::models::config::PolylspConfig;
use crate::models::symbol::Language;
use crate::services::config::{ConfigService, DefaultConfigService};

pub struct App {
    root: PathBuf,
    pub(crate) output: OutputContext,
    pub(crate) config: PolylspConfig,
}

impl App {
    pub async fn new(root: Option<PathBuf>) -> anyhow::Result<Self> {
        let root = match root {
            Some(root) => root,
            None => std::env::current_dir()?,
        };
        let root = root
            .canonicalize()
            .with_context(|| format!("Invalid project root: {}", root.display()))?;

        tracing::debug!("Initializing polylsp at {:?}", root);

        let config_service = DefaultConfigService::new(&root);
        let config = match config_service.load(false).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Using default configuration: {}", e);
                PolylspConfig::default()
            }
        };
        config::init(&config);

        Ok(Self {
            output: OutputContext::new(root.clone()),
            root,
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &PolylspConfig {
        &self.config
    }

    pub fn backend_for(&self, file: &Path) -> anyhow::Result<Backend> {
        let language = Language::from_path(file);
        Backend::for_language(language)
            .with_context(|| format!("No language server for {}", file.display()))
    }

    /// Launch the backend serving `file` and wait until it is ready
    pub async fn start_server(&self, file: &Path) -> anyhow::Result<Arc<LanguageServer>> {
        let backend = self.backend_for(file)?;
        let spec = servers::resolve(backend, &self.root, &self.config.lsp.servers)?;
        tracing::info!("Starting {}: {}", backend.name(), spec.display());

        let server = LanguageServer::new(backend.profile(), &self.root);
        server.start(&TokioLauncher, &spec).await?;
        Ok(server)
    }

    /// Shut a server down; failures are logged, not returned
    pub async fn stop_server(&self, server: &LanguageServer) {
        if let Err(e) = server.shutdown().await {
            tracing::warn!("{} did not shut down cleanly: {}", server.name(), e);
        }
    }
}
