//! Configuration service for polylsp

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::ConfigError;
use crate::models::config::PolylspConfig;

#[async_trait]
pub trait ConfigService: Send + Sync {
    async fn load(&self, global_only: bool) -> Result<PolylspConfig, ConfigError>;
    fn config_path(&self, global: bool) -> PathBuf;
}

pub struct DefaultConfigService {
    root: PathBuf,
}

impl DefaultConfigService {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn global_config_path() -> PathBuf {
        // XDG standard: ~/.config/polylsp/config.toml
        std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("polylsp")
            .join("config.toml")
    }

    fn project_config_path(&self) -> PathBuf {
        self.root.join(".polylsp").join("config.toml")
    }

    async fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
        if !path.exists() {
            return Ok(toml::Table::new());
        }
        let content = tokio::fs::read_to_string(path).await?;
        toml::from_str::<toml::Table>(&content)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl ConfigService for DefaultConfigService {
    async fn load(&self, global_only: bool) -> Result<PolylspConfig, ConfigError> {
        let mut table = Self::load_table(&Self::global_config_path()).await?;
        if !global_only {
            let project = Self::load_table(&self.project_config_path()).await?;
            merge_sections(&mut table, project);
        }

        let config: PolylspConfig = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;
        let config = apply_env_overrides(config);
        validate(&config)?;
        Ok(config)
    }

    fn config_path(&self, global: bool) -> PathBuf {
        if global {
            Self::global_config_path()
        } else {
            self.project_config_path()
        }
    }
}

/// Project sections replace global ones wholesale
fn merge_sections(base: &mut toml::Table, overlay: toml::Table) {
    for (section, value) in overlay {
        base.insert(section, value);
    }
}

fn apply_env_overrides(mut config: PolylspConfig) -> PolylspConfig {
    if let Ok(val) = std::env::var("POLYLSP_LSP_TIMEOUT")
        && let Ok(timeout) = val.parse()
    {
        config.lsp.timeout_secs = timeout;
    }
    config
}

fn validate(config: &PolylspConfig) -> Result<(), ConfigError> {
    if config.lsp.timeout_secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: "lsp.timeout_secs".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    if config.hierarchy.max_scan_files == 0 {
        return Err(ConfigError::InvalidValue {
            key: "hierarchy.max_scan_files".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
