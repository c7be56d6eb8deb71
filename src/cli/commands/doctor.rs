//! Doctor command: which backends can be launched from here

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::app::App;
use crate::infra::lsp::{ServerHealth, check_all};

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Only list servers that cannot be launched
    #[arg(long)]
    pub missing_only: bool,
}

#[derive(Serialize)]
struct DoctorResponse {
    summary: DoctorSummary,
    servers: Vec<ServerEntry>,
}

#[derive(Serialize)]
struct DoctorSummary {
    available: usize,
    missing: usize,
}

#[derive(Serialize)]
struct ServerEntry {
    backend: String,
    language: String,
    available: bool,
    native_type_hierarchy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<ServerHealth> for ServerEntry {
    fn from(health: ServerHealth) -> Self {
        Self {
            backend: health.backend.name().to_string(),
            language: health.backend.language().to_string(),
            available: health.is_available(),
            native_type_hierarchy: health.backend.profile().native_type_hierarchy,
            command: health.command,
            version: health.version,
            error: health.error,
        }
    }
}

pub fn execute(args: DoctorArgs, app: &App) -> Result<()> {
    let health = check_all(app.root(), &app.config().lsp.servers);
    let available = health.iter().filter(|h| h.is_available()).count();
    let missing = health.len() - available;

    let servers: Vec<ServerEntry> = health
        .into_iter()
        .filter(|h| !args.missing_only || !h.is_available())
        .map(ServerEntry::from)
        .collect();

    app.output.print_success(DoctorResponse {
        summary: DoctorSummary { available, missing },
        servers,
    });
    Ok(())
}
