//! Symbols command: document symbol tree of one file

use std::path::Path;

use anyhow::Result;
use clap::Args;

use crate::app::App;
use crate::cli::location::resolve_file;
use crate::cli::response::{SymbolOutput, SymbolsResponse};
use crate::error::LspError;
use crate::models::symbol::SymbolInfo;
use crate::services::{SearchScope, SymbolManager};

#[derive(Args, Debug)]
pub struct SymbolsArgs {
    /// Source file
    pub file: String,

    /// Only symbols matching a name path ("method", "Class/method", "Class/*")
    #[arg(short, long)]
    pub name: Option<String>,

    /// Attach signature and docstring to each symbol
    #[arg(long)]
    pub enrich: bool,
}

pub async fn execute(args: SymbolsArgs, app: &App) -> Result<()> {
    let ctx = &app.output;
    let file = resolve_file(Path::new(&args.file), app.root())?;
    let server = app.start_server(&file).await?;
    let manager = SymbolManager::new(server.clone(), app.root(), server.profile());

    let result = collect(&manager, &file, &args).await;
    app.stop_server(&server).await;

    match result {
        Ok(symbols) => ctx.print_success(SymbolsResponse {
            file: ctx.relative_path(&file),
            count: SymbolInfo::flatten(&symbols).len(),
            symbols: symbols.iter().map(SymbolOutput::from).collect(),
        }),
        Err(e) => ctx.print_error(&e.to_string()),
    }
    Ok(())
}

async fn collect(
    manager: &SymbolManager,
    file: &Path,
    args: &SymbolsArgs,
) -> Result<Vec<SymbolInfo>, LspError> {
    let mut symbols: Vec<SymbolInfo> = match &args.name {
        Some(pattern) => manager
            .find_by_name(pattern, &SearchScope::File(file.to_path_buf()))
            .await?
            .into_iter()
            .map(|m| m.symbol)
            .collect(),
        None => manager.document_tree(file).await?,
    };

    if args.enrich {
        manager.enrich_tree(&mut symbols, file).await;
    }
    Ok(symbols)
}
