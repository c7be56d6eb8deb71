//! Refs command: references to the symbol at a position

use anyhow::Result;
use clap::Args;

use crate::app::App;
use crate::cli::ParsedLocation;
use crate::cli::response::{LocationOutput, ReferencesResponse};

#[derive(Args, Debug)]
pub struct RefsArgs {
    /// Position as file:line[:column] (1-indexed)
    pub location: String,

    /// Leave the declaration itself out of the results
    #[arg(long)]
    pub exclude_declaration: bool,

    /// Maximum results
    #[arg(long)]
    pub limit: Option<usize>,
}

pub async fn execute(args: RefsArgs, app: &App) -> Result<()> {
    let ctx = &app.output;
    let loc = ParsedLocation::parse(&args.location)?.resolve(app.root())?;
    loc.validate_against(&tokio::fs::read_to_string(&loc.file).await?)?;

    let server = app.start_server(&loc.file).await?;
    let result = server
        .references(&loc.file, loc.position(), !args.exclude_declaration)
        .await;
    app.stop_server(&server).await;

    match result {
        Ok(mut locations) => {
            locations.sort_by(|a, b| a.uri.cmp(&b.uri).then(a.range.start.cmp(&b.range.start)));
            let references: Vec<LocationOutput> = locations
                .iter()
                .take(args.limit.unwrap_or(usize::MAX))
                .map(|l| LocationOutput::from_location(l, ctx.root()))
                .collect();
            ctx.print_success(ReferencesResponse {
                count: references.len(),
                references,
            });
        }
        Err(e) => ctx.print_error(&e.to_string()),
    }
    Ok(())
}
