//! Hierarchy command: supertypes and subtypes of the type at a position
//!
//! Backends with a trustworthy `typeHierarchy` answer natively; everything
//! else, and any native query the server rejects, goes through the heuristic
//! engine.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::app::App;
use crate::cli::ParsedLocation;
use crate::cli::response::{
    EvidenceOutput, HierarchyResponse, HierarchySource, RelationResponse, TypeOutput,
};
use crate::error::LspError;
use crate::infra::lsp::LanguageServer;
use crate::infra::lsp::converters::convert_type_hierarchy_item;
use crate::models::lsp::Position;
use crate::models::symbol::SymbolInfo;
use crate::services::TypeHierarchyFallbackEngine;
use crate::services::hierarchy::text::last_segment;

#[derive(Args, Debug)]
pub struct HierarchyArgs {
    /// Position of a type declaration as file:line[:column] (1-indexed)
    pub location: String,

    /// Only check whether the type derives from, implements or embeds this type
    #[arg(long)]
    pub target: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Answer {
    Hierarchy(HierarchyResponse),
    Relation(RelationResponse),
}

pub async fn execute(args: HierarchyArgs, app: &App) -> Result<()> {
    let ctx = &app.output;
    let loc = ParsedLocation::parse(&args.location)?.resolve(app.root())?;
    loc.validate_against(&tokio::fs::read_to_string(&loc.file).await?)?;

    let server = app.start_server(&loc.file).await?;
    let query = Query {
        server: &server,
        file: &loc.file,
        position: loc.position(),
        target: args.target.as_deref(),
        root: app.root(),
    };
    let result = query.run().await;
    app.stop_server(&server).await;

    match result {
        Ok(answer) => ctx.print_success(answer),
        Err(e) => ctx.print_error(&e.to_string()),
    }
    Ok(())
}

struct Query<'a> {
    server: &'a Arc<LanguageServer>,
    file: &'a Path,
    position: Position,
    target: Option<&'a str>,
    root: &'a Path,
}

impl Query<'_> {
    async fn run(&self) -> Result<Answer, LspError> {
        if self.server.profile().native_type_hierarchy {
            match self.native().await {
                Ok(answer) => return Ok(answer),
                Err(e) if e.needs_restart() => return Err(e),
                Err(e) => tracing::warn!("Native type hierarchy failed, using heuristics: {}", e),
            }
        }
        self.heuristic().await
    }

    async fn native(&self) -> Result<Answer, LspError> {
        let items = self
            .server
            .prepare_type_hierarchy(self.file, self.position)
            .await?;
        let Some(item) = items.first() else {
            return Ok(self.empty(HierarchySource::Native));
        };

        let subject = TypeOutput::from_item(&convert_type_hierarchy_item(item), self.root);
        let supertypes: Vec<TypeOutput> = self
            .server
            .supertypes(item)
            .await?
            .iter()
            .map(|i| TypeOutput::from_item(&convert_type_hierarchy_item(i), self.root))
            .collect();

        if let Some(target) = self.target {
            let wanted = last_segment(target);
            let related = supertypes
                .iter()
                .any(|s| last_segment(&SymbolInfo::strip_type_parameters(&s.name)) == wanted);
            return Ok(Answer::Relation(RelationResponse {
                source: HierarchySource::Native,
                target: target.to_string(),
                related,
                subject: Some(subject),
                evidence: None,
            }));
        }

        let subtypes = self
            .server
            .subtypes(item)
            .await?
            .iter()
            .map(|i| TypeOutput::from_item(&convert_type_hierarchy_item(i), self.root))
            .collect();

        Ok(Answer::Hierarchy(HierarchyResponse {
            source: HierarchySource::Native,
            subject: Some(subject),
            supertypes,
            subtypes,
        }))
    }

    async fn heuristic(&self) -> Result<Answer, LspError> {
        let engine = TypeHierarchyFallbackEngine::new(
            self.server.clone(),
            self.root,
            self.server.profile(),
        );
        let Some(declaration) = engine.declaration_at(self.file, self.position).await? else {
            return Ok(self.empty(HierarchySource::Heuristic));
        };
        let subject = TypeOutput::from_symbol(&declaration, self.file, self.root);

        if let Some(target) = self.target {
            let relation = engine.relation(self.file, self.position, target).await?;
            return Ok(Answer::Relation(RelationResponse {
                source: HierarchySource::Heuristic,
                target: target.to_string(),
                related: relation.is_some(),
                subject: Some(subject),
                evidence: relation
                    .as_ref()
                    .map(|r| EvidenceOutput::from_relation(r, self.root)),
            }));
        }

        let supertypes = engine
            .supertypes(self.file, self.position)
            .await?
            .iter()
            .map(|r| TypeOutput::from_relation(r, self.root))
            .collect();
        let subtypes = engine
            .subtypes(&subject.name)
            .await?
            .iter()
            .map(|t| TypeOutput::from_type_ref(t, self.root))
            .collect();

        Ok(Answer::Hierarchy(HierarchyResponse {
            source: HierarchySource::Heuristic,
            subject: Some(subject),
            supertypes,
            subtypes,
        }))
    }

    fn empty(&self, source: HierarchySource) -> Answer {
        match self.target {
            Some(target) => Answer::Relation(RelationResponse {
                source,
                target: target.to_string(),
                related: false,
                subject: None,
                evidence: None,
            }),
            None => Answer::Hierarchy(HierarchyResponse {
                source,
                subject: None,
                supertypes: Vec::new(),
                subtypes: Vec::new(),
            }),
        }
    }
}
