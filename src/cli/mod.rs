//! CLI module for polylsp
//!
//! A thin demo driver over the library: each command starts one backend,
//! runs a query and shuts the server down again.

pub mod commands;
pub mod location;
pub mod output;
pub mod response;

pub use location::ParsedLocation;
pub use output::OutputContext;

use clap::{Parser, Subcommand};

use commands::{
    doctor::DoctorArgs, hierarchy::HierarchyArgs, refs::RefsArgs, symbols::SymbolsArgs,
};

const LONG_ABOUT: &str = r#"
polylsp - drive language servers from the command line

One client core for clangd, gopls, rust-analyzer, jedi-language-server,
Metals and LanguageServer.jl. Output is JSON; positions are 1-indexed.

EXAMPLES:
  polylsp symbols src/shapes.cpp --enrich
  polylsp refs src/main.rs:10:5
  polylsp hierarchy src/model.go:12:6 --target Base
  polylsp doctor

Set RUST_LOG=polylsp=debug for protocol-level logging.
"#;

#[derive(Parser, Debug)]
#[command(name = "polylsp")]
#[command(author, version, about, long_about = LONG_ABOUT)]
#[command(propagate_version = true)]
#[command(after_help = "Use 'polylsp <COMMAND> --help' for more information about a command.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true, env = "POLYLSP_ROOT")]
    pub root: Option<std::path::PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the symbols of a file
    Symbols(SymbolsArgs),

    /// Find references to the symbol at a position
    Refs(RefsArgs),

    /// Supertypes and subtypes of the type at a position
    Hierarchy(HierarchyArgs),

    /// Check which language servers can be launched
    Doctor(DoctorArgs),
}
