//! Typeschema CLI
//!
//! Compiles JSON type declarations into an OpenAPI `components` document.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use typeschema::{
    load_universe, CompilationContext, CompilerConfig, DeclKind, ResolveRequest, TypeRef, TypeUniverse,
};

#[derive(Parser)]
#[command(name = "typeschema")]
#[command(about = "Compile declared types into OpenAPI component schemas")]
struct Cli {
    /// Declaration files or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Type to compile (repeatable; defaults to every declared record, interface and enum)
    #[arg(short, long = "root")]
    roots: Vec<String>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Active view (qualified name)
    #[arg(long)]
    view: Option<String>,

    /// Target media type (repeatable)
    #[arg(long = "media-type")]
    media_types: Vec<String>,

    /// Print compact JSON
    #[arg(long)]
    compact: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CompilerConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    let universe = load_universe(&cli.inputs)?;

    let roots = if cli.roots.is_empty() {
        default_roots(&universe)
    } else {
        cli.roots.clone()
    };

    let mut context = CompilationContext::new(&universe, config);
    for root in &roots {
        let ty = TypeRef::parse(root)?;
        let request = ResolveRequest {
            media_types: &cli.media_types,
            view: cli.view.as_deref(),
            ..ResolveRequest::new(&ty)
        };
        if context.resolve(&request)?.is_none() {
            tracing::warn!(root = %root, "root has no schema");
        }
    }
    let output = context.finish();

    let document = output.registry.to_components()?;
    let rendered = if cli.compact {
        serde_json::to_string(&document)?
    } else {
        serde_json::to_string_pretty(&document)?
    };
    println!("{}", rendered);

    if !output.diagnostics.is_empty() {
        eprintln!("{}", output.diagnostics.format_all());
    }
    eprintln!(
        "✅ Compiled {} roots into {} schemas ({} diagnostics)",
        roots.len(),
        output.registry.len(),
        output.diagnostics.len()
    );
    Ok(())
}

/// Every record, interface and enum, sorted by name for stable naming
fn default_roots(universe: &TypeUniverse) -> Vec<String> {
    let mut roots: Vec<String> = universe
        .declarations()
        .filter(|decl| matches!(decl.kind, DeclKind::Record | DeclKind::Interface | DeclKind::Enum))
        .filter(|decl| decl.type_params.is_empty())
        .map(|decl| decl.name.clone())
        .collect();
    roots.sort();
    roots
}
