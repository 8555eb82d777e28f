//! sevi-ontology: command-line access to the concept service.
//!
//! Read commands print JSON to stdout. Maintenance commands run to
//! completion and print the run summary.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sevi_ontology::{
    ConceptType, MaintenanceOp, MaintenanceResult, OntologyConfig, OntologyService,
};

#[derive(Parser)]
#[command(name = "sevi-ontology")]
#[command(author, version, about = "Concept vocabularies backed by Fuseki")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported concept types
    Types,

    /// Show a concept by uri
    Concept {
        #[arg(short, long)]
        uri: String,
    },

    /// Show the first concept with an exact preferred label
    Label {
        #[arg(short, long)]
        label: String,
    },

    /// List broader concepts, nearest first
    Broader {
        #[arg(short, long)]
        uri: String,
    },

    /// List direct narrower concepts
    Narrower {
        #[arg(short, long)]
        uri: String,
    },

    /// List concepts of a type (ALL lists every scheme)
    Concepts {
        /// Concept type, e.g. JUPO
        concept_type: String,
    },

    /// List top-level concepts of a type
    Toplevel {
        concept_type: String,
    },

    /// Print the classification view trees
    Views,

    /// Reload every source document into the triple store
    Fetch,

    /// Clear the triple store
    Delete,

    /// Fetch, then index everything
    Import,

    /// Index concepts, top-level concepts and views
    Index {
        #[arg(long)]
        no_all: bool,

        #[arg(long)]
        no_top_levels: bool,

        #[arg(long)]
        no_views: bool,
    },

    /// Index every concept of one vocabulary
    IndexType {
        concept_type: String,
    },

    /// Index classification top-level concepts
    IndexToplevels,

    /// Index classification views
    IndexViews,

    /// Send a search index mapping document
    Mappings {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _file_guard = init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, daily rotation)
///   RUST_LOG    - standard env filter (default: "sevi=info")
///
/// Console output goes to stderr so stdout carries only JSON results.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sevi_core=info,sevi_sparql=info,sevi_jobs=info,sevi_ontology=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let path = std::path::Path::new(path);
        let file_dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("sevi-ontology.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(non_blocking),
                )
                .init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stderr)"),
        "Logging initialized"
    );
    guard
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_type(name: &str) -> anyhow::Result<ConceptType> {
    name.parse::<ConceptType>()
        .with_context(|| format!("expected one of {:?}", ConceptType::all()))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let service = OntologyService::from_config(OntologyConfig::from_env())?;

    match cli.command {
        Commands::Types => print_json(service.concept_types())?,
        Commands::Concept { uri } => print_json(&service.get_concept(&uri).await?)?,
        Commands::Label { label } => print_json(&service.get_concept_by_label(&label).await?)?,
        Commands::Broader { uri } => print_json(&*service.find_broader(&uri).await?)?,
        Commands::Narrower { uri } => print_json(&*service.find_narrower(&uri).await?)?,
        Commands::Concepts { concept_type } => {
            let concepts = match parse_type(&concept_type)? {
                ConceptType::All => service.find_concepts().await?,
                concept_type => service.find_concepts_by_type(concept_type).await?,
            };
            print_json(&*concepts)?
        }
        Commands::Toplevel { concept_type } => {
            let concept_type = parse_type(&concept_type)?;
            print_json(&*service.find_top_level_concepts_by_type(concept_type).await?)?
        }
        Commands::Views => print_json(&*service.find_views().await?)?,
        Commands::Fetch => maintain(&service, MaintenanceOp::Fetch).await?,
        Commands::Delete => maintain(&service, MaintenanceOp::Delete).await?,
        Commands::Import => maintain(&service, MaintenanceOp::FetchAndIndex).await?,
        Commands::Index {
            no_all,
            no_top_levels,
            no_views,
        } => {
            let op = MaintenanceOp::Index {
                all: !no_all,
                top_levels: !no_top_levels,
                views: !no_views,
            };
            maintain(&service, op).await?
        }
        Commands::IndexType { concept_type } => {
            let concept_type = parse_type(&concept_type)?;
            if concept_type == ConceptType::All {
                bail!("ALL cannot be indexed per type");
            }
            maintain(&service, MaintenanceOp::IndexType { concept_type }).await?
        }
        Commands::IndexToplevels => maintain(&service, MaintenanceOp::IndexTopLevels).await?,
        Commands::IndexViews => maintain(&service, MaintenanceOp::IndexViews).await?,
        Commands::Mappings { file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let mappings: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", file.display()))?;
            service.put_mappings(mappings).await?;
        }
    }
    Ok(())
}

/// Run a maintenance operation to completion.
async fn maintain(service: &OntologyService, op: MaintenanceOp) -> anyhow::Result<()> {
    let ticket = service.submit(op)?;
    info!(run_id = %ticket.run_id(), op = op.name(), "Waiting for maintenance run");
    match ticket.wait().await {
        MaintenanceResult::Success(summary) => print_json(&summary),
        MaintenanceResult::Failed(error) => bail!("{} failed: {}", op, error),
    }
}
