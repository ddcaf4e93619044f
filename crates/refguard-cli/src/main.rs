//! refguard command-line front end
//!
//! - `graph`: print the reference graph
//! - `audit`: compare the graph with the id-bearing fields of entity schemas
//! - `check`: validate a delete or identity change against a data snapshot
//!
//! `check` exits 0 when the mutation is safe, 1 when references block it and
//! 2 when validation could not complete.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use refguard_core::{
    ConflictResponse, ErrorResponse, IntegrityConfig, MemoryStore, ReferentialIntegrityViolation,
    Snapshot, ValidationOrchestrator,
};
use refguard_graph::{catalog, DeclaredReference, EntityId, ReferenceRegistry};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const EXIT_OK: u8 = 0;
const EXIT_BLOCKED: u8 = 1;
const EXIT_FAILURE: u8 = 2;

fn registry_arg() -> Arg {
    Arg::new("registry")
        .long("registry")
        .value_parser(value_parser!(PathBuf))
        .help("Reference graph declaration (TOML); defaults to the built-in catalog")
}

fn build_cli() -> Command {
    Command::new("refguard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Referential integrity checks for document-store entity catalogs")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("graph")
                .about("Print the reference graph")
                .arg(registry_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("audit")
                .about("Report id-bearing fields the graph does not cover")
                .arg(
                    Arg::new("schema")
                        .long("schema")
                        .value_parser(value_parser!(PathBuf))
                        .help("Declared reference fields (JSON list); defaults to the catalog schemas"),
                )
                .arg(registry_arg()),
        )
        .subcommand(
            Command::new("check")
                .about("Validate deleting (or re-identifying) one entity")
                .arg(
                    Arg::new("parent-type")
                        .long("parent-type")
                        .required(true)
                        .help("Entity type of the document, e.g. ProtocolEntity"),
                )
                .arg(
                    Arg::new("id")
                        .long("id")
                        .required(true)
                        .value_parser(value_parser!(EntityId))
                        .help("Current id of the document"),
                )
                .arg(
                    Arg::new("new-id")
                        .long("new-id")
                        .value_parser(value_parser!(EntityId))
                        .help("Check an identity change to this id instead of a delete"),
                )
                .arg(
                    Arg::new("data")
                        .long("data")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Store snapshot (JSON)"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Integrity configuration (TOML)"),
                )
                .arg(registry_arg()),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    // A second initialisation (tests) keeps the first subscriber.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn load_registry(path: Option<&PathBuf>) -> Result<ReferenceRegistry> {
    match path {
        Some(path) => ReferenceRegistry::from_path(path)
            .with_context(|| format!("loading registry {}", path.display())),
        None => Ok(catalog::registry().clone()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn graph(args: &ArgMatches) -> Result<u8> {
    let registry = load_registry(args.get_one("registry"))?;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&registry.to_declaration())?);
        return Ok(EXIT_OK);
    }

    for parent in registry.parents() {
        let dependents = registry.dependents_of(parent.as_str())?;
        if dependents.is_empty() {
            println!("{parent} (leaf)");
            continue;
        }
        println!("{parent}");
        for spec in dependents {
            println!(
                "  <- {} ({}.{}, {})",
                spec.dependent_type, spec.collection, spec.foreign_key_field, spec.cardinality
            );
        }
    }
    Ok(EXIT_OK)
}

fn audit(args: &ArgMatches) -> Result<u8> {
    let registry = load_registry(args.get_one("registry"))?;
    let declared: Vec<DeclaredReference> = match args.get_one::<PathBuf>("schema") {
        Some(path) => read_json(path)?,
        None => catalog::declared_references(),
    };

    let gaps = registry.audit(&declared);
    if gaps.is_empty() {
        println!("ok: {} reference fields covered", declared.len());
        return Ok(EXIT_OK);
    }
    for gap in &gaps {
        println!("{gap}");
    }
    tracing::warn!(gaps = gaps.len(), "reference graph does not cover the schemas");
    Ok(EXIT_BLOCKED)
}

async fn check(args: &ArgMatches) -> Result<u8> {
    let registry = load_registry(args.get_one("registry"))?;
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => IntegrityConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => IntegrityConfig::new(),
    };
    let data: &PathBuf = args.get_one("data").context("--data is required")?;
    let snapshot: Snapshot = read_json(data)?;
    let store = MemoryStore::from_snapshot(snapshot)
        .with_context(|| format!("loading snapshot {}", data.display()))?;

    let parent_type: &String = args.get_one("parent-type").context("--parent-type is required")?;
    let id = *args.get_one::<EntityId>("id").context("--id is required")?;
    let orchestrator = ValidationOrchestrator::new(Arc::new(registry), store, config)
        .context("invalid integrity configuration")?;

    let unindexed = orchestrator.verify_indexes().await?;
    tracing::debug!(unindexed = unindexed.len(), "index check complete");

    let outcome = match args.get_one::<EntityId>("new-id") {
        Some(new_id) => orchestrator.validate_update(parent_type, id, *new_id).await,
        None => orchestrator.validate_deletion(parent_type, id).await,
    };

    match outcome {
        Ok(result) => match ReferentialIntegrityViolation::from_result(result) {
            None => {
                println!("valid");
                Ok(EXIT_OK)
            }
            Some(violation) => {
                let body = ConflictResponse::from(&violation);
                println!("{}", serde_json::to_string_pretty(&body)?);
                Ok(EXIT_BLOCKED)
            }
        },
        Err(e) => {
            tracing::error!(error = %e, status = e.status_code(), "validation failed");
            let body = ErrorResponse { message: e.to_string() };
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(EXIT_FAILURE)
        }
    }
}

async fn run(matches: &ArgMatches) -> Result<u8> {
    match matches.subcommand() {
        Some(("graph", args)) => graph(args),
        Some(("audit", args)) => audit(args),
        Some(("check", args)) => check(args).await,
        _ => Ok(EXIT_FAILURE),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = build_cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match run(&matches).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
