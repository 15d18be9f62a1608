//! `vpms-lookup` administration CLI

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vpms_lookup::{unmapped_archetypes, EngineConfig, LookupUsageFinder, MergeOrDrop};
use vpms_store::{Statement, StorageRegistry};

fn cli() -> Command {
    Command::new("vpms-lookup")
        .version(vpms_lookup::VERSION)
        .about("Lookup usage discovery and replacement tooling")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Engine configuration file (TOML)"),
        )
        .arg(
            Arg::new("schema")
                .long("schema")
                .global(true)
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .help("Archetype descriptor file or directory; may be repeated"),
        )
        .arg(
            Arg::new("storage")
                .long("storage")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Storage configuration file (TOML); built-in mappings when omitted"),
        )
        .subcommand(
            Command::new("references")
                .about("List the nodes that may hold codes of a lookup archetype")
                .arg(
                    Arg::new("short-name")
                        .required(true)
                        .help("Lookup archetype short name, wildcards allowed"),
                ),
        )
        .subcommand(Command::new("mappings").about("Print storage mappings and their statements"))
        .subcommand(
            Command::new("check").about("Verify every lookup-bearing archetype has a storage mapping"),
        )
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(&cli().get_matches()) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(matches: &ArgMatches) -> Result<ExitCode> {
    let config = engine_config(matches)?;

    match matches.subcommand() {
        Some(("references", args)) => {
            let short_name = args
                .get_one::<String>("short-name")
                .context("missing short name")?;
            references(&config, short_name)
        }
        Some(("mappings", _)) => mappings(&config),
        Some(("check", _)) => check(&config),
        _ => Ok(ExitCode::SUCCESS),
    }
}

fn engine_config(matches: &ArgMatches) -> Result<EngineConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::new(),
    };
    if let Some(schema) = matches.get_many::<PathBuf>("schema") {
        config.schema.extend(schema.cloned());
    }
    if let Some(storage) = matches.get_one::<PathBuf>("storage") {
        config.storage = Some(storage.clone());
    }
    Ok(config)
}

fn references(config: &EngineConfig, short_name: &str) -> Result<ExitCode> {
    let registry = Arc::new(config.archetype_registry().context("loading schema")?);
    let storage = config.storage_registry().context("loading storage configuration")?;
    let finder = LookupUsageFinder::with_capacity(registry, config.cache_capacity);

    let references = finder.get_code_references(short_name)?;
    println!("{} reference(s) to {short_name}", references.len());
    for reference in references.iter() {
        let shape = if reference.node().is_details() { "details" } else { "column" };
        let table = storage
            .resolve(&reference.archetype().kind)
            .map_or_else(|_| "(unmapped)".to_string(), |m| m.table.clone());
        println!(
            "  {:<32} {:<20} {:<24} {:<8} {}",
            reference.short_name(),
            reference.node().name,
            reference.path(),
            shape,
            table
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn mappings(config: &EngineConfig) -> Result<ExitCode> {
    let storage = config.storage_registry().context("loading storage configuration")?;

    println!("Mappings");
    for mapping in storage.mappings() {
        println!(
            "  {:<20} {:<24} {:<32} {}",
            mapping.kind, mapping.table, mapping.details, mapping.join_column
        );
        let update = Statement::DetailsUpdate {
            mapping: (**mapping).clone(),
            archetype: String::new(),
            name: String::new(),
            old_code: String::new(),
            new_code: String::new(),
        };
        println!("    {}", update.sql());
    }

    println!("Kind parents");
    for (kind, parent) in storage.parents() {
        println!("  {kind} -> {parent}");
    }

    println!("Classification tables");
    for table in storage.classifications() {
        println!("  {:<20} {:<32} {}", table.kind, table.table, table.owner_column);
        let pair = MergeOrDrop::new(table, 0, 0);
        println!("    {}", pair.merge.sql());
        println!("    {}", pair.drop.sql());
    }
    Ok(ExitCode::SUCCESS)
}

fn check(config: &EngineConfig) -> Result<ExitCode> {
    let registry = config.archetype_registry().context("loading schema")?;
    let storage: StorageRegistry = config.storage_registry().context("loading storage configuration")?;

    let errors = unmapped_archetypes(&registry, &storage);
    if errors.is_empty() {
        println!("ok: every lookup-bearing archetype has a storage mapping");
        return Ok(ExitCode::SUCCESS);
    }
    for error in &errors {
        println!("unmapped: {error}");
    }
    Ok(ExitCode::FAILURE)
}
