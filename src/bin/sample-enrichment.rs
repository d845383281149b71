//! Sample enrichment CLI: run the interception pipeline over JSON records.
//!
//! Usage:
//!   sample-enrichment enrich --input records.json [--config path]
//!   sample-enrichment derive --input payloads.json
//!   sample-enrichment read --input records.json [--column ID ...]
//!   sample-enrichment config

use clap::{Parser, Subcommand};
use sample_enrichment::{
    Clock, Column, DomainStatus, EnrichmentOrchestrator, EnrichmentReport, InMemoryStore, Query,
    Record, SampleService, SelectQuery, ServiceConfig, SystemClock,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "sample-enrichment",
    version,
    about = "Cross-service enrichment for Sample records"
)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich a JSON array of records against the configured domain services
    Enrich {
        /// File holding a JSON array of records
        #[arg(long)]
        input: PathBuf,
    },
    /// Apply the create-time derivation rules to a JSON array of payloads
    Derive {
        #[arg(long)]
        input: PathBuf,
    },
    /// Load records into an in-memory store and run the full read path
    Read {
        #[arg(long)]
        input: PathBuf,
        /// Columns the caller requests (the required ones are always added)
        #[arg(long = "column")]
        columns: Vec<String>,
    },
    /// Print the effective configuration
    Config,
}

fn load_records(path: &Path) -> Result<Vec<Record>, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&raw).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

fn print_records(records: &[Record]) -> i32 {
    match serde_json::to_string_pretty(records) {
        Ok(out) => {
            println!("{}", out);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn print_report(report: &EnrichmentReport) {
    for outcome in &report.outcomes {
        match &outcome.status {
            DomainStatus::Skipped => eprintln!("{:<10} skipped", outcome.domain),
            DomainStatus::Enriched { requested, applied } => {
                eprintln!("{:<10} {}/{} enriched", outcome.domain, applied, requested)
            }
            DomainStatus::Failed { reason } => {
                eprintln!("{:<10} failed: {}", outcome.domain, reason)
            }
        }
    }
}

async fn cmd_enrich(config: &ServiceConfig, input: &Path) -> i32 {
    let mut records = match load_records(input) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let orchestrator = match EnrichmentOrchestrator::from_config(config) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if orchestrator.domain_names().is_empty() {
        eprintln!("Warning: no domain endpoints configured; records are returned as-is");
    }

    let report = orchestrator.enrich(&mut records).await;
    print_report(&report);
    print_records(&records)
}

fn cmd_derive(config: &ServiceConfig, input: &Path) -> i32 {
    let payloads = match load_records(input) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let today = SystemClock.today();

    let mut derived = Vec::with_capacity(payloads.len());
    let mut rejected = 0;
    for (index, mut payload) in payloads.into_iter().enumerate() {
        match config.derivation.apply(&mut payload, today) {
            Ok(()) => derived.push(payload),
            Err(e) => {
                eprintln!("payload {} rejected (400): {}", index, e);
                rejected += 1;
            }
        }
    }

    let code = print_records(&derived);
    if rejected > 0 {
        1
    } else {
        code
    }
}

async fn cmd_read(config: &ServiceConfig, input: &Path, columns: Vec<String>) -> i32 {
    let records = match load_records(input) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let store = match InMemoryStore::with_records(records) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let service = match SampleService::from_config(config, store) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let mut select = SelectQuery::new();
    if !columns.is_empty() {
        select = select.with_columns(columns.into_iter().map(Column::field).collect());
    }
    match service.read(Query::select(select)).await {
        Ok(records) => print_records(&records),
        Err(e) => {
            eprintln!("Error ({}): {}", e.status_code(), e);
            1
        }
    }
}

fn cmd_config(config: &ServiceConfig) -> i32 {
    match config.to_yaml() {
        Ok(yaml) => {
            print!("{}", yaml);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = sample_enrichment::telemetry::init(cli.json_logs) {
        eprintln!("{}", e);
    }

    let config = match ServiceConfig::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Enrich { input } => rt.block_on(cmd_enrich(&config, &input)),
        Commands::Derive { input } => cmd_derive(&config, &input),
        Commands::Read { input, columns } => rt.block_on(cmd_read(&config, &input, columns)),
        Commands::Config => cmd_config(&config),
    };
    std::process::exit(code);
}
