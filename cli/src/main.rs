use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use waterline::input::{read_document_file, LOCAL_TRACE_ID};
use waterline::{init_logging, report};
use waterline_core::{Config, CriticalPath, MemorySource, TraceQuery, Waterfall, WaterfallService};

#[derive(Parser)]
#[command(name = "waterline")]
#[command(about = "Trace waterfall reconstruction and critical path analysis", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "waterline.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the waterfall below an entry transaction
    Waterfall {
        /// JSON file with transaction, span and error documents
        #[arg(short, long)]
        input: PathBuf,
        /// Id of the entry transaction
        #[arg(short, long)]
        entry: String,
        /// Trace id (defaults to the first one found in the documents)
        #[arg(long)]
        trace_id: Option<String>,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Show where the time below an entry transaction goes
    CriticalPath {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        entry: String,
        #[arg(long)]
        trace_id: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration
    Config,
}

#[derive(Serialize)]
struct CriticalPathOutput<'a> {
    trace_id: Option<&'a str>,
    entry_transaction_id: Option<&'a str>,
    critical_path: &'a CriticalPath,
    self_time_by_item: Vec<SelfTime<'a>>,
}

#[derive(Serialize)]
struct SelfTime<'a> {
    id: &'a str,
    name: &'a str,
    self_time_micros: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config => {
            print!("{}", Config::default_toml()?);
        }
        Commands::Waterfall {
            input,
            entry,
            trace_id,
            json,
        } => {
            let config = load_config(&cli.config)?;
            let (service, waterfall) = load_waterfall(config, &input, entry, trace_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&waterfall)?);
            } else {
                let formatter = service.duration_formatter(&waterfall);
                print!("{}", report::render_waterfall(&waterfall, &formatter));
            }
        }
        Commands::CriticalPath {
            input,
            entry,
            trace_id,
            json,
        } => {
            let config = load_config(&cli.config)?;
            let (service, waterfall) = load_waterfall(config, &input, entry, trace_id).await?;
            let path = waterfall.critical_path();
            if json {
                let output = CriticalPathOutput {
                    trace_id: waterfall.trace_id.as_deref(),
                    entry_transaction_id: waterfall.entry_item().map(|item| item.id.as_str()),
                    critical_path: &path,
                    self_time_by_item: path
                        .self_time_by_item()
                        .into_iter()
                        .map(|(index, self_time_micros)| SelfTime {
                            id: &waterfall.items[index].id,
                            name: &waterfall.items[index].name,
                            self_time_micros,
                        })
                        .collect(),
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                let formatter = service.duration_formatter(&waterfall);
                print!(
                    "{}",
                    report::render_critical_path(&waterfall, &path, &formatter)
                );
            }
        }
    }

    Ok(())
}

/// Read and validate the configuration, then install logging from it
fn load_config(path: &Path) -> Result<Config> {
    let config = Config::from_file_or_default(path);
    config.validate().context("Invalid configuration")?;
    init_logging(&config.logging);
    Ok(config)
}

async fn load_waterfall(
    config: Config,
    input: &Path,
    entry: String,
    trace_id: Option<String>,
) -> Result<(WaterfallService, Waterfall)> {
    let file = read_document_file(input)?;
    if file.skipped > 0 {
        tracing::warn!("Skipped {} unclassifiable document(s)", file.skipped);
    }

    let trace_id = trace_id
        .or_else(|| file.trace_id().map(String::from))
        .unwrap_or_else(|| LOCAL_TRACE_ID.to_string());
    tracing::info!(
        "Loaded {} document(s) for trace {}",
        file.documents.len(),
        trace_id
    );

    let source = MemorySource::new();
    source.insert_documents(trace_id.clone(), file.documents);

    let service = WaterfallService::new(Arc::new(source), config)?;
    let waterfall = service
        .get_waterfall(TraceQuery::new(trace_id, entry))
        .await?;

    Ok((service, waterfall))
}
