//! Command-line entry point for the listing views store.
//!
//! # Responsibility
//! - Load listing documents from JSON files into the document store.
//! - Print view query results as JSON on stdout.

use clap::{Parser, Subcommand};
use homeview_core::db::open_db;
use homeview_core::{
    init_logging_from_config, quickview_path, CoreConfig, Document, PutOutcome,
    SqliteDocumentRepository, ViewQuery, ViewService,
};
use log::info;
use serde_json::Value;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "homeview", version, about = "Listing document views")]
struct Cli {
    #[arg(long, global = true, help = "JSON config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Document store path (overrides config)")]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Checks core linkage.
    Ping,
    /// Stores documents from a JSON file (one object or an array of objects).
    Load { file: PathBuf },
    /// Lists registered views.
    Views,
    /// Queries the quickview index.
    Quickview {
        #[arg(long, help = "Exact document id")]
        key: Option<String>,
        #[arg(long)]
        start_key: Option<String>,
        #[arg(long)]
        end_key: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = false)]
        descending: bool,
        #[arg(long, default_value_t = false)]
        include_docs: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let command = match cli.command {
        Commands::Ping => {
            println!("homeview_core ping={}", homeview_core::ping());
            println!("homeview_core version={}", homeview_core::core_version());
            return Ok(());
        }
        command => command,
    };

    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    init_logging_from_config(&config)?;

    let conn = open_db(&config.db_path)?;
    let mut service = ViewService::new(SqliteDocumentRepository::new(&conn))?;

    match command {
        Commands::Ping => {}
        Commands::Load { file } => {
            let text = std::fs::read_to_string(&file)?;
            let docs = parse_documents(serde_json::from_str(&text)?)?;
            let mut written = 0usize;
            for doc in &docs {
                if let PutOutcome::Created { .. } | PutOutcome::Updated { .. } =
                    service.put_document(doc)?
                {
                    written += 1;
                }
            }
            info!(
                "event=cli_load module=cli status=ok docs={} written={}",
                docs.len(),
                written
            );
            println!("loaded {} documents, {} written", docs.len(), written);
        }
        Commands::Views => {
            for name in service.view_names() {
                println!("{name}");
            }
        }
        Commands::Quickview {
            key,
            start_key,
            end_key,
            limit,
            skip,
            descending,
            include_docs,
        } => {
            let query = ViewQuery {
                key: key.map(Value::String),
                start_key: start_key.map(Value::String),
                end_key: end_key.map(Value::String),
                limit,
                skip,
                descending,
                include_docs,
                ..ViewQuery::default()
            };
            let result = service.query(&quickview_path(), &query)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn parse_documents(value: Value) -> Result<Vec<Document>, Box<dyn Error>> {
    let values = match value {
        Value::Array(values) => values,
        other => vec![other],
    };
    let docs = values
        .into_iter()
        .map(Document::from_value)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(docs)
}
