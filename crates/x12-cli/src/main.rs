//! # x12-cli
//!
//! Command-line interface for projecting X12-style transaction documents
//! into JSON with declarative mapping schemas.
//!
//! Exit codes: `0` success, `1` I/O or unexpected failure, `2` structural
//! error in the document, `3` invalid configuration or schema.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use x12_schema::SchemaLoader;
use x12_transaction::{Transaction, TransactionConfig};

const EXIT_FAILURE: u8 = 1;
const EXIT_STRUCTURAL: u8 = 2;
const EXIT_CONFIG: u8 = 3;

#[derive(Parser)]
#[command(name = "x12map")]
#[command(about = "Project flat X12-style documents into JSON")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log ingest, extraction and mapping detail to stderr
    #[arg(short, long, global = true)]
    debug: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map a document through a schema file and print the JSON result
    Map {
        /// Input document path
        input: PathBuf,

        /// Mapping schema file (YAML or JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List segment identifiers in source order
    Segments {
        /// Input document path
        input: PathBuf,
    },

    /// Print the transaction-set type from the ST segment
    Type {
        /// Input document path
        input: PathBuf,
    },

    /// Dump segments and loops as JSON
    Inspect {
        /// Input document path
        input: PathBuf,

        /// Infer a loop from repeating segments before dumping
        #[arg(long)]
        infer: bool,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

/// Failure classes mapped to distinct exit codes
enum Failure {
    Structural(anyhow::Error),
    Config(anyhow::Error),
    Other(anyhow::Error),
}

impl Failure {
    fn report(self) -> ExitCode {
        let (code, error) = match self {
            Failure::Structural(e) => (EXIT_STRUCTURAL, e),
            Failure::Config(e) => (EXIT_CONFIG, e),
            Failure::Other(e) => (EXIT_FAILURE, e),
        };
        eprintln!("ERROR: {error:#}");
        ExitCode::from(code)
    }
}

impl From<anyhow::Error> for Failure {
    fn from(error: anyhow::Error) -> Self {
        Failure::Other(error)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref(), cli.debug) {
        Ok(config) => config,
        Err(error) => return Failure::Config(error).report(),
    };
    init_logging(config.debug);

    match run(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => failure.report(),
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, debug: bool) -> anyhow::Result<TransactionConfig> {
    let mut config = match path {
        Some(path) => TransactionConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TransactionConfig::default(),
    };
    config.debug |= debug;
    Ok(config)
}

fn read_transaction(input: &Path, config: TransactionConfig) -> anyhow::Result<Transaction> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    tracing::info!("Ingesting {}", input.display());
    Ok(Transaction::with_config(&text, config))
}

fn print_json(value: &serde_json::Value, pretty: bool) -> anyhow::Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}

fn run(command: Commands, config: TransactionConfig) -> Result<(), Failure> {
    match command {
        Commands::Map {
            input,
            schema,
            pretty,
        } => {
            let schema = SchemaLoader::load_file(&schema)
                .with_context(|| format!("failed to load schema {}", schema.display()))
                .map_err(Failure::Config)?;
            let mut transaction = read_transaction(&input, config)?;
            let output = transaction
                .apply(&schema)
                .context("failed to apply schema")
                .map_err(Failure::Config)?;
            print_json(&output, pretty)?;
        }
        Commands::Segments { input } => {
            let transaction = read_transaction(&input, config)?;
            for name in transaction.segment_names() {
                println!("{name}");
            }
        }
        Commands::Type { input } => {
            let transaction = read_transaction(&input, config)?;
            let transaction_type = transaction
                .transaction_type()
                .with_context(|| {
                    format!("cannot determine transaction type of {}", input.display())
                })
                .map_err(Failure::Structural)?;
            println!("{transaction_type}");
        }
        Commands::Inspect {
            input,
            infer,
            pretty,
        } => {
            let mut transaction = read_transaction(&input, config)?;
            if infer {
                transaction
                    .infer_loops()
                    .context("failed to infer loops")
                    .map_err(Failure::Config)?;
            }
            print_json(&transaction.to_json(), pretty)?;
        }
    }

    Ok(())
}
