//! embedref CLI — resolve DOIs and arXiv ids, embed bibliographic metadata.

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use embedref_core::batch::load_records;
use embedref_core::bib;
use embedref_core::enrich::DoiRegistryClient;
use embedref_core::identifiers::Doi;
use embedref_core::{BatchRunner, DocumentOutcome, EmbedRefConfig};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "embedref",
    about = "Resolve bibliographic identifiers and embed metadata into documents",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and enrich every document in a batch-description file.
    Run {
        /// Path to an exiftool `-j` JSON array of per-document records.
        batch_file: PathBuf,

        /// Allow console disambiguation of ambiguous search results.
        /// Without this flag ambiguous candidates are always declined.
        #[arg(long)]
        interactive: bool,

        /// Mail address for the Crossref polite pool.
        #[arg(long)]
        email: Option<String>,
    },

    /// Fetch BibTeX entries for DOIs read from stdin, one per line.
    Bibtex {
        /// Mail address for the Crossref polite pool.
        #[arg(long)]
        email: Option<String>,
    },

    /// Format already-enriched records from a batch file as BibTeX entries.
    Bib {
        /// Path to an exiftool `-j` JSON array of per-document records.
        batch_file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "embedref=debug" } else { "embedref=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            batch_file,
            interactive,
            email,
        } => run_batch(batch_file, interactive, email).await,
        Commands::Bibtex { email } => fetch_bibtex(email).await,
        Commands::Bib { batch_file } => format_bib(batch_file),
    }
}

async fn run_batch(batch_file: PathBuf, interactive: bool, email: Option<String>) -> Result<()> {
    let config = EmbedRefConfig {
        interactive,
        polite_pool_email: email,
        ..Default::default()
    };

    let records = load_records(&batch_file)
        .with_context(|| format!("failed to load batch file {}", batch_file.display()))?;
    let runner = BatchRunner::from_config(&config);
    let report = runner.run(&records).await;

    for (path, outcome) in &report.outcomes {
        match outcome {
            DocumentOutcome::Enriched { identifier, fields } => {
                println!("{path}: {identifier} ({})", fields.join(", "));
            }
            DocumentOutcome::Unresolved(reason) => {
                println!("{path}: unresolved ({reason})");
            }
            DocumentOutcome::Failed(message) => {
                println!("{path}: failed ({message})");
            }
        }
    }
    println!(
        "{} enriched, {} unresolved, {} failed",
        report.enriched(),
        report.unresolved(),
        report.failed()
    );

    if report.interrupted {
        eprintln!("interrupted, batch aborted");
        std::process::exit(130);
    }
    Ok(())
}

async fn fetch_bibtex(email: Option<String>) -> Result<()> {
    let config = EmbedRefConfig {
        polite_pool_email: email,
        ..Default::default()
    };
    let client = DoiRegistryClient::new(&config.user_agent());

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let doi = match Doi::parse(line) {
            Ok(doi) => doi,
            Err(err) => {
                eprintln!("{line}: {err}");
                continue;
            }
        };
        match client.fetch_bibtex(&doi).await {
            Ok(entry) => println!("{}", entry.trim_end()),
            Err(err) => eprintln!("{line}: {err}"),
        }
    }
    Ok(())
}

fn format_bib(batch_file: PathBuf) -> Result<()> {
    let text = std::fs::read_to_string(&batch_file)
        .with_context(|| format!("failed to read {}", batch_file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", batch_file.display()))?;

    for entry in bib::entries(&value)
        .with_context(|| format!("bad batch file {}", batch_file.display()))?
    {
        match entry {
            Ok(entry) => print!("{entry}"),
            Err(err) => eprintln!("{err}"),
        }
    }
    Ok(())
}
