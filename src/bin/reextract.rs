//! Operational command: re-run PDF text extraction for every stored document.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pdf_chat::{extraction::PdfExtractor, logging, reextract, store::Store};

#[derive(Parser)]
#[command(
    name = "reextract",
    about = "Re-extract text from stored PDF documents"
)]
struct Cli {
    /// SQLite database to update (defaults to `DATABASE_PATH` or `pdf-chat.db`).
    #[arg(long)]
    database: Option<PathBuf>,
    /// Report what would change without writing extracted text back.
    #[arg(long)]
    dry_run: bool,
    /// Print the report as JSON instead of one line per document.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_cli_tracing();
    let cli = Cli::parse();

    let database = cli
        .database
        .or_else(|| std::env::var_os("DATABASE_PATH").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("pdf-chat.db"));
    let store = Store::open(&database)
        .with_context(|| format!("failed to open database at {}", database.display()))?;

    let extractor = Arc::new(PdfExtractor::default());
    let report = reextract::reextract_all(&store, &extractor, cli.dry_run)
        .await
        .context("re-extraction aborted")?;

    if cli.json {
        let rendered =
            serde_json::to_string_pretty(&report).context("failed to serialize report")?;
        println!("{rendered}");
    } else {
        for entry in &report.entries {
            println!("Processing: {}", entry.title);
            println!("{entry}");
        }
        println!(
            "{} updated, {} skipped, {} failed{}",
            report.updated(),
            report.skipped(),
            report.failed(),
            if cli.dry_run { " (dry run)" } else { "" }
        );
    }

    Ok(())
}
