use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use quotefinder::reader::{CorpusReader, ReaderConfig};
use quotefinder::{report, QuoteService, Request, Response, Word, WorkerEvent};

#[derive(Parser, Debug)]
#[command(name = "quotefinder")]
#[command(about = "Find long word runs shared between a source text and a query text")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report every quote from SOURCE that appears in the query text
    Find {
        /// Source corpus: plain UTF-8 text, one page per line
        source: PathBuf,

        /// Query text given on the command line
        #[arg(long, conflicts_with = "query_file")]
        query: Option<String>,

        /// Read the query text from a file (stdin when neither option is given)
        #[arg(long)]
        query_file: Option<PathBuf>,

        /// Print quote spans as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Suppress console progress bars
        #[arg(long)]
        no_progress: bool,

        /// Read buffer size in bytes
        #[arg(long, default_value_t = 8192)]
        buffer_size: usize,
    },
    /// Answer JSON-lines requests from stdin with JSON-lines events on stdout
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    // WHY: stdout carries results (and the serve protocol), so structured logs go to stderr
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let args = Args::parse();
    info!(?args, "Parsed CLI arguments");

    match args.command {
        Command::Find {
            source,
            query,
            query_file,
            json,
            no_progress,
            buffer_size,
        } => {
            let reader = CorpusReader::new(ReaderConfig { buffer_size });
            run_find(&reader, source, query, query_file, json, no_progress).await
        }
        Command::Serve => run_serve().await,
    }
}

async fn run_find(
    reader: &CorpusReader,
    source: PathBuf,
    query: Option<String>,
    query_file: Option<PathBuf>,
    json: bool,
    no_progress: bool,
) -> Result<()> {
    // WHY: validate source exists early to fail fast with clear error
    if !source.is_file() {
        anyhow::bail!("Source file does not exist: {}", source.display());
    }

    let (source_text, stats) = reader.read_text(&source).await?;
    info!(lines = stats.lines_read, bytes = stats.bytes_read, "Loaded source corpus");

    let query_text = match (query, query_file) {
        (Some(text), _) => text,
        (None, Some(path)) => reader.read_text(&path).await?.0,
        (None, None) => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read query text from stdin")?;
            text
        }
    };

    let service = QuoteService::new();

    // Tokenize requests go to the same worker, so they run one after the other
    let source_words = tokenize_with_bar(&service, source_text.clone(), "source", no_progress).await?;
    let query_words = tokenize_with_bar(&service, query_text, "query", no_progress).await?;
    info!(
        source_words = source_words.len(),
        query_words = query_words.len(),
        "Tokenization complete"
    );

    let bar = progress_bar("matching", no_progress);
    let mut quotes = service
        .find_matches(source_words, query_words)?
        .result_with_progress(|percent| bar.set_position(percent.into()))
        .await?;
    bar.finish_and_clear();

    report::sort_for_display(&mut quotes);
    info!(quotes = quotes.len(), "Matching complete");

    if json {
        println!("{}", serde_json::to_string_pretty(&quotes)?);
        return Ok(());
    }

    if quotes.is_empty() {
        println!("No quotes found");
        return Ok(());
    }

    let lines: Vec<&str> = source_text.split('\n').collect();
    println!("Page\tQuote");
    for quote in &quotes {
        println!("{}", report::format_quote_line(&lines, quote));
    }

    Ok(())
}

async fn tokenize_with_bar(
    service: &QuoteService,
    text: String,
    label: &'static str,
    no_progress: bool,
) -> Result<Vec<Word>> {
    let bar = progress_bar(label, no_progress);
    let mut events = service.tokenize(text)?.into_stream();

    while let Some(event) = events.next().await {
        match event {
            WorkerEvent::Progress { percent } => bar.set_position(percent.into()),
            WorkerEvent::Result { value } => {
                bar.finish_and_clear();
                return Ok(value);
            }
            WorkerEvent::Error { message } => {
                bar.abandon();
                anyhow::bail!("Tokenizing {label} failed: {message}");
            }
        }
    }

    anyhow::bail!("Tokenizing {label} ended without a result")
}

fn progress_bar(label: &'static str, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("{msg:>10} [{bar:40}] {pos:>3}%") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(label);
    bar
}

async fn run_serve() -> Result<()> {
    let service = QuoteService::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    info!("Serving JSON-lines requests on stdin");

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request: Request = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejecting malformed request: {}", e);
                let event = WorkerEvent::<Response>::Error {
                    message: format!("invalid request: {e}"),
                };
                write_event(&mut stdout, &event).await?;
                continue;
            }
        };

        info!(kind = %request.kind(), "Received request");
        let mut pending = match service.submit(request) {
            Ok(pending) => pending,
            Err(e) => {
                let event = WorkerEvent::<Response>::Error { message: e.to_string() };
                write_event(&mut stdout, &event).await?;
                continue;
            }
        };

        while let Some(event) = pending.next_event().await {
            write_event(&mut stdout, &event).await?;
        }
    }

    info!("Input closed, shutting down");
    Ok(())
}

async fn write_event(stdout: &mut tokio::io::Stdout, event: &WorkerEvent<Response>) -> Result<()> {
    let mut line = serde_json::to_string(event)?;
    line.push('\n');
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
