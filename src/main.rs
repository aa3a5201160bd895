//! # askdesk CLI (`ask`)
//!
//! The `ask` binary drives the knowledge-assistant client from the
//! terminal: submit questions, review and clear history, upload documents,
//! inspect analytics, and delete indexed sources or recorded queries.
//!
//! ## Usage
//!
//! ```bash
//! ask --config ./config/askdesk.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ask query "<text>"` | Submit a question and print the answer with citations |
//! | `ask history` | Print the persisted query/answer history |
//! | `ask upload <files...>` | Upload documents, one request per file |
//! | `ask docs` | List indexed documents |
//! | `ask stats` | Show the analytics snapshot |
//! | `ask recent` | Show the most recent recorded queries |
//! | `ask delete source <name>` | Delete every chunk for a source (confirmed) |
//! | `ask delete gap <id>` | Delete a low-confidence query record (confirmed) |

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use askdesk::analytics::AnalyticsSnapshotLoader;
use askdesk::client::{HttpRemoteService, RemoteService};
use askdesk::config::{self, Config};
use askdesk::confirm::CommitError;
use askdesk::history::HistoryStore;
use askdesk::models::{FeedbackState, UploadCandidate};
use askdesk::session::{QuerySessionController, SessionState};
use askdesk::upload::UploadBatchOrchestrator;

/// askdesk CLI — client for a retrieval-backed knowledge assistant.
#[derive(Parser)]
#[command(
    name = "ask",
    about = "askdesk — client for a retrieval-backed knowledge assistant",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/askdesk.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Submit a question and print the answer with its citations.
    ///
    /// On success the question/answer pair is appended to the persisted
    /// history. Feedback flags record a one-shot signal on the answer.
    Query {
        /// The question text.
        text: String,

        /// Mark the answer helpful after it arrives.
        #[arg(long, conflicts_with = "not_helpful")]
        helpful: bool,

        /// Mark the answer not helpful after it arrives.
        #[arg(long)]
        not_helpful: bool,
    },

    /// Print the persisted query/answer history (newest first).
    History {
        /// Empty the history and remove the persisted payload.
        #[arg(long)]
        clear: bool,
    },

    /// Upload documents to the knowledge base, one request per file.
    ///
    /// Files that are not a supported document format (pdf, txt, md,
    /// markdown, docx) or exceed the size limit are dropped before the
    /// batch starts. Each remaining file uploads independently; a failure
    /// never aborts the rest of the batch.
    Upload {
        /// Files to upload.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List indexed documents.
    Docs,

    /// Show the analytics snapshot: stats, top sources, knowledge gaps.
    Stats,

    /// Show the most recent recorded queries.
    Recent,

    /// Delete an indexed source or a recorded low-confidence query.
    ///
    /// Deletions are two-phase: the target is armed first and committed
    /// only after explicit confirmation.
    Delete {
        #[command(subcommand)]
        target: DeleteTarget,
    },
}

/// Deletion targets.
#[derive(Subcommand)]
enum DeleteTarget {
    /// Delete every chunk belonging to a source document.
    Source {
        /// Source document name (e.g. `old-manual.pdf`).
        name: String,

        /// Skip the interactive confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Delete one recorded low-confidence query.
    Gap {
        /// Query record identifier.
        id: i64,

        /// Skip the interactive confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let service: Arc<dyn RemoteService> = Arc::new(HttpRemoteService::new(&cfg.api)?);

    match cli.command {
        Commands::Query {
            text,
            helpful,
            not_helpful,
        } => {
            run_query(&cfg, service, &text, helpful, not_helpful).await?;
        }
        Commands::History { clear } => {
            run_history(&cfg, clear)?;
        }
        Commands::Upload { files } => {
            run_upload(&cfg, service, &files).await?;
        }
        Commands::Docs => {
            run_docs(service).await?;
        }
        Commands::Stats => {
            run_stats(service).await?;
        }
        Commands::Recent => {
            run_recent(service).await?;
        }
        Commands::Delete { target } => match target {
            DeleteTarget::Source { name, yes } => {
                run_delete_source(service, &name, yes).await?;
            }
            DeleteTarget::Gap { id, yes } => {
                run_delete_gap(service, id, yes).await?;
            }
        },
    }

    Ok(())
}

async fn run_query(
    cfg: &Config,
    service: Arc<dyn RemoteService>,
    text: &str,
    helpful: bool,
    not_helpful: bool,
) -> Result<()> {
    let history = HistoryStore::open(cfg.history.path.clone());
    let mut session = QuerySessionController::new(service, history);

    session.submit(text).await;

    match session.state() {
        SessionState::Answered(record) => {
            println!("{}", record.answer);

            if let Some(confidence) = record.confidence {
                println!();
                println!("  Confidence:  {:.0}%", confidence);
            }

            if !record.citations.is_empty() {
                println!();
                println!("  Sources:");
                for citation in &record.citations {
                    match citation.similarity {
                        Some(score) => println!("    {:<32} {:>5.0}%", citation.source, score),
                        None => println!("    {}", citation.source),
                    }
                }
            }
        }
        SessionState::Failed(e) => {
            anyhow::bail!("{e}");
        }
        SessionState::Idle | SessionState::Pending => {
            // Whitespace-only input is a no-op.
            return Ok(());
        }
    }

    if helpful || not_helpful {
        match session.record_feedback(helpful).await {
            FeedbackState::Unset => println!("\nFeedback not recorded (no answer identifier)."),
            _ => println!("\nFeedback recorded."),
        }
    }

    Ok(())
}

fn run_history(cfg: &Config, clear: bool) -> Result<()> {
    let history = HistoryStore::open(cfg.history.path.clone());

    if clear {
        history.clear()?;
        println!("History cleared.");
        return Ok(());
    }

    let entries = history.load();
    if entries.is_empty() {
        println!("No history yet.");
        return Ok(());
    }

    for (i, entry) in entries.iter().enumerate() {
        println!(
            "{:>3}. [{}] {}",
            i + 1,
            entry.submitted_at.format("%Y-%m-%d %H:%M"),
            entry.question
        );
        println!("     {}", truncate(&entry.answer, 120));
    }

    Ok(())
}

async fn run_upload(
    cfg: &Config,
    service: Arc<dyn RemoteService>,
    files: &[PathBuf],
) -> Result<()> {
    let mut orchestrator = UploadBatchOrchestrator::new(service, cfg.upload.max_file_bytes);

    let mut candidates = Vec::new();
    for path in files {
        let content = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        candidates.push(UploadCandidate { file_name, content });
    }

    orchestrator.add_candidates(candidates);

    if orchestrator.candidates().is_empty() {
        println!("No supported files to upload (allowed: pdf, txt, md, markdown, docx).");
        return Ok(());
    }

    let outcomes = orchestrator.upload_all().await;

    println!("{:<32} {:<8} {}", "FILE", "STATUS", "DETAIL");
    println!("{}", "-".repeat(64));
    let mut failed = 0usize;
    for outcome in &outcomes {
        if outcome.succeeded {
            println!(
                "{:<32} {:<8} {} chunks",
                outcome.file_name,
                "ok",
                outcome.chunk_count.unwrap_or(0)
            );
        } else {
            failed += 1;
            println!(
                "{:<32} {:<8} {}",
                outcome.file_name,
                "FAILED",
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    println!();
    println!("{} uploaded, {} failed.", outcomes.len() - failed, failed);
    if failed > 0 {
        println!("Re-run with only the failed files to retry them.");
    }

    Ok(())
}

async fn run_docs(service: Arc<dyn RemoteService>) -> Result<()> {
    let docs = service.list_documents().await?;

    if docs.is_empty() {
        println!("No documents indexed yet.");
        return Ok(());
    }

    println!(
        "{:<32} {:<8} {:>10} {:>8}   {}",
        "NAME", "TYPE", "SIZE", "CHUNKS", "UPLOADED"
    );
    println!("{}", "-".repeat(76));
    for doc in &docs {
        println!(
            "{:<32} {:<8} {:>10} {:>8}   {}",
            truncate(&doc.original_name, 32),
            doc.file_type,
            format_bytes(doc.file_size as u64),
            doc.chunk_count,
            doc.uploaded_at
        );
    }

    Ok(())
}

async fn run_stats(service: Arc<dyn RemoteService>) -> Result<()> {
    let mut loader = AnalyticsSnapshotLoader::new(service);
    loader.refresh().await?;
    let snapshot = loader.snapshot();

    println!("askdesk — Analytics");
    println!("===================");
    println!();
    println!("  Documents:   {}", snapshot.stats.total_documents);
    println!("  Chunks:      {}", snapshot.stats.total_chunks);
    println!("  Queries:     {}", snapshot.stats.total_queries);
    println!("  Confidence:  {:.1}%", snapshot.stats.average_confidence);
    println!(
        "  Helpful:     {:.1}% ({} ratings)",
        snapshot.stats.helpful_rate, snapshot.stats.feedback_count
    );

    if !snapshot.top_sources.is_empty() {
        println!();
        println!("  Top sources:");
        println!("  {:<40} {:>8}", "SOURCE", "USED");
        println!("  {}", "-".repeat(50));
        for source in &snapshot.top_sources {
            println!(
                "  {:<40} {:>8}",
                truncate(&source.source, 40),
                source.usage_count
            );
        }
    }

    if !snapshot.knowledge_gaps.is_empty() {
        println!();
        println!("  Low-confidence queries:");
        for gap in &snapshot.knowledge_gaps {
            println!(
                "  [{}] {:.0}%  \"{}\"  ({})",
                gap.id,
                gap.confidence,
                truncate(&gap.query, 60),
                gap.created_at
            );
        }
    }

    println!();
    Ok(())
}

async fn run_recent(service: Arc<dyn RemoteService>) -> Result<()> {
    let queries = service.recent_queries().await?;

    if queries.is_empty() {
        println!("No recorded queries yet.");
        return Ok(());
    }

    for q in &queries {
        let confidence = q
            .confidence_score
            .map(|c| format!("{:.0}%", c))
            .unwrap_or_else(|| "-".to_string());
        let helpful = match q.was_helpful {
            Some(true) => "helpful",
            Some(false) => "not helpful",
            None => "no feedback",
        };
        println!(
            "[{}] {}  {}  {}  \"{}\"",
            q.id,
            q.created_at,
            confidence,
            helpful,
            truncate(&q.query_text, 70)
        );
    }

    Ok(())
}

async fn run_delete_source(service: Arc<dyn RemoteService>, name: &str, yes: bool) -> Result<()> {
    let mut loader = AnalyticsSnapshotLoader::new(service);
    loader.arm_source_delete(name);

    let confirmed = if yes {
        name.to_string()
    } else {
        println!("About to delete every chunk for source '{}'.", name);
        match prompt("Type the source name to confirm (empty cancels): ")? {
            Some(typed) => typed,
            None => {
                loader.cancel_source_delete();
                println!("Cancelled.");
                return Ok(());
            }
        }
    };

    match loader.commit_source_delete(&confirmed).await {
        Ok(()) => {
            println!("Deleted source '{}'.", confirmed);
            Ok(())
        }
        Err(CommitError::NotArmed) => {
            anyhow::bail!("confirmation '{}' did not match '{}'", confirmed, name)
        }
        Err(CommitError::Api(e)) => anyhow::bail!("Failed to delete source: {e}"),
    }
}

async fn run_delete_gap(service: Arc<dyn RemoteService>, id: i64, yes: bool) -> Result<()> {
    let mut loader = AnalyticsSnapshotLoader::new(service);
    loader.arm_gap_delete(id);

    let confirmed = if yes {
        id
    } else {
        println!("About to delete recorded query {}.", id);
        match prompt("Type the id to confirm (empty cancels): ")? {
            Some(typed) => typed
                .parse::<i64>()
                .with_context(|| format!("'{}' is not a query id", typed))?,
            None => {
                loader.cancel_gap_delete();
                println!("Cancelled.");
                return Ok(());
            }
        }
    };

    match loader.commit_gap_delete(confirmed).await {
        Ok(()) => {
            println!("Deleted recorded query {}.", confirmed);
            Ok(())
        }
        Err(CommitError::NotArmed) => {
            anyhow::bail!("confirmation '{}' did not match '{}'", confirmed, id)
        }
        Err(CommitError::Api(e)) => anyhow::bail!("Failed to delete query: {e}"),
    }
}

/// Prompt on stdout and read one trimmed line; `None` when empty.
fn prompt(message: &str) -> Result<Option<String>> {
    print!("{message}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut)
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
