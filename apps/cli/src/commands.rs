//! CLI command definitions, routing, and tracing setup.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use tenderlens_chunker::{ChunkOptions, assemble_pages, assemble_tree};
use tenderlens_extract::{NOT_FOUND_ANSWER, QaAnswer, extract_summary, extract_summary_rules};
use tenderlens_index::{
    build_index, degraded_rank, list_documents, load_index, load_summary, retrieve, save_index,
    save_summary,
};
use tenderlens_providers::{Embedder, GroqChat};
use tenderlens_shared::{
    AppConfig, Chunk, Citation, IndexMeta, SummaryRecord, TenderlensError, init_config,
    load_config, truncate_chars,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Tenderlens — extract citable knowledge from tender documents.
#[derive(Parser)]
#[command(
    name = "tenderlens",
    version,
    about = "Ingest tender documents, retrieve relevant clauses, and extract summary sheets.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Ingest a document: chunk, embed, index, and cache a summary.
    Ingest {
        /// Parsed-document JSON tree, or plain text with form-feed page breaks.
        file: PathBuf,

        /// Document identifier (defaults to a generated `tenders/...` id).
        #[arg(short, long)]
        id: Option<String>,

        /// Treat the input as plain page text even if it parses as JSON.
        #[arg(long)]
        plain: bool,
    },

    /// Print the summary sheet for an ingested document.
    Summary {
        /// Document identifier.
        id: String,

        /// Recompute even if a cached summary exists.
        #[arg(long)]
        refresh: bool,
    },

    /// Ask a question against an ingested document.
    Ask {
        /// Document identifier.
        id: String,

        /// The question to answer.
        question: String,

        /// Number of chunks retrieved as context.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Show the chunks most similar to a query.
    Search {
        /// Document identifier.
        id: String,

        /// Query text.
        query: String,

        /// Number of chunks returned.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// List all ingested documents.
    List,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "tenderlens=info",
        1 => "tenderlens=debug",
        _ => "tenderlens=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Ingest { file, id, plain } => cmd_ingest(&file, id, plain).await,
        Command::Summary { id, refresh } => cmd_summary(&id, refresh).await,
        Command::Ask { id, question, top_k } => cmd_ask(&id, &question, top_k).await,
        Command::Search { id, query, top_k } => cmd_search(&id, &query, top_k).await,
        Command::List => cmd_list().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// ingest
// ---------------------------------------------------------------------------

async fn cmd_ingest(file: &Path, id: Option<String>, plain: bool) -> Result<()> {
    let config = load_config()?;

    let data = std::fs::read(file)
        .map_err(|e| eyre!("cannot read '{}': {e}", file.display()))?;
    let content_sha256 = format!("{:x}", Sha256::digest(&data));

    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());

    let document_id = id.unwrap_or_else(|| {
        format!("tenders/{}_{filename}", uuid::Uuid::now_v7())
    });

    info!(file = %file.display(), %document_id, "ingesting document");

    let chunks = chunk_input(file, &data, plain, &config)?;
    if chunks.is_empty() {
        return Err(eyre!("no text extracted from '{}'", file.display()));
    }

    let spinner = make_spinner();
    spinner.set_message(format!("Embedding {} chunks", chunks.len()));

    let embedder = Embedder::from_config(&config.embeddings)
        .map_err(|e| eyre!("cannot configure embeddings: {e}"))?;
    let index = build_index(&embedder, &chunks).await?;

    let page_count = chunks.iter().map(|c| c.page).collect::<HashSet<_>>().len();
    let meta = IndexMeta {
        document_id: document_id.clone(),
        source_file: Some(filename),
        page_count,
        chunk_count: chunks.len(),
        embedding_provider: embedder.provider_name().to_string(),
        embedding_model: embedder.model_name().to_string(),
        dim: index.dim(),
        content_sha256: Some(content_sha256),
        created_at: chrono::Utc::now(),
    };

    let index_root = config.index_root();
    spinner.set_message("Writing index artifacts");
    save_index(&index_root, &document_id, &chunks, &index, &meta)?;

    // Best-effort summary precompute; a missing completion key is not fatal.
    spinner.set_message("Extracting summary");
    match GroqChat::from_config(&config.completion) {
        Ok(client) => {
            let (record, _cited) =
                extract_summary(&client, &chunks, config.completion.max_context_chars).await;
            if !record.is_empty() {
                save_summary(&index_root, &document_id, &record)?;
            }
        }
        Err(e) => warn!(error = %e, "skipping summary precompute"),
    }

    spinner.finish_and_clear();

    println!();
    println!("  Document ingested!");
    println!("  ID:      {document_id}");
    println!("  Pages:   {page_count}");
    println!("  Chunks:  {}", chunks.len());
    println!("  Index:   {}", index_root.join(tenderlens_index::safe_id(&document_id)).display());
    println!();

    Ok(())
}

/// Chunk the input file: a JSON parse tree when possible, page text otherwise.
fn chunk_input(file: &Path, data: &[u8], plain: bool, config: &AppConfig) -> Result<Vec<Chunk>> {
    let is_json = !plain
        && file
            .extension()
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

    if is_json {
        match serde_json::from_slice(data) {
            Ok(tree) => {
                let opts =
                    ChunkOptions::new(config.chunking.max_chars, config.chunking.overlap);
                return Ok(assemble_tree(&tree, &opts));
            }
            Err(e) => {
                warn!(error = %e, "input is not valid JSON, falling back to page text");
            }
        }
    }

    let text = String::from_utf8_lossy(data);
    // Form feeds mark page boundaries in extracted text.
    let pages: Vec<(u32, String)> = text
        .split('\u{c}')
        .enumerate()
        .map(|(i, page)| (i as u32 + 1, page.to_string()))
        .collect();

    let opts = ChunkOptions::new(config.chunking.page_max_chars, config.chunking.page_overlap);
    Ok(assemble_pages(&pages, &opts))
}

// ---------------------------------------------------------------------------
// summary
// ---------------------------------------------------------------------------

async fn cmd_summary(id: &str, refresh: bool) -> Result<()> {
    let config = load_config()?;
    let index_root = config.index_root();

    if !refresh {
        if let Some(record) = load_summary(&index_root, id) {
            if !record.is_empty() {
                print_summary(&record, &[]);
                return Ok(());
            }
        }
    }

    let (chunks, _index) = load_index(&index_root, id).map_err(friendly_not_found)?;

    let (record, cited) = match GroqChat::from_config(&config.completion) {
        Ok(client) => {
            extract_summary(&client, &chunks, config.completion.max_context_chars).await
        }
        Err(e) => {
            warn!(error = %e, "completion not configured, using rule-based extraction");
            extract_summary_rules(&chunks)
        }
    };

    if !record.is_empty() {
        save_summary(&index_root, id, &record)?;
    }

    let citations: Vec<Citation> = cited.iter().map(Citation::from_chunk).collect();
    print_summary(&record, &citations);
    Ok(())
}

fn print_summary(record: &SummaryRecord, citations: &[Citation]) {
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "—".to_string());

    println!();
    println!("  Tender:    {}", field(&record.tender_name));
    println!("  Issuer:    {}", field(&record.issuer));
    println!("  EMD:       {}", field(&record.emd_amount));
    println!("  Location:  {}", field(&record.location));
    println!("  Duration:  {}", field(&record.duration));
    println!("  Scope:     {}", field(&record.scope_of_work));

    if !record.compliance_notes.is_empty() {
        println!("  Compliance notes:");
        for note in &record.compliance_notes {
            println!("    - {note}");
        }
    }

    print_citations(citations);
    println!();
}

// ---------------------------------------------------------------------------
// ask / search
// ---------------------------------------------------------------------------

async fn cmd_ask(id: &str, question: &str, top_k: Option<usize>) -> Result<()> {
    let config = load_config()?;
    let top_k = top_k.unwrap_or(config.defaults.top_k);

    let (chunks, index) = load_index(&config.index_root(), id).map_err(friendly_not_found)?;
    let ranked = rank_chunks(&config, &index, &chunks, question, top_k).await?;

    let result = match GroqChat::from_config(&config.completion) {
        Ok(client) => {
            tenderlens_extract::answer_question(&client, question, &ranked, id).await
        }
        Err(e) => {
            warn!(error = %e, "completion not configured");
            QaAnswer {
                answer: NOT_FOUND_ANSWER.to_string(),
                citations: ranked.iter().map(|(c, _)| Citation::from_chunk(c)).collect(),
            }
        }
    };

    println!();
    println!("  {}", result.answer);
    print_citations(&result.citations);
    println!();

    Ok(())
}

async fn cmd_search(id: &str, query: &str, top_k: Option<usize>) -> Result<()> {
    let config = load_config()?;
    let top_k = top_k.unwrap_or(config.defaults.top_k);

    let (chunks, index) = load_index(&config.index_root(), id).map_err(friendly_not_found)?;
    let ranked = rank_chunks(&config, &index, &chunks, query, top_k).await?;

    println!();
    for (chunk, score) in &ranked {
        println!(
            "  {score:+.3}  p.{:<3} {:<10} {}",
            chunk.page,
            chunk.chunk_id,
            chunk.section_hint.as_deref().unwrap_or("")
        );
        println!("          {}", truncate_chars(&chunk.text.replace('\n', " "), 100));
    }
    if ranked.is_empty() {
        println!("  (no results)");
    }
    println!();

    Ok(())
}

/// Similarity ranking, degrading to longest-first when embeddings are unavailable.
async fn rank_chunks(
    config: &AppConfig,
    index: &tenderlens_index::FlatIndex,
    chunks: &[Chunk],
    query: &str,
    top_k: usize,
) -> Result<Vec<(Chunk, f32)>> {
    match Embedder::from_config(&config.embeddings) {
        Ok(embedder) => Ok(retrieve(&embedder, index, chunks, query, top_k).await?),
        Err(e) => {
            warn!(error = %e, "embedding provider unavailable, using degraded ranking");
            Ok(degraded_rank(chunks, top_k))
        }
    }
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

async fn cmd_list() -> Result<()> {
    let config = load_config()?;
    let metas = list_documents(&config.index_root())?;

    if metas.is_empty() {
        println!("No documents ingested yet.");
        return Ok(());
    }

    println!();
    for m in &metas {
        println!(
            "  {}  pages={:<4} chunks={:<5} {:<24} {}",
            m.created_at.format("%Y-%m-%d %H:%M"),
            m.page_count,
            m.chunk_count,
            format!("{}:{}", m.embedding_provider, m.embedding_model),
            m.document_id
        );
    }
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

fn print_citations(citations: &[Citation]) {
    if citations.is_empty() {
        return;
    }
    println!("  Citations:");
    for c in citations {
        println!(
            "    p.{:<3} {:<10} {}",
            c.page.unwrap_or(0),
            c.chunk_id.as_deref().unwrap_or("?"),
            c.section_hint.as_deref().unwrap_or("")
        );
    }
}

fn friendly_not_found(err: TenderlensError) -> color_eyre::eyre::Report {
    if err.is_not_found() {
        eyre!("{err}\nRun `tenderlens ingest <file>` first.")
    } else {
        eyre!(err)
    }
}
