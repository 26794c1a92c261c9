//! CLI command definitions, routing, and tracing setup.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use pressroom_core::{
    Agency, ExportPaths, PipelineRun, ProgressReporter, RunStatus, Stage, StageOutput,
};
use pressroom_knowledge::IngestReport;
use pressroom_shared::{AppConfig, init_config, init_config_at, load_config, load_config_from};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Pressroom: turn a document corpus into published articles.
#[derive(Parser)]
#[command(
    name = "pressroom",
    version,
    about = "Index a document corpus and run a multi-stage editorial pipeline over it.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.pressroom/pressroom.toml).
    #[arg(long, global = true, env = "PRESSROOM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
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
    /// Index the corpus, pick a topic and run the editorial pipeline.
    Run {
        /// Run on this topic instead of scheduling one. Not recorded in history.
        #[arg(short, long)]
        topic: Option<String>,

        /// Reuse the existing index without re-reading the corpus.
        #[arg(long)]
        skip_index: bool,
    },

    /// Load the corpus and add new chunks to the index.
    Index,

    /// Retrieve the closest chunks for a query.
    Query {
        /// Query text.
        text: String,

        /// Number of chunks to return (defaults to knowledge.top_k).
        #[arg(short)]
        k: Option<usize>,
    },

    /// Suggest topics from the indexed corpus.
    Topics,

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
        0 => "pressroom=info",
        1 => "pressroom=debug",
        _ => "pressroom=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run { topic, skip_index } => {
            cmd_run(config_path, topic.as_deref(), skip_index).await
        }
        Command::Index => cmd_index(config_path).await,
        Command::Query { text, k } => cmd_query(config_path, &text, k).await,
        Command::Topics => cmd_topics(config_path).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

/// `--config` wins over the default location; a missing file means defaults.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(p) if p.exists() => Ok(load_config_from(p)?),
        Some(p) => {
            tracing::debug!(path = %p.display(), "config file not found, using defaults");
            Ok(AppConfig::default())
        }
        None => Ok(load_config()?),
    }
}

fn build_agency(path: Option<&Path>) -> Result<Agency> {
    Ok(Agency::from_config(resolve_config(path)?)?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config_path: Option<&Path>, topic: Option<&str>, skip_index: bool) -> Result<()> {
    let agency = build_agency(config_path)?;
    let reporter = CliProgress::new();

    if skip_index {
        let chunks = agency.knowledge().chunk_count().await?;
        let last_ingest = agency.knowledge().last_ingest_stats().await?;
        info!(
            chunks = ?chunks,
            last_ingest = last_ingest.as_deref().unwrap_or("none"),
            "skipping corpus indexing"
        );
    } else {
        reporter.phase("Indexing corpus");
        let report = agency.index().await?;
        info!(
            chunks_added = report.chunks_added,
            chunks_existing = report.chunks_existing,
            "corpus indexed"
        );
    }

    let (run, export) = match topic {
        Some(topic) => {
            info!(topic, "running on explicit topic");
            let outcome = agency.run_topic(topic, &reporter).await?;
            (outcome.run, outcome.export)
        }
        None => {
            let mut rng = rand::thread_rng();
            let cycle = agency.run_cycle(&mut rng, &reporter).await?;
            println!();
            println!("  Suggested: {}", cycle.suggested.len());
            println!("  Selection: {:?}", cycle.selection.state);
            if !cycle.selection.recorded && !cycle.suggested.is_empty() {
                println!("  Warning:   topic could not be written to history");
            }
            (cycle.run, cycle.export)
        }
    };

    print_run_summary(&run, export.as_ref());
    run.into_result()?;
    Ok(())
}

async fn cmd_index(config_path: Option<&Path>) -> Result<()> {
    let agency = build_agency(config_path)?;
    let reporter = CliProgress::new();
    reporter.phase("Indexing corpus");
    let report = agency.index().await?;
    let total = agency.knowledge().chunk_count().await?;
    reporter.finish();

    print_ingest_summary(&report, &agency.config().knowledge.corpus_dir);
    if let Some(total) = total {
        println!("  Index holds {total} chunks");
        println!();
    }
    Ok(())
}

async fn cmd_query(config_path: Option<&Path>, text: &str, k: Option<usize>) -> Result<()> {
    let agency = build_agency(config_path)?;
    let k = k.unwrap_or(agency.config().knowledge.top_k);
    info!(k, "querying knowledge base");

    let context = agency.knowledge().query(text, k).await;
    println!("{context}");
    Ok(())
}

async fn cmd_topics(config_path: Option<&Path>) -> Result<()> {
    let agency = build_agency(config_path)?;
    let reporter = CliProgress::new();
    reporter.phase("Suggesting topics");
    let topics = agency.knowledge().suggest_topics().await;
    reporter.finish();

    if topics.is_empty() {
        println!(
            "No topics suggested. Default topic: {}",
            agency.scheduler().default_topic()
        );
        return Ok(());
    }

    let used: HashSet<String> = agency
        .scheduler()
        .history()
        .load()
        .map(|records| records.into_iter().map(|r| r.topic).collect())
        .unwrap_or_default();

    for topic in &topics {
        let marker = if used.contains(topic) { "used" } else { "new " };
        println!("  [{marker}] {topic}");
    }
    Ok(())
}

fn cmd_config_init(config_path: Option<&Path>) -> Result<()> {
    let path = match config_path {
        Some(p) => init_config_at(p)?,
        None => init_config()?,
    };
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_ingest_summary(report: &IngestReport, corpus_dir: &Path) {
    println!();
    if report.documents_found == 0 {
        println!("  No documents found in {}", corpus_dir.display());
        println!("  Add PDF, .txt or .md files there and run `pressroom index` again.");
        println!();
        return;
    }
    println!("  Knowledge base indexed");
    println!(
        "  Documents: {} found, {} indexed, {} skipped",
        report.documents_found, report.documents_indexed, report.documents_skipped
    );
    println!(
        "  Chunks:    {} added, {} already indexed",
        report.chunks_added, report.chunks_existing
    );
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

fn print_run_summary(run: &PipelineRun, export: Option<&ExportPaths>) {
    println!();
    println!("  Topic:   {}", run.topic);
    println!("  Run:     {}", run.id);
    println!("  Stages:  {}", run.bundle.len());
    match &run.status {
        RunStatus::Completed => println!("  Status:  completed"),
        RunStatus::Running => println!("  Status:  running"),
        RunStatus::Failed { stage, cause } => {
            println!("  Status:  failed at stage {stage}: {cause}")
        }
    }
    for (output, artifact) in run.artifacts() {
        let marker = if artifact.is_degraded() { "!" } else { "+" };
        println!("  {marker} {} -> {}", output.name, artifact.capability());
    }
    if let Some(paths) = export {
        println!("  Post:    {}", paths.post.display());
        println!("  Run log: {}", paths.run.display());
    }
    println!();

    if let Some(final_output) = run.final_output() {
        println!("{}", final_output.text.trim_end());
        println!();
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn stage_started(&self, stage: &Stage, position: usize, total: usize) {
        self.spinner
            .set_message(format!("[{position}/{total}] {} ({})", stage.name, stage.role));
    }

    fn stage_finished(&self, output: &StageOutput) {
        let suffix = match &output.artifact {
            Some(a) if a.is_degraded() => " (degraded)",
            _ => "",
        };
        self.spinner.println(format!("  done: {}{suffix}", output.name));
    }

    fn done(&self, _run: &PipelineRun) {
        self.finish();
    }
}
