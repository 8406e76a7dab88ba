//! CLI command definitions for contact-forge.
//!
//! Each pipeline stage is one subcommand. Stages communicate through files on
//! disk (`frames/episodes_meta.json`, `batch/batch_input.jsonl`,
//! `batch/batch_id.txt`), so they can be re-run independently.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Serialize;

use crate::annotation::process_batch;
use crate::batch::{
    resolve_batch_id, submit_batch, BatchMonitor, OpenAiBatchClient, RequestBuilder, WatchOutcome,
};
use crate::config::{
    ExtractConfig, PrepareConfig, ProcessConfig, WatchConfig, BATCH_ID_FILE, BATCH_INPUT_FILE,
    DEFAULT_ANNOTATIONS_DIR, DEFAULT_BATCH_DIR, DEFAULT_CAMERA_KEY, DEFAULT_CHUNK_SIZE,
    DEFAULT_FRAMES_DIR, DEFAULT_HF_ENDPOINT, DEFAULT_MODEL, DEFAULT_OPENAI_BASE_URL,
    DEFAULT_REPO_ID, MANIFEST_FILE,
};
use crate::dataset::{FrameExtractor, HubClient, HubConfig, HubDataset, LocalDataset, Manifest};
use crate::viewer::{self, DEFAULT_VIEWER_PORT};

/// Default directory for cached hub downloads.
const DEFAULT_CACHE_DIR: &str = ".cache/hub";

/// Robot hand-object contact annotation pipeline.
#[derive(Parser)]
#[command(name = "contact-forge")]
#[command(about = "Annotate robot hand-object contact in episode videos with a batch vision model")]
#[command(version)]
#[command(
    long_about = "contact-forge samples frames from a LeRobot video dataset, packs them into strip images,\nlabels every sampled frame through a batch inference API, and writes per-episode contact labels.\n\nTypical run:\n  contact-forge extract --max-episodes 5\n  contact-forge prepare\n  contact-forge submit\n  contact-forge process"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Download episodes and sample frames into JPEGs plus a manifest.
    Extract(ExtractArgs),

    /// Build the batch request file from the frame manifest.
    Prepare(PrepareArgs),

    /// Upload the request file, create a batch and (by default) watch it.
    Submit(SubmitArgs),

    /// Poll a batch until it finishes.
    Watch(WatchArgs),

    /// Download batch results and write per-episode contact labels.
    Process(ProcessArgs),

    /// Browse a request file in the browser.
    View(ViewArgs),
}

/// Arguments for `contact-forge extract`.
#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// Dataset repository on the HuggingFace Hub.
    #[arg(long, default_value = DEFAULT_REPO_ID)]
    pub repo: String,

    /// Read the dataset from a local directory instead of the hub.
    #[arg(long, conflicts_with = "repo")]
    pub local: Option<PathBuf>,

    /// Camera stream to sample.
    #[arg(long, default_value = DEFAULT_CAMERA_KEY)]
    pub camera: String,

    /// Directory for sampled frames and the manifest.
    #[arg(short = 'o', long, default_value = DEFAULT_FRAMES_DIR)]
    pub out_dir: PathBuf,

    /// Keep every Nth decoded frame (10 turns 30fps into 3fps).
    #[arg(long, default_value = "10")]
    pub frame_step: u64,

    /// Only process the first N episodes.
    #[arg(long)]
    pub max_episodes: Option<usize>,

    /// Episodes per video chunk directory.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: u64,

    /// HuggingFace token for gated or private datasets.
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    /// HuggingFace endpoint (mirrors, tests).
    #[arg(long, env = "HF_ENDPOINT", default_value = DEFAULT_HF_ENDPOINT)]
    pub hf_endpoint: String,

    /// Cache directory for downloaded dataset files.
    #[arg(long, env = "CONTACT_FORGE_CACHE", default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `contact-forge prepare`.
#[derive(Parser, Debug)]
pub struct PrepareArgs {
    /// Manifest written by `extract`.
    #[arg(long, default_value_os_t = Path::new(DEFAULT_FRAMES_DIR).join(MANIFEST_FILE))]
    pub manifest: PathBuf,

    /// Directory for the request file.
    #[arg(short = 'o', long, default_value = DEFAULT_BATCH_DIR)]
    pub out_dir: PathBuf,

    /// Vision model to request.
    #[arg(short = 'm', long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Sampling temperature. Omitted from requests unless set.
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Consecutive frames per strip (odd).
    #[arg(long, default_value = "3")]
    pub strip_size: usize,

    /// Shrink each frame by this ratio (0 < RATIO <= 1).
    #[arg(long, value_name = "RATIO")]
    pub scale: Option<f32>,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Batch API connection flags shared by the API-facing commands.
#[derive(clap::Args, Debug)]
pub struct ApiArgs {
    /// API key for the batch endpoint.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL)]
    pub base_url: String,
}

impl ApiArgs {
    fn client(&self) -> anyhow::Result<OpenAiBatchClient> {
        let client = OpenAiBatchClient::with_base_url(
            self.api_key.clone().unwrap_or_default(),
            self.base_url.clone(),
        )?;
        tracing::debug!(
            base_url = client.base_url(),
            api_key = %client.api_key_masked(),
            "Batch API client ready"
        );
        Ok(client)
    }
}

/// Arguments for `contact-forge submit`.
#[derive(Parser, Debug)]
pub struct SubmitArgs {
    /// Request file written by `prepare`.
    #[arg(long, default_value_os_t = Path::new(DEFAULT_BATCH_DIR).join(BATCH_INPUT_FILE))]
    pub input: PathBuf,

    /// Directory for `batch_id.txt`.
    #[arg(short = 'o', long, default_value = DEFAULT_BATCH_DIR)]
    pub out_dir: PathBuf,

    /// Exit right after creating the batch.
    #[arg(long)]
    pub no_watch: bool,

    /// Seconds between status checks.
    #[arg(long, default_value = "10", value_name = "SEC")]
    pub sleep: u64,

    #[command(flatten)]
    pub api: ApiArgs,
}

/// Arguments for `contact-forge watch`.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Batch to watch. Defaults to the id in `batch/batch_id.txt`.
    #[arg(long)]
    pub batch_id: Option<String>,

    /// Seconds between status checks.
    #[arg(long, default_value = "60", value_name = "SEC")]
    pub sleep: u64,

    /// Maximum number of polls; -1 polls until the batch finishes.
    #[arg(long, default_value = "-1", allow_hyphen_values = true)]
    pub repeat: i64,

    #[command(flatten)]
    pub api: ApiArgs,
}

/// Arguments for `contact-forge process`.
#[derive(Parser, Debug)]
pub struct ProcessArgs {
    /// Batch to process. Defaults to the id in `batch/batch_id.txt`.
    #[arg(long)]
    pub batch_id: Option<String>,

    /// Directory for the annotation files.
    #[arg(short = 'o', long, default_value = DEFAULT_ANNOTATIONS_DIR)]
    pub out_dir: PathBuf,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub api: ApiArgs,
}

/// Arguments for `contact-forge view`.
#[derive(Parser, Debug)]
pub struct ViewArgs {
    /// Request file to browse.
    #[arg(long, default_value_os_t = Path::new(DEFAULT_BATCH_DIR).join(BATCH_INPUT_FILE))]
    pub jsonl: PathBuf,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_VIEWER_PORT)]
    pub port: u16,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Extract(args) => run_extract_command(args).await,
        Commands::Prepare(args) => run_prepare_command(args).await,
        Commands::Submit(args) => run_submit_command(args).await,
        Commands::Watch(args) => run_watch_command(args).await,
        Commands::Process(args) => run_process_command(args).await,
        Commands::View(args) => viewer::serve(&args.jsonl, args.port).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Extract
// ============================================================================

async fn run_extract_command(args: ExtractArgs) -> anyhow::Result<()> {
    let config = ExtractConfig::new(&args.out_dir)
        .with_repo(&args.repo)
        .with_camera_key(&args.camera)
        .with_frame_step(args.frame_step)
        .with_max_episodes(args.max_episodes)
        .with_chunk_size(args.chunk_size);

    let summary = match &args.local {
        Some(root) => {
            tracing::info!(root = %root.display(), "Reading dataset from local directory");
            FrameExtractor::new(LocalDataset::new(root), config)?.run().await?
        }
        None => {
            let hub = HubClient::new(
                HubConfig::new(&args.cache_dir)
                    .with_endpoint(&args.hf_endpoint)
                    .with_token(args.hf_token.clone()),
            )?;
            tracing::info!(repo = %args.repo, "Reading dataset from the hub");
            FrameExtractor::new(HubDataset::new(hub, &args.repo), config)?
                .run()
                .await?
        }
    };

    if args.json {
        return print_json(&summary);
    }
    println!("Extraction finished");
    println!("  Episodes:       {}", summary.episodes);
    println!("  Skipped:        {}", summary.skipped_episodes);
    println!("  Frames:         {}", summary.total_frames);
    println!("  Manifest:       {}", summary.manifest_path.display());
    Ok(())
}

// ============================================================================
// Prepare
// ============================================================================

async fn run_prepare_command(args: PrepareArgs) -> anyhow::Result<()> {
    let config = PrepareConfig::new(&args.model)
        .with_strip_size(args.strip_size)
        .with_scale(args.scale)
        .with_temperature(args.temperature);
    let builder = RequestBuilder::new(config)?;

    let manifest = Manifest::load(&args.manifest)?;
    let summary = builder.build(&manifest, &args.out_dir).await?;

    if args.json {
        return print_json(&summary);
    }
    println!("Batch requests written");
    println!("  Episodes:       {}", summary.episodes);
    println!("  Requests:       {}", summary.requests);
    println!("  Skipped:        {}", summary.skipped);
    println!("  Output:         {}", summary.output.display());
    Ok(())
}

// ============================================================================
// Submit / Watch
// ============================================================================

fn report_outcome(outcome: &WatchOutcome, batch_id: &str) {
    match outcome {
        WatchOutcome::Finished(batch) => {
            println!("\nBatch finished with status: {}", batch.status)
        }
        WatchOutcome::PollLimit(batch) => {
            println!("\nStopped after the poll limit; batch is still {}", batch.status)
        }
        WatchOutcome::Interrupted(_) => {
            println!("\nStopped watching; check again with: contact-forge watch --batch-id {}", batch_id)
        }
    }
}

async fn run_submit_command(args: SubmitArgs) -> anyhow::Result<()> {
    let client = args.api.client()?;
    let submission = submit_batch(&client, &args.input, &args.out_dir).await?;

    println!("Batch submitted");
    println!("  File ID:        {}", submission.file.id);
    println!("  Batch ID:       {}", submission.batch.id);
    println!("  Status:         {}", submission.batch.status);
    println!("  Saved to:       {}", submission.id_path.display());

    if args.no_watch {
        println!(
            "\nSkipping the watch; check later with: contact-forge watch --batch-id {}",
            submission.batch.id
        );
        return Ok(());
    }

    let config = WatchConfig::new(Duration::from_secs(args.sleep));
    let outcome = BatchMonitor::new(&client, config)
        .watch(&submission.batch.id)
        .await?;
    report_outcome(&outcome, &submission.batch.id);
    Ok(())
}

async fn run_watch_command(args: WatchArgs) -> anyhow::Result<()> {
    let id_file = Path::new(DEFAULT_BATCH_DIR).join(BATCH_ID_FILE);
    let batch_id = resolve_batch_id(args.batch_id, &id_file)?;
    let client = args.api.client()?;

    let config = WatchConfig::new(Duration::from_secs(args.sleep)).with_repeat(args.repeat);
    let outcome = BatchMonitor::new(&client, config).watch(&batch_id).await?;
    report_outcome(&outcome, &batch_id);
    Ok(())
}

// ============================================================================
// Process
// ============================================================================

async fn run_process_command(args: ProcessArgs) -> anyhow::Result<()> {
    let id_file = Path::new(DEFAULT_BATCH_DIR).join(BATCH_ID_FILE);
    let batch_id = resolve_batch_id(args.batch_id, &id_file)?;
    let client = args.api.client()?;

    let config = ProcessConfig::new(&args.out_dir);
    let summary = process_batch(&client, &batch_id, &config).await?;

    if args.json {
        return print_json(&summary);
    }
    println!("Annotations written");
    println!("  Batch ID:       {}", summary.batch_id);
    println!("  Records:        {}", summary.records);
    println!("  Parsed OK:      {}", summary.parsed_ok);
    println!("  Failed:         {}", summary.failed);
    if summary.batch_errors > 0 {
        println!("  Batch errors:   {} (see errors.jsonl)", summary.batch_errors);
    }
    println!("  Episodes:       {}", summary.episodes);
    println!("  Combined JSON:  {}", summary.combined.display());
    println!("  Summary CSV:    {}", summary.summary_csv.display());
    println!(
        "  Per-episode:    {}/episode_XXXXXX_contact.json",
        config.out_dir.display()
    );
    Ok(())
}
