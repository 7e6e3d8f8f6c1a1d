//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use wikiport_core::{
    ExportPipeline, JobCommands, JobQueries,
    ports::{BlobStorage, EventPublisher},
};
use wikiport_github::{GithubContentSource, GithubSourceConfig};
use wikiport_shared::{
    AppConfig, Event, EventKind, FileId, JobId, JobStatus, config_file_path, init_config,
    load_config,
};
use wikiport_storage::{Database, FsBlobStore};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// wikiport — GitHub wiki exports as Markdown, PDF, and EPUB.
#[derive(Parser)]
#[command(
    name = "wikiport",
    version,
    about = "Export a GitHub repository's wiki (or README) to Markdown, PDF, and EPUB.",
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
    /// Create an export job for a repository and run it to completion.
    Export {
        /// GitHub repository URL (e.g. https://github.com/acme/widgets).
        url: String,
    },

    /// List export jobs, newest first.
    List {
        /// Maximum number of jobs to show.
        #[arg(long, default_value = "20")]
        limit: u32,

        /// Number of jobs to skip.
        #[arg(long, default_value = "0")]
        offset: u32,
    },

    /// Show one job and its export files.
    Show {
        /// Job id.
        job: String,
    },

    /// Write an export file's bytes to a local path.
    Fetch {
        /// File id.
        file: String,

        /// Output path (defaults to the export's filename).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Delete a job, its file records, and its stored artifacts.
    Delete {
        /// Job id.
        job: String,
    },

    /// Delete a single export file.
    #[command(name = "delete-file")]
    DeleteFile {
        /// File id.
        file: String,
    },

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
        0 => "wikiport_core=info,wikiport_github=info,wikiport_render=info,\
              wikiport_storage=info,wikiport_cli=info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// The core wired up against the persistent collaborators.
struct App {
    commands: JobCommands,
    queries: JobQueries,
    pipeline: ExportPipeline,
    blobs: Arc<FsBlobStore>,
}

impl App {
    async fn build(config: &AppConfig, events: Arc<dyn EventPublisher>) -> Result<Self> {
        let db = Arc::new(Database::open(&config.db_path()).await?);
        let blobs = Arc::new(FsBlobStore::new(config.blob_root())?);
        let source = Arc::new(GithubContentSource::new(
            GithubSourceConfig::from_app_config(config),
        )?);

        Ok(Self {
            commands: JobCommands::new(
                db.clone(),
                db.clone(),
                blobs.clone(),
                events.clone(),
            ),
            queries: JobQueries::new(db.clone(), db.clone()),
            pipeline: ExportPipeline::new(db.clone(), db, blobs.clone(), source, events),
            blobs,
        })
    }
}

/// Publisher that mirrors pipeline events onto an interactive progress bar.
struct ProgressBarPublisher {
    bar: ProgressBar,
}

#[async_trait]
impl EventPublisher for ProgressBarPublisher {
    async fn publish(&self, event: Event) {
        match &event.kind {
            EventKind::JobProgressUpdated { percentage, message } => {
                self.bar.set_position(*percentage as u64);
                self.bar.set_message(message.clone());
            }
            EventKind::FileCreated {
                filename,
                size_bytes,
                ..
            } => {
                self.bar.println(format!("  wrote {filename} ({size_bytes} bytes)"));
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Export { url } => cmd_export(&url).await,
        Command::List { limit, offset } => cmd_list(limit, offset).await,
        Command::Show { job } => cmd_show(&job).await,
        Command::Fetch { file, out } => cmd_fetch(&file, out).await,
        Command::Delete { job } => cmd_delete(&job).await,
        Command::DeleteFile { file } => cmd_delete_file(&file).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

async fn cmd_export(url: &str) -> Result<()> {
    let config = load_config()?;

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
            .expect("static template"),
    );
    let events: Arc<dyn EventPublisher> = Arc::new(ProgressBarPublisher { bar: bar.clone() });

    let app = App::build(&config, events).await?;
    let job_id = app.commands.create(url).await?;
    info!(job = %job_id, "created export job");

    app.pipeline.run(job_id).await?;
    bar.finish_and_clear();

    let job = app
        .queries
        .job(job_id)
        .await?
        .ok_or_else(|| eyre!("job {job_id} disappeared during export"))?;

    match job.status {
        JobStatus::Completed => {
            println!("Export completed: job {job_id}");
            for file in app.queries.files(job_id).await? {
                let url = app
                    .blobs
                    .retrieval_url(&file.storage_location, Duration::from_secs(3600))
                    .await?;
                println!("  {:<9} {:<24} {:>9} bytes  {url}", file.format.to_string(), file.filename, file.size_bytes);
            }
            Ok(())
        }
        status => {
            let reason = job.error_message.unwrap_or_else(|| "unknown error".into());
            Err(eyre!("export ended in status {status}: {reason}"))
        }
    }
}

async fn cmd_list(limit: u32, offset: u32) -> Result<()> {
    let config = load_config()?;
    let app = App::build(&config, silent_publisher()).await?;

    let jobs = app.queries.jobs(limit, offset).await?;
    if jobs.is_empty() {
        println!("No export jobs.");
        return Ok(());
    }

    for job in jobs {
        println!(
            "{}  {:<10} {:>3}%  {}",
            job.id, job.status.to_string(), job.progress_percentage, job.repository_url
        );
    }
    Ok(())
}

async fn cmd_show(job: &str) -> Result<()> {
    let job_id: JobId = job.parse().map_err(|e| eyre!("invalid job id: {e}"))?;
    let config = load_config()?;
    let app = App::build(&config, silent_publisher()).await?;

    let Some(job) = app.queries.job(job_id).await? else {
        return Err(eyre!("export job {job_id} not found"));
    };

    println!("job:        {}", job.id);
    println!("repository: {}", job.repository_url);
    println!("status:     {}", job.status);
    println!("progress:   {}% — {}", job.progress_percentage, job.progress_message);
    println!("created:    {}", job.created_at.to_rfc3339());
    println!("updated:    {}", job.updated_at.to_rfc3339());
    if let Some(completed_at) = job.completed_at {
        println!("completed:  {}", completed_at.to_rfc3339());
    }
    if let Some(error) = &job.error_message {
        println!("error:      {error}");
    }

    let files = app.queries.files(job_id).await?;
    if !files.is_empty() {
        println!("files:");
        for file in files {
            println!(
                "  {}  {:<9} {:<24} {:>9} bytes",
                file.id, file.format.to_string(), file.filename, file.size_bytes
            );
        }
    }
    Ok(())
}

async fn cmd_fetch(file: &str, out: Option<PathBuf>) -> Result<()> {
    let file_id: FileId = file.parse().map_err(|e| eyre!("invalid file id: {e}"))?;
    let config = load_config()?;
    let app = App::build(&config, silent_publisher()).await?;

    let Some(file) = app.queries.file(file_id).await? else {
        return Err(eyre!("export file {file_id} not found"));
    };
    let Some(bytes) = app.blobs.fetch(&file.storage_location).await? else {
        return Err(eyre!("stored bytes for {} are missing", file.filename));
    };

    let out = out.unwrap_or_else(|| PathBuf::from(&file.filename));
    tokio::fs::write(&out, &bytes).await?;
    println!("Wrote {} ({} bytes)", out.display(), bytes.len());
    Ok(())
}

async fn cmd_delete(job: &str) -> Result<()> {
    let job_id: JobId = job.parse().map_err(|e| eyre!("invalid job id: {e}"))?;
    let config = load_config()?;
    let app = App::build(&config, silent_publisher()).await?;

    app.commands.delete(job_id).await?;
    println!("Deleted job {job_id}");
    Ok(())
}

async fn cmd_delete_file(file: &str) -> Result<()> {
    let file_id: FileId = file.parse().map_err(|e| eyre!("invalid file id: {e}"))?;
    let config = load_config()?;
    let app = App::build(&config, silent_publisher()).await?;

    app.commands.delete_file(file_id).await?;
    println!("Deleted file {file_id}");
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config at {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    println!("config file: {}", config_file_path().display());
    println!("data dir:    {}", config.storage.data_dir);
    println!("database:    {}", config.db_path().display());
    println!("blob root:   {}", config.blob_root().display());
    println!("token env:   {}", config.github.token_env);
    println!("timeout:     {}s", config.github.timeout_secs);
    Ok(())
}

/// Events go to structured logs when no progress bar is attached.
fn silent_publisher() -> Arc<dyn EventPublisher> {
    Arc::new(wikiport_core::TracingEventPublisher)
}
