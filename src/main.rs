use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use community_archive::comments::{cross_reference, load_posts, write_blank_image_report};
use community_archive::config::Config;
use community_archive::fetch::{
    download_all, download_emotes, plan_attachment_downloads, DownloadSummary, FallbackFetcher,
    HttpImageSource, ImageStore,
};
use community_archive::ids::{scan_archive, IdentifierSet};
use community_archive::registry::EmoteRegistry;
use community_archive::validator::{validate_archive, write_reports, Signatures};

#[derive(Debug, Parser)]
#[command(name = "community-archive", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compare the archive with the authoritative post list.
    Reconcile,
    /// Print the posts that still need archiving, as a JSON array.
    Missing {
        /// Only the first N missing posts.
        #[arg(long)]
        limit: Option<usize>,
        /// Specific post ids instead of the missing ones.
        #[arg(long, num_args = 1..)]
        posts: Vec<String>,
    },
    /// Check archived pages for incomplete rendering.
    Validate,
    /// Check comment emotes and images against the emote registry and report
    /// blank images.
    Crossref,
    /// Download post attachment images.
    FetchImages,
    /// Download the image of every registry emote.
    FetchEmotes,
}

/// How a run ended. Each failure kind has its own exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStatus {
    Clean,
    Drift,
    InvalidContent,
    UnknownCodes,
    FetchFailed,
}

impl RunStatus {
    /// Process exit status. `1` is left for fatal errors.
    fn code(self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::Drift => 2,
            Self::InvalidContent => 3,
            Self::UnknownCodes => 4,
            Self::FetchFailed => 5,
        }
    }

    fn exit_code(self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(status) => status.exit_code(),
        Err(e) => {
            error!("Fatal error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<RunStatus> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_tracing()?;

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Command::Reconcile => reconcile(&config).await,
        Command::Missing { limit, posts } => missing(&config, limit, &posts).await,
        Command::Validate => validate(&config).await,
        Command::Crossref => crossref(&config).await,
        Command::FetchImages => fetch_images(&config).await,
        Command::FetchEmotes => fetch_emotes(&config).await,
    }
}

async fn reconcile(config: &Config) -> Result<RunStatus> {
    let ids = IdentifierSet::load(&config.post_ids_path).await?;
    let archived = scan_archive(&config.archive_dir).await?;
    let diff = ids.reconcile(&archived);

    println!("Extra: {:?}", diff.extra);
    println!("Missing: {:?}", diff.missing);

    if diff.is_clean() {
        info!(total = ids.len(), "Archive matches the post list");
        Ok(RunStatus::Clean)
    } else {
        warn!(
            missing = diff.missing.len(),
            extra = diff.extra.len(),
            "Archive does not match the post list"
        );
        Ok(RunStatus::Drift)
    }
}

async fn missing(config: &Config, limit: Option<usize>, posts: &[String]) -> Result<RunStatus> {
    let ids = IdentifierSet::load(&config.post_ids_path).await?;
    let archived = scan_archive(&config.archive_dir).await?;

    let selection = ids.diff(&archived, limit, Some(posts));

    info!(
        total = ids.len(),
        archived = archived.len(),
        selected = selection.ids.len(),
        "Work list computed"
    );
    println!("{}", serde_json::to_string_pretty(&selection.ids)?);

    Ok(RunStatus::Clean)
}

async fn validate(config: &Config) -> Result<RunStatus> {
    let ids = IdentifierSet::load(&config.post_ids_path).await?;
    let report = validate_archive(&config.archive_dir, &Signatures::default()).await?;

    for (post_id, tags) in report.invalid() {
        let tags: Vec<&str> = tags.iter().map(|t| t.as_str()).collect();
        println!("{post_id} is not valid: {tags:?}");
    }
    write_reports(&report, &ids, &config.report_dir).await?;

    Ok(if report.is_clean() {
        RunStatus::Clean
    } else {
        RunStatus::InvalidContent
    })
}

async fn crossref(config: &Config) -> Result<RunStatus> {
    let ids = IdentifierSet::load(&config.post_ids_path).await?;
    let registry = EmoteRegistry::load(&config.registry_paths).await?;
    let posts = load_posts(&config.posts_path).await?;
    let report = cross_reference(&posts, &registry);

    println!("Found {} unique images", report.unique_images);
    for code in report.unknown_images.keys() {
        println!("Unknown emote: {code}");
    }
    for (name, provenance) in &report.unknown_emotes {
        println!("Unknown emote name: {name}");
        for url in provenance {
            println!("  {url}");
        }
    }
    for post_id in &report.blank_images {
        println!("Blank images in {post_id}");
    }
    write_blank_image_report(&report, &ids, &config.report_dir).await?;

    Ok(if report.is_clean() {
        RunStatus::Clean
    } else {
        RunStatus::UnknownCodes
    })
}

async fn fetch_images(config: &Config) -> Result<RunStatus> {
    let posts = load_posts(&config.posts_path).await?;
    let store = ImageStore::new(&config.image_dir);
    tokio::fs::create_dir_all(store.dir())
        .await
        .with_context(|| format!("Failed to create {}", store.dir().display()))?;

    let planned = plan_attachment_downloads(&posts, &store).await;
    let fetcher = FallbackFetcher::new(HttpImageSource::new(config.fetch_timeout)?);
    let summary = download_all(&planned, &fetcher, &store).await;

    Ok(finish_downloads(&summary))
}

async fn fetch_emotes(config: &Config) -> Result<RunStatus> {
    let registry = EmoteRegistry::load(&config.registry_paths).await?;
    let fetcher = FallbackFetcher::new(HttpImageSource::new(config.fetch_timeout)?);
    let summary = download_emotes(
        &registry,
        &fetcher,
        &config.emote_dir,
        &config.emote_url_base,
        &config.emote_size_suffix,
    )
    .await;

    Ok(finish_downloads(&summary))
}

fn finish_downloads(summary: &DownloadSummary) -> RunStatus {
    info!(
        succeeded = summary.succeeded,
        degraded = summary.degraded,
        skipped = summary.skipped,
        failed = summary.failed.len(),
        "Downloads complete"
    );
    for (url, status) in &summary.failed {
        println!("Failed ({status}): {url}");
    }

    if summary.is_clean() {
        RunStatus::Clean
    } else {
        RunStatus::FetchFailed
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,community_archive=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    // Logs go to stderr; stdout carries command output
    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
