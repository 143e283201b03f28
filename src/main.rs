use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pezzottify_recommender::background_jobs::jobs::{EvaluationReportJob, SnapshotRefreshJob};
use pezzottify_recommender::background_jobs::{create_scheduler, HookEvent, JobContext};
use pezzottify_recommender::catalog_source::{
    load_catalog, CatalogSource, JsonCatalogSource, SqliteCatalogSource,
};
use pezzottify_recommender::cli_style::{format_ratio, get_styles, TableBuilder};
use pezzottify_recommender::config::{
    self, AppConfig, CatalogFormat, FileConfig, DEFAULT_REFRESH_INTERVAL_SECS,
    DEFAULT_SAME_ARTIST_PENALTY, DEFAULT_TOP_K,
};
use pezzottify_recommender::metrics;
use pezzottify_recommender::recommender::{
    MissingGenrePolicy, SnapshotFactory, SnapshotHandle, DEFAULT_NEIGHBOR_CAP,
};
use pezzottify_recommender::service::RecommenderService;

/// How often `watch` looks at the catalog file for modifications.
const CATALOG_POLL_INTERVAL: Duration = Duration::from_secs(30);

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[command(styles = get_styles(), version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"))]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, global = true, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Catalog to read tracks from (SQLite database or JSON array).
    /// Can also be specified in config file.
    #[clap(long, global = true, value_parser = parse_path)]
    pub catalog_path: Option<PathBuf>,

    /// Catalog format. Inferred from the file extension when omitted.
    #[clap(long, global = true)]
    pub catalog_format: Option<CatalogFormat>,

    /// Default number of recommendations per request.
    #[clap(long, global = true, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Default multiplier applied to candidates by the seed's artist.
    #[clap(long, global = true, default_value_t = DEFAULT_SAME_ARTIST_PENALTY)]
    pub same_artist_penalty: f64,

    /// Neighbors retrievable per query. Also the upper bound for top-k.
    #[clap(long, global = true, default_value_t = DEFAULT_NEIGHBOR_CAP)]
    pub neighbor_cap: usize,

    /// Keep only the most frequent terms in the vocabulary.
    #[clap(long, global = true)]
    pub max_features: Option<usize>,

    /// Seconds between scheduled snapshot rebuilds in `watch`.
    #[clap(long, global = true, default_value_t = DEFAULT_REFRESH_INTERVAL_SECS)]
    pub refresh_interval_secs: u64,

    /// Seconds between evaluation reports in `watch`. 0 disables them.
    #[clap(long, global = true, default_value_t = 0)]
    pub evaluation_interval_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tracks similar to a seed track, same-artist candidates downranked.
    Recommend {
        track_id: String,
        #[clap(short = 'k', long = "limit")]
        limit: Option<usize>,
        #[clap(long)]
        penalty: Option<f64>,
        /// Print JSON instead of a table.
        #[clap(long)]
        json: bool,
    },

    /// Raw similarity scores of the nearest tracks, no re-ranking.
    Scores {
        track_id: String,
        #[clap(short = 'k', long = "limit")]
        limit: Option<usize>,
        #[clap(long)]
        json: bool,
    },

    /// Measure recommendation quality on a sample of seed tracks.
    Evaluate {
        #[clap(long)]
        sample_size: Option<usize>,
        #[clap(short = 'k', long = "limit")]
        limit: Option<usize>,
        #[clap(long)]
        seed: Option<u64>,
        /// exclude-from-genre-only, exclude-from-all or count-as-mismatch
        #[clap(long)]
        missing_genre_policy: Option<MissingGenrePolicy>,
        #[clap(long)]
        json: bool,
    },

    /// Copy a JSON catalog into a SQLite catalog database.
    Import {
        #[clap(value_parser = parse_path)]
        input: PathBuf,
        #[clap(value_parser = parse_path)]
        output: PathBuf,
    },

    /// Keep a snapshot live, rebuilding on schedule and on catalog changes,
    /// until Ctrl+C.
    Watch,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            catalog_path: args.catalog_path.clone(),
            catalog_format: args.catalog_format,
            top_k: args.top_k,
            same_artist_penalty: args.same_artist_penalty,
            neighbor_cap: args.neighbor_cap,
            max_features: args.max_features,
            refresh_interval_secs: args.refresh_interval_secs,
            evaluation_interval_secs: args.evaluation_interval_secs,
        }
    }
}

fn init_tracing(file_level: Option<&str>) -> Result<()> {
    let default_level = match file_level {
        Some(level) => level
            .parse::<LevelFilter>()
            .with_context(|| format!("Invalid log_level in config file: {}", level))?,
        None => LevelFilter::INFO,
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    init_tracing(
        file_config
            .as_ref()
            .and_then(|f| f.log_level.as_deref()),
    )?;
    metrics::init_metrics();

    let cli_config: config::CliConfig = (&cli_args).into();

    match cli_args.command {
        Command::Import { input, output } => import_catalog(&input, &output),
        Command::Watch => {
            let app_config = resolve(&cli_config, file_config)?;
            watch(app_config).await
        }
        Command::Recommend {
            track_id,
            limit,
            penalty,
            json,
        } => {
            let app_config = resolve(&cli_config, file_config)?;
            let service = open_service(&app_config)?;
            let recs = service.recommend(&track_id, limit, penalty)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&recs)?);
            } else {
                let mut table = TableBuilder::new(vec!["#", "track", "title", "artist", "score"]);
                for (i, rec) in recs.iter().enumerate() {
                    table.add_row(vec![
                        (i + 1).to_string(),
                        rec.track_id.clone(),
                        rec.title.clone(),
                        rec.artist_name.clone(),
                        format!("{:.4}", rec.score),
                    ]);
                }
                table.print();
            }
            Ok(())
        }
        Command::Scores {
            track_id,
            limit,
            json,
        } => {
            let app_config = resolve(&cli_config, file_config)?;
            let service = open_service(&app_config)?;
            let scores = service.item_scores(&track_id, limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&scores)?);
            } else {
                let mut table = TableBuilder::new(vec!["#", "track", "similarity"]);
                for (i, item) in scores.iter().enumerate() {
                    table.add_row(vec![
                        (i + 1).to_string(),
                        item.track_id.clone(),
                        format!("{:.4}", item.score),
                    ]);
                }
                table.print();
            }
            Ok(())
        }
        Command::Evaluate {
            sample_size,
            limit,
            seed,
            missing_genre_policy,
            json,
        } => {
            let app_config = resolve(&cli_config, file_config)?;
            let service = open_service(&app_config)?;
            let mut options = app_config.evaluation.options();
            options.sample_size = sample_size.unwrap_or(options.sample_size);
            options.top_k = limit.unwrap_or(options.top_k);
            options.seed = seed.unwrap_or(options.seed);
            options.missing_genre_policy =
                missing_genre_policy.unwrap_or(options.missing_genre_policy);

            let report = service.evaluate(&options);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let mut table = TableBuilder::new(vec!["metric", "value"]);
                for (name, value) in [
                    ("artist_consistency", report.artist_consistency),
                    ("genre_consistency", report.genre_consistency),
                    ("album_consistency", report.album_consistency),
                    ("average_similarity", report.average_similarity),
                ] {
                    table.add_row(vec![name.to_string(), format_ratio(value)]);
                }
                table.add_row(vec![
                    "seeds".to_string(),
                    format!(
                        "{} sampled, {} evaluated, {} with genre",
                        report.sampled_seeds, report.evaluated_seeds, report.genre_evaluated_seeds
                    ),
                ]);
                table.add_row(vec![
                    "policy".to_string(),
                    options.missing_genre_policy.to_string(),
                ]);
                table.print();
            }
            Ok(())
        }
    }
}

fn resolve(cli_config: &config::CliConfig, file_config: Option<FileConfig>) -> Result<AppConfig> {
    let app_config = AppConfig::resolve(cli_config, file_config)?;
    info!("Configuration:");
    info!("  catalog: {:?} ({:?})", app_config.catalog_path, app_config.catalog_format);
    info!(
        "  top_k: {}, same_artist_penalty: {}, neighbor_cap: {}",
        app_config.recommender.top_k,
        app_config.recommender.same_artist_penalty,
        app_config.recommender.neighbor_cap
    );
    Ok(app_config)
}

fn snapshot_factory(app_config: &AppConfig) -> Result<Arc<SnapshotFactory>> {
    Ok(Arc::new(SnapshotFactory::new(
        app_config.catalog_source()?,
        app_config.recommender.snapshot_options(),
    )))
}

fn build_live_snapshot(factory: &SnapshotFactory) -> Result<Arc<SnapshotHandle>> {
    let start = Instant::now();
    let result = factory.get_or_build();
    metrics::record_snapshot_build(result.is_ok(), start.elapsed());
    let handle = result?;
    metrics::set_live_snapshot(&handle.current());
    Ok(handle)
}

fn open_service(app_config: &AppConfig) -> Result<RecommenderService> {
    let factory = snapshot_factory(app_config)?;
    let handle = build_live_snapshot(&factory)?;
    Ok(RecommenderService::new(
        handle,
        (&app_config.recommender).into(),
    ))
}

fn import_catalog(input: &Path, output: &Path) -> Result<()> {
    let source = JsonCatalogSource::new(input);
    info!("Importing {} into {:?}", source.describe(), output);
    let tracks = load_catalog(&source)?;
    let target = SqliteCatalogSource::open(output)?;
    let written = target.insert_tracks(&tracks)?;
    info!(
        "Imported {} tracks, catalog now holds {}",
        written,
        target.count()?
    );
    Ok(())
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Sends `OnCatalogChange` whenever the catalog file's modification time
/// moves.
async fn watch_catalog_file(
    path: PathBuf,
    hook_sender: mpsc::Sender<HookEvent>,
    shutdown_token: CancellationToken,
) {
    let mut last_seen = modified_at(&path);
    let mut ticker = tokio::time::interval(CATALOG_POLL_INTERVAL);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let current = modified_at(&path);
                if current != last_seen {
                    info!("Catalog {:?} changed on disk", path);
                    last_seen = current;
                    if hook_sender.send(HookEvent::OnCatalogChange).await.is_err() {
                        warn!("Scheduler is gone, stopping catalog watcher");
                        break;
                    }
                }
            }
            _ = shutdown_token.cancelled() => break,
        }
    }
}

async fn watch(app_config: AppConfig) -> Result<()> {
    let factory = snapshot_factory(&app_config)?;

    let shutdown_token = CancellationToken::new();
    let (hook_sender, hook_receiver) = mpsc::channel(100);
    let job_context = JobContext::new(
        shutdown_token.child_token(),
        Arc::clone(&factory),
        app_config.evaluation.options(),
    );
    let (mut scheduler, scheduler_handle) =
        create_scheduler(hook_receiver, shutdown_token.clone(), job_context);

    scheduler
        .register_job(Arc::new(SnapshotRefreshJob::new(Duration::from_secs(
            app_config.refresh.interval_secs,
        ))))
        .await;
    if app_config.refresh.evaluation_interval_secs > 0 {
        scheduler
            .register_job(Arc::new(EvaluationReportJob::new(Duration::from_secs(
                app_config.refresh.evaluation_interval_secs,
            ))))
            .await;
    }
    for job in scheduler_handle.list_jobs().await {
        info!(
            "  job {}: {} ({})",
            job.id, job.description, job.schedule.schedule_type
        );
    }

    let watcher = tokio::spawn(watch_catalog_file(
        app_config.catalog_path.clone(),
        hook_sender,
        shutdown_token.clone(),
    ));
    let scheduler_task = tokio::spawn(async move { scheduler.run().await });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Received Ctrl+C, initiating graceful shutdown");
    shutdown_token.cancel();

    scheduler_task.await.context("Scheduler task failed")?;
    watcher.await.context("Catalog watcher task failed")?;

    if let Some(handle) = factory.handle() {
        info!("Last live snapshot: generation {}", handle.generation());
    }
    Ok(())
}
