use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pezzottify_recommender::cli_style::{
    format_ratio, get_styles, print_error, print_key_value, print_section_footer,
    print_section_header, print_success, print_warning, print_welcome, TableBuilder,
};
use pezzottify_recommender::config::{AppConfig, CliConfig, FileConfig};
use pezzottify_recommender::metrics;
use pezzottify_recommender::recommender::{MissingGenrePolicy, Snapshot, SnapshotFactory};
use pezzottify_recommender::service::RecommenderService;

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles = get_styles())]
struct CliArgs {
    /// Catalog to load (SQLite database or JSON array).
    #[clap(value_parser = parse_path)]
    pub catalog_path: Option<PathBuf>,

    /// TOML configuration file. Values in the file override arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,
}

#[derive(Parser)]
#[command(styles = get_styles(), name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Tracks similar to the seed, same-artist candidates downranked.
    Recommend {
        track_id: String,
        #[clap(short = 'k', long = "limit")]
        limit: Option<usize>,
        #[clap(long)]
        penalty: Option<f64>,
    },

    /// Raw similarity of the nearest tracks.
    Scores {
        track_id: String,
        #[clap(short = 'k', long = "limit")]
        limit: Option<usize>,
    },

    /// Measures consistency over a sample of seeds.
    Evaluate {
        #[clap(long)]
        sample_size: Option<usize>,
        #[clap(short = 'k', long = "limit")]
        limit: Option<usize>,
        #[clap(long)]
        seed: Option<u64>,
        #[clap(long)]
        missing_genre_policy: Option<MissingGenrePolicy>,
    },

    /// Tracks matching a free-text description.
    Like {
        #[clap(required = true)]
        words: Vec<String>,
        #[clap(short = 'k', long = "limit")]
        limit: Option<usize>,
    },

    /// Shows a track's metadata and the document it was indexed with.
    Show { track_id: String },

    /// Reloads the catalog and swaps in a new snapshot.
    Reload,

    /// Shows the live snapshot's size and generation.
    Stats,

    /// Prints the metrics registry.
    Metrics,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

struct Session {
    factory: Arc<SnapshotFactory>,
    service: RecommenderService,
    app_config: AppConfig,
}

const PROMPT: &str = ">> ";

fn execute_command(line: String, session: &Session) -> CommandExecutionResult {
    if line.trim().is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());
    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    let cli = match cli {
        Ok(cli) => cli,
        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
            return CommandExecutionResult::Ok;
        }
    };

    println!("{} {}", PROMPT, &line);
    match cli.command {
        InnerCommand::Recommend {
            track_id,
            limit,
            penalty,
        } => match session.service.recommend(&track_id, limit, penalty) {
            Ok(recs) if recs.is_empty() => print_warning("No recommendations"),
            Ok(recs) => {
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
            Err(err) => return CommandExecutionResult::Error(err.to_string()),
        },
        InnerCommand::Scores { track_id, limit } => {
            match session.service.item_scores(&track_id, limit) {
                Ok(scores) => {
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
                Err(err) => return CommandExecutionResult::Error(err.to_string()),
            }
        }
        InnerCommand::Evaluate {
            sample_size,
            limit,
            seed,
            missing_genre_policy,
        } => {
            let mut options = session.app_config.evaluation.options();
            options.sample_size = sample_size.unwrap_or(options.sample_size);
            options.top_k = limit.unwrap_or(options.top_k);
            options.seed = seed.unwrap_or(options.seed);
            options.missing_genre_policy =
                missing_genre_policy.unwrap_or(options.missing_genre_policy);

            let start = Instant::now();
            let report = session.service.evaluate(&options);
            print_section_header("Evaluation");
            print_key_value("Artist consistency", &format_ratio(report.artist_consistency));
            print_key_value("Genre consistency", &format_ratio(report.genre_consistency));
            print_key_value("Album consistency", &format_ratio(report.album_consistency));
            print_key_value("Average similarity", &format_ratio(report.average_similarity));
            print_key_value(
                "Seeds",
                &format!(
                    "{} sampled, {} evaluated, {} with genre",
                    report.sampled_seeds, report.evaluated_seeds, report.genre_evaluated_seeds
                ),
            );
            print_key_value("Policy", options.missing_genre_policy.as_str());
            print_key_value("Took", &format!("{:?}", start.elapsed()));
            print_section_footer();
        }
        InnerCommand::Like { words, limit } => {
            let text = words.join(" ");
            let matches = session.service.match_text(&text, limit);
            if matches.is_empty() {
                print_warning(&format!("Nothing in the catalog matches \"{}\"", text));
                return CommandExecutionResult::Ok;
            }
            let snapshot = session.service.snapshot();
            let mut table = TableBuilder::new(vec!["#", "track", "title", "artist", "similarity"]);
            for (i, item) in matches.iter().enumerate() {
                let track = snapshot.track_by_id(&item.track_id);
                table.add_row(vec![
                    (i + 1).to_string(),
                    item.track_id.clone(),
                    track.map(|t| t.title().to_string()).unwrap_or_default(),
                    track.map(|t| t.artist().to_string()).unwrap_or_default(),
                    format!("{:.4}", item.score),
                ]);
            }
            table.print();
        }
        InnerCommand::Show { track_id } => {
            let snapshot = session.service.snapshot();
            let track = match snapshot.track_by_id(&track_id) {
                Some(track) => track,
                None => {
                    return CommandExecutionResult::Error(format!("Unknown track id: {}", track_id))
                }
            };
            print_section_header(&track.track_id);
            print_key_value("Title", track.title());
            print_key_value("Artist", track.artist());
            print_key_value("Album", track.album_title.as_deref().unwrap_or("-"));
            print_key_value("Major genre", track.major_genre.as_deref().unwrap_or("-"));
            let genres = track
                .genres_list
                .as_ref()
                .map(|g| g.to_delimited())
                .unwrap_or_else(|| "-".to_string());
            print_key_value("Genres", &genres);
            let tags = track
                .tags_list
                .as_ref()
                .map(|t| t.to_delimited())
                .unwrap_or_else(|| "-".to_string());
            print_key_value("Tags", &tags);
            let row = snapshot.row_of(&track_id);
            let document = row.and_then(|row| snapshot.document(row)).unwrap_or("");
            print_key_value("Document", document);
            print_key_value("Top terms", &top_terms(&snapshot, document));
            print_section_footer();
        }
        InnerCommand::Reload => {
            let start = Instant::now();
            let result = session.factory.rebuild();
            metrics::record_snapshot_build(result.is_ok(), start.elapsed());
            match result {
                Ok(handle) => {
                    let snapshot = handle.current();
                    metrics::set_live_snapshot(&snapshot);
                    print_success(&format!(
                        "Generation {} live with {} tracks",
                        snapshot.generation(),
                        snapshot.len()
                    ));
                }
                Err(err) => {
                    return CommandExecutionResult::Error(format!(
                        "Reload failed, keeping the current snapshot: {:#}",
                        err
                    ))
                }
            }
        }
        InnerCommand::Stats => {
            let snapshot = session.service.snapshot();
            print_section_header("Snapshot");
            print_key_value("Catalog", &session.factory.source().describe());
            print_key_value("Generation", &snapshot.generation().to_string());
            print_key_value("Built at", &snapshot.built_at().to_rfc3339());
            print_key_value("Tracks", &snapshot.len().to_string());
            print_key_value("Vocabulary", &snapshot.vocabulary_size().to_string());
            print_key_value("Neighbor cap", &snapshot.neighbor_cap().to_string());
            let defaults = session.service.defaults();
            print_key_value("Default top-k", &defaults.top_k.to_string());
            print_key_value(
                "Default same-artist penalty",
                &defaults.same_artist_penalty.to_string(),
            );
            print_section_footer();
        }
        InnerCommand::Metrics => {
            print!("{}", metrics::gather_text());
        }
        InnerCommand::Exit => return CommandExecutionResult::Exit,
    }
    CommandExecutionResult::Ok
}

const TOP_TERMS: usize = 5;

/// Heaviest terms of a document with their idf, e.g. `majgenre_rock (2.10)`.
fn top_terms(snapshot: &Snapshot, document: &str) -> String {
    let model = snapshot.model();
    let row = model.transform(document);
    let mut weighted: Vec<(usize, f64)> = row.indices.into_iter().zip(row.values).collect();
    weighted.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let terms: Vec<String> = weighted
        .into_iter()
        .take(TOP_TERMS)
        .filter_map(|(col, _)| {
            let term = model.terms().get(col)?;
            let idf = model.idf(term)?;
            Some(format!("{} ({:.2})", term, idf))
        })
        .collect();
    if terms.is_empty() {
        "-".to_string()
    } else {
        terms.join(", ")
    }
}

#[derive(rustyline_derive::Hinter)]
struct CommandHelper {
    commands_names: Vec<String>,
}

impl CommandHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        CommandHelper { commands_names }
    }
}

impl Completer for CommandHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::new()));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .cloned()
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for CommandHelper {}
impl Validator for CommandHelper {}
impl Helper for CommandHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    // Quiet by default so log lines don't interleave with tables
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;
    metrics::init_metrics();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        catalog_path: cli_args.catalog_path.clone(),
        ..Default::default()
    };
    let app_config = AppConfig::resolve(&cli_config, file_config)?;

    let factory = Arc::new(SnapshotFactory::new(
        app_config.catalog_source()?,
        app_config.recommender.snapshot_options(),
    ));
    let start = Instant::now();
    let built = factory.get_or_build();
    metrics::record_snapshot_build(built.is_ok(), start.elapsed());
    let handle = built?;
    metrics::set_live_snapshot(&handle.current());

    let service = RecommenderService::new(handle, (&app_config.recommender).into());
    let session = Session {
        factory,
        service,
        app_config,
    };

    print_welcome(&session.factory.source().describe());

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();
    let mut rl = Editor::<CommandHelper, FileHistory>::with_config(config)?;
    rl.set_helper(Some(CommandHelper::new()));

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &session) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => break,
                    CommandExecutionResult::Error(err) => print_error(&err),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                print_error(&format!("{:?}", e));
                break;
            }
        }
    }
    Ok(())
}
