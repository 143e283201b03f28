mod file_config;

pub use file_config::{EvaluationConfig, FileConfig, RecommenderConfig, RefreshConfig};

use crate::catalog_source::{CatalogSource, JsonCatalogSource, SqliteCatalogSource};
use crate::recommender::{
    DocumentWeights, EvaluationOptions, MissingGenrePolicy, SnapshotOptions,
    DEFAULT_EVALUATION_SEED, DEFAULT_NEIGHBOR_CAP,
};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_SAME_ARTIST_PENALTY: f64 = 0.5;
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 6 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CatalogFormat {
    Sqlite,
    Json,
}

impl CatalogFormat {
    /// `.json` files are JSON, everything else is SQLite.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => CatalogFormat::Json,
            _ => CatalogFormat::Sqlite,
        }
    }
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub catalog_path: Option<PathBuf>,
    pub catalog_format: Option<CatalogFormat>,
    pub top_k: usize,
    pub same_artist_penalty: f64,
    pub neighbor_cap: usize,
    pub max_features: Option<usize>,
    pub refresh_interval_secs: u64,
    pub evaluation_interval_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            catalog_format: None,
            top_k: DEFAULT_TOP_K,
            same_artist_penalty: DEFAULT_SAME_ARTIST_PENALTY,
            neighbor_cap: DEFAULT_NEIGHBOR_CAP,
            max_features: None,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            evaluation_interval_secs: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub catalog_path: PathBuf,
    pub catalog_format: CatalogFormat,
    pub log_level: Option<String>,

    // Feature configs (with defaults)
    pub recommender: RecommenderSettings,
    pub evaluation: EvaluationSettings,
    pub refresh: RefreshSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommenderSettings {
    pub top_k: usize,
    pub same_artist_penalty: f64,
    pub neighbor_cap: usize,
    pub max_features: Option<usize>,
    pub weights: DocumentWeights,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            same_artist_penalty: DEFAULT_SAME_ARTIST_PENALTY,
            neighbor_cap: DEFAULT_NEIGHBOR_CAP,
            max_features: None,
            weights: DocumentWeights::default(),
        }
    }
}

impl RecommenderSettings {
    pub fn snapshot_options(&self) -> SnapshotOptions {
        SnapshotOptions {
            weights: self.weights.clone(),
            max_features: self.max_features,
            neighbor_cap: self.neighbor_cap,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSettings {
    pub sample_size: usize,
    pub top_k: usize,
    pub same_artist_penalty: f64,
    pub seed: u64,
    pub missing_genre_policy: MissingGenrePolicy,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        let options = EvaluationOptions::default();
        Self {
            sample_size: options.sample_size,
            top_k: options.top_k,
            same_artist_penalty: options.same_artist_penalty,
            seed: DEFAULT_EVALUATION_SEED,
            missing_genre_policy: options.missing_genre_policy,
        }
    }
}

impl EvaluationSettings {
    pub fn options(&self) -> EvaluationOptions {
        EvaluationOptions {
            sample_size: self.sample_size,
            top_k: self.top_k,
            same_artist_penalty: self.same_artist_penalty,
            seed: self.seed,
            missing_genre_policy: self.missing_genre_policy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSettings {
    pub interval_secs: u64,
    /// 0 disables the periodic evaluation report.
    pub evaluation_interval_secs: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            evaluation_interval_secs: 0,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let catalog_path = file
            .catalog_path
            .map(PathBuf::from)
            .or_else(|| cli.catalog_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "catalog_path must be specified via --catalog-path or in config file"
                )
            })?;
        if !catalog_path.exists() {
            bail!("Catalog file does not exist: {:?}", catalog_path);
        }

        let catalog_format = match file.catalog_format {
            Some(s) => match parse_catalog_format(&s) {
                Some(format) => format,
                None => bail!("Unknown catalog format: {}", s),
            },
            None => cli
                .catalog_format
                .unwrap_or_else(|| CatalogFormat::from_path(&catalog_path)),
        };

        // Recommender settings - TOML section over CLI
        let rec_file = file.recommender.unwrap_or_default();
        let defaults = DocumentWeights::default();
        let recommender = RecommenderSettings {
            top_k: rec_file.top_k.unwrap_or(cli.top_k),
            same_artist_penalty: rec_file
                .same_artist_penalty
                .unwrap_or(cli.same_artist_penalty),
            neighbor_cap: rec_file.neighbor_cap.unwrap_or(cli.neighbor_cap),
            max_features: rec_file.max_features.or(cli.max_features),
            weights: DocumentWeights {
                genres: rec_file.genres_weight.unwrap_or(defaults.genres),
                tags: rec_file.tags_weight.unwrap_or(defaults.tags),
                major_genre: rec_file.major_genre_weight.unwrap_or(defaults.major_genre),
                artist: rec_file.artist_weight.unwrap_or(defaults.artist),
                album: rec_file.album_weight.unwrap_or(defaults.album),
            },
        };
        if recommender.neighbor_cap == 0 {
            bail!("neighbor_cap must be at least 1");
        }
        validate_top_k(recommender.top_k, recommender.neighbor_cap)?;
        validate_penalty(recommender.same_artist_penalty)?;
        if recommender.max_features == Some(0) {
            bail!("max_features must be at least 1 when set");
        }

        let eval_file = file.evaluation.unwrap_or_default();
        let eval_defaults = EvaluationSettings::default();
        let missing_genre_policy = match eval_file.missing_genre_policy {
            Some(s) => s.parse::<MissingGenrePolicy>().map_err(anyhow::Error::msg)?,
            None => eval_defaults.missing_genre_policy,
        };
        let evaluation = EvaluationSettings {
            sample_size: eval_file.sample_size.unwrap_or(eval_defaults.sample_size),
            top_k: eval_file.top_k.unwrap_or(eval_defaults.top_k),
            same_artist_penalty: eval_file
                .same_artist_penalty
                .unwrap_or(eval_defaults.same_artist_penalty),
            seed: eval_file.seed.unwrap_or(eval_defaults.seed),
            missing_genre_policy,
        };
        validate_top_k(evaluation.top_k, recommender.neighbor_cap)?;
        validate_penalty(evaluation.same_artist_penalty)?;

        let refresh_file = file.refresh.unwrap_or_default();
        let refresh = RefreshSettings {
            interval_secs: refresh_file
                .interval_secs
                .unwrap_or(cli.refresh_interval_secs),
            evaluation_interval_secs: refresh_file
                .evaluation_interval_secs
                .unwrap_or(cli.evaluation_interval_secs),
        };
        if refresh.interval_secs == 0 {
            bail!("refresh interval must be at least 1 second");
        }

        Ok(Self {
            catalog_path,
            catalog_format,
            log_level: file.log_level,
            recommender,
            evaluation,
            refresh,
        })
    }

    /// Opens the configured catalog.
    pub fn catalog_source(&self) -> Result<Arc<dyn CatalogSource>> {
        Ok(match self.catalog_format {
            CatalogFormat::Sqlite => Arc::new(SqliteCatalogSource::open(&self.catalog_path)?),
            CatalogFormat::Json => Arc::new(JsonCatalogSource::new(&self.catalog_path)),
        })
    }
}

fn validate_top_k(top_k: usize, neighbor_cap: usize) -> Result<()> {
    if top_k == 0 {
        bail!("top_k must be at least 1");
    }
    if top_k > neighbor_cap {
        bail!(
            "top_k {} exceeds the neighbor cap {}, raise neighbor_cap to serve it",
            top_k,
            neighbor_cap
        );
    }
    Ok(())
}

fn validate_penalty(penalty: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&penalty) {
        bail!("same_artist_penalty must be within [0, 1], got {}", penalty);
    }
    Ok(())
}

/// Parses a catalog format name, case insensitive.
fn parse_catalog_format(s: &str) -> Option<CatalogFormat> {
    CatalogFormat::from_str(s, true).ok()
}
