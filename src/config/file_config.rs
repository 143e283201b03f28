use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub catalog_path: Option<String>,
    pub catalog_format: Option<String>,
    pub log_level: Option<String>,

    // Feature configs
    pub recommender: Option<RecommenderConfig>,
    pub evaluation: Option<EvaluationConfig>,
    pub refresh: Option<RefreshConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RecommenderConfig {
    pub top_k: Option<usize>,
    pub same_artist_penalty: Option<f64>,
    pub neighbor_cap: Option<usize>,
    pub max_features: Option<usize>,
    // Document token repeat factors
    pub genres_weight: Option<usize>,
    pub tags_weight: Option<usize>,
    pub major_genre_weight: Option<usize>,
    pub artist_weight: Option<usize>,
    pub album_weight: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct EvaluationConfig {
    pub sample_size: Option<usize>,
    pub top_k: Option<usize>,
    pub same_artist_penalty: Option<f64>,
    pub seed: Option<u64>,
    /// "exclude_from_genre_only", "exclude_from_all" or "count_as_mismatch"
    pub missing_genre_policy: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_secs: Option<u64>,
    /// 0 disables the periodic evaluation report.
    pub evaluation_interval_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
