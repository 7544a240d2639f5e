//! Configuration file handling.
//!
//! This module handles loading, validating and merging configuration from
//! `.timeroll.toml` files.

use crate::models::{Category, MapKind};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".timeroll.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Volume count settings.
    #[serde(default)]
    pub count: CountConfig,

    /// Text analysis settings.
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Rollup and reduction settings.
    #[serde(default)]
    pub rollup: RollupConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Display name of the archive owner. Used as the actor of "Own" comments.
    #[serde(default)]
    pub owner: String,

    /// Directory the result files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Categories to process.
    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,

    /// Fixed UTC offset for reading timestamps. The local zone when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset_minutes: Option<i32>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            output_dir: default_output_dir(),
            categories: default_categories(),
            utc_offset_minutes: None,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_categories() -> Vec<Category> {
    Category::ALL.to_vec()
}

/// Volume count settings.
///
/// Records whose URL-free text falls outside the limits are left out of the
/// statistics samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountConfig {
    #[serde(default = "default_char_limit_min")]
    pub char_limit_min: usize,

    #[serde(default = "default_char_limit_max")]
    pub char_limit_max: usize,

    #[serde(default = "default_word_limit_min")]
    pub word_limit_min: usize,

    #[serde(default = "default_word_limit_max")]
    pub word_limit_max: usize,

    /// Count every raw record (true) or only records that produced samples.
    #[serde(default = "default_true")]
    pub count_filtered: bool,
}

impl Default for CountConfig {
    fn default() -> Self {
        Self {
            char_limit_min: default_char_limit_min(),
            char_limit_max: default_char_limit_max(),
            word_limit_min: default_word_limit_min(),
            word_limit_max: default_word_limit_max(),
            count_filtered: true,
        }
    }
}

fn default_char_limit_min() -> usize {
    1
}

fn default_char_limit_max() -> usize {
    100_000
}

fn default_word_limit_min() -> usize {
    1
}

fn default_word_limit_max() -> usize {
    20_000
}

fn default_true() -> bool {
    true
}

/// Text analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Extra stopwords, one per line, added to the built-in list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopwords_path: Option<PathBuf>,

    /// Tokens longer than this are collapsed and split.
    #[serde(default = "default_long_token_len")]
    pub long_token_len: usize,

    /// Minimum word count for readability scores.
    #[serde(default = "default_readability_min_words")]
    pub readability_min_words: usize,

    #[serde(default)]
    pub primary: PrimaryRankConfig,

    #[serde(default)]
    pub secondary: SecondaryRankConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            stopwords_path: None,
            long_token_len: default_long_token_len(),
            readability_min_words: default_readability_min_words(),
            primary: PrimaryRankConfig::default(),
            secondary: SecondaryRankConfig::default(),
        }
    }
}

fn default_long_token_len() -> usize {
    32
}

fn default_readability_min_words() -> usize {
    3
}

/// Position-weighted n-gram keyphrases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryRankConfig {
    /// Longest candidate phrase, in words.
    #[serde(default = "default_max_ngram")]
    pub max_ngram: usize,

    /// Share of candidates returned per text.
    #[serde(default = "default_top_fraction")]
    pub top_fraction: f64,
}

impl Default for PrimaryRankConfig {
    fn default() -> Self {
        Self {
            max_ngram: default_max_ngram(),
            top_fraction: default_top_fraction(),
        }
    }
}

/// TextRank keywords.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryRankConfig {
    /// Co-occurrence window, in words.
    #[serde(default = "default_window")]
    pub window: usize,

    #[serde(default = "default_top_fraction")]
    pub top_fraction: f64,

    #[serde(default = "default_damping")]
    pub damping: f64,

    #[serde(default = "default_iterations")]
    pub iterations: usize,
}

impl Default for SecondaryRankConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            top_fraction: default_top_fraction(),
            damping: default_damping(),
            iterations: default_iterations(),
        }
    }
}

fn default_max_ngram() -> usize {
    4
}

fn default_top_fraction() -> f64 {
    0.3
}

fn default_window() -> usize {
    2
}

fn default_damping() -> f64 {
    0.85
}

fn default_iterations() -> usize {
    30
}

/// Rollup and reduction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollupConfig {
    /// Length cap of keyphrase rankings.
    #[serde(default = "default_rank_cap")]
    pub rank_cap: usize,

    /// Length cap of term-frequency tables.
    #[serde(default = "default_wordcloud_cap")]
    pub wordcloud_cap: usize,

    /// Length cap of per-actor term-frequency tables.
    #[serde(default = "default_wordcloud_cap")]
    pub user_wordcloud_cap: usize,

    /// Map kinds written to the results.
    #[serde(default = "default_kinds")]
    pub kinds: Vec<MapKind>,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            rank_cap: default_rank_cap(),
            wordcloud_cap: default_wordcloud_cap(),
            user_wordcloud_cap: default_wordcloud_cap(),
            kinds: default_kinds(),
        }
    }
}

fn default_rank_cap() -> usize {
    100
}

fn default_wordcloud_cap() -> usize {
    500
}

fn default_kinds() -> Vec<MapKind> {
    MapKind::ALL.to_vec()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.timeroll.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref owner) = args.owner {
            self.general.owner = owner.clone();
        }
        if let Some(ref output_dir) = args.output_dir {
            self.general.output_dir = output_dir.clone();
        }
        if let Some(ref categories) = args.categories {
            self.general.categories = categories.clone();
        }
        if let Some(offset) = args.utc_offset {
            self.general.utc_offset_minutes = Some(offset);
        }
    }

    /// Check the merged configuration for values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.general.categories.is_empty() {
            bail!("At least one category must be selected");
        }
        if self.general.categories.contains(&Category::Comments)
            && self.general.owner.trim().is_empty()
        {
            bail!(
                "An owner name is required to attribute own comments \
                 (set general.owner or --owner)"
            );
        }
        if let Some(offset) = self.general.utc_offset_minutes {
            if offset.abs() >= 24 * 60 {
                bail!("UTC offset must be within ±24 hours, got {} minutes", offset);
            }
        }

        let count = &self.count;
        if count.char_limit_min > count.char_limit_max {
            bail!(
                "count.char_limit_min ({}) exceeds count.char_limit_max ({})",
                count.char_limit_min,
                count.char_limit_max
            );
        }
        if count.word_limit_min > count.word_limit_max {
            bail!(
                "count.word_limit_min ({}) exceeds count.word_limit_max ({})",
                count.word_limit_min,
                count.word_limit_max
            );
        }

        let analyzer = &self.analyzer;
        if analyzer.long_token_len == 0 {
            bail!("analyzer.long_token_len must be at least 1");
        }
        if analyzer.primary.max_ngram == 0 {
            bail!("analyzer.primary.max_ngram must be at least 1");
        }
        for (name, fraction) in [
            ("primary", analyzer.primary.top_fraction),
            ("secondary", analyzer.secondary.top_fraction),
        ] {
            if !(fraction > 0.0 && fraction <= 1.0) {
                bail!("analyzer.{}.top_fraction must be in (0, 1], got {}", name, fraction);
            }
        }
        if !(0.0..1.0).contains(&analyzer.secondary.damping) {
            bail!("analyzer.secondary.damping must be in [0, 1)");
        }

        let rollup = &self.rollup;
        if rollup.rank_cap == 0 || rollup.wordcloud_cap == 0 || rollup.user_wordcloud_cap == 0 {
            bail!("Rollup caps must be at least 1");
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
