//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Category;
use clap::Parser;
use std::path::PathBuf;

/// Timeroll - time-resolved rollups of a personal social media archive
///
/// Buckets classified posts, comments and messages by calendar time and
/// rolls them up into term frequencies, keyphrase rankings, text
/// statistics and volume counts at monthly, annual and global resolution.
///
/// Examples:
///   timeroll --input archive.json --owner "Jane Doe"
///   timeroll --input ./classified --categories posts,messages
///   timeroll --input archive.json --format markdown --digest-top 20
///   timeroll --input archive.json --dry-run
///   timeroll --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Classified archive to analyze
    ///
    /// Either one JSON document keyed by category, or a directory holding
    /// posts.json, comments.json and/or messages.json.
    #[arg(short, long, value_name = "PATH", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .timeroll.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Archive owner's display name (actor of "Own" comments)
    #[arg(long, value_name = "NAME", env = "TIMEROLL_OWNER")]
    pub owner: Option<String>,

    /// Directory to write result files to
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Categories to process (comma-separated)
    ///
    /// Example: --categories posts,comments
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub categories: Option<Vec<Category>>,

    /// Read timestamps at a fixed UTC offset instead of the local zone
    #[arg(long, value_name = "MINUTES", allow_hyphen_values = true)]
    pub utc_offset: Option<i32>,

    /// Output format (json, markdown)
    ///
    /// Markdown writes the JSON results plus a digest.md summary.
    #[arg(long, default_value = "json", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Number of terms per ranking shown in the digest
    #[arg(long, default_value = "10", value_name = "N")]
    pub digest_top: usize,

    /// Dry run: load and bucket the archive, print volumes, write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .timeroll.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON result files only (default)
    #[default]
    Json,
    /// JSON result files plus a markdown digest
    Markdown,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input path does not exist: {}", input.display()));
            }
        }

        if let Some(ref categories) = self.categories {
            if categories.is_empty() {
                return Err("At least one category must be given".to_string());
            }
        }

        if let Some(offset) = self.utc_offset {
            if offset.abs() >= 24 * 60 {
                return Err("UTC offset must be within ±1439 minutes".to_string());
            }
        }

        if self.digest_top == 0 {
            return Err("Digest size must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
