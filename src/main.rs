//! Timeroll - time-resolved rollups of a personal text archive
//!
//! A CLI tool that buckets classified posts, comments and messages by
//! calendar time and writes ranked term tables, keyphrase rankings and
//! text statistics at monthly, annual and global resolution.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, config, archive or output failure)

mod analysis;
mod archive;
mod bucket;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod rollup;
mod text;

use analysis::{AnalysisAggregator, CountAggregator, Toolkit};
use anyhow::{Context, Result};
use bucket::{Clock, Daypart, TimeBucketer, TimeCube};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::Category;
use rollup::{CountIndex, RollupEngine, SeriesSet};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};
use text::{BasicTextStats, BuiltinKeyphrases, Stopwords};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        if let Err(e) = handle_init_config() {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    init_logging(&args);

    info!("Timeroll v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args) {
        error!("Rollup failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Handle --init-config: write a default config file.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
    }

    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the archive owner, categories, limits and caps.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

fn spinner(quiet: bool, message: String) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message);
    pb
}

/// Run the complete pipeline.
fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let clock = Clock::from_offset_minutes(config.general.utc_offset_minutes).ok_or_else(|| {
        anyhow::anyhow!(
            "UTC offset out of range: {:?} minutes",
            config.general.utc_offset_minutes
        )
    })?;

    let input = args
        .input
        .clone()
        .context("An input archive is required")?;

    // Step 1: Load the archive
    println!("📥 Loading archive: {}", input.display());
    let archive = archive::load_archive(&input, &config.general.categories)?;
    let records: BTreeMap<Category, usize> = archive
        .categories
        .keys()
        .map(|category| (*category, archive.record_count(*category)))
        .collect();

    // Step 2: Bucket by calendar time
    let bucketer = TimeBucketer::new(clock);
    let cubes: BTreeMap<Category, _> = archive
        .categories
        .into_iter()
        .map(|(category, tree)| (category, bucketer.bucket_tree(tree)))
        .collect();

    if args.dry_run {
        return handle_dry_run(&cubes);
    }

    // Step 3: Aggregate each category
    let stats = BasicTextStats {
        readability_min_words: config.analyzer.readability_min_words,
    };
    let mut stopwords = Stopwords::english();
    if let Some(ref path) = config.analyzer.stopwords_path {
        let added = stopwords.extend_from_file(path)?;
        info!("Loaded {} extra stopwords from {}", added, path.display());
    }
    let keyphrases = BuiltinKeyphrases {
        primary: config.analyzer.primary.clone(),
        secondary: config.analyzer.secondary.clone(),
        stopwords: stopwords.clone(),
    };

    let counter = CountAggregator::new(&config.count, &stats);
    let analyzer = AnalysisAggregator::new(Toolkit {
        stats: &stats,
        keyphrases: &keyphrases,
        stopwords: &stopwords,
        long_token_len: config.analyzer.long_token_len,
    });

    println!("\n🔬 Analysing categories...");
    let owner = config.general.owner.as_str();
    let mut counts: BTreeMap<Category, CountIndex> = BTreeMap::new();
    let mut analyses: BTreeMap<Category, SeriesSet> = BTreeMap::new();
    for (category, tree) in &cubes {
        let pb = spinner(args.quiet, format!("Analysing {}...", category));

        let index = counter.count(*category, tree, owner)?;
        let series = analyzer.analyze(*category, tree, owner)?;
        info!(
            "{}: {} records counted, {} months analysed",
            category,
            index.total(),
            series.months()
        );

        pb.finish_and_clear();
        println!("   ✔ {} ({} records)", category, index.total());
        counts.insert(*category, index);
        analyses.insert(*category, series);
    }

    // Step 4: Roll up and write
    println!("\n📝 Rolling up results...");
    let engine = RollupEngine::new(&config.rollup);
    let parse_results = engine.parse_results(&analyses)?;
    let count_results = engine.count_results(&counts)?;

    let output_dir = &config.general.output_dir;
    let mut written = report::write_json_results(output_dir, &parse_results, &count_results)?;

    let duration = start_time.elapsed().as_secs_f64();
    if args.format == OutputFormat::Markdown {
        let digest = report::Digest {
            metadata: report::DigestMetadata {
                input: input.clone(),
                generated_at: Utc::now(),
                records,
                duration_seconds: duration,
            },
            parse: &parse_results,
            counts: &count_results,
            top: args.digest_top,
        };
        written.push(report::write_digest(output_dir, &digest)?);
    }
    info!("Wrote {} result files", written.len());

    println!("\n📊 Rollup Summary:");
    println!("   Categories: {}", analyses.len());
    println!(
        "   Records: {}",
        counts.values().map(CountIndex::total).sum::<u64>()
    );
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Rollup complete! Results saved to:");
    for path in &written {
        println!("   📄 {}", path.display());
    }

    Ok(())
}

/// Handle --dry-run: print per-category volume and exit.
fn handle_dry_run(cubes: &BTreeMap<Category, archive::ActorTree<TimeCube>>) -> Result<()> {
    println!("\n🔍 Dry run: archive loaded and bucketed (no analysis)...\n");

    if cubes.is_empty() {
        println!("   No records found for the selected categories.");
    }
    for (category, tree) in cubes {
        let leaves = tree.leaves();
        let mut records = 0usize;
        let mut daytime = 0usize;
        let mut days = std::collections::BTreeSet::new();
        for (_, cube) in &leaves {
            for cell in cube.leaves() {
                records += cell.records.len();
                if cell.daypart == Daypart::Day {
                    daytime += cell.records.len();
                }
                days.insert((cell.month, cell.day));
            }
        }
        println!(
            "   📂 {}: {} records from {} sources over {} days ({} by day, {} by night)",
            category,
            records,
            leaves.len(),
            days.len(),
            daytime,
            records - daytime
        );
    }

    println!("\n✅ Dry run complete. No results were written.");
    Ok(())
}
