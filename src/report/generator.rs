//! Result serialization and Markdown digest generation.
//!
//! The JSON files are complete snapshots of both result families. The
//! digest is a short human-readable view of the global rollup.

use crate::models::{Category, MapKind, Resolution, SortAxis, TimeKey};
use crate::rollup::{
    CountResultNode, CountResults, FamilyResults, ParseResults, StatSummary, StatisticSummary,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const PARSE_RESULTS_FILE: &str = "parse_results.json";
pub const COUNT_RESULTS_FILE: &str = "count_results.json";
pub const DIGEST_FILE: &str = "digest.md";

/// Run details shown at the top of the digest.
#[derive(Debug, Clone)]
pub struct DigestMetadata {
    pub input: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub records: BTreeMap<Category, usize>,
    pub duration_seconds: f64,
}

/// Everything the digest is rendered from.
pub struct Digest<'a> {
    pub metadata: DigestMetadata,
    pub parse: &'a ParseResults,
    pub counts: &'a CountResults,
    /// Entries shown per ranked table.
    pub top: usize,
}

/// Serialize any result family as pretty JSON.
pub fn generate_json<T: Serialize>(results: &T) -> Result<String> {
    serde_json::to_string_pretty(results).map_err(Into::into)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write both result files into `dir`, returning their paths.
pub fn write_json_results(
    dir: &Path,
    parse: &ParseResults,
    counts: &CountResults,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let parse_path = dir.join(PARSE_RESULTS_FILE);
    write_file(&parse_path, &generate_json(parse)?)?;

    let count_path = dir.join(COUNT_RESULTS_FILE);
    write_file(&count_path, &generate_json(counts)?)?;

    Ok(vec![parse_path, count_path])
}

/// Write the Markdown digest into `dir`.
pub fn write_digest(dir: &Path, digest: &Digest<'_>) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(DIGEST_FILE);
    write_file(&path, &generate_markdown_digest(digest))?;
    Ok(path)
}

/// Generate the complete Markdown digest.
pub fn generate_markdown_digest(digest: &Digest<'_>) -> String {
    let mut output = String::new();

    output.push_str("# Timeroll Digest\n\n");
    output.push_str(&generate_metadata_section(&digest.metadata));

    let global = digest.parse.get(&Resolution::Global);
    match global {
        Some(scopes) => {
            output.push_str(&generate_family_section("All Categories", &scopes.cross, digest.top));
            for (category, family) in &scopes.cat {
                let title = format!("Category: {}", category);
                output.push_str(&generate_family_section(&title, family, digest.top));
            }
        }
        None => output.push_str("No analysis results were produced.\n\n"),
    }

    output.push_str(&generate_counts_section(digest.counts));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &DigestMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Input:** `{}`\n", metadata.input.display()));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    for (category, records) in &metadata.records {
        section.push_str(&format!("- **{} records:** {}\n", category, records));
    }
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Top entries of every ranked kind plus the statistic summary.
fn generate_family_section(title: &str, family: &FamilyResults, top: usize) -> String {
    let mut section = String::new();
    section.push_str(&format!("## {}\n\n", title));

    let mut empty = true;
    for kind in MapKind::ALL {
        let Some(ranked) = family.ranked(kind, TimeKey::Global) else {
            continue;
        };
        if ranked.is_empty() {
            continue;
        }
        empty = false;

        section.push_str(&format!("### {}\n\n", kind));
        section.push_str("| # | Term | Count |\n");
        section.push_str("|---:|:---|---:|\n");
        for (i, (term, count)) in ranked.top(top).iter().enumerate() {
            section.push_str(&format!("| {} | {} | {} |\n", i + 1, escape_cell(term), count));
        }
        section.push('\n');
    }

    if let Some(summary) = family
        .entry(MapKind::Statistics, TimeKey::Global)
        .and_then(|entry| entry.as_summary())
    {
        if !summary.is_empty() {
            empty = false;
            section.push_str(&generate_statistics_table(summary));
        }
    }

    if empty {
        section.push_str("Nothing to show.\n\n");
    }

    section
}

fn generate_statistics_table(summary: &StatisticSummary) -> String {
    let mut table = String::new();

    table.push_str("### statistics\n\n");
    table.push_str("| Statistic | Avg | Median | Std | Max | Min |\n");
    table.push_str("|:---|---:|---:|---:|---:|---:|\n");
    for (stat, figures) in &summary.0 {
        match figures {
            StatSummary::Spread {
                avg,
                med,
                std,
                max,
                min,
            } => table.push_str(&format!(
                "| {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} |\n",
                stat, avg, med, std, max.value, min.value
            )),
            StatSummary::Only(sample) => table.push_str(&format!(
                "| {} | {:.2} | | | | |\n",
                stat, sample.value
            )),
        }
    }
    table.push('\n');

    table
}

/// Global record counts per category, one row per top-level key.
fn generate_counts_section(counts: &CountResults) -> String {
    let mut section = String::new();
    section.push_str("## Volume\n\n");

    if counts.is_empty() {
        section.push_str("No records were counted.\n\n");
        return section;
    }

    section.push_str("| Category | Key | Records |\n");
    section.push_str("|:---|:---|---:|\n");
    for (category, resolutions) in counts {
        let Some(CountResultNode::Branch(children)) = resolutions
            .get(&Resolution::Global)
            .and_then(|axes| axes.get(&SortAxis::ByName))
        else {
            continue;
        };

        let mut rows: Vec<(&String, u64)> = children
            .iter()
            .map(|(key, node)| (key, node_total(node)))
            .collect();
        rows.sort_by_key(|(_, total)| std::cmp::Reverse(*total));

        for (key, total) in rows {
            section.push_str(&format!("| {} | {} | {} |\n", category, escape_cell(key), total));
        }
    }
    section.push('\n');

    section
}

fn node_total(node: &CountResultNode) -> u64 {
    match node {
        CountResultNode::Leaf(summary) => summary.count,
        CountResultNode::Branch(children) => children.values().map(node_total).sum(),
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn generate_footer() -> String {
    "---\n\n*Digest generated by timeroll*\n".to_string()
}
