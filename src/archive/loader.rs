//! Classified archive loading.
//!
//! Reads the labelled record trees produced by the classification step,
//! either from one JSON document keyed by category or from a directory
//! holding one `<category>.json` file per category.

use super::tree::ActorTree;
use crate::error::ArchiveError;
use crate::models::{Category, Record, RecordKind};
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// All requested categories of one archive.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    pub categories: BTreeMap<Category, ActorTree<Vec<Record>>>,
}

impl Archive {
    /// Number of records stored under a category.
    pub fn record_count(&self, category: Category) -> usize {
        self.categories
            .get(&category)
            .map(|tree| tree.leaves().iter().map(|(_, records)| records.len()).sum())
            .unwrap_or(0)
    }
}

/// Load an archive from a JSON file or a directory of per-category files.
pub fn load_archive(path: &Path, wanted: &[Category]) -> Result<Archive> {
    if path.is_dir() {
        return load_directory(path, wanted);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read archive: {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse archive JSON: {}", path.display()))?;

    let archive = parse_archive(&value, wanted)
        .with_context(|| format!("Invalid archive: {}", path.display()))?;
    log_volume(&archive);
    Ok(archive)
}

fn load_directory(dir: &Path, wanted: &[Category]) -> Result<Archive> {
    let mut archive = Archive::default();

    for category in wanted {
        let file = dir.join(format!("{}.json", category));
        if !file.exists() {
            warn!("No {} file in {}, skipping", category, dir.display());
            continue;
        }

        let content = std::fs::read_to_string(&file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", file.display()))?;

        let mut path = vec![category.to_string()];
        let tree = parse_tree(&value, &mut path)
            .with_context(|| format!("Invalid archive file: {}", file.display()))?;
        archive.categories.insert(*category, tree);
    }

    log_volume(&archive);
    Ok(archive)
}

fn log_volume(archive: &Archive) {
    for category in archive.categories.keys() {
        info!(
            "Loaded {} {} records",
            archive.record_count(*category),
            category
        );
    }
}

/// Parse a whole-archive document: an object keyed by category name.
pub fn parse_archive(value: &Value, wanted: &[Category]) -> Result<Archive, ArchiveError> {
    let object = value.as_object().ok_or(ArchiveError::UnexpectedLeaf {
        path: String::new(),
        found: json_type_name(value),
    })?;

    let mut archive = Archive::default();
    for (name, subtree) in object {
        let category: Category = name.parse()?;
        if !wanted.contains(&category) {
            debug!("Skipping category {} (not requested)", category);
            continue;
        }
        let mut path = vec![category.to_string()];
        archive
            .categories
            .insert(category, parse_tree(subtree, &mut path)?);
    }

    Ok(archive)
}

/// Parse one actor tree. Objects nest, arrays are record lists, anything
/// else is rejected.
pub fn parse_tree(
    value: &Value,
    path: &mut Vec<String>,
) -> Result<ActorTree<Vec<Record>>, ArchiveError> {
    match value {
        Value::Object(map) => {
            let mut children = BTreeMap::new();
            for (key, child) in map {
                path.push(key.clone());
                let parsed = parse_tree(child, path);
                path.pop();
                children.insert(key.clone(), parsed?);
            }
            Ok(ActorTree::Branch(children))
        }
        Value::Array(items) => {
            let location = path.join("/");
            items
                .iter()
                .enumerate()
                .map(|(index, item)| parse_record(item, &location, index))
                .collect::<Result<Vec<_>, _>>()
                .map(ActorTree::Leaf)
        }
        other => Err(ArchiveError::UnexpectedLeaf {
            path: path.join("/"),
            found: json_type_name(other),
        }),
    }
}

/// Parse and validate a single record, checking each field on its own.
fn parse_record(value: &Value, path: &str, index: usize) -> Result<Record, ArchiveError> {
    let invalid = |field: &'static str, reason: String| ArchiveError::InvalidField {
        path: path.to_string(),
        index,
        field,
        reason,
    };
    let missing = |field: &'static str| ArchiveError::MissingField {
        path: path.to_string(),
        index,
        field,
    };

    let object = value.as_object().ok_or_else(|| {
        invalid(
            "record",
            format!("expected an object, found {}", json_type_name(value)),
        )
    })?;

    let timestamp = match object.get("timestamp") {
        None | Some(Value::Null) => return Err(missing("timestamp")),
        Some(ts) => ts
            .as_i64()
            .ok_or_else(|| invalid("timestamp", format!("expected an integer, found {}", ts)))?,
    };

    let text = match object.get("text") {
        None | Some(Value::Null) => return Err(missing("text")),
        Some(Value::String(text)) => text.clone(),
        Some(other) => {
            return Err(invalid(
                "text",
                format!("expected a string, found {}", json_type_name(other)),
            ))
        }
    };

    let kind = match object.get("kind") {
        None | Some(Value::Null) => None,
        Some(Value::String(kind)) => Some(match kind.as_str() {
            "Regular" => RecordKind::Regular,
            "Photo" => RecordKind::Photo,
            other => return Err(invalid("kind", format!("unknown kind '{}'", other))),
        }),
        Some(other) => {
            return Err(invalid(
                "kind",
                format!("expected a string, found {}", json_type_name(other)),
            ))
        }
    };

    let group_name = match object.get("group_name") {
        None | Some(Value::Null) => None,
        Some(Value::String(name)) => Some(name.clone()),
        Some(other) => {
            return Err(invalid(
                "group_name",
                format!("expected a string, found {}", json_type_name(other)),
            ))
        }
    };

    Ok(Record {
        timestamp,
        text,
        kind,
        group_name,
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
