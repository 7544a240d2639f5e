//! Foldable leaf values.
//!
//! A leaf is what sits at the bottom of every intermediate map the
//! aggregators build. Leaves of the same kind merge; leaves of different
//! kinds never do.

use crate::error::RollupError;
use crate::models::StatName;
use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

/// Term occurrence counts, remembering the order terms were first seen.
#[derive(Debug, Clone, Default)]
pub struct FrequencyMap {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl FrequencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` occurrences of `term`.
    pub fn add(&mut self, term: &str, count: u64) {
        match self.index.get(term) {
            Some(&i) => self.entries[i].1 += count,
            None => {
                self.index.insert(term.to_string(), self.entries.len());
                self.entries.push((term.to_string(), count));
            }
        }
    }

    /// Sum another map into this one. New terms keep their relative order.
    pub fn merge(&mut self, other: &FrequencyMap) {
        for (term, count) in &other.entries {
            self.add(term, *count);
        }
    }

    pub fn get(&self, term: &str) -> Option<u64> {
        self.index.get(term).map(|&i| self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-seen order.
    #[allow(dead_code)] // Inspection helper
    pub fn entries(&self) -> &[(String, u64)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(String, u64)> {
        self.entries
    }
}

impl PartialEq for FrequencyMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<S: AsRef<str>> FromIterator<(S, u64)> for FrequencyMap {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut map = FrequencyMap::new();
        for (term, count) in iter {
            map.add(term.as_ref(), count);
        }
        map
    }
}

/// One statistic observation and the text it was measured on.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub text: String,
    pub value: f64,
}

impl Sample {
    pub fn new(text: impl Into<String>, value: f64) -> Self {
        Self {
            text: text.into(),
            value,
        }
    }
}

impl Serialize for Sample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.text)?;
        tuple.serialize_element(&self.value)?;
        tuple.end()
    }
}

/// Sample lists per statistic, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatSamples {
    lists: BTreeMap<StatName, Vec<Sample>>,
}

impl StatSamples {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stat: StatName, text: &str, value: f64) {
        self.lists
            .entry(stat)
            .or_default()
            .push(Sample::new(text, value));
    }

    /// Record every `(stat, value)` pair measured on `text`.
    pub fn extend_from(&mut self, text: &str, values: &[(StatName, f64)]) {
        for (stat, value) in values {
            self.push(*stat, text, *value);
        }
    }

    /// Append another set's samples after this one's.
    pub fn merge(&mut self, other: &StatSamples) {
        for (stat, samples) in &other.lists {
            self.lists
                .entry(*stat)
                .or_default()
                .extend(samples.iter().cloned());
        }
    }

    pub fn get(&self, stat: StatName) -> &[Sample] {
        self.lists.get(&stat).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (StatName, &[Sample])> {
        self.lists.iter().map(|(stat, list)| (*stat, list.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.lists.values().all(Vec::is_empty)
    }
}

/// A foldable value.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Frequency(FrequencyMap),
    Samples(StatSamples),
}

impl Leaf {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Leaf::Frequency(_) => "frequency",
            Leaf::Samples(_) => "samples",
        }
    }

    /// Merge a leaf of the same kind into this one: sum frequencies,
    /// concatenate samples. Mixing kinds is an error naming `path`.
    pub fn merge(&mut self, other: &Leaf, path: &str) -> Result<(), RollupError> {
        match (self, other) {
            (Leaf::Frequency(mine), Leaf::Frequency(theirs)) => mine.merge(theirs),
            (Leaf::Samples(mine), Leaf::Samples(theirs)) => mine.merge(theirs),
            (mine, theirs) => {
                return Err(RollupError::KindMismatch {
                    path: path.to_string(),
                    expected: mine.kind_name(),
                    found: theirs.kind_name(),
                })
            }
        }
        Ok(())
    }
}
