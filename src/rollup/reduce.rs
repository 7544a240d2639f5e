//! Reduction of folded leaves to their presentation form.

use super::leaf::{FrequencyMap, Leaf, Sample, StatSamples};
use crate::error::RollupError;
use crate::models::{MapKind, StatName};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Length caps per map kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caps {
    pub rank: usize,
    pub wordcloud: usize,
}

impl Default for Caps {
    fn default() -> Self {
        Self {
            rank: 100,
            wordcloud: 500,
        }
    }
}

impl Caps {
    /// The truncation cap for a map kind, `None` for uncapped kinds.
    pub fn for_kind(&self, kind: MapKind) -> Option<usize> {
        if kind.is_rank() {
            Some(self.rank)
        } else if kind.is_wordcloud() {
            Some(self.wordcloud)
        } else {
            None
        }
    }
}

/// `(term, count)` pairs, most frequent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedList(pub Vec<(String, u64)>);

impl RankedList {
    /// Sort descending by count, keeping input order among equal counts,
    /// then truncate to `cap`.
    pub fn rank(mut entries: Vec<(String, u64)>, cap: Option<usize>) -> Self {
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        if let Some(cap) = cap {
            entries.truncate(cap);
        }
        RankedList(entries)
    }

    pub fn from_frequencies(map: FrequencyMap, cap: Option<usize>) -> Self {
        Self::rank(map.into_entries(), cap)
    }

    /// Re-apply ranking to an existing list. A no-op on reduced output.
    #[cfg(test)]
    pub fn reduce(self, cap: Option<usize>) -> Self {
        Self::rank(self.0, cap)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn top(&self, n: usize) -> &[(String, u64)] {
        &self.0[..n.min(self.0.len())]
    }
}

/// Summary of one statistic's sample list.
#[derive(Debug, Clone, PartialEq)]
pub enum StatSummary {
    /// Two or more samples.
    Spread {
        avg: f64,
        med: f64,
        std: f64,
        max: Sample,
        min: Sample,
    },
    /// Exactly one sample; spread figures would be meaningless.
    Only(Sample),
}

impl StatSummary {
    /// Summarize a sample list. Empty lists have no summary.
    ///
    /// Among samples sharing the extreme value, the first seen is reported
    /// as both max and min.
    pub fn of(samples: &[Sample]) -> Option<Self> {
        match samples {
            [] => None,
            [only] => Some(StatSummary::Only(only.clone())),
            [first, rest @ ..] => {
                let n = samples.len() as f64;
                let avg = samples.iter().map(|s| s.value).sum::<f64>() / n;
                let variance = samples
                    .iter()
                    .map(|s| (s.value - avg).powi(2))
                    .sum::<f64>()
                    / n;

                let mut max = first;
                let mut min = first;
                for sample in rest {
                    if sample.value > max.value {
                        max = sample;
                    }
                    if sample.value < min.value {
                        min = sample;
                    }
                }

                Some(StatSummary::Spread {
                    avg,
                    med: median(samples),
                    std: variance.sqrt(),
                    max: max.clone(),
                    min: min.clone(),
                })
            }
        }
    }
}

fn median(samples: &[Sample]) -> f64 {
    let mut values: Vec<f64> = samples.iter().map(|s| s.value).collect();
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Summaries for every statistic of a leaf.
///
/// Serializes flat: `wordcount_avg`, `wordcount_med`, `wordcount_std`,
/// `wordcount_max`, `wordcount_min`, or `wordcount_only`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticSummary(pub BTreeMap<StatName, StatSummary>);

impl StatisticSummary {
    pub fn of(samples: &StatSamples) -> Self {
        StatisticSummary(
            samples
                .iter()
                .filter_map(|(stat, list)| StatSummary::of(list).map(|s| (stat, s)))
                .collect(),
        )
    }

    pub fn get(&self, stat: StatName) -> Option<&StatSummary> {
        self.0.get(&stat)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum SummaryField<'a> {
    Number(f64),
    Sample(&'a Sample),
}

impl Serialize for StatisticSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut fields: Vec<(String, SummaryField<'_>)> = Vec::new();
        for (stat, summary) in &self.0 {
            match summary {
                StatSummary::Spread {
                    avg,
                    med,
                    std,
                    max,
                    min,
                } => {
                    fields.push((format!("{}_avg", stat), SummaryField::Number(*avg)));
                    fields.push((format!("{}_med", stat), SummaryField::Number(*med)));
                    fields.push((format!("{}_std", stat), SummaryField::Number(*std)));
                    fields.push((format!("{}_max", stat), SummaryField::Sample(max)));
                    fields.push((format!("{}_min", stat), SummaryField::Sample(min)));
                }
                StatSummary::Only(sample) => {
                    fields.push((format!("{}_only", stat), SummaryField::Sample(sample)));
                }
            }
        }
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for (key, value) in &fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// The reduced form of a leaf.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultEntry {
    Ranked(RankedList),
    Summary(StatisticSummary),
}

impl ResultEntry {
    pub fn as_ranked(&self) -> Option<&RankedList> {
        match self {
            ResultEntry::Ranked(list) => Some(list),
            ResultEntry::Summary(_) => None,
        }
    }

    pub fn as_summary(&self) -> Option<&StatisticSummary> {
        match self {
            ResultEntry::Summary(summary) => Some(summary),
            ResultEntry::Ranked(_) => None,
        }
    }
}

/// Reduce a folded leaf according to its map kind.
pub fn reduce_leaf(kind: MapKind, leaf: Leaf, caps: &Caps) -> Result<ResultEntry, RollupError> {
    match (kind, leaf) {
        (MapKind::Statistics, Leaf::Samples(samples)) => {
            Ok(ResultEntry::Summary(StatisticSummary::of(&samples)))
        }
        (MapKind::Statistics, other) => Err(RollupError::Irreducible {
            kind: kind.to_string(),
            leaf: other.kind_name(),
        }),
        (kind, Leaf::Frequency(map)) => Ok(ResultEntry::Ranked(RankedList::from_frequencies(
            map,
            caps.for_kind(kind),
        ))),
        (kind, other) => Err(RollupError::Irreducible {
            kind: kind.to_string(),
            leaf: other.kind_name(),
        }),
    }
}

/// Reduce a leaf named by its map-kind string. Unknown names are rejected.
#[cfg(test)]
pub fn reduce_named(kind: &str, leaf: Leaf, caps: &Caps) -> Result<ResultEntry, RollupError> {
    reduce_leaf(kind.parse()?, leaf, caps)
}
