//! Volume-count trees and their time-axis fold.
//!
//! Every level of a count tree is declared as either a structural level
//! (group, role or actor, keys kept verbatim) or the time level. Folding
//! regroups time levels and recurses through structural ones until it
//! reaches `{count, stats}` leaves.

use super::leaf::StatSamples;
use super::reduce::StatisticSummary;
use crate::error::RollupError;
use crate::models::{Resolution, TimeKey};
use serde::Serialize;
use std::collections::BTreeMap;

/// Non-time axis of a count tree level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Group,
    Role,
    Actor,
}

impl Axis {
    fn level_name(&self) -> &'static str {
        match self {
            Axis::Group => "group level",
            Axis::Role => "role level",
            Axis::Actor => "actor level",
        }
    }
}

/// Raw volume plus the statistic samples of records that passed filtering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountLeaf {
    pub count: u64,
    pub stats: StatSamples,
}

/// One step of a path into a count tree.
#[derive(Debug, Clone, PartialEq)]
pub enum PathStep {
    Structural(Axis, String),
    Time(TimeKey),
}

impl PathStep {
    fn level_name(step: Option<&PathStep>) -> &'static str {
        match step {
            Some(PathStep::Structural(axis, _)) => axis.level_name(),
            Some(PathStep::Time(_)) => "time level",
            None => "leaf",
        }
    }

    fn key(&self) -> String {
        match self {
            PathStep::Structural(_, key) => key.clone(),
            PathStep::Time(time) => time.to_string(),
        }
    }
}

/// A typed count tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum CountNode {
    Structural {
        axis: Axis,
        children: BTreeMap<String, CountNode>,
    },
    Time(BTreeMap<TimeKey, CountNode>),
    Leaf(CountLeaf),
}

impl CountNode {
    /// An empty node of the shape `step` expects.
    fn empty_for(step: Option<&PathStep>) -> CountNode {
        match step {
            Some(PathStep::Structural(axis, _)) => CountNode::Structural {
                axis: *axis,
                children: BTreeMap::new(),
            },
            Some(PathStep::Time(_)) => CountNode::Time(BTreeMap::new()),
            None => CountNode::Leaf(CountLeaf::default()),
        }
    }

    fn level_name(&self) -> &'static str {
        match self {
            CountNode::Structural { axis, .. } => axis.level_name(),
            CountNode::Time(_) => "time level",
            CountNode::Leaf(_) => "leaf",
        }
    }

    fn descend<'a>(
        &'a mut self,
        steps: &[PathStep],
        path: &str,
    ) -> Result<&'a mut CountLeaf, RollupError> {
        let expected = self.level_name();
        let fits = match (&*self, steps.first()) {
            (CountNode::Leaf(_), None) => true,
            (CountNode::Structural { axis, .. }, Some(PathStep::Structural(step_axis, _))) => {
                axis == step_axis
            }
            (CountNode::Time(_), Some(PathStep::Time(_))) => true,
            _ => false,
        };
        let mismatch = || RollupError::ShapeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            found: PathStep::level_name(steps.first()).to_string(),
        };
        if !fits {
            return Err(mismatch());
        }

        match (self, steps.split_first()) {
            (CountNode::Leaf(leaf), None) => Ok(leaf),
            (
                CountNode::Structural { children, .. },
                Some((PathStep::Structural(_, key), rest)),
            ) => children
                .entry(key.clone())
                .or_insert_with(|| CountNode::empty_for(rest.first()))
                .descend(rest, &join(path, key)),
            (CountNode::Time(children), Some((PathStep::Time(time), rest))) => children
                .entry(*time)
                .or_insert_with(|| CountNode::empty_for(rest.first()))
                .descend(rest, &join(path, &time.to_string())),
            _ => Err(mismatch()),
        }
    }

    /// Merge a node of the same shape: counts add, samples concatenate.
    pub fn merge(&mut self, other: CountNode, path: &str) -> Result<(), RollupError> {
        match (self, other) {
            (CountNode::Leaf(mine), CountNode::Leaf(theirs)) => {
                mine.count += theirs.count;
                mine.stats.merge(&theirs.stats);
            }
            (
                CountNode::Structural {
                    axis: my_axis,
                    children: mine,
                },
                CountNode::Structural {
                    axis: their_axis,
                    children: theirs,
                },
            ) if *my_axis == their_axis => merge_children(mine, theirs, path)?,
            (CountNode::Time(mine), CountNode::Time(theirs)) => merge_children(mine, theirs, path)?,
            (mine, theirs) => {
                return Err(RollupError::ShapeMismatch {
                    path: path.to_string(),
                    expected: mine.level_name().to_string(),
                    found: theirs.level_name().to_string(),
                })
            }
        }
        Ok(())
    }

    /// Regroup every time level to `resolution`, recursing through
    /// structural levels.
    pub fn fold(&self, resolution: Resolution) -> Result<CountNode, RollupError> {
        self.fold_at(resolution, "")
    }

    fn fold_at(&self, resolution: Resolution, path: &str) -> Result<CountNode, RollupError> {
        match self {
            CountNode::Leaf(leaf) => Ok(CountNode::Leaf(leaf.clone())),
            CountNode::Structural { axis, children } => {
                let children: BTreeMap<String, CountNode> = children
                    .iter()
                    .map(|(key, child)| {
                        child
                            .fold_at(resolution, &join(path, key))
                            .map(|folded| (key.clone(), folded))
                    })
                    .collect::<Result<_, _>>()?;
                Ok(CountNode::Structural {
                    axis: *axis,
                    children,
                })
            }
            CountNode::Time(children) => {
                let mut folded: BTreeMap<TimeKey, CountNode> = BTreeMap::new();
                for (time, child) in children {
                    let key = time.coarsen(resolution);
                    let child_path = join(path, &key.to_string());
                    let child = child.fold_at(resolution, &child_path)?;
                    match folded.get_mut(&key) {
                        Some(existing) => existing.merge(child, &child_path)?,
                        None => {
                            folded.insert(key, child);
                        }
                    }
                }
                Ok(CountNode::Time(folded))
            }
        }
    }

    /// Reduce every leaf to `{count, stats}` with summarized samples.
    pub fn reduce(&self) -> CountResultNode {
        match self {
            CountNode::Leaf(leaf) => CountResultNode::Leaf(CountSummary {
                count: leaf.count,
                stats: StatisticSummary::of(&leaf.stats),
            }),
            CountNode::Structural { children, .. } => CountResultNode::Branch(
                children
                    .iter()
                    .map(|(key, child)| (key.clone(), child.reduce()))
                    .collect(),
            ),
            CountNode::Time(children) => CountResultNode::Branch(
                children
                    .iter()
                    .map(|(time, child)| (time.to_string(), child.reduce()))
                    .collect(),
            ),
        }
    }

    /// Sum of every leaf count below this node.
    pub fn total(&self) -> u64 {
        match self {
            CountNode::Leaf(leaf) => leaf.count,
            CountNode::Structural { children, .. } => children.values().map(CountNode::total).sum(),
            CountNode::Time(children) => children.values().map(CountNode::total).sum(),
        }
    }
}

fn merge_children<K: Ord + ToString>(
    mine: &mut BTreeMap<K, CountNode>,
    theirs: BTreeMap<K, CountNode>,
    path: &str,
) -> Result<(), RollupError> {
    for (key, child) in theirs {
        let child_path = join(path, &key.to_string());
        match mine.get_mut(&key) {
            Some(existing) => existing.merge(child, &child_path)?,
            None => {
                mine.insert(key, child);
            }
        }
    }
    Ok(())
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", path, key)
    }
}

/// Builder for a count tree. Nested levels are allocated on first write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountTree {
    root: Option<CountNode>,
}

impl CountTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// The leaf at `path`, creating every missing level on the way.
    ///
    /// A path whose step kinds disagree with levels already built is a
    /// shape mismatch.
    pub fn leaf_mut(&mut self, path: &[PathStep]) -> Result<&mut CountLeaf, RollupError> {
        let root = self
            .root
            .get_or_insert_with(|| CountNode::empty_for(path.first()));
        root.descend(path, "")
            .map_err(|err| annotate(err, path))
    }

    #[allow(dead_code)] // Inspection helper
    pub fn root(&self) -> Option<&CountNode> {
        self.root.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Fold the whole tree to `resolution`.
    pub fn fold(&self, resolution: Resolution) -> Result<Option<CountNode>, RollupError> {
        self.root.as_ref().map(|root| root.fold(resolution)).transpose()
    }

    pub fn total(&self) -> u64 {
        self.root.as_ref().map_or(0, CountNode::total)
    }
}

fn annotate(err: RollupError, path: &[PathStep]) -> RollupError {
    match err {
        RollupError::ShapeMismatch {
            path: at,
            expected,
            found,
        } if at.is_empty() => RollupError::ShapeMismatch {
            path: path.iter().map(PathStep::key).collect::<Vec<_>>().join("/"),
            expected,
            found,
        },
        other => other,
    }
}

/// The two orderings of one category's volume counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountIndex {
    /// Time level above the actor level.
    pub by_date: CountTree,
    /// Actor level above the time level.
    pub by_name: CountTree,
}

impl CountIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` records and their samples under both orderings.
    pub fn record(
        &mut self,
        by_date: &[PathStep],
        by_name: &[PathStep],
        count: u64,
        stats: &StatSamples,
    ) -> Result<(), RollupError> {
        for (tree, path) in [(&mut self.by_date, by_date), (&mut self.by_name, by_name)] {
            let leaf = tree.leaf_mut(path)?;
            leaf.count += count;
            leaf.stats.merge(stats);
        }
        Ok(())
    }

    pub fn total(&self) -> u64 {
        self.by_date.total()
    }
}

/// `{count, stats}` after reduction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountSummary {
    pub count: u64,
    pub stats: StatisticSummary,
}

/// A reduced count tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CountResultNode {
    Branch(BTreeMap<String, CountResultNode>),
    Leaf(CountSummary),
}

#[allow(dead_code)] // Navigation helpers for reduced trees
impl CountResultNode {
    pub fn child(&self, key: &str) -> Option<&CountResultNode> {
        match self {
            CountResultNode::Branch(children) => children.get(key),
            CountResultNode::Leaf(_) => None,
        }
    }

    pub fn summary(&self) -> Option<&CountSummary> {
        match self {
            CountResultNode::Leaf(summary) => Some(summary),
            CountResultNode::Branch(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatName;

    fn actor(name: &str) -> PathStep {
        PathStep::Structural(Axis::Actor, name.to_string())
    }

    fn month(year: i32, month: u32) -> PathStep {
        PathStep::Time(TimeKey::month(year, month))
    }

    fn sample_tree() -> CountTree {
        let mut tree = CountTree::new();
        for (m, who, count) in [(1, "Bob", 2), (2, "Bob", 3), (2, "Amy", 1)] {
            let leaf = tree.leaf_mut(&[month(2021, m), actor(who)]).unwrap();
            leaf.count += count;
            leaf.stats.push(StatName::WordCount, who, count as f64);
        }
        let leaf = tree.leaf_mut(&[month(2022, 5), actor("Bob")]).unwrap();
        leaf.count += 4;
        tree
    }

    #[test]
    fn test_builder_allocates_levels() {
        let tree = sample_tree();
        match tree.root() {
            Some(CountNode::Time(months)) => assert_eq!(months.len(), 3),
            other => panic!("unexpected root {:?}", other),
        }
        assert_eq!(tree.total(), 10);
    }

    #[test]
    fn test_builder_rejects_shape_mismatch() {
        let mut tree = sample_tree();
        let err = tree.leaf_mut(&[actor("Bob"), month(2021, 1)]).unwrap_err();
        assert!(matches!(err, RollupError::ShapeMismatch { .. }));

        let err = tree.leaf_mut(&[month(2021, 1)]).unwrap_err();
        match err {
            RollupError::ShapeMismatch { path, found, .. } => {
                assert_eq!(path, "2021-01");
                assert_eq!(found, "leaf");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_builder_rejects_wrong_axis() {
        let mut tree = sample_tree();
        let group = PathStep::Structural(Axis::Group, "Chess Club".to_string());
        match tree.leaf_mut(&[month(2021, 1), group]).unwrap_err() {
            RollupError::ShapeMismatch {
                path,
                expected,
                found,
            } => {
                assert_eq!(path, "2021-01");
                assert_eq!(expected, "actor level");
                assert_eq!(found, "group level");
            }
            other => panic!("unexpected error {:?}", other),
        }

        // The failed lookup leaves the tree untouched.
        assert_eq!(tree, sample_tree());
    }

    #[test]
    fn test_fold_annual_and_global() {
        let tree = sample_tree();

        let annual = tree.fold(Resolution::Annual).unwrap().unwrap().reduce();
        let bob_2021 = annual.child("2021").and_then(|n| n.child("Bob")).unwrap();
        let summary = bob_2021.summary().unwrap();
        assert_eq!(summary.count, 5);
        assert!(summary.stats.get(StatName::WordCount).is_some());
        assert_eq!(
            annual.child("2022").and_then(|n| n.child("Bob")).unwrap().summary().unwrap().count,
            4
        );

        let global = tree.fold(Resolution::Global).unwrap().unwrap().reduce();
        let bob = global.child("global").and_then(|n| n.child("Bob")).unwrap();
        assert_eq!(bob.summary().unwrap().count, 9);
        let amy = global.child("global").and_then(|n| n.child("Amy")).unwrap();
        assert_eq!(amy.summary().unwrap().count, 1);
    }

    #[test]
    fn test_fold_recurses_through_structural_levels() {
        let mut tree = CountTree::new();
        for (m, count) in [(1, 1), (2, 2)] {
            let path = [
                PathStep::Structural(Axis::Group, "NonGroup".to_string()),
                actor("Bob"),
                month(2021, m),
            ];
            tree.leaf_mut(&path).unwrap().count += count;
        }

        let global = tree.fold(Resolution::Global).unwrap().unwrap().reduce();
        let leaf = global
            .child("NonGroup")
            .and_then(|n| n.child("Bob"))
            .and_then(|n| n.child("global"))
            .and_then(CountResultNode::summary)
            .unwrap();
        assert_eq!(leaf.count, 3);
    }

    #[test]
    fn test_monthly_fold_is_identity() {
        let tree = sample_tree();
        assert_eq!(tree.fold(Resolution::Monthly).unwrap().as_ref(), tree.root());
    }

    #[test]
    fn test_merge_shape_mismatch() {
        let mut leaf = CountNode::Leaf(CountLeaf::default());
        let time = CountNode::Time(BTreeMap::new());
        assert!(matches!(
            leaf.merge(time, "posts"),
            Err(RollupError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_index_records_both_orderings() {
        let mut index = CountIndex::new();
        let mut stats = StatSamples::new();
        stats.push(StatName::CharCount, "hello", 5.0);

        index
            .record(
                &[month(2021, 3), actor("Bob")],
                &[actor("Bob"), month(2021, 3)],
                2,
                &stats,
            )
            .unwrap();

        let by_name = index.by_name.fold(Resolution::Monthly).unwrap().unwrap().reduce();
        let leaf = by_name
            .child("Bob")
            .and_then(|n| n.child("2021-03"))
            .and_then(CountResultNode::summary)
            .unwrap();
        assert_eq!(leaf.count, 2);
        assert_eq!(index.total(), 2);
        assert_eq!(index.by_name.total(), 2);
    }

    #[test]
    fn test_empty_tree() {
        let tree = CountTree::new();
        assert!(tree.is_empty());
        assert!(tree.fold(Resolution::Global).unwrap().is_none());
    }
}
