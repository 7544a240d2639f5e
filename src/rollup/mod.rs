//! Multi-axis rollup of aggregator output.
//!
//! The engine folds per-category monthly maps along the time axis
//! (monthly, annual, global) and the scope axis (per category or pooled
//! across categories), then reduces every folded leaf to a ranked list or
//! a statistic summary. Volume counts take a separate path through typed
//! count trees but share the same reduction.

pub mod counts;
pub mod leaf;
pub mod reduce;
pub mod series;

pub use counts::{
    Axis, CountIndex, CountLeaf, CountNode, CountResultNode, CountSummary, CountTree, PathStep,
};
pub use leaf::{FrequencyMap, Leaf, Sample, StatSamples};
pub use reduce::{reduce_leaf, Caps, RankedList, ResultEntry, StatSummary, StatisticSummary};
pub use series::SeriesSet;

use crate::config::RollupConfig;
use crate::error::RollupError;
use crate::models::{Category, MapKind, Resolution, SortAxis, TimeKey};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Reduced results of one scope at one resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FamilyResults {
    #[serde(flatten)]
    pub kinds: BTreeMap<MapKind, BTreeMap<TimeKey, ResultEntry>>,
    /// Term counts per actor.
    pub wordcloud_users: BTreeMap<String, BTreeMap<TimeKey, RankedList>>,
}

impl FamilyResults {
    pub fn entry(&self, kind: MapKind, time: TimeKey) -> Option<&ResultEntry> {
        self.kinds.get(&kind).and_then(|series| series.get(&time))
    }

    pub fn ranked(&self, kind: MapKind, time: TimeKey) -> Option<&RankedList> {
        self.entry(kind, time).and_then(ResultEntry::as_ranked)
    }
}

/// Both scopes at one resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScopeResults {
    pub cat: BTreeMap<Category, FamilyResults>,
    pub cross: FamilyResults,
}

/// `resolution → scope → ...` for the analysis maps.
pub type ParseResults = BTreeMap<Resolution, ScopeResults>;

/// `category → resolution → ordering → ... → {count, stats}`.
pub type CountResults =
    BTreeMap<Category, BTreeMap<Resolution, BTreeMap<SortAxis, CountResultNode>>>;

/// Folds and reduces aggregator output.
#[derive(Debug, Clone)]
pub struct RollupEngine {
    caps: Caps,
    user_cap: usize,
    kinds: Vec<MapKind>,
}

impl Default for RollupEngine {
    fn default() -> Self {
        Self::new(&RollupConfig::default())
    }
}

impl RollupEngine {
    pub fn new(config: &RollupConfig) -> Self {
        Self {
            caps: Caps {
                rank: config.rank_cap,
                wordcloud: config.wordcloud_cap,
            },
            user_cap: config.user_wordcloud_cap,
            kinds: config.kinds.clone(),
        }
    }

    fn emits(&self, kind: MapKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Fold `sources` into one family at `resolution` and reduce it.
    pub fn rollup<'a>(
        &self,
        sources: impl IntoIterator<Item = &'a SeriesSet>,
        resolution: Resolution,
    ) -> Result<FamilyResults, RollupError> {
        let folded = SeriesSet::fold(sources, resolution)?;
        self.reduce(folded)
    }

    /// Reduce an already folded family.
    pub fn reduce(&self, folded: SeriesSet) -> Result<FamilyResults, RollupError> {
        let mut results = FamilyResults::default();

        if self.emits(MapKind::Wordcloud) {
            let cap = self.caps.for_kind(MapKind::Wordcloud);
            let pooled: BTreeMap<TimeKey, ResultEntry> = folded
                .pooled_terms()
                .into_iter()
                .map(|(time, terms)| {
                    (
                        time,
                        ResultEntry::Ranked(RankedList::from_frequencies(terms, cap)),
                    )
                })
                .collect();
            if !pooled.is_empty() {
                results.kinds.insert(MapKind::Wordcloud, pooled);
            }
        }

        for (kind, series) in folded.series {
            if !self.emits(kind) {
                continue;
            }
            let reduced = results.kinds.entry(kind).or_default();
            for (time, leaf) in series {
                reduced.insert(time, reduce_leaf(kind, leaf, &self.caps)?);
            }
        }

        results.wordcloud_users = folded
            .actor_terms
            .into_iter()
            .map(|(actor, series)| {
                let ranked = series
                    .into_iter()
                    .map(|(time, terms)| {
                        (time, RankedList::from_frequencies(terms, Some(self.user_cap)))
                    })
                    .collect();
                (actor, ranked)
            })
            .collect();

        Ok(results)
    }

    /// Every resolution, per category and pooled across categories.
    pub fn parse_results(
        &self,
        analyses: &BTreeMap<Category, SeriesSet>,
    ) -> Result<ParseResults, RollupError> {
        let mut results = ParseResults::new();

        for resolution in Resolution::ALL {
            let mut scopes = ScopeResults::default();
            for (category, set) in analyses {
                scopes.cat.insert(*category, self.rollup([set], resolution)?);
            }
            scopes.cross = self.rollup(analyses.values(), resolution)?;

            debug!(
                "Rolled up {:?}: {} categories, {} cross kinds",
                resolution,
                scopes.cat.len(),
                scopes.cross.kinds.len()
            );
            results.insert(resolution, scopes);
        }

        Ok(results)
    }

    /// Every resolution of every category's count trees, both orderings.
    pub fn count_results(
        &self,
        counts: &BTreeMap<Category, CountIndex>,
    ) -> Result<CountResults, RollupError> {
        let mut results = CountResults::new();

        for (category, index) in counts {
            let per_category = results.entry(*category).or_default();
            for resolution in Resolution::ALL {
                let mut axes = BTreeMap::new();
                for (axis, tree) in [
                    (SortAxis::ByDate, &index.by_date),
                    (SortAxis::ByName, &index.by_name),
                ] {
                    if let Some(folded) = tree.fold(resolution)? {
                        axes.insert(axis, folded.reduce());
                    }
                }
                per_category.insert(resolution, axes);
            }
            debug!("Rolled up {} counts ({} records)", category, index.total());
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatName;
    use proptest::prelude::*;

    fn set_with(kind: MapKind, entries: &[((i32, u32), &str, u64)]) -> SeriesSet {
        let mut set = SeriesSet::new();
        for ((year, month), term, count) in entries {
            set.frequency_mut(kind, TimeKey::month(*year, *month))
                .unwrap()
                .add(term, *count);
        }
        set
    }

    fn terms(list: &RankedList) -> Vec<&str> {
        list.0.iter().map(|(t, _)| t.as_str()).collect()
    }

    #[test]
    fn test_global_fold_sums_months() {
        let set = set_with(
            MapKind::PrimaryRank,
            &[((2021, 1), "a", 3), ((2021, 2), "a", 2)],
        );
        let engine = RollupEngine::default();

        let global = engine.rollup([&set], Resolution::Global).unwrap();
        let ranked = global.ranked(MapKind::PrimaryRank, TimeKey::Global).unwrap();
        assert_eq!(ranked.0, vec![("a".to_string(), 5)]);

        let annual = SeriesSet::fold([&set], Resolution::Annual).unwrap();
        let via_annual = engine.rollup([&annual], Resolution::Global).unwrap();
        assert_eq!(global, via_annual);
    }

    #[test]
    fn test_scope_isolation_and_cross_union() {
        let posts = set_with(MapKind::SecondaryRank, &[((2021, 1), "rust", 2)]);
        let comments = set_with(
            MapKind::SecondaryRank,
            &[((2021, 1), "rust", 1), ((2021, 1), "lunch", 4)],
        );
        let mut analyses = BTreeMap::new();
        analyses.insert(Category::Posts, posts);
        analyses.insert(Category::Comments, comments);

        let results = RollupEngine::default().parse_results(&analyses).unwrap();
        let monthly = &results[&Resolution::Monthly];
        let january = TimeKey::month(2021, 1);

        let posts_terms = monthly.cat[&Category::Posts]
            .ranked(MapKind::SecondaryRank, january)
            .unwrap();
        assert_eq!(terms(posts_terms), vec!["rust"]);

        let cross = monthly
            .cross
            .ranked(MapKind::SecondaryRank, january)
            .unwrap();
        assert_eq!(
            cross.0,
            vec![("lunch".to_string(), 4), ("rust".to_string(), 3)]
        );
        assert_eq!(results.len(), 3);
        assert!(results[&Resolution::Global]
            .cross
            .ranked(MapKind::SecondaryRank, TimeKey::Global)
            .is_some());
    }

    #[test]
    fn test_wordcloud_derived_from_actor_terms() {
        let mut set = SeriesSet::new();
        let january = TimeKey::month(2021, 1);
        set.actor_terms_mut("Bob", january).add("pizza", 2);
        set.actor_terms_mut("Amy", january).add("pizza", 1);
        set.actor_terms_mut("Amy", TimeKey::month(2022, 3)).add("tea", 5);

        let annual = RollupEngine::default()
            .rollup([&set], Resolution::Annual)
            .unwrap();
        let cloud = annual.ranked(MapKind::Wordcloud, TimeKey::Year(2021)).unwrap();
        assert_eq!(cloud.0, vec![("pizza".to_string(), 3)]);

        let amy = &annual.wordcloud_users["Amy"];
        assert_eq!(amy[&TimeKey::Year(2022)].0, vec![("tea".to_string(), 5)]);
        assert_eq!(annual.wordcloud_users.len(), 2);
    }

    #[test]
    fn test_caps_and_kind_filter_from_config() {
        let mut set = SeriesSet::new();
        for i in 0..150u64 {
            set.frequency_mut(MapKind::PrimaryRank, TimeKey::month(2021, 1))
                .unwrap()
                .add(&format!("t{}", i), 200 - i);
            set.actor_terms_mut("Bob", TimeKey::month(2021, 1))
                .add(&format!("w{}", i), 200 - i);
        }
        set.samples_mut(TimeKey::month(2021, 1))
            .unwrap()
            .push(StatName::WordCount, "x", 1.0);

        let engine = RollupEngine::new(&RollupConfig {
            rank_cap: 10,
            wordcloud_cap: 20,
            user_wordcloud_cap: 5,
            kinds: vec![MapKind::PrimaryRank, MapKind::Wordcloud],
        });
        let results = engine.rollup([&set], Resolution::Global).unwrap();

        let ranked = |kind| results.ranked(kind, TimeKey::Global).unwrap().len();
        assert_eq!(ranked(MapKind::PrimaryRank), 10);
        assert_eq!(ranked(MapKind::Wordcloud), 20);
        assert_eq!(results.wordcloud_users["Bob"][&TimeKey::Global].len(), 5);
        assert!(results.entry(MapKind::Statistics, TimeKey::Global).is_none());
    }

    #[test]
    fn test_default_caps_truncate_150_terms() {
        let mut set = SeriesSet::new();
        for i in 0..150u64 {
            set.frequency_mut(MapKind::PrimaryRankHeadline, TimeKey::month(2021, 1))
                .unwrap()
                .add(&format!("t{}", i), 1000 - i);
            set.frequency_mut(MapKind::WordcloudHeadline, TimeKey::month(2021, 1))
                .unwrap()
                .add(&format!("t{}", i), 1000 - i);
        }
        let results = RollupEngine::default()
            .rollup([&set], Resolution::Monthly)
            .unwrap();
        let ranked = |kind| results.ranked(kind, TimeKey::month(2021, 1)).unwrap().len();
        assert_eq!(ranked(MapKind::PrimaryRankHeadline), 100);
        assert_eq!(ranked(MapKind::WordcloudHeadline), 150);
    }

    #[test]
    fn test_statistics_reduce_to_summaries() {
        let mut set = SeriesSet::new();
        let samples = set.samples_mut(TimeKey::month(2021, 1)).unwrap();
        samples.push(StatName::WordCount, "x", 5.0);
        samples.push(StatName::WordCount, "y", 7.0);
        samples.push(StatName::Entropy, "x", 1.0);

        let results = RollupEngine::default()
            .rollup([&set], Resolution::Global)
            .unwrap();
        let summary = results
            .entry(MapKind::Statistics, TimeKey::Global)
            .and_then(ResultEntry::as_summary)
            .unwrap();
        assert!(matches!(
            summary.get(StatName::WordCount),
            Some(StatSummary::Spread { avg, .. }) if *avg == 6.0
        ));
        assert!(matches!(
            summary.get(StatName::Entropy),
            Some(StatSummary::Only(_))
        ));
    }

    #[test]
    fn test_count_results_shape() {
        let mut index = CountIndex::new();
        let bob = PathStep::Structural(Axis::Actor, "Bob".to_string());
        for month in [1, 2] {
            let time = PathStep::Time(TimeKey::month(2021, month));
            index
                .record(
                    &[time.clone(), bob.clone()],
                    &[bob.clone(), time],
                    3,
                    &StatSamples::new(),
                )
                .unwrap();
        }
        let mut counts = BTreeMap::new();
        counts.insert(Category::Posts, index);

        let results = RollupEngine::default().count_results(&counts).unwrap();
        let global = &results[&Category::Posts][&Resolution::Global];
        let leaf = global[&SortAxis::ByName]
            .child("Bob")
            .and_then(|n| n.child("global"))
            .and_then(CountResultNode::summary)
            .unwrap();
        assert_eq!(leaf.count, 6);
        assert!(leaf.stats.is_empty());

        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(
            json["posts"]["annual"]["sorted_by_date"]["2021"]["Bob"]["count"],
            6
        );
    }

    #[test]
    fn test_parse_results_serialization_layout() {
        let set = set_with(MapKind::UrlCount, &[((2021, 1), "github.com", 2)]);
        let mut analyses = BTreeMap::new();
        analyses.insert(Category::Posts, set);

        let results = RollupEngine::default().parse_results(&analyses).unwrap();
        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(
            json["monthly"]["cat"]["posts"]["url_count"]["2021-01"],
            serde_json::json!([["github.com", 2]])
        );
        assert_eq!(
            json["global"]["cross"]["url_count"]["global"],
            serde_json::json!([["github.com", 2]])
        );
        assert!(json["annual"]["cross"]["wordcloud_users"].is_object());
    }

    fn arb_series() -> impl Strategy<Value = Vec<((i32, u32), String, u64)>> {
        prop::collection::vec(
            ((2019i32..2022, 1u32..=12), "[a-f]", 1u64..20),
            0..40,
        )
    }

    fn build(entries: &[((i32, u32), String, u64)]) -> SeriesSet {
        let mut set = SeriesSet::new();
        for ((year, month), term, count) in entries {
            let time = TimeKey::month(*year, *month);
            set.frequency_mut(MapKind::PrimaryRank, time)
                .unwrap()
                .add(term, *count);
            set.samples_mut(time)
                .unwrap()
                .push(StatName::WordCount, term, *count as f64);
            set.actor_terms_mut(term, time).add(term, *count);
        }
        set
    }

    proptest! {
        #[test]
        fn test_time_fold_is_associative(entries in arb_series()) {
            let set = build(&entries);
            let engine = RollupEngine::default();

            let direct = engine.rollup([&set], Resolution::Global).unwrap();
            let annual = SeriesSet::fold([&set], Resolution::Annual).unwrap();
            let staged = engine.rollup([&annual], Resolution::Global).unwrap();
            prop_assert_eq!(direct, staged);

            let monthly = SeriesSet::fold([&set], Resolution::Monthly).unwrap();
            prop_assert_eq!(&monthly, &set);
        }

        #[test]
        fn test_cross_scope_equals_union(a in arb_series(), b in arb_series()) {
            let engine = RollupEngine::default();
            let (left, right) = (build(&a), build(&b));

            let cross = engine.rollup([&left, &right], Resolution::Annual).unwrap();
            let mut joined = a.clone();
            joined.extend(b.iter().cloned());
            let union = engine.rollup([&build(&joined)], Resolution::Annual).unwrap();

            // Same totals per term; tie order may differ between the two.
            for (time, entry) in cross.kinds.get(&MapKind::PrimaryRank).into_iter().flatten() {
                let mut got = entry.as_ranked().unwrap().0.clone();
                let mut want = union.ranked(MapKind::PrimaryRank, *time).unwrap().0.clone();
                got.sort();
                want.sort();
                prop_assert_eq!(got, want);
            }
        }
    }
}
