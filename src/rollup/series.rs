//! Time series of leaves per map kind, and their time-axis fold.

use super::leaf::{FrequencyMap, Leaf, StatSamples};
use crate::error::RollupError;
use crate::models::{MapKind, Resolution, TimeKey};
use std::collections::BTreeMap;

/// Leaves keyed by map kind and time key, plus per-actor term counts.
///
/// The analysis aggregator fills one of these per category at monthly
/// resolution; folding produces coarser copies with the same layout.
/// The `wordcloud` kind is not stored directly: it is the sum of all
/// actors' term counts and is derived when results are reduced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesSet {
    pub series: BTreeMap<MapKind, BTreeMap<TimeKey, Leaf>>,
    pub actor_terms: BTreeMap<String, BTreeMap<TimeKey, FrequencyMap>>,
}

impl SeriesSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The frequency map of `kind` at `time`, created on first use.
    pub fn frequency_mut(
        &mut self,
        kind: MapKind,
        time: TimeKey,
    ) -> Result<&mut FrequencyMap, RollupError> {
        let leaf = self
            .series
            .entry(kind)
            .or_default()
            .entry(time)
            .or_insert_with(|| Leaf::Frequency(FrequencyMap::new()));
        match leaf {
            Leaf::Frequency(map) => Ok(map),
            other => Err(RollupError::KindMismatch {
                path: format!("{}/{}", kind, time),
                expected: "frequency",
                found: other.kind_name(),
            }),
        }
    }

    /// The statistic samples at `time`, created on first use.
    pub fn samples_mut(&mut self, time: TimeKey) -> Result<&mut StatSamples, RollupError> {
        let kind = MapKind::Statistics;
        let leaf = self
            .series
            .entry(kind)
            .or_default()
            .entry(time)
            .or_insert_with(|| Leaf::Samples(StatSamples::new()));
        match leaf {
            Leaf::Samples(samples) => Ok(samples),
            other => Err(RollupError::KindMismatch {
                path: format!("{}/{}", kind, time),
                expected: "samples",
                found: other.kind_name(),
            }),
        }
    }

    /// One actor's term counts at `time`, created on first use.
    pub fn actor_terms_mut(&mut self, actor: &str, time: TimeKey) -> &mut FrequencyMap {
        self.actor_terms
            .entry(actor.to_string())
            .or_default()
            .entry(time)
            .or_default()
    }

    pub fn months(&self) -> usize {
        let mut keys: Vec<&TimeKey> = self
            .series
            .values()
            .flat_map(BTreeMap::keys)
            .chain(self.actor_terms.values().flat_map(BTreeMap::keys))
            .collect();
        keys.sort();
        keys.dedup();
        keys.len()
    }

    /// Fold `other` into this set, moving every time key to `resolution`.
    pub fn absorb(&mut self, other: &SeriesSet, resolution: Resolution) -> Result<(), RollupError> {
        for (kind, series) in &other.series {
            let target = self.series.entry(*kind).or_default();
            for (time, leaf) in series {
                let key = time.coarsen(resolution);
                match target.get_mut(&key) {
                    Some(existing) => existing.merge(leaf, &format!("{}/{}", kind, key))?,
                    None => {
                        target.insert(key, leaf.clone());
                    }
                }
            }
        }

        for (actor, series) in &other.actor_terms {
            let target = self.actor_terms.entry(actor.clone()).or_default();
            for (time, terms) in series {
                target.entry(time.coarsen(resolution)).or_default().merge(terms);
            }
        }

        Ok(())
    }

    /// Fold several sets into one at `resolution`.
    pub fn fold<'a>(
        sources: impl IntoIterator<Item = &'a SeriesSet>,
        resolution: Resolution,
    ) -> Result<SeriesSet, RollupError> {
        let mut folded = SeriesSet::new();
        for source in sources {
            folded.absorb(source, resolution)?;
        }
        Ok(folded)
    }

    /// All actors' term counts summed per time key.
    pub fn pooled_terms(&self) -> BTreeMap<TimeKey, FrequencyMap> {
        let mut pooled: BTreeMap<TimeKey, FrequencyMap> = BTreeMap::new();
        for series in self.actor_terms.values() {
            for (time, terms) in series {
                pooled.entry(*time).or_default().merge(terms);
            }
        }
        pooled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatName;

    fn monthly(entries: &[((i32, u32), &[(&str, u64)])]) -> SeriesSet {
        let mut set = SeriesSet::new();
        for ((year, month), terms) in entries {
            let map = set
                .frequency_mut(MapKind::PrimaryRank, TimeKey::month(*year, *month))
                .unwrap();
            for (term, count) in *terms {
                map.add(term, *count);
            }
        }
        set
    }

    fn primary(set: &SeriesSet, time: TimeKey) -> &FrequencyMap {
        match &set.series[&MapKind::PrimaryRank][&time] {
            Leaf::Frequency(map) => map,
            other => panic!("unexpected leaf {:?}", other),
        }
    }

    #[test]
    fn test_fold_to_global_directly_or_via_annual() {
        let set = monthly(&[((2021, 1), &[("a", 3)]), ((2021, 2), &[("a", 2)])]);

        let direct = SeriesSet::fold([&set], Resolution::Global).unwrap();
        assert_eq!(primary(&direct, TimeKey::Global).get("a"), Some(5));

        let annual = SeriesSet::fold([&set], Resolution::Annual).unwrap();
        assert_eq!(primary(&annual, TimeKey::Year(2021)).get("a"), Some(5));
        let via_annual = SeriesSet::fold([&annual], Resolution::Global).unwrap();
        assert_eq!(direct, via_annual);
    }

    #[test]
    fn test_monthly_fold_is_identity() {
        let set = monthly(&[((2020, 12), &[("x", 1)]), ((2021, 1), &[("y", 2)])]);
        let folded = SeriesSet::fold([&set], Resolution::Monthly).unwrap();
        assert_eq!(folded, set);
    }

    #[test]
    fn test_annual_groups_by_year() {
        let set = monthly(&[
            ((2020, 12), &[("x", 1)]),
            ((2021, 1), &[("x", 2)]),
            ((2021, 6), &[("x", 4)]),
        ]);
        let annual = SeriesSet::fold([&set], Resolution::Annual).unwrap();
        assert_eq!(primary(&annual, TimeKey::Year(2020)).get("x"), Some(1));
        assert_eq!(primary(&annual, TimeKey::Year(2021)).get("x"), Some(6));
    }

    #[test]
    fn test_samples_concatenate_across_months() {
        let mut set = SeriesSet::new();
        set.samples_mut(TimeKey::month(2021, 1))
            .unwrap()
            .push(StatName::WordCount, "a", 1.0);
        set.samples_mut(TimeKey::month(2021, 2))
            .unwrap()
            .push(StatName::WordCount, "b", 2.0);

        let global = SeriesSet::fold([&set], Resolution::Global).unwrap();
        match &global.series[&MapKind::Statistics][&TimeKey::Global] {
            Leaf::Samples(samples) => assert_eq!(samples.get(StatName::WordCount).len(), 2),
            other => panic!("unexpected leaf {:?}", other),
        }
    }

    #[test]
    fn test_builder_rejects_kind_mismatch() {
        let mut set = SeriesSet::new();
        set.series
            .entry(MapKind::UrlCount)
            .or_default()
            .insert(TimeKey::month(2021, 1), Leaf::Samples(StatSamples::new()));

        assert!(matches!(
            set.frequency_mut(MapKind::UrlCount, TimeKey::month(2021, 1)),
            Err(RollupError::KindMismatch { expected: "frequency", .. })
        ));
    }

    #[test]
    fn test_pooled_terms_sum_actors() {
        let mut set = SeriesSet::new();
        set.actor_terms_mut("Bob", TimeKey::month(2021, 1)).add("hi", 2);
        set.actor_terms_mut("Amy", TimeKey::month(2021, 1)).add("hi", 1);
        set.actor_terms_mut("Amy", TimeKey::month(2021, 1)).add("yo", 1);

        let pooled = set.pooled_terms();
        let january = &pooled[&TimeKey::month(2021, 1)];
        assert_eq!(january.get("hi"), Some(3));
        assert_eq!(january.len(), 2);
        assert_eq!(set.months(), 1);
    }
}
