//! Volume counting.
//!
//! Walks every time cube of a category and builds the by-date and by-name
//! count trees. Each cube cell adds its raw record count; only records that
//! survive URL stripping and the length limits contribute statistic samples.

use crate::archive::ActorTree;
use crate::bucket::{CubeLeaf, TimeCube};
use crate::config::CountConfig;
use crate::models::{ActorKey, Category, GroupKey, Record, StatName, TimeKey};
use crate::rollup::{Axis, CountIndex, PathStep, StatSamples};
use crate::text::{scan_urls, TextStatsProvider};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Group label of comments posted in a group without a recorded name.
pub const DEFAULT_GROUP_LABEL: &str = "Other Group";

/// Records of one cell routed to one group label.
#[derive(Default)]
struct Tally {
    seen: u64,
    kept: u64,
    stats: StatSamples,
}

/// Builds count indices from bucketed actor trees.
pub struct CountAggregator<'a> {
    config: &'a CountConfig,
    stats: &'a dyn TextStatsProvider,
}

impl<'a> CountAggregator<'a> {
    pub fn new(config: &'a CountConfig, stats: &'a dyn TextStatsProvider) -> Self {
        Self { config, stats }
    }

    /// Count every cube in `tree`. `owner` is the actor of "Own" comments.
    pub fn count(
        &self,
        category: Category,
        tree: &ActorTree<TimeCube>,
        owner: &str,
    ) -> Result<CountIndex> {
        let mut index = CountIndex::new();

        for (path, cube) in tree.leaves() {
            let key = category.actor_key(&path, owner)?;
            for leaf in cube.leaves() {
                self.count_leaf(category, &key, &leaf, &mut index)
                    .with_context(|| {
                        format!("Failed to count {} at {}", category, path.join("/"))
                    })?;
            }
        }

        debug!("Counted {} {} records", index.total(), category);
        Ok(index)
    }

    fn count_leaf(
        &self,
        category: Category,
        key: &ActorKey,
        leaf: &CubeLeaf<'_>,
        index: &mut CountIndex,
    ) -> Result<()> {
        let actor = key.name();
        let time = PathStep::Time(TimeKey::Month(leaf.month));
        let actor_step = PathStep::Structural(Axis::Actor, actor.to_string());

        // Group comments carry their own label per record, so a single
        // cell may feed several group branches.
        let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
        for record in leaf.records {
            let tally = tallies.entry(group_label(category, key, record)).or_default();
            tally.seen += 1;
            if let Some((text, values)) = self.sample(record) {
                tally.kept += 1;
                tally.stats.extend_from(&text, &values);
            }
        }

        for (label, tally) in tallies {
            let count = if self.config.count_filtered {
                tally.seen
            } else {
                tally.kept
            };
            let group_step = PathStep::Structural(Axis::Group, label);

            let (by_date, by_name) = match (category, key.role) {
                (Category::Posts, _) => (
                    vec![time.clone(), actor_step.clone()],
                    vec![actor_step.clone(), time.clone()],
                ),
                (Category::Comments, Some(role)) => {
                    let role_step =
                        PathStep::Structural(Axis::Role, role.count_label().to_string());
                    (
                        vec![
                            group_step.clone(),
                            role_step.clone(),
                            time.clone(),
                            actor_step.clone(),
                        ],
                        vec![group_step, role_step, actor_step.clone(), time.clone()],
                    )
                }
                _ => (
                    vec![group_step.clone(), time.clone(), actor_step.clone()],
                    vec![group_step, actor_step.clone(), time.clone()],
                ),
            };

            index.record(&by_date, &by_name, count, &tally.stats)?;
        }

        Ok(())
    }

    /// The stripped text and its samples, or `None` when the record is
    /// filtered out of the statistics.
    fn sample(&self, record: &Record) -> Option<(String, Vec<(StatName, f64)>)> {
        let text = scan_urls(&record.text).text;
        if text.is_empty() {
            return None;
        }

        let stats = self.stats.compute(&text);
        let chars = self.config.char_limit_min..=self.config.char_limit_max;
        let words = self.config.word_limit_min..=self.config.word_limit_max;
        if !chars.contains(&stats.char_count) || !words.contains(&stats.word_count) {
            return None;
        }

        Some((text, stats.core_samples()))
    }
}

fn group_label(category: Category, key: &ActorKey, record: &Record) -> String {
    match (category, key.group) {
        (Category::Comments, Some(GroupKey::Group)) => record
            .group_name
            .clone()
            .unwrap_or_else(|| DEFAULT_GROUP_LABEL.to_string()),
        (_, Some(group)) => group.as_str().to_string(),
        (_, None) => String::new(),
    }
}
