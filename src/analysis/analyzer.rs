//! Text analysis.
//!
//! Walks every time cube of a category and fills one monthly `SeriesSet`:
//! hostname counts, per-actor term counts, keyphrase counts from both
//! scorers and statistic samples. Headlines recovered from news links are
//! pooled per month, never attributed to an actor, and run through the same
//! term and keyphrase pipeline into the headline kinds.

use crate::archive::ActorTree;
use crate::bucket::TimeCube;
use crate::models::{Category, MapKind, Record, TimeKey};
use crate::rollup::SeriesSet;
use crate::text::clean::{chop_long_tokens, term_tokens};
use crate::text::{scan_urls, KeyphraseProvider, RankMethod, Stopwords, TextStatsProvider};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// The text collaborators an analysis pass needs.
#[derive(Clone, Copy)]
pub struct Toolkit<'a> {
    pub stats: &'a dyn TextStatsProvider,
    pub keyphrases: &'a dyn KeyphraseProvider,
    pub stopwords: &'a Stopwords,
    /// Tokens longer than this are split before analysis.
    pub long_token_len: usize,
}

const RANKERS: [(RankMethod, MapKind, MapKind); 2] = [
    (
        RankMethod::Primary,
        MapKind::PrimaryRank,
        MapKind::PrimaryRankHeadline,
    ),
    (
        RankMethod::Secondary,
        MapKind::SecondaryRank,
        MapKind::SecondaryRankHeadline,
    ),
];

/// Builds monthly analysis maps from bucketed actor trees.
pub struct AnalysisAggregator<'a> {
    toolkit: Toolkit<'a>,
}

impl<'a> AnalysisAggregator<'a> {
    pub fn new(toolkit: Toolkit<'a>) -> Self {
        Self { toolkit }
    }

    /// Analyse every record in `tree`. `owner` is the actor of "Own" comments.
    pub fn analyze(
        &self,
        category: Category,
        tree: &ActorTree<TimeCube>,
        owner: &str,
    ) -> Result<SeriesSet> {
        let mut set = SeriesSet::new();
        let mut headlines: BTreeMap<TimeKey, Vec<String>> = BTreeMap::new();
        let mut analysed = 0usize;

        for (path, cube) in tree.leaves() {
            let key = category.actor_key(&path, owner)?;
            let actor = key.name();

            for leaf in cube.leaves() {
                let time = TimeKey::Month(leaf.month);
                for record in leaf.records {
                    let found = self
                        .analyze_record(&mut set, actor, time, record)
                        .with_context(|| {
                            format!("Failed to analyse {} at {}", category, path.join("/"))
                        })?;
                    if !found.is_empty() {
                        headlines.entry(time).or_default().extend(found);
                    }
                    analysed += 1;
                }
            }
        }

        for (time, month) in &headlines {
            for headline in month {
                self.analyze_headline(&mut set, *time, headline)?;
            }
        }

        debug!(
            "Analysed {} {} records over {} months ({} headlines)",
            analysed,
            category,
            set.months(),
            headlines.values().map(Vec::len).sum::<usize>()
        );
        Ok(set)
    }

    /// Add one record's contributions, returning the headlines it linked to.
    fn analyze_record(
        &self,
        set: &mut SeriesSet,
        actor: &str,
        time: TimeKey,
        record: &Record,
    ) -> Result<Vec<String>> {
        let scan = scan_urls(&record.text);
        for host in &scan.hosts {
            set.frequency_mut(MapKind::UrlCount, time)?.add(host, 1);
        }

        let text = chop_long_tokens(&scan.text, self.toolkit.long_token_len);
        if text.trim().is_empty() {
            return Ok(scan.headlines);
        }

        let terms = set.actor_terms_mut(actor, time);
        for term in term_tokens(&text) {
            terms.add(&term, 1);
        }

        for (method, kind, _) in RANKERS {
            self.add_keyphrases(set, kind, time, &text, method)?;
        }

        let stats = self.toolkit.stats.compute(&text);
        set.samples_mut(time)?
            .extend_from(&text, &stats.all_samples());

        Ok(scan.headlines)
    }

    fn analyze_headline(&self, set: &mut SeriesSet, time: TimeKey, headline: &str) -> Result<()> {
        let terms = set.frequency_mut(MapKind::WordcloudHeadline, time)?;
        for term in term_tokens(headline) {
            terms.add(&term, 1);
        }

        for (method, _, kind) in RANKERS {
            self.add_keyphrases(set, kind, time, headline, method)?;
        }
        Ok(())
    }

    /// Count each extracted term once, skipping stopwords.
    fn add_keyphrases(
        &self,
        set: &mut SeriesSet,
        kind: MapKind,
        time: TimeKey,
        text: &str,
        method: RankMethod,
    ) -> Result<()> {
        let phrases = self.toolkit.keyphrases.extract(text, method);
        let counts = set.frequency_mut(kind, time)?;
        for (term, _) in phrases {
            if !self.toolkit.stopwords.contains(&term) {
                counts.add(&term, 1);
            }
        }
        Ok(())
    }
}
