//! Keyphrase extraction.
//!
//! Two independently configured scorers:
//! - primary: n-gram candidates weighted by frequency, length and how early
//!   they first appear
//! - secondary: TextRank over a word co-occurrence graph

use super::clean::term_tokens;
use super::stopwords::Stopwords;
use crate::config::{PrimaryRankConfig, SecondaryRankConfig};
use std::collections::{BTreeMap, HashMap};

/// Which scorer to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankMethod {
    Primary,
    Secondary,
}

/// Extracts ranked `(term, score)` pairs from a text.
pub trait KeyphraseProvider {
    fn extract(&self, text: &str, method: RankMethod) -> Vec<(String, f64)>;
}

/// Built-in scorers needing no external models.
#[derive(Debug, Clone)]
pub struct BuiltinKeyphrases {
    pub primary: PrimaryRankConfig,
    pub secondary: SecondaryRankConfig,
    pub stopwords: Stopwords,
}

impl KeyphraseProvider for BuiltinKeyphrases {
    fn extract(&self, text: &str, method: RankMethod) -> Vec<(String, f64)> {
        let tokens = term_tokens(text);
        if tokens.is_empty() {
            return Vec::new();
        }

        match method {
            RankMethod::Primary => self.ngram_rank(&tokens),
            RankMethod::Secondary => self.text_rank(&tokens),
        }
    }
}

struct Candidate {
    first_pos: usize,
    count: usize,
    len: usize,
}

impl BuiltinKeyphrases {
    fn ngram_rank(&self, tokens: &[String]) -> Vec<(String, f64)> {
        let max_n = self.primary.max_ngram.max(1);
        let mut order: Vec<String> = Vec::new();
        let mut candidates: HashMap<String, Candidate> = HashMap::new();

        for n in 1..=max_n.min(tokens.len()) {
            for (pos, window) in tokens.windows(n).enumerate() {
                if self.stopwords.bounds_phrase(window) {
                    continue;
                }
                let phrase = window.join(" ");
                let entry = candidates.entry(phrase.clone()).or_insert_with(|| {
                    order.push(phrase);
                    Candidate {
                        first_pos: pos,
                        count: 0,
                        len: n,
                    }
                });
                entry.count += 1;
                entry.first_pos = entry.first_pos.min(pos);
            }
        }

        let total = tokens.len() as f64;
        let scored = order
            .into_iter()
            .filter_map(|phrase| {
                let c = candidates.get(&phrase)?;
                let position_weight = 1.0 + (total / (c.first_pos as f64 + 1.0)).ln();
                let score = c.count as f64 * (c.len as f64).sqrt() * position_weight;
                Some((phrase, score))
            })
            .collect();

        top_fraction(scored, self.primary.top_fraction)
    }

    fn text_rank(&self, tokens: &[String]) -> Vec<(String, f64)> {
        let words: Vec<&String> = tokens
            .iter()
            .filter(|t| !self.stopwords.contains(t))
            .collect();
        if words.is_empty() {
            return Vec::new();
        }

        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut vocab: Vec<&str> = Vec::new();
        for word in &words {
            index.entry(word.as_str()).or_insert_with(|| {
                vocab.push(word.as_str());
                vocab.len() - 1
            });
        }

        // Undirected co-occurrence graph as sparse adjacency lists.
        let n = vocab.len();
        let mut edges: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
        let window = self.secondary.window.max(2);
        for (i, word) in words.iter().enumerate() {
            let a = index[word.as_str()];
            for other in words.iter().skip(i + 1).take(window - 1) {
                let b = index[other.as_str()];
                if a != b {
                    *edges[a].entry(b).or_insert(0.0) += 1.0;
                    *edges[b].entry(a).or_insert(0.0) += 1.0;
                }
            }
        }
        let neighbours: Vec<Vec<(usize, f64)>> = edges
            .into_iter()
            .map(|adjacent| adjacent.into_iter().collect())
            .collect();

        let out_weight: Vec<f64> = neighbours
            .iter()
            .map(|adjacent| adjacent.iter().map(|(_, w)| w).sum())
            .collect();
        let damping = self.secondary.damping;
        let mut scores = vec![1.0_f64; n];
        for _ in 0..self.secondary.iterations {
            let previous = scores.clone();
            for (i, score) in scores.iter_mut().enumerate() {
                let incoming: f64 = neighbours[i]
                    .iter()
                    .map(|&(j, w)| w / out_weight[j] * previous[j])
                    .sum();
                *score = (1.0 - damping) + damping * incoming;
            }
        }

        let scored = vocab
            .into_iter()
            .zip(scores)
            .map(|(word, score)| (word.to_string(), score))
            .collect();
        top_fraction(scored, self.secondary.top_fraction)
    }
}

/// Sort by score, keeping first-appearance order among equal scores, and
/// keep the best `fraction` of candidates (at least one).
fn top_fraction(mut scored: Vec<(String, f64)>, fraction: f64) -> Vec<(String, f64)> {
    if scored.is_empty() {
        return scored;
    }
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    let keep = ((scored.len() as f64 * fraction).ceil() as usize).clamp(1, scored.len());
    scored.truncate(keep);
    scored
}
