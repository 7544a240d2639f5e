//! Descriptive text statistics.

use super::clean::denoise;
use crate::models::StatName;
use std::collections::HashMap;

/// Readability scores of a text long enough to be scored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readability {
    pub flesch_kincaid_grade: f64,
    pub flesch_reading_ease: f64,
    pub coleman_liau: f64,
    pub lix: f64,
}

/// Statistics of one text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStats {
    pub word_count: usize,
    pub syllable_count: usize,
    pub char_count: usize,
    /// Shannon entropy (bits) of the lower-cased word distribution.
    pub entropy: f64,
    pub readability: Option<Readability>,
}

impl TextStats {
    /// The statistics sampled by volume counts.
    pub fn core_samples(&self) -> Vec<(StatName, f64)> {
        vec![
            (StatName::WordCount, self.word_count as f64),
            (StatName::CharCount, self.char_count as f64),
            (StatName::Entropy, self.entropy),
        ]
    }

    /// Every available statistic, readability included when present.
    pub fn all_samples(&self) -> Vec<(StatName, f64)> {
        let mut samples = vec![
            (StatName::WordCount, self.word_count as f64),
            (StatName::SyllableCount, self.syllable_count as f64),
            (StatName::CharCount, self.char_count as f64),
            (StatName::Entropy, self.entropy),
        ];
        if let Some(r) = self.readability {
            samples.extend([
                (StatName::FleschKincaidGrade, r.flesch_kincaid_grade),
                (StatName::FleschReadingEase, r.flesch_reading_ease),
                (StatName::ColemanLiau, r.coleman_liau),
                (StatName::Lix, r.lix),
            ]);
        }
        samples
    }
}

/// Computes statistics for a text.
pub trait TextStatsProvider {
    fn compute(&self, text: &str) -> TextStats;
}

/// Heuristic statistics with no external models.
#[derive(Debug, Clone)]
pub struct BasicTextStats {
    /// Readability is skipped for texts with fewer words than this.
    pub readability_min_words: usize,
}

impl Default for BasicTextStats {
    fn default() -> Self {
        Self {
            readability_min_words: 3,
        }
    }
}

impl TextStatsProvider for BasicTextStats {
    fn compute(&self, text: &str) -> TextStats {
        let words: Vec<&str> = text.split_whitespace().collect();

        TextStats {
            word_count: words.len(),
            syllable_count: words.iter().map(|w| syllables(w)).sum(),
            char_count: text.chars().count(),
            entropy: word_entropy(&words),
            readability: self.readability(text),
        }
    }
}

impl BasicTextStats {
    fn readability(&self, text: &str) -> Option<Readability> {
        let clean = denoise(text);
        let words: Vec<&str> = clean
            .split_whitespace()
            .filter(|w| w.chars().any(char::is_alphabetic))
            .collect();
        if words.is_empty() || words.len() < self.readability_min_words {
            return None;
        }

        let sentences = clean
            .split(['.', '!', '?'])
            .filter(|s| s.chars().any(char::is_alphabetic))
            .count()
            .max(1) as f64;
        let n_words = words.len() as f64;
        let letters = words
            .iter()
            .map(|w| w.chars().filter(|c| c.is_alphabetic()).count())
            .sum::<usize>() as f64;
        let n_syllables = words.iter().map(|w| syllables(w)).sum::<usize>() as f64;
        let long_words = words
            .iter()
            .filter(|w| w.chars().filter(|c| c.is_alphabetic()).count() > 6)
            .count() as f64;

        let words_per_sentence = n_words / sentences;
        let syllables_per_word = n_syllables / n_words;

        Some(Readability {
            flesch_kincaid_grade: 0.39 * words_per_sentence + 11.8 * syllables_per_word - 15.59,
            flesch_reading_ease: 206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word,
            coleman_liau: 0.0588 * (letters / n_words * 100.0)
                - 0.296 * (sentences / n_words * 100.0)
                - 15.8,
            lix: words_per_sentence + 100.0 * long_words / n_words,
        })
    }
}

/// Vowel-group syllable estimate. Words with letters have at least one.
pub fn syllables(word: &str) -> usize {
    let letters: Vec<char> = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect();
    if letters.is_empty() {
        return 0;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut count = 0;
    let mut previous_vowel = false;
    for &c in &letters {
        let vowel = is_vowel(c);
        if vowel && !previous_vowel {
            count += 1;
        }
        previous_vowel = vowel;
    }

    // silent trailing e ("make"), but not "-le" ("table")
    let n = letters.len();
    if count > 1 && letters[n - 1] == 'e' && !(n >= 2 && letters[n - 2] == 'l') {
        count -= 1;
    }
    count.max(1)
}

fn word_entropy(words: &[&str]) -> f64 {
    if words.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<String, usize> = HashMap::new();
    for word in words {
        *freq.entry(word.to_lowercase()).or_insert(0) += 1;
    }

    let total = words.len() as f64;
    freq.values()
        .map(|&n| {
            let p = n as f64 / total;
            -p * p.log2()
        })
        .sum()
}
