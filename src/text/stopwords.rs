//! Stopword sets.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

const ENGLISH: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

/// A lower-cased set of words excluded from keyphrase counts.
#[derive(Debug, Clone, Default)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    /// The built-in English list.
    pub fn english() -> Self {
        Self {
            words: ENGLISH.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Add words from a file holding one word per line. Blank lines and
    /// lines starting with `#` are ignored.
    pub fn extend_from_file(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read stopword list: {}", path.display()))?;

        let before = self.words.len();
        self.words.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_lowercase),
        );
        Ok(self.words.len() - before)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// True if the phrase starts or ends with a stopword.
    pub fn bounds_phrase(&self, words: &[String]) -> bool {
        match (words.first(), words.last()) {
            (Some(first), Some(last)) => self.contains(first) || self.contains(last),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_english_list() {
        let stopwords = Stopwords::english();
        assert!(stopwords.contains("the"));
        assert!(!stopwords.contains("rust"));
    }

    #[test]
    fn test_extend_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stopwords.txt");
        std::fs::write(&path, "# custom\nLol\n\nthe\nomg\n").unwrap();

        let mut stopwords = Stopwords::english();
        let added = stopwords.extend_from_file(&path).unwrap();

        assert_eq!(added, 2);
        assert!(stopwords.contains("lol"));
        assert!(stopwords.contains("omg"));
    }

    #[test]
    fn test_bounds_phrase() {
        let stopwords = Stopwords::english();
        let phrase = |s: &str| s.split(' ').map(String::from).collect::<Vec<_>>();
        assert!(stopwords.bounds_phrase(&phrase("the rust book")));
        assert!(stopwords.bounds_phrase(&phrase("rust for")));
        assert!(!stopwords.bounds_phrase(&phrase("state of rust")));
        assert!(stopwords.bounds_phrase(&[]));
    }
}
