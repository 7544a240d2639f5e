//! Text collaborators used by the aggregators.
//!
//! The aggregators only see the `TextStatsProvider` and `KeyphraseProvider`
//! traits; the types here are the built-in implementations.

pub mod clean;
pub mod keyphrase;
pub mod stats;
pub mod stopwords;
pub mod urls;

pub use keyphrase::{BuiltinKeyphrases, KeyphraseProvider, RankMethod};
pub use stats::{BasicTextStats, TextStats, TextStatsProvider};
pub use stopwords::Stopwords;
pub use urls::{scan_urls, UrlScan};
