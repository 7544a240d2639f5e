//! Aggregators that turn bucketed records into foldable maps.
//!
//! `CountAggregator` builds the volume-count trees and
//! `AnalysisAggregator` builds the monthly text-analysis series. Both read
//! the same time cubes and never touch each other's output.

pub mod analyzer;
pub mod counter;

pub use analyzer::{AnalysisAggregator, Toolkit};
pub use counter::CountAggregator;
