//! Output writers.

pub mod generator;

pub use generator::{write_digest, write_json_results, Digest, DigestMetadata};
