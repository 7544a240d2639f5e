//! Classified archive input.
//!
//! Records arrive already labelled by actor, group and role; this module
//! loads them into typed actor trees.

pub mod loader;
pub mod tree;

pub use loader::{load_archive, Archive};
pub use tree::ActorTree;
