//! Arbitrary-depth actor trees.
//!
//! The classification step groups records under as many actor levels as
//! a category needs. An `ActorTree` keeps that nesting intact while the
//! pipeline swaps the payload at the leaves (raw records, decorated
//! records, time cubes).

use std::collections::BTreeMap;

/// A mapping of actor keys to nested mappings or leaf payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum ActorTree<T> {
    Branch(BTreeMap<String, ActorTree<T>>),
    Leaf(T),
}

impl<T> Default for ActorTree<T> {
    fn default() -> Self {
        ActorTree::Branch(BTreeMap::new())
    }
}

impl<T> ActorTree<T> {
    /// Replace every leaf payload, keeping the nesting.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> ActorTree<U> {
        self.map_inner(&mut f)
    }

    fn map_inner<U, F: FnMut(T) -> U>(self, f: &mut F) -> ActorTree<U> {
        match self {
            ActorTree::Leaf(value) => ActorTree::Leaf(f(value)),
            ActorTree::Branch(children) => ActorTree::Branch(
                children
                    .into_iter()
                    .map(|(key, child)| (key, child.map_inner(f)))
                    .collect(),
            ),
        }
    }

    /// Visit every leaf together with the keys leading to it.
    pub fn leaves(&self) -> Vec<(Vec<String>, &T)> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.collect_leaves(&mut path, &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, path: &mut Vec<String>, out: &mut Vec<(Vec<String>, &'a T)>) {
        match self {
            ActorTree::Leaf(value) => out.push((path.clone(), value)),
            ActorTree::Branch(children) => {
                for (key, child) in children {
                    path.push(key.clone());
                    child.collect_leaves(path, out);
                    path.pop();
                }
            }
        }
    }
}
