//! Node types.
//!
//! [`Node`] is the public key + vector pair handed to [`Graph::add`].
//! Internally each layer holds its own [`LayerNode`] per key; the vector is
//! shared across a key's layer instances via `Arc`, while every layer keeps
//! its own neighbor set so edges never cross layers.
//!
//! [`Graph::add`]: crate::Graph::add

use crate::{HnswError, Result};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A key + vector pair to insert into a graph.
///
/// Keys must be totally ordered and cloneable; `i64`, `u32`, `String`, etc.
/// all qualify. The vector length must match the graph's dimensionality once
/// the graph is non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<K> {
    pub key: K,
    pub value: Vec<f32>,
}

impl<K> Node<K> {
    /// Create a node from a key and a vector.
    pub fn new(key: K, value: Vec<f32>) -> Self {
        Self { key, value }
    }
}

/// Zip parallel key and vector slices into nodes.
///
/// # Errors
///
/// Fails if the two inputs have different lengths.
pub fn make_nodes<K>(keys: Vec<K>, values: Vec<Vec<f32>>) -> Result<Vec<Node<K>>> {
    if keys.len() != values.len() {
        return Err(HnswError::LengthMismatch);
    }
    Ok(keys
        .into_iter()
        .zip(values)
        .map(|(key, value)| Node::new(key, value))
        .collect())
}

/// One vertex of one layer.
///
/// The neighbor set is ordered so that search enumerates neighbors in
/// ascending key order, which makes traversal deterministic for a fixed graph.
#[derive(Debug, Clone)]
pub(crate) struct LayerNode<K> {
    pub key: K,
    pub vector: Arc<[f32]>,
    pub neighbors: BTreeSet<K>,
}

impl<K: Ord + Clone> LayerNode<K> {
    pub fn new(key: K, vector: Arc<[f32]>) -> Self {
        Self {
            key,
            vector,
            neighbors: BTreeSet::new(),
        }
    }
}

/// A (vertex, distance) entry in the search heaps.
#[derive(Debug, Clone)]
pub(crate) struct Candidate<K> {
    pub key: K,
    pub vector: Arc<[f32]>,
    pub dist: f32,
}
