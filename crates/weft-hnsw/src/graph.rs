//! The HNSW graph.
//!
//! Implements the hierarchical navigable small world structure: a stack of
//! layers where layer 0 holds every key and each higher layer holds an
//! exponentially thinning subset acting as express lanes. Inserts and
//! searches enter at the top layer and descend, carrying the best vertex
//! found on each layer (the "elevator") into the next one down.

use crate::layer::Layer;
use crate::node::{LayerNode, Node};
use crate::{HnswError, Result};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use weft_vector::{cosine_distance, DistanceFn, VectorError};

/// HNSW tuning parameters.
///
/// All parameters must be fixed before the first insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Max neighbors per node per layer (M parameter).
    /// Default: 16
    pub m: usize,

    /// Level-generation decay factor, in (0, 1). Each layer is roughly `ml`
    /// times the size of the one below it; smaller values produce taller,
    /// sparser hierarchies.
    /// Default: 0.25
    pub ml: f64,

    /// Frontier size during search. Higher = better recall, slower search.
    /// Default: 20
    pub ef_search: usize,

    /// Frontier size during insertion neighbor discovery.
    /// Higher = better graph quality, slower build.
    /// Default: 40
    pub ef_construction: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            m: 16,
            ml: 0.25,
            ef_search: 20,
            ef_construction: 40,
        }
    }
}

impl GraphConfig {
    fn validate(&self) -> Result<()> {
        if self.m == 0 {
            return Err(HnswError::Config("m must be positive"));
        }
        if !(self.ml > 0.0 && self.ml < 1.0) {
            return Err(HnswError::Config("ml must be in (0, 1)"));
        }
        if self.ef_search == 0 {
            return Err(HnswError::Config("ef_search must be positive"));
        }
        if self.ef_construction == 0 {
            return Err(HnswError::Config("ef_construction must be positive"));
        }
        Ok(())
    }
}

/// One search hit: the stored node and its distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<K> {
    pub key: K,
    pub value: Vec<f32>,
    pub distance: f32,
}

/// An in-memory HNSW approximate nearest-neighbor index.
///
/// Keys are totally ordered; vectors are `f32` sequences whose length is
/// fixed by the first insert. The graph is protected by a single
/// reader/writer lock: [`add`](Self::add) and [`delete`](Self::delete) write,
/// everything else reads, and searches run concurrently.
pub struct Graph<K: Ord + Clone> {
    config: GraphConfig,
    distance: DistanceFn,
    inner: RwLock<GraphInner<K>>,
}

struct GraphInner<K> {
    /// Index 0 is the base layer; the highest index is the top.
    layers: Vec<Layer<K>>,
    /// Level-selection randomness. Lazily seeded from OS entropy when unset;
    /// mutated only under the write lock.
    rng: Option<StdRng>,
}

/// Upper bound on a new node's level, derived from the base layer size:
/// round(ln(n) / ln(1/ml)) + 1.
fn max_level(ml: f64, num_nodes: usize) -> usize {
    if num_nodes == 0 {
        return 1;
    }
    let l = (num_nodes as f64).ln() / (1.0 / ml).ln();
    l.round() as usize + 1
}

impl<K: Ord + Clone> GraphInner<K> {
    fn len(&self) -> usize {
        self.layers.first().map_or(0, Layer::size)
    }

    fn dims(&self) -> usize {
        self.layers
            .first()
            .and_then(|layer| layer.nodes.values().next())
            .map_or(0, |node| node.vector.len())
    }

    /// Draw a level for a new node: starting from 0, a level survives with
    /// probability `ml`, capped by [`max_level`].
    fn random_level(&mut self, config: &GraphConfig) -> usize {
        let max = if self.layers.is_empty() {
            1
        } else {
            max_level(config.ml, self.layers[0].size())
        };

        let rng = self.rng.get_or_insert_with(StdRng::from_entropy);
        for level in 0..max {
            if rng.gen::<f64>() > config.ml {
                return level;
            }
        }
        max
    }
}

impl<K: Ord + Clone> Default for Graph<K> {
    /// A graph with default parameters and cosine distance, roughly tuned
    /// for storing text embeddings.
    fn default() -> Self {
        Self::new(cosine_distance, GraphConfig::default())
    }
}

impl<K: Ord + Clone> Graph<K> {
    /// Create an empty graph with the given distance function and parameters.
    ///
    /// The vector dimensionality is fixed by the first inserted node.
    pub fn new(distance: DistanceFn, config: GraphConfig) -> Self {
        Self {
            config,
            distance,
            inner: RwLock::new(GraphInner {
                layers: Vec::new(),
                rng: None,
            }),
        }
    }

    /// Like [`new`](Self::new), with deterministic level selection for
    /// reproducible graphs. Deterministic seeding can produce degenerate
    /// hierarchies when exposed to adversarial insertion orders; prefer
    /// [`new`](Self::new) outside of tests.
    pub fn with_seed(distance: DistanceFn, config: GraphConfig, seed: u64) -> Self {
        let graph = Self::new(distance, config);
        graph.inner.write().rng = Some(StdRng::seed_from_u64(seed));
        graph
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Insert nodes into the graph. A node whose key is already present
    /// replaces the existing node.
    ///
    /// Insertion is not transactional across the batch: on error, nodes
    /// earlier in the batch stay inserted.
    pub fn add(&self, nodes: impl IntoIterator<Item = Node<K>>) -> Result<()> {
        self.config.validate()?;

        let mut inner = self.inner.write();
        for node in nodes {
            self.insert_one(&mut inner, node)?;
        }
        Ok(())
    }

    fn insert_one(&self, inner: &mut GraphInner<K>, node: Node<K>) -> Result<()> {
        let Node { key, value } = node;

        // Fatal before any mutation.
        if inner.len() > 0 && inner.dims() != value.len() {
            return Err(VectorError::DimensionMismatch {
                expected: inner.dims(),
                actual: value.len(),
            }
            .into());
        }

        let insert_level = inner.random_level(&self.config);
        if insert_level >= inner.layers.len() {
            while inner.layers.len() <= insert_level {
                inner.layers.push(Layer::new());
            }
            tracing::debug!(layers = inner.layers.len(), "layer stack grew");
        }

        let vector: Arc<[f32]> = value.into();
        let pre_len = inner.len();
        let mut was_updated = false;
        let mut elevator: Option<K> = None;

        // Descend from the top, inserting at every layer at or below the
        // chosen level.
        for i in (0..inner.layers.len()).rev() {
            if inner.layers[i].size() == 0 {
                // Seed an empty layer only at or below the insert level.
                // Higher empty layers (left behind by deletes) must not adopt
                // the node, or they would hold keys the layers between lack.
                if i <= insert_level {
                    inner.layers[i].insert_node(LayerNode::new(key.clone(), vector.clone()));
                }
                continue;
            }

            let search_point = match &elevator {
                Some(k) => k.clone(),
                None => match inner.layers[i].entry_key() {
                    Some(k) => k.clone(),
                    None => continue,
                },
            };

            let neighborhood = inner.layers[i].search(
                &search_point,
                self.config.m,
                self.config.ef_construction,
                &vector,
                self.distance,
            )?;
            // The search point itself is always in the result set.
            let nearest = neighborhood
                .first()
                .ok_or(HnswError::Invariant("empty neighborhood"))?;
            elevator = Some(nearest.key.clone());

            if i <= insert_level {
                if let Some(old) = inner.layers[i].remove(&key) {
                    inner.layers[i].isolate(&old, self.config.m);
                    was_updated = true;
                }
                inner.layers[i].insert_node(LayerNode::new(key.clone(), vector.clone()));
                for member in &neighborhood {
                    // `connect` skips the self-edge that arises when the
                    // neighborhood still contains the node just replaced.
                    inner.layers[i].connect(&member.key, &key, self.config.m, self.distance)?;
                }
            }
        }

        // A replacement is a full replacement: copies of the key above the
        // new insert level are stale and are detached as well.
        if was_updated {
            for i in (insert_level + 1)..inner.layers.len() {
                if let Some(stale) = inner.layers[i].remove(&key) {
                    inner.layers[i].isolate(&stale, self.config.m);
                }
            }
            tracing::trace!("replaced existing node");
        }

        let post_len = inner.len();
        if was_updated {
            if post_len != pre_len {
                return Err(HnswError::Invariant("node not updated"));
            }
        } else if post_len != pre_len + 1 {
            return Err(HnswError::Invariant("node not added"));
        }
        Ok(())
    }

    /// Find the `k` nearest neighbors of `near`.
    ///
    /// Results are sorted ascending by distance and contain at most `k`
    /// entries. Fails if the graph is empty or the query dimensionality does
    /// not match the graph's.
    pub fn search(&self, near: &[f32], k: usize) -> Result<Vec<SearchResult<K>>> {
        let inner = self.inner.read();
        if inner.len() == 0 {
            return Err(HnswError::EmptyGraph);
        }
        if inner.dims() != near.len() {
            return Err(VectorError::DimensionMismatch {
                expected: inner.dims(),
                actual: near.len(),
            }
            .into());
        }

        let mut elevator: Option<K> = None;
        for i in (0..inner.layers.len()).rev() {
            if inner.layers[i].size() == 0 {
                // Deletes can leave empty layers at the top of the stack.
                continue;
            }
            let search_point = match &elevator {
                Some(key) => key.clone(),
                None => match inner.layers[i].entry_key() {
                    Some(key) => key.clone(),
                    None => continue,
                },
            };

            if i > 0 {
                // Descending: only the single best vertex matters.
                let found =
                    inner.layers[i].search(&search_point, 1, self.config.ef_search, near, self.distance)?;
                let nearest = found
                    .first()
                    .ok_or(HnswError::Invariant("empty neighborhood"))?;
                elevator = Some(nearest.key.clone());
                continue;
            }

            let found =
                inner.layers[i].search(&search_point, k, self.config.ef_search, near, self.distance)?;
            return Ok(found
                .into_iter()
                .map(|c| SearchResult {
                    key: c.key,
                    value: c.vector.to_vec(),
                    distance: c.dist,
                })
                .collect());
        }

        Err(HnswError::Invariant("search fell through the layer stack"))
    }

    /// Remove a key from every layer, repairing the neighborhoods it leaves
    /// behind. Returns whether the key was present.
    ///
    /// Layers emptied by deletion are retained; the layer stack only grows.
    pub fn delete(&self, key: &K) -> bool {
        let mut inner = self.inner.write();

        let mut deleted = false;
        for layer in &mut inner.layers {
            if let Some(node) = layer.remove(key) {
                layer.isolate(&node, self.config.m);
                deleted = true;
            }
        }
        if deleted {
            tracing::debug!("deleted node");
        }
        deleted
    }

    /// Fetch the vector stored under `key`, if any.
    pub fn lookup(&self, key: &K) -> Option<Vec<f32>> {
        let inner = self.inner.read();
        inner.layers.first()?.get(key).map(|node| node.vector.to_vec())
    }

    /// The number of live keys.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The vector dimensionality of the graph, or 0 if it is empty.
    pub fn dims(&self) -> usize {
        self.inner.read().dims()
    }
}
