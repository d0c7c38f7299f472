//! A single layer of the hierarchy.
//!
//! Each layer owns its nodes and the edges between them; neighbor references
//! never cross layers. All edge mutation goes through [`Layer::connect`],
//! which installs both directions of an edge and then prunes each endpoint
//! back under the neighbor cap, so edges are bidirectional after every
//! completed operation.

use crate::heap::BoundedHeap;
use crate::node::{Candidate, LayerNode};
use crate::{HnswError, Result};
use std::collections::{BTreeMap, BTreeSet};
use weft_vector::DistanceFn;

/// A keyed collection of layer nodes forming one level of the hierarchy.
#[derive(Debug, Clone, Default)]
pub(crate) struct Layer<K> {
    pub nodes: BTreeMap<K, LayerNode<K>>,
}

impl<K: Ord + Clone> Layer<K> {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Any node of the layer, used to begin a search. Which node is returned
    /// does not affect correctness, only latency, so the smallest key is as
    /// good as any.
    pub fn entry_key(&self) -> Option<&K> {
        self.nodes.keys().next()
    }

    pub fn get(&self, key: &K) -> Option<&LayerNode<K>> {
        self.nodes.get(key)
    }

    pub fn insert_node(&mut self, node: LayerNode<K>) {
        self.nodes.insert(node.key.clone(), node);
    }

    pub fn remove(&mut self, key: &K) -> Option<LayerNode<K>> {
        self.nodes.remove(key)
    }

    /// Install a bidirectional edge between `a` and `b`, then prune each
    /// endpoint back under the neighbor cap `m`. Self-edges and edges to
    /// absent keys are ignored.
    pub fn connect(&mut self, a: &K, b: &K, m: usize, dist: DistanceFn) -> Result<()> {
        if a == b || !self.nodes.contains_key(a) || !self.nodes.contains_key(b) {
            return Ok(());
        }

        if let Some(node) = self.nodes.get_mut(a) {
            node.neighbors.insert(b.clone());
        }
        if let Some(node) = self.nodes.get_mut(b) {
            node.neighbors.insert(a.clone());
        }

        self.prune_neighbors(a, m, dist)?;
        self.prune_neighbors(b, m, dist)
    }

    /// If `key` holds more than `m` neighbors, evict the one with the worst
    /// distance, drop the back-edge, and replenish the evicted neighbor.
    fn prune_neighbors(&mut self, key: &K, m: usize, dist: DistanceFn) -> Result<()> {
        let (vector, neighbor_keys) = match self.nodes.get(key) {
            Some(node) if node.neighbors.len() > m => (
                node.vector.clone(),
                node.neighbors.iter().cloned().collect::<Vec<_>>(),
            ),
            _ => return Ok(()),
        };

        // The first neighbor examined is tentatively worst; later ones take
        // over only on a strictly greater distance. A NaN distance therefore
        // never displaces a real one but still counts when it comes first, so
        // exactly one neighbor is evicted.
        let mut worst: Option<K> = None;
        let mut worst_dist = f32::NEG_INFINITY;
        for neighbor_key in &neighbor_keys {
            let neighbor = match self.nodes.get(neighbor_key) {
                Some(n) => n,
                None => continue,
            };
            let d = dist(&neighbor.vector, &vector)?;
            if d > worst_dist || worst.is_none() {
                worst_dist = d;
                worst = Some(neighbor_key.clone());
            }
        }
        let worst = match worst {
            Some(w) => w,
            None => return Ok(()),
        };

        if let Some(node) = self.nodes.get_mut(key) {
            node.neighbors.remove(&worst);
        }
        if let Some(node) = self.nodes.get_mut(&worst) {
            node.neighbors.remove(key);
        }
        self.replenish(&worst, m);
        Ok(())
    }

    /// Restore connectivity after an eviction or deletion by linking `key` to
    /// two-hop candidates (neighbors of its remaining neighbors) until it
    /// reaches `m` neighbors.
    ///
    /// Repair edges are installed in both directions and only into candidates
    /// with headroom, so repair never evicts and therefore never cascades.
    pub fn replenish(&mut self, key: &K, m: usize) {
        let neighbor_keys: Vec<K> = match self.nodes.get(key) {
            Some(node) if node.neighbors.len() < m => node.neighbors.iter().cloned().collect(),
            _ => return,
        };

        for neighbor_key in neighbor_keys {
            let two_hop: Vec<K> = match self.nodes.get(&neighbor_key) {
                Some(n) => n.neighbors.iter().cloned().collect(),
                None => continue,
            };
            for candidate in two_hop {
                if candidate == *key {
                    continue;
                }
                match self.nodes.get(key) {
                    Some(node) if node.neighbors.len() < m => {
                        if node.neighbors.contains(&candidate) {
                            continue;
                        }
                    }
                    // Reached the cap (or the node vanished); repair is done.
                    _ => return,
                }
                let has_headroom = self
                    .nodes
                    .get(&candidate)
                    .map_or(false, |c| c.neighbors.len() < m);
                if !has_headroom {
                    continue;
                }
                if let Some(node) = self.nodes.get_mut(key) {
                    node.neighbors.insert(candidate.clone());
                }
                if let Some(node) = self.nodes.get_mut(&candidate) {
                    node.neighbors.insert(key.clone());
                }
            }
        }
    }

    /// Remove every inbound edge of a node that has already been detached
    /// from the layer map, replenishing each former neighbor. The detached
    /// node's own neighbor set is left alone; the caller is about to discard
    /// it.
    pub fn isolate(&mut self, detached: &LayerNode<K>, m: usize) {
        for neighbor_key in &detached.neighbors {
            if let Some(node) = self.nodes.get_mut(neighbor_key) {
                node.neighbors.remove(&detached.key);
            }
            self.replenish(neighbor_key, m);
        }
    }

    /// Best-first greedy search of this layer.
    ///
    /// Starts from `start`, expands the closest frontier vertex first, and
    /// keeps the `k` best vertices seen. The frontier is capped at
    /// `ef_search`. Neighbors are enumerated in ascending key order, which
    /// makes traversal deterministic for a fixed graph. Terminates early once
    /// an expansion improves nothing and the result set is full.
    ///
    /// Returns up to `k` candidates sorted ascending by distance; the start
    /// vertex itself is always considered, so the result is non-empty for
    /// `k > 0`.
    pub fn search(
        &self,
        start: &K,
        k: usize,
        ef_search: usize,
        target: &[f32],
        dist: DistanceFn,
    ) -> Result<Vec<Candidate<K>>> {
        let entry = self.nodes.get(start).ok_or(HnswError::MissingSearchPoint)?;

        let mut frontier = BoundedHeap::with_capacity(ef_search);
        let mut result = BoundedHeap::with_capacity(k);
        let mut visited = BTreeSet::new();

        let d = dist(&entry.vector, target)?;
        let seed = Candidate {
            key: entry.key.clone(),
            vector: entry.vector.clone(),
            dist: d,
        };
        frontier.push(seed.clone());
        result.push(seed);
        visited.insert(entry.key.clone());

        while let Some(current) = frontier.pop() {
            let mut improved = false;
            let current_node = match self.nodes.get(&current.key) {
                Some(n) => n,
                None => continue,
            };

            for neighbor_key in &current_node.neighbors {
                if visited.contains(neighbor_key) {
                    continue;
                }
                visited.insert(neighbor_key.clone());
                let neighbor = match self.nodes.get(neighbor_key) {
                    Some(n) => n,
                    None => continue,
                };

                let d = dist(&neighbor.vector, target)?;
                if let Some(min) = result.min() {
                    improved = improved || d < min.dist;
                }

                let candidate = Candidate {
                    key: neighbor.key.clone(),
                    vector: neighbor.vector.clone(),
                    dist: d,
                };
                if result.len() < k {
                    result.push(candidate.clone());
                } else if result.max().is_some_and(|max| d < max.dist) {
                    result.pop_last();
                    result.push(candidate.clone());
                }

                frontier.push(candidate);
                if frontier.len() > ef_search {
                    frontier.pop_last();
                }
            }

            // No neighbor improved on the best-so-far and the result set is
            // full, so further expansion cannot help.
            if !improved && result.len() >= k {
                break;
            }
        }

        let mut out = result.into_sorted_vec();
        out.truncate(k);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use weft_vector::euclidean_distance;

    /// A layer of 1-D points at the given coordinates, keyed by index.
    fn line_layer(points: &[f32]) -> Layer<usize> {
        let mut layer = Layer::new();
        for (i, &p) in points.iter().enumerate() {
            layer.insert_node(LayerNode::new(i, Arc::from(vec![p, 0.0])));
        }
        layer
    }

    fn connect_all(layer: &mut Layer<usize>, m: usize) {
        let keys: Vec<usize> = layer.nodes.keys().cloned().collect();
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                layer.connect(a, b, m, euclidean_distance).unwrap();
            }
        }
    }

    fn assert_bidirectional(layer: &Layer<usize>) {
        for (key, node) in &layer.nodes {
            assert!(!node.neighbors.contains(key), "self-edge on {key}");
            for nk in &node.neighbors {
                let back = layer.get(nk).expect("neighbor present in layer");
                assert!(
                    back.neighbors.contains(key),
                    "edge {key}->{nk} has no back-edge"
                );
            }
        }
    }

    #[test]
    fn test_connect_is_bidirectional() {
        let mut layer = line_layer(&[0.0, 1.0, 2.0]);
        layer.connect(&0, &1, 4, euclidean_distance).unwrap();
        layer.connect(&1, &2, 4, euclidean_distance).unwrap();

        assert!(layer.get(&0).unwrap().neighbors.contains(&1));
        assert!(layer.get(&1).unwrap().neighbors.contains(&0));
        assert!(layer.get(&1).unwrap().neighbors.contains(&2));
        assert!(!layer.get(&0).unwrap().neighbors.contains(&2));
        assert_bidirectional(&layer);
    }

    #[test]
    fn test_connect_ignores_self_edge() {
        let mut layer = line_layer(&[0.0, 1.0]);
        layer.connect(&0, &0, 4, euclidean_distance).unwrap();
        assert!(layer.get(&0).unwrap().neighbors.is_empty());
    }

    #[test]
    fn test_eviction_respects_cap_and_keeps_closest() {
        // Hub at 0.0, spokes at increasing distance. With m = 2 the hub may
        // keep only its two closest spokes.
        let mut layer = line_layer(&[0.0, 1.0, 2.0, 3.0]);
        let m = 2;
        for spoke in 1..4 {
            layer.connect(&0, &spoke, m, euclidean_distance).unwrap();
        }

        let hub = layer.get(&0).unwrap();
        assert_eq!(hub.neighbors.len(), m);
        assert!(hub.neighbors.contains(&1));
        assert!(hub.neighbors.contains(&2));
        assert!(!hub.neighbors.contains(&3));
        assert_bidirectional(&layer);
    }

    #[test]
    fn test_eviction_replenishes_the_evicted() {
        // Fully connect 4 points with m = 2: every eviction must leave the
        // evicted node with a repaired neighborhood, not an empty one.
        let mut layer = line_layer(&[0.0, 1.0, 2.0, 3.0]);
        connect_all(&mut layer, 2);

        for (key, node) in &layer.nodes {
            assert!(node.neighbors.len() <= 2, "node {key} over cap");
            assert!(!node.neighbors.is_empty(), "node {key} left isolated");
        }
        assert_bidirectional(&layer);
    }

    #[test]
    fn test_isolate_removes_inbound_edges() {
        let mut layer = line_layer(&[0.0, 1.0, 2.0, 3.0]);
        connect_all(&mut layer, 3);

        let detached = layer.remove(&1).unwrap();
        layer.isolate(&detached, 3);

        for (key, node) in &layer.nodes {
            assert!(!node.neighbors.contains(&1), "dangling edge {key}->1");
        }
        assert_bidirectional(&layer);
    }

    #[test]
    fn test_search_finds_nearest() {
        let mut layer = line_layer(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        connect_all(&mut layer, 3);

        // Search for 2.9 starting from the far end.
        let found = layer
            .search(&0, 2, 4, &[2.9, 0.0], euclidean_distance)
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].key, 3);
        assert_eq!(found[1].key, 2);
        assert!(found[0].dist <= found[1].dist);
    }

    #[test]
    fn test_search_missing_start_point() {
        let layer = line_layer(&[0.0, 1.0]);
        let err = layer
            .search(&9, 1, 4, &[0.0, 0.0], euclidean_distance)
            .unwrap_err();
        assert!(matches!(err, HnswError::MissingSearchPoint));
    }

    #[test]
    fn test_search_truncates_to_k() {
        let mut layer = line_layer(&[0.0, 1.0, 2.0]);
        connect_all(&mut layer, 3);

        let found = layer
            .search(&0, 0, 4, &[0.0, 0.0], euclidean_distance)
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_search_is_deterministic() {
        let mut layer = line_layer(&[0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
        connect_all(&mut layer, 3);

        let a = layer
            .search(&0, 3, 4, &[1.7, 0.0], euclidean_distance)
            .unwrap();
        let b = layer
            .search(&0, 3, 4, &[1.7, 0.0], euclidean_distance)
            .unwrap();
        let keys_a: Vec<usize> = a.iter().map(|c| c.key).collect();
        let keys_b: Vec<usize> = b.iter().map(|c| c.key).collect();
        assert_eq!(keys_a, keys_b);
    }
}
