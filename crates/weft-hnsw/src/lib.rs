//! In-memory HNSW (Hierarchical Navigable Small World) index for weft.
//!
//! Provides approximate nearest-neighbor search over high-dimensional `f32`
//! vectors. HNSW builds a multi-layer proximity graph where:
//!
//! - The base layer holds every key
//! - Higher layers hold exponentially thinning subsets (express lanes)
//! - Search enters at the top layer and greedily descends
//!
//! # Architecture
//!
//! ```text
//! Graph          config + layer stack + RNG, behind one RwLock
//!   └─ Layer     key -> node map for one level of the hierarchy
//!        └─ node key + shared vector + bounded neighbor set
//! ```
//!
//! The graph owns no threads and persists nothing: `add`/`delete` take the
//! write half of the lock, `search`/`lookup`/`len`/`dims` the read half.
//! Distance functions are pluggable via [`weft_vector::DistanceFn`]; cosine
//! is the default.
//!
//! # Parameters
//!
//! - `m`: max neighbors per node per layer (default: 16)
//! - `ml`: level-generation decay factor (default: 0.25)
//! - `ef_search`: frontier width during queries (default: 20)
//! - `ef_construction`: frontier width during inserts (default: 40)
//!
//! # Example
//!
//! ```
//! use weft_hnsw::{Graph, Node};
//!
//! // Cosine distance, default parameters.
//! let graph: Graph<i64> = Graph::default();
//!
//! graph
//!     .add([
//!         Node::new(1, vec![1.0, 1.0, 1.0]),
//!         Node::new(2, vec![1.0, -1.0, 0.999]),
//!         Node::new(3, vec![1.0, 0.0, -0.5]),
//!     ])
//!     .unwrap();
//!
//! let nearest = graph.search(&[0.5, 0.5, 0.5], 1).unwrap();
//! assert_eq!(nearest[0].key, 1);
//! assert_eq!(nearest[0].value, vec![1.0, 1.0, 1.0]);
//! ```

mod graph;
mod heap;
mod layer;
mod node;

pub use graph::{Graph, GraphConfig, SearchResult};
pub use node::{make_nodes, Node};

use weft_vector::VectorError;

/// Error type for graph operations.
#[derive(Debug, thiserror::Error)]
pub enum HnswError {
    /// A distance function failed, or a vector's dimensionality does not
    /// match the graph's.
    #[error("Vector error: {0}")]
    Vector(#[from] VectorError),

    #[error("Invalid configuration: {0}")]
    Config(&'static str),

    #[error("Graph is empty")]
    EmptyGraph,

    /// A layer search was started from a key the layer does not hold.
    #[error("Search start point is missing from its layer")]
    MissingSearchPoint,

    #[error("Keys and vectors must have the same length")]
    LengthMismatch,

    /// A structural postcondition failed; this is a bug, not a caller error.
    #[error("Graph invariant violated: {0}")]
    Invariant(&'static str),
}

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, HnswError>;
