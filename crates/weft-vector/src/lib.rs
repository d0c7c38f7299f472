//! Distance functions for weft's vector indices.
//!
//! This crate provides the distance metrics used by the index crates:
//!
//! - **Cosine**: angle-based, the default for normalized embeddings
//! - **Euclidean (L2)**: straight-line distance, good for general use
//! - **Inner product**: negated dot product, for maximum inner product search
//!
//! All metrics share the [`DistanceFn`] signature: a fallible function from a
//! pair of equal-length `f32` slices to a scalar where lower means closer.
//! Only the ordering of the returned values matters; symmetry and
//! non-negativity are not required. An index stores whichever `DistanceFn` it
//! was built with, so embedders can plug in their own metric.
//!
//! # Example
//!
//! ```
//! use weft_vector::{cosine_distance, euclidean_distance};
//!
//! let a = [1.0, 0.0];
//! let b = [0.0, 1.0];
//!
//! // Orthogonal vectors are at cosine distance 1.
//! assert!((cosine_distance(&a, &b).unwrap() - 1.0).abs() < 0.001);
//!
//! // Mismatched dimensions are an error, not a panic.
//! assert!(euclidean_distance(&a, &[1.0, 2.0, 3.0]).is_err());
//! ```

mod distance;

pub use distance::{
    cosine_distance, euclidean_distance, inner_product_distance, DistanceFn,
};

/// Error type for vector operations.
#[derive(Debug, thiserror::Error)]
pub enum VectorError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result type for vector operations.
pub type Result<T> = std::result::Result<T, VectorError>;
