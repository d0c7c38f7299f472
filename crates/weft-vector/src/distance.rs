//! Distance metrics.
//!
//! All functions validate that the two slices have the same length and
//! otherwise only promise a consistent ordering: lower return values mean
//! closer vectors. The accumulation loops process chunks of 4 so the compiler
//! can auto-vectorize them in release builds.

use crate::{Result, VectorError};

/// A pluggable distance function.
///
/// Takes a pair of equal-length vectors and returns a scalar where lower
/// means closer. Implementations may fail on malformed input (the provided
/// metrics fail only on dimension mismatch). Indices treat the returned value
/// as opaque: symmetry and non-negativity are not assumed.
pub type DistanceFn = fn(&[f32], &[f32]) -> Result<f32>;

fn check_dims(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(VectorError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(())
}

/// Compute cosine distance between two vectors.
///
/// Cosine distance = 1 - (a · b) / (‖a‖ * ‖b‖), ranging over [0, 2] for
/// non-degenerate inputs: 0 = identical direction, 1 = orthogonal,
/// 2 = opposite direction.
///
/// A zero vector yields NaN rather than an error or a clamped value. Callers
/// that order by distance must therefore tolerate NaN; the HNSW neighbor
/// eviction rule does so explicitly.
///
/// # Example
///
/// ```
/// use weft_vector::cosine_distance;
///
/// let a = [1.0, 0.0];
/// let b = [0.0, 1.0];
/// assert!((cosine_distance(&a, &b).unwrap() - 1.0).abs() < 0.001);
/// ```
#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dims(a, b)?;

    let (dot, norm_a, norm_b) = dot_and_norms(a, b);
    Ok(1.0 - dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Compute Euclidean (L2) distance between two vectors.
///
/// Returns sqrt(sum((a[i] - b[i])^2)).
///
/// # Example
///
/// ```
/// use weft_vector::euclidean_distance;
///
/// let a = [0.0, 0.0, 0.0];
/// let b = [3.0, 4.0, 0.0];
/// assert!((euclidean_distance(&a, &b).unwrap() - 5.0).abs() < 0.001);
/// ```
#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dims(a, b)?;

    let mut sum = 0.0f32;
    let chunks = a.len() / 4;

    for i in 0..chunks {
        let base = i * 4;
        let d0 = a[base] - b[base];
        let d1 = a[base + 1] - b[base + 1];
        let d2 = a[base + 2] - b[base + 2];
        let d3 = a[base + 3] - b[base + 3];
        sum += d0 * d0 + d1 * d1 + d2 * d2 + d3 * d3;
    }

    for i in (chunks * 4)..a.len() {
        let d = a[i] - b[i];
        sum += d * d;
    }

    Ok(sum.sqrt())
}

/// Compute inner-product distance between two vectors.
///
/// Returns -(a · b), so that a larger dot product (more similar under MIPS)
/// orders as a smaller distance. The result is negative for vectors with a
/// positive dot product; only the ordering matters.
///
/// # Example
///
/// ```
/// use weft_vector::inner_product_distance;
///
/// let a = [1.0, 2.0, 3.0];
/// let b = [4.0, 5.0, 6.0];
/// assert!((inner_product_distance(&a, &b).unwrap() + 32.0).abs() < 0.001);
/// ```
#[inline]
pub fn inner_product_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dims(a, b)?;

    let mut sum = 0.0f32;
    let chunks = a.len() / 4;

    for i in 0..chunks {
        let base = i * 4;
        sum += a[base] * b[base]
            + a[base + 1] * b[base + 1]
            + a[base + 2] * b[base + 2]
            + a[base + 3] * b[base + 3];
    }

    for i in (chunks * 4)..a.len() {
        sum += a[i] * b[i];
    }

    Ok(-sum)
}

/// Compute dot product and squared norms in a single pass.
///
/// Returns (dot, norm_a_squared, norm_b_squared).
#[inline]
fn dot_and_norms(a: &[f32], b: &[f32]) -> (f32, f32, f32) {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    let chunks = a.len() / 4;

    for i in 0..chunks {
        let base = i * 4;

        dot += a[base] * b[base]
            + a[base + 1] * b[base + 1]
            + a[base + 2] * b[base + 2]
            + a[base + 3] * b[base + 3];

        norm_a += a[base] * a[base]
            + a[base + 1] * a[base + 1]
            + a[base + 2] * a[base + 2]
            + a[base + 3] * a[base + 3];

        norm_b += b[base] * b[base]
            + b[base + 1] * b[base + 1]
            + b[base + 2] * b[base + 2]
            + b[base + 3] * b[base + 3];
    }

    for i in (chunks * 4)..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    (dot, norm_a, norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_distance() {
        // Identical vectors = 0 distance
        let a = [1.0, 2.0, 3.0];
        assert!(cosine_distance(&a, &a).unwrap() < 0.001);

        // Orthogonal vectors = 1 distance
        let b = [1.0, 0.0];
        let c = [0.0, 1.0];
        assert!((cosine_distance(&b, &c).unwrap() - 1.0).abs() < 0.001);

        // Opposite vectors = 2 distance
        let d = [1.0, 0.0];
        let e = [-1.0, 0.0];
        assert!((cosine_distance(&d, &e).unwrap() - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_zero_vector_is_nan() {
        let zero = [0.0, 0.0, 0.0];
        let b = [1.0, 2.0, 3.0];
        assert!(cosine_distance(&zero, &b).unwrap().is_nan());
        assert!(cosine_distance(&zero, &zero).unwrap().is_nan());
    }

    #[test]
    fn test_euclidean_distance() {
        let a = [0.0, 0.0, 0.0];
        let b = [3.0, 4.0, 0.0];
        assert!((euclidean_distance(&a, &b).unwrap() - 5.0).abs() < 0.001);

        // Same vectors = 0 distance
        let c = [1.0, 2.0, 3.0];
        assert!(euclidean_distance(&c, &c).unwrap() < 0.001);
    }

    #[test]
    fn test_inner_product_distance() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        // 1*4 + 2*5 + 3*6 = 32, negated
        assert!((inner_product_distance(&a, &b).unwrap() + 32.0).abs() < 0.001);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = [1.0, 2.0];
        let b = [1.0, 2.0, 3.0];
        assert!(matches!(
            cosine_distance(&a, &b),
            Err(VectorError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert!(euclidean_distance(&a, &b).is_err());
        assert!(inner_product_distance(&a, &b).is_err());
    }

    #[test]
    fn test_high_dimensional() {
        // 128 dimensions, each component differing by 1
        let a: Vec<f32> = (0..128).map(|i| i as f32).collect();
        let b: Vec<f32> = (0..128).map(|i| (i + 1) as f32).collect();

        let d = euclidean_distance(&a, &b).unwrap();
        assert!((d - (128.0f32).sqrt()).abs() < 0.01);
    }

    #[test]
    fn test_ordering_is_consistent() {
        // The index only relies on ordering; spot-check that a closer vector
        // orders below a farther one under every metric.
        let query = [1.0, 1.0, 1.0, 1.0];
        let near = [1.0, 1.0, 1.0, 0.9];
        let far = [-1.0, 0.5, -0.3, 0.0];

        for dist in [
            cosine_distance as DistanceFn,
            euclidean_distance as DistanceFn,
            inner_product_distance as DistanceFn,
        ] {
            let dn = dist(&near, &query).unwrap();
            let df = dist(&far, &query).unwrap();
            assert!(dn < df);
        }
    }
}
