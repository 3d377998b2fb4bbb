//! Scalar baseline distance kernels.
//!
//! These are the reference implementations: the vectorized kernels in
//! [`super::simd`] must agree with them within float tolerance, and they are
//! used directly whenever no vector unit is available or the dimension is not
//! a multiple of [`SIMD_LANES`](crate::config::SIMD_LANES).

use super::is_almost_equal;

/// Cosine distance `1 - dot(x, y) / (|x| |y|)`.
///
/// Returns `1.0` when either norm is indistinguishable from zero.
pub fn cosine_distance(x: &[f32], y: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_x = 0.0f32;
    let mut norm_y = 0.0f32;
    for i in 0..x.len() {
        dot += x[i] * y[i];
        norm_x += x[i] * x[i];
        norm_y += y[i] * y[i];
    }
    finish_cosine(dot, norm_x, norm_y)
}

/// Squared Euclidean distance.
pub fn euclidean_sq(x: &[f32], y: &[f32]) -> f32 {
    let mut sum = 0.0f32;
    for i in 0..x.len() {
        let d = x[i] - y[i];
        sum += d * d;
    }
    sum
}

/// Shared tail of every cosine kernel once dot and squared norms are reduced.
#[inline]
pub(crate) fn finish_cosine(dot: f32, norm_x: f32, norm_y: f32) -> f32 {
    if is_almost_equal(norm_x, 0.0) || is_almost_equal(norm_y, 0.0) {
        return 1.0;
    }
    1.0 - dot / (norm_x * norm_y).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert!(cosine_distance(&v, &v).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let d = cosine_distance(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!((d - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let d = cosine_distance(&[1.0, 2.0], &[-1.0, -2.0]);
        assert!((d - 2.0).abs() < 1e-6, "got {d}");
    }

    #[test]
    fn test_cosine_zero_vector_is_maximal() {
        assert_eq!(cosine_distance(&[0.0; 4], &[1.0, 0.0, 0.0, 0.0]), 1.0);
        assert_eq!(cosine_distance(&[1.0, 0.0, 0.0, 0.0], &[0.0; 4]), 1.0);
        assert_eq!(cosine_distance(&[0.0; 4], &[0.0; 4]), 1.0);
        assert!(!cosine_distance(&[0.0; 4], &[0.0; 4]).is_nan());
    }

    #[test]
    fn test_euclidean_sq() {
        assert!((euclidean_sq(&[0.0, 0.0, 0.0], &[3.0, 4.0, 0.0]) - 25.0).abs() < 1e-6);
        assert_eq!(euclidean_sq(&[1.5, -2.0], &[1.5, -2.0]), 0.0);
    }
}
