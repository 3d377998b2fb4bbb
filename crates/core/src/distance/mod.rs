//! Distance metrics over feature vectors.
//!
//! Every metric returns a distance where **lower is closer**. The public
//! functions dispatch through a [`DistanceKernel`] chosen once per process by a
//! CPU capability check: AVX2+FMA on x86_64, NEON on aarch64, scalar otherwise.
//! The vectorized kernels fall back to the scalar ones for dimensions that are
//! not a multiple of [`SIMD_LANES`](crate::config::SIMD_LANES).

/// Scalar baseline kernels.
pub mod scalar;
/// Vectorized kernels (AVX2+FMA, NEON).
pub mod simd;

use std::sync::OnceLock;

/// Compare two floats with a machine epsilon scaled to their magnitude and to
/// the requested precision in units in the last place.
///
/// Subnormal differences are always considered equal.
#[inline]
pub fn is_almost_equal_ulp(x: f32, y: f32, ulp: u32) -> bool {
    let diff = (x - y).abs();
    diff <= f32::EPSILON * (x + y).abs() * ulp as f32 || diff < f32::MIN_POSITIVE
}

/// [`is_almost_equal_ulp`] with a precision of 2 ULP.
#[inline]
pub fn is_almost_equal(x: f32, y: f32) -> bool {
    is_almost_equal_ulp(x, y, 2)
}

type DistanceFn = fn(&[f32], &[f32]) -> f32;

/// A table of distance functions selected for the running CPU.
#[derive(Clone, Copy)]
pub struct DistanceKernel {
    name: &'static str,
    cosine: DistanceFn,
    euclidean_sq: DistanceFn,
}

impl DistanceKernel {
    /// The portable scalar kernel.
    pub const SCALAR: DistanceKernel = DistanceKernel {
        name: "scalar",
        cosine: scalar::cosine_distance,
        euclidean_sq: scalar::euclidean_sq,
    };

    /// Pick the widest kernel the CPU supports.
    pub fn detect() -> DistanceKernel {
        #[cfg(target_arch = "x86_64")]
        {
            if std::arch::is_x86_feature_detected!("avx2")
                && std::arch::is_x86_feature_detected!("fma")
            {
                return DistanceKernel {
                    name: "avx2+fma",
                    cosine: simd::avx2_cosine_distance,
                    euclidean_sq: simd::avx2_euclidean_sq,
                };
            }
        }
        #[cfg(target_arch = "aarch64")]
        {
            if std::arch::is_aarch64_feature_detected!("neon") {
                return DistanceKernel {
                    name: "neon",
                    cosine: simd::neon_cosine_distance,
                    euclidean_sq: simd::neon_euclidean_sq,
                };
            }
        }
        DistanceKernel::SCALAR
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn cosine_distance(&self, x: &[f32], y: &[f32]) -> f32 {
        (self.cosine)(x, y)
    }

    #[inline]
    pub fn euclidean_sq(&self, x: &[f32], y: &[f32]) -> f32 {
        (self.euclidean_sq)(x, y)
    }
}

impl std::fmt::Debug for DistanceKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistanceKernel").field("name", &self.name).finish()
    }
}

static KERNEL: OnceLock<DistanceKernel> = OnceLock::new();

/// The process-wide kernel, detected on first use.
#[inline]
pub fn kernel() -> &'static DistanceKernel {
    KERNEL.get_or_init(|| {
        let k = DistanceKernel::detect();
        tracing::debug!(kernel = k.name(), "distance kernel selected");
        k
    })
}

/// Cosine distance `1 - cos(x, y)`. Range: \[0, 2\]; `1.0` for degenerate vectors.
#[inline]
pub fn cosine_distance(x: &[f32], y: &[f32]) -> f32 {
    kernel().cosine_distance(x, y)
}

/// Squared Euclidean distance (L2²). Range: \[0, ∞).
#[inline]
pub fn euclidean_sq(x: &[f32], y: &[f32]) -> f32 {
    kernel().euclidean_sq(x, y)
}

/// Distance metric used by the float-vector indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DistanceMetric {
    /// Cosine distance: `1 - cosine_similarity`.
    Cosine,
    /// Squared Euclidean distance.
    Euclidean,
}

impl DistanceMetric {
    #[inline]
    pub fn distance(&self, x: &[f32], y: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => cosine_distance(x, y),
            DistanceMetric::Euclidean => euclidean_sq(x, y),
        }
    }
}
