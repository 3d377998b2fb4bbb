//! SIMD-accelerated distance kernels.
//!
//! Provides NEON (aarch64) and AVX2+FMA (x86_64) implementations of cosine and
//! squared Euclidean distance over 8-lane blocks. The safe wrappers here are
//! only installed in a [`DistanceKernel`](super::DistanceKernel) after the CPU
//! capability check succeeded, and they defer to the scalar kernels when the
//! dimension is not a multiple of [`SIMD_LANES`].

use super::scalar;
use crate::config::SIMD_LANES;

// ============================================================================
// Safe entry points
// ============================================================================

#[cfg(target_arch = "x86_64")]
pub(super) fn avx2_cosine_distance(x: &[f32], y: &[f32]) -> f32 {
    debug_assert_eq!(x.len(), y.len());
    if x.len() % SIMD_LANES != 0 {
        return scalar::cosine_distance(x, y);
    }
    // Only reachable through a kernel selected after avx2+fma detection.
    unsafe { avx2_cosine_distance_impl(x, y) }
}

#[cfg(target_arch = "x86_64")]
pub(super) fn avx2_euclidean_sq(x: &[f32], y: &[f32]) -> f32 {
    debug_assert_eq!(x.len(), y.len());
    if x.len() % SIMD_LANES != 0 {
        return scalar::euclidean_sq(x, y);
    }
    unsafe { avx2_euclidean_sq_impl(x, y) }
}

#[cfg(target_arch = "aarch64")]
pub(super) fn neon_cosine_distance(x: &[f32], y: &[f32]) -> f32 {
    debug_assert_eq!(x.len(), y.len());
    if x.len() % SIMD_LANES != 0 {
        return scalar::cosine_distance(x, y);
    }
    unsafe { neon_cosine_distance_impl(x, y) }
}

#[cfg(target_arch = "aarch64")]
pub(super) fn neon_euclidean_sq(x: &[f32], y: &[f32]) -> f32 {
    debug_assert_eq!(x.len(), y.len());
    if x.len() % SIMD_LANES != 0 {
        return scalar::euclidean_sq(x, y);
    }
    unsafe { neon_euclidean_sq_impl(x, y) }
}

// ============================================================================
// AVX2+FMA implementations (x86_64)
// ============================================================================

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Horizontal sum of 8 f32 values in a __m256 register.
#[cfg(target_arch = "x86_64")]
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn hsum_f32x8(v: __m256) -> f32 {
    let hi128 = _mm256_extractf128_ps(v, 1);
    let lo128 = _mm256_castps256_ps128(v);
    let sum128 = _mm_add_ps(lo128, hi128);
    let hi64 = _mm_movehl_ps(sum128, sum128);
    let sum64 = _mm_add_ps(sum128, hi64);
    let hi32 = _mm_shuffle_ps(sum64, sum64, 0x55);
    _mm_cvtss_f32(_mm_add_ss(sum64, hi32))
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
unsafe fn avx2_cosine_distance_impl(x: &[f32], y: &[f32]) -> f32 {
    let x_ptr = x.as_ptr();
    let y_ptr = y.as_ptr();

    let mut dot = _mm256_setzero_ps();
    let mut norm_x = _mm256_setzero_ps();
    let mut norm_y = _mm256_setzero_ps();

    let blocks = x.len() / SIMD_LANES;
    for i in 0..blocks {
        let base = i * SIMD_LANES;
        let xv = _mm256_loadu_ps(x_ptr.add(base));
        let yv = _mm256_loadu_ps(y_ptr.add(base));
        dot = _mm256_fmadd_ps(xv, yv, dot);
        norm_x = _mm256_fmadd_ps(xv, xv, norm_x);
        norm_y = _mm256_fmadd_ps(yv, yv, norm_y);
    }

    scalar::finish_cosine(hsum_f32x8(dot), hsum_f32x8(norm_x), hsum_f32x8(norm_y))
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
unsafe fn avx2_euclidean_sq_impl(x: &[f32], y: &[f32]) -> f32 {
    let x_ptr = x.as_ptr();
    let y_ptr = y.as_ptr();

    let mut sum = _mm256_setzero_ps();

    let blocks = x.len() / SIMD_LANES;
    for i in 0..blocks {
        let base = i * SIMD_LANES;
        let d = _mm256_sub_ps(_mm256_loadu_ps(x_ptr.add(base)), _mm256_loadu_ps(y_ptr.add(base)));
        sum = _mm256_fmadd_ps(d, d, sum);
    }

    hsum_f32x8(sum)
}

// ============================================================================
// NEON implementations (aarch64)
// ============================================================================

#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

#[cfg(target_arch = "aarch64")]
unsafe fn neon_cosine_distance_impl(x: &[f32], y: &[f32]) -> f32 {
    let x_ptr = x.as_ptr();
    let y_ptr = y.as_ptr();

    let mut dot0 = vdupq_n_f32(0.0);
    let mut dot1 = vdupq_n_f32(0.0);
    let mut nx0 = vdupq_n_f32(0.0);
    let mut nx1 = vdupq_n_f32(0.0);
    let mut ny0 = vdupq_n_f32(0.0);
    let mut ny1 = vdupq_n_f32(0.0);

    let blocks = x.len() / SIMD_LANES;
    for i in 0..blocks {
        let base = i * SIMD_LANES;
        let x0 = vld1q_f32(x_ptr.add(base));
        let x1 = vld1q_f32(x_ptr.add(base + 4));
        let y0 = vld1q_f32(y_ptr.add(base));
        let y1 = vld1q_f32(y_ptr.add(base + 4));
        dot0 = vfmaq_f32(dot0, x0, y0);
        dot1 = vfmaq_f32(dot1, x1, y1);
        nx0 = vfmaq_f32(nx0, x0, x0);
        nx1 = vfmaq_f32(nx1, x1, x1);
        ny0 = vfmaq_f32(ny0, y0, y0);
        ny1 = vfmaq_f32(ny1, y1, y1);
    }

    scalar::finish_cosine(
        vaddvq_f32(vaddq_f32(dot0, dot1)),
        vaddvq_f32(vaddq_f32(nx0, nx1)),
        vaddvq_f32(vaddq_f32(ny0, ny1)),
    )
}

#[cfg(target_arch = "aarch64")]
unsafe fn neon_euclidean_sq_impl(x: &[f32], y: &[f32]) -> f32 {
    let x_ptr = x.as_ptr();
    let y_ptr = y.as_ptr();

    let mut s0 = vdupq_n_f32(0.0);
    let mut s1 = vdupq_n_f32(0.0);

    let blocks = x.len() / SIMD_LANES;
    for i in 0..blocks {
        let base = i * SIMD_LANES;
        let d0 = vsubq_f32(vld1q_f32(x_ptr.add(base)), vld1q_f32(y_ptr.add(base)));
        let d1 = vsubq_f32(
            vld1q_f32(x_ptr.add(base + 4)),
            vld1q_f32(y_ptr.add(base + 4)),
        );
        s0 = vfmaq_f32(s0, d0, d0);
        s1 = vfmaq_f32(s1, d1, d1);
    }

    vaddvq_f32(vaddq_f32(s0, s1))
}
