//! Binary signatures for Hamming-distance search.

/// A fixed-capacity bit vector packed into 64-bit words.
///
/// Bit `i` is set when component `i` of the source vector is strictly greater
/// than threshold `i`. Bits at or beyond the source dimension are always zero,
/// so signatures of the same capacity compare correctly regardless of padding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    words: Box<[u64]>,
}

impl Signature {
    /// Number of `u64` words needed for `capacity_bits`.
    #[inline]
    pub fn words_for(capacity_bits: usize) -> usize {
        capacity_bits.div_ceil(64)
    }

    /// An all-zero signature.
    pub fn zeroed(capacity_bits: usize) -> Self {
        Self {
            words: vec![0u64; Self::words_for(capacity_bits)].into_boxed_slice(),
        }
    }

    /// Binarize `values` against `thresholds`. Callers guarantee both slices
    /// have the same length and `values.len() <= capacity_bits`.
    pub fn binarize(values: &[f32], thresholds: &[f32], capacity_bits: usize) -> Self {
        debug_assert_eq!(values.len(), thresholds.len());
        debug_assert!(values.len() <= capacity_bits);
        let mut signature = Self::zeroed(capacity_bits);
        for (i, (&value, &threshold)) in values.iter().zip(thresholds).enumerate() {
            if value > threshold {
                signature.words[i / 64] |= 1u64 << (i % 64);
            }
        }
        signature
    }

    /// Number of differing bits.
    #[inline]
    pub fn hamming(&self, other: &Signature) -> u32 {
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    #[inline]
    pub fn get(&self, bit: usize) -> bool {
        self.words
            .get(bit / 64)
            .is_some_and(|w| w & (1u64 << (bit % 64)) != 0)
    }

    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    pub fn capacity_bits(&self) -> usize {
        self.words.len() * 64
    }
}
