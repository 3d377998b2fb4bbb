//! Partitioned parallel bucket scans and top-k selection.
//!
//! One task per selected bucket is spawned on the worker pool. Each task owns
//! a disjoint `&mut` slice of a single results buffer, carved out with
//! `split_at_mut` along the ranges from [`plan_ranges`], and writes one
//! [`Hit`] per record in bucket order. The scope's latch is the only
//! synchronization between the tasks and the final sort.

use std::cmp::Ordering;
use std::sync::Arc;

use super::bucket::{plan_ranges, FrozenBuckets};
use super::{Neighbor, SearchResponse};
use crate::concurrency::WorkerPool;
use crate::error::Result;

/// One scored candidate: where it lives and how far it is from the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Hit {
    pub(crate) distance: f32,
    pub(crate) ordinal: u64,
    pub(crate) bucket: usize,
    pub(crate) offset: usize,
}

impl Hit {
    const UNSET: Hit = Hit {
        distance: f32::INFINITY,
        ordinal: u64::MAX,
        bucket: usize::MAX,
        offset: usize::MAX,
    };

    /// Ascending distance, then ascending ingestion ordinal.
    #[inline]
    pub(crate) fn rank(a: &Hit, b: &Hit) -> Ordering {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.ordinal.cmp(&b.ordinal))
    }
}

/// Score every record of the `selected` buckets in parallel.
///
/// `distance(bucket, offset)` is called exactly once per candidate, from the
/// task that owns `bucket`.
pub(crate) fn scan_buckets<F>(
    pool: &WorkerPool,
    buckets: &FrozenBuckets,
    selected: &[usize],
    distance: F,
) -> Result<Vec<Hit>>
where
    F: Fn(usize, usize) -> f32 + Sync,
{
    let ranges = plan_ranges(selected.iter().map(|&pos| buckets.bucket(pos).len()));
    let total = ranges.last().map_or(0, |r| r.end);
    tracing::debug!(
        buckets = selected.len(),
        candidates = total,
        "dispatching bucket scans"
    );

    let mut hits = vec![Hit::UNSET; total];
    let mut parts = Vec::with_capacity(ranges.len());
    let mut rest = hits.as_mut_slice();
    for range in &ranges {
        let (part, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
        parts.push(part);
        rest = tail;
    }
    debug_assert!(rest.is_empty());

    let distance = &distance;
    pool.scope(move |s| {
        for (&bucket, part) in selected.iter().zip(parts) {
            let ordinals = &buckets.bucket(bucket).ordinals;
            s.spawn(move || {
                for (offset, slot) in part.iter_mut().enumerate() {
                    *slot = Hit {
                        distance: distance(bucket, offset),
                        ordinal: ordinals[offset],
                        bucket,
                        offset,
                    };
                }
            });
        }
    })?;

    Ok(hits)
}

/// Keep the `top_k` best hits, sorted best first.
pub(crate) fn select_top_k(mut hits: Vec<Hit>, top_k: usize) -> Vec<Hit> {
    let k = top_k.min(hits.len());
    if k == 0 {
        return Vec::new();
    }
    if k < hits.len() {
        hits.select_nth_unstable_by(k - 1, Hit::rank);
        hits.truncate(k);
    }
    hits.sort_unstable_by(Hit::rank);
    hits
}

/// Resolve ranked hits into a response.
pub(crate) fn respond(buckets: &FrozenBuckets, hits: &[Hit]) -> SearchResponse {
    let neighbors = hits
        .iter()
        .map(|hit| Neighbor {
            record: Arc::clone(&buckets.bucket(hit.bucket).records[hit.offset]),
            distance: hit.distance,
        })
        .collect();
    SearchResponse {
        neighbors,
        total_count: buckets.total(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::bucket::Buckets;
    use crate::record::Record;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn frozen(labels: &[i32]) -> FrozenBuckets {
        let mut b = Buckets::new(Some(1));
        for (i, &label) in labels.iter().enumerate() {
            b.push(Record::new(format!("{i}"), label, vec![i as f32]));
        }
        b.freeze()
    }

    #[test]
    fn test_select_top_k_orders_and_truncates() {
        let hits: Vec<Hit> = [3.0, 1.0, 2.0, 0.5]
            .iter()
            .enumerate()
            .map(|(i, &d)| Hit {
                distance: d,
                ordinal: i as u64,
                bucket: 0,
                offset: i,
            })
            .collect();
        let top = select_top_k(hits.clone(), 2);
        assert_eq!(top.iter().map(|h| h.distance).collect::<Vec<_>>(), vec![0.5, 1.0]);
        assert_eq!(select_top_k(hits.clone(), 10).len(), 4);
        assert!(select_top_k(hits, 0).is_empty());
    }

    #[test]
    fn test_ties_break_by_ordinal() {
        let hits: Vec<Hit> = [4u64, 1, 3, 0, 2]
            .iter()
            .map(|&ordinal| Hit {
                distance: 1.0,
                ordinal,
                bucket: 0,
                offset: ordinal as usize,
            })
            .collect();
        let top = select_top_k(hits, 3);
        assert_eq!(top.iter().map(|h| h.ordinal).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_scan_fills_every_slot() {
        let pool = WorkerPool::new(3).unwrap();
        let buckets = frozen(&[1, 2, 1, 3, 2, 1]);
        let selected = buckets.select(&HashSet::new());
        let hits = scan_buckets(&pool, &buckets, &selected, |b, o| {
            buckets.bucket(b).records[o].values[0]
        })
        .unwrap();
        assert_eq!(hits.len(), 6);
        assert!(hits.iter().all(|h| h.ordinal != u64::MAX));
        let mut ordinals: Vec<u64> = hits.iter().map(|h| h.ordinal).collect();
        ordinals.sort_unstable();
        assert_eq!(ordinals, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn test_scan_nothing_selected() {
        let pool = WorkerPool::new(2).unwrap();
        let buckets = frozen(&[]);
        let hits = scan_buckets(&pool, &buckets, &[], |_, _| 0.0).unwrap();
        assert!(hits.is_empty());
        assert_eq!(respond(&buckets, &hits).total_count, 0);
    }

    #[test]
    fn test_panicking_distance_fails_scan() {
        let pool = WorkerPool::new(2).unwrap();
        let buckets = frozen(&[1, 2]);
        let selected = buckets.select(&HashSet::new());
        let err = scan_buckets(&pool, &buckets, &selected, |b, _| {
            if b == 1 {
                panic!("bad bucket");
            }
            0.0
        })
        .unwrap_err();
        assert!(err.to_string().contains("bad bucket"));
    }

    proptest! {
        #[test]
        fn prop_parallel_scan_matches_sequential(
            labels in prop::collection::vec(0i32..6, 0..120),
            workers in 1usize..6,
        ) {
            let pool = WorkerPool::new(workers).unwrap();
            let buckets = frozen(&labels);
            let selected = buckets.select(&HashSet::new());
            let score = |b: usize, o: usize| (buckets.bucket(b).records[o].values[0] * 0.37).sin();

            let mut parallel = scan_buckets(&pool, &buckets, &selected, score).unwrap();
            let mut sequential = Vec::new();
            for &b in &selected {
                for o in 0..buckets.bucket(b).len() {
                    sequential.push(Hit {
                        distance: score(b, o),
                        ordinal: buckets.bucket(b).ordinals[o],
                        bucket: b,
                        offset: o,
                    });
                }
            }
            parallel.sort_by(Hit::rank);
            sequential.sort_by(Hit::rank);
            prop_assert_eq!(parallel, sequential);
        }

        #[test]
        fn prop_top_k_is_sorted_prefix(
            distances in prop::collection::vec(0.0f32..10.0, 0..200),
            k in 0usize..250,
        ) {
            let hits: Vec<Hit> = distances
                .iter()
                .enumerate()
                .map(|(i, &d)| Hit { distance: d, ordinal: i as u64, bucket: 0, offset: i })
                .collect();
            let mut full = hits.clone();
            full.sort_by(Hit::rank);
            let top = select_top_k(hits, k);
            prop_assert_eq!(top.len(), k.min(distances.len()));
            prop_assert_eq!(&top[..], &full[..top.len()]);
        }
    }
}
