//! Label buckets and result-range planning.
//!
//! During ingestion records are appended to a [`Buckets`] map keyed by label.
//! Sealing freezes it into [`FrozenBuckets`]: the same buckets laid out in
//! ascending label order, addressable by position, never mutated again.

use std::collections::{BTreeMap, HashSet};
use std::ops::Range;
use std::sync::Arc;

use crate::config::BUILD_PROGRESS_INTERVAL;
use crate::error::{IndexError, Result};
use crate::record::{Label, Record};

/// All records sharing one label, in ingestion order.
#[derive(Debug, Default)]
pub(crate) struct Bucket {
    pub(crate) records: Vec<Arc<Record>>,
    /// Ingestion ordinal of each record, parallel to `records`.
    pub(crate) ordinals: Vec<u64>,
}

impl Bucket {
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}

/// Fail unless `actual` matches the index dimension. An unknown dimension
/// (nothing ingested, none configured) accepts anything.
pub(crate) fn check_dimension(expected: Option<usize>, actual: usize) -> Result<()> {
    match expected {
        Some(expected) if expected != actual => {
            Err(IndexError::DimensionMismatch { expected, actual })
        }
        _ => Ok(()),
    }
}

/// Validate a whole batch before any of it is applied. Returns the dimension
/// in force once the batch is accepted.
pub(crate) fn check_batch(current: Option<usize>, batch: &[Record]) -> Result<Option<usize>> {
    let Some(first) = batch.first() else {
        return Ok(current);
    };
    let dimension = current.unwrap_or_else(|| first.dimension());
    if dimension == 0 {
        return Err(IndexError::InvalidConfig(
            "feature vectors must not be empty".into(),
        ));
    }
    for record in batch {
        check_dimension(Some(dimension), record.dimension())?;
    }
    Ok(Some(dimension))
}

/// Label-keyed buckets under construction.
#[derive(Debug, Default)]
pub(crate) struct Buckets {
    dimension: Option<usize>,
    map: BTreeMap<Label, Bucket>,
    total: u64,
}

impl Buckets {
    pub(crate) fn new(dimension: Option<usize>) -> Self {
        Self {
            dimension,
            ..Self::default()
        }
    }

    pub(crate) fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub(crate) fn set_dimension(&mut self, dimension: Option<usize>) {
        self.dimension = dimension;
    }

    pub(crate) fn len(&self) -> usize {
        self.total as usize
    }

    /// Append a record to its label's bucket and return its ingestion ordinal.
    pub(crate) fn push(&mut self, record: Record) -> u64 {
        let ordinal = self.total;
        let bucket = self.map.entry(record.label).or_default();
        bucket.records.push(Arc::new(record));
        bucket.ordinals.push(ordinal);
        self.total += 1;
        if self.total % BUILD_PROGRESS_INTERVAL == 0 {
            tracing::info!(records = self.total, "ingesting records");
        }
        ordinal
    }

    /// Buckets in ascending label order, the order [`Buckets::freeze`] keeps.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Bucket> {
        self.map.values()
    }

    pub(crate) fn freeze(self) -> FrozenBuckets {
        let mut labels = Vec::with_capacity(self.map.len());
        let mut buckets = Vec::with_capacity(self.map.len());
        for (label, bucket) in self.map {
            labels.push(label);
            buckets.push(bucket);
        }
        FrozenBuckets {
            dimension: self.dimension,
            labels,
            buckets,
            total: self.total as usize,
        }
    }
}

/// Read-only buckets in ascending label order.
#[derive(Debug, Default)]
pub(crate) struct FrozenBuckets {
    dimension: Option<usize>,
    labels: Vec<Label>,
    buckets: Vec<Bucket>,
    total: usize,
}

impl FrozenBuckets {
    pub(crate) fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub(crate) fn total(&self) -> usize {
        self.total
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub(crate) fn bucket(&self, position: usize) -> &Bucket {
        &self.buckets[position]
    }

    pub(crate) fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Positions of the buckets to scan: all of them for an empty filter,
    /// otherwise those whose label is in `filter`.
    pub(crate) fn select(&self, filter: &HashSet<Label>) -> Vec<usize> {
        if filter.is_empty() {
            return (0..self.buckets.len()).collect();
        }
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, label)| filter.contains(label))
            .map(|(position, _)| position)
            .collect()
    }
}

/// Assign each part a contiguous range of a shared buffer by accumulating
/// sizes. The ranges never overlap and exactly tile `[0, sum(sizes))`.
pub(crate) fn plan_ranges(sizes: impl IntoIterator<Item = usize>) -> Vec<Range<usize>> {
    let mut offset = 0;
    sizes
        .into_iter()
        .map(|size| {
            let range = offset..offset + size;
            offset += size;
            range
        })
        .collect()
}
