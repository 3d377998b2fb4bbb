//! Exact brute-force index over cosine distance.

use std::sync::Arc;

use super::bucket::{check_batch, check_dimension, Buckets, FrozenBuckets};
use super::lifecycle::Lifecycle;
use super::scan::{respond, scan_buckets, select_top_k};
use super::{IndexOptions, SearchRequest, SearchResponse};
use crate::concurrency::WorkerPool;
use crate::distance;
use crate::error::{IndexError, Result};
use crate::record::Record;

/// Exact index: every selected record is scored against the query.
///
/// Building and Serving differ only in mutability; sealing just freezes the
/// label buckets.
pub struct FlatIndex {
    pool: WorkerPool,
    finalize_on_search: bool,
    state: Lifecycle<Buckets, FrozenBuckets>,
}

impl FlatIndex {
    pub fn new(options: &IndexOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            pool: WorkerPool::new(options.workers)?,
            finalize_on_search: options.finalize_on_search,
            state: Lifecycle::new(Buckets::new(options.dimension)),
        })
    }

    pub fn add(&self, record: Record) -> Result<()> {
        self.add_batch(vec![record])
    }

    /// Append a batch; nothing is applied unless every record is valid.
    pub fn add_batch(&self, batch: Vec<Record>) -> Result<()> {
        self.state.mutate(|buckets| {
            let dimension = check_batch(buckets.dimension(), &batch)?;
            buckets.set_dimension(dimension);
            for record in batch {
                buckets.push(record);
            }
            Ok(())
        })
    }

    pub fn finalize(&self) {
        self.seal();
    }

    fn seal(&self) -> Arc<FrozenBuckets> {
        self.state.seal(|buckets| {
            let frozen = std::mem::take(buckets).freeze();
            tracing::info!(
                records = frozen.total(),
                buckets = frozen.bucket_count(),
                "flat index serving"
            );
            frozen
        })
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let view = match self.state.serving() {
            Some(view) => view,
            None if self.finalize_on_search => self.seal(),
            None => return Err(IndexError::NotServing),
        };
        check_dimension(view.dimension(), request.query.len())?;

        let selected = view.select(&request.labels);
        let query = request.query.as_slice();
        let hits = scan_buckets(&self.pool, &view, &selected, |bucket, offset| {
            distance::cosine_distance(query, &view.bucket(bucket).records[offset].values)
        })?;
        Ok(respond(&view, &select_top_k(hits, request.top_k)))
    }

    pub fn total_count(&self) -> usize {
        self.state.inspect(Buckets::len, FrozenBuckets::total)
    }

    pub fn dimension(&self) -> Option<usize> {
        self.state
            .inspect(Buckets::dimension, FrozenBuckets::dimension)
    }

    pub fn is_serving(&self) -> bool {
        self.state.is_serving()
    }
}
