//! Approximate index over binary signatures.
//!
//! Ingestion keeps a running per-dimension sum next to the label buckets.
//! Sealing turns the sums into the bit-threshold vector (the mean of every
//! ingested vector) and binarizes each stored record once. Queries are
//! binarized against the same frozen thresholds and ranked by Hamming
//! distance.

use std::sync::Arc;

use super::bucket::{check_batch, check_dimension, Buckets, FrozenBuckets};
use super::lifecycle::Lifecycle;
use super::scan::{respond, scan_buckets, select_top_k};
use super::signature::Signature;
use super::{IndexOptions, SearchRequest, SearchResponse};
use crate::concurrency::WorkerPool;
use crate::error::{IndexError, Result};
use crate::record::Record;

#[derive(Debug, Default)]
struct BinaryBuilder {
    buckets: Buckets,
    sums: Vec<f64>,
}

#[derive(Debug)]
struct BinaryView {
    buckets: FrozenBuckets,
    thresholds: Vec<f32>,
    /// One signature per record, parallel to `buckets`.
    signatures: Vec<Vec<Signature>>,
}

pub struct BinaryIndex {
    pool: WorkerPool,
    signature_bits: usize,
    finalize_on_search: bool,
    state: Lifecycle<BinaryBuilder, BinaryView>,
}

fn check_capacity(dimension: Option<usize>, signature_bits: usize) -> Result<()> {
    match dimension {
        Some(d) if d > signature_bits => Err(IndexError::CapacityExceeded {
            required: d,
            capacity: signature_bits,
        }),
        _ => Ok(()),
    }
}

impl BinaryIndex {
    pub fn new(options: &IndexOptions) -> Result<Self> {
        options.validate()?;
        check_capacity(options.dimension, options.signature_bits)?;
        Ok(Self {
            pool: WorkerPool::new(options.workers)?,
            signature_bits: options.signature_bits,
            finalize_on_search: options.finalize_on_search,
            state: Lifecycle::new(BinaryBuilder {
                buckets: Buckets::new(options.dimension),
                sums: vec![0.0; options.dimension.unwrap_or(0)],
            }),
        })
    }

    pub fn add(&self, record: Record) -> Result<()> {
        self.add_batch(vec![record])
    }

    /// Append a batch; nothing is applied unless every record is valid.
    pub fn add_batch(&self, batch: Vec<Record>) -> Result<()> {
        self.state.mutate(|builder| {
            let dimension = check_batch(builder.buckets.dimension(), &batch)?;
            check_capacity(dimension, self.signature_bits)?;
            builder.buckets.set_dimension(dimension);
            if let Some(d) = dimension {
                builder.sums.resize(d, 0.0);
            }
            for record in batch {
                for (sum, &value) in builder.sums.iter_mut().zip(&record.values) {
                    *sum += value as f64;
                }
                builder.buckets.push(record);
            }
            Ok(())
        })
    }

    pub fn finalize(&self) {
        self.seal();
    }

    fn seal(&self) -> Arc<BinaryView> {
        let bits = self.signature_bits;
        self.state.seal(|builder| {
            let count = builder.buckets.len();
            // With nothing ingested the thresholds stay at zero.
            let thresholds: Vec<f32> = if count == 0 {
                vec![0.0; builder.buckets.dimension().unwrap_or(0)]
            } else {
                builder
                    .sums
                    .iter()
                    .map(|&sum| (sum / count as f64) as f32)
                    .collect()
            };

            // Signatures are laid out in frozen bucket order (ascending label).
            let signatures = builder
                .buckets
                .iter()
                .map(|bucket| {
                    bucket
                        .records
                        .iter()
                        .map(|r| Signature::binarize(&r.values, &thresholds, bits))
                        .collect()
                })
                .collect();
            let buckets = std::mem::take(&mut builder.buckets).freeze();
            tracing::info!(
                records = count,
                buckets = buckets.bucket_count(),
                signature_bits = bits,
                "binary index serving"
            );

            BinaryView {
                buckets,
                thresholds,
                signatures,
            }
        })
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let view = match self.state.serving() {
            Some(view) => view,
            None if self.finalize_on_search => self.seal(),
            None => return Err(IndexError::NotServing),
        };
        check_dimension(view.buckets.dimension(), request.query.len())?;
        check_capacity(Some(request.query.len()), self.signature_bits)?;
        if view.buckets.dimension().is_none() {
            // Nothing was ever ingested and no dimension was configured.
            return Ok(SearchResponse::default());
        }

        let query = Signature::binarize(&request.query, &view.thresholds, self.signature_bits);
        let selected = view.buckets.select(&request.labels);
        let signatures = &view.signatures;
        let hits = scan_buckets(&self.pool, &view.buckets, &selected, |bucket, offset| {
            query.hamming(&signatures[bucket][offset]) as f32
        })?;
        Ok(respond(&view.buckets, &select_top_k(hits, request.top_k)))
    }

    /// The bit-threshold vector, once the index is serving.
    pub fn thresholds(&self) -> Option<Vec<f32>> {
        self.state.serving().map(|view| view.thresholds.clone())
    }

    pub fn signature_bits(&self) -> usize {
        self.signature_bits
    }

    pub fn total_count(&self) -> usize {
        self.state
            .inspect(|b| b.buckets.len(), |v| v.buckets.total())
    }

    pub fn dimension(&self) -> Option<usize> {
        self.state
            .inspect(|b| b.buckets.dimension(), |v| v.buckets.dimension())
    }

    pub fn is_serving(&self) -> bool {
        self.state.is_serving()
    }
}
