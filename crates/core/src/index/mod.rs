//! Label-partitioned k-nearest-neighbor indexes.
//!
//! Three strategies share one contract:
//!
//! - [`FlatIndex`]: exact cosine distance over every selected record.
//! - [`BinaryIndex`]: Hamming distance over signatures binarized against the
//!   per-dimension mean of the ingested vectors.
//! - [`GraphIndex`]: approximate HNSW search over raw vectors.
//!
//! Every index moves through two phases. While **Building**, records can be
//! added. The first [`Index::finalize`] (or, by default, the first search)
//! seals it into **Serving**, after which it only answers queries. The
//! [`Index`] enum dispatches to whichever strategy was chosen at construction.

mod binary;
mod bucket;
mod flat;
pub mod hnsw;
mod lifecycle;
mod scan;
mod signature;

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

pub use binary::BinaryIndex;
pub use flat::FlatIndex;
pub use hnsw::{GraphIndex, HnswConfig};
pub use signature::Signature;

use crate::config::{DEFAULT_SIGNATURE_BITS, DEFAULT_TOP_K, DEFAULT_WORKER_THREADS};
use crate::error::{IndexError, Result};
use crate::record::{Label, Record};
use crate::source::RecordReader;

/// A k-NN query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: Vec<f32>,
    /// Maximum number of neighbors to return.
    pub top_k: usize,
    /// Labels to search; empty means all.
    pub labels: HashSet<Label>,
}

impl SearchRequest {
    pub fn new(query: Vec<f32>) -> Self {
        Self {
            query,
            top_k: DEFAULT_TOP_K,
            labels: HashSet::new(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_labels(mut self, labels: impl IntoIterator<Item = Label>) -> Self {
        self.labels = labels.into_iter().collect();
        self
    }
}

/// A ranked match.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub record: Arc<Record>,
    pub distance: f32,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    /// At most `top_k` neighbors, ascending by distance.
    pub neighbors: Vec<Neighbor>,
    /// Number of records ever ingested, regardless of any label filter.
    pub total_count: usize,
}

/// Index strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Flat,
    Binary,
    #[serde(rename = "hnsw")]
    Graph,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Flat => "flat",
            IndexKind::Binary => "binary",
            IndexKind::Graph => "hnsw",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(IndexKind::Flat),
            "binary" => Ok(IndexKind::Binary),
            "hnsw" => Ok(IndexKind::Graph),
            other => Err(IndexError::InvalidConfig(format!(
                "unknown index type '{other}', expected flat, binary or hnsw"
            ))),
        }
    }
}

/// Construction-time options shared by every strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexOptions {
    /// Fixed feature dimension; `None` adopts the first ingested record's.
    pub dimension: Option<usize>,
    /// Worker threads used for bucket scans (flat and binary).
    pub workers: usize,
    /// Signature capacity of the binary index; must be at least the dimension.
    pub signature_bits: usize,
    /// Seal the index on the first search instead of failing with
    /// [`IndexError::NotServing`].
    pub finalize_on_search: bool,
    pub hnsw: HnswConfig,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            dimension: None,
            workers: DEFAULT_WORKER_THREADS,
            signature_bits: DEFAULT_SIGNATURE_BITS,
            finalize_on_search: true,
            hnsw: HnswConfig::default(),
        }
    }
}

impl IndexOptions {
    pub fn validate(&self) -> Result<()> {
        if self.dimension == Some(0) {
            return Err(IndexError::InvalidConfig("dimension must be positive".into()));
        }
        if self.workers == 0 {
            return Err(IndexError::InvalidConfig(
                "worker count must be at least 1".into(),
            ));
        }
        if self.signature_bits == 0 {
            return Err(IndexError::InvalidConfig(
                "signature capacity must be positive".into(),
            ));
        }
        self.hnsw.validate()
    }
}

/// An index of one of the supported strategies.
pub enum Index {
    Flat(FlatIndex),
    Binary(BinaryIndex),
    Graph(GraphIndex),
}

macro_rules! dispatch {
    ($self:ident, $inner:ident => $body:expr) => {
        match $self {
            Index::Flat($inner) => $body,
            Index::Binary($inner) => $body,
            Index::Graph($inner) => $body,
        }
    };
}

impl Index {
    pub fn new(kind: IndexKind, options: IndexOptions) -> Result<Self> {
        let index = match kind {
            IndexKind::Flat => Index::Flat(FlatIndex::new(&options)?),
            IndexKind::Binary => Index::Binary(BinaryIndex::new(&options)?),
            IndexKind::Graph => Index::Graph(GraphIndex::new(&options)?),
        };
        tracing::debug!(kind = %kind, ?options, "index created");
        Ok(index)
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            Index::Flat(_) => IndexKind::Flat,
            Index::Binary(_) => IndexKind::Binary,
            Index::Graph(_) => IndexKind::Graph,
        }
    }

    /// Ingest one record. Fails with [`IndexError::Sealed`] once serving.
    pub fn add(&self, record: Record) -> Result<()> {
        dispatch!(self, index => index.add(record))
    }

    /// Ingest a batch atomically: either every record is added or none is.
    pub fn add_batch(&self, batch: Vec<Record>) -> Result<()> {
        dispatch!(self, index => index.add_batch(batch))
    }

    /// Drain a record source into the index. The source is fully decoded
    /// before anything is ingested, so a corrupt stream leaves the index
    /// untouched. Returns the number of records added.
    pub fn build_from_source<I>(&self, source: I) -> Result<usize>
    where
        I: IntoIterator<Item = Result<Record>>,
    {
        let start = Instant::now();
        let batch = source.into_iter().collect::<Result<Vec<_>>>().map_err(|e| {
            tracing::error!(error = %e, "failed to read record source");
            e
        })?;
        let count = batch.len();
        self.add_batch(batch)?;
        let elapsed = start.elapsed().as_secs_f64();
        tracing::info!(
            records = count,
            elapsed_secs = elapsed,
            "indexed {} records in {:.3} seconds",
            count,
            elapsed
        );
        Ok(count)
    }

    /// [`Index::build_from_source`] over a feature file.
    pub fn build_from_path(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), kind = %self.kind(), "building index");
        self.build_from_source(RecordReader::open(path)?)
    }

    /// Seal the index for serving. Idempotent.
    pub fn finalize(&self) {
        dispatch!(self, index => index.finalize())
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let start = Instant::now();
        let response = dispatch!(self, index => index.search(request))?;
        tracing::debug!(
            kind = %self.kind(),
            top_k = request.top_k,
            labels = request.labels.len(),
            returned = response.neighbors.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "search finished"
        );
        Ok(response)
    }

    pub fn total_count(&self) -> usize {
        dispatch!(self, index => index.total_count())
    }

    pub fn dimension(&self) -> Option<usize> {
        dispatch!(self, index => index.dimension())
    }

    pub fn is_serving(&self) -> bool {
        dispatch!(self, index => index.is_serving())
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("kind", &self.kind())
            .field("dimension", &self.dimension())
            .field("total_count", &self.total_count())
            .field("serving", &self.is_serving())
            .finish()
    }
}
