//! HNSW graph structure and configuration.
//!
//! [`HnswConfig`] defines tuning parameters (M, ef_construction, ef_search, capacity).
//! [`HnswGraph`] stores the graph using a Struct-of-Arrays layout: every raw vector
//! lives in one contiguous arena, with parallel arrays for labels, records,
//! neighbor lists and layer assignments. Node ids are ingestion ordinals.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::distance::DistanceMetric;
use crate::error::{IndexError, Result};
use crate::record::{Label, Record};

/// Configuration parameters for an HNSW graph.
///
/// Controls the trade-off between build speed, search speed, recall, and memory usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Number of bidirectional links per node (except layer 0, which uses `m_max0`).
    pub m: usize,
    /// Maximum links per node at layer 0 (typically `2 * m`).
    pub m_max0: usize,
    /// Candidate list size during construction.
    pub ef_construction: usize,
    /// Candidate list size during search (raised to `top_k` when smaller).
    pub ef_search: usize,
    /// Maximum number of layers in the graph.
    pub max_layers: usize,
    /// Largest number of nodes the graph accepts.
    pub max_elements: usize,
    pub distance_metric: DistanceMetric,
    /// Seed of the level generator.
    pub seed: u64,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: config::HNSW_DEFAULT_M,
            m_max0: config::HNSW_DEFAULT_M * 2,
            ef_construction: config::HNSW_DEFAULT_EF_CONSTRUCTION,
            ef_search: config::HNSW_DEFAULT_EF_SEARCH,
            max_layers: config::HNSW_DEFAULT_MAX_LAYERS,
            max_elements: config::HNSW_DEFAULT_MAX_ELEMENTS,
            distance_metric: DistanceMetric::Euclidean,
            seed: config::HNSW_DEFAULT_SEED,
        }
    }
}

impl HnswConfig {
    pub fn validate(&self) -> Result<()> {
        if self.m < 2 {
            return Err(IndexError::InvalidConfig("hnsw m must be at least 2".into()));
        }
        if self.m_max0 < self.m {
            return Err(IndexError::InvalidConfig(
                "hnsw m_max0 must be at least m".into(),
            ));
        }
        if self.ef_construction == 0 || self.ef_search == 0 {
            return Err(IndexError::InvalidConfig(
                "hnsw ef parameters must be positive".into(),
            ));
        }
        if self.max_layers == 0 || self.max_layers > u8::MAX as usize {
            return Err(IndexError::InvalidConfig(
                "hnsw max_layers must be within 1..=255".into(),
            ));
        }
        if self.max_elements == 0 || self.max_elements > u32::MAX as usize {
            return Err(IndexError::InvalidConfig(
                "hnsw max_elements must be within 1..=u32::MAX".into(),
            ));
        }
        Ok(())
    }
}

/// HNSW graph using Struct-of-Arrays layout.
#[derive(Debug)]
pub struct HnswGraph {
    pub(crate) config: HnswConfig,
    pub(crate) dimension: Option<usize>,
    // SoA: raw vector arena, `dimension` floats per node
    pub(crate) vectors: Vec<f32>,
    pub(crate) labels: Vec<Label>,
    pub(crate) records: Vec<Arc<Record>>,
    // SoA: graph structure
    pub(crate) neighbors: Vec<Vec<Vec<u32>>>, // [node_id][layer][neighbor_ids]
    pub(crate) layers: Vec<u8>,
    pub(crate) entry_point: Option<u32>,
    pub(crate) max_layer: usize,
    rng: StdRng,
}

impl Default for HnswGraph {
    fn default() -> Self {
        Self::new(None, HnswConfig::default())
    }
}

impl HnswGraph {
    pub fn new(dimension: Option<usize>, config: HnswConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            dimension,
            vectors: Vec::new(),
            labels: Vec::new(),
            records: Vec::new(),
            neighbors: Vec::new(),
            layers: Vec::new(),
            entry_point: None,
            max_layer: 0,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Draw a layer for a new node from an exponential distribution.
    pub(crate) fn random_level(&mut self) -> usize {
        let ml = 1.0 / (self.config.m as f64).ln();
        // gen::<f64>() is in [0, 1); avoid ln(0).
        let r: f64 = 1.0 - self.rng.gen::<f64>();
        let level = (-r.ln() * ml).floor() as usize;
        level.min(self.config.max_layers - 1)
    }

    #[inline]
    pub(crate) fn vector(&self, id: u32) -> &[f32] {
        let dim = self.dimension.unwrap_or(0);
        let start = id as usize * dim;
        &self.vectors[start..start + dim]
    }

    #[inline]
    pub(crate) fn label(&self, id: u32) -> Label {
        self.labels[id as usize]
    }

    #[inline]
    pub(crate) fn record(&self, id: u32) -> &Arc<Record> {
        &self.records[id as usize]
    }

    #[inline]
    pub(crate) fn distance(&self, query: &[f32], id: u32) -> f32 {
        self.config.distance_metric.distance(query, self.vector(id))
    }

    /// Append a node's data columns. Links are filled in by `insert`.
    pub(crate) fn push_node(&mut self, record: Record, level: usize, links: Vec<Vec<u32>>) {
        self.vectors.extend_from_slice(&record.values);
        self.labels.push(record.label);
        self.records.push(Arc::new(record));
        self.neighbors.push(links);
        self.layers.push(level as u8);
    }

    #[inline]
    pub(crate) fn m_max(&self, layer: usize) -> usize {
        if layer == 0 {
            self.config.m_max0
        } else {
            self.config.m
        }
    }
}
