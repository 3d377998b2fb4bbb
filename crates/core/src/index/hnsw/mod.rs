//! Hierarchical Navigable Small World graph index.
//!
//! Records are inserted into the graph as they arrive, so sealing costs
//! nothing beyond freezing the graph. Vectors are stored raw and compared with
//! the configured metric (squared Euclidean by default). Label filters are
//! applied as a traversal predicate. Each query runs on the calling thread.

/// Graph storage and configuration.
pub mod graph;
mod insert;
mod search;
mod visited;

use std::sync::Arc;

pub use graph::{HnswConfig, HnswGraph};

use super::bucket::{check_batch, check_dimension};
use super::lifecycle::Lifecycle;
use super::{IndexOptions, Neighbor, SearchRequest, SearchResponse};
use crate::config::BUILD_PROGRESS_INTERVAL;
use crate::error::{IndexError, Result};
use crate::record::Record;

pub struct GraphIndex {
    finalize_on_search: bool,
    state: Lifecycle<HnswGraph, HnswGraph>,
}

impl GraphIndex {
    pub fn new(options: &IndexOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            finalize_on_search: options.finalize_on_search,
            state: Lifecycle::new(HnswGraph::new(options.dimension, options.hnsw.clone())),
        })
    }

    pub fn add(&self, record: Record) -> Result<()> {
        self.add_batch(vec![record])
    }

    /// Insert a batch; nothing is inserted unless every record is valid and
    /// the whole batch fits.
    pub fn add_batch(&self, batch: Vec<Record>) -> Result<()> {
        self.state.mutate(|graph| {
            check_batch(graph.dimension, &batch)?;
            let required = graph.len() + batch.len();
            if required > graph.config.max_elements {
                return Err(IndexError::CapacityExceeded {
                    required,
                    capacity: graph.config.max_elements,
                });
            }
            for record in batch {
                let id = graph.insert(record);
                if (id as u64 + 1) % BUILD_PROGRESS_INTERVAL == 0 {
                    tracing::info!(records = id + 1, "inserting records");
                }
            }
            Ok(())
        })
    }

    pub fn finalize(&self) {
        self.seal();
    }

    fn seal(&self) -> Arc<HnswGraph> {
        self.state.seal(|graph| {
            tracing::info!(
                records = graph.len(),
                max_layer = graph.max_layer,
                "hnsw index serving"
            );
            std::mem::take(graph)
        })
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let graph = match self.state.serving() {
            Some(graph) => graph,
            None if self.finalize_on_search => self.seal(),
            None => return Err(IndexError::NotServing),
        };
        check_dimension(graph.dimension, request.query.len())?;

        let labels = &request.labels;
        let accept = |id: u32| labels.is_empty() || labels.contains(&graph.label(id));
        let mut found = search::knn_search(&graph, &request.query, request.top_k, &accept);
        found.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let neighbors = found
            .into_iter()
            .map(|(distance, id)| Neighbor {
                record: Arc::clone(graph.record(id)),
                distance,
            })
            .collect();
        Ok(SearchResponse {
            neighbors,
            total_count: graph.len(),
        })
    }

    pub fn total_count(&self) -> usize {
        self.state.inspect(HnswGraph::len, HnswGraph::len)
    }

    pub fn dimension(&self) -> Option<usize> {
        self.state.inspect(|g| g.dimension, |g| g.dimension)
    }

    pub fn is_serving(&self) -> bool {
        self.state.is_serving()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_records(n: usize, dim: usize, labels: i32, seed: u64) -> Vec<Record> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|i| {
                let values = (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
                Record::new(format!("n{i}"), i as i32 % labels, values)
            })
            .collect()
    }

    fn brute_force(records: &[Record], query: &[f32], k: usize) -> Vec<String> {
        let mut scored: Vec<(f32, &str)> = records
            .iter()
            .map(|r| (crate::distance::euclidean_sq(query, &r.values), r.id.as_str()))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.into_iter().take(k).map(|(_, id)| id.to_string()).collect()
    }

    #[test]
    fn test_recall_against_brute_force() {
        let records = random_records(1000, 16, 4, 7);
        let index = GraphIndex::new(&IndexOptions::default()).unwrap();
        index.add_batch(records.clone()).unwrap();

        let queries = random_records(20, 16, 1, 99);
        let mut hit = 0;
        for q in &queries {
            let truth = brute_force(&records, &q.values, 10);
            let resp = index
                .search(&SearchRequest::new(q.values.clone()).with_top_k(10))
                .unwrap();
            assert!(resp.neighbors.windows(2).all(|w| w[0].distance <= w[1].distance));
            hit += resp
                .neighbors
                .iter()
                .filter(|n| truth.contains(&n.record.id))
                .count();
        }
        let recall = hit as f64 / (queries.len() * 10) as f64;
        assert!(recall > 0.9, "recall {recall}");
    }

    #[test]
    fn test_self_retrieval_and_filter() {
        let records = random_records(300, 8, 3, 1);
        let probe = records[42].clone();
        let index = GraphIndex::new(&IndexOptions::default()).unwrap();
        index.add_batch(records).unwrap();

        let resp = index
            .search(&SearchRequest::new(probe.values.clone()).with_top_k(1))
            .unwrap();
        assert_eq!(resp.neighbors[0].record.id, probe.id);
        assert_eq!(resp.neighbors[0].distance, 0.0);
        assert_eq!(resp.total_count, 300);

        let resp = index
            .search(&SearchRequest::new(probe.values.clone()).with_top_k(20).with_labels([1]))
            .unwrap();
        assert_eq!(resp.neighbors.len(), 20);
        assert!(resp.neighbors.iter().all(|n| n.record.label == 1));
    }

    #[test]
    fn test_capacity_is_enforced_per_batch() {
        let options = IndexOptions {
            hnsw: HnswConfig {
                max_elements: 10,
                ..HnswConfig::default()
            },
            ..IndexOptions::default()
        };
        let index = GraphIndex::new(&options).unwrap();
        index.add_batch(random_records(8, 4, 1, 3)).unwrap();
        let err = index.add_batch(random_records(3, 4, 1, 4)).unwrap_err();
        assert!(matches!(
            err,
            IndexError::CapacityExceeded {
                required: 11,
                capacity: 10
            }
        ));
        assert_eq!(index.total_count(), 8);
    }

    #[test]
    fn test_lifecycle() {
        let index = GraphIndex::new(&IndexOptions {
            finalize_on_search: false,
            ..IndexOptions::default()
        })
        .unwrap();
        index.add(Record::new("a", 0, vec![0.0, 1.0])).unwrap();
        assert!(matches!(
            index.search(&SearchRequest::new(vec![0.0, 1.0])),
            Err(IndexError::NotServing)
        ));
        index.finalize();
        assert!(index.is_serving());
        assert!(matches!(
            index.add(Record::new("b", 0, vec![0.0, 1.0])),
            Err(IndexError::Sealed)
        ));
        assert!(matches!(
            index.search(&SearchRequest::new(vec![0.0])),
            Err(IndexError::DimensionMismatch { .. })
        ));
        assert_eq!(index.dimension(), Some(2));
    }
}
