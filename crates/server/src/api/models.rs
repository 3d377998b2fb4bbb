//! Request and response data transfer objects for the REST API.

use retrieval_core::config;
use retrieval_core::{Label, Neighbor};
use serde::{Deserialize, Serialize};

fn default_top_k() -> usize {
    config::DEFAULT_TOP_K
}

/// Request body for `POST /search`.
#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub query: Vec<f32>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Restrict the search to these labels; absent or empty searches all.
    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NeighborDto {
    pub id: String,
    pub label: Label,
    pub value: Vec<f32>,
    /// Record payload decoded as UTF-8, invalid sequences replaced.
    pub payload: String,
    pub distance: f32,
}

impl From<Neighbor> for NeighborDto {
    fn from(n: Neighbor) -> Self {
        let record = n.record;
        Self {
            id: record.id.clone(),
            label: record.label,
            value: record.values.clone(),
            payload: String::from_utf8_lossy(&record.payload).into_owned(),
            distance: n.distance,
        }
    }
}

/// Response body for `POST /search`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub neighbors: Vec<NeighborDto>,
    pub search_cost_ms: f64,
    pub total_count: usize,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub index_type: String,
    pub dimension: Option<usize>,
    pub total_count: usize,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrieval_core::Record;
    use std::sync::Arc;

    #[test]
    fn test_search_body_defaults() {
        let body: SearchBody = serde_json::from_str(r#"{"query": [1.0, 2.0]}"#).unwrap();
        assert_eq!(body.top_k, config::DEFAULT_TOP_K);
        assert!(body.labels.is_empty());

        let body: SearchBody =
            serde_json::from_str(r#"{"query": [1.0], "top_k": 3, "labels": [2, 5]}"#).unwrap();
        assert_eq!(body.top_k, 3);
        assert_eq!(body.labels, vec![2, 5]);
    }

    #[test]
    fn test_neighbor_payload_is_lossy_utf8() {
        let record = Record::new("x.JPEG", 7, vec![0.5]).with_payload(vec![b'o', b'k', 0xff]);
        let dto = NeighborDto::from(Neighbor {
            record: Arc::new(record),
            distance: 0.25,
        });
        assert_eq!(dto.id, "x.JPEG");
        assert_eq!(dto.label, 7);
        assert_eq!(dto.payload, "ok\u{fffd}");
        assert_eq!(dto.distance, 0.25);
    }
}
