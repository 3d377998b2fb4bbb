//! Feature record types.
//!
//! A [`Record`] is one extracted feature vector together with the coarse label it
//! was classified under and the opaque fields that are passed back verbatim in
//! search responses.

use serde::{Deserialize, Serialize};

/// Integer category that partitions records into buckets.
pub type Label = i32;

/// A feature record as produced by the extraction pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Source identifier, typically the image file name.
    pub id: String,
    /// Coarse category tag.
    pub label: Label,
    /// Feature vector; length must equal the index dimension.
    pub values: Vec<f32>,
    /// Opaque descriptive bytes (JSON in practice), returned untouched.
    pub payload: Vec<u8>,
}

impl Record {
    pub fn new(id: impl Into<String>, label: Label, values: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            label,
            values,
            payload: Vec::new(),
        }
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Dimension of the feature vector.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}
