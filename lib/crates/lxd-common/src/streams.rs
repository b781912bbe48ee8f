//! Simplestreams index (`streams/v1/index.json`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Relative path of the index document on a simplestreams server.
pub const INDEX_PATH: &str = "streams/v1/index.json";

/// Top-level simplestreams index.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StreamsIndex {
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub index: BTreeMap<String, StreamsEntry>,
}

/// One product stream listed in the index.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StreamsEntry {
    #[serde(default)]
    pub datatype: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub products: Vec<String>,
}

impl StreamsIndex {
    /// Number of products across all image-download streams.
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.index
            .values()
            .filter(|e| e.datatype == "image-downloads")
            .map(|e| e.products.len())
            .sum()
    }
}
