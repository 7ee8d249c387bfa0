//! Record chain configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Largest number of events accepted by one batched append.
    pub max_batch_size: usize,
    /// Records fetched per page while walking a chain.
    pub verify_page_size: usize,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 1024,
            verify_page_size: 256,
        }
    }
}
