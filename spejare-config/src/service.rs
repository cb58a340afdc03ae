//! Store and stream configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Bounded packet history.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct StoreConfig {
    /// Ring buffer capacity; the oldest record is evicted past this bound.
    #[validate(range(min = 1, max = 1000000))]
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Query limit applied by the boundary when the caller gives none.
    #[validate(range(min = 1, max = 1000))]
    #[serde(default = "default_query_limit")]
    pub default_query_limit: usize,
}

fn default_capacity() -> usize {
    1000
}

fn default_query_limit() -> usize {
    100
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            default_query_limit: default_query_limit(),
        }
    }
}

/// Live stream fan-out.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct StreamConfig {
    /// Per-subscriber bounded queue size; a full queue drops new events for
    /// that subscriber only.
    #[validate(range(min = 1, max = 65536))]
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}
