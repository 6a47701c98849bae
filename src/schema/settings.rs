use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest chunk multiplier accepted by the chunk planner.
pub const MAX_CHUNK_MULTIPLIER: u32 = 2048;

/// Engine-wide tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineSettings {
    /// Chunks per side of the target grid for chunked refreshes.
    pub chunk_multiplier: u32,
    /// How long a chunked refresh waits for one chunk before aborting it.
    pub job_timeout_ms: u64,
    /// Number of coarse grids kept in the LRU cache.
    pub cache_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            chunk_multiplier: 2,
            job_timeout_ms: 3000,
            cache_capacity: 8,
        }
    }
}

impl EngineSettings {
    pub fn job_timeout(&self) -> Duration {
        Duration::from_millis(self.job_timeout_ms)
    }
}
