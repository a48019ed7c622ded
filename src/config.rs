//! Engine configuration
//!
//! An explicit struct threaded into the engine constructor; no ambient
//! globals. The CLI populates it from flags.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Applied when the caller omits a search parameter.
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.0;
pub const DEFAULT_MAX_RELATIONS: usize = 40;
pub const DEFAULT_BUDGET: usize = 10_000;

/// Hard cap on per-node fan-out; requests above it are rejected.
pub const MAX_RELATIONS_CAP: usize = 250;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchDefaults {
    pub min_similarity: f32,
    pub max_relations: usize,
    pub budget: usize,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            min_similarity: DEFAULT_MIN_SIMILARITY,
            max_relations: DEFAULT_MAX_RELATIONS,
            budget: DEFAULT_BUDGET,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding `graph.fwd`, `graph.rev` and `artists.meta`.
    pub data_dir: PathBuf,
    pub defaults: SearchDefaults,
    /// Size of the CPU-bound search worker pool.
    pub workers: usize,
    /// Wall-clock cap per search; `None` means unbounded.
    pub deadline: Option<Duration>,
}

impl EngineConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            defaults: SearchDefaults::default(),
            workers: num_cpus::get(),
            deadline: None,
        }
    }
}
