//! Search kernel
//!
//! Two algorithms (unweighted BFS, weighted best-similarity relaxation),
//! each in two modes (point-to-point, single-source bounded). Algorithm and
//! mode are tags, not a type hierarchy; the kernels share parameter
//! validation, budget/deadline plumbing and the `Traversal` output the
//! assembler consumes.

pub mod assemble;
pub mod bfs;
pub mod dijkstra;

use clap::ValueEnum;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

use crate::config::MAX_RELATIONS_CAP;
use crate::error::{EngineError, Result};
use crate::formats::NeighborIter;
use crate::id::ArtistId;
use crate::store::{ArtistStore, Direction, FORWARD_FILE, REVERSE_FILE};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, ToSchema, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Fewest hops, bidirectional BFS.
    #[default]
    Bfs,
    /// Highest similarity product, Dijkstra-style relaxation.
    Weighted,
}

/// Knobs common to every search invocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchParams {
    /// Floor applied to every edge considered.
    pub min_similarity: f32,
    /// Per-node fan-out cap.
    pub max_relations: usize,
    /// Maximum distinct artists the search may visit.
    pub budget: usize,
}

impl SearchParams {
    /// Rejects out-of-range parameters before any I/O happens.
    pub fn validate(&self) -> Result<()> {
        if !self.min_similarity.is_finite() || !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(EngineError::InvalidArgument(format!(
                "min_similarity must be in [0, 1], got {}",
                self.min_similarity
            )));
        }
        if self.max_relations == 0 || self.max_relations > MAX_RELATIONS_CAP {
            return Err(EngineError::InvalidArgument(format!(
                "max_relations must be in [1, {MAX_RELATIONS_CAP}], got {}",
                self.max_relations
            )));
        }
        if self.budget == 0 {
            return Err(EngineError::InvalidArgument("budget must be positive".into()));
        }
        Ok(())
    }
}

/// Deadline and cooperative cancellation, checked at every node-pop.
#[derive(Debug, Clone, Default)]
pub struct SearchControl {
    pub deadline: Option<Instant>,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl SearchControl {
    pub(crate) fn check(&self, visited: usize) -> Result<()> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(EngineError::Cancelled {
                    visited: visited as u64,
                });
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(EngineError::Cancelled {
                    visited: visited as u64,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
pub struct SearchStats {
    pub duration_ms: u64,
    pub visited: u64,
    pub edges_considered: u64,
}

/// What a kernel hands to the assembler.
pub(crate) struct Traversal {
    /// Hop-ordered endpoints-inclusive node list; `None` when no path was
    /// found (point-to-point) or not applicable (exploration).
    pub path: Option<Vec<ArtistId>>,
    /// Distinct artists touched, union across both sides for bidirectional
    /// BFS.
    pub visited: FxHashSet<ArtistId>,
    /// BFS layer per node (exploration only; 0 for the root).
    pub depth: FxHashMap<ArtistId, u32>,
    /// Finalized cost per node (weighted exploration only).
    pub cost: FxHashMap<ArtistId, f64>,
    pub edges_considered: u64,
    /// Expansion stopped on the budget while the frontier was non-empty.
    pub truncated: bool,
}

/// Neighbor access for traversal-internal nodes. Endpoints were validated
/// by the engine, so an id that came out of an adjacency block and has no
/// metadata record is a broken invariant, not a caller mistake.
pub(crate) fn adjacency<'a>(
    store: &'a ArtistStore,
    id: ArtistId,
    direction: Direction,
    params: &SearchParams,
) -> Result<NeighborIter<'a>> {
    match store.neighbors(id, direction, params.min_similarity, params.max_relations) {
        Err(EngineError::UnknownArtist(who)) => {
            let file = match direction {
                Direction::Forward => FORWARD_FILE,
                Direction::Reverse => REVERSE_FILE,
            };
            Err(EngineError::corrupt(
                file,
                0,
                format!("adjacency references artist {who} with no metadata record"),
            ))
        }
        other => other,
    }
}

impl Traversal {
    pub(crate) fn new() -> Self {
        Self {
            path: None,
            visited: FxHashSet::default(),
            depth: FxHashMap::default(),
            cost: FxHashMap::default(),
            edges_considered: 0,
            truncated: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(min_similarity: f32, max_relations: usize, budget: usize) -> SearchParams {
        SearchParams {
            min_similarity,
            max_relations,
            budget,
        }
    }

    #[test]
    fn test_validate_accepts_bounds() {
        assert!(params(0.0, 1, 1).validate().is_ok());
        assert!(params(1.0, 250, 10_000).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(matches!(
            params(-0.1, 10, 10).validate(),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            params(f32::NAN, 10, 10).validate(),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            params(0.5, 0, 10).validate(),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            params(0.5, 251, 10).validate(),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            params(0.5, 10, 0).validate(),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_control_trips_on_cancel_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let control = SearchControl {
            deadline: None,
            cancel: Some(Arc::clone(&flag)),
        };
        assert!(control.check(3).is_ok());
        flag.store(true, Ordering::Relaxed);
        assert!(matches!(
            control.check(3),
            Err(EngineError::Cancelled { visited: 3 })
        ));
    }

    #[test]
    fn test_control_trips_on_deadline() {
        let control = SearchControl {
            deadline: Some(Instant::now() - std::time::Duration::from_millis(1)),
            cancel: None,
        };
        assert!(matches!(
            control.check(0),
            Err(EngineError::Cancelled { .. })
        ));
    }
}
