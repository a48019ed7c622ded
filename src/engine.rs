//! Engine API surface
//!
//! One `Engine` per process: the three mappings and the name index are
//! acquired at startup and shared read-only across search workers. Each
//! operation validates its parameters before any I/O, runs a kernel, and
//! assembles the caller-facing result.

use serde::Serialize;
use std::time::Instant;
use utoipa::ToSchema;

use crate::config::{EngineConfig, SearchDefaults};
use crate::error::{EngineError, Result};
use crate::id::ArtistId;
use crate::name_index::NameIndex;
use crate::search::assemble::{self, Subgraph};
use crate::search::{bfs, dijkstra, Algorithm, SearchControl, SearchParams, SearchStats, Traversal};
use crate::store::{Artist, ArtistStore, Direction, VerifyReport};

pub struct Engine {
    store: ArtistStore,
    names: NameIndex,
    defaults: SearchDefaults,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PathResult {
    pub found: bool,
    /// Hop-ordered node list, endpoints inclusive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Artist>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hops: Option<u32>,
    /// Product of edge similarities along the path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_product: Option<f64>,
    /// The visit cap was reached before the endpoints met; `path` is empty
    /// and `stats.visited` says how far the search got.
    pub budget_exhausted: bool,
    pub subgraph: Subgraph,
    pub stats: SearchStats,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExploreResult {
    pub root: Artist,
    pub direction: Direction,
    /// Expansion stopped on the budget with frontier remaining.
    pub truncated: bool,
    pub subgraph: Subgraph,
    pub stats: SearchStats,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct StoreStats {
    pub artists: u64,
}

impl Engine {
    /// Map the store files and build the in-memory name index.
    pub fn open(config: &EngineConfig) -> Result<Self> {
        let started = Instant::now();
        let store = ArtistStore::open(&config.data_dir)?;
        let names = NameIndex::build(&store)?;
        tracing::info!(
            artists = store.artist_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            data_dir = %config.data_dir.display(),
            "store opened"
        );
        Ok(Self {
            store,
            names,
            defaults: config.defaults.clone(),
        })
    }

    pub fn defaults(&self) -> &SearchDefaults {
        &self.defaults
    }

    /// Find a path between two artists.
    pub fn find_path(
        &self,
        from: ArtistId,
        to: ArtistId,
        params: SearchParams,
        algorithm: Algorithm,
        control: &SearchControl,
    ) -> Result<PathResult> {
        params.validate()?;
        self.require(from)?;
        self.require(to)?;

        let started = Instant::now();
        let outcome = match algorithm {
            Algorithm::Bfs => bfs::shortest_path(&self.store, from, to, &params, control),
            Algorithm::Weighted => dijkstra::best_path(&self.store, from, to, &params, control),
        };

        match outcome {
            Ok(traversal) => {
                let subgraph = assemble::subgraph(&self.store, &traversal, &params)?;
                let path = self.materialize_path(&traversal, &params)?;
                let hops = path.as_ref().map(|p| (p.0.len() - 1) as u32);
                let (path, similarity_product) = match path {
                    Some((artists, product)) => (Some(artists), product),
                    None => (None, None),
                };
                Ok(PathResult {
                    found: path.is_some(),
                    path,
                    hops,
                    similarity_product,
                    budget_exhausted: false,
                    subgraph,
                    stats: self.stats_for(&traversal, started),
                })
            }
            // A budget trip is a well-formed "no path within budget"
            // answer, not a failure.
            Err(EngineError::BudgetExceeded { visited, edges }) => Ok(PathResult {
                found: false,
                path: None,
                hops: None,
                similarity_product: None,
                budget_exhausted: true,
                subgraph: Subgraph::default(),
                stats: SearchStats {
                    duration_ms: started.elapsed().as_millis() as u64,
                    visited,
                    edges_considered: edges,
                },
            }),
            Err(e) => Err(self.log_fatal(e)),
        }
    }

    /// Bounded neighborhood following outgoing edges.
    pub fn explore_forward(
        &self,
        id: ArtistId,
        params: SearchParams,
        algorithm: Algorithm,
        control: &SearchControl,
    ) -> Result<ExploreResult> {
        self.explore(id, Direction::Forward, params, algorithm, control)
    }

    /// Bounded neighborhood following incoming edges.
    pub fn explore_reverse(
        &self,
        id: ArtistId,
        params: SearchParams,
        algorithm: Algorithm,
        control: &SearchControl,
    ) -> Result<ExploreResult> {
        self.explore(id, Direction::Reverse, params, algorithm, control)
    }

    pub fn explore(
        &self,
        id: ArtistId,
        direction: Direction,
        params: SearchParams,
        algorithm: Algorithm,
        control: &SearchControl,
    ) -> Result<ExploreResult> {
        params.validate()?;
        let root = self.require(id)?;

        let started = Instant::now();
        let outcome = match algorithm {
            Algorithm::Bfs => bfs::explore(&self.store, id, direction, &params, control),
            Algorithm::Weighted => dijkstra::explore(&self.store, id, direction, &params, control),
        };
        let traversal = outcome.map_err(|e| self.log_fatal(e))?;
        let subgraph = assemble::subgraph(&self.store, &traversal, &params)?;

        Ok(ExploreResult {
            root,
            direction,
            truncated: traversal.truncated,
            subgraph,
            stats: self.stats_for(&traversal, started),
        })
    }

    /// Ranked substring resolution: exact, then prefix, then substring.
    pub fn resolve_name(&self, query: &str, limit: usize) -> Result<Vec<Artist>> {
        if query.trim().is_empty() {
            return Err(EngineError::InvalidArgument("query must not be empty".into()));
        }
        if limit == 0 {
            return Err(EngineError::InvalidArgument("limit must be positive".into()));
        }
        self.names
            .search(query, limit)
            .into_iter()
            .map(|index| Ok(self.store.artist_at(index)?.to_artist()))
            .collect()
    }

    /// All artists whose lowercased, trimmed name matches exactly.
    pub fn resolve_exact(&self, name: &str) -> Result<Vec<Artist>> {
        self.names
            .resolve_exact(name)
            .into_iter()
            .map(|index| Ok(self.store.artist_at(index)?.to_artist()))
            .collect()
    }

    /// Uniformly random artist.
    pub fn random_artist(&self) -> Result<Artist> {
        let index = self
            .names
            .random()
            .ok_or_else(|| EngineError::UnknownArtist("the store is empty".into()))?;
        Ok(self.store.artist_at(index)?.to_artist())
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            artists: self.store.artist_count() as u64,
        }
    }

    /// Full structural sweep; see `ArtistStore::verify`.
    pub fn verify(&self) -> Result<VerifyReport> {
        self.store.verify()
    }

    fn require(&self, id: ArtistId) -> Result<Artist> {
        Ok(self
            .store
            .lookup(id)?
            .ok_or_else(|| EngineError::UnknownArtist(id.to_string()))?
            .to_artist())
    }

    fn materialize_path(
        &self,
        traversal: &Traversal,
        params: &SearchParams,
    ) -> Result<Option<(Vec<Artist>, Option<f64>)>> {
        let Some(ids) = &traversal.path else {
            return Ok(None);
        };
        let artists = ids
            .iter()
            .map(|&id| self.require(id))
            .collect::<Result<Vec<_>>>()?;
        let product = assemble::path_product(&self.store, ids, params)?;
        Ok(Some((artists, product)))
    }

    fn stats_for(&self, traversal: &Traversal, started: Instant) -> SearchStats {
        SearchStats {
            duration_ms: started.elapsed().as_millis() as u64,
            visited: traversal.visited.len() as u64,
            edges_considered: traversal.edges_considered,
        }
    }

    /// `CorruptStore` and `Io` are fatal for the request and logged with
    /// context; everything else passes through untouched.
    fn log_fatal(&self, error: EngineError) -> EngineError {
        if matches!(
            error,
            EngineError::CorruptStore { .. } | EngineError::Io(_)
        ) {
            tracing::error!(error = %error, "store failure during search");
        }
        error
    }
}
