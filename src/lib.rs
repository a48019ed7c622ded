//! artistpath: pathfinding over a memory-mapped artist similarity graph
//!
//! The store is three immutable files built offline: a forward graph, its
//! exact transpose, and an id-sorted metadata table with a string arena.
//! The engine maps them once at startup and answers path and neighborhood
//! queries against them:
//!
//! - `formats/` - on-disk layouts, bounds-checked mmap readers, writers
//! - `store` - the opened store: lookup, lazy neighbor access, verify
//! - `name_index` - lowercased-name resolution and random selection
//! - `search/` - BFS and weighted kernels plus result assembly
//! - `engine` - the API surface front-ends consume
//! - `server`, `cli` - the HTTP and command-line front-ends

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod formats;
pub mod id;
pub mod name_index;
pub mod search;
pub mod server;
pub mod store;

pub use config::{EngineConfig, SearchDefaults};
pub use engine::{Engine, ExploreResult, PathResult, StoreStats};
pub use error::EngineError;
pub use id::ArtistId;
pub use search::assemble::{Subgraph, SubgraphEdge, SubgraphNode};
pub use search::{Algorithm, SearchControl, SearchParams, SearchStats};
pub use store::{Artist, ArtistStore, Direction};
