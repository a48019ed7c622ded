//! Binary file formats for the on-disk artist store
//!
//! Three files make up a store directory:
//! - `graph.fwd` - forward adjacency blocks (who this artist points to)
//! - `graph.rev` - reverse adjacency blocks (who points to this artist)
//! - `artists.meta` - id-sorted record table plus string arena

pub mod graph;
pub mod meta;

pub use graph::{AdjacencyBlock, GraphBuilder, GraphFile, NeighborIter};
pub use meta::{ArtistRecord, MetaArtist, MetaFile};
