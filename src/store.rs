//! The opened artist store
//!
//! Holds the three mappings for the process lifetime and exposes random
//! access by artist id. Everything here is read-only after `open`, so a
//! `&ArtistStore` can be shared freely across search workers.

use serde::{Deserialize, Serialize};
use std::path::Path;
use utoipa::ToSchema;

use crate::error::{EngineError, Result};
use crate::formats::graph::{COUNT_SIZE, ENTRY_SIZE};
use crate::formats::{GraphFile, MetaFile, NeighborIter};
use crate::id::ArtistId;

pub const FORWARD_FILE: &str = "graph.fwd";
pub const REVERSE_FILE: &str = "graph.rev";
pub const META_FILE: &str = "artists.meta";

/// Which graph file a traversal walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Artists this artist points to.
    Forward,
    /// Artists that point to this artist.
    Reverse,
}

/// An artist as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
    pub url: String,
}

/// A resolved metadata record borrowing its strings from the mapping.
#[derive(Debug, Clone, Copy)]
pub struct ArtistRef<'a> {
    pub index: u32,
    pub id: ArtistId,
    pub forward_offset: u64,
    pub reverse_offset: u64,
    pub name: &'a str,
    pub url: &'a str,
}

impl ArtistRef<'_> {
    pub fn to_artist(&self) -> Artist {
        Artist {
            id: self.id,
            name: self.name.to_owned(),
            url: self.url.to_owned(),
        }
    }
}

pub struct ArtistStore {
    meta: MetaFile,
    forward: GraphFile,
    reverse: GraphFile,
}

impl ArtistStore {
    /// Map the three store files. Held until drop; searches never outlive
    /// the store.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let meta = MetaFile::open(&data_dir.join(META_FILE))?;
        let forward = GraphFile::open(&data_dir.join(FORWARD_FILE), FORWARD_FILE)?;
        let reverse = GraphFile::open(&data_dir.join(REVERSE_FILE), REVERSE_FILE)?;
        Ok(Self {
            meta,
            forward,
            reverse,
        })
    }

    pub fn artist_count(&self) -> u32 {
        self.meta.len()
    }

    /// Resolve an id to its metadata record, or `None` if absent.
    pub fn lookup(&self, id: ArtistId) -> Result<Option<ArtistRef<'_>>> {
        match self.meta.find(id) {
            Some(index) => self.artist_at(index).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve a record by table index (the name index addresses artists
    /// this way).
    pub fn artist_at(&self, index: u32) -> Result<ArtistRef<'_>> {
        let record = self.meta.record(index)?;
        Ok(ArtistRef {
            index,
            id: record.id,
            forward_offset: record.forward_offset,
            reverse_offset: record.reverse_offset,
            name: self.meta.name(&record)?,
            url: self.meta.url(&record)?,
        })
    }

    /// Lazy neighbor sequence for one artist, streamed from the mapping.
    pub fn neighbors(
        &self,
        id: ArtistId,
        direction: Direction,
        min_similarity: f32,
        max_count: usize,
    ) -> Result<NeighborIter<'_>> {
        let artist = self
            .lookup(id)?
            .ok_or_else(|| EngineError::UnknownArtist(id.to_string()))?;
        self.neighbors_of(&artist, direction, min_similarity, max_count)
    }

    /// Same, for an already-resolved record (saves the binary search on hot
    /// paths).
    pub fn neighbors_of(
        &self,
        artist: &ArtistRef<'_>,
        direction: Direction,
        min_similarity: f32,
        max_count: usize,
    ) -> Result<NeighborIter<'_>> {
        let (file, offset) = match direction {
            Direction::Forward => (&self.forward, artist.forward_offset),
            Direction::Reverse => (&self.reverse, artist.reverse_offset),
        };
        Ok(file.block(offset)?.iter(min_similarity, max_count))
    }

    /// Full structural sweep of the store: every offset lands on an
    /// in-bounds block, every block is sorted descending with similarities
    /// finite in [0, 1], every neighbor id resolves, and the reverse file
    /// is the exact transpose of the forward file.
    pub fn verify(&self) -> Result<VerifyReport> {
        let mut report = VerifyReport::default();
        for index in 0..self.meta.len() {
            let artist = self.artist_at(index)?;
            report.forward_edges +=
                self.verify_block(&artist, Direction::Forward)? as u64;
            report.reverse_edges +=
                self.verify_block(&artist, Direction::Reverse)? as u64;
            report.artists += 1;
        }
        if report.forward_edges != report.reverse_edges {
            return Err(EngineError::corrupt(
                REVERSE_FILE,
                0,
                format!(
                    "edge count mismatch: {} forward vs {} reverse",
                    report.forward_edges, report.reverse_edges
                ),
            ));
        }
        Ok(report)
    }

    fn verify_block(&self, artist: &ArtistRef<'_>, direction: Direction) -> Result<u32> {
        let (file, label, offset) = match direction {
            Direction::Forward => (&self.forward, FORWARD_FILE, artist.forward_offset),
            Direction::Reverse => (&self.reverse, REVERSE_FILE, artist.reverse_offset),
        };
        let block = file.block(offset)?;
        let mut previous = f32::INFINITY;
        let mut position = offset + COUNT_SIZE as u64;
        for (neighbor, similarity) in block.iter(f32::NEG_INFINITY, usize::MAX) {
            if !similarity.is_finite() || !(0.0..=1.0).contains(&similarity) {
                return Err(EngineError::corrupt(
                    label,
                    position,
                    format!("similarity {similarity} outside [0, 1] (artist {})", artist.id),
                ));
            }
            if similarity > previous {
                return Err(EngineError::corrupt(
                    label,
                    position,
                    format!("entries not sorted descending (artist {})", artist.id),
                ));
            }
            previous = similarity;

            let other = self.lookup(neighbor)?.ok_or_else(|| {
                EngineError::corrupt(
                    label,
                    position,
                    format!("neighbor {neighbor} has no metadata record"),
                )
            })?;

            // Transpose check: the mirrored block of the neighbor must
            // carry this artist with a bitwise-equal weight.
            let mirrored = match direction {
                Direction::Forward => Direction::Reverse,
                Direction::Reverse => Direction::Forward,
            };
            let found = self
                .neighbors_of(&other, mirrored, f32::NEG_INFINITY, usize::MAX)?
                .any(|(n, w)| n == artist.id && w.to_bits() == similarity.to_bits());
            if !found {
                return Err(EngineError::corrupt(
                    label,
                    position,
                    format!(
                        "edge between {} and {neighbor} ({similarity}) missing from transpose",
                        artist.id
                    ),
                ));
            }
            position += ENTRY_SIZE as u64;
        }
        Ok(block.count())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct VerifyReport {
    pub artists: u64,
    pub forward_edges: u64,
    pub reverse_edges: u64,
}
