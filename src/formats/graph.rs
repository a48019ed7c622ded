//! graph.fwd / graph.rev format - per-artist adjacency blocks
//!
//! Format (little-endian, mmap-friendly):
//!
//! A bare concatenation of adjacency blocks, one per artist. Each block:
//!
//!   count:       u32
//!   repeated count times:
//!     neighbor_id : [16]u8
//!     similarity  : f32   // in [0.0, 1.0]
//!
//! Entries within a block are sorted by similarity descending, so a reader
//! scanning against a similarity floor stops at the first entry below it.
//! Blocks are never located by scanning; they are addressed by offsets from
//! the metadata file.

use memmap2::Mmap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{EngineError, Result};
use crate::id::ArtistId;

/// Bytes per `(neighbor_id, similarity)` entry.
pub const ENTRY_SIZE: usize = ArtistId::LEN + 4;
/// Bytes for the leading `count` field.
pub const COUNT_SIZE: usize = 4;

/// Read-only memory-mapped graph file.
///
/// Shared immutable resource: holds only the mapping and a display label,
/// so concurrent block reads from multiple search workers are safe.
pub struct GraphFile {
    mmap: Mmap,
    label: &'static str,
}

impl GraphFile {
    pub fn open(path: &Path, label: &'static str) -> Result<Self> {
        let file = File::open(path)?;
        // The store is immutable for the process lifetime (built offline,
        // opened once at startup), so the mapping cannot observe writes.
        let mmap = unsafe { Mmap::map(&file)? };
        // Block reads jump around the file by construction.
        #[cfg(unix)]
        mmap.advise(memmap2::Advice::Random)?;
        Ok(Self { mmap, label })
    }

    pub fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Resolve an adjacency block at a metadata-supplied offset.
    ///
    /// Bounds are checked here once; the returned block borrows the mapping
    /// and iterating it cannot overrun.
    pub fn block(&self, offset: u64) -> Result<AdjacencyBlock<'_>> {
        let file_len = self.mmap.len() as u64;
        if offset
            .checked_add(COUNT_SIZE as u64)
            .is_none_or(|end| end > file_len)
        {
            return Err(EngineError::corrupt(
                self.label,
                offset,
                "block offset out of bounds",
            ));
        }
        let start = offset as usize;
        let count = u32::from_le_bytes(self.mmap[start..start + COUNT_SIZE].try_into().unwrap());
        let body_len = count as u64 * ENTRY_SIZE as u64;
        if (offset + COUNT_SIZE as u64)
            .checked_add(body_len)
            .is_none_or(|end| end > file_len)
        {
            return Err(EngineError::corrupt(
                self.label,
                offset,
                format!("block count {count} overflows file size {file_len}"),
            ));
        }
        let body = &self.mmap[start + COUNT_SIZE..start + COUNT_SIZE + body_len as usize];
        Ok(AdjacencyBlock { count, body })
    }
}

/// One artist's neighbors, borrowed straight from the mapping.
#[derive(Clone, Copy, Debug)]
pub struct AdjacencyBlock<'a> {
    count: u32,
    body: &'a [u8],
}

impl<'a> AdjacencyBlock<'a> {
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Lazy `(neighbor_id, similarity)` sequence, truncated at `max_count`
    /// entries or at the first similarity below `min_similarity`.
    pub fn iter(&self, min_similarity: f32, max_count: usize) -> NeighborIter<'a> {
        NeighborIter {
            body: self.body,
            remaining: (self.count as usize).min(max_count),
            min_similarity,
        }
    }
}

/// Single-pass neighbor iterator; no allocation per yielded pair.
pub struct NeighborIter<'a> {
    body: &'a [u8],
    remaining: usize,
    min_similarity: f32,
}

impl Iterator for NeighborIter<'_> {
    type Item = (ArtistId, f32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let (entry, rest) = self.body.split_at(ENTRY_SIZE);
        let similarity = f32::from_le_bytes(entry[ArtistId::LEN..].try_into().unwrap());
        // Entries are sorted descending: everything after this one is below
        // the floor too.
        if similarity < self.min_similarity {
            self.remaining = 0;
            return None;
        }
        let id = ArtistId::from_bytes(entry[..ArtistId::LEN].try_into().unwrap());
        self.body = rest;
        self.remaining -= 1;
        Some((id, similarity))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

/// Appends adjacency blocks and reports the offset of each, for the
/// metadata table. Enforces the descending-similarity invariant.
pub struct GraphBuilder {
    writer: BufWriter<File>,
    position: u64,
}

impl GraphBuilder {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
            position: 0,
        })
    }

    /// Write one block and return its offset. Entries are sorted by
    /// similarity descending (ties by neighbor id, so output is stable).
    pub fn append_block(&mut self, neighbors: &[(ArtistId, f32)]) -> Result<u64> {
        let offset = self.position;
        let mut sorted = neighbors.to_vec();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        self.writer
            .write_all(&(sorted.len() as u32).to_le_bytes())?;
        for (id, similarity) in &sorted {
            self.writer.write_all(id.as_bytes())?;
            self.writer.write_all(&similarity.to_le_bytes())?;
        }
        self.position += (COUNT_SIZE + sorted.len() * ENTRY_SIZE) as u64;
        Ok(offset)
    }

    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn id(n: u8) -> ArtistId {
        let mut bytes = [0u8; 16];
        bytes[15] = n;
        ArtistId::from_bytes(bytes)
    }

    fn write_fixture(path: &Path) -> (u64, u64) {
        let mut builder = GraphBuilder::create(path).unwrap();
        let a = builder
            .append_block(&[(id(2), 0.4), (id(1), 0.9), (id(3), 0.7)])
            .unwrap();
        let b = builder.append_block(&[]).unwrap();
        builder.finish().unwrap();
        (a, b)
    }

    #[test]
    fn test_roundtrip_sorted_descending() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.fwd");
        let (a, _) = write_fixture(&path);

        let graph = GraphFile::open(&path, "graph.fwd").unwrap();
        let block = graph.block(a).unwrap();
        assert_eq!(block.count(), 3);
        let entries: Vec<_> = block.iter(0.0, usize::MAX).collect();
        assert_eq!(
            entries,
            vec![(id(1), 0.9), (id(3), 0.7), (id(2), 0.4)],
        );
    }

    #[test]
    fn test_iter_stops_at_similarity_floor() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.fwd");
        let (a, b) = write_fixture(&path);

        let graph = GraphFile::open(&path, "graph.fwd").unwrap();
        let entries: Vec<_> = graph.block(a).unwrap().iter(0.5, usize::MAX).collect();
        assert_eq!(entries, vec![(id(1), 0.9), (id(3), 0.7)]);

        assert_eq!(graph.block(b).unwrap().iter(0.0, usize::MAX).count(), 0);
    }

    #[test]
    fn test_iter_respects_max_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.fwd");
        let (a, _) = write_fixture(&path);

        let graph = GraphFile::open(&path, "graph.fwd").unwrap();
        let entries: Vec<_> = graph.block(a).unwrap().iter(0.0, 2).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], (id(1), 0.9));
    }

    #[test]
    fn test_offset_out_of_bounds_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.fwd");
        write_fixture(&path);

        let graph = GraphFile::open(&path, "graph.fwd").unwrap();
        let err = graph.block(graph.len() + 8).unwrap_err();
        assert!(matches!(err, EngineError::CorruptStore { .. }));
    }

    #[test]
    fn test_truncated_block_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.fwd");
        let (a, _) = write_fixture(&path);

        // Chop the file mid-block: the count now overflows the file size.
        let file = std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap();
        let len = file.metadata().unwrap().len();
        file.set_len(len - 10).unwrap();
        drop(file);

        let graph = GraphFile::open(&path, "graph.fwd").unwrap();
        let err = graph.block(a).unwrap_err();
        assert!(matches!(err, EngineError::CorruptStore { .. }));
    }
}
