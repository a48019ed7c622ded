//! artists.meta format - artist record table and string arena
//!
//! Format (little-endian, mmap-friendly):
//!
//! Header (16 bytes):
//!   magic:       u32 = 0x4D545241  // "ARTM"
//!   version:     u16 = 1
//!   reserved:    u16 = 0
//!   count:       u32 = n_artists
//!   pad:         [4]u8
//!
//! Record table (count * 44 bytes, sorted by id for binary search):
//!   id              : [16]u8
//!   forward_offset  : u64   // into graph.fwd, lands on a block's count
//!   reverse_offset  : u64   // into graph.rev
//!   name_offset     : u32   // into string arena
//!   name_length     : u16
//!   url_offset      : u32
//!   url_length      : u16
//!
//! String arena (rest of file): UTF-8 bytes addressed by the table.

use memmap2::Mmap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{EngineError, Result};
use crate::id::ArtistId;

const MAGIC: u32 = 0x4D545241; // "ARTM"
const VERSION: u16 = 1;
const HEADER_SIZE: usize = 16;
const RECORD_SIZE: usize = 44;

const FILE_LABEL: &str = "artists.meta";

/// One parsed table record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtistRecord {
    pub id: ArtistId,
    pub forward_offset: u64,
    pub reverse_offset: u64,
    pub name_offset: u32,
    pub name_length: u16,
    pub url_offset: u32,
    pub url_length: u16,
}

/// Read-only memory-mapped metadata file.
#[derive(Debug)]
pub struct MetaFile {
    mmap: Mmap,
    count: u32,
    arena_start: usize,
}

impl MetaFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // Immutable for the process lifetime, same contract as the graph
        // files.
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < HEADER_SIZE {
            return Err(EngineError::corrupt(
                FILE_LABEL,
                0,
                format!("file too small for header: {} bytes", mmap.len()),
            ));
        }
        let magic = u32::from_le_bytes(mmap[0..4].try_into().unwrap());
        if magic != MAGIC {
            return Err(EngineError::corrupt(
                FILE_LABEL,
                0,
                format!("invalid magic: expected 0x{MAGIC:08x}, got 0x{magic:08x}"),
            ));
        }
        let version = u16::from_le_bytes(mmap[4..6].try_into().unwrap());
        if version != VERSION {
            return Err(EngineError::corrupt(
                FILE_LABEL,
                4,
                format!("unsupported version: {version}"),
            ));
        }
        let count = u32::from_le_bytes(mmap[8..12].try_into().unwrap());
        let arena_start = HEADER_SIZE + count as usize * RECORD_SIZE;
        if arena_start > mmap.len() {
            return Err(EngineError::corrupt(
                FILE_LABEL,
                8,
                format!(
                    "record count {count} overflows file size {}",
                    mmap.len()
                ),
            ));
        }

        Ok(Self {
            mmap,
            count,
            arena_start,
        })
    }

    /// Total artist count.
    pub fn len(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn record_bytes(&self, index: u32) -> &[u8] {
        let start = HEADER_SIZE + index as usize * RECORD_SIZE;
        &self.mmap[start..start + RECORD_SIZE]
    }

    /// Binary search the id-sorted table.
    pub fn find(&self, id: ArtistId) -> Option<u32> {
        let key = id.as_bytes().as_slice();
        let (mut lo, mut hi) = (0u32, self.count);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.record_bytes(mid)[..ArtistId::LEN].cmp(key) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Some(mid),
            }
        }
        None
    }

    pub fn record(&self, index: u32) -> Result<ArtistRecord> {
        if index >= self.count {
            return Err(EngineError::corrupt(
                FILE_LABEL,
                HEADER_SIZE as u64,
                format!("record index {index} out of range (count {})", self.count),
            ));
        }
        let r = self.record_bytes(index);
        Ok(ArtistRecord {
            id: ArtistId::from_bytes(r[0..16].try_into().unwrap()),
            forward_offset: u64::from_le_bytes(r[16..24].try_into().unwrap()),
            reverse_offset: u64::from_le_bytes(r[24..32].try_into().unwrap()),
            name_offset: u32::from_le_bytes(r[32..36].try_into().unwrap()),
            name_length: u16::from_le_bytes(r[36..38].try_into().unwrap()),
            url_offset: u32::from_le_bytes(r[38..42].try_into().unwrap()),
            url_length: u16::from_le_bytes(r[42..44].try_into().unwrap()),
        })
    }

    fn arena_str(&self, offset: u32, length: u16) -> Result<&str> {
        let start = self.arena_start + offset as usize;
        let end = start + length as usize;
        if end > self.mmap.len() {
            return Err(EngineError::corrupt(
                FILE_LABEL,
                start as u64,
                "string slice out of bounds",
            ));
        }
        std::str::from_utf8(&self.mmap[start..end]).map_err(|e| {
            EngineError::corrupt(FILE_LABEL, start as u64, format!("invalid UTF-8: {e}"))
        })
    }

    pub fn name(&self, record: &ArtistRecord) -> Result<&str> {
        self.arena_str(record.name_offset, record.name_length)
    }

    pub fn url(&self, record: &ArtistRecord) -> Result<&str> {
        self.arena_str(record.url_offset, record.url_length)
    }
}

/// Input to the metadata writer.
#[derive(Debug, Clone)]
pub struct MetaArtist {
    pub id: ArtistId,
    pub name: String,
    pub url: String,
    pub forward_offset: u64,
    pub reverse_offset: u64,
}

/// Write artists.meta. Records are sorted by id so the table is binary
/// searchable regardless of input order.
pub fn write(path: &Path, artists: &[MetaArtist]) -> Result<()> {
    let mut sorted: Vec<&MetaArtist> = artists.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut writer = BufWriter::new(File::create(path)?);

    let mut header = Vec::with_capacity(HEADER_SIZE);
    header.extend_from_slice(&MAGIC.to_le_bytes());
    header.extend_from_slice(&VERSION.to_le_bytes());
    header.extend_from_slice(&0u16.to_le_bytes());
    header.extend_from_slice(&(sorted.len() as u32).to_le_bytes());
    header.extend_from_slice(&[0u8; 4]);
    debug_assert_eq!(header.len(), HEADER_SIZE);
    writer.write_all(&header)?;

    let mut arena: Vec<u8> = Vec::new();
    let intern = |arena: &mut Vec<u8>, s: &str| -> Result<(u32, u16)> {
        if s.len() > u16::MAX as usize {
            return Err(EngineError::InvalidArgument(format!(
                "string too long for arena: {} bytes",
                s.len()
            )));
        }
        let offset = arena.len() as u32;
        arena.extend_from_slice(s.as_bytes());
        Ok((offset, s.len() as u16))
    };

    for artist in &sorted {
        let (name_offset, name_length) = intern(&mut arena, &artist.name)?;
        let (url_offset, url_length) = intern(&mut arena, &artist.url)?;

        writer.write_all(artist.id.as_bytes())?;
        writer.write_all(&artist.forward_offset.to_le_bytes())?;
        writer.write_all(&artist.reverse_offset.to_le_bytes())?;
        writer.write_all(&name_offset.to_le_bytes())?;
        writer.write_all(&name_length.to_le_bytes())?;
        writer.write_all(&url_offset.to_le_bytes())?;
        writer.write_all(&url_length.to_le_bytes())?;
    }

    writer.write_all(&arena)?;
    writer.flush()?;
    Ok(())
}
