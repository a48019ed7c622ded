//! Name-to-artist lookup
//!
//! Built once at startup from the metadata file and read-only afterwards.
//! Lookup is case- and whitespace-insensitive; several artists may share a
//! lowercased name and all are retrievable.
//!
//! The table of lowercased names is sorted, which gives exact and prefix
//! lookup by binary search. Substring queries go through a byte-trigram
//! inverted index: at ~850k names a bare linear scan per keystroke is the
//! difference between microseconds and tens of milliseconds. Queries
//! shorter than one trigram fall back to the scan.

use rand::Rng;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::store::ArtistStore;

const TRIGRAM: usize = 3;

struct NameEntry {
    lower: String,
    /// Metadata table index of the artist carrying this name.
    index: u32,
}

pub struct NameIndex {
    /// Sorted by (lowercased name, metadata index).
    names: Vec<NameEntry>,
    /// Trigram -> ascending positions into `names`.
    trigrams: FxHashMap<[u8; TRIGRAM], Vec<u32>>,
}

/// Lowercased, trimmed comparison key.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl NameIndex {
    pub fn build(store: &ArtistStore) -> Result<Self> {
        let mut entries = Vec::with_capacity(store.artist_count() as usize);
        for index in 0..store.artist_count() {
            let artist = store.artist_at(index)?;
            entries.push((index, normalize(artist.name)));
        }
        Ok(Self::from_entries(entries))
    }

    fn from_entries(entries: Vec<(u32, String)>) -> Self {
        let mut names: Vec<NameEntry> = entries
            .into_iter()
            .map(|(index, lower)| NameEntry { lower, index })
            .collect();
        names.sort_by(|a, b| a.lower.cmp(&b.lower).then_with(|| a.index.cmp(&b.index)));

        let mut trigrams: FxHashMap<[u8; TRIGRAM], Vec<u32>> = FxHashMap::default();
        for (position, entry) in names.iter().enumerate() {
            for window in entry.lower.as_bytes().windows(TRIGRAM) {
                let key: [u8; TRIGRAM] = window.try_into().unwrap();
                let postings = trigrams.entry(key).or_default();
                // Positions ascend; only guard against a trigram repeating
                // within one name.
                if postings.last() != Some(&(position as u32)) {
                    postings.push(position as u32);
                }
            }
        }

        Self { names, trigrams }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All artists whose lowercased, trimmed name equals the query.
    pub fn resolve_exact(&self, name: &str) -> Vec<u32> {
        let query = normalize(name);
        let (start, end) = self.prefix_range(&query);
        self.names[start..end]
            .iter()
            .filter(|e| e.lower == query)
            .map(|e| e.index)
            .collect()
    }

    /// Ranked substring search: exact matches first, then prefix matches,
    /// then other substring matches; ties in lexicographic name order.
    pub fn search(&self, query: &str, limit: usize) -> Vec<u32> {
        let query = normalize(query);
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let (start, end) = self.prefix_range(&query);
        let mut hits: Vec<u32> = Vec::new();

        for entry in &self.names[start..end] {
            if entry.lower == query {
                hits.push(entry.index);
            }
        }
        for entry in &self.names[start..end] {
            if entry.lower != query {
                hits.push(entry.index);
            }
        }

        if hits.len() < limit {
            for position in self.substring_positions(&query) {
                let position = position as usize;
                if position >= start && position < end {
                    continue; // already ranked as exact or prefix
                }
                hits.push(self.names[position].index);
                if hits.len() >= limit {
                    break;
                }
            }
        }

        hits.truncate(limit);
        hits
    }

    /// Uniform pick across all artists; O(1).
    pub fn random(&self) -> Option<u32> {
        if self.names.is_empty() {
            return None;
        }
        let position = rand::rng().random_range(0..self.names.len());
        Some(self.names[position].index)
    }

    /// Contiguous run of names starting with `query` in the sorted table.
    fn prefix_range(&self, query: &str) -> (usize, usize) {
        let start = self.names.partition_point(|e| e.lower.as_str() < query);
        let end = start
            + self.names[start..].partition_point(|e| e.lower.starts_with(query));
        (start, end)
    }

    /// Ascending positions of names containing `query` somewhere other than
    /// (necessarily) the start.
    fn substring_positions(&self, query: &str) -> Vec<u32> {
        if query.len() < TRIGRAM {
            // Too short for the inverted index; scan.
            return (0..self.names.len() as u32)
                .filter(|&p| self.names[p as usize].lower.contains(query))
                .collect();
        }

        // The rarest trigram of the query bounds the candidate set; a
        // contains() check settles each candidate.
        let rarest = query
            .as_bytes()
            .windows(TRIGRAM)
            .map(|w| {
                let key: [u8; TRIGRAM] = w.try_into().unwrap();
                self.trigrams.get(&key).map(Vec::as_slice).unwrap_or(&[])
            })
            .min_by_key(|postings| postings.len())
            .unwrap_or(&[]);

        rarest
            .iter()
            .copied()
            .filter(|&p| self.names[p as usize].lower.contains(query))
            .collect()
    }
}
