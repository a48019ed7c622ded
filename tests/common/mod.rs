//! Shared fixture builder: writes a complete store directory from an edge
//! list, the same way the offline pipeline would.

use std::collections::BTreeMap;
use std::path::Path;

use artistpath::formats::{meta, GraphBuilder, MetaArtist};
use artistpath::ArtistId;

/// Deterministic id: 15 zero bytes and one discriminator.
pub fn id(n: u8) -> ArtistId {
    let mut bytes = [0u8; 16];
    bytes[15] = n;
    ArtistId::from_bytes(bytes)
}

pub fn build_store(dir: &Path, artists: &[(ArtistId, &str)], edges: &[(ArtistId, ArtistId, f32)]) {
    let mut forward: BTreeMap<ArtistId, Vec<(ArtistId, f32)>> = BTreeMap::new();
    let mut reverse: BTreeMap<ArtistId, Vec<(ArtistId, f32)>> = BTreeMap::new();
    for &(artist, _) in artists {
        forward.insert(artist, Vec::new());
        reverse.insert(artist, Vec::new());
    }
    for &(u, v, w) in edges {
        forward.get_mut(&u).expect("unknown source artist").push((v, w));
        reverse.get_mut(&v).expect("unknown target artist").push((u, w));
    }

    let mut fwd_builder = GraphBuilder::create(&dir.join("graph.fwd")).unwrap();
    let mut rev_builder = GraphBuilder::create(&dir.join("graph.rev")).unwrap();
    let mut fwd_offsets: BTreeMap<ArtistId, u64> = BTreeMap::new();
    let mut rev_offsets: BTreeMap<ArtistId, u64> = BTreeMap::new();
    for (&artist, neighbors) in &forward {
        fwd_offsets.insert(artist, fwd_builder.append_block(neighbors).unwrap());
    }
    for (&artist, neighbors) in &reverse {
        rev_offsets.insert(artist, rev_builder.append_block(neighbors).unwrap());
    }
    fwd_builder.finish().unwrap();
    rev_builder.finish().unwrap();

    let records: Vec<MetaArtist> = artists
        .iter()
        .map(|&(artist, name)| MetaArtist {
            id: artist,
            name: name.to_string(),
            url: format!("https://www.last.fm/music/{name}"),
            forward_offset: fwd_offsets[&artist],
            reverse_offset: rev_offsets[&artist],
        })
        .collect();
    meta::write(&dir.join("artists.meta"), &records).unwrap();
}

/// The six-artist fixture:
/// A->B(0.9), A->C(0.4), B->D(0.8), C->D(0.5), D->E(0.9), E->F(0.1), F->A(0.2)
pub fn six_artists() -> (Vec<(ArtistId, &'static str)>, Vec<(ArtistId, ArtistId, f32)>) {
    let artists = vec![
        (id(1), "Alpharhythm"),
        (id(2), "Basswitch"),
        (id(3), "Chordelia"),
        (id(4), "Dronefall"),
        (id(5), "Echo Garden"),
        (id(6), "Fernweh"),
    ];
    let edges = vec![
        (id(1), id(2), 0.9),
        (id(1), id(3), 0.4),
        (id(2), id(4), 0.8),
        (id(3), id(4), 0.5),
        (id(4), id(5), 0.9),
        (id(5), id(6), 0.1),
        (id(6), id(1), 0.2),
    ];
    (artists, edges)
}
