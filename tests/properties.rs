//! Property-style tests: invariants that must hold for any well-formed
//! store, checked on the six-artist fixture.

mod common;

use tempfile::tempdir;

use artistpath::formats::{meta, GraphBuilder, MetaArtist};
use artistpath::{
    Algorithm, ArtistStore, Direction, Engine, EngineConfig, EngineError, SearchControl,
    SearchParams,
};
use common::{build_store, id, six_artists};

fn fixture_engine(dir: &std::path::Path) -> Engine {
    let (artists, edges) = six_artists();
    build_store(dir, &artists, &edges);
    Engine::open(&EngineConfig::new(dir.to_path_buf())).unwrap()
}

fn params(min_similarity: f32, max_relations: usize, budget: usize) -> SearchParams {
    SearchParams {
        min_similarity,
        max_relations,
        budget,
    }
}

#[test]
fn test_offset_round_trip() {
    let dir = tempdir().unwrap();
    let (artists, edges) = six_artists();
    build_store(dir.path(), &artists, &edges);

    let store = ArtistStore::open(dir.path()).unwrap();
    for &(artist, _) in &artists {
        let out_degree = edges.iter().filter(|&&(u, _, _)| u == artist).count();
        let in_degree = edges.iter().filter(|&&(_, v, _)| v == artist).count();
        let forward = store
            .neighbors(artist, Direction::Forward, 0.0, usize::MAX)
            .unwrap()
            .count();
        let reverse = store
            .neighbors(artist, Direction::Reverse, 0.0, usize::MAX)
            .unwrap()
            .count();
        assert_eq!(forward, out_degree);
        assert_eq!(reverse, in_degree);
    }
}

#[test]
fn test_adjacency_sorted_descending() {
    let dir = tempdir().unwrap();
    let (artists, edges) = six_artists();
    build_store(dir.path(), &artists, &edges);

    let store = ArtistStore::open(dir.path()).unwrap();
    for &(artist, _) in &artists {
        for direction in [Direction::Forward, Direction::Reverse] {
            let sims: Vec<f32> = store
                .neighbors(artist, direction, 0.0, usize::MAX)
                .unwrap()
                .map(|(_, w)| w)
                .collect();
            assert!(sims.windows(2).all(|w| w[0] >= w[1]));
        }
    }
}

#[test]
fn test_transposition_detected_when_broken() {
    let dir = tempdir().unwrap();

    // One forward edge with no reverse counterpart.
    let mut fwd = GraphBuilder::create(&dir.path().join("graph.fwd")).unwrap();
    let mut rev = GraphBuilder::create(&dir.path().join("graph.rev")).unwrap();
    let a_fwd = fwd.append_block(&[(id(2), 0.7)]).unwrap();
    let b_fwd = fwd.append_block(&[]).unwrap();
    let a_rev = rev.append_block(&[]).unwrap();
    let b_rev = rev.append_block(&[]).unwrap(); // missing A->B mirror
    fwd.finish().unwrap();
    rev.finish().unwrap();
    meta::write(
        &dir.path().join("artists.meta"),
        &[
            MetaArtist {
                id: id(1),
                name: "A".into(),
                url: "https://example.com/a".into(),
                forward_offset: a_fwd,
                reverse_offset: a_rev,
            },
            MetaArtist {
                id: id(2),
                name: "B".into(),
                url: "https://example.com/b".into(),
                forward_offset: b_fwd,
                reverse_offset: b_rev,
            },
        ],
    )
    .unwrap();

    let store = ArtistStore::open(dir.path()).unwrap();
    assert!(matches!(
        store.verify(),
        Err(EngineError::CorruptStore { .. })
    ));
}

#[test]
fn test_budget_monotonicity() {
    let dir = tempdir().unwrap();
    let engine = fixture_engine(dir.path());
    let control = SearchControl::default();

    let reference = engine
        .find_path(id(1), id(5), params(0.0, 10, 100), Algorithm::Bfs, &control)
        .unwrap();
    assert!(reference.found);
    let reference_path: Vec<_> = reference.path.unwrap().iter().map(|a| a.id).collect();

    let mut smallest_working = None;
    for budget in 2..=20 {
        let result = engine
            .find_path(id(1), id(5), params(0.0, 10, budget), Algorithm::Bfs, &control)
            .unwrap();
        if result.found {
            smallest_working.get_or_insert(budget);
            let path: Vec<_> = result.path.unwrap().iter().map(|a| a.id).collect();
            assert_eq!(path, reference_path, "budget {budget} changed the path");
        } else if let Some(working) = smallest_working {
            panic!("budget {budget} lost a path found with budget {working}");
        }
    }
    assert!(smallest_working.is_some());
}

#[test]
fn test_threshold_monotonicity() {
    let dir = tempdir().unwrap();
    let engine = fixture_engine(dir.path());
    let control = SearchControl::default();

    // Found at 0.5; must stay found, and identical, at every lower floor.
    let reference = engine
        .find_path(id(1), id(5), params(0.5, 10, 100), Algorithm::Bfs, &control)
        .unwrap();
    assert!(reference.found);
    let reference_path: Vec<_> = reference.path.unwrap().iter().map(|a| a.id).collect();

    for floor in [0.45, 0.3, 0.1, 0.0] {
        let result = engine
            .find_path(id(1), id(5), params(floor, 10, 100), Algorithm::Bfs, &control)
            .unwrap();
        let path: Vec<_> = result.path.unwrap().iter().map(|a| a.id).collect();
        assert_eq!(path, reference_path, "floor {floor} changed the path");
    }
}

#[test]
fn test_exploration_containment() {
    let dir = tempdir().unwrap();
    let engine = fixture_engine(dir.path());

    for floor in [0.0, 0.45, 0.85] {
        let result = engine
            .explore_forward(
                id(1),
                params(floor, 10, 10),
                Algorithm::Bfs,
                &SearchControl::default(),
            )
            .unwrap();

        for edge in &result.subgraph.edges {
            assert!(edge.similarity >= floor);
            assert!(result.subgraph.nodes.iter().any(|n| n.id == edge.source));
            assert!(result.subgraph.nodes.iter().any(|n| n.id == edge.target));
        }
    }
}

#[test]
fn test_determinism() {
    let dir = tempdir().unwrap();
    let engine = fixture_engine(dir.path());
    let control = SearchControl::default();

    for algorithm in [Algorithm::Bfs, Algorithm::Weighted] {
        let first = engine
            .find_path(id(1), id(5), params(0.0, 10, 10), algorithm, &control)
            .unwrap();
        let second = engine
            .find_path(id(1), id(5), params(0.0, 10, 10), algorithm, &control)
            .unwrap();
        assert_eq!(first.stats.visited, second.stats.visited);
        assert_eq!(first.stats.edges_considered, second.stats.edges_considered);

        // Full payloads match except for wall-clock timing.
        let mut a = serde_json::to_value(&first).unwrap();
        let mut b = serde_json::to_value(&second).unwrap();
        a["stats"]["duration_ms"] = 0.into();
        b["stats"]["duration_ms"] = 0.into();
        assert_eq!(a, b);
    }
}

#[test]
fn test_weighted_beats_alternative_path() {
    let dir = tempdir().unwrap();
    let engine = fixture_engine(dir.path());

    // Two routes from A to E exist: via B (0.9 * 0.8 * 0.9 = 0.648) and
    // via C (0.4 * 0.5 * 0.9 = 0.18). The weighted search must pick the
    // first.
    let result = engine
        .find_path(
            id(1),
            id(5),
            params(0.0, 10, 100),
            Algorithm::Weighted,
            &SearchControl::default(),
        )
        .unwrap();
    let path: Vec<_> = result.path.unwrap().iter().map(|a| a.id).collect();
    assert_eq!(path, vec![id(1), id(2), id(4), id(5)]);
    assert!(result.similarity_product.unwrap() > 0.6);
}

#[test]
fn test_name_lookup_idempotent() {
    let dir = tempdir().unwrap();
    let engine = fixture_engine(dir.path());

    let (artists, _) = six_artists();
    for (artist, name) in artists {
        let resolved = engine.resolve_exact(name).unwrap();
        assert!(resolved.iter().any(|a| a.id == artist));
        // And round again through the resolved display name.
        let again = engine.resolve_exact(&resolved[0].name).unwrap();
        assert!(again.iter().any(|a| a.id == artist));
    }
}

#[test]
fn test_fan_out_cap_limits_edges() {
    let dir = tempdir().unwrap();
    let engine = fixture_engine(dir.path());

    // With max_relations = 1 only the strongest edge out of A is taken:
    // A->B. The C branch disappears from the neighborhood.
    let result = engine
        .explore_forward(
            id(1),
            params(0.0, 1, 10),
            Algorithm::Bfs,
            &SearchControl::default(),
        )
        .unwrap();
    let nodes: Vec<_> = result.subgraph.nodes.iter().map(|n| n.id).collect();
    assert!(nodes.contains(&id(2)));
    assert!(!nodes.contains(&id(3)));
}
