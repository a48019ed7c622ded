//! Result assembly
//!
//! Turns a kernel traversal into the caller-facing subgraph: visited nodes
//! enriched with display name and URL, plus every edge among them that
//! satisfies the similarity floor within the fan-out cap. Edges always keep
//! their natural `(source, target, similarity)` orientation, including for
//! reverse exploration.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{SearchParams, Traversal};
use crate::error::Result;
use crate::id::ArtistId;
use crate::store::{ArtistStore, Direction};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubgraphNode {
    pub id: ArtistId,
    pub name: String,
    pub url: String,
    /// BFS layer from the exploration root; absent for other modes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    /// Finalized `-ln(similarity)` cost; absent for other modes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct SubgraphEdge {
    pub source: ArtistId,
    pub target: ArtistId,
    pub similarity: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Subgraph {
    pub nodes: Vec<SubgraphNode>,
    pub edges: Vec<SubgraphEdge>,
}

/// Materialize the subgraph for a finished traversal.
///
/// Nodes come out sorted by id; edges follow node order, then the on-disk
/// descending-similarity order, so identical inputs produce byte-identical
/// results.
pub(crate) fn subgraph(
    store: &ArtistStore,
    traversal: &Traversal,
    params: &SearchParams,
) -> Result<Subgraph> {
    let mut ids: Vec<ArtistId> = traversal.visited.iter().copied().collect();
    ids.sort_unstable();

    let mut nodes = Vec::with_capacity(ids.len());
    let mut edges = Vec::new();
    for &id in &ids {
        let artist = store
            .lookup(id)?
            .ok_or_else(|| crate::error::EngineError::UnknownArtist(id.to_string()))?;
        nodes.push(SubgraphNode {
            id,
            name: artist.name.to_owned(),
            url: artist.url.to_owned(),
            depth: traversal.depth.get(&id).copied(),
            cost: traversal.cost.get(&id).copied(),
        });

        for (target, similarity) in store.neighbors_of(
            &artist,
            Direction::Forward,
            params.min_similarity,
            params.max_relations,
        )? {
            if traversal.visited.contains(&target) {
                edges.push(SubgraphEdge {
                    source: id,
                    target,
                    similarity,
                });
            }
        }
    }

    Ok(Subgraph { nodes, edges })
}

/// Product of similarities along a hop-ordered path. Edges found through
/// the reverse graph are under the fan-out cap of the *target's* block, so
/// the forward block is scanned without a cap here; the floor still
/// bounds the scan.
pub(crate) fn path_product(
    store: &ArtistStore,
    path: &[ArtistId],
    params: &SearchParams,
) -> Result<Option<f64>> {
    let mut product = 1.0f64;
    for pair in path.windows(2) {
        let weight = store
            .neighbors(pair[0], Direction::Forward, params.min_similarity, usize::MAX)?
            .find(|&(neighbor, _)| neighbor == pair[1])
            .map(|(_, similarity)| similarity as f64);
        match weight {
            Some(w) => product *= w,
            None => return Ok(None),
        }
    }
    Ok(Some(product))
}
