//! Unweighted shortest path and layered exploration
//!
//! Point-to-point runs bidirectional BFS: the source side expands on the
//! forward graph, the target side on the reverse graph, alternating on the
//! smaller frontier. A node popped on one side that the opposite side has
//! already recorded is the meeting node; the halves are spliced there.
//! Visit order is neighbor-list order, so results are deterministic for
//! identical inputs.

use rustc_hash::FxHashMap;

use super::{adjacency, SearchControl, SearchParams, Traversal};
use crate::error::{EngineError, Result};
use crate::id::ArtistId;
use crate::store::{ArtistStore, Direction};

enum Expansion {
    Met(ArtistId),
    Next(Vec<ArtistId>),
}

pub(crate) fn shortest_path(
    store: &ArtistStore,
    from: ArtistId,
    to: ArtistId,
    params: &SearchParams,
    control: &SearchControl,
) -> Result<Traversal> {
    let mut traversal = Traversal::new();
    traversal.visited.insert(from);
    if from == to {
        traversal.path = Some(vec![from]);
        return Ok(traversal);
    }
    if params.budget < 2 {
        return Err(EngineError::BudgetExceeded {
            visited: 1,
            edges: 0,
        });
    }
    traversal.visited.insert(to);

    let mut pred_src: FxHashMap<ArtistId, ArtistId> = FxHashMap::default();
    let mut pred_tgt: FxHashMap<ArtistId, ArtistId> = FxHashMap::default();
    pred_src.insert(from, from);
    pred_tgt.insert(to, to);

    let mut frontier_src = vec![from];
    let mut frontier_tgt = vec![to];

    loop {
        if frontier_src.is_empty() && frontier_tgt.is_empty() {
            // Both reachable sets exhausted without meeting: no path.
            return Ok(traversal);
        }
        let expand_src = if frontier_tgt.is_empty() {
            true
        } else if frontier_src.is_empty() {
            false
        } else {
            frontier_src.len() <= frontier_tgt.len()
        };

        let outcome = if expand_src {
            expand_layer(
                store,
                Direction::Forward,
                &frontier_src,
                &mut pred_src,
                &pred_tgt,
                &mut traversal,
                params,
                control,
            )?
        } else {
            expand_layer(
                store,
                Direction::Reverse,
                &frontier_tgt,
                &mut pred_tgt,
                &pred_src,
                &mut traversal,
                params,
                control,
            )?
        };

        match outcome {
            Expansion::Met(meeting) => {
                traversal.path = Some(splice(meeting, &pred_src, &pred_tgt, from, to));
                return Ok(traversal);
            }
            Expansion::Next(next) => {
                if expand_src {
                    frontier_src = next;
                } else {
                    frontier_tgt = next;
                }
            }
        }
    }
}

/// Expand one full layer of one side.
#[allow(clippy::too_many_arguments)]
fn expand_layer(
    store: &ArtistStore,
    direction: Direction,
    frontier: &[ArtistId],
    this_side: &mut FxHashMap<ArtistId, ArtistId>,
    other_side: &FxHashMap<ArtistId, ArtistId>,
    traversal: &mut Traversal,
    params: &SearchParams,
    control: &SearchControl,
) -> Result<Expansion> {
    let mut next = Vec::new();
    for &node in frontier {
        control.check(traversal.visited.len())?;
        if other_side.contains_key(&node) {
            return Ok(Expansion::Met(node));
        }
        for (neighbor, _similarity) in adjacency(store, node, direction, params)? {
            traversal.edges_considered += 1;
            if this_side.contains_key(&neighbor) {
                continue;
            }
            if !traversal.visited.contains(&neighbor)
                && traversal.visited.len() == params.budget
            {
                return Err(EngineError::BudgetExceeded {
                    visited: traversal.visited.len() as u64,
                    edges: traversal.edges_considered,
                });
            }
            this_side.insert(neighbor, node);
            traversal.visited.insert(neighbor);
            next.push(neighbor);
        }
    }
    Ok(Expansion::Next(next))
}

/// Join the two predecessor walks at the meeting node. Both maps are known
/// to contain it.
fn splice(
    meeting: ArtistId,
    pred_src: &FxHashMap<ArtistId, ArtistId>,
    pred_tgt: &FxHashMap<ArtistId, ArtistId>,
    from: ArtistId,
    to: ArtistId,
) -> Vec<ArtistId> {
    let mut path = Vec::new();
    let mut cursor = meeting;
    while cursor != from {
        path.push(cursor);
        cursor = pred_src[&cursor];
    }
    path.push(from);
    path.reverse();

    let mut cursor = meeting;
    while cursor != to {
        cursor = pred_tgt[&cursor];
        path.push(cursor);
    }
    path
}

/// Layer-by-layer bounded exploration; stops once the visited set holds
/// `budget` artists. Records each node's BFS layer for presentation.
pub(crate) fn explore(
    store: &ArtistStore,
    root: ArtistId,
    direction: Direction,
    params: &SearchParams,
    control: &SearchControl,
) -> Result<Traversal> {
    let mut traversal = Traversal::new();
    traversal.visited.insert(root);
    traversal.depth.insert(root, 0);

    let mut frontier = vec![root];
    let mut layer = 0u32;

    'outer: while !frontier.is_empty() {
        layer += 1;
        let mut next = Vec::new();
        for &node in &frontier {
            control.check(traversal.visited.len())?;
            for (neighbor, _similarity) in adjacency(store, node, direction, params)? {
                traversal.edges_considered += 1;
                if traversal.visited.contains(&neighbor) {
                    continue;
                }
                if traversal.visited.len() == params.budget {
                    traversal.truncated = true;
                    break 'outer;
                }
                traversal.visited.insert(neighbor);
                traversal.depth.insert(neighbor, layer);
                next.push(neighbor);
            }
        }
        frontier = next;
    }
    Ok(traversal)
}
