//! Weighted best-similarity path
//!
//! Edge cost is `-ln(similarity)`, so minimizing the cumulative cost
//! maximizes the product of similarities along the path. Zero-similarity
//! edges are skipped regardless of the floor; the logarithm is undefined
//! there. Ties break on fewer hops, then lexicographic neighbor id, which
//! fixes the visit order for identical inputs.

use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use super::{adjacency, SearchControl, SearchParams, Traversal};
use crate::error::{EngineError, Result};
use crate::id::ArtistId;
use crate::store::{ArtistStore, Direction};

#[derive(PartialEq)]
struct QueueEntry {
    cost: f64,
    hops: u32,
    id: ArtistId,
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Costs are sums of -ln over (0, 1] similarities: finite and
        // non-negative, so total_cmp is a plain numeric order here.
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.hops.cmp(&other.hops))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Relaxation {
    dist: FxHashMap<ArtistId, (f64, u32)>,
    pred: FxHashMap<ArtistId, ArtistId>,
    settled: FxHashSet<ArtistId>,
    heap: BinaryHeap<Reverse<QueueEntry>>,
}

impl Relaxation {
    fn seed(root: ArtistId) -> Self {
        let mut state = Self {
            dist: FxHashMap::default(),
            pred: FxHashMap::default(),
            settled: FxHashSet::default(),
            heap: BinaryHeap::new(),
        };
        state.dist.insert(root, (0.0, 0));
        state.heap.push(Reverse(QueueEntry {
            cost: 0.0,
            hops: 0,
            id: root,
        }));
        state
    }

    fn relax(&mut self, entry: &QueueEntry, neighbor: ArtistId, similarity: f32) {
        if self.settled.contains(&neighbor) {
            return;
        }
        let cost = entry.cost - (similarity as f64).ln();
        let hops = entry.hops + 1;
        let improves = match self.dist.get(&neighbor) {
            None => true,
            Some(&(best_cost, best_hops)) => {
                cost < best_cost || (cost == best_cost && hops < best_hops)
            }
        };
        if improves {
            self.dist.insert(neighbor, (cost, hops));
            self.pred.insert(neighbor, entry.id);
            self.heap.push(Reverse(QueueEntry {
                cost,
                hops,
                id: neighbor,
            }));
        }
    }
}

pub(crate) fn best_path(
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

    let mut state = Relaxation::seed(from);

    while let Some(Reverse(entry)) = state.heap.pop() {
        if state.settled.contains(&entry.id) {
            continue; // stale heap entry
        }
        control.check(state.settled.len())?;
        state.settled.insert(entry.id);
        traversal.visited.insert(entry.id);

        // Popping the target, not merely relaxing it, is what makes the
        // first answer optimal.
        if entry.id == to {
            traversal.path = Some(walk_back(&state.pred, from, to));
            return Ok(traversal);
        }
        if state.settled.len() == params.budget {
            return Err(EngineError::BudgetExceeded {
                visited: traversal.visited.len() as u64,
                edges: traversal.edges_considered,
            });
        }

        for (neighbor, similarity) in
            adjacency(store, entry.id, Direction::Forward, params)?
        {
            traversal.edges_considered += 1;
            if similarity <= 0.0 {
                continue;
            }
            state.relax(&entry, neighbor, similarity);
        }
    }

    // Queue drained: target unreachable under the floor.
    Ok(traversal)
}

/// Pops up to `budget` nodes in increasing cost order; records each node's
/// finalized cost for presentation.
pub(crate) fn explore(
    store: &ArtistStore,
    root: ArtistId,
    direction: Direction,
    params: &SearchParams,
    control: &SearchControl,
) -> Result<Traversal> {
    let mut traversal = Traversal::new();
    let mut state = Relaxation::seed(root);

    while let Some(Reverse(entry)) = state.heap.pop() {
        if state.settled.contains(&entry.id) {
            continue;
        }
        control.check(state.settled.len())?;
        state.settled.insert(entry.id);
        traversal.visited.insert(entry.id);
        traversal.cost.insert(entry.id, entry.cost);

        if state.settled.len() == params.budget {
            traversal.truncated = state
                .heap
                .iter()
                .any(|Reverse(e)| !state.settled.contains(&e.id));
            return Ok(traversal);
        }

        for (neighbor, similarity) in adjacency(store, entry.id, direction, params)? {
            traversal.edges_considered += 1;
            if similarity <= 0.0 {
                continue;
            }
            state.relax(&entry, neighbor, similarity);
        }
    }
    Ok(traversal)
}

fn walk_back(
    pred: &FxHashMap<ArtistId, ArtistId>,
    from: ArtistId,
    to: ArtistId,
) -> Vec<ArtistId> {
    let mut path = vec![to];
    let mut cursor = to;
    while cursor != from {
        cursor = pred[&cursor];
        path.push(cursor);
    }
    path.reverse();
    path
}
