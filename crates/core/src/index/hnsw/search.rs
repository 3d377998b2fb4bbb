//! HNSW search: single-layer beam search and multi-layer KNN.
//!
//! An optional predicate over node ids is applied during traversal. Nodes that
//! fail it still route the search but never enter the result set.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

use super::graph::HnswGraph;
use super::visited::VisitedSet;

thread_local! {
    static SEARCH_VISITED: RefCell<VisitedSet> = RefCell::new(VisitedSet::default());
}

/// (distance, id), ordered by distance then id.
type Scored = (OrderedFloat<f32>, u32);

/// Beam search on one layer. Returns up to `ef` nodes passing `accept`,
/// closest first.
#[allow(clippy::too_many_arguments)]
pub(crate) fn search_layer<F: Fn(u32) -> bool>(
    graph: &HnswGraph,
    query: &[f32],
    entry_points: &[u32],
    ef: usize,
    layer: usize,
    visited: &mut VisitedSet,
    accept: &F,
) -> Vec<(f32, u32)> {
    visited.reset(graph.len());
    // Min-heap of nodes still to expand, max-heap of the best `ef` results.
    let mut frontier: BinaryHeap<Reverse<Scored>> = BinaryHeap::with_capacity(ef * 2);
    let mut results: BinaryHeap<Scored> = BinaryHeap::with_capacity(ef + 1);
    let mut worst = f32::MAX;

    for &ep in entry_points {
        if !visited.visit(ep) {
            continue;
        }
        let dist = graph.distance(query, ep);
        frontier.push(Reverse((OrderedFloat(dist), ep)));
        if accept(ep) {
            results.push((OrderedFloat(dist), ep));
            if results.len() > ef {
                results.pop();
            }
            if results.len() >= ef {
                worst = results.peek().map_or(f32::MAX, |r| r.0 .0);
            }
        }
    }

    while let Some(Reverse((OrderedFloat(c_dist), node))) = frontier.pop() {
        if results.len() >= ef && c_dist > worst {
            break;
        }
        let Some(links) = graph.neighbors[node as usize].get(layer) else {
            continue;
        };

        for &next in links {
            if !visited.visit(next) {
                continue;
            }
            let dist = graph.distance(query, next);
            if results.len() < ef || dist < worst {
                frontier.push(Reverse((OrderedFloat(dist), next)));
                if accept(next) {
                    results.push((OrderedFloat(dist), next));
                    if results.len() > ef {
                        results.pop();
                    }
                    worst = if results.len() >= ef {
                        results.peek().map_or(f32::MAX, |r| r.0 .0)
                    } else {
                        f32::MAX
                    };
                }
            }
        }
    }

    results
        .into_sorted_vec()
        .into_iter()
        .map(|(d, id)| (d.0, id))
        .collect()
}

/// Multi-layer KNN: greedy descent through the upper layers, then a beam
/// search of width `max(ef_search, k)` on layer 0 with `accept` applied.
///
/// When a selective predicate leaves fewer than `k` results, the beam is
/// widened up to four times before giving up.
pub(crate) fn knn_search<F: Fn(u32) -> bool>(
    graph: &HnswGraph,
    query: &[f32],
    k: usize,
    accept: &F,
) -> Vec<(f32, u32)> {
    let Some(entry_point) = graph.entry_point else {
        return Vec::new();
    };
    if k == 0 {
        return Vec::new();
    }

    SEARCH_VISITED.with(|cell| {
        let mut visited = cell.borrow_mut();

        let mut current = entry_point;
        let route_all = |_: u32| true;
        for layer in (1..=graph.max_layer).rev() {
            let nearest = search_layer(
                graph,
                query,
                std::slice::from_ref(&current),
                1,
                layer,
                &mut *visited,
                &route_all,
            );
            if let Some(&(_, id)) = nearest.first() {
                current = id;
            }
        }

        let base_ef = graph.config.ef_search.max(k);
        let max_ef = (base_ef * 4).min(graph.len()).max(base_ef);
        let mut ef = base_ef;
        let mut results = loop {
            let found = search_layer(
                graph,
                query,
                std::slice::from_ref(&current),
                ef,
                0,
                &mut *visited,
                accept,
            );
            if found.len() >= k || ef >= max_ef {
                break found;
            }
            ef = (ef * 2).min(max_ef);
        };

        results.truncate(k);
        results
    })
}
