//! HNSW insertion with bidirectional links and heuristic neighbor pruning
//! (Algorithm 4 of the HNSW paper).

use std::collections::HashSet;

use super::graph::HnswGraph;
use super::search::search_layer;
use super::visited::VisitedSet;
use crate::record::Record;

impl HnswGraph {
    /// Insert a record as the next node. The caller has already checked the
    /// record's dimension and the graph's capacity.
    pub(crate) fn insert(&mut self, record: Record) -> u32 {
        let id = self.len() as u32;
        let level = self.random_level();
        if self.dimension.is_none() {
            self.dimension = Some(record.dimension());
        }

        let Some(entry_point) = self.entry_point else {
            self.push_node(record, level, vec![Vec::new(); level + 1]);
            self.entry_point = Some(id);
            self.max_layer = level;
            return id;
        };

        let query = record.values.as_slice();
        let mut visited = VisitedSet::with_capacity(self.len());
        let route_all = |_: u32| true;

        // Phase 1: greedy descent above the new node's level.
        let mut current = entry_point;
        for layer in (level + 1..=self.max_layer).rev() {
            let nearest = search_layer(
                self,
                query,
                std::slice::from_ref(&current),
                1,
                layer,
                &mut visited,
                &route_all,
            );
            if let Some(&(_, nearest)) = nearest.first() {
                current = nearest;
            }
        }

        // Phase 2: choose neighbors on every shared layer.
        let top = level.min(self.max_layer);
        let mut links: Vec<Vec<u32>> = vec![Vec::new(); level + 1];
        let mut layer_eps = vec![current];
        for layer in (0..=top).rev() {
            let candidates = search_layer(
                self,
                query,
                &layer_eps,
                self.config.ef_construction,
                layer,
                &mut visited,
                &route_all,
            );
            let chosen = select_neighbors(self, &candidates, self.m_max(layer));
            links[layer] = chosen.iter().map(|&(_, n)| n).collect();

            layer_eps.clear();
            layer_eps.extend(candidates.iter().map(|&(_, n)| n));
            if layer_eps.is_empty() {
                layer_eps.push(entry_point);
            }
        }

        self.push_node(record, level, links);

        // Phase 3: back-links, pruning neighbors that overflow.
        for layer in 0..=top {
            let m_max = self.m_max(layer);
            let mine = self.neighbors[id as usize][layer].clone();
            for n in mine {
                let n_links = &mut self.neighbors[n as usize];
                while n_links.len() <= layer {
                    n_links.push(Vec::new());
                }
                n_links[layer].push(id);
                if n_links[layer].len() <= m_max {
                    continue;
                }

                let base = self.vector(n);
                let candidates: Vec<(f32, u32)> = self.neighbors[n as usize][layer]
                    .iter()
                    .map(|&c| (self.config.distance_metric.distance(base, self.vector(c)), c))
                    .collect();
                let kept = select_neighbors(self, &candidates, m_max);
                self.neighbors[n as usize][layer] = kept.into_iter().map(|(_, c)| c).collect();
            }
        }

        if level > self.max_layer {
            self.max_layer = level;
            self.entry_point = Some(id);
        }
        id
    }
}

/// Keep a candidate only if it is closer to the base than to every neighbor
/// already kept; top up with the closest leftovers when fewer than `m` pass.
fn select_neighbors(graph: &HnswGraph, candidates: &[(f32, u32)], m: usize) -> Vec<(f32, u32)> {
    let mut sorted = candidates.to_vec();
    sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let metric = graph.config.distance_metric;
    let mut kept: Vec<(f32, u32)> = Vec::with_capacity(m);
    for &(to_base, c) in &sorted {
        if kept.len() >= m {
            break;
        }
        let c_vec = graph.vector(c);
        let diverse = kept
            .iter()
            .all(|&(_, k)| to_base <= metric.distance(c_vec, graph.vector(k)));
        if diverse {
            kept.push((to_base, c));
        }
    }

    if kept.len() < m {
        let taken: HashSet<u32> = kept.iter().map(|&(_, id)| id).collect();
        kept.extend(
            sorted
                .iter()
                .filter(|(_, id)| !taken.contains(id))
                .take(m - kept.len()),
        );
    }
    kept
}
