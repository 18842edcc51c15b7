//! Site visit ordering.
//!
//! The stage moves all axes at once, so travel time between two sites is the
//! Chebyshev distance. Ordering is a greedy nearest-neighbour tour from the
//! first site, kept only if it beats the order the user gave.

use stage_common::consts::NUM_AXES;
use stage_common::site::SiteId;
use std::collections::HashSet;
use tracing::debug;

/// Relative slack when comparing tour costs; rounding never beats the
/// user's order.
const COST_EPSILON: f64 = 1e-12;

/// Largest per-axis distance between two points.
pub fn chebyshev(a: &[f64; NUM_AXES], b: &[f64; NUM_AXES]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(p, q)| (p - q).abs())
        .fold(0.0, f64::max)
}

/// Cost of visiting `points` in order and returning to the first.
pub fn tour_cost(points: &[[f64; NUM_AXES]]) -> f64 {
    match points {
        [] | [_] => 0.0,
        [first, .., last] => {
            let open: f64 = points.windows(2).map(|w| chebyshev(&w[0], &w[1])).sum();
            open + chebyshev(last, first)
        }
    }
}

/// Visit order for `sites`.
///
/// Duplicate IDs are dropped (first occurrence wins). The nearest-neighbour
/// tour starts at the first site and breaks distance ties by input order.
/// It is returned only when strictly cheaper than the input order.
pub fn optimized_order(sites: &[(SiteId, [f64; NUM_AXES])]) -> Vec<SiteId> {
    let mut seen = HashSet::with_capacity(sites.len());
    let sites: Vec<(SiteId, [f64; NUM_AXES])> = sites
        .iter()
        .copied()
        .filter(|(id, _)| seen.insert(*id))
        .collect();
    if sites.len() <= 1 {
        return sites.into_iter().map(|(id, _)| id).collect();
    }

    let mut visited = vec![false; sites.len()];
    let mut order = Vec::with_capacity(sites.len());
    let mut current = 0;
    let mut nn_cost = 0.0;
    visited[0] = true;
    order.push(0);

    while order.len() < sites.len() {
        let mut best: Option<(usize, f64)> = None;
        for (i, (_, position)) in sites.iter().enumerate() {
            if visited[i] {
                continue;
            }
            let d = chebyshev(&sites[current].1, position);
            if best.is_none_or(|(_, best_d)| d < best_d) {
                best = Some((i, d));
            }
        }
        let Some((next, d)) = best else { break };
        visited[next] = true;
        order.push(next);
        nn_cost += d;
        current = next;
    }
    nn_cost += chebyshev(&sites[current].1, &sites[0].1);

    let given: Vec<[f64; NUM_AXES]> = sites.iter().map(|(_, p)| *p).collect();
    let given_cost = tour_cost(&given);
    debug!(
        "Route over {} sites: nearest-neighbour {:.3}, given {:.3}",
        sites.len(),
        nn_cost,
        given_cost
    );

    if nn_cost < given_cost * (1.0 - COST_EPSILON) {
        order.into_iter().map(|i| sites[i].0).collect()
    } else {
        sites.into_iter().map(|(id, _)| id).collect()
    }
}
