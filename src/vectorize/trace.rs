//! Boundary tracing along cell edges
//!
//! Every cell side between a region cell and a non-region cell becomes a
//! directed unit edge with the region on its right (grid rows grow
//! downwards). Edges are chained into closed rings. Where two region cells
//! touch only at a corner, the connectivity rule picks the turn: 8-connected
//! regions join across the corner, 4-connected regions keep apart.

use std::collections::HashMap;
use log::warn;

use super::label::RegionLabels;
use super::Connectivity;

/// Grid corner (col, row)
pub type Vertex = (i64, i64);

/// Closed ring of grid corners, first vertex not repeated
pub type Ring = Vec<Vertex>;

#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Vertex,
    to: Vertex,
}

impl Edge {
    fn direction(&self) -> (i64, i64) {
        (self.to.0 - self.from.0, self.to.1 - self.from.1)
    }
}

/// Boundary edges of one region
fn region_edges(cells: &[usize], labels: &RegionLabels, label: u32) -> Vec<Edge> {
    let mut edges = Vec::with_capacity(cells.len() * 2);
    let inside = |c: i64, r: i64| labels.label_at(c as isize, r as isize) == label;

    for &idx in cells {
        let (c, r) = ((idx % labels.width) as i64, (idx / labels.width) as i64);
        if !inside(c, r - 1) {
            edges.push(Edge { from: (c, r), to: (c + 1, r) });
        }
        if !inside(c + 1, r) {
            edges.push(Edge { from: (c + 1, r), to: (c + 1, r + 1) });
        }
        if !inside(c, r + 1) {
            edges.push(Edge { from: (c + 1, r + 1), to: (c, r + 1) });
        }
        if !inside(c - 1, r) {
            edges.push(Edge { from: (c, r + 1), to: (c, r) });
        }
    }

    edges
}

/// z of the cross product of the incoming and outgoing directions;
/// negative is a left turn on screen
fn turn(incoming: (i64, i64), outgoing: (i64, i64)) -> i64 {
    incoming.0 * outgoing.1 - incoming.1 * outgoing.0
}

/// Traces the boundary rings of one region
///
/// # Returns
/// Rings with collinear vertices removed. Exterior rings have positive
/// grid area (see `signed_area2`), holes negative.
pub fn trace_region(cells: &[usize], labels: &RegionLabels, label: u32, connectivity: Connectivity) -> Vec<Ring> {
    let edges = region_edges(cells, labels, label);

    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::with_capacity(edges.len());
    for (i, edge) in edges.iter().enumerate() {
        outgoing.entry(edge.from).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for first in 0..edges.len() {
        if used[first] {
            continue;
        }
        used[first] = true;

        let mut ring = vec![edges[first].from];
        let mut current = first;

        loop {
            let at = edges[current].to;
            let mut candidates: Vec<usize> = outgoing
                .get(&at)
                .map(|list| list.iter().copied().filter(|&e| !used[e]).collect())
                .unwrap_or_default();
            if at == edges[first].from {
                candidates.push(first);
            }

            let incoming = edges[current].direction();
            let next = match connectivity {
                Connectivity::Four => candidates.iter().copied().max_by_key(|&e| turn(incoming, edges[e].direction())),
                Connectivity::Eight => candidates.iter().copied().min_by_key(|&e| turn(incoming, edges[e].direction())),
            };

            match next {
                Some(e) if e == first => break,
                Some(e) => {
                    used[e] = true;
                    ring.push(at);
                    current = e;
                },
                None => {
                    warn!("Open boundary at vertex {:?} of region {}", at, label);
                    break;
                }
            }
        }

        rings.push(simplify(ring));
    }

    rings
}

/// Drops vertices where the boundary runs straight on
pub fn simplify(ring: Ring) -> Ring {
    let n = ring.len();
    if n < 4 {
        return ring;
    }

    (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let v = ring[i];
            let next = ring[(i + 1) % n];
            let a = ((v.0 - prev.0).signum(), (v.1 - prev.1).signum());
            let b = ((next.0 - v.0).signum(), (next.1 - v.1).signum());
            a != b
        })
        .map(|i| ring[i])
        .collect()
}

/// Twice the shoelace area in grid units
pub fn signed_area2(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            a.0 * b.1 - b.0 * a.1
        })
        .sum()
}
