use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// Intersection of the time intervals of two units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlapEdge {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

impl OverlapEdge {
    /// `None` unless `[start_a, end_a)` and `[start_b, end_b)` intersect.
    pub fn between(start_a: f64, end_a: f64, start_b: f64, end_b: f64) -> Option<Self> {
        if end_a > start_b && end_b > start_a {
            let start = start_a.max(start_b);
            let end = end_a.min(end_b);
            Some(Self {
                start,
                end,
                duration: end - start,
            })
        } else {
            None
        }
    }
}

/// Undirected graph of time overlaps, nodes keyed by unit id.
#[derive(Debug, Clone, Default)]
pub struct OverlapGraph {
    adjacency: BTreeMap<usize, BTreeSet<usize>>,
    edges: BTreeMap<(usize, usize), OverlapEdge>,
}

fn key(u: usize, v: usize) -> (usize, usize) {
    if u <= v { (u, v) } else { (v, u) }
}

impl OverlapGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: usize) {
        self.adjacency.entry(id).or_default();
    }

    pub fn add_edge(&mut self, u: usize, v: usize, edge: OverlapEdge) {
        self.adjacency.entry(u).or_default().insert(v);
        self.adjacency.entry(v).or_default().insert(u);
        self.edges.insert(key(u, v), edge);
    }

    /// Returns the removed edge, if there was one.
    pub fn remove_edge(&mut self, u: usize, v: usize) -> Option<OverlapEdge> {
        let removed = self.edges.remove(&key(u, v))?;
        if let Some(neighbors) = self.adjacency.get_mut(&u) {
            neighbors.remove(&v);
        }
        if let Some(neighbors) = self.adjacency.get_mut(&v) {
            neighbors.remove(&u);
        }
        Some(removed)
    }

    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.edges.contains_key(&key(u, v))
    }

    pub fn edge(&self, u: usize, v: usize) -> Option<&OverlapEdge> {
        self.edges.get(&key(u, v))
    }

    /// Edges as `(lower id, higher id, edge)` in id order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, &OverlapEdge)> {
        self.edges.iter().map(|(&(u, v), edge)| (u, v, edge))
    }

    pub fn nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.adjacency.keys().copied()
    }

    pub fn neighbors(&self, id: usize) -> Option<&BTreeSet<usize>> {
        self.adjacency.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
