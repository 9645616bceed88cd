use std::collections::BTreeSet;

use super::OverlapGraph;

/// Maximal cliques with at least two members, each sorted by id, ordered by
/// size and then by their smallest member.
pub fn maximal_cliques(graph: &OverlapGraph) -> Vec<Vec<usize>> {
    let mut cliques = Vec::new();
    let candidates: BTreeSet<usize> = graph.nodes().collect();
    bron_kerbosch(graph, &mut Vec::new(), candidates, BTreeSet::new(), &mut cliques);

    cliques.retain(|clique| clique.len() > 1);
    cliques.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    cliques
}

/// Bron–Kerbosch with pivoting.
fn bron_kerbosch(
    graph: &OverlapGraph,
    current: &mut Vec<usize>,
    mut candidates: BTreeSet<usize>,
    mut excluded: BTreeSet<usize>,
    cliques: &mut Vec<Vec<usize>>,
) {
    if candidates.is_empty() {
        if excluded.is_empty() {
            let mut clique = current.clone();
            clique.sort_unstable();
            cliques.push(clique);
        }
        return;
    }

    let empty = BTreeSet::new();
    let neighbors = |id: usize| graph.neighbors(id).unwrap_or(&empty);

    let pivot = candidates
        .union(&excluded)
        .copied()
        .max_by_key(|&u| neighbors(u).intersection(&candidates).count());
    let pivot_neighbors = pivot.map(neighbors).unwrap_or(&empty);

    let to_visit: Vec<usize> = candidates.difference(pivot_neighbors).copied().collect();
    for v in to_visit {
        let adjacent = neighbors(v);
        current.push(v);
        bron_kerbosch(
            graph,
            current,
            candidates.intersection(adjacent).copied().collect(),
            excluded.intersection(adjacent).copied().collect(),
            cliques,
        );
        current.pop();
        candidates.remove(&v);
        excluded.insert(v);
    }
}
