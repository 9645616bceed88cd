use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::{OverlapTime, TranscriptionUnit, Warning};
use crate::overlaps::{self, OverlapEdge, OverlapGraph, Reconciliation};

/// Start and end of an overlap event (a clique of units).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlapEvent {
    pub start: f64,
    pub end: f64,
    pub members: usize,
}

/// All transcription units of one recording.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    pub tr_id: String,
    /// Speaker -> number of included units
    pub speakers: BTreeMap<String, usize>,
    /// Units keyed by id
    pub units: BTreeMap<usize, TranscriptionUnit>,
    /// Unit ids in ascending start time, valid after [`Transcript::sort`]
    pub order: Vec<usize>,
    /// End of the last unit, valid after [`Transcript::sort`]
    pub tot_length: f64,
    #[serde(skip)]
    pub time_based_overlaps: OverlapGraph,
    /// Clique id -> event
    pub overlap_events: BTreeMap<usize, OverlapEvent>,
}

impl Transcript {
    pub fn new(tr_id: impl Into<String>) -> Self {
        Self {
            tr_id: tr_id.into(),
            ..Default::default()
        }
    }

    /// Insert a unit. A unit with the same id is replaced, and its speaker
    /// count is taken back.
    pub fn add(&mut self, unit: TranscriptionUnit) {
        let count = self.speakers.entry(unit.speaker.clone()).or_insert(0);
        if unit.include {
            *count += 1;
        }
        if let Some(previous) = self.units.insert(unit.tu_id, unit) {
            warn!("Replacing TU {} in transcript {}", previous.tu_id, self.tr_id);
            if previous.include {
                if let Some(count) = self.speakers.get_mut(&previous.speaker) {
                    *count = count.saturating_sub(1);
                }
            }
        }
    }

    /// Order units by start time. Units starting together keep id order.
    pub fn sort(&mut self) {
        let mut order: Vec<(usize, f64)> = self.units.values().map(|u| (u.tu_id, u.start)).collect();
        order.sort_by(|a, b| a.1.total_cmp(&b.1));
        self.order = order.into_iter().map(|(id, _)| id).collect();
        self.tot_length = self
            .order
            .last()
            .and_then(|id| self.units.get(id))
            .map_or(0.0, |u| u.end);
    }

    /// Units in start order.
    pub fn iter(&self) -> impl Iterator<Item = &TranscriptionUnit> {
        self.order.iter().filter_map(|id| self.units.get(id))
    }

    pub fn get(&self, tu_id: usize) -> Option<&TranscriptionUnit> {
        self.units.get(&tu_id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Forget speakers that contributed no included unit.
    pub fn purge_speakers(&mut self) {
        self.speakers.retain(|speaker, count| {
            if *count == 0 {
                warn!("Removing speaker {} from transcript", speaker);
            }
            *count > 0
        });
    }

    pub fn tokenize(&mut self) {
        for unit in self.units.values_mut() {
            unit.tokenize();
        }
    }

    pub fn add_token_features(&mut self) {
        for unit in self.units.values_mut() {
            unit.add_token_features();
        }
    }

    /// Link every pair of included units whose time intervals intersect.
    pub fn find_overlaps(&mut self) {
        let mut graph = OverlapGraph::new();
        let included: Vec<&TranscriptionUnit> = self.units.values().filter(|u| u.include).collect();

        for (i, tu1) in included.iter().enumerate() {
            graph.add_node(tu1.tu_id);
            for tu2 in &included[i + 1..] {
                if let Some(edge) = OverlapEdge::between(tu1.start, tu1.end, tu2.start, tu2.end) {
                    graph.add_edge(tu1.tu_id, tu2.tu_id, edge);
                }
            }
        }

        debug!(
            "Transcript {}: {} units, {} time overlaps",
            self.tr_id,
            graph.node_count(),
            graph.edge_count()
        );
        self.time_based_overlaps = graph;
    }

    /// Prune the overlap graph, group the remaining overlaps into events and
    /// match them with the annotated brackets of every unit.
    pub fn check_overlaps(
        &mut self,
        duration_threshold: f64,
        relations_to_ignore: &BTreeSet<(usize, usize)>,
    ) {
        self.remove_nonverbal_overlaps();

        for &(u, v) in relations_to_ignore {
            if self.time_based_overlaps.remove_edge(u, v).is_some() {
                warn!("Removing edge {}-{} because of relations to ignore", u, v);
            }
        }
        debug!(
            "Graph after removing ignored relations: {} edges",
            self.time_based_overlaps.edge_count()
        );

        self.resync_short_overlaps(duration_threshold);
        self.collect_overlap_events();

        let mut outcomes: BTreeMap<Reconciliation, usize> = BTreeMap::new();
        for unit in self.units.values_mut() {
            *outcomes.entry(overlaps::reconcile(unit, duration_threshold)).or_default() += 1;
        }
        debug!("Transcript {} reconciliation: {:?}", self.tr_id, outcomes);
    }

    fn remove_nonverbal_overlaps(&mut self) {
        let nonverbal = |id: usize| self.units.get(&id).is_some_and(|u| u.is_nonverbal_only());
        let to_remove: Vec<(usize, usize)> = self
            .time_based_overlaps
            .edges()
            .filter(|&(u, v, _)| nonverbal(u) || nonverbal(v))
            .map(|(u, v, _)| (u, v))
            .collect();

        for (u, v) in to_remove {
            warn!("Removing edge {}-{} because of non-verbal behaviour", u, v);
            self.time_based_overlaps.remove_edge(u, v);
        }
    }

    /// Short overlaps nobody bracketed are clock noise: split the overlap
    /// between the two units and drop the edge.
    fn resync_short_overlaps(&mut self, duration_threshold: f64) {
        let candidates: Vec<(usize, usize, f64)> = self
            .time_based_overlaps
            .edges()
            .filter(|(_, _, edge)| edge.duration < duration_threshold)
            .map(|(u, v, edge)| (u, v, edge.duration))
            .collect();

        for (u, v, duration) in candidates {
            let annotated = [u, v]
                .iter()
                .filter_map(|id| self.units.get(id))
                .map(|unit| unit.overlapping_spans.len())
                .sum::<usize>();
            if annotated > 0 {
                continue;
            }

            let (earlier_id, later_id) = match (self.units.get(&u), self.units.get(&v)) {
                (Some(a), Some(b)) if (b.start, v) < (a.start, u) => (v, u),
                _ => (u, v),
            };

            if let Some(earlier) = self.units.get_mut(&earlier_id) {
                earlier.end -= duration / 2.0;
                earlier.diagnostics.warn(Warning::MovedBoundaries, 1);
                if earlier.end <= earlier.start {
                    error!(
                        "TU {} has end <= start, {:.2}, {:.2}",
                        earlier_id, earlier.end, earlier.start
                    );
                }
            }
            if let Some(later) = self.units.get_mut(&later_id) {
                later.start += duration / 2.0;
                later.diagnostics.warn(Warning::MovedBoundaries, 1);
                if later.end <= later.start {
                    error!(
                        "TU {} has end <= start, {:.2}, {:.2}",
                        later_id, later.end, later.start
                    );
                }
            }

            warn!(
                "Removing edge {}-{} because overlap is {:.2} and no span is annotated",
                u, v, duration
            );
            self.time_based_overlaps.remove_edge(u, v);
        }
    }

    fn collect_overlap_events(&mut self) {
        let cliques = overlaps::maximal_cliques(&self.time_based_overlaps);
        info!("Transcript {}: found {} overlap events", self.tr_id, cliques.len());

        self.overlap_events.clear();
        for unit in self.units.values_mut() {
            unit.overlapping_times.clear();
        }

        for (clique_id, clique) in cliques.iter().enumerate() {
            let members: Vec<&TranscriptionUnit> =
                clique.iter().filter_map(|id| self.units.get(id)).collect();
            let start = members.iter().map(|u| u.start).fold(f64::NEG_INFINITY, f64::max);
            let end = members.iter().map(|u| u.end).fold(f64::INFINITY, f64::min);
            let nvb = members.iter().any(|u| u.has_nonverbal());

            self.overlap_events.insert(
                clique_id,
                OverlapEvent {
                    start,
                    end,
                    members: clique.len(),
                },
            );

            for &id in clique {
                let others: Vec<usize> = clique.iter().copied().filter(|&x| x != id).collect();
                if let Some(unit) = self.units.get_mut(&id) {
                    unit.overlapping_times.insert(
                        others,
                        OverlapTime {
                            start,
                            end,
                            clique_id,
                            nvb,
                        },
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorFlag, OverlapMatch};

    fn transcript(rows: &[(usize, &str, f64, f64, &str)]) -> Transcript {
        let mut transcript = Transcript::new("test");
        for &(id, speaker, start, end, text) in rows {
            transcript.add(TranscriptionUnit::new(id, speaker, start, end, end - start, text));
        }
        transcript.sort();
        transcript.find_overlaps();
        transcript.tokenize();
        transcript
    }

    #[test]
    fn test_sort_and_speakers() {
        let mut tr = transcript(&[
            (0, "A", 2.0, 3.0, "ciao"),
            (1, "B", 0.0, 1.0, "ehi"),
            (2, "C", 4.0, 5.0, ""),
        ]);
        assert_eq!(tr.order, vec![1, 0, 2]);
        assert_eq!(tr.tot_length, 5.0);
        assert_eq!(tr.speakers["C"], 0);

        tr.purge_speakers();
        assert!(!tr.speakers.contains_key("C"));
        assert_eq!(tr.speakers.len(), 2);
    }

    #[test]
    fn test_duplicate_id_replaces_speaker_count() {
        let mut tr = Transcript::new("test");
        tr.add(TranscriptionUnit::new(0, "A", 0.0, 1.0, 1.0, "ciao"));
        tr.add(TranscriptionUnit::new(0, "B", 0.0, 1.0, 1.0, "sì"));
        tr.add(TranscriptionUnit::new(1, "B", 1.0, 2.0, 1.0, "no"));

        assert_eq!(tr.len(), 2);
        assert_eq!(tr.speakers["A"], 0);
        assert_eq!(tr.speakers["B"], 2);

        tr.purge_speakers();
        assert!(!tr.speakers.contains_key("A"));
    }

    #[test]
    fn test_find_overlaps_skips_excluded() {
        let tr = transcript(&[
            (0, "A", 0.0, 2.0, "ciao"),
            (1, "B", 1.0, 3.0, "[ ]"),
            (2, "C", 1.5, 3.0, "sì"),
        ]);
        assert!(tr.time_based_overlaps.has_edge(0, 2));
        assert!(!tr.time_based_overlaps.has_edge(0, 1));
        assert_eq!(tr.time_based_overlaps.edge_count(), 1);
    }

    #[test]
    fn test_nonverbal_edges_removed() {
        let mut tr = transcript(&[(0, "A", 0.0, 2.0, "ciao"), (1, "B", 1.0, 3.0, "((ride))")]);
        tr.check_overlaps(0.1, &BTreeSet::new());
        assert_eq!(tr.time_based_overlaps.edge_count(), 0);
        assert!(tr.overlap_events.is_empty());
    }

    #[test]
    fn test_ignored_relations() {
        let mut tr = transcript(&[(0, "A", 0.0, 2.0, "[ciao]"), (1, "B", 1.0, 3.0, "[sì]")]);
        tr.check_overlaps(0.1, &BTreeSet::from([(0, 1)]));
        assert!(tr.overlap_events.is_empty());
        assert!(tr.units[&0].diagnostics.has_error(ErrorFlag::OverlapsMissingTime));
    }

    #[test]
    fn test_resync_follows_time_order_not_ids() {
        let mut tr = transcript(&[(5, "A", 0.0, 1.0, "ciao"), (2, "B", 0.98, 2.0, "sì")]);
        tr.check_overlaps(0.05, &BTreeSet::new());

        let earlier = &tr.units[&5];
        let later = &tr.units[&2];
        assert_eq!(earlier.start, 0.0);
        assert!((earlier.end - 0.99).abs() < 1e-9);
        assert!((later.start - 0.99).abs() < 1e-9);
        assert_eq!(later.end, 2.0);
        assert!(earlier.end <= later.start);
        assert_eq!(tr.time_based_overlaps.edge_count(), 0);
    }

    #[test]
    fn test_overlap_at_threshold_is_kept() {
        let mut tr = transcript(&[(0, "A", 0.0, 1.0, "ciao"), (1, "B", 0.5, 2.0, "sì")]);
        tr.check_overlaps(0.5, &BTreeSet::new());

        assert!(tr.time_based_overlaps.has_edge(0, 1));
        assert_eq!(tr.overlap_events.len(), 1);
        for unit in tr.units.values() {
            assert_eq!(unit.diagnostics.warning_count(Warning::MovedBoundaries), 0);
            assert!(unit.diagnostics.has_error(ErrorFlag::OverlapsMissingAnnotation));
        }
        assert_eq!(tr.units[&0].end, 1.0);
        assert_eq!(tr.units[&1].start, 0.5);
    }

    #[test]
    fn test_short_bracketed_overlap_is_kept() {
        let mut tr = transcript(&[
            (0, "A", 0.0, 1.0, "ciao [bella]"),
            (1, "B", 0.98, 2.0, "[sì] no"),
        ]);
        tr.check_overlaps(0.05, &BTreeSet::new());

        assert!(tr.time_based_overlaps.has_edge(0, 1));
        assert_eq!(tr.overlap_events.len(), 1);
        assert_eq!(tr.units[&0].end, 1.0);
        assert_eq!(tr.units[&1].start, 0.98);
        for unit in tr.units.values() {
            assert_eq!(unit.diagnostics.warning_count(Warning::MovedBoundaries), 0);
            assert_eq!(
                unit.overlapping_matches.values().copied().collect::<Vec<_>>(),
                vec![OverlapMatch::Clique(0)]
            );
        }
    }

    #[test]
    fn test_three_way_clique() {
        let mut tr = transcript(&[
            (0, "A", 0.0, 2.0, "ciao [come] stai"),
            (1, "B", 1.0, 3.0, "[bene]"),
            (2, "C", 1.5, 3.0, "[e tu]"),
        ]);
        tr.check_overlaps(0.1, &BTreeSet::new());

        assert_eq!(tr.overlap_events.len(), 1);
        let event = tr.overlap_events[&0];
        assert_eq!((event.start, event.end, event.members), (1.5, 2.0, 3));

        let first = &tr.units[&0];
        assert_eq!(first.overlapping_times.keys().next(), Some(&vec![1, 2]));
        assert_eq!(first.overlapping_matches.values().next(), Some(&OverlapMatch::Clique(0)));
    }
}
