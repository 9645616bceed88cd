use tracing::{debug, warn};

use crate::models::{joined_ids, ErrorFlag, OverlapMatch, OverlapTime, TranscriptionUnit, Warning};

/// How the annotated overlap brackets of a unit lined up with its timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reconciliation {
    /// Same number of brackets and events (possibly none).
    Consistent,
    /// Events without brackets, all of them short or non-verbal.
    IgnoredEvents,
    /// Events without brackets.
    MissingAnnotation,
    /// Brackets without events.
    MissingTime,
    /// More events than brackets, the extra ones short or non-verbal.
    DroppedEvents,
    Mismatch,
}

/// Match the unit's overlap brackets against its clique events and record
/// the outcome on its diagnostics.
pub fn reconcile(unit: &mut TranscriptionUnit, duration_threshold: f64) -> Reconciliation {
    let n_spans = unit.overlapping_spans.len();
    let mut events: Vec<(Vec<usize>, OverlapTime)> = unit
        .overlapping_times
        .iter()
        .map(|(others, time)| (others.clone(), *time))
        .collect();
    events.sort_by(|a, b| a.1.start.total_cmp(&b.1.start));
    let n_events = events.len();

    let removable = events
        .iter()
        .filter(|(_, time)| time.is_removable(duration_threshold))
        .count();

    if n_spans == n_events {
        debug!("Overlaps are consistent for TU {}", unit.tu_id);
        match_in_order(unit, events.iter().map(|(_, time)| time.clique_id));
        return Reconciliation::Consistent;
    }

    if n_spans == 0 {
        warn!("TU {} has no annotated spans and {} time overlaps", unit.tu_id, n_events);
        record_durations(unit, &events);
        if removable == n_events {
            unit.diagnostics.warn(Warning::MismatchingOverlaps, 1);
            return Reconciliation::IgnoredEvents;
        }
        unit.diagnostics.raise(ErrorFlag::OverlapsMissingAnnotation);
        return Reconciliation::MissingAnnotation;
    }

    if n_events == 0 {
        warn!("TU {} has {} annotated spans and no time overlaps", unit.tu_id, n_spans);
        unit.diagnostics.raise(ErrorFlag::OverlapsMissingTime);
        leave_unresolved(unit);
        return Reconciliation::MissingTime;
    }

    if n_events > n_spans && removable == n_events - n_spans {
        debug!("TU {}: dropping {} short or non-verbal overlaps", unit.tu_id, removable);
        let kept: Vec<usize> = events
            .iter()
            .filter(|(_, time)| !time.is_removable(duration_threshold))
            .map(|(_, time)| time.clique_id)
            .collect();
        match_in_order(unit, kept.into_iter());
        unit.diagnostics.warn(Warning::MismatchingOverlaps, 1);
        return Reconciliation::DroppedEvents;
    }

    warn!(
        "TU {} has {} annotated spans and {} time overlaps",
        unit.tu_id, n_spans, n_events
    );
    unit.diagnostics.raise(ErrorFlag::MismatchingOverlaps);
    leave_unresolved(unit);
    record_durations(unit, &events);
    Reconciliation::Mismatch
}

fn match_in_order(unit: &mut TranscriptionUnit, clique_ids: impl Iterator<Item = usize>) {
    unit.overlapping_matches = unit
        .overlapping_spans
        .iter()
        .copied()
        .zip(clique_ids.map(OverlapMatch::Clique))
        .collect();
}

fn leave_unresolved(unit: &mut TranscriptionUnit) {
    unit.overlapping_matches = unit
        .overlapping_spans
        .iter()
        .map(|span| (*span, OverlapMatch::Unresolved))
        .collect();
}

fn record_durations(unit: &mut TranscriptionUnit, events: &[(Vec<usize>, OverlapTime)]) {
    for (others, time) in events {
        unit.overlap_durations
            .insert(joined_ids(others), time.duration());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Span;

    fn event(start: f64, end: f64, clique_id: usize, nvb: bool) -> OverlapTime {
        OverlapTime {
            start,
            end,
            clique_id,
            nvb,
        }
    }

    fn unit(annotation: &str, events: &[(Vec<usize>, OverlapTime)]) -> TranscriptionUnit {
        let mut unit = TranscriptionUnit::new(1, "A", 0.0, 10.0, 10.0, annotation);
        unit.overlapping_times = events.iter().cloned().collect();
        unit
    }

    #[test]
    fn test_consistent_matches_by_start_time() {
        let mut tu = unit(
            "[ciao] come [stai]",
            &[
                (vec![7], event(5.0, 6.0, 0, false)),
                (vec![2], event(1.0, 2.0, 3, false)),
            ],
        );
        assert_eq!(reconcile(&mut tu, 0.1), Reconciliation::Consistent);
        assert_eq!(tu.overlapping_matches[&Span::new(0, 6)], OverlapMatch::Clique(3));
        assert_eq!(tu.overlapping_matches[&Span::new(12, 18)], OverlapMatch::Clique(0));
        assert!(tu.diagnostics.is_clean());
    }

    #[test]
    fn test_missing_annotation() {
        let mut tu = unit("ciao", &[(vec![2, 3], event(1.0, 2.0, 0, false))]);
        assert_eq!(reconcile(&mut tu, 0.1), Reconciliation::MissingAnnotation);
        assert!(tu.diagnostics.has_error(ErrorFlag::OverlapsMissingAnnotation));
        assert_eq!(tu.overlap_durations["2+3"], 1.0);
    }

    #[test]
    fn test_nonverbal_events_are_ignored() {
        let mut tu = unit(
            "ciao",
            &[
                (vec![2], event(1.0, 2.0, 0, true)),
                (vec![3], event(3.0, 3.05, 1, false)),
            ],
        );
        assert_eq!(reconcile(&mut tu, 0.1), Reconciliation::IgnoredEvents);
        assert_eq!(tu.diagnostics.warning_count(Warning::MismatchingOverlaps), 1);
        assert!(tu.diagnostics.errors.is_empty());
    }

    #[test]
    fn test_missing_time() {
        let mut tu = unit("[ciao]", &[]);
        assert_eq!(reconcile(&mut tu, 0.1), Reconciliation::MissingTime);
        assert!(tu.diagnostics.has_error(ErrorFlag::OverlapsMissingTime));
        assert_eq!(tu.overlapping_matches[&Span::new(0, 6)], OverlapMatch::Unresolved);
    }

    #[test]
    fn test_extra_removable_events_are_dropped() {
        let mut tu = unit(
            "[ciao] bella",
            &[
                (vec![2], event(0.5, 0.52, 0, false)),
                (vec![3], event(1.0, 2.0, 1, false)),
            ],
        );
        assert_eq!(reconcile(&mut tu, 0.1), Reconciliation::DroppedEvents);
        assert_eq!(tu.overlapping_matches[&Span::new(0, 6)], OverlapMatch::Clique(1));
        assert_eq!(tu.diagnostics.warning_count(Warning::MismatchingOverlaps), 1);
    }

    #[test]
    fn test_extra_long_events_are_a_mismatch() {
        let mut tu = unit(
            "[ciao] bella",
            &[
                (vec![2], event(0.5, 1.5, 0, false)),
                (vec![3], event(2.0, 3.0, 1, false)),
            ],
        );
        assert_eq!(reconcile(&mut tu, 0.1), Reconciliation::Mismatch);
        assert!(tu.diagnostics.has_error(ErrorFlag::MismatchingOverlaps));
        assert_eq!(tu.overlapping_matches[&Span::new(0, 6)], OverlapMatch::Unresolved);
        assert_eq!(tu.overlap_durations["2"], 1.0);
        assert_eq!(tu.overlap_durations["3"], 1.0);
    }

    #[test]
    fn test_event_at_threshold_is_not_removable() {
        let mut tu = unit(
            "[ciao] bella",
            &[
                (vec![2], event(0.5, 1.0, 0, false)),
                (vec![3], event(2.0, 3.0, 1, false)),
            ],
        );
        assert_eq!(reconcile(&mut tu, 0.5), Reconciliation::Mismatch);

        let mut tu = unit(
            "[ciao] bella",
            &[
                (vec![2], event(0.5, 1.0, 0, false)),
                (vec![3], event(2.0, 3.0, 1, false)),
            ],
        );
        assert_eq!(reconcile(&mut tu, 0.6), Reconciliation::DroppedEvents);
        assert_eq!(tu.overlapping_matches[&Span::new(0, 6)], OverlapMatch::Clique(1));
    }

    #[test]
    fn test_more_spans_than_events() {
        let mut tu = unit(
            "[ciao] [bella]",
            &[(vec![2], event(1.0, 2.0, 0, false))],
        );
        assert_eq!(reconcile(&mut tu, 0.1), Reconciliation::Mismatch);
        assert!(tu.diagnostics.has_error(ErrorFlag::MismatchingOverlaps));
        assert!(tu
            .overlapping_matches
            .values()
            .all(|m| *m == OverlapMatch::Unresolved));
        assert!(tu.overlap_durations.contains_key("2"));
    }
}
