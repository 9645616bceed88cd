//! Per-transcript driver: build units, then detect and reconcile overlaps.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::models::{Transcript, TranscriptionUnit};
use crate::normalize::lexicon::DEFAULT_IGNORED_TIERS;

/// Configuration for one processing run
#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    /// Overlaps shorter than this many seconds, with no bracket in either
    /// unit, are resynced away
    pub duration_threshold: f64,
    /// Speakers (tiers) whose rows are skipped entirely
    pub tiers_to_ignore: Vec<String>,
    /// Unit id pairs removed from the overlap graph, lower id first
    pub ignore_relations: BTreeSet<(usize, usize)>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            duration_threshold: 0.1,
            tiers_to_ignore: DEFAULT_IGNORED_TIERS.iter().map(|t| t.to_string()).collect(),
            ignore_relations: BTreeSet::new(),
        }
    }
}

/// One row of a transcript table, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitRow {
    pub tu_id: usize,
    pub speaker: String,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    pub text: String,
}

impl UnitRow {
    pub fn new(tu_id: usize, speaker: &str, start: f64, end: f64, text: &str) -> Self {
        Self {
            tu_id,
            speaker: speaker.to_string(),
            start,
            end,
            duration: end - start,
            text: text.to_string(),
        }
    }
}

/// Every pair of ids within each group, lower id first.
pub fn pairwise_relations(groups: &[Vec<usize>]) -> BTreeSet<(usize, usize)> {
    let mut relations = BTreeSet::new();
    for group in groups {
        for (i, &a) in group.iter().enumerate() {
            for &b in &group[i + 1..] {
                if a != b {
                    relations.insert((a.min(b), a.max(b)));
                }
            }
        }
    }
    relations
}

/// Normalize, tokenize and reconcile the overlaps of one transcript.
///
/// The phases run in a fixed order because overlap detection needs every
/// unit, and resyncing moves unit boundaries before tokens get their
/// overlap matches:
/// 1. build and sort units
/// 2. link units overlapping in time
/// 3. tokenize every unit
/// 4. prune the graph, find overlap events and match brackets
/// 5. project span features onto tokens
pub fn process_transcript(
    tr_id: &str,
    rows: &[UnitRow],
    config: &ProcessingConfig,
) -> Transcript {
    let mut transcript = Transcript::new(tr_id);

    for row in rows {
        if config.tiers_to_ignore.iter().any(|tier| *tier == row.speaker) {
            debug!("Skipping TU {} of ignored tier {}", row.tu_id, row.speaker);
            continue;
        }
        transcript.add(TranscriptionUnit::new(
            row.tu_id,
            row.speaker.as_str(),
            row.start,
            row.end,
            row.duration,
            &row.text,
        ));
    }

    transcript.sort();
    transcript.find_overlaps();
    transcript.tokenize();
    transcript.check_overlaps(config.duration_threshold, &config.ignore_relations);
    transcript.add_token_features();
    transcript.purge_speakers();

    info!(
        "Transcript {}: {} units ({} included), {} speakers, {} overlap events",
        transcript.tr_id,
        transcript.len(),
        transcript.iter().filter(|u| u.include).count(),
        transcript.speakers.len(),
        transcript.overlap_events.len()
    );

    transcript
}
