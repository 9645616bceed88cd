//! Transcript statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{
    ErrorFlag, Intonation, Token, TokenType, Transcript, TranscriptionUnit, Volume, Warning,
};

/// Running totals sampled at every `split_size` seconds.
///
/// Units are visited in start order. Whenever a unit ends after the next
/// boundary the running total is sampled before the unit is counted, and a
/// final sample closes the series. Values are cumulative.
pub fn cumulative_per_split<F>(units: &[&TranscriptionUnit], split_size: f64, count: F) -> Vec<f64>
where
    F: Fn(&TranscriptionUnit) -> f64,
{
    let mut samples = Vec::new();
    let mut running = 0.0;
    let mut boundary = 0;
    for unit in units {
        if unit.end > split_size * boundary as f64 {
            samples.push(running);
            boundary += 1;
        }
        running += count(unit);
    }
    samples.push(running);
    samples
}

/// Whole-transcript counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TranscriptStats {
    pub num_speakers: usize,
    pub num_tu: usize,
    pub num_included_tu: usize,
    pub tokens: BTreeMap<String, usize>,
    pub warnings: BTreeMap<String, usize>,
    pub errors: BTreeMap<String, usize>,
    pub overlap_events: usize,
    pub overlapping_spans: usize,
    pub guessing_spans: usize,
    pub low_volume_spans: usize,
    pub high_volume_spans: usize,
    pub slow_pace_spans: usize,
    pub fast_pace_spans: usize,
    pub prolongations: usize,
    /// Cumulative series sampled every minute
    pub per_minute: BTreeMap<String, Vec<f64>>,
}

fn tokens_where(unit: &TranscriptionUnit, pred: impl Fn(&Token) -> bool) -> f64 {
    unit.tokens.values().filter(|t| pred(t)).count() as f64
}

impl TranscriptStats {
    pub fn compute(transcript: &Transcript, split_size: f64) -> Self {
        let units: Vec<&TranscriptionUnit> = transcript.iter().collect();
        let mut stats = Self {
            num_speakers: transcript.speakers.len(),
            num_tu: units.len(),
            num_included_tu: units.iter().filter(|u| u.include).count(),
            overlap_events: transcript.overlap_events.len(),
            ..Default::default()
        };

        for unit in &units {
            for token in unit.tokens.values() {
                *stats.tokens.entry(token.token_type.to_string()).or_default() += 1;
                stats.prolongations += token.prolongations.len();
            }
            for (warning, count) in &unit.diagnostics.warnings {
                *stats.warnings.entry(warning.to_string()).or_default() += count;
            }
            for error in &unit.diagnostics.errors {
                *stats.errors.entry(error.to_string()).or_default() += 1;
            }
            stats.overlapping_spans += unit.overlapping_spans.len();
            stats.guessing_spans += unit.guessing_spans.len();
            stats.low_volume_spans += unit.low_volume_spans.len();
            stats.high_volume_spans += unit.high_volume_spans.len();
            stats.slow_pace_spans += unit.slow_pace_spans.len();
            stats.fast_pace_spans += unit.fast_pace_spans.len();
        }

        let series: [(&str, fn(&TranscriptionUnit) -> f64); 14] = [
            ("num_tu", |_: &TranscriptionUnit| 1.0),
            ("num_ling_tu", |u: &TranscriptionUnit| {
                if u.count_tokens(TokenType::Linguistic) > 0 { 1.0 } else { 0.0 }
            }),
            ("tus_duration", |u: &TranscriptionUnit| u.duration),
            ("tokens", |u: &TranscriptionUnit| u.tokens.len() as f64),
            ("linguistic_tokens", |u: &TranscriptionUnit| {
                u.count_tokens(TokenType::Linguistic) as f64
            }),
            ("nonverbal_tokens", |u: &TranscriptionUnit| {
                u.count_tokens(TokenType::Nonverbalbehavior) as f64
            }),
            ("shortpauses", |u: &TranscriptionUnit| u.count_tokens(TokenType::Shortpause) as f64),
            ("errors", |u: &TranscriptionUnit| u.count_tokens(TokenType::Error) as f64),
            ("unknown_tokens", |u: &TranscriptionUnit| u.count_tokens(TokenType::Unknown) as f64),
            ("intonation_patterns", |u: &TranscriptionUnit| {
                tokens_where(u, |t| t.intonation_pattern != Intonation::Plain)
            }),
            ("prolongations", |u: &TranscriptionUnit| {
                tokens_where(u, |t| !t.prolongations.is_empty())
            }),
            ("high_volume_tokens", |u: &TranscriptionUnit| {
                tokens_where(u, |t| t.volume == Some(Volume::High))
            }),
            ("low_volume_tokens", |u: &TranscriptionUnit| {
                tokens_where(u, |t| t.volume == Some(Volume::Low))
            }),
            ("overlapping_tokens", |u: &TranscriptionUnit| {
                tokens_where(u, |t| !t.overlaps.is_empty())
            }),
        ];

        for (name, count) in series {
            stats
                .per_minute
                .insert(name.to_string(), cumulative_per_split(&units, split_size, count));
        }

        let averages = |total: &str| -> Vec<f64> {
            let totals = &stats.per_minute[total];
            let tus = &stats.per_minute["num_tu"];
            totals
                .iter()
                .zip(tus)
                .map(|(&t, &n)| if n > 0.0 { t / n } else { 0.0 })
                .collect()
        };
        let avg_tokens = averages("tokens");
        let avg_duration = averages("tus_duration");
        stats.per_minute.insert("avg_tokens".to_string(), avg_tokens);
        stats.per_minute.insert("avg_duration".to_string(), avg_duration);

        stats
    }

    pub fn warning_total(&self, warning: Warning) -> usize {
        self.warnings.get(warning.as_str()).copied().unwrap_or(0)
    }

    pub fn error_total(&self, error: ErrorFlag) -> usize {
        self.errors.get(error.as_str()).copied().unwrap_or(0)
    }

    /// Human-readable summary
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Speakers: {}", self.num_speakers),
            format!("TUs: {} ({} included)", self.num_tu, self.num_included_tu),
            format!("Overlap events: {}", self.overlap_events),
            format!(
                "Spans: {} overlap, {} guess, {} low volume, {} high volume, {} slow, {} fast",
                self.overlapping_spans,
                self.guessing_spans,
                self.low_volume_spans,
                self.high_volume_spans,
                self.slow_pace_spans,
                self.fast_pace_spans
            ),
        ];
        for (token_type, count) in &self.tokens {
            lines.push(format!("Tokens {}: {}", token_type, count));
        }
        for (warning, count) in &self.warnings {
            lines.push(format!("Warning {}: {}", warning, count));
        }
        for (error, count) in &self.errors {
            lines.push(format!("Error {}: {} TUs", error, count));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{process_transcript, ProcessingConfig, UnitRow};

    #[test]
    fn test_cumulative_per_split() {
        let a = TranscriptionUnit::new(0, "A", 0.0, 30.0, 30.0, "ciao");
        let b = TranscriptionUnit::new(1, "B", 30.0, 70.0, 40.0, "ciao");
        let c = TranscriptionUnit::new(2, "A", 70.0, 80.0, 10.0, "ciao");
        let units = vec![&a, &b, &c];

        assert_eq!(cumulative_per_split(&units, 60.0, |_| 1.0), vec![0.0, 1.0, 3.0]);
        assert_eq!(
            cumulative_per_split(&units, 60.0, |u| u.duration),
            vec![0.0, 30.0, 80.0]
        );
    }

    #[test]
    fn test_compute() {
        let rows = vec![
            UnitRow::new(0, "A", 0.0, 1.0, "ciao (.) bella"),
            UnitRow::new(1, "B", 2.0, 3.0, "((ride))"),
            UnitRow::new(2, "B", 4.0, 5.0, ""),
        ];
        let transcript = process_transcript("t", &rows, &ProcessingConfig::default());
        let stats = TranscriptStats::compute(&transcript, 60.0);

        assert_eq!(stats.num_tu, 3);
        assert_eq!(stats.num_included_tu, 2);
        assert_eq!(stats.tokens["linguistic"], 2);
        assert_eq!(stats.tokens["shortpause"], 1);
        assert_eq!(stats.tokens["nonverbalbehavior"], 1);
        assert_eq!(stats.warning_total(Warning::MetaTags), 3);
        assert_eq!(stats.per_minute["tokens"], vec![0.0, 4.0]);
        assert!(stats.summary().contains("TUs: 3 (2 included)"));
    }
}
