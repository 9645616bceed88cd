use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::{
    ErrorFlag, Intonation, Span, Token, TokenType, Transcript, TranscriptionUnit, Warning,
};

/// Columns of the vertical, one-token-per-row format
pub const CONLL_FIELDNAMES: [&str; 12] = [
    "token_id",
    "speaker",
    "tu_id",
    "form",
    "type",
    "jefferson_feats",
    "span",
    "align",
    "prolongations",
    "pace",
    "guesses",
    "overlaps",
];

/// Columns of the one-unit-per-row format
pub const LINEAR_FIELDNAMES: [&str; 27] = [
    "tu_id",
    "speaker",
    "start",
    "end",
    "duration",
    "include",
    "W:normalized_spaces",
    "W:numbers",
    "W:accents",
    "W:non_jefferson",
    "W:pauses_trim",
    "W:prosodic_trim",
    "W:moved_boundaries",
    "W:switches",
    "E:volume",
    "E:pace",
    "E:guess",
    "E:overlap",
    "E:overlap_mismatch",
    "E:overlap_duration",
    "T:shortpauses",
    "T:metalinguistic",
    "T:errors",
    "T:linguistic",
    "annotation",
    "correct",
    "text",
];

const EMPTY: &str = "_";

fn or_empty(value: String) -> String {
    if value.is_empty() { EMPTY.to_string() } else { value }
}

/// `Key=Value` features joined with `|`
pub fn jefferson_feats(token: &Token) -> String {
    let mut feats = Vec::new();
    if token.intonation_pattern != Intonation::Plain {
        feats.push(format!("Intonation={}", token.intonation_pattern));
    }
    if token.interruption {
        feats.push("Interrupted=Yes".to_string());
    }
    if token.truncation {
        feats.push("Truncated=Yes".to_string());
    }
    if token.prosodiclink {
        feats.push("ProsodicLink=Yes".to_string());
    }
    if !token.spaceafter {
        feats.push("SpaceAfter=No".to_string());
    }
    if token.non_ita {
        feats.push(format!("Lang={}", token.iso_code));
    }
    if let Some(volume) = token.volume {
        feats.push(format!("Volume={}", volume));
    }
    or_empty(feats.join("|"))
}

/// `start-end(id)` items joined with `,`
fn ranges<K: std::fmt::Display>(map: &BTreeMap<K, Span>) -> String {
    map.iter()
        .map(|(id, span)| format!("{}({})", span, id))
        .collect::<Vec<_>>()
        .join(",")
}

fn pace(token: &Token) -> String {
    let mut parts = Vec::new();
    if !token.slow_pace.is_empty() {
        parts.push(format!("Slow={}", ranges(&token.slow_pace)));
    }
    if !token.fast_pace.is_empty() {
        parts.push(format!("Fast={}", ranges(&token.fast_pace)));
    }
    or_empty(parts.join("|"))
}

fn align(unit: &TranscriptionUnit, token: &Token) -> String {
    let mut parts = Vec::new();
    if token.position_in_tu.is_start() {
        parts.push(format!("Begin={}", unit.start));
    }
    if token.position_in_tu.is_end() {
        parts.push(format!("End={}", unit.end));
    }
    or_empty(parts.join("|"))
}

fn annotation_slice(annotation: &str, span: Span) -> String {
    annotation
        .chars()
        .skip(span.start)
        .take(span.len())
        .collect()
}

/// One row per token, in unit start order
pub fn conll_rows(transcript: &Transcript) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for unit in transcript.iter() {
        for token in unit.tokens.values() {
            let prolongations = token
                .prolongations
                .iter()
                .map(|(offset, length)| format!("{}x{}", offset, length))
                .collect::<Vec<_>>()
                .join(",");

            rows.push(vec![
                token.id.clone(),
                unit.speaker.clone(),
                unit.tu_id.to_string(),
                or_empty(token.text.clone()),
                token.token_type.to_string(),
                jefferson_feats(token),
                or_empty(annotation_slice(&unit.annotation, token.span)),
                align(unit, token),
                or_empty(prolongations),
                pace(token),
                or_empty(ranges(&token.guesses)),
                or_empty(ranges(&token.overlaps)),
            ]);
        }
    }
    rows
}

/// One row per unit, in unit start order
pub fn linear_rows(transcript: &Transcript) -> Vec<Vec<String>> {
    transcript
        .iter()
        .map(|unit| {
            let d = &unit.diagnostics;
            let warning = |w: Warning| d.warning_count(w).to_string();
            let error = |e: ErrorFlag| d.has_error(e).to_string();

            let overlap_durations = unit
                .overlap_durations
                .iter()
                .map(|(ids, duration)| format!("{}={:.3}", ids, duration))
                .collect::<Vec<_>>()
                .join(",");

            let error_tokens: Vec<&str> = unit
                .tokens
                .values()
                .filter(|t| t.token_type == TokenType::Error)
                .map(|t| t.text.as_str())
                .collect();
            let mut errors = error_tokens.len().to_string();
            if !error_tokens.is_empty() {
                errors.push_str(&format!(", {}", error_tokens.join(" ")));
            }

            vec![
                unit.tu_id.to_string(),
                unit.speaker.clone(),
                unit.start.to_string(),
                unit.end.to_string(),
                unit.duration.to_string(),
                unit.include.to_string(),
                warning(Warning::UnevenSpaces),
                warning(Warning::Numbers),
                warning(Warning::Accents),
                warning(Warning::SymbolNotAllowed),
                warning(Warning::TrimPauses),
                warning(Warning::TrimProsodiclinks),
                warning(Warning::MovedBoundaries),
                warning(Warning::Switches),
                error(ErrorFlag::UnbalancedDots),
                error(ErrorFlag::UnbalancedPace),
                error(ErrorFlag::UnbalancedGuess),
                error(ErrorFlag::UnbalancedOverlap),
                error(ErrorFlag::MismatchingOverlaps),
                or_empty(overlap_durations),
                unit.count_tokens(TokenType::Shortpause).to_string(),
                unit.count_tokens(TokenType::Nonverbalbehavior).to_string(),
                errors,
                unit.count_tokens(TokenType::Linguistic).to_string(),
                unit.orig_annotation.clone(),
                unit.annotation.clone(),
                unit.tokens
                    .values()
                    .map(|t| t.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
            ]
        })
        .collect()
}

fn format_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut output = header.join("\t");
    output.push('\n');
    for row in rows {
        output.push_str(&row.join("\t"));
        output.push('\n');
    }
    output
}

/// Vertical token table as text
pub fn format_conll(transcript: &Transcript) -> String {
    format_table(&CONLL_FIELDNAMES, &conll_rows(transcript))
}

/// Per-unit table as text
pub fn format_linear(transcript: &Transcript) -> String {
    format_table(&LINEAR_FIELDNAMES, &linear_rows(transcript))
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {:?}", path))?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("Failed to write file: {:?}", path))?;
    Ok(())
}

pub fn write_conll(transcript: &Transcript, path: &Path) -> Result<()> {
    write_text(path, &format_conll(transcript))
}

pub fn write_linear(transcript: &Transcript, path: &Path) -> Result<()> {
    write_text(path, &format_linear(transcript))
}

/// Summary stored next to the full transcript dump
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptMetadata {
    pub total_units: usize,
    pub included_units: usize,
    pub total_tokens: usize,
    pub overlap_events: usize,
    pub duration_threshold: f64,
}

impl TranscriptMetadata {
    pub fn from_transcript(transcript: &Transcript, duration_threshold: f64) -> Self {
        Self {
            total_units: transcript.len(),
            included_units: transcript.iter().filter(|u| u.include).count(),
            total_tokens: transcript.iter().map(|u| u.tokens.len()).sum(),
            overlap_events: transcript.overlap_events.len(),
            duration_threshold,
        }
    }
}

/// Machine-readable dump of a processed transcript
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptDocument<'a> {
    pub transcript: &'a Transcript,
    pub metadata: TranscriptMetadata,
}

impl<'a> TranscriptDocument<'a> {
    pub fn new(transcript: &'a Transcript, duration_threshold: f64) -> Self {
        Self {
            transcript,
            metadata: TranscriptMetadata::from_transcript(transcript, duration_threshold),
        }
    }

    /// Write to a JSON file
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        serde_json::to_writer_pretty(file, self).context("Failed to write JSON")?;
        Ok(())
    }
}
