use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::pipeline::{pairwise_relations, UnitRow};

/// Row-level failures while reading a transcript table
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("empty transcript table")]
    Empty,

    #[error("missing column '{0}' in header")]
    MissingColumn(&'static str),

    #[error("line {line}: expected {expected} fields, found {found}")]
    ShortRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: invalid TU id '{value}'")]
    BadId { line: usize, value: String },

    #[error("line {line}: invalid {column} '{value}'")]
    BadNumber {
        line: usize,
        column: &'static str,
        value: String,
    },

    #[error("ignore group {group}: invalid TU id '{value}'")]
    BadIgnoreId { group: usize, value: String },
}

/// Column positions found in the header
struct Columns {
    tu_id: usize,
    speaker: usize,
    start: usize,
    end: usize,
    duration: Option<usize>,
    text: usize,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self, InputError> {
        let names: Vec<&str> = header.split('\t').map(str::trim).collect();
        let find = |name: &'static str| {
            names
                .iter()
                .position(|n| *n == name)
                .ok_or(InputError::MissingColumn(name))
        };
        Ok(Self {
            tu_id: find("tu_id")?,
            speaker: find("speaker")?,
            start: find("start")?,
            end: find("end")?,
            duration: find("duration").ok(),
            text: find("text")?,
        })
    }

    fn width(&self) -> usize {
        [self.tu_id, self.speaker, self.start, self.end, self.text]
            .into_iter()
            .chain(self.duration)
            .max()
            .map_or(0, |m| m + 1)
    }
}

fn parse_seconds(value: &str, line: usize, column: &'static str) -> Result<f64, InputError> {
    value.trim().parse().map_err(|_| InputError::BadNumber {
        line,
        column,
        value: value.to_string(),
    })
}

/// Parse a tab-separated transcript table with a header row. Required
/// columns: `tu_id`, `speaker`, `start`, `end`, `text`; `duration` defaults
/// to `end - start` when absent.
pub fn parse_transcript_tsv(content: &str) -> Result<Vec<UnitRow>, InputError> {
    let mut lines = content.lines().enumerate();
    let (_, header) = lines.next().ok_or(InputError::Empty)?;
    let columns = Columns::from_header(header)?;
    let width = columns.width();

    let mut rows = Vec::new();
    for (idx, raw) in lines {
        let line = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = raw.split('\t').collect();
        if fields.len() < width {
            return Err(InputError::ShortRow {
                line,
                expected: width,
                found: fields.len(),
            });
        }

        let tu_id = fields[columns.tu_id]
            .trim()
            .parse()
            .map_err(|_| InputError::BadId {
                line,
                value: fields[columns.tu_id].to_string(),
            })?;
        let start = parse_seconds(fields[columns.start], line, "start")?;
        let end = parse_seconds(fields[columns.end], line, "end")?;
        let duration = match columns.duration {
            Some(col) => parse_seconds(fields[col], line, "duration")?,
            None => end - start,
        };

        rows.push(UnitRow {
            tu_id,
            speaker: fields[columns.speaker].trim().to_string(),
            start,
            end,
            duration,
            text: fields[columns.text].to_string(),
        });
    }

    Ok(rows)
}

/// Read a transcript table from disk
pub fn read_transcript_file(path: &Path) -> Result<Vec<UnitRow>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    parse_transcript_tsv(&content).with_context(|| format!("Failed to parse transcript: {:?}", path))
}

/// Manual overlap corrections for one transcript
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IgnoreAnnotations {
    /// Each entry lists space-separated TU ids that must not be linked
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl IgnoreAnnotations {
    /// Every pair of ids within each entry
    pub fn relations(&self) -> Result<BTreeSet<(usize, usize)>, InputError> {
        let mut groups = Vec::with_capacity(self.ignore.len());
        for (group, entry) in self.ignore.iter().enumerate() {
            let ids = entry
                .split_whitespace()
                .map(|value| {
                    value.parse::<usize>().map_err(|_| InputError::BadIgnoreId {
                        group,
                        value: value.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            groups.push(ids);
        }
        Ok(pairwise_relations(&groups))
    }
}

/// Parse an ignore-annotation JSON document
pub fn parse_ignore_json(json: &str) -> Result<IgnoreAnnotations> {
    serde_json::from_str(json).context("Failed to parse ignore annotations JSON")
}

/// Read an ignore-annotation file and expand it into id pairs
pub fn read_ignore_file(path: &Path) -> Result<BTreeSet<(usize, usize)>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    let annotations = parse_ignore_json(&content)?;
    annotations
        .relations()
        .with_context(|| format!("Invalid ignore annotations in {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transcript_tsv() {
        let content = "tu_id\tspeaker\tstart\tend\tduration\ttext\n\
                       0\tA\t0.0\t1.0\t1.0\tciao (.) bella\n\
                       \n\
                       1\tB\t0.9\t2.0\t1.1\t[ciao] a te\n";

        let rows = parse_transcript_tsv(content).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].tu_id, 0);
        assert_eq!(rows[0].text, "ciao (.) bella");
        assert_eq!(rows[1].speaker, "B");
        assert_eq!(rows[1].duration, 1.1);
    }

    #[test]
    fn test_duration_defaults_to_interval() {
        let content = "text\tend\tstart\tspeaker\ttu_id\nsì\t3.5\t1.5\tA\t4\n";
        let rows = parse_transcript_tsv(content).unwrap();
        assert_eq!(rows[0].tu_id, 4);
        assert_eq!(rows[0].duration, 2.0);
    }

    #[test]
    fn test_row_errors() {
        assert_eq!(parse_transcript_tsv(""), Err(InputError::Empty));
        assert_eq!(
            parse_transcript_tsv("tu_id\tspeaker\tstart\tend\n"),
            Err(InputError::MissingColumn("text"))
        );

        let header = "tu_id\tspeaker\tstart\tend\ttext\n";
        assert_eq!(
            parse_transcript_tsv(&format!("{header}x\tA\t0\t1\tciao\n")),
            Err(InputError::BadId {
                line: 2,
                value: "x".to_string()
            })
        );
        assert_eq!(
            parse_transcript_tsv(&format!("{header}0\tA\tzero\t1\tciao\n")),
            Err(InputError::BadNumber {
                line: 2,
                column: "start",
                value: "zero".to_string()
            })
        );
        assert_eq!(
            parse_transcript_tsv(&format!("{header}0\tA\t0\n")),
            Err(InputError::ShortRow {
                line: 2,
                expected: 5,
                found: 3
            })
        );
    }

    #[test]
    fn test_ignore_annotations() {
        let annotations = parse_ignore_json(r#"{"ignore": ["1 2 3", "7 8"]}"#).unwrap();
        let relations = annotations.relations().unwrap();
        assert_eq!(
            relations,
            BTreeSet::from([(1, 2), (1, 3), (2, 3), (7, 8)])
        );

        let bad = parse_ignore_json(r#"{"ignore": ["1 b"]}"#).unwrap();
        assert!(bad.relations().is_err());

        let empty = parse_ignore_json("{}").unwrap();
        assert!(empty.relations().unwrap().is_empty());
    }
}
