use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Non-fatal corrections. Each one is counted and processing continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Warning {
    SymbolNotAllowed,
    MetaTags,
    UnevenSpaces,
    TrimPauses,
    TrimProsodiclinks,
    OverlapProlongation,
    MultipleSpaces,
    Accents,
    Numbers,
    Switches,
    MovedBoundaries,
    MismatchingOverlaps,
    DanglingProsodiclink,
    EmptyToken,
}

impl Warning {
    pub fn as_str(&self) -> &'static str {
        match self {
            Warning::SymbolNotAllowed => "SYMBOL_NOT_ALLOWED",
            Warning::MetaTags => "META_TAGS",
            Warning::UnevenSpaces => "UNEVEN_SPACES",
            Warning::TrimPauses => "TRIM_PAUSES",
            Warning::TrimProsodiclinks => "TRIM_PROSODICLINKS",
            Warning::OverlapProlongation => "OVERLAP_PROLONGATION",
            Warning::MultipleSpaces => "MULTIPLE_SPACES",
            Warning::Accents => "ACCENTS",
            Warning::Numbers => "NUMBERS",
            Warning::Switches => "SWITCHES",
            Warning::MovedBoundaries => "MOVED_BOUNDARIES",
            Warning::MismatchingOverlaps => "MISMATCHING_OVERLAPS",
            Warning::DanglingProsodiclink => "DANGLING_PROSODICLINK",
            Warning::EmptyToken => "EMPTY_TOKEN",
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named error flags. A raised flag disables the downstream feature it
/// concerns but never aborts the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorFlag {
    #[serde(rename = "UNBALANCED_DOTS")]
    UnbalancedDots,
    #[serde(rename = "UNBALANCED_PACE")]
    UnbalancedPace,
    #[serde(rename = "UNBALANCED_GUESS")]
    UnbalancedGuess,
    #[serde(rename = "UNBALANCED_OVERLAP")]
    UnbalancedOverlap,
    #[serde(rename = "OVERLAPS:MISSING_ANNOTATION")]
    OverlapsMissingAnnotation,
    #[serde(rename = "OVERLAPS:MISSING_TIME")]
    OverlapsMissingTime,
    #[serde(rename = "MISMATCHING_OVERLAPS")]
    MismatchingOverlaps,
    #[serde(rename = "MALFORMED_TOKEN")]
    MalformedToken,
}

impl ErrorFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorFlag::UnbalancedDots => "UNBALANCED_DOTS",
            ErrorFlag::UnbalancedPace => "UNBALANCED_PACE",
            ErrorFlag::UnbalancedGuess => "UNBALANCED_GUESS",
            ErrorFlag::UnbalancedOverlap => "UNBALANCED_OVERLAP",
            ErrorFlag::OverlapsMissingAnnotation => "OVERLAPS:MISSING_ANNOTATION",
            ErrorFlag::OverlapsMissingTime => "OVERLAPS:MISSING_TIME",
            ErrorFlag::MismatchingOverlaps => "MISMATCHING_OVERLAPS",
            ErrorFlag::MalformedToken => "MALFORMED_TOKEN",
        }
    }
}

impl fmt::Display for ErrorFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counted warnings and raised error flags of a unit or token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub warnings: BTreeMap<Warning, usize>,
    pub errors: BTreeSet<ErrorFlag>,
}

impl Diagnostics {
    /// Add `count` occurrences of a warning. Zero counts are not recorded.
    pub fn warn(&mut self, warning: Warning, count: usize) {
        if count > 0 {
            *self.warnings.entry(warning).or_default() += count;
        }
    }

    pub fn raise(&mut self, error: ErrorFlag) {
        self.errors.insert(error);
    }

    pub fn warning_count(&self, warning: Warning) -> usize {
        self.warnings.get(&warning).copied().unwrap_or(0)
    }

    pub fn has_error(&self, error: ErrorFlag) -> bool {
        self.errors.contains(&error)
    }

    pub fn total_warnings(&self) -> usize {
        self.warnings.values().sum()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }

    /// Fold another record into this one.
    pub fn merge(&mut self, other: &Diagnostics) {
        for (warning, count) in &other.warnings {
            self.warn(*warning, *count);
        }
        self.errors.extend(other.errors.iter().copied());
    }
}
