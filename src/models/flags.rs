use std::fmt;

use serde::{Deserialize, Serialize};

/// Shape class of a token. Only linguistic tokens carry prosodic features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    #[default]
    Linguistic,
    Shortpause,
    Nonverbalbehavior,
    Error,
    Unknown,
    Anonymized,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Linguistic => "linguistic",
            TokenType::Shortpause => "shortpause",
            TokenType::Nonverbalbehavior => "nonverbalbehavior",
            TokenType::Error => "error",
            TokenType::Unknown => "unknown",
            TokenType::Anonymized => "anonymized",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal intonation contour, read from the final `.`, `,` or `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intonation {
    #[default]
    Plain,
    Falling,
    WeaklyRising,
    Rising,
}

impl Intonation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intonation::Plain => "plain",
            Intonation::Falling => "falling",
            Intonation::WeaklyRising => "weakly_rising",
            Intonation::Rising => "rising",
        }
    }
}

impl fmt::Display for Intonation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Volume {
    High,
    Low,
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Volume::High => f.write_str("high"),
            Volume::Low => f.write_str("low"),
        }
    }
}

/// How much of a transcription unit is in a language other than Italian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageVariation {
    #[default]
    None,
    Some,
    All,
}

/// Position of a token inside its transcription unit. A single-token unit
/// is both start and end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub start: bool,
    pub end: bool,
}

impl Position {
    pub fn mark_start(&mut self) {
        self.start = true;
    }

    pub fn mark_end(&mut self) {
        self.end = true;
    }

    pub fn is_start(&self) -> bool {
        self.start
    }

    pub fn is_end(&self) -> bool {
        self.end
    }

    pub fn is_inner(&self) -> bool {
        !self.start && !self.end
    }
}
