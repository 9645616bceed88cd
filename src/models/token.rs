use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};
use tracing::debug;

use super::{Diagnostics, ErrorFlag, Intonation, Position, Span, TokenType, Volume};
use crate::normalize::lexicon::{DEFAULT_ISO_CODE, NO_ISO_CODE, TRUNCATION_EXCEPTIONS};

/// Delimiters removed from a token before its shape is classified.
const STRUCTURAL_CHARS: [char; 7] = ['[', ']', '(', ')', '<', '>', '°'];

static WORD_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^['~-]?(?:\p{L}+:*)*\p{L}+:*[-'~]?[.,?]?$").expect("valid word shape regex")
});
static PO_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^po':*[.,?]?$").expect("valid po shape regex"));
static PO_APOSTROPHE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'(:*)").expect("valid po apostrophe regex"));

/// Identifier of the overlap event a span was matched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OverlapMatch {
    Clique(usize),
    /// The span could not be reconciled with the timing data (`?`).
    Unresolved,
}

impl fmt::Display for OverlapMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlapMatch::Clique(id) => write!(f, "{id}"),
            OverlapMatch::Unresolved => f.write_str("?"),
        }
    }
}

impl Serialize for OverlapMatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A feature projected onto a token after tokenization.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenFeature {
    ProsodicLink,
    /// The token is glued to the next one (clitic split on an apostrophe).
    NoSpaceAfter,
    /// Language code overriding the default.
    Language(String),
    Overlap(OverlapMatch, Span),
    SlowPace(usize, Span),
    FastPace(usize, Span),
    LowVolume(usize, Span),
    Guess(usize, Span),
}

/// A single token of a transcription unit.
///
/// Span-keyed feature maps hold the local character range covered by the
/// span inside this token, keyed by the span (or overlap match) id.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    /// `"{tu_id}-{index}"`
    pub id: String,
    /// Normalized surface form
    pub text: String,
    /// The chunk of annotation the token was built from
    pub orig_text: String,
    /// Character range of `orig_text` inside the unit's annotation
    pub span: Span,
    pub token_type: TokenType,
    pub intonation_pattern: Intonation,
    pub position_in_tu: Position,
    pub volume: Option<Volume>,
    pub overlaps: BTreeMap<OverlapMatch, Span>,
    pub slow_pace: BTreeMap<usize, Span>,
    pub fast_pace: BTreeMap<usize, Span>,
    pub guesses: BTreeMap<usize, Span>,
    pub low_volume: BTreeMap<usize, Span>,
    pub interruption: bool,
    pub truncation: bool,
    pub prosodiclink: bool,
    pub spaceafter: bool,
    pub non_ita: bool,
    pub iso_code: String,
    /// Word marked with `$` as not existing in standard orthography
    pub non_ortho: bool,
    /// Insertion offset of a colon run in the stripped text -> run length
    pub prolongations: BTreeMap<usize, usize>,
    pub diagnostics: Diagnostics,
}

impl Token {
    /// Build a token from a raw chunk of normalized annotation and classify
    /// its shape.
    pub fn new(raw: &str, id: impl Into<String>, span: Span) -> Self {
        let mut token = Self {
            id: id.into(),
            text: raw.to_string(),
            orig_text: raw.to_string(),
            span,
            token_type: TokenType::Linguistic,
            intonation_pattern: Intonation::Plain,
            position_in_tu: Position::default(),
            volume: None,
            overlaps: BTreeMap::new(),
            slow_pace: BTreeMap::new(),
            fast_pace: BTreeMap::new(),
            guesses: BTreeMap::new(),
            low_volume: BTreeMap::new(),
            interruption: false,
            truncation: false,
            prosodiclink: false,
            spaceafter: true,
            non_ita: false,
            iso_code: DEFAULT_ISO_CODE.to_string(),
            non_ortho: false,
            prolongations: BTreeMap::new(),
            diagnostics: Diagnostics::default(),
        };
        token.classify();
        token
    }

    fn mark_error(&mut self) {
        self.token_type = TokenType::Error;
        self.diagnostics.raise(ErrorFlag::MalformedToken);
    }

    fn classify(&mut self) {
        let mut text: String = self
            .orig_text
            .chars()
            .filter(|c| !STRUCTURAL_CHARS.contains(c))
            .collect();

        // also catches chunks made only of delimiters, like a stray `°`
        if text.chars().all(|c| c == 'x') {
            self.token_type = TokenType::Unknown;
            self.text = "x".to_string();
            return;
        }

        if let Some(rest) = text.strip_prefix('$') {
            debug!("Non orthographic token {}", text);
            self.non_ortho = true;
            text = rest.to_string();
        }

        if let Some(rest) = text.strip_prefix('#') {
            debug!("Different language detected in token {}", text);
            self.non_ita = true;
            self.iso_code = NO_ISO_CODE.to_string();
            text = rest.to_string();
        }

        if text.is_empty() {
            self.text = text;
            self.mark_error();
            return;
        }

        if text.starts_with('@') {
            self.token_type = TokenType::Anonymized;
            self.text = text;
            return;
        }

        let is_po = PO_SHAPE.is_match(&text);
        if !WORD_SHAPE.is_match(&text) {
            if text == "{P}" {
                self.token_type = TokenType::Shortpause;
                self.text = text;
                return;
            } else if text.starts_with('{') {
                self.token_type = TokenType::Nonverbalbehavior;
                self.text = text;
                return;
            } else if !is_po {
                self.text = text;
                self.mark_error();
                return;
            }
        }

        if is_po {
            text = PO_APOSTROPHE.replace_all(&text, "${1}'").into_owned();
        }

        self.read_boundary_marks(&mut text);
        debug!("Token after boundary marks: {}", text);

        self.prolongations = find_prolongations(&text);
        let text: String = text.chars().filter(|&c| c != ':').collect();

        if text.chars().any(char::is_uppercase) {
            self.volume = Some(Volume::High);
        }
        self.text = text.to_lowercase();
    }

    /// Final intonation, interruption and truncation marks.
    fn read_boundary_marks(&mut self, text: &mut String) {
        if text.ends_with('.') {
            self.intonation_pattern = Intonation::Falling;
            text.pop();
        } else if text.ends_with(',') {
            self.intonation_pattern = Intonation::WeaklyRising;
            text.pop();
        } else if text.ends_with('?') {
            self.intonation_pattern = Intonation::Rising;
            text.pop();
        } else if text.ends_with(['-', '~']) || text.starts_with(['-', '~']) {
            self.interruption = true;
        } else if text.ends_with('\'') || text.starts_with('\'') {
            let letters: String = text.chars().filter(|c| c.is_alphabetic()).collect();
            if !TRUNCATION_EXCEPTIONS.contains(&letters.as_str()) {
                self.truncation = true;
            }
        }
    }

    /// Accumulate a projected feature.
    pub fn add_info(&mut self, feature: TokenFeature) {
        match feature {
            TokenFeature::ProsodicLink => self.prosodiclink = true,
            TokenFeature::NoSpaceAfter => {
                self.spaceafter = false;
                self.truncation = false;
            }
            TokenFeature::Language(code) => {
                self.non_ita = true;
                self.iso_code = code;
            }
            TokenFeature::Overlap(id, range) => {
                self.overlaps.insert(id, range);
            }
            TokenFeature::SlowPace(id, range) => {
                self.slow_pace.insert(id, range);
            }
            TokenFeature::FastPace(id, range) => {
                self.fast_pace.insert(id, range);
            }
            TokenFeature::LowVolume(id, range) => {
                self.low_volume.insert(id, range);
                self.volume = Some(Volume::Low);
            }
            TokenFeature::Guess(id, range) => {
                self.guesses.insert(id, range);
            }
        }
    }

    /// Whether prosodic feature extraction ran on this token.
    pub fn is_linguistic(&self) -> bool {
        self.token_type == TokenType::Linguistic
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Locate colon runs. Colons do not advance the position counter;
/// apostrophes, dashes and tildes do, so a run after a truncated letter still
/// maps to that letter. The key is one past the prolonged letter.
fn find_prolongations(text: &str) -> BTreeMap<usize, usize> {
    let chars: Vec<char> = text.chars().collect();
    let mut positions: Vec<Option<usize>> = Vec::with_capacity(chars.len());
    let mut counter = 0;
    for &ch in &chars {
        match ch {
            ':' => positions.push(None),
            '\'' | '-' | '~' => {
                positions.push(None);
                counter += 1;
            }
            _ => {
                positions.push(Some(counter));
                counter += 1;
            }
        }
    }

    let mut prolongations = BTreeMap::new();
    let mut idx = 0;
    while idx < chars.len() {
        if chars[idx] != ':' {
            idx += 1;
            continue;
        }
        let begin = idx;
        while idx < chars.len() && chars[idx] == ':' {
            idx += 1;
        }
        let letter = positions[..begin].iter().rev().find_map(|p| *p);
        let offset = letter.map_or(0, |position| position + 1);
        prolongations.insert(offset, idx - begin);
    }
    prolongations
}
