use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use super::{
    Diagnostics, ErrorFlag, LanguageVariation, OverlapMatch, Span, Token, TokenFeature, TokenType,
    Warning,
};
use crate::normalize::lexicon::NO_ISO_CODE;
use crate::normalize::{self, Rule};

/// Text rewrites applied in order when a unit is built. Later rules assume the
/// earlier ones already ran.
const NORMALIZATION_RULES: [(Warning, Rule); 12] = [
    (Warning::SymbolNotAllowed, normalize::clean_non_jefferson_symbols),
    (Warning::MetaTags, normalize::meta_tag),
    (Warning::UnevenSpaces, normalize::check_spaces),
    (Warning::TrimPauses, normalize::remove_pauses),
    (Warning::TrimProsodiclinks, normalize::remove_prosodiclinks),
    (Warning::UnevenSpaces, normalize::space_prosodiclink),
    (Warning::OverlapProlongation, normalize::overlap_prolongations),
    (Warning::MultipleSpaces, normalize::remove_spaces),
    (Warning::Accents, normalize::replace_che),
    (Warning::Accents, normalize::replace_po),
    (Warning::Accents, normalize::replace_pero),
    (Warning::Numbers, normalize::check_numbers),
];

/// Rewrites applied after span detection. Both preserve the text length.
const SWITCH_RULES: [(Warning, Rule); 2] = [
    (Warning::Switches, normalize::switch_symbols),
    (Warning::Switches, normalize::switch_nvb),
];

/// A unit made only of these characters carries no speech.
const EMPTY_UNIT_CHARS: [char; 10] = ['[', ']', '(', ')', '°', '>', '<', '-', '\'', '#'];

/// A clique-derived overlap event as seen from one member unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlapTime {
    pub start: f64,
    pub end: f64,
    pub clique_id: usize,
    /// Some member of the clique contains a non-verbal behaviour token.
    pub nvb: bool,
}

impl OverlapTime {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Events that may be missing from the annotation without it being an error.
    pub fn is_removable(&self, duration_threshold: f64) -> bool {
        self.nvb || self.duration() < duration_threshold
    }
}

/// `"1+4"` style key for a set of other unit ids.
pub fn joined_ids(ids: &[usize]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join("+")
}

fn serialize_overlapping_times<S: Serializer>(
    times: &BTreeMap<Vec<usize>, OverlapTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(times.len()))?;
    for (others, time) in times {
        map.serialize_entry(&joined_ids(others), time)?;
    }
    map.end()
}

fn serialize_matches<S: Serializer>(
    matches: &BTreeMap<Span, OverlapMatch>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(matches.len()))?;
    for (span, matched) in matches {
        map.serialize_entry(&span.to_string(), matched)?;
    }
    map.end()
}

/// One timed utterance of a single speaker.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionUnit {
    pub tu_id: usize,
    pub speaker: String,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    /// Normalized annotation. Every span below indexes into it.
    pub annotation: String,
    pub orig_annotation: String,
    pub include: bool,
    pub non_ita: LanguageVariation,
    pub overlapping_spans: Vec<Span>,
    pub low_volume_spans: Vec<Span>,
    pub high_volume_spans: Vec<Span>,
    pub guessing_spans: Vec<Span>,
    pub fast_pace_spans: Vec<Span>,
    pub slow_pace_spans: Vec<Span>,
    /// Sorted ids of the other clique members -> event
    #[serde(serialize_with = "serialize_overlapping_times")]
    pub overlapping_times: BTreeMap<Vec<usize>, OverlapTime>,
    #[serde(serialize_with = "serialize_matches")]
    pub overlapping_matches: BTreeMap<Span, OverlapMatch>,
    /// Durations of unmatched events, keyed by [`joined_ids`].
    pub overlap_durations: BTreeMap<String, f64>,
    pub diagnostics: Diagnostics,
    pub tokens: BTreeMap<usize, Token>,
}

impl TranscriptionUnit {
    /// Build a unit from one raw row and normalize its annotation.
    pub fn new(
        tu_id: usize,
        speaker: impl Into<String>,
        start: f64,
        end: f64,
        duration: f64,
        annotation: &str,
    ) -> Self {
        let mut unit = Self {
            tu_id,
            speaker: speaker.into(),
            start,
            end,
            duration,
            annotation: annotation.to_string(),
            orig_annotation: annotation.to_string(),
            include: true,
            non_ita: LanguageVariation::None,
            overlapping_spans: Vec::new(),
            low_volume_spans: Vec::new(),
            high_volume_spans: Vec::new(),
            guessing_spans: Vec::new(),
            fast_pace_spans: Vec::new(),
            slow_pace_spans: Vec::new(),
            overlapping_times: BTreeMap::new(),
            overlapping_matches: BTreeMap::new(),
            overlap_durations: BTreeMap::new(),
            diagnostics: Diagnostics::default(),
            tokens: BTreeMap::new(),
        };
        unit.normalize();
        unit
    }

    fn apply(&mut self, warning: Warning, rule: Rule) {
        let (subs, rewritten) = rule(&self.annotation);
        if subs > 0 {
            debug!("TU {}: {} x{}: {} >> {}", self.tu_id, warning, subs, self.annotation, rewritten);
        }
        self.diagnostics.warn(warning, subs);
        self.annotation = rewritten;
    }

    fn check(&mut self, error: ErrorFlag, balanced: bool) {
        if !balanced {
            debug!("TU {}: {}", self.tu_id, error);
            self.diagnostics.raise(error);
        }
    }

    fn normalize(&mut self) {
        if self.annotation.is_empty() {
            info!("Empty annotation for TU {}", self.tu_id);
            self.include = false;
            return;
        }

        self.annotation = self.annotation.trim().to_string();

        if self.annotation.starts_with("# ") {
            debug!("Different language detected in TU {}", self.tu_id);
            self.non_ita = LanguageVariation::Some;
            self.annotation = self.annotation[1..].trim().to_string();
        }

        if self.annotation.starts_with("#_") {
            debug!("Whole TU {} is in a different language", self.tu_id);
            self.non_ita = LanguageVariation::All;
            self.annotation = self.annotation[2..].trim().to_string();
            return;
        }

        for (warning, rule) in NORMALIZATION_RULES {
            self.apply(warning, rule);
        }

        let text = self.annotation.clone();
        self.check(ErrorFlag::UnbalancedDots, normalize::check_even_dots(&text));
        self.check(ErrorFlag::UnbalancedPace, normalize::check_angular_parentheses(&text));
        self.check(
            ErrorFlag::UnbalancedGuess,
            normalize::check_normal_parentheses(&text, '(', ')'),
        );
        self.check(
            ErrorFlag::UnbalancedOverlap,
            normalize::check_normal_parentheses(&text, '[', ']'),
        );

        let dots_ok = !self.diagnostics.has_error(ErrorFlag::UnbalancedDots);
        let pace_ok = !self.diagnostics.has_error(ErrorFlag::UnbalancedPace);

        if dots_ok && self.annotation.contains('°') {
            self.apply(Warning::UnevenSpaces, normalize::check_spaces_dots);
        }
        if pace_ok && self.annotation.contains('<') {
            self.apply(Warning::UnevenSpaces, normalize::check_spaces_angular);
        }

        self.detect_spans();

        for (warning, rule) in SWITCH_RULES {
            self.apply(warning, rule);
        }

        if self.annotation.chars().all(|c| EMPTY_UNIT_CHARS.contains(&c)) {
            info!("Removing TU {}: no speech left in '{}'", self.tu_id, self.orig_annotation);
            self.include = false;
        }
    }

    /// Locate feature spans for every delimiter family that is balanced.
    fn detect_spans(&mut self) {
        let text = self.annotation.as_str();

        if text.contains('<') && !self.diagnostics.has_error(ErrorFlag::UnbalancedPace) {
            let pace = normalize::matches_angular(text);
            self.slow_pace_spans = pace.slow.into_iter().map(|(_, span)| span).collect();
            self.fast_pace_spans = pace.fast.into_iter().map(|(_, span)| span).collect();
        }

        if text.contains('°') && !self.diagnostics.has_error(ErrorFlag::UnbalancedDots) {
            self.low_volume_spans = normalize::low_volume_spans(text);
        }

        self.high_volume_spans = normalize::high_volume_spans(text);

        if text.contains('[') && !self.diagnostics.has_error(ErrorFlag::UnbalancedOverlap) {
            self.overlapping_spans = normalize::overlap_spans(text);
        }

        if text.contains('(') && !self.diagnostics.has_error(ErrorFlag::UnbalancedGuess) {
            self.guessing_spans = normalize::guess_spans(text);
        }

        debug!(
            "TU {} spans: {} overlap, {} guess, {} low, {} high, {} slow, {} fast",
            self.tu_id,
            self.overlapping_spans.len(),
            self.guessing_spans.len(),
            self.low_volume_spans.len(),
            self.high_volume_spans.len(),
            self.slow_pace_spans.len(),
            self.fast_pace_spans.len(),
        );
    }

    fn push_token(&mut self, raw: &str, start: usize) -> usize {
        let index = self.tokens.len();
        let span = Span::new(start, start + raw.chars().count());
        let token = Token::new(raw, format!("{}-{}", self.tu_id, index), span);
        debug!("TU {}: token {} '{}' at {}", self.tu_id, token.id, token.text, span);
        self.tokens.insert(index, token);
        index
    }

    /// Split a chunk on a clitic apostrophe (`l'amico`) when letters sit on
    /// both sides of it.
    fn push_chunk(&mut self, chunk: &str, start: usize) {
        if let Some(idx) = chunk.find('\'') {
            let (prefix, rest) = chunk.split_at(idx + 1);
            let letter_before = prefix.chars().any(char::is_alphabetic);
            let letter_after = rest.chars().any(char::is_alphabetic);
            if letter_before && letter_after {
                let first = self.push_token(prefix, start);
                if let Some(token) = self.tokens.get_mut(&first) {
                    token.add_info(TokenFeature::NoSpaceAfter);
                }
                self.push_token(rest, start + prefix.chars().count());
                return;
            }
        }
        self.push_token(chunk, start);
    }

    fn flush_chunk(&mut self, chunk: &mut String, start: usize) {
        if chunk.is_empty() {
            debug!("TU {}: empty token at {}", self.tu_id, start);
            self.diagnostics.warn(Warning::EmptyToken, 1);
        } else {
            let raw = std::mem::take(chunk);
            self.push_chunk(&raw, start);
        }
    }

    /// Split the annotation into tokens on spaces and prosodic links.
    pub fn tokenize(&mut self) {
        if !self.include {
            return;
        }

        let annotation = self.annotation.clone();
        let mut chunk = String::new();
        let mut chunk_start = 0;

        for (pos, ch) in annotation.chars().enumerate() {
            if ch != ' ' && ch != '=' {
                chunk.push(ch);
                continue;
            }

            self.flush_chunk(&mut chunk, chunk_start);
            chunk_start = pos + 1;

            if ch == '=' {
                match self.tokens.values_mut().next_back() {
                    Some(last) => last.add_info(TokenFeature::ProsodicLink),
                    None => {
                        debug!("TU {}: prosodic link with no preceding token", self.tu_id);
                        self.diagnostics.warn(Warning::DanglingProsodiclink, 1);
                    }
                }
            }
        }
        self.flush_chunk(&mut chunk, chunk_start);

        if self.non_ita == LanguageVariation::All {
            for token in self.tokens.values_mut() {
                token.token_type = TokenType::Linguistic;
                token.add_info(TokenFeature::Language(NO_ISO_CODE.to_string()));
            }
        }

        if !self.tokens.is_empty() {
            let marked = self.tokens.values().filter(|t| t.non_ita).count();
            if marked == self.tokens.len() {
                self.non_ita = LanguageVariation::All;
            } else if marked > 0 {
                self.non_ita = LanguageVariation::Some;
            }
        }
    }

    /// For every annotation character, the owning token and the local offset
    /// among that token's content characters. Delimiters and separators map
    /// to `None`.
    fn char_slots(&self) -> Vec<Option<(usize, usize)>> {
        let mut slots = vec![None; self.annotation.chars().count()];
        for (&index, token) in &self.tokens {
            let mut local = 0;
            for (k, ch) in token.orig_text.chars().enumerate() {
                match ch {
                    ':' | '.' | ',' | '?' | '[' | ']' | '(' | ')' | '<' | '>' | '°' => {}
                    _ => {
                        if let Some(slot) = slots.get_mut(token.span.start + k) {
                            *slot = Some((index, local));
                        }
                        local += 1;
                    }
                }
            }
        }
        slots
    }

    /// Local sub-range of every token touched by `span`.
    fn project(slots: &[Option<(usize, usize)>], span: Span) -> BTreeMap<usize, Span> {
        let mut ranges: BTreeMap<usize, Span> = BTreeMap::new();
        let end = span.end.min(slots.len());
        for &(token, local) in slots[span.start.min(end)..end].iter().flatten() {
            ranges
                .entry(token)
                .and_modify(|range| {
                    range.start = range.start.min(local);
                    range.end = range.end.max(local + 1);
                })
                .or_insert(Span::new(local, local + 1));
        }
        ranges
    }

    /// Attach span features and overlap matches to the tokens they cover.
    pub fn add_token_features(&mut self) {
        if !self.include || self.tokens.is_empty() {
            return;
        }

        let slots = self.char_slots();
        let families: [(&[Span], fn(usize, Span) -> TokenFeature); 4] = [
            (self.slow_pace_spans.as_slice(), TokenFeature::SlowPace),
            (self.fast_pace_spans.as_slice(), TokenFeature::FastPace),
            (self.low_volume_spans.as_slice(), TokenFeature::LowVolume),
            (self.guessing_spans.as_slice(), TokenFeature::Guess),
        ];

        let mut features: Vec<(usize, TokenFeature)> = Vec::new();
        for (spans, feature) in families {
            for (span_id, span) in spans.iter().enumerate() {
                for (token, range) in Self::project(&slots, *span) {
                    features.push((token, feature(span_id, range)));
                }
            }
        }
        for (span, matched) in &self.overlapping_matches {
            for (token, range) in Self::project(&slots, *span) {
                features.push((token, TokenFeature::Overlap(*matched, range)));
            }
        }

        for (index, feature) in features {
            if let Some(token) = self.tokens.get_mut(&index) {
                token.add_info(feature);
            }
        }

        if let Some(first) = self.tokens.values_mut().next() {
            first.position_in_tu.mark_start();
        }
        if let Some(last) = self.tokens.values_mut().next_back() {
            last.position_in_tu.mark_end();
        }
    }

    /// Every token is a non-verbal behaviour. Vacuously true with no tokens.
    pub fn is_nonverbal_only(&self) -> bool {
        self.tokens
            .values()
            .all(|t| t.token_type == TokenType::Nonverbalbehavior)
    }

    pub fn has_nonverbal(&self) -> bool {
        self.tokens
            .values()
            .any(|t| t.token_type == TokenType::Nonverbalbehavior)
    }

    pub fn count_tokens(&self, token_type: TokenType) -> usize {
        self.tokens
            .values()
            .filter(|t| t.token_type == token_type)
            .count()
    }

    /// Normalized token forms, glued where a clitic was split off.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for token in self.tokens.values() {
            text.push_str(&token.text);
            if token.spaceafter {
                text.push(' ');
            }
        }
        text.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Intonation, Volume};

    fn unit(annotation: &str) -> TranscriptionUnit {
        TranscriptionUnit::new(0, "A", 0.0, 1.0, 1.0, annotation)
    }

    fn texts(unit: &TranscriptionUnit) -> Vec<&str> {
        unit.tokens.values().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_empty_annotation_is_excluded() {
        assert!(!unit("").include);
        assert!(!unit("[ ]").include);
        assert!(!unit("°°").include);
    }

    #[test]
    fn test_stray_delimiter_is_unknown_token() {
        let mut tu = unit("a ° b");
        tu.tokenize();
        assert_eq!(texts(&tu), vec!["a", "x", "b"]);
        assert_eq!(tu.tokens[&1].token_type, TokenType::Unknown);
        assert_eq!(tu.count_tokens(TokenType::Error), 0);
    }

    #[test]
    fn test_normalization_counts_warnings() {
        let tu = unit("ciao  (.) bella");
        assert_eq!(tu.annotation, "ciao {P} bella");
        assert_eq!(tu.diagnostics.warning_count(Warning::MetaTags), 1);
        assert_eq!(tu.diagnostics.warning_count(Warning::MultipleSpaces), 1);
    }

    #[test]
    fn test_unbalanced_delimiters_skip_spans() {
        let tu = unit("°ciao [bella");
        assert!(tu.diagnostics.has_error(ErrorFlag::UnbalancedDots));
        assert!(tu.diagnostics.has_error(ErrorFlag::UnbalancedOverlap));
        assert!(tu.low_volume_spans.is_empty());
        assert!(tu.overlapping_spans.is_empty());
    }

    #[test]
    fn test_spans_detected() {
        let tu = unit("[ciao] °bella° <piano> (forse)");
        assert_eq!(tu.overlapping_spans, vec![Span::new(0, 6)]);
        assert_eq!(tu.low_volume_spans, vec![Span::new(7, 14)]);
        assert_eq!(tu.slow_pace_spans, vec![Span::new(15, 22)]);
        assert_eq!(tu.guessing_spans, vec![Span::new(23, 30)]);
    }

    #[test]
    fn test_tokenize_with_shortpause() {
        let mut tu = unit("ciao (.) bella");
        tu.tokenize();
        assert_eq!(texts(&tu), vec!["ciao", "{P}", "bella"]);
        assert_eq!(tu.tokens[&1].token_type, TokenType::Shortpause);
        assert_eq!(tu.tokens[&2].id, "0-2");
        assert_eq!(tu.tokens[&2].span, Span::new(9, 14));
    }

    #[test]
    fn test_tokenize_prosodic_link() {
        let mut tu = unit("ciao=bella");
        tu.tokenize();
        assert_eq!(texts(&tu), vec!["ciao", "bella"]);
        assert!(tu.tokens[&0].prosodiclink);
        assert!(!tu.tokens[&1].prosodiclink);
    }

    #[test]
    fn test_tokenize_clitic_split() {
        let mut tu = unit("l'amico.");
        tu.tokenize();
        assert_eq!(texts(&tu), vec!["l'", "amico"]);
        assert!(!tu.tokens[&0].spaceafter);
        assert!(!tu.tokens[&0].truncation);
        assert_eq!(tu.tokens[&1].span, Span::new(2, 8));
        assert_eq!(tu.tokens[&1].intonation_pattern, Intonation::Falling);
        assert_eq!(tu.text(), "l'amico");
    }

    #[test]
    fn test_language_variation() {
        let mut tu = unit("#_hello world");
        assert_eq!(tu.non_ita, LanguageVariation::All);
        tu.tokenize();
        assert!(tu.tokens.values().all(|t| t.iso_code == NO_ISO_CODE));
        assert_eq!(tu.non_ita, LanguageVariation::All);

        let mut tu = unit("ciao #hello");
        tu.tokenize();
        assert_eq!(tu.non_ita, LanguageVariation::Some);
    }

    #[test]
    fn test_features_projected_on_tokens() {
        let mut tu = unit("°ciao bella° <piano>");
        tu.tokenize();
        tu.add_token_features();

        let ciao = &tu.tokens[&0];
        assert_eq!(ciao.low_volume.get(&0), Some(&Span::new(0, 4)));
        assert_eq!(ciao.volume, Some(Volume::Low));
        assert!(ciao.position_in_tu.is_start());

        let bella = &tu.tokens[&1];
        assert_eq!(bella.low_volume.get(&0), Some(&Span::new(0, 5)));

        let piano = &tu.tokens[&2];
        assert_eq!(piano.slow_pace.get(&0), Some(&Span::new(0, 5)));
        assert!(piano.position_in_tu.is_end());
        assert!(bella.position_in_tu.is_inner());
    }

    #[test]
    fn test_features_after_clitic_split() {
        let mut tu = unit("l'amico [bello]");
        tu.overlapping_matches
            .insert(tu.overlapping_spans[0], OverlapMatch::Clique(0));
        tu.tokenize();
        tu.add_token_features();

        let bello = &tu.tokens[&2];
        assert_eq!(bello.overlaps.get(&OverlapMatch::Clique(0)), Some(&Span::new(0, 5)));
        assert!(tu.tokens[&1].overlaps.is_empty());
    }

    #[test]
    fn test_partial_word_overlap() {
        let mut tu = unit("cia[o bel]la");
        tu.overlapping_matches
            .insert(tu.overlapping_spans[0], OverlapMatch::Unresolved);
        tu.tokenize();
        tu.add_token_features();

        assert_eq!(
            tu.tokens[&0].overlaps.get(&OverlapMatch::Unresolved),
            Some(&Span::new(3, 4))
        );
        assert_eq!(
            tu.tokens[&1].overlaps.get(&OverlapMatch::Unresolved),
            Some(&Span::new(0, 3))
        );
    }

    #[test]
    fn test_single_token_is_start_and_end() {
        let mut tu = unit("sì");
        tu.tokenize();
        tu.add_token_features();
        let position = tu.tokens[&0].position_in_tu;
        assert!(position.is_start() && position.is_end());
    }

    #[test]
    fn test_nonverbal_only() {
        let mut tu = unit("((ride))");
        tu.tokenize();
        assert!(tu.is_nonverbal_only());
        assert!(tu.has_nonverbal());
    }
}
