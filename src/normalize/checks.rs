//! Balance checks and span scanners for Jefferson delimiters.
//!
//! The checks never modify the text: they report whether a delimiter family
//! is well formed so that span detection for that family can be skipped.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::rules::Rewrite;
use crate::models::Span;

static LOW_VOLUME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"°[^°]+°").expect("valid low volume regex"));
static OVERLAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]+\]").expect("valid overlap regex"));
static GUESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]+\)").expect("valid guess regex"));
static HIGH_VOLUME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-ZÀÈÉÌÒÓÙ]+(?:\s+[A-ZÀÈÉÌÒÓÙ]+)*\b").expect("valid high volume regex")
});

/// `true` iff the number of `°` is even.
pub fn check_even_dots(text: &str) -> bool {
    text.matches('°').count() % 2 == 0
}

/// `true` iff every `open` is closed by `close` before the next `open`.
/// Nesting is not supported.
pub fn check_normal_parentheses(text: &str, open: char, close: char) -> bool {
    let mut is_open = false;
    for ch in text.chars() {
        if ch == open {
            if is_open {
                return false;
            }
            is_open = true;
        } else if ch == close {
            if !is_open {
                return false;
            }
            is_open = false;
        }
    }
    !is_open
}

/// Polarity of the currently open pace sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaceState {
    Closed,
    /// `<...>`
    Slow,
    /// `>...<`
    Fast,
}

/// Outcome of feeding one character to the pace state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaceEvent {
    Plain,
    OpenSlow,
    OpenFast,
    CloseSlow,
    CloseFast,
    /// A delimiter that would re-open the sequence already open.
    Imbalance,
}

impl PaceState {
    fn step(&mut self, ch: char) -> PaceEvent {
        match (ch, *self) {
            ('<', PaceState::Fast) => {
                *self = PaceState::Closed;
                PaceEvent::CloseFast
            }
            ('<', PaceState::Closed) => {
                *self = PaceState::Slow;
                PaceEvent::OpenSlow
            }
            ('>', PaceState::Slow) => {
                *self = PaceState::Closed;
                PaceEvent::CloseSlow
            }
            ('>', PaceState::Closed) => {
                *self = PaceState::Fast;
                PaceEvent::OpenFast
            }
            ('<', PaceState::Slow) | ('>', PaceState::Fast) => PaceEvent::Imbalance,
            _ => PaceEvent::Plain,
        }
    }
}

/// `true` iff `<...>` and `>...<` sequences are balanced and never nest.
pub fn check_angular_parentheses(text: &str) -> bool {
    let mut state = PaceState::Closed;
    for ch in text.chars() {
        if state.step(ch) == PaceEvent::Imbalance {
            return false;
        }
    }
    state == PaceState::Closed
}

/// Remove spaces just inside balanced `°...°` spans.
pub fn check_spaces_dots(text: &str) -> Rewrite {
    let mut subs = 0;
    let rewritten = LOW_VOLUME.replace_all(text, |caps: &Captures| {
        let (fixed, count) = trim_inner_spaces(&caps[0]);
        subs += count;
        fixed
    });
    (subs, rewritten.trim().to_string())
}

/// Remove spaces just inside `<...>` and `>...<` spans.
pub fn check_spaces_angular(text: &str) -> Rewrite {
    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut state = PaceState::Closed;

    for ch in text.chars() {
        match state.step(ch) {
            PaceEvent::OpenSlow | PaceEvent::OpenFast => {
                segments.push(std::mem::take(&mut current));
                current.push(ch);
            }
            PaceEvent::CloseSlow | PaceEvent::CloseFast => {
                current.push(ch);
                segments.push(std::mem::take(&mut current));
            }
            PaceEvent::Plain | PaceEvent::Imbalance => current.push(ch),
        }
    }
    segments.push(current);

    let mut subs = 0;
    let mut rewritten = String::with_capacity(text.len());
    for segment in segments.iter().filter(|s| !s.is_empty()) {
        if segment.starts_with(['<', '>']) {
            let (fixed, count) = trim_inner_spaces(segment);
            subs += count;
            rewritten.push_str(&fixed);
        } else {
            rewritten.push_str(segment);
        }
    }

    (subs, rewritten.trim().to_string())
}

/// Drop a space right after the opening delimiter and right before the
/// closing one.
fn trim_inner_spaces(segment: &str) -> (String, usize) {
    let mut chars: Vec<char> = segment.chars().collect();
    let mut count = 0;
    if chars.len() > 1 && chars[1] == ' ' {
        chars.remove(1);
        count += 1;
    }
    if chars.len() > 1 && chars[chars.len() - 2] == ' ' {
        let idx = chars.len() - 2;
        chars.remove(idx);
        count += 1;
    }
    (chars.into_iter().collect(), count)
}

/// Pace spans found by [`matches_angular`], delimiters included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaceMatches {
    /// `<...>` spans.
    pub slow: Vec<(String, Span)>,
    /// `>...<` spans.
    pub fast: Vec<(String, Span)>,
}

/// Scan `<`/`>` delimiters and return every closed slow and fast span.
pub fn matches_angular(text: &str) -> PaceMatches {
    let mut matches = PaceMatches::default();
    let mut state = PaceState::Closed;
    let mut buffer: Vec<(char, usize)> = Vec::new();

    for (idx, ch) in text.chars().enumerate() {
        match state.step(ch) {
            PaceEvent::OpenSlow | PaceEvent::OpenFast => {
                buffer.clear();
                buffer.push((ch, idx));
            }
            PaceEvent::CloseSlow | PaceEvent::CloseFast => {
                buffer.push((ch, idx));
                let span = Span::new(buffer[0].1, idx + 1);
                let matched: String = buffer.drain(..).map(|(c, _)| c).collect();
                if ch == '>' {
                    matches.slow.push((matched, span));
                } else {
                    matches.fast.push((matched, span));
                }
            }
            PaceEvent::Plain => buffer.push((ch, idx)),
            PaceEvent::Imbalance => {}
        }
    }

    matches
}

fn char_spans(re: &Regex, text: &str) -> Vec<Span> {
    re.find_iter(text)
        .map(|m| Span::from_byte_range(text, m.start(), m.end()))
        .collect()
}

/// `°...°` spans.
pub fn low_volume_spans(text: &str) -> Vec<Span> {
    char_spans(&LOW_VOLUME, text)
}

/// `[...]` spans.
pub fn overlap_spans(text: &str) -> Vec<Span> {
    char_spans(&OVERLAP, text)
}

/// `(...)` spans.
pub fn guess_spans(text: &str) -> Vec<Span> {
    char_spans(&GUESS, text)
}

/// Maximal runs of uppercase words.
pub fn high_volume_spans(text: &str) -> Vec<Span> {
    char_spans(&HIGH_VOLUME, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_even_dots() {
        assert!(check_even_dots("°ciao°"));
        assert!(!check_even_dots("°ciao"));
        assert!(check_even_dots(""));
    }

    #[test]
    fn test_check_normal_parentheses() {
        assert!(check_normal_parentheses("(ciao)", '(', ')'));
        assert!(!check_normal_parentheses("(ciao", '(', ')'));
        assert!(check_normal_parentheses("[ciao]", '[', ']'));
        assert!(!check_normal_parentheses("ciao]", '[', ']'));
        assert!(!check_normal_parentheses("[[ciao]]", '[', ']'));
        assert!(check_normal_parentheses("", '[', ']'));
    }

    #[test]
    fn test_check_angular_parentheses() {
        assert!(check_angular_parentheses("<ciao>"));
        assert!(check_angular_parentheses(">ciao<"));
        assert!(!check_angular_parentheses("<ciao"));
        assert!(!check_angular_parentheses("ciao>"));
        assert!(!check_angular_parentheses("<<ciao>>"));
        assert!(check_angular_parentheses("bla <slow> followed by >fast<"));
        assert!(check_angular_parentheses("bla >fast< followed by <slow>"));
        assert!(check_angular_parentheses(""));
    }

    #[test]
    fn test_check_spaces_dots() {
        assert_eq!(check_spaces_dots("° ciao°"), (1, "°ciao°".to_string()));
        assert_eq!(check_spaces_dots("°ciao °"), (1, "°ciao°".to_string()));
        assert_eq!(
            check_spaces_dots("bla °bla bla ° bla ° bla bla°"),
            (2, "bla °bla bla° bla °bla bla°".to_string())
        );
    }

    #[test]
    fn test_check_spaces_angular() {
        assert_eq!(check_spaces_angular("< ciao>"), (1, "<ciao>".to_string()));
        assert_eq!(check_spaces_angular(">ciao <"), (1, ">ciao<".to_string()));
        assert_eq!(
            check_spaces_angular("bla >bla bla < bla < bla bla> bla"),
            (2, "bla >bla bla< bla <bla bla> bla".to_string())
        );
    }

    #[test]
    fn test_matches_angular() {
        let matches = matches_angular("bla <slow> followed by >fast<");
        assert_eq!(matches.slow, vec![("<slow>".to_string(), Span::new(4, 10))]);
        assert_eq!(matches.fast, vec![(">fast<".to_string(), Span::new(23, 29))]);
    }

    #[test]
    fn test_span_scanners_use_char_offsets() {
        let text = "°sì° [già] (forse) DAVVERO SÌ no";
        assert_eq!(low_volume_spans(text), vec![Span::new(0, 4)]);
        assert_eq!(overlap_spans(text), vec![Span::new(5, 10)]);
        assert_eq!(guess_spans(text), vec![Span::new(11, 18)]);
        assert_eq!(high_volume_spans(text), vec![Span::new(19, 29)]);
    }
}
