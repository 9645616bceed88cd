//! Italian lexical tables used by the accent rules and the token grammar.
//!
//! These are data, not logic: the rules in [`super::rules`] compile one
//! pattern per entry, so extending a table extends the rule.

/// Words written with a grave accent on a final `e` that should carry an acute
/// accent (`perchè` -> `perché`). Only the final character is rewritten.
pub const GRAVE_CHE_WORDS: &[&str] = &[
    "perchè",
    "benchè",
    "finchè",
    "poichè",
    "anzichè",
    "dopodichè",
    "granchè",
    "fourchè",
    "affinchè",
    "pressochè",
    "nè",
];

/// Apostrophe spellings of accented words and the accented letter that
/// replaces the apostrophe (`pero'` -> `però`).
pub const APOSTROPHE_ACCENTS: &[(&str, char)] = &[
    ("pero'", 'ò'),
    ("perche'", 'é'),
    ("puo'", 'ò'),
];

/// Letter sequences that end in an apostrophe without being truncations.
pub const TRUNCATION_EXCEPTIONS: &[&str] = &["po"];

/// Non-verbal tier names that are never turned into transcription units.
pub const DEFAULT_IGNORED_TIERS: &[&str] = &["Traduzione"];

/// Language code used for tokens marked as non-Italian without a known code.
pub const NO_ISO_CODE: &str = "NO_ISO_CODE";

/// Default language code of a token.
pub const DEFAULT_ISO_CODE: &str = "ita";
