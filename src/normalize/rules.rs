//! Text rewrite rules applied to a transcription unit's annotation.
//!
//! Every rule is a pure function returning the number of substitutions it
//! made and the rewritten text. Callers thread the text through the rules in
//! a fixed order (see [`crate::models::TranscriptionUnit::new`]).

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::lexicon::{APOSTROPHE_ACCENTS, GRAVE_CHE_WORDS};
use super::numbers::spell_out;

/// Result of a counted rewrite: number of substitutions and the new text.
pub type Rewrite = (usize, String);

/// Signature shared by every counted rule.
pub type Rule = fn(&str) -> Rewrite;

static TABS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\t+").expect("valid tab regex"));
static NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n+").expect("valid newline regex"));
static SPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s\s+").expect("valid space run regex"));

static NON_JEFFERSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^{}_,?.:=°><\[\]()\w\s'\-~$#@]").expect("valid jefferson symbol regex")
});

static META_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([\w ]+)\}").expect("valid meta tag regex"));

static SPACE_AFTER_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\[(]) ([^ ])").expect("valid open bracket regex"));
static SPACE_BEFORE_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^ ]) ([)\]])").expect("valid close bracket regex"));
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^ ]) ([.,:?])").expect("valid punctuation regex"));
static GLUED_BEFORE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([^ \[(<>°])(\{[^}]+\})").expect("valid glued tag regex")
});
static GLUED_AFTER_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\{[^}]+\})([^ \])<>°])").expect("valid glued tag regex")
});

static EDGE_PAUSES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\[\]()<>°]?)\s*\{P\}\s*|\s*\{P\}\s*([\[\]()<>°]?)$")
        .expect("valid edge pause regex")
});
static EDGE_LINKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\[\]()<>°]?)\s*=\s*|\s*=\s*([\[\]()<>°]?)$").expect("valid edge link regex")
});
static SPACED_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" =|= ").expect("valid prosodic link regex"));

static LATE_OVERLAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w:*)\[:").expect("valid overlap prolongation regex"));

static PUNCT_BEFORE_MARK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.,?])([:\-~])").expect("valid switch regex"));
static NVB_INSIDE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\[(])(\{\w+\})").expect("valid nvb regex"));
static NVB_INSIDE_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\{\w+\})([\])])").expect("valid nvb regex"));

static GRAVE_PO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bp([^ =\p{L}]*)ò\b").expect("valid po regex"));

static NUMBERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9]+\b").expect("valid number regex"));

/// One compiled pattern per word in [`GRAVE_CHE_WORDS`]. Any run of
/// characters other than space, `=` and apostrophe may sit between the
/// letters, so `perc:hè` and `per[chè` are still recognised.
static CHE_PATTERNS: LazyLock<Vec<(Regex, String)>> = LazyLock::new(|| {
    GRAVE_CHE_WORDS
        .iter()
        .map(|word| {
            let mut pattern = String::from(r"\b");
            let mut replacement = String::new();
            for (idx, ch) in word.chars().enumerate() {
                pattern.push_str("([^ =']*)");
                pattern.push_str(&regex::escape(&ch.to_string()));
                replacement.push_str(&format!("${{{}}}", idx + 1));
                replacement.push(ch);
            }
            pattern.push_str(r"\b");
            replacement.pop();
            replacement.push('é');
            let re = Regex::new(&pattern).expect("valid che-family regex");
            (re, replacement)
        })
        .collect()
});

/// One compiled pattern per entry in [`APOSTROPHE_ACCENTS`]. The material
/// captured between the last letter and the apostrophe is dropped together
/// with the apostrophe.
static APOSTROPHE_PATTERNS: LazyLock<Vec<(Regex, String)>> = LazyLock::new(|| {
    APOSTROPHE_ACCENTS
        .iter()
        .map(|(word, accent)| {
            let chars: Vec<char> = word.chars().collect();
            let (first, middle, last) = (chars[0], &chars[1..chars.len() - 1], chars[chars.len() - 1]);

            let mut pattern = format!(r"\b{}", regex::escape(&first.to_string()));
            let mut replacement = first.to_string();
            for (idx, ch) in middle.iter().enumerate() {
                pattern.push_str("([^ =]*)");
                pattern.push_str(&regex::escape(&ch.to_string()));
                replacement.push_str(&format!("${{{}}}", idx + 1));
                replacement.push(*ch);
            }
            pattern.push_str("([^ =]*)");
            pattern.push_str(&regex::escape(&last.to_string()));
            replacement.pop();
            replacement.push(*accent);

            let re = Regex::new(&pattern).expect("valid apostrophe accent regex");
            (re, replacement)
        })
        .collect()
});

fn substitute(re: &Regex, text: &str, replacement: &str) -> Rewrite {
    let count = re.find_iter(text).count();
    if count == 0 {
        return (0, text.to_string());
    }
    (count, re.replace_all(text, replacement).into_owned())
}

/// Drop tabs and newlines, collapse whitespace runs and trim the ends.
pub fn remove_spaces(text: &str) -> Rewrite {
    let mut total = 0;
    let mut text = text.to_string();
    for (re, replacement) in [(&*TABS, ""), (&*NEWLINES, ""), (&*SPACE_RUNS, " ")] {
        let (count, rewritten) = substitute(re, &text, replacement);
        total += count;
        text = rewritten;
    }
    (total, text.trim().to_string())
}

/// Rewrite grave `pò` (with anything but letters, spaces and `=` between the
/// two letters) as `po'`.
pub fn replace_po(text: &str) -> Rewrite {
    let (count, text) = substitute(&GRAVE_PO, text, "p${1}o'");
    (count, text.trim().to_string())
}

/// Rewrite `chè`-family words with the acute accent.
pub fn replace_che(text: &str) -> Rewrite {
    let mut total = 0;
    let mut text = text.to_string();
    for (re, replacement) in CHE_PATTERNS.iter() {
        let (count, rewritten) = substitute(re, &text, replacement);
        total += count;
        text = rewritten;
    }
    (total, text)
}

/// Rewrite apostrophe spellings (`pero'`, `perche'`, `puo'`) as accented words.
pub fn replace_pero(text: &str) -> Rewrite {
    let mut total = 0;
    let mut text = text.to_string();
    for (re, replacement) in APOSTROPHE_PATTERNS.iter() {
        let (count, rewritten) = substitute(re, &text, replacement);
        total += count;
        text = rewritten;
    }
    (total, text)
}

/// Remove short pauses at the very beginning or end of the unit, keeping an
/// adjacent delimiter if there is one.
pub fn remove_pauses(text: &str) -> Rewrite {
    let (count, text) = substitute(&EDGE_PAUSES, text, "${1}${2}");
    (count, text.trim().to_string())
}

/// Remove prosodic links at the very beginning or end of the unit.
pub fn remove_prosodiclinks(text: &str) -> Rewrite {
    let (count, text) = substitute(&EDGE_LINKS, text, "${1}${2}");
    (count, text.trim().to_string())
}

/// Remove spaces around prosodic links.
pub fn space_prosodiclink(text: &str) -> Rewrite {
    let (count, text) = substitute(&SPACED_LINK, text, "=");
    (count, text.trim().to_string())
}

/// Put sentence punctuation after elongation, interruption and tilde marks.
pub fn switch_symbols(text: &str) -> Rewrite {
    let (count, text) = substitute(&PUNCT_BEFORE_MARK, text, "${2}${1}");
    (count, text.trim().to_string())
}

/// Move non-verbal tags that sit just inside an overlap or guess bracket to
/// the outside of the bracket.
pub fn switch_nvb(text: &str) -> Rewrite {
    let (opened, text) = substitute(&NVB_INSIDE_OPEN, text, "${2}${1}");
    let (closed, text) = substitute(&NVB_INSIDE_CLOSE, &text, "${2}${1}");
    (opened + closed, text.trim().to_string())
}

/// Move an overlap bracket opened in the middle of a prolongation to before
/// the prolonged letter: `questo:[::` becomes `quest[o:::`.
pub fn overlap_prolongations(text: &str) -> Rewrite {
    substitute(&LATE_OVERLAP, text, "[${1}:")
}

/// Remove every character that is not part of the Jefferson symbol set,
/// a word character, whitespace, apostrophe or one of the `$`, `#`, `@`
/// sigils.
pub fn clean_non_jefferson_symbols(text: &str) -> Rewrite {
    let (count, text) = substitute(&NON_JEFFERSON, text, "");
    (count, text.trim().to_string())
}

/// Fix asymmetric spaces around brackets, punctuation and `{...}` tags.
pub fn check_spaces(text: &str) -> Rewrite {
    let mut total = 0;
    let mut text = text.to_string();
    for (re, replacement) in [
        (&*SPACE_AFTER_OPEN, "${1}${2}"),
        (&*SPACE_BEFORE_CLOSE, "${1}${2}"),
        (&*SPACE_BEFORE_PUNCT, "${1}${2}"),
        (&*GLUED_BEFORE_TAG, "${1} ${2}"),
        (&*GLUED_AFTER_TAG, "${1} ${2}"),
    ] {
        let (count, rewritten) = substitute(re, &text, replacement);
        total += count;
        text = rewritten;
    }
    (total, text.trim().to_string())
}

/// Turn `((comment))` into `{comment}` and `(.)` into the short pause `{P}`.
/// Spaces inside a tag become underscores.
pub fn meta_tag(text: &str) -> Rewrite {
    let mut total = 0;
    let mut text = text.to_string();
    for (old, new) in [("((", "{"), ("))", "}"), ("(.)", "{P}")] {
        total += text.matches(old).count();
        text = text.replace(old, new);
        text = META_BODY
            .replace_all(&text, |caps: &Captures| format!("{{{}}}", caps[1].replace(' ', "_")))
            .into_owned();
    }
    (total, text)
}

/// Replace standalone numerals with their spelled-out Italian form. Numerals
/// too long to spell are left as they are and not counted.
pub fn check_numbers(text: &str) -> Rewrite {
    let mut count = 0;
    let text = NUMBERS
        .replace_all(text, |caps: &Captures| match spell_out(&caps[0]) {
            Some(spelled) => {
                count += 1;
                spelled
            }
            None => caps[0].to_string(),
        })
        .into_owned();
    (count, text)
}
