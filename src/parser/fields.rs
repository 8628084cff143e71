//! Per-field parsing rules. Pure functions over already-trimmed text.

use std::sync::LazyLock;

use regex::Regex;

static GENERATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bgeneration\s+([0-9]+|[ivxlc]+)\b").unwrap());

/// Marker shown in the abilities cell when an entry has none.
pub const NO_ABILITY: &str = "—";

/// Capitalise the first letter of every run of letters and lower-case the
/// rest. Any non-letter (space, apostrophe, period, digit) starts a new run.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

/// First two whitespace tokens; extra tokens are dropped. A second token equal
/// to the first is dropped too.
pub fn split_categories(text: &str) -> Option<(String, Option<String>)> {
    let titled = title_case(text);
    let mut tokens = titled.split_whitespace();
    let primary = tokens.next()?.to_string();
    let secondary = tokens.next().map(str::to_string).filter(|s| *s != primary);
    Some((primary, secondary))
}

/// Numeric prefix before `unit`, e.g. `"0.7 m (2′04″)"` with `"m"` → `0.7`.
/// `None` for anything that is not a finite positive number.
pub fn parse_measure(text: &str, unit: &str) -> Option<f64> {
    let prefix = text.split(unit).next().unwrap_or("").trim();
    prefix
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

pub fn parse_int(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Abilities {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub hidden: Option<String>,
}

/// Dispatch on line count:
/// - `—` on the first line: no abilities at all
/// - 1 line: primary
/// - 2 lines: primary + hidden (secondary stays empty)
/// - 3 or more: primary, secondary, hidden
pub fn parse_abilities(text: &str) -> Abilities {
    let lines: Vec<&str> = text.trim().split('\n').map(str::trim).collect();
    if lines.first().copied() == Some(NO_ABILITY) {
        return Abilities::default();
    }
    match lines.as_slice() {
        [] => Abilities::default(),
        [first] => Abilities {
            primary: non_empty(strip_ordinal(first)),
            ..Default::default()
        },
        [first, hidden] => Abilities {
            primary: non_empty(strip_ordinal(first)),
            secondary: None,
            hidden: non_empty(strip_note(hidden)),
        },
        [first, second, hidden, ..] => Abilities {
            primary: non_empty(strip_ordinal(first)),
            secondary: non_empty(strip_ordinal(second)),
            hidden: non_empty(strip_note(hidden)),
        },
    }
}

/// `"1. Overgrow"` → `"Overgrow"`: keep what follows the last period.
fn strip_ordinal(line: &str) -> &str {
    line.rsplit('.').next().unwrap_or(line).trim()
}

/// `"Chlorophyll (hidden ability)"` → `"Chlorophyll"`.
fn strip_note(line: &str) -> &str {
    line.split('(').next().unwrap_or(line).trim()
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Ordinal token following the word "Generation" in a descriptive sentence.
pub fn parse_generation(sentence: &str) -> Option<String> {
    GENERATION_RE
        .captures(sentence)
        .map(|c| c[1].to_uppercase())
}
