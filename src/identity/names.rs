//! Team-name comparison used by the identity resolver.

use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

pub const DEFAULT_SIMILARITY: f64 = 0.90;

/// Tokens that carry no identity: club-form prefixes and suffixes.
const NOISE_TOKENS: &[&str] = &[
    "fc", "afc", "cf", "sc", "ac", "fk", "sk", "bk", "cd", "ud", "club", "the",
];

/// Abbreviations expanded before comparison.
const EXPANSIONS: &[(&str, &str)] = &[("utd", "united"), ("st", "saint")];

/// Prefix matches shorter than this are ignored ("a" is not "arsenal").
const MIN_PREFIX_LEN: usize = 3;

/// Tokens naming a club's women's, reserve or youth side, and the marker
/// they canonicalize to. Age groups (`u17` … `u23`) are recognised apart.
const SQUAD_MARKERS: &[(&str, &str)] = &[
    ("women", "women"),
    ("womens", "women"),
    ("w", "women"),
    ("ladies", "women"),
    ("femenino", "women"),
    ("feminine", "women"),
    ("frauen", "women"),
    ("reserves", "reserves"),
    ("reserve", "reserves"),
    ("res", "reserves"),
    ("ii", "reserves"),
    ("b", "reserves"),
    ("castilla", "reserves"),
    ("youth", "youth"),
];

/// How closely two names agree. Orders from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchQuality {
    /// Prefix run or Jaro-Winkler similarity.
    Fuzzy,
    /// Same canonical tokens.
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Exact,
    Normalized,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NameMatcher {
    /// Case-insensitive equality of the trimmed names.
    Exact,
    /// Canonical token comparison with prefix and Jaro-Winkler fallbacks.
    Normalized { threshold: f64 },
}

impl Default for NameMatcher {
    fn default() -> Self {
        NameMatcher::Normalized {
            threshold: DEFAULT_SIMILARITY,
        }
    }
}

impl NameMatcher {
    pub fn from_mode(mode: MatchMode, threshold: f64) -> Self {
        match mode {
            MatchMode::Exact => NameMatcher::Exact,
            MatchMode::Normalized => NameMatcher::Normalized { threshold },
        }
    }

    /// Cache-key form of a name under this matcher.
    pub fn key(&self, name: &str) -> String {
        match self {
            NameMatcher::Exact => name.trim().to_lowercase(),
            NameMatcher::Normalized { .. } => tokens(name).join(" "),
        }
    }

    pub fn matches(&self, a: &str, b: &str) -> bool {
        self.quality(a, b).is_some()
    }

    /// `None` when the names do not match under this matcher.
    pub fn quality(&self, a: &str, b: &str) -> Option<MatchQuality> {
        match *self {
            NameMatcher::Exact => {
                (a.trim().to_lowercase() == b.trim().to_lowercase()).then_some(MatchQuality::Exact)
            }
            NameMatcher::Normalized { threshold } => normalized_quality(a, b, threshold),
        }
    }
}

/// Normalized comparison. Squad markers must agree exactly, so a senior
/// side never matches its women's, reserve or youth side. The remaining
/// tokens are compared position by position; when counts differ the shorter
/// name must match a run of the longer one starting at its first token, so
/// "Brighton" matches "Brighton Hove Albion" but "Milan" does not match
/// "Inter Milan".
fn normalized_quality(a: &str, b: &str, threshold: f64) -> Option<MatchQuality> {
    let (ca, ma) = split_markers(tokens(a));
    let (cb, mb) = split_markers(tokens(b));
    if ca.is_empty() || cb.is_empty() || ma != mb {
        return None;
    }
    if ca == cb || ca.concat() == cb.concat() {
        return Some(MatchQuality::Exact);
    }
    let (short, long) = if ca.len() <= cb.len() { (&ca, &cb) } else { (&cb, &ca) };
    short
        .iter()
        .zip(long.iter())
        .all(|(x, y)| token_match(x, y, threshold))
        .then_some(MatchQuality::Fuzzy)
}

fn token_match(x: &str, y: &str, threshold: f64) -> bool {
    if x == y {
        return true;
    }
    let prefix = x.len().min(y.len()) >= MIN_PREFIX_LEN && (x.starts_with(y) || y.starts_with(x));
    prefix || jaro_winkler(x, y) >= threshold
}

/// Split canonical tokens into club tokens and a sorted set of squad markers.
fn split_markers(tokens: Vec<String>) -> (Vec<String>, Vec<String>) {
    let (mut markers, core): (Vec<String>, Vec<String>) =
        tokens.into_iter().partition(|t| is_squad_marker(t));
    markers.sort();
    markers.dedup();
    (core, markers)
}

fn is_squad_marker(token: &str) -> bool {
    matches!(token, "women" | "reserves" | "youth") || is_age_group(token)
}

fn is_age_group(token: &str) -> bool {
    token.len() == 3
        && token.starts_with('u')
        && token[1..].parse::<u8>().is_ok_and(|age| (15..=23).contains(&age))
}

/// Lowercase, diacritic-folded, punctuation-free tokens with noise dropped
/// and abbreviations expanded.
pub fn tokens(name: &str) -> Vec<String> {
    let mut folded = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        match fold_char(c) {
            Some(ascii) => folded.push_str(ascii),
            None if c.is_alphanumeric() => folded.push(c),
            None => folded.push(' '),
        }
    }
    let mut out: Vec<String> = Vec::new();
    let mut words = folded.split_whitespace().peekable();
    while let Some(t) = words.next() {
        // "U-21" splits into "u" and "21".
        if t == "u" {
            if let Some(age) = words.next_if(|n| n.chars().all(|c| c.is_ascii_digit())) {
                out.push(format!("u{}", age));
                continue;
            }
        }
        if NOISE_TOKENS.contains(&t) {
            continue;
        }
        let canonical = EXPANSIONS
            .iter()
            .chain(SQUAD_MARKERS)
            .find(|(from, _)| *from == t)
            .map(|(_, to)| *to)
            .unwrap_or(t);
        out.push(canonical.to_string());
    }
    out
}

fn fold_char(c: char) -> Option<&'static str> {
    let s = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ą' => "a",
        'æ' => "ae",
        'ç' | 'č' | 'ć' => "c",
        'ď' | 'đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'ğ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ı' => "i",
        'ł' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ő' => "o",
        'œ' => "oe",
        'ř' => "r",
        'ś' | 'š' | 'ş' => "s",
        'ß' => "ss",
        'ť' | 'ţ' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ů' | 'ű' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        _ => return None,
    };
    Some(s)
}
