//! Fraction primitives: parsing, value comparison, token scanning in prose,
//! and the "greater/less than X" pivot buckets.

use std::cmp::Ordering;
use std::fmt;

use crate::exercise_engine::text::normalize;

/// A non-negative fraction `num/den` with `den > 0`. Not reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    pub num: u32,
    pub den: u32,
}

impl Fraction {
    pub fn new(num: u32, den: u32) -> Option<Self> {
        (den > 0).then_some(Fraction { num, den })
    }

    /// Parse a whole string of the form `a/b` (spaces around `/` allowed).
    pub fn parse(s: &str) -> Option<Self> {
        let (a, b) = s.trim().split_once('/')?;
        let (a, b) = (a.trim(), b.trim());
        if a.is_empty() || b.is_empty() {
            return None;
        }
        if !a.bytes().all(|c| c.is_ascii_digit()) || !b.bytes().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Fraction::new(a.parse().ok()?, b.parse().ok()?)
    }

    pub fn is_proper(self) -> bool {
        self.num < self.den
    }

    /// Same rational value (`1/2` ~ `2/4`).
    pub fn equivalent(self, other: Fraction) -> bool {
        self.cmp_value(other) == Ordering::Equal
    }

    pub fn cmp_value(self, other: Fraction) -> Ordering {
        let lhs = u64::from(self.num) * u64::from(other.den);
        let rhs = u64::from(other.num) * u64::from(self.den);
        lhs.cmp(&rhs)
    }

    pub fn scale(self, k: u32) -> Fraction {
        Fraction { num: self.num * k, den: self.den * k }
    }

    /// `Some(k)` when `self == base * k` term by term, `k >= 1`.
    pub fn multiple_of(self, base: Fraction) -> Option<u32> {
        if base.num == 0 || self.num % base.num != 0 || self.den % base.den != 0 {
            return None;
        }
        let k = self.num / base.num;
        (k >= 1 && self.den / base.den == k).then_some(k)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Whole-string integer.
pub fn parse_int(s: &str) -> Option<u32> {
    let t = s.trim();
    if t.is_empty() || !t.bytes().all(|c| c.is_ascii_digit()) {
        return None;
    }
    t.parse().ok()
}

/// Whole-string percentage like `"25%"` or `"25 %"`.
pub fn parse_percent(s: &str) -> Option<u32> {
    parse_int(s.trim().strip_suffix('%')?)
}

/// Any numeric string as a fraction: `a/b`, `n` (n/1) or `n%` (n/100).
pub fn parse_value(s: &str) -> Option<Fraction> {
    Fraction::parse(s)
        .or_else(|| parse_int(s).and_then(|n| Fraction::new(n, 1)))
        .or_else(|| parse_percent(s).and_then(|n| Fraction::new(n, 100)))
}

/// Two numeric strings with the same value.
pub fn same_value(a: &str, b: &str) -> bool {
    match (parse_value(a), parse_value(b)) {
        (Some(x), Some(y)) => x.equivalent(y),
        _ => false,
    }
}

/// A fraction found inside prose, with its byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FractionToken {
    pub start: usize,
    pub end: usize,
    pub fraction: Fraction,
}

fn digit_run(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    i
}

fn space_run(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() && bytes[i] == b' ' {
        i += 1;
    }
    i
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Find every `a/b` token bounded by non-word characters.
///
/// `max_digits` limits each side (the bank templates only ever vary one- or
/// two-digit terms); `None` accepts any length.
pub fn scan_fractions(text: &str, max_digits: Option<usize>) -> Vec<FractionToken> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() || (i > 0 && is_word_byte(bytes[i - 1])) {
            i += 1;
            continue;
        }
        let num_end = digit_run(bytes, i);
        let slash = space_run(bytes, num_end);
        if slash >= bytes.len() || bytes[slash] != b'/' {
            i = num_end;
            continue;
        }
        let den_start = space_run(bytes, slash + 1);
        let den_end = digit_run(bytes, den_start);
        let bounded = den_end > den_start && (den_end == bytes.len() || !is_word_byte(bytes[den_end]));
        let short_enough = max_digits
            .map(|m| num_end - i <= m && den_end - den_start <= m)
            .unwrap_or(true);
        if bounded && short_enough {
            let parsed = text[i..num_end]
                .parse::<u32>()
                .ok()
                .zip(text[den_start..den_end].parse::<u32>().ok())
                .and_then(|(a, b)| Fraction::new(a, b));
            if let Some(fraction) = parsed {
                out.push(FractionToken { start: i, end: den_end, fraction });
                i = den_end;
                continue;
            }
        }
        i = num_end.max(i + 1);
    }
    out
}

/// Rewrite every fraction token in `text` through `f`.
pub fn replace_fractions(
    text: &str,
    max_digits: Option<usize>,
    mut f: impl FnMut(Fraction) -> Fraction,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for tok in scan_fractions(text, max_digits) {
        out.push_str(&text[cursor..tok.start]);
        out.push_str(&f(tok.fraction).to_string());
        cursor = tok.end;
    }
    out.push_str(&text[cursor..]);
    out
}

// ---------------------------------------------------------------------------
// Pivot buckets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    GreaterOrEqual,
    Greater,
    LessOrEqual,
    Less,
    Equal,
}

impl Comparison {
    pub fn accepts(self, ord: Ordering) -> bool {
        match self {
            Comparison::GreaterOrEqual => ord != Ordering::Less,
            Comparison::Greater        => ord == Ordering::Greater,
            Comparison::LessOrEqual    => ord != Ordering::Greater,
            Comparison::Less           => ord == Ordering::Less,
            Comparison::Equal          => ord == Ordering::Equal,
        }
    }
}

/// Inclusive phrases first so "greater than or equal" never reads as "greater than".
const COMPARISON_PHRASES: &[(&str, Comparison)] = &[
    ("greater than or equal to", Comparison::GreaterOrEqual),
    ("greater than or equal", Comparison::GreaterOrEqual),
    ("more than or equal to", Comparison::GreaterOrEqual),
    ("at least", Comparison::GreaterOrEqual),
    ("mayor o igual que", Comparison::GreaterOrEqual),
    ("mayor o igual a", Comparison::GreaterOrEqual),
    (">=", Comparison::GreaterOrEqual),
    ("≥", Comparison::GreaterOrEqual),
    ("less than or equal to", Comparison::LessOrEqual),
    ("less than or equal", Comparison::LessOrEqual),
    ("at most", Comparison::LessOrEqual),
    ("menor o igual que", Comparison::LessOrEqual),
    ("menor o igual a", Comparison::LessOrEqual),
    ("<=", Comparison::LessOrEqual),
    ("≤", Comparison::LessOrEqual),
    ("greater than", Comparison::Greater),
    ("more than", Comparison::Greater),
    ("bigger than", Comparison::Greater),
    ("mayor que", Comparison::Greater),
    ("más que", Comparison::Greater),
    ("mas que", Comparison::Greater),
    (">", Comparison::Greater),
    ("less than", Comparison::Less),
    ("smaller than", Comparison::Less),
    ("fewer than", Comparison::Less),
    ("menor que", Comparison::Less),
    ("menos que", Comparison::Less),
    ("<", Comparison::Less),
    ("equal to", Comparison::Equal),
    ("igual a", Comparison::Equal),
    ("=", Comparison::Equal),
];

/// A bucket defined relative to a reference value, e.g. "Less than 3/5".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PivotBucket {
    pub comparison: Comparison,
    pub pivot: Fraction,
}

impl PivotBucket {
    pub fn parse(bucket: &str) -> Option<Self> {
        let key = normalize(bucket);
        let (at, phrase, comparison) = COMPARISON_PHRASES
            .iter()
            .find_map(|(p, c)| key.find(p).map(|at| (at, *p, *c)))?;
        let rest = &key[at + phrase.len()..];
        let pivot = first_value(rest)?;
        Some(PivotBucket { comparison, pivot })
    }

    pub fn accepts(&self, value: Fraction) -> bool {
        self.comparison.accepts(value.cmp_value(self.pivot))
    }
}

fn first_value(text: &str) -> Option<Fraction> {
    if let Some(tok) = scan_fractions(text, None).first() {
        return Some(tok.fraction);
    }
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_ascii_digit() && c != '%'))
        .find_map(parse_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fraction_strings() {
        assert_eq!(Fraction::parse("3/4"), Fraction::new(3, 4));
        assert_eq!(Fraction::parse(" 3 / 4 "), Fraction::new(3, 4));
        assert_eq!(Fraction::parse("3/0"), None);
        assert_eq!(Fraction::parse("3/4x"), None);
        assert_eq!(parse_value("25%"), Fraction::new(25, 100));
        assert_eq!(parse_value("7"), Fraction::new(7, 1));
    }

    #[test]
    fn equivalence_and_multiples() {
        let half = Fraction { num: 1, den: 2 };
        assert!(half.equivalent(Fraction { num: 3, den: 6 }));
        assert!(!half.equivalent(Fraction { num: 2, den: 3 }));
        assert_eq!(Fraction { num: 3, den: 6 }.multiple_of(half), Some(3));
        assert_eq!(Fraction { num: 2, den: 5 }.multiple_of(half), None);
        assert!(same_value("50%", "1/2"));
    }

    #[test]
    fn scans_fractions_in_prose() {
        let toks = scan_fractions("Which is greater: 3/8 or 5 / 8? Not 123/4567x.", Some(2));
        let found: Vec<String> = toks.iter().map(|t| t.fraction.to_string()).collect();
        assert_eq!(found, vec!["3/8", "5/8"]);
        let replaced = replace_fractions("1/2 and 2/3", None, |f| f.scale(2));
        assert_eq!(replaced, "2/4 and 4/6");
    }

    #[test]
    fn pivot_buckets_parse_comparison_and_value() {
        let ge = PivotBucket::parse("Greater than or equal to 3/5").unwrap();
        assert_eq!(ge.comparison, Comparison::GreaterOrEqual);
        assert_eq!(ge.pivot, Fraction { num: 3, den: 5 });
        assert!(ge.accepts(Fraction { num: 6, den: 10 }));

        let lt = PivotBucket::parse("Menor que 1/2").unwrap();
        assert_eq!(lt.comparison, Comparison::Less);
        assert!(!lt.accepts(Fraction { num: 2, den: 4 }));

        let pct = PivotBucket::parse("More than 50%").unwrap();
        assert_eq!(pct.pivot, Fraction { num: 50, den: 100 });
        assert!(PivotBucket::parse("Correct").is_none());
    }
}
