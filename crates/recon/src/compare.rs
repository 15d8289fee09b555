//! Value normalization and equality.
//!
//! One definition of "the same value" for the whole engine: alias source
//! matching and confirmation/booking comparison both go through [`normalize`].
//!
//! Canonical forms:
//! - strings are trimmed and lower-cased;
//! - plain decimal literals (`[+-]?digits[.digits]`) drop redundant trailing
//!   fractional zeros, a leading `+`, and the sign of zero (`"100.0"` → `"100"`);
//! - numbers render through the shortest round-trip `f64` display and then
//!   follow the decimal rule, so `100.0` and `"100"` agree;
//! - booleans become `"true"` / `"false"`.
//!
//! Leading integer zeros are kept: `"007"` and `"7"` are different values.

use crate::model::{FieldValue, Scalar};

/// Canonical string form of a value. `None` stays `None`.
pub fn normalize(value: &FieldValue) -> Option<String> {
    value.as_ref().map(normalize_scalar)
}

pub fn normalize_scalar(value: &Scalar) -> String {
    match value {
        Scalar::String(s) => normalize_text(s),
        Scalar::Number(n) => normalize_text(&n.to_string()),
        Scalar::Bool(b) => normalize_text(if *b { "true" } else { "false" }),
    }
}

pub fn normalize_text(s: &str) -> String {
    let folded = s.trim().to_lowercase();
    canonical_decimal(&folded).unwrap_or(folded)
}

/// Loose equality: both absent, or both present with the same canonical form.
pub fn equal(a: &FieldValue, b: &FieldValue) -> bool {
    match (normalize(a), normalize(b)) {
        (None, None) => true,
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Rewrite a plain decimal literal into canonical form, or `None` if `s` is
/// not one.
fn canonical_decimal(s: &str) -> Option<String> {
    let (negative, unsigned) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let frac = match frac_part {
        Some(f) if f.is_empty() || !f.bytes().all(|b| b.is_ascii_digit()) => return None,
        Some(f) => f.trim_end_matches('0'),
        None => "",
    };

    let is_zero = int_part.bytes().all(|b| b == b'0') && frac.is_empty();

    let mut out = String::with_capacity(s.len());
    if negative && !is_zero {
        out.push('-');
    }
    out.push_str(int_part);
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    Some(out)
}
