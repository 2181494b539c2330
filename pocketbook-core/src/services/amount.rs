//! Amount normalization - locale-agnostic parsing of bank amounts
//!
//! Handles US (`1,234.56`) and European (`1.234,56`) separators, currency
//! symbols, accounting parentheses and leading or trailing minus signs.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

// A zero-led value like `0,125` is a decimal, never a thousands group
static COMMA_GROUPING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9]\d{0,2}(,\d{3})+$").unwrap());
static PERIOD_GROUPING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9]\d{0,2}(\.\d{3}){2,}$").unwrap());

/// Parse a raw amount cell
///
/// Returns None for empty input or anything that is not a number once
/// currency symbols and letters are stripped. The result is negative only
/// when the input says so (minus sign or parentheses).
pub fn normalize_amount(raw: &str) -> Option<Decimal> {
    if raw.trim().is_empty() {
        return None;
    }

    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+' | '(' | ')'))
        .collect();

    let parenthesized = cleaned.contains('(') && cleaned.contains(')');
    let body: String = cleaned.chars().filter(|c| !matches!(c, '(' | ')')).collect();

    let (minus, digits) = split_sign(&body)?;
    let normalized = normalize_separators(digits)?;
    let value = Decimal::from_str(&normalized).ok()?;

    if (parenthesized || minus) && value > Decimal::ZERO {
        Some(-value)
    } else {
        Some(value)
    }
}

/// Strip one leading sign or one trailing minus; any other sign is rejected
fn split_sign(body: &str) -> Option<(bool, &str)> {
    let (minus, rest) = if let Some(rest) = body.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = body.strip_prefix('+') {
        (false, rest)
    } else if let Some(rest) = body.strip_suffix('-') {
        (true, rest)
    } else {
        (false, body)
    };

    if rest.contains(['-', '+']) {
        return None;
    }
    Some((minus, rest))
}

/// Rewrite separators so only a single `.` decimal point remains
fn normalize_separators(s: &str) -> Option<String> {
    let has_comma = s.contains(',');
    let has_period = s.contains('.');

    let out = match (has_comma, has_period) {
        (true, false) => {
            if COMMA_GROUPING.is_match(s) {
                s.replace(',', "")
            } else if s.matches(',').count() == 1 {
                s.replace(',', ".")
            } else {
                return None;
            }
        }
        (true, true) => {
            // The separator that comes last is the decimal point
            let last_comma = s.rfind(',')?;
            let last_period = s.rfind('.')?;
            if last_period > last_comma {
                s.replace(',', "")
            } else {
                s.replace('.', "").replace(',', ".")
            }
        }
        (false, true) if PERIOD_GROUPING.is_match(s) => s.replace('.', ""),
        _ => s.to_string(),
    };

    if out.matches('.').count() > 1 {
        return None;
    }
    Some(out)
}
