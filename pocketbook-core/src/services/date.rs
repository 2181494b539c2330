//! Date normalization - multi-format date extraction from bank exports
//!
//! With an explicit format only that format is tried. In auto mode the
//! cascade is: date-like substrings embedded anywhere in the text (by pattern
//! priority), then whole-string formats, then free-text forms with month
//! names. Two-digit years pivot at 50: `00-49` are 20xx, `50-99` are 19xx.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};

use crate::domain::{DateFormat, DateFormatHint};

/// Field order of the three numeric capture groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Order {
    DayMonthYear,
    MonthDayYear,
    YearMonthDay,
}

struct DatePattern {
    regex: Regex,
    order: Order,
}

impl DatePattern {
    fn new(pattern: &str, order: Order) -> Self {
        Self {
            regex: Regex::new(pattern).unwrap(),
            order,
        }
    }

    /// First occurrence in the text that forms a real calendar date
    fn extract(&self, text: &str) -> Option<NaiveDate> {
        self.extract_as(text, self.order)
    }

    fn extract_as(&self, text: &str, order: Order) -> Option<NaiveDate> {
        self.regex
            .captures_iter(text)
            .find_map(|caps| date_from_captures(&caps, order))
    }
}

static DOTTED_SHORT: LazyLock<DatePattern> = LazyLock::new(|| {
    DatePattern::new(r"(?:^|\D)(\d{1,2})\.(\d{1,2})\.(\d{2})(?:\D|$)", Order::DayMonthYear)
});
static DOTTED: LazyLock<DatePattern> = LazyLock::new(|| {
    DatePattern::new(r"(?:^|\D)(\d{1,2})\.(\d{1,2})\.(\d{4})(?:\D|$)", Order::DayMonthYear)
});
static ISO: LazyLock<DatePattern> = LazyLock::new(|| {
    DatePattern::new(r"(?:^|\D)(\d{4})-(\d{1,2})-(\d{1,2})(?:\D|$)", Order::YearMonthDay)
});
static US_SLASH: LazyLock<DatePattern> = LazyLock::new(|| {
    DatePattern::new(r"(?:^|\D)(\d{1,2})/(\d{1,2})/(\d{4})(?:\D|$)", Order::MonthDayYear)
});
static DASHED: LazyLock<DatePattern> = LazyLock::new(|| {
    DatePattern::new(r"(?:^|\D)(\d{1,2})-(\d{1,2})-(\d{4})(?:\D|$)", Order::DayMonthYear)
});

/// Whole-string formats tried when no embedded pattern matched
const CANDIDATE_FORMATS: &[&str] = &[
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y.%m.%d",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const CANDIDATE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

static DAY_MONTH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^\d])(\d{1,2})\.?\s+([a-zäöü]{3,9})\.?,?\s+(\d{4})(?:\D|$)").unwrap()
});
static MONTH_NAME_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-zäöü])([a-zäöü]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})(?:\D|$)")
        .unwrap()
});

/// Parse a raw date cell
///
/// Never fails loudly: returns None once every strategy allowed by the
/// hint is exhausted. The result depends only on the inputs.
pub fn normalize_date(raw: &str, hint: DateFormatHint) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    match hint {
        DateFormatHint::Explicit(format) => explicit_pattern(format).extract(text),
        DateFormatHint::Auto => parse_embedded(text)
            .or_else(|| parse_candidate_formats(text))
            .or_else(|| parse_free_text(text)),
    }
}

/// Substring patterns in priority order
fn parse_embedded(text: &str) -> Option<NaiveDate> {
    DOTTED_SHORT
        .extract(text)
        .or_else(|| DOTTED.extract(text))
        .or_else(|| ISO.extract(text))
        .or_else(|| {
            // 17/02/2025 cannot be month-first, so read it day-first
            US_SLASH
                .extract(text)
                .or_else(|| US_SLASH.extract_as(text, Order::DayMonthYear))
        })
        .or_else(|| DASHED.extract(text))
}

fn explicit_pattern(format: DateFormat) -> &'static DatePattern {
    match format {
        DateFormat::DayMonthShortYear => &DOTTED_SHORT,
        DateFormat::DayMonthYear => &DOTTED,
        DateFormat::UsSlash => &US_SLASH,
        DateFormat::Iso => &ISO,
    }
}

fn parse_candidate_formats(text: &str) -> Option<NaiveDate> {
    CANDIDATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            CANDIDATE_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn parse_free_text(text: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.date_naive());
    }

    DAY_MONTH_NAME
        .captures_iter(text)
        .find_map(|caps| {
            let day = caps[1].parse().ok()?;
            let month = month_from_name(&caps[2])?;
            let year = caps[3].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        })
        .or_else(|| {
            MONTH_NAME_DAY.captures_iter(text).find_map(|caps| {
                let month = month_from_name(&caps[1])?;
                let day = caps[2].parse().ok()?;
                let year = caps[3].parse().ok()?;
                NaiveDate::from_ymd_opt(year, month, day)
            })
        })
}

/// English and German month names, matched on their first three letters
fn month_from_name(name: &str) -> Option<u32> {
    let prefix: String = name.to_lowercase().chars().take(3).collect();
    let month = match prefix.as_str() {
        "jan" | "jän" => 1,
        "feb" => 2,
        "mar" | "mär" => 3,
        "apr" => 4,
        "may" | "mai" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" | "okt" => 10,
        "nov" => 11,
        "dec" | "dez" => 12,
        _ => return None,
    };
    Some(month)
}

fn date_from_captures(caps: &Captures<'_>, order: Order) -> Option<NaiveDate> {
    let a = &caps[1];
    let b = &caps[2];
    let c = &caps[3];

    let (year, month, day) = match order {
        Order::DayMonthYear => (c, b, a),
        Order::MonthDayYear => (c, a, b),
        Order::YearMonthDay => (a, b, c),
    };

    let year = expand_year(year)?;
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

/// Four-digit years pass through; two-digit years pivot at 50
fn expand_year(year: &str) -> Option<i32> {
    let value: i32 = year.parse().ok()?;
    if year.len() == 2 {
        Some(if value < 50 { 2000 + value } else { 1900 + value })
    } else {
        Some(value)
    }
}
