//! Column detection - guess which CSV header feeds which field

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::result::{Error, Result};
use crate::domain::{ColumnMapping, ColumnRef, Field};

/// Header vocabularies per field, strongest match first.
/// Fields are assigned in this order and a claimed header is not reused.
const VOCABULARY: &[(Field, &[&str])] = &[
    (
        Field::Date,
        &["buchungsdatum", "buchungstag", "datum", "date", "valuta", "wertstellung"],
    ),
    (
        Field::Amount,
        &["betrag", "amount", "umsatz", r"\bsum", "total", "value", "wert", "euro"],
    ),
    (
        Field::Description,
        &[
            "verwendungszweck",
            "beschreibung",
            "description",
            "buchungstext",
            "text",
            "memo",
            "payee",
            "details",
        ],
    ),
    (Field::Category, &["kategorie", "category"]),
];

static PATTERNS: LazyLock<Vec<(Field, Vec<Regex>)>> = LazyLock::new(|| {
    VOCABULARY
        .iter()
        .map(|(field, words)| {
            let regexes = words
                .iter()
                .map(|w| Regex::new(&format!("(?i){}", w)).unwrap())
                .collect();
            (*field, regexes)
        })
        .collect()
});

/// Best-effort initial mapping from header names
///
/// Fields without a matching header are left unmapped.
pub fn detect_columns(headers: &[String]) -> ColumnMapping {
    let mut mapping = ColumnMapping::default();
    let mut claimed: HashSet<&str> = HashSet::new();

    for (field, regexes) in PATTERNS.iter() {
        let found = regexes.iter().find_map(|re| {
            headers
                .iter()
                .find(|h| !claimed.contains(h.as_str()) && re.is_match(h))
        });

        if let Some(header) = found {
            claimed.insert(header.as_str());
            mapping.set(*field, ColumnRef::column(header.clone()));
        }
    }

    mapping
}

/// Check a user override against the uploaded headers
pub fn check_override(headers: &[String], field: Field, column: &ColumnRef) -> Result<()> {
    match column.name() {
        Some(name) if !headers.iter().any(|h| h == name) => Err(Error::validation(format!(
            "Column '{}' selected for {} does not exist in the file",
            name, field
        ))),
        _ => Ok(()),
    }
}
