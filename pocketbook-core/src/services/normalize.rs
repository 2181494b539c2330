//! Record building - raw rows plus a mapping to candidate records

use crate::domain::{
    map_category, CandidateRecord, ColumnMapping, DateFormatHint, DateSource, RawRow, RawTable,
    DEFAULT_CATEGORY,
};

use super::amount::normalize_amount;
use super::date::normalize_date;

/// Build one candidate record per row, in row order
///
/// Pure: the same table, mapping and hint always give the same records.
pub fn build_records(
    table: &RawTable,
    mapping: &ColumnMapping,
    hint: DateFormatHint,
) -> Vec<CandidateRecord> {
    table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| build_record(idx, row, table, mapping, hint))
        .collect()
}

fn build_record(
    idx: usize,
    row: &RawRow,
    table: &RawTable,
    mapping: &ColumnMapping,
    hint: DateFormatHint,
) -> CandidateRecord {
    let raw_amount = mapped_cell(row, mapping.amount.name());
    let amount = raw_amount.and_then(normalize_amount);

    let description = mapped_cell(row, mapping.description.name())
        .unwrap_or("")
        .to_string();

    let (category, category_details) = match mapped_cell(row, mapping.category.name()) {
        Some(text) => {
            let found = map_category(text);
            let details = found.details();
            (found.category, details)
        }
        None => (DEFAULT_CATEGORY.to_string(), None),
    };

    let raw_date = mapped_cell(row, mapping.date.name());
    let (date, date_source) = match resolve_date(row, table, mapping, raw_date, hint) {
        Some((date, source)) => (Some(date), Some(source)),
        None => (None, None),
    };

    CandidateRecord {
        source_row_index: idx,
        amount,
        description,
        category,
        category_details,
        date,
        date_source,
        raw_amount: raw_amount.map(str::to_string),
        raw_date: raw_date.map(str::to_string),
    }
}

/// Trimmed, non-empty cell text of a mapped column
fn mapped_cell<'a>(row: &'a RawRow, column: Option<&str>) -> Option<&'a str> {
    column
        .and_then(|name| row.get(name))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Date column first, then the description text, then any column the
/// mapping does not use (in header order)
fn resolve_date(
    row: &RawRow,
    table: &RawTable,
    mapping: &ColumnMapping,
    raw_date: Option<&str>,
    hint: DateFormatHint,
) -> Option<(chrono::NaiveDate, DateSource)> {
    if let Some(date) = raw_date.and_then(|v| normalize_date(v, hint)) {
        return Some((date, DateSource::Mapped));
    }

    if let Some(date) =
        mapped_cell(row, mapping.description.name()).and_then(|v| normalize_date(v, hint))
    {
        return Some((date, DateSource::Description));
    }

    table
        .headers
        .iter()
        .filter(|h| !mapping.references(h))
        .find_map(|h| {
            mapped_cell(row, Some(h))
                .and_then(|v| normalize_date(v, hint))
                .map(|date| (date, DateSource::Column(h.clone())))
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::ColumnRef;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let rows = rows
            .iter()
            .map(|cells| {
                let map: HashMap<String, String> = headers
                    .iter()
                    .zip(cells.iter())
                    .map(|(h, c)| (h.clone(), c.to_string()))
                    .collect();
                RawRow::new(map)
            })
            .collect();
        RawTable {
            headers,
            rows,
            delimiter: ',',
        }
    }

    fn mapping(amount: &str, description: &str, category: &str, date: &str) -> ColumnMapping {
        let col = |s: &str| ColumnRef::from(Some(s.to_string()));
        ColumnMapping {
            amount: col(amount),
            description: col(description),
            category: col(category),
            date: col(date),
        }
    }

    #[test]
    fn test_german_export() {
        let t = table(
            &["Datum", "Betrag", "Text"],
            &[&["01.03.25", "-45,50", "REWE Markt"]],
        );
        let m = mapping("Betrag", "Text", "NOT_MAPPED", "Datum");
        let records = build_records(&t, &m, DateFormatHint::Auto);

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.source_row_index, 0);
        assert_eq!(r.amount, Some(Decimal::new(-4550, 2)));
        assert_eq!(r.description, "REWE Markt");
        assert_eq!(r.category, "Other");
        assert_eq!(r.category_details, None);
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(r.date_source, Some(DateSource::Mapped));
        assert_eq!(r.raw_amount.as_deref(), Some("-45,50"));
    }

    #[test]
    fn test_unmapped_fields_get_defaults() {
        let t = table(&["Betrag"], &[&["12,00"]]);
        let m = mapping("Betrag", "NOT_MAPPED", "NOT_MAPPED", "NOT_MAPPED");
        let r = &build_records(&t, &m, DateFormatHint::Auto)[0];

        assert_eq!(r.description, "");
        assert_eq!(r.category, DEFAULT_CATEGORY);
        assert_eq!(r.date, None);
        assert_eq!(r.date_source, None);
        assert_eq!(r.raw_date, None);
    }

    #[test]
    fn test_empty_amount_cell_has_no_raw_text() {
        let t = table(&["Betrag", "Text"], &[&["  ", "x"], &["abc", "y"]]);
        let m = mapping("Betrag", "Text", "NOT_MAPPED", "NOT_MAPPED");
        let records = build_records(&t, &m, DateFormatHint::Auto);

        assert_eq!(records[0].amount, None);
        assert_eq!(records[0].raw_amount, None);
        assert_eq!(records[1].amount, None);
        assert_eq!(records[1].raw_amount.as_deref(), Some("abc"));
    }

    #[test]
    fn test_category_text_is_mapped() {
        let t = table(
            &["Betrag", "Kategorie"],
            &[&["1", "Groceries"], &["2", "Food"], &["3", "Gym"]],
        );
        let m = mapping("Betrag", "NOT_MAPPED", "Kategorie", "NOT_MAPPED");
        let records = build_records(&t, &m, DateFormatHint::Auto);

        assert_eq!(records[0].category, "Food");
        assert_eq!(
            records[0].category_details,
            Some(vec!["Food: Groceries".to_string()])
        );
        assert_eq!(records[1].category, "Food");
        assert_eq!(records[1].category_details, None);
        assert_eq!(records[2].category, "Other");
        assert_eq!(
            records[2].category_details,
            Some(vec!["Other: Gym".to_string()])
        );
    }

    #[test]
    fn test_date_recovered_from_description() {
        let t = table(
            &["Datum", "Betrag", "Text"],
            &[&["", "-5", "KARTENZAHLUNG 01.03.25 REWE"]],
        );
        let m = mapping("Betrag", "Text", "NOT_MAPPED", "Datum");
        let r = &build_records(&t, &m, DateFormatHint::Auto)[0];

        assert_eq!(r.date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(r.date_source, Some(DateSource::Description));
        assert_eq!(r.raw_date, None);
    }

    #[test]
    fn test_date_recovered_from_unmapped_column() {
        let t = table(
            &["Betrag", "Notiz", "Valuta"],
            &[&["-5", "none", "2025-02-17"]],
        );
        let m = mapping("Betrag", "NOT_MAPPED", "NOT_MAPPED", "NOT_MAPPED");
        let r = &build_records(&t, &m, DateFormatHint::Auto)[0];

        assert_eq!(r.date, NaiveDate::from_ymd_opt(2025, 2, 17));
        assert_eq!(r.date_source, Some(DateSource::Column("Valuta".to_string())));
    }

    #[test]
    fn test_mapped_columns_are_not_fallback_sources() {
        // The amount column looks like a date, but it is mapped to amount
        let t = table(&["Betrag"], &[&["01.03.25"]]);
        let m = mapping("Betrag", "NOT_MAPPED", "NOT_MAPPED", "NOT_MAPPED");
        let r = &build_records(&t, &m, DateFormatHint::Auto)[0];
        assert_eq!(r.date, None);
    }

    #[test]
    fn test_explicit_hint_applies_to_fallbacks() {
        let t = table(&["Datum", "Text"], &[&["17.02.2025", "paid 2025-02-18"]]);
        let m = mapping("NOT_MAPPED", "Text", "NOT_MAPPED", "Datum");
        let hint = DateFormatHint::Explicit(crate::domain::DateFormat::Iso);
        let r = &build_records(&t, &m, hint)[0];

        assert_eq!(r.date, NaiveDate::from_ymd_opt(2025, 2, 18));
        assert_eq!(r.date_source, Some(DateSource::Description));
        assert_eq!(r.raw_date.as_deref(), Some("17.02.2025"));
    }

    #[test]
    fn test_build_is_repeatable() {
        let t = table(
            &["Datum", "Betrag", "Text"],
            &[&["01.03.25", "-45,50", "REWE"], &["x", "y", "z"]],
        );
        let m = mapping("Betrag", "Text", "NOT_MAPPED", "Datum");
        let first = build_records(&t, &m, DateFormatHint::Auto);
        let second = build_records(&t, &m, DateFormatHint::Auto);
        assert_eq!(first, second);
    }
}
