//! Raw table model - CSV rows before any interpretation

use std::collections::HashMap;

use serde::Serialize;

/// One CSV data line, keyed by (trimmed) header name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawRow {
    cells: HashMap<String, String>,
}

impl RawRow {
    pub fn new(cells: HashMap<String, String>) -> Self {
        Self { cells }
    }

    /// Raw cell text for a header, if the header exists
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells.get(header).map(String::as_str)
    }

    /// True when every cell is blank
    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.trim().is_empty())
    }
}

/// Parsed CSV file: ordered headers plus rows in file order
#[derive(Debug, Clone, Serialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Delimiter detected in the header line
    pub delimiter: char,
}

impl RawTable {
    pub fn has_header(&self, header: &str) -> bool {
        self.headers.iter().any(|h| h == header)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_row_detection() {
        let mut cells = HashMap::new();
        cells.insert("Datum".to_string(), "  ".to_string());
        cells.insert("Betrag".to_string(), String::new());
        assert!(RawRow::new(cells).is_blank());

        let mut cells = HashMap::new();
        cells.insert("Datum".to_string(), "01.03.25".to_string());
        let row = RawRow::new(cells);
        assert!(!row.is_blank());
        assert_eq!(row.get("Datum"), Some("01.03.25"));
        assert_eq!(row.get("Betrag"), None);
    }
}
