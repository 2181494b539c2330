//! CSV parser - uploaded file bytes to a raw table

use std::collections::{HashMap, HashSet};

use csv::ReaderBuilder;

use crate::domain::result::{Error, Result};
use crate::domain::{RawRow, RawTable};

/// Default upper bound on upload size (10 MiB)
pub const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Delimiters considered when sniffing the header line, in tie-break order
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Turns delimited text into header-keyed rows
#[derive(Debug, Clone)]
pub struct CsvParser {
    max_file_bytes: usize,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_BYTES)
    }
}

impl CsvParser {
    pub fn new(max_file_bytes: usize) -> Self {
        Self { max_file_bytes }
    }

    /// Parse file contents into a raw table
    ///
    /// Header cells are trimmed, blank rows dropped, short rows padded with
    /// empty cells. Fails when nothing usable remains.
    pub fn parse(&self, bytes: &[u8]) -> Result<RawTable> {
        if bytes.len() > self.max_file_bytes {
            return Err(Error::parse(format!(
                "file is {} bytes, the limit is {} bytes",
                bytes.len(),
                self.max_file_bytes
            )));
        }

        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::parse(format!("file is not UTF-8 encoded CSV text ({})", e)))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        if text.trim().is_empty() {
            return Err(Error::parse(
                "file is empty, expected a header line followed by data rows",
            ));
        }

        let delimiter = detect_delimiter(text);
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let raw_headers = reader
            .headers()
            .map_err(|e| Error::parse(format!("could not read the header line: {}", e)))?
            .clone();
        let headers = unique_headers(raw_headers.iter().map(str::trim));

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            // +2: one for the header line, one for 1-based numbering
            let record = result
                .map_err(|e| Error::parse(format!("malformed CSV at line {}: {}", idx + 2, e)))?;

            let cells: HashMap<String, String> = headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), record.get(i).unwrap_or("").to_string()))
                .collect();

            let row = RawRow::new(cells);
            if !row.is_blank() {
                rows.push(row);
            }
        }

        if rows.is_empty() {
            return Err(Error::parse(
                "no data found in CSV file, expected a header line followed by at least one data row",
            ));
        }

        Ok(RawTable {
            headers,
            rows,
            delimiter: delimiter as char,
        })
    }
}

/// Pick the candidate delimiter that occurs most often in the header line
///
/// Occurrences inside double quotes are ignored. Comma wins ties and is the
/// default when no candidate occurs at all.
fn detect_delimiter(text: &str) -> u8 {
    let header_line = text.lines().next().unwrap_or("");

    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;
    for byte in header_line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(pos) = CANDIDATE_DELIMITERS.iter().position(|d| *d == byte) {
            counts[pos] += 1;
        }
    }

    let mut best = 0;
    for (i, count) in counts.iter().enumerate() {
        if *count > counts[best] {
            best = i;
        }
    }
    CANDIDATE_DELIMITERS[best]
}

/// Suffix repeated header names (`Betrag`, `Betrag_1`, ...) so row keys stay unique
///
/// A suffix never reuses a name that appears elsewhere in the header line.
fn unique_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let original: Vec<&str> = headers.collect();
    let reserved: HashSet<&str> = original.iter().copied().collect();

    let mut taken: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<&str, usize> = HashMap::new();
    let mut result = Vec::with_capacity(original.len());

    for header in original {
        let name = if taken.contains(header) {
            let suffix = next_suffix.entry(header).or_insert(1);
            loop {
                let candidate = format!("{}_{}", header, suffix);
                *suffix += 1;
                if !taken.contains(&candidate) && !reserved.contains(candidate.as_str()) {
                    break candidate;
                }
            }
        } else {
            header.to_string()
        };
        taken.insert(name.clone());
        result.push(name);
    }
    result
}
