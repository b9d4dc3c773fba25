//! Tabular feed parsing.
//!
//! A feed is whatever the spreadsheet publisher hands back: delimited text, a JSONP callback, a
//! `feed.entry` envelope, a row-list envelope or a bare JSON array. Every shape ends up as a
//! [`Table`] whose headers went through [`normalize_header`].

mod delimited;
pub mod json;

use crate::ids::is_invisible;
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::str::FromStr;

pub use delimited::{parse_delimited, split_records};
pub use json::{parse_json_feed, scalar_to_string, strip_jsonp};

/// One feed row, keyed by normalized header.
pub type Row = IndexMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    /// Rows dropped or padded because their field count did not match the header.
    #[serde(skip_serializing_if = "is_zero")]
    pub mismatched_rows: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedFormat {
    #[default]
    Auto,
    Delimited,
    Json,
}

impl FromStr for FeedFormat {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "csv" | "tsv" | "delimited" => Ok(Self::Delimited),
            "json" | "jsonp" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

/// What to do with a data row whose field count differs from the header's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowPolicy {
    /// Drop the row (logged at debug level).
    #[default]
    Skip,
    /// Pad short rows with empty strings and drop extra trailing fields.
    Pad,
}

impl FromStr for RowPolicy {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "pad" => Ok(Self::Pad),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedOptions {
    pub format: FeedFormat,
    pub delimiter: char,
    pub row_policy: RowPolicy,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            format: FeedFormat::Auto,
            delimiter: ',',
            row_policy: RowPolicy::Skip,
        }
    }
}

/// Normalizes a header cell into a row key: invisible characters removed, trimmed, lowercased,
/// every run of whitespace or punctuation collapsed to `_`, with no `_` at either end.
///
/// `"\u{feff}ID GEOJSON"` -> `id_geojson`, `"b,c"` -> `b_c`.
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.chars().filter(|&ch| !is_invisible(ch)) {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Guesses the feed shape from its first meaningful characters.
pub fn detect_format(text: &str) -> FeedFormat {
    let trimmed = text.trim_start_matches(|c: char| c.is_whitespace() || is_invisible(c));
    if trimmed.starts_with('{') || trimmed.starts_with('[') || strip_jsonp(trimmed).is_some() {
        FeedFormat::Json
    } else {
        FeedFormat::Delimited
    }
}

pub fn parse_feed(text: &str, options: &FeedOptions) -> Result<Table> {
    if text.chars().all(|c| c.is_whitespace() || is_invisible(c)) {
        return Err(Error::EmptyFeed);
    }
    let format = match options.format {
        FeedFormat::Auto => detect_format(text),
        other => other,
    };
    match format {
        FeedFormat::Json => parse_json_feed(text, options.row_policy),
        FeedFormat::Delimited | FeedFormat::Auto => {
            parse_delimited(text, options.delimiter, options.row_policy)
        }
    }
}

/// Builds a table from a header row and positional records, applying `policy` to records whose
/// length differs from the header.
pub(crate) fn table_from_records(
    header: Vec<String>,
    records: impl IntoIterator<Item = Vec<String>>,
    policy: RowPolicy,
) -> Table {
    let headers: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();
    let mut table = Table {
        headers,
        ..Default::default()
    };

    for (index, mut record) in records.into_iter().enumerate() {
        if record.len() != table.headers.len() {
            table.mismatched_rows += 1;
            match policy {
                RowPolicy::Skip => {
                    tracing::debug!(
                        line = index + 2,
                        expected = table.headers.len(),
                        found = record.len(),
                        "skipping feed row with mismatched field count"
                    );
                    continue;
                }
                RowPolicy::Pad => {
                    tracing::debug!(
                        line = index + 2,
                        expected = table.headers.len(),
                        found = record.len(),
                        "padding feed row with mismatched field count"
                    );
                    record.resize(table.headers.len(), String::new());
                }
            }
        }

        let mut row = Row::with_capacity(table.headers.len());
        for (key, value) in table.headers.iter().zip(record) {
            // Two headers may normalize to the same key; the first column keeps it.
            row.entry(key.clone()).or_insert(value);
        }
        table.rows.push(row);
    }
    table
}
