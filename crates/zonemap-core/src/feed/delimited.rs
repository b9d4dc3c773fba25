use super::{RowPolicy, Table, table_from_records};
use crate::{Error, Result};

/// Splits delimited text into records of fields.
///
/// Quoting follows the usual CSV rules: a doubled `""` inside quotes is a literal quote, and
/// neither the delimiter nor a line break ends a quoted field. Blank lines are skipped and each
/// field is trimmed. Records may have any number of fields; [`table_from_records`] applies the
/// row policy.
pub fn split_records(text: &str, delimiter: char) -> Result<Vec<Vec<String>>> {
    if !delimiter.is_ascii() {
        return Err(Error::FeedParse {
            format: "delimited",
            message: format!("delimiter `{delimiter}` is not a single ASCII character"),
        });
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter as u8)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| Error::FeedParse {
            format: "delimited",
            message: err.to_string(),
        })?;
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(records)
}

/// Parses delimited text whose first record is the header row.
pub fn parse_delimited(text: &str, delimiter: char, policy: RowPolicy) -> Result<Table> {
    let mut records = split_records(text, delimiter)?.into_iter();
    let Some(header) = records.next() else {
        return Err(Error::EmptyFeed);
    };
    if header.iter().all(|h| super::normalize_header(h).is_empty()) {
        return Err(Error::FeedParse {
            format: "delimited",
            message: "header row has no usable column names".to_string(),
        });
    }
    let table = table_from_records(header, records, policy);
    tracing::debug!(
        headers = ?table.headers,
        rows = table.rows.len(),
        mismatched = table.mismatched_rows,
        "parsed delimited feed"
    );
    Ok(table)
}
