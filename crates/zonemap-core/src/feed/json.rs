//! JSON-shaped feeds.
//!
//! Supported shapes, checked in this order:
//! - Google visualization responses: `{"table": {"cols": [...], "rows": [{"c": [...]}]}}`
//! - legacy list feeds: `{"feed": {"entry": [{"gsx$zonaid": {"$t": "7"}}]}}`
//! - Sheets value ranges: `{"values": [["ID", "Estado"], ["7", "Activo"]]}`
//! - row-list envelopes: `{"rows" | "data" | "records" | "items" | "entries": [...]}`
//! - bare arrays of row objects, or of arrays whose first element is the header
//!
//! Any of them may be wrapped in a JSONP callback.

use super::{Row, RowPolicy, Table, normalize_header, table_from_records};
use crate::{Error, Result};
use regex::Regex;
use serde_json::{Map, Value};

const ENVELOPE_KEYS: [&str; 5] = ["rows", "data", "records", "items", "entries"];

fn jsonp_prefix_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:/\*.*?\*/\s*)?[A-Za-z_$][\w$.]*\s*\(").expect("valid regex")
    })
}

/// Returns the JSON payload of a JSONP response (`callback({...});`), or `None` when `text` is
/// not wrapped in a callback.
pub fn strip_jsonp(text: &str) -> Option<&str> {
    let open = jsonp_prefix_regex().find(text)?;
    let body = &text[open.end()..];
    let close = body.rfind(')')?;
    let payload = body[..close].trim();
    if payload.starts_with('{') || payload.starts_with('[') {
        Some(payload)
    } else {
        None
    }
}

/// Renders a JSON cell as the string a spreadsheet would show.
///
/// Numbers keep their JSON spelling (so `7.0` stays `"7.0"` until identifier normalization),
/// `null` becomes empty, and `{"$t": ...}` / `{"v": ...}` cell wrappers are unwrapped.
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(obj) => match obj.get("$t").or_else(|| obj.get("v")) {
            Some(inner) => scalar_to_string(inner),
            None => value.to_string(),
        },
        Value::Array(_) => value.to_string(),
    }
}

pub fn parse_json_feed(text: &str, policy: RowPolicy) -> Result<Table> {
    let text = text.trim_start_matches('\u{feff}');
    let payload = strip_jsonp(text).unwrap_or(text);
    let value: Value = serde_json::from_str(payload.trim())?;
    let table = table_from_value(&value, policy)?;
    tracing::debug!(
        headers = ?table.headers,
        rows = table.rows.len(),
        "parsed JSON feed"
    );
    Ok(table)
}

fn table_from_value(value: &Value, policy: RowPolicy) -> Result<Table> {
    match value {
        Value::Array(items) => table_from_array(items, policy),
        Value::Object(obj) => {
            if let Some(table) = obj.get("table").and_then(Value::as_object) {
                return table_from_visualization(table);
            }
            if let Some(feed) = obj.get("feed").and_then(Value::as_object) {
                let entries = feed
                    .get("entry")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                return Ok(table_from_objects(entries));
            }
            if let Some(values) = obj.get("values").and_then(Value::as_array) {
                return table_from_array(values, policy);
            }
            for key in ENVELOPE_KEYS {
                if let Some(items) = obj.get(key).and_then(Value::as_array) {
                    return table_from_array(items, policy);
                }
            }
            Err(Error::FeedParse {
                format: "json",
                message: format!(
                    "unrecognized feed object (keys: {})",
                    obj.keys().cloned().collect::<Vec<_>>().join(", ")
                ),
            })
        }
        other => Err(Error::FeedParse {
            format: "json",
            message: format!("expected an object or array, found {}", json_kind(other)),
        }),
    }
}

fn table_from_array(items: &[Value], policy: RowPolicy) -> Result<Table> {
    match items.first() {
        None => Ok(Table::default()),
        Some(Value::Array(_)) => {
            let mut records = items.iter().map(|item| match item {
                Value::Array(cells) => cells.iter().map(scalar_to_string).collect::<Vec<_>>(),
                other => vec![scalar_to_string(other)],
            });
            let header = records.next().unwrap_or_default();
            Ok(table_from_records(header, records, policy))
        }
        Some(Value::Object(_)) => Ok(table_from_objects(items)),
        Some(other) => Err(Error::FeedParse {
            format: "json",
            message: format!("expected rows to be objects or arrays, found {}", json_kind(other)),
        }),
    }
}

/// Row objects may disagree on their keys; headers are the union in first-seen order.
fn table_from_objects(items: &[Value]) -> Table {
    let mut table = Table::default();
    for item in items {
        let Some(obj) = item.as_object() else {
            tracing::debug!(kind = json_kind(item), "skipping non-object feed row");
            table.mismatched_rows += 1;
            continue;
        };
        let row = row_from_object(obj);
        for key in row.keys() {
            if !table.headers.contains(key) {
                table.headers.push(key.clone());
            }
        }
        table.rows.push(row);
    }
    table
}

fn row_from_object(obj: &Map<String, Value>) -> Row {
    let has_gsx = obj.keys().any(|k| k.starts_with("gsx$"));
    let mut row = Row::with_capacity(obj.len());
    for (key, value) in obj {
        let name = match key.strip_prefix("gsx$") {
            Some(name) => name,
            // List feeds also carry `id`, `title`, `updated`... metadata next to the columns.
            None if has_gsx => continue,
            None => key.as_str(),
        };
        let name = normalize_header(name);
        if name.is_empty() {
            continue;
        }
        row.entry(name).or_insert_with(|| scalar_to_string(value));
    }
    row
}

fn table_from_visualization(table: &Map<String, Value>) -> Result<Table> {
    let cols = table
        .get("cols")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::FeedParse {
            format: "jsonp",
            message: "visualization table has no `cols`".to_string(),
        })?;
    let header: Vec<String> = cols
        .iter()
        .enumerate()
        .map(|(index, col)| {
            let label = col.get("label").map(scalar_to_string).unwrap_or_default();
            if !label.is_empty() {
                return label;
            }
            col.get("id")
                .map(scalar_to_string)
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("col_{index}"))
        })
        .collect();

    let rows = table
        .get("rows")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    // Visualization rows omit trailing empty cells, so they are always padded.
    let records = rows.iter().map(|row| {
        row.get("c")
            .and_then(Value::as_array)
            .map(|cells| cells.iter().map(scalar_to_string).collect::<Vec<_>>())
            .unwrap_or_default()
    });
    Ok(table_from_records(header, records, RowPolicy::Pad))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_feed_entries_use_gsx_columns() {
        let text = r#"{"feed":{"entry":[
            {"id":{"$t":"x"},"gsx$zonaid":{"$t":"7"},"gsx$estado":{"$t":"Activo"},"gsx$pdfid":{"$t":"abc"}},
            {"gsx$zonaid":{"$t":""},"gsx$estado":{"$t":"Pendiente"},"gsx$pdfid":{"$t":""}}
        ]}}"#;
        let table = parse_json_feed(text, RowPolicy::Skip).unwrap();
        assert_eq!(table.headers, vec!["zonaid", "estado", "pdfid"]);
        assert_eq!(table.rows[0]["zonaid"], "7");
        assert_eq!(table.rows[0]["pdfid"], "abc");
        assert_eq!(table.rows[1]["zonaid"], "");
    }

    #[test]
    fn visualization_jsonp_is_unwrapped() {
        let text = r#"/*O_o*/
google.visualization.Query.setResponse({"version":"0.6","status":"ok","table":{
  "cols":[{"id":"A","label":"ID GEOJSON","type":"number"},{"id":"B","label":"Estado","type":"string"},{"id":"C","label":"","type":"string"}],
  "rows":[{"c":[{"v":7.0,"f":"7"},{"v":"Activo"}]},{"c":[{"v":12},null,{"v":"doc"}]}]}});"#;
        let table = parse_json_feed(text, RowPolicy::Skip).unwrap();
        assert_eq!(table.headers, vec!["id_geojson", "estado", "c"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["id_geojson"], "7.0");
        assert_eq!(table.rows[0]["c"], "");
        assert_eq!(table.rows[1]["estado"], "");
        assert_eq!(table.rows[1]["c"], "doc");
    }

    #[test]
    fn bare_array_of_objects_normalizes_keys() {
        let text = r#"[{"ID_GEOJSON": 3, "Estado": "activo"}, {"idgeojson": "4", "Estado": null}]"#;
        let table = parse_json_feed(text, RowPolicy::Skip).unwrap();
        assert_eq!(table.headers, vec!["id_geojson", "estado", "idgeojson"]);
        assert_eq!(table.rows[0]["id_geojson"], "3");
        assert_eq!(table.rows[1]["estado"], "");
    }

    #[test]
    fn values_envelope_uses_first_row_as_header() {
        let text = r#"{"range":"A1:B3","values":[["ID","Estado"],["1","Activo"],["2"]]}"#;
        let table = parse_json_feed(text, RowPolicy::Pad).unwrap();
        assert_eq!(table.headers, vec!["id", "estado"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1]["estado"], "");
    }

    #[test]
    fn rows_envelope_and_plain_jsonp() {
        let text = r#"handleRows({"rows":[{"zona":"5","estado":"Completado"}]});"#;
        let table = parse_json_feed(text, RowPolicy::Skip).unwrap();
        assert_eq!(table.rows[0]["zona"], "5");
    }

    #[test]
    fn csv_header_with_parentheses_is_not_jsonp() {
        assert_eq!(strip_jsonp("Zona(ID),Estado\n1,activo"), None);
    }

    #[test]
    fn unknown_object_is_a_parse_error() {
        let err = parse_json_feed(r#"{"hello":"world"}"#, RowPolicy::Skip).unwrap_err();
        assert!(matches!(err, Error::FeedParse { .. }));
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = parse_json_feed("[{\"a\":", RowPolicy::Skip).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn scalars_render_like_cells() {
        assert_eq!(scalar_to_string(&serde_json::json!(7.0)), "7.0");
        assert_eq!(scalar_to_string(&serde_json::json!(7)), "7");
        assert_eq!(scalar_to_string(&serde_json::json!(null)), "");
        assert_eq!(scalar_to_string(&serde_json::json!({"$t": " x "})), "x");
    }
}
