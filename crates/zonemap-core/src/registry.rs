//! Zone registry: the per-cycle mapping from zone id to status.
//!
//! A [`Registry`] is built wholesale from one parsed feed and never mutated afterwards; a refresh
//! produces a new value that replaces the old one.

use crate::config::ZoneMapConfig;
use crate::feed::{Row, Table, normalize_header};
use crate::ids::canonical_key;
use crate::join::{self, Resolution};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStatus {
    pub id: String,
    /// Free text as written in the feed; matched case-insensitively when styling.
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_document_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Header aliases for each logical field, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    pub id: Vec<String>,
    pub state: Vec<String>,
    pub document: Vec<String>,
    pub image: Vec<String>,
    pub description: Vec<String>,
}

impl Default for FieldMap {
    fn default() -> Self {
        // Defaults always carry every list.
        Self::from_config(&ZoneMapConfig::defaults()).unwrap_or_else(|_| Self::empty())
    }
}

impl FieldMap {
    fn empty() -> Self {
        Self {
            id: Vec::new(),
            state: Vec::new(),
            document: Vec::new(),
            image: Vec::new(),
            description: Vec::new(),
        }
    }

    pub fn from_config(config: &ZoneMapConfig) -> Result<Self> {
        let list = |field: &str| -> Result<Vec<String>> {
            let path = format!("fields.{field}");
            let aliases = config
                .get_str_list(&path)
                .ok_or_else(|| config.invalid(&path, "expected a string or a list of strings"))?;
            Ok(aliases.iter().map(|a| normalize_header(a)).collect())
        };
        let map = Self {
            id: list("id")?,
            state: list("state")?,
            document: list("document")?,
            image: list("image")?,
            description: list("description")?,
        };
        if map.id.is_empty() {
            return Err(config.invalid("fields.id", "at least one identifier alias is required"));
        }
        Ok(map)
    }

    /// Picks, for each logical field, the first alias present among `headers`. Aliases also match
    /// headers that differ only by underscores or accents (`id_geojson` ~ `idgeojson`,
    /// `descripcion` ~ `descripción`).
    pub fn resolve(&self, headers: &[String]) -> Result<Columns> {
        let find = |aliases: &[String]| -> Option<String> {
            aliases.iter().find_map(|alias| {
                headers
                    .iter()
                    .find(|h| *h == alias)
                    .or_else(|| {
                        let folded = fold_header(alias);
                        headers.iter().find(|h| fold_header(h) == folded)
                    })
                    .cloned()
            })
        };
        let Some(id) = find(&self.id) else {
            return Err(Error::MissingIdColumn {
                headers: headers.join(", "),
            });
        };
        Ok(Columns {
            id,
            state: find(&self.state),
            document: find(&self.document),
            image: find(&self.image),
            description: find(&self.description),
        })
    }
}

/// Concrete feed headers chosen for each logical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Columns {
    pub id: String,
    pub state: Option<String>,
    pub document: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub rows_seen: usize,
    pub rows_without_id: usize,
    /// Identifiers that appeared more than once; the last row wins.
    pub duplicate_ids: Vec<String>,
    pub mismatched_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    generation: u64,
    built_at: DateTime<Utc>,
    columns: Option<Columns>,
    zones: IndexMap<String, ZoneStatus>,
    report: BuildReport,
    #[serde(skip)]
    lookup: FxHashMap<String, String>,
}

impl Registry {
    /// A registry with no zones, e.g. for a feed that has headers but no rows.
    pub fn empty(generation: u64) -> Self {
        Self {
            generation,
            built_at: Utc::now(),
            columns: None,
            zones: IndexMap::new(),
            report: BuildReport::default(),
            lookup: FxHashMap::default(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn columns(&self) -> Option<&Columns> {
        self.columns.as_ref()
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ZoneStatus> {
        self.zones.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.zones.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ZoneStatus)> {
        self.zones.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolves a raw polygon identifier to a registry key; see [`join::resolve`].
    pub fn resolve(&self, raw: Option<&str>) -> Option<Resolution> {
        join::resolve(self, raw)
    }

    /// Resolves and returns the matched status in one step.
    pub fn lookup(&self, raw: Option<&str>) -> Option<(Resolution, &ZoneStatus)> {
        let resolution = self.resolve(raw)?;
        let status = self.zones.get(&resolution.key)?;
        Some((resolution, status))
    }

    pub(crate) fn variant_table(&self) -> &FxHashMap<String, String> {
        &self.lookup
    }
}

pub struct RegistryBuilder<'a> {
    fields: &'a FieldMap,
    generation: u64,
}

impl<'a> RegistryBuilder<'a> {
    pub fn new(fields: &'a FieldMap) -> Self {
        Self {
            fields,
            generation: 0,
        }
    }

    pub fn generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn build(self, table: &Table) -> Result<Registry> {
        let mut registry = Registry::empty(self.generation);
        registry.report.mismatched_rows = table.mismatched_rows;
        if table.headers.is_empty() && table.rows.is_empty() {
            return Ok(registry);
        }

        let columns = self.fields.resolve(&table.headers)?;
        for row in &table.rows {
            registry.report.rows_seen += 1;
            let raw_id = cell(row, Some(&columns.id)).unwrap_or_default();
            let Some(key) = canonical_key(&raw_id) else {
                registry.report.rows_without_id += 1;
                continue;
            };

            let status = ZoneStatus {
                id: key.clone(),
                state: cell(row, columns.state.as_ref()).unwrap_or_default(),
                linked_document_id: cell(row, columns.document.as_ref()),
                image_url: cell(row, columns.image.as_ref()),
                description: cell(row, columns.description.as_ref()),
            };
            if registry.zones.insert(key.clone(), status).is_some() {
                tracing::debug!(zone = %key, "duplicate zone id in feed; last row wins");
                if !registry.report.duplicate_ids.contains(&key) {
                    registry.report.duplicate_ids.push(key);
                }
            }
        }

        registry.lookup = join::build_variant_table(registry.zones.keys());
        registry.columns = Some(columns);
        tracing::debug!(
            generation = registry.generation,
            zones = registry.zones.len(),
            rows = registry.report.rows_seen,
            without_id = registry.report.rows_without_id,
            "built zone registry"
        );
        Ok(registry)
    }
}

fn fold_header(header: &str) -> String {
    header
        .chars()
        .filter(|&ch| ch != '_')
        .map(|ch| match ch {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

fn cell(row: &Row, column: Option<&String>) -> Option<String> {
    let value = row.get(column?)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{RowPolicy, parse_delimited};

    fn build(csv: &str) -> Registry {
        let table = parse_delimited(csv, ',', RowPolicy::Skip).unwrap();
        RegistryBuilder::new(&FieldMap::default())
            .build(&table)
            .unwrap()
    }

    #[test]
    fn empty_identifiers_never_become_keys() {
        let reg = build("ID GEOJSON,Estado\n1,Activo\n   ,Pendiente\n,Expirado\n\u{feff},Activo");
        assert_eq!(reg.len(), 1);
        assert!(!reg.contains_key(""));
        assert!(reg.keys().all(|k| !k.trim().is_empty()));
        assert_eq!(reg.report().rows_without_id, 3);
    }

    #[test]
    fn keys_come_from_normalized_identifier_column() {
        let reg = build("idgeojson,estado,pdf id\n 007 ,Activo,abc\n12.0,pendiente,");
        let keys: Vec<&str> = reg.keys().collect();
        assert_eq!(keys, vec!["007", "12"]);
        let z = reg.get("007").unwrap();
        assert_eq!(z.state, "Activo");
        assert_eq!(z.linked_document_id.as_deref(), Some("abc"));
        assert_eq!(reg.get("12").unwrap().linked_document_id, None);
    }

    #[test]
    fn duplicate_ids_keep_last_row() {
        let reg = build("id,estado\n5,pendiente\n5,completado");
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("5").unwrap().state, "completado");
        assert_eq!(reg.report().duplicate_ids, vec!["5".to_string()]);
    }

    #[test]
    fn missing_identifier_column_is_an_error() {
        let table = parse_delimited("estado,foo\nactivo,1", ',', RowPolicy::Skip).unwrap();
        let err = RegistryBuilder::new(&FieldMap::default())
            .build(&table)
            .unwrap_err();
        assert!(matches!(err, Error::MissingIdColumn { .. }));
    }

    #[test]
    fn optional_columns_are_picked_up() {
        let reg = build("Zona ID,Estado,Imagen,Descripción\n3,Activo,https://x/y.png,Parque norte");
        let z = reg.get("3").unwrap();
        assert_eq!(z.image_url.as_deref(), Some("https://x/y.png"));
        assert_eq!(z.description.as_deref(), Some("Parque norte"));
        assert_eq!(reg.columns().unwrap().id, "zona_id");
    }

    #[test]
    fn generation_is_stamped() {
        let table = parse_delimited("id,estado\n1,activo", ',', RowPolicy::Skip).unwrap();
        let reg = RegistryBuilder::new(&FieldMap::default())
            .generation(9)
            .build(&table)
            .unwrap();
        assert_eq!(reg.generation(), 9);
    }
}
