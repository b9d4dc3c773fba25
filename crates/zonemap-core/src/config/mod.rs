use crate::{Error, Result};
use serde_json::{Map, Value, json};
use std::path::Path;

pub const DEFAULT_DOCUMENT_URL_TEMPLATE: &str = "https://drive.google.com/uc?export=view&id={id}";
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

/// Layered JSON configuration.
///
/// User overrides are deep-merged onto [`ZoneMapConfig::defaults`], so every key below is always
/// present unless an override replaces it with something of the wrong shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneMapConfig(Value);

impl Default for ZoneMapConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl ZoneMapConfig {
    pub fn defaults() -> Self {
        Self(json!({
            "feed": {
                "format": "auto",
                "delimiter": ",",
                "rowPolicy": "skip"
            },
            "fields": {
                "id": ["id_geojson", "idgeojson", "zonaid", "zona_id", "zona", "id", "name"],
                "state": ["estado", "state", "status"],
                "document": ["pdf_id", "pdfid", "documento", "document_id", "drive_id", "doc_id", "pdf"],
                "image": ["imagen", "image", "image_url", "foto"],
                "description": ["descripcion", "description", "nombre", "detalle"]
            },
            "polygons": {
                "keyProperty": "Name"
            },
            "documents": {
                "urlTemplate": DEFAULT_DOCUMENT_URL_TEMPLATE
            },
            "refresh": {
                "intervalSecs": DEFAULT_REFRESH_INTERVAL_SECS
            },
            "palette": {
                "default": "#808080",
                "states": {
                    "activo": "#008000",
                    "completado": "#008000",
                    "en proceso": "#ffa500",
                    "pendiente": "#ff0000",
                    "expirado": "#ff0000"
                }
            },
            "style": {
                "borderColor": "white",
                "dashArray": "3",
                "opacity": 0.5,
                "noData": { "weight": 1, "fillOpacity": 0.5 },
                "withData": { "weight": 2, "fillOpacity": 0.7 },
                "highlight": { "weight": 5, "color": "#666", "dashArray": "", "fillOpacity": 0.9 }
            }
        }))
    }

    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Parses an override document; the format follows the file extension (`.yaml`/`.yml`,
    /// `.json5`, anything else is JSON).
    pub fn from_str_with_extension(text: &str, extension: Option<&str>) -> Result<Self> {
        let value: Value = match extension.map(str::to_ascii_lowercase).as_deref() {
            Some("yaml" | "yml") => serde_yaml::from_str(text)?,
            Some("json5") => json5::from_str(text)?,
            _ => serde_json::from_str(text)?,
        };
        if !value.is_object() {
            return Err(Error::Config {
                path: String::new(),
                message: "config root must be an object".to_string(),
            });
        }
        Ok(Self(value))
    }

    /// Loads an override file and merges it onto the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let overrides =
            Self::from_str_with_extension(&text, path.extension().and_then(|e| e.to_str()))?;
        let mut config = Self::defaults();
        config.deep_merge(overrides.as_value());
        Ok(config)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn as_value_mut(&mut self) -> &mut Value {
        &mut self.0
    }

    pub fn get(&self, dotted_path: &str) -> Option<&Value> {
        let mut cur = &self.0;
        for segment in dotted_path.split('.') {
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur)
    }

    pub fn get_str(&self, dotted_path: &str) -> Option<&str> {
        self.get(dotted_path)?.as_str()
    }

    pub fn get_u64(&self, dotted_path: &str) -> Option<u64> {
        self.get(dotted_path)?.as_u64()
    }

    pub fn get_f64(&self, dotted_path: &str) -> Option<f64> {
        self.get(dotted_path)?.as_f64()
    }

    /// Reads a list of strings; a single string is treated as a one-element list.
    pub fn get_str_list(&self, dotted_path: &str) -> Option<Vec<String>> {
        match self.get(dotted_path)? {
            Value::String(s) => Some(vec![s.clone()]),
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn set_value(&mut self, dotted_path: &str, value: Value) {
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }

        let Value::Object(ref mut root) = self.0 else {
            return;
        };
        let mut cur: &mut Map<String, Value> = root;
        let mut segments = dotted_path.split('.').peekable();
        while let Some(seg) = segments.next() {
            if segments.peek().is_none() {
                cur.insert(seg.to_string(), value);
                return;
            }
            let slot = cur.entry(seg).or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Some(next) = slot.as_object_mut() else {
                return;
            };
            cur = next;
        }
    }

    /// Objects merge key by key; any other incoming value (arrays included) replaces the base.
    pub fn deep_merge(&mut self, other: &Value) {
        deep_merge_value(&mut self.0, other);
    }

    pub(crate) fn invalid(&self, path: &str, message: impl Into<String>) -> Error {
        Error::Config {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}
