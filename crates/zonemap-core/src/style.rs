//! Status -> polygon style.

use crate::config::ZoneMapConfig;
use crate::registry::ZoneStatus;
use crate::Result;
use indexmap::IndexMap;
use serde::Serialize;

/// Lowercases, trims and collapses internal whitespace, so `" En  PROCESO "` -> `"en proceso"`.
pub fn normalize_state(state: &str) -> String {
    state
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Flat categorical state -> color lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    default_color: String,
    states: IndexMap<String, String>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::from_config(&ZoneMapConfig::defaults()).unwrap_or_else(|_| Self {
            default_color: "#808080".to_string(),
            states: IndexMap::new(),
        })
    }
}

impl Palette {
    pub fn new(default_color: impl Into<String>) -> Self {
        Self {
            default_color: default_color.into(),
            states: IndexMap::new(),
        }
    }

    pub fn with_state(mut self, state: &str, color: impl Into<String>) -> Self {
        self.states.insert(normalize_state(state), color.into());
        self
    }

    pub fn from_config(config: &ZoneMapConfig) -> Result<Self> {
        let default_color = config
            .get_str("palette.default")
            .ok_or_else(|| config.invalid("palette.default", "expected a color string"))?;
        let mut palette = Self::new(default_color);
        let states = config
            .get("palette.states")
            .and_then(|v| v.as_object())
            .ok_or_else(|| config.invalid("palette.states", "expected an object"))?;
        for (state, color) in states {
            let Some(color) = color.as_str() else {
                return Err(config.invalid(
                    &format!("palette.states.{state}"),
                    "expected a color string",
                ));
            };
            palette = palette.with_state(state, color);
        }
        Ok(palette)
    }

    pub fn default_color(&self) -> &str {
        &self.default_color
    }

    /// Case-insensitive lookup; unknown or absent states get the neutral default.
    pub fn color_for(&self, state: Option<&str>) -> &str {
        state
            .and_then(|s| self.states.get(&normalize_state(s)))
            .map(String::as_str)
            .unwrap_or(self.default_color.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStyle {
    pub fill_color: String,
    pub weight: f64,
    pub opacity: f64,
    pub color: String,
    pub dash_array: String,
    pub fill_opacity: f64,
}

/// Style overrides applied while the pointer is over a zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightStyle {
    pub weight: f64,
    pub color: String,
    pub dash_array: String,
    pub fill_opacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleSettings {
    pub border_color: String,
    pub dash_array: String,
    pub opacity: f64,
    pub no_data_weight: f64,
    pub no_data_fill_opacity: f64,
    pub with_data_weight: f64,
    pub with_data_fill_opacity: f64,
    pub highlight: HighlightStyle,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            border_color: "white".to_string(),
            dash_array: "3".to_string(),
            opacity: 0.5,
            no_data_weight: 1.0,
            no_data_fill_opacity: 0.5,
            with_data_weight: 2.0,
            with_data_fill_opacity: 0.7,
            highlight: HighlightStyle {
                weight: 5.0,
                color: "#666".to_string(),
                dash_array: String::new(),
                fill_opacity: 0.9,
            },
        }
    }
}

impl StyleSettings {
    /// Reads `style.*`; missing keys keep their defaults.
    pub fn from_config(config: &ZoneMapConfig) -> Self {
        let d = Self::default();
        let num = |path: &str, fallback: f64| config.get_f64(path).unwrap_or(fallback);
        let text = |path: &str, fallback: &str| {
            config.get_str(path).unwrap_or(fallback).to_string()
        };
        Self {
            border_color: text("style.borderColor", &d.border_color),
            dash_array: text("style.dashArray", &d.dash_array),
            opacity: num("style.opacity", d.opacity),
            no_data_weight: num("style.noData.weight", d.no_data_weight),
            no_data_fill_opacity: num("style.noData.fillOpacity", d.no_data_fill_opacity),
            with_data_weight: num("style.withData.weight", d.with_data_weight),
            with_data_fill_opacity: num("style.withData.fillOpacity", d.with_data_fill_opacity),
            highlight: HighlightStyle {
                weight: num("style.highlight.weight", d.highlight.weight),
                color: text("style.highlight.color", &d.highlight.color),
                dash_array: text("style.highlight.dashArray", &d.highlight.dash_array),
                fill_opacity: num("style.highlight.fillOpacity", d.highlight.fill_opacity),
            },
        }
    }

    /// Style for a zone; a resolved entry gets a heavier border and a denser fill than "no data".
    pub fn zone_style(&self, palette: &Palette, status: Option<&ZoneStatus>) -> ZoneStyle {
        let (weight, fill_opacity) = match status {
            Some(_) => (self.with_data_weight, self.with_data_fill_opacity),
            None => (self.no_data_weight, self.no_data_fill_opacity),
        };
        ZoneStyle {
            fill_color: palette
                .color_for(status.map(|s| s.state.as_str()))
                .to_string(),
            weight,
            opacity: self.opacity,
            color: self.border_color.clone(),
            dash_array: self.dash_array.clone(),
            fill_opacity,
        }
    }
}
