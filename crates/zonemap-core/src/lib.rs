#![forbid(unsafe_code)]

//! Spreadsheet-backed zone status registry (headless).
//!
//! Pipeline: feed text -> [`feed::Table`] -> [`Registry`] -> per-polygon [`Resolution`] and
//! [`style::ZoneStyle`].
//!
//! Design goals:
//! - tolerate the id formatting drift between spreadsheet exports and polygon layers
//! - deterministic, testable outputs (every stage is a pure function of its input)
//! - runtime-agnostic async APIs (no specific executor required)

pub mod config;
pub mod documents;
pub mod error;
pub mod feed;
pub mod ids;
pub mod join;
pub mod refresh;
pub mod registry;
pub mod style;

pub use config::ZoneMapConfig;
pub use documents::DocumentLinker;
pub use error::{Error, Result};
pub use feed::{FeedFormat, FeedOptions, RowPolicy, Table};
pub use ids::candidate_variants;
pub use join::{MatchKind, Resolution};
pub use refresh::{CycleOutcome, FeedSource, FileSource, MemorySource, Refresher};
pub use registry::{BuildReport, FieldMap, Registry, RegistryBuilder, ZoneStatus};
pub use style::{HighlightStyle, Palette, StyleSettings, ZoneStyle};

use std::time::Duration;

/// Everything derived from one [`ZoneMapConfig`]: feed options, field aliases, palette, style
/// rules and document links.
#[derive(Debug, Clone)]
pub struct Engine {
    config: ZoneMapConfig,
    feed_options: FeedOptions,
    fields: FieldMap,
    palette: Palette,
    style: StyleSettings,
    documents: DocumentLinker,
    key_property: String,
    refresh_interval: Duration,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            config: ZoneMapConfig::defaults(),
            feed_options: FeedOptions::default(),
            fields: FieldMap::default(),
            palette: Palette::default(),
            style: StyleSettings::default(),
            documents: DocumentLinker::default(),
            key_property: "Name".to_string(),
            refresh_interval: Duration::from_secs(config::DEFAULT_REFRESH_INTERVAL_SECS),
        }
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an engine from a complete config (see [`ZoneMapConfig::defaults`] for the shape).
    pub fn from_config(config: ZoneMapConfig) -> Result<Self> {
        let feed_options = feed_options_from_config(&config)?;
        let fields = FieldMap::from_config(&config)?;
        let palette = Palette::from_config(&config)?;
        let style = StyleSettings::from_config(&config);
        let documents = DocumentLinker::from_config(&config)?;
        let key_property = config
            .get_str("polygons.keyProperty")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| config.invalid("polygons.keyProperty", "expected a property name"))?
            .to_string();
        let interval_secs = config
            .get_u64("refresh.intervalSecs")
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                config.invalid("refresh.intervalSecs", "expected a positive number of seconds")
            })?;

        Ok(Self {
            config,
            feed_options,
            fields,
            palette,
            style,
            documents,
            key_property,
            refresh_interval: Duration::from_secs(interval_secs),
        })
    }

    /// Merges `overrides` onto the current config and rebuilds everything derived from it.
    pub fn with_config(self, overrides: &ZoneMapConfig) -> Result<Self> {
        let mut config = self.config;
        config.deep_merge(overrides.as_value());
        Self::from_config(config)
    }

    pub fn config(&self) -> &ZoneMapConfig {
        &self.config
    }

    pub fn feed_options(&self) -> &FeedOptions {
        &self.feed_options
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn style(&self) -> &StyleSettings {
        &self.style
    }

    pub fn documents(&self) -> &DocumentLinker {
        &self.documents
    }

    /// Polygon property holding the zone id (`Name` unless configured otherwise).
    pub fn key_property(&self) -> &str {
        &self.key_property
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Parses feed text into a [`Table`]. CPU-bound; performs no I/O.
    pub fn parse_feed_sync(&self, text: &str) -> Result<Table> {
        feed::parse_feed(text, &self.feed_options)
    }

    pub async fn parse_feed(&self, text: &str) -> Result<Table> {
        self.parse_feed_sync(text)
    }

    /// Parses feed text and builds a generation-0 registry from it.
    pub fn build_registry_sync(&self, text: &str) -> Result<Registry> {
        self.build_registry_at(text, 0)
    }

    pub async fn build_registry(&self, text: &str) -> Result<Registry> {
        self.build_registry_sync(text)
    }

    pub fn build_registry_at(&self, text: &str, generation: u64) -> Result<Registry> {
        let start = std::time::Instant::now();
        let table = self.parse_feed_sync(text)?;
        let registry = RegistryBuilder::new(&self.fields)
            .generation(generation)
            .build(&table)?;
        tracing::debug!(
            generation,
            zones = registry.len(),
            elapsed = ?start.elapsed(),
            input_bytes = text.len(),
            "feed -> registry"
        );
        Ok(registry)
    }

    /// Style for a polygon whose id resolved to `status` (or to nothing).
    pub fn zone_style(&self, status: Option<&ZoneStatus>) -> ZoneStyle {
        self.style.zone_style(&self.palette, status)
    }
}

fn feed_options_from_config(config: &ZoneMapConfig) -> Result<FeedOptions> {
    let format = match config.get_str("feed.format") {
        None => FeedFormat::Auto,
        Some(s) => s
            .parse::<FeedFormat>()
            .map_err(|_| config.invalid("feed.format", format!("unknown feed format `{s}`")))?,
    };
    let row_policy = match config.get_str("feed.rowPolicy") {
        None => RowPolicy::default(),
        Some(s) => s
            .parse::<RowPolicy>()
            .map_err(|_| config.invalid("feed.rowPolicy", format!("unknown row policy `{s}`")))?,
    };
    let delimiter = match config.get_str("feed.delimiter") {
        None => ',',
        Some("tab" | "\\t") => '\t',
        Some(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() && c != '"' && c != '\n' && c != '\r' => c,
                _ => {
                    return Err(config.invalid(
                        "feed.delimiter",
                        format!("expected a single ASCII delimiter character, found `{s}`"),
                    ));
                }
            }
        }
    };
    Ok(FeedOptions {
        format,
        delimiter,
        row_policy,
    })
}

#[cfg(test)]
mod tests;
