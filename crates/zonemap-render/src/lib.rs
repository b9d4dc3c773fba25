#![forbid(unsafe_code)]

//! Polygon side of the zone map: joins a [`Registry`] onto a GeoJSON polygon layer and produces
//! per-zone fill styles, hover styles, popup markup and bounds.
//!
//! The output is plain data ([`RenderedLayer`]) or the input collection with the results written
//! into each feature's properties ([`styled_collection`]), so any map library can draw it.

pub mod model;
pub mod popup;
pub mod view;

pub use geojson;
pub use model::{Bounds, LayerSummary, RenderedLayer, RenderedZone};
pub use view::MapView;

use geojson::{Feature, FeatureCollection, GeoJson};
use serde_json::Value;
use zonemap_core::feed::scalar_to_string;
use zonemap_core::{DocumentLinker, Engine, Palette, Registry, StyleSettings};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("invalid polygon collection: {message}")]
    InvalidCollection { message: String },
    #[error("layer JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Everything the join needs from an [`Engine`], detached so layers can be rendered without
/// holding the engine.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub key_property: String,
    pub palette: Palette,
    pub style: StyleSettings,
    pub documents: DocumentLinker,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from_engine(&Engine::new())
    }
}

impl RenderOptions {
    pub fn from_engine(engine: &Engine) -> Self {
        Self {
            key_property: engine.key_property().to_string(),
            palette: engine.palette().clone(),
            style: engine.style().clone(),
            documents: engine.documents().clone(),
        }
    }
}

/// Parses a polygon layer. A single `Feature` is accepted as a one-feature collection.
pub fn load_collection(text: &str) -> Result<FeatureCollection> {
    let text = text.trim_start_matches('\u{feff}');
    match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        GeoJson::Feature(feature) => Ok(FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        }),
        GeoJson::Geometry(_) => Err(Error::InvalidCollection {
            message: "expected a FeatureCollection or Feature, found a bare geometry".to_string(),
        }),
    }
}

/// The feature's join property as a string; numbers keep their JSON spelling. Missing, null or
/// blank properties yield `None`.
pub fn zone_id(feature: &Feature, key_property: &str) -> Option<String> {
    let value = feature.property(key_property)?;
    match value {
        Value::Object(_) | Value::Array(_) => None,
        other => Some(scalar_to_string(other)).filter(|id| !id.trim().is_empty()),
    }
}

/// Joins `registry` onto every feature of `collection`. Without a registry every zone renders as
/// "no data".
pub fn render_layer(
    collection: &FeatureCollection,
    registry: Option<&Registry>,
    options: &RenderOptions,
) -> RenderedLayer {
    let mut summary = LayerSummary::default();
    let mut bounds: Option<Bounds> = None;
    let mut zones = Vec::with_capacity(collection.features.len());

    for (index, feature) in collection.features.iter().enumerate() {
        let zone = render_zone(index, feature, registry, options);
        summary.features += 1;
        match (&zone.resolution, &zone.zone_id) {
            (Some(resolution), _) => {
                summary.matched += 1;
                *summary
                    .by_kind
                    .entry(resolution.kind.as_str().to_string())
                    .or_default() += 1;
            }
            (None, Some(id)) => summary.unmatched.push(id.clone()),
            (None, None) => summary.without_id += 1,
        }
        if let Some(b) = zone.bounds {
            bounds = Some(match bounds {
                Some(acc) => acc.union(b),
                None => b,
            });
        }
        zones.push(zone);
    }

    tracing::debug!(
        features = summary.features,
        matched = summary.matched,
        unmatched = summary.unmatched.len(),
        without_id = summary.without_id,
        "joined registry onto polygon layer"
    );
    RenderedLayer {
        generation: registry.map(Registry::generation),
        zones,
        summary,
        bounds,
    }
}

fn render_zone(
    index: usize,
    feature: &Feature,
    registry: Option<&Registry>,
    options: &RenderOptions,
) -> RenderedZone {
    let zone_id = zone_id(feature, &options.key_property);
    let hit = registry.and_then(|r| r.lookup(zone_id.as_deref()));
    let status = hit.as_ref().map(|(_, status)| *status);
    if zone_id.is_some() && hit.is_none() {
        tracing::debug!(index, zone = ?zone_id, "polygon has no matching feed row");
    }

    RenderedZone {
        index,
        style: options.style.zone_style(&options.palette, status),
        highlight: options.style.highlight.clone(),
        popup_html: popup::popup_html(zone_id.as_deref(), status, &options.documents),
        state: status.map(|s| s.state.clone()),
        bounds: feature
            .geometry
            .as_ref()
            .and_then(|g| Bounds::from_geometry(&g.value)),
        resolution: hit.map(|(resolution, _)| resolution),
        zone_id,
    }
}

/// Returns `collection` with each feature's properties extended by `style`, `highlightStyle`,
/// `popupHtml`, `zoneKey` and `matchKind`, and `bbox` members on the features and the
/// collection. `layer` must have been rendered from the same collection.
pub fn styled_collection(
    collection: &FeatureCollection,
    layer: &RenderedLayer,
) -> Result<FeatureCollection> {
    if collection.features.len() != layer.zones.len() {
        return Err(Error::InvalidCollection {
            message: format!(
                "layer has {} zones but the collection has {} features",
                layer.zones.len(),
                collection.features.len()
            ),
        });
    }

    let mut out = collection.clone();
    for (feature, zone) in out.features.iter_mut().zip(&layer.zones) {
        feature.set_property("style", serde_json::to_value(&zone.style)?);
        feature.set_property("highlightStyle", serde_json::to_value(&zone.highlight)?);
        feature.set_property("popupHtml", zone.popup_html.clone());
        match &zone.resolution {
            Some(resolution) => {
                feature.set_property("zoneKey", resolution.key.clone());
                feature.set_property("matchKind", resolution.kind.as_str());
            }
            None => {
                feature.set_property("zoneKey", Value::Null);
                feature.set_property("matchKind", Value::Null);
            }
        }
        if let Some(b) = zone.bounds {
            feature.bbox = Some(b.to_bbox());
        }
    }
    out.bbox = layer.bounds.map(Bounds::to_bbox);
    Ok(out)
}

/// Loads, joins and writes the styled collection in one step.
pub fn render_geojson(
    polygons: &str,
    registry: Option<&Registry>,
    options: &RenderOptions,
) -> Result<(FeatureCollection, LayerSummary)> {
    let collection = load_collection(polygons)?;
    let layer = render_layer(&collection, registry, options);
    let styled = styled_collection(&collection, &layer)?;
    Ok((styled, layer.summary))
}

pub fn to_json_string(collection: &FeatureCollection, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(collection)?
    } else {
        serde_json::to_string(collection)?
    };
    Ok(text)
}
