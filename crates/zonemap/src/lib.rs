#![forbid(unsafe_code)]

//! `zonemap` turns a spreadsheet export into a styled zone map.
//!
//! A tabular feed (CSV/TSV, list-feed JSON, visualization JSONP or plain JSON rows) is parsed
//! into a registry of zone statuses; polygons from a GeoJSON layer are matched to it by a
//! tolerant identifier join and styled by status.
//!
//! # Features
//!
//! - `render`: enable the GeoJSON join and styled layer output (`zonemap::render`)

pub use zonemap_core::*;

#[cfg(feature = "render")]
pub mod render {
    pub use zonemap_render::model::{Bounds, LayerSummary, RenderedLayer, RenderedZone};
    pub use zonemap_render::geojson;
    pub use zonemap_render::popup::popup_html;
    pub use zonemap_render::{
        MapView, RenderOptions, load_collection, render_geojson, render_layer, styled_collection,
        to_json_string, zone_id,
    };

    #[derive(Debug, thiserror::Error)]
    pub enum HeadlessError {
        #[error(transparent)]
        Feed(#[from] zonemap_core::Error),
        #[error(transparent)]
        Render(#[from] zonemap_render::Error),
    }

    pub type Result<T> = std::result::Result<T, HeadlessError>;

    /// Feed text + polygon layer -> styled GeoJSON text, using `engine`'s configuration.
    ///
    /// Convenience for one-shot callers; long-running hosts should keep a
    /// [`zonemap_core::Refresher`] and a [`MapView`] instead.
    pub fn render_styled_geojson_sync(
        engine: &zonemap_core::Engine,
        feed: &str,
        polygons: &str,
    ) -> Result<String> {
        let registry = engine.build_registry_sync(feed)?;
        let options = RenderOptions::from_engine(engine);
        let (styled, _) = render_geojson(polygons, Some(&registry), &options)?;
        Ok(to_json_string(&styled, false)?)
    }
}
