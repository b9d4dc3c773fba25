//! Map state that arrives in pieces: the polygon layer and the registry are loaded
//! independently, in either order. The join runs once polygons exist and uses whatever registry
//! is current; without one every zone renders as "no data".

use crate::model::RenderedLayer;
use crate::{RenderOptions, render_layer};
use geojson::FeatureCollection;
use std::sync::Arc;
use zonemap_core::Registry;

#[derive(Debug, Clone)]
pub struct MapView {
    options: RenderOptions,
    polygons: Option<FeatureCollection>,
    registry: Option<Arc<Registry>>,
    layer: Option<RenderedLayer>,
}

impl MapView {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            polygons: None,
            registry: None,
            layer: None,
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn polygons(&self) -> Option<&FeatureCollection> {
        self.polygons.as_ref()
    }

    pub fn registry(&self) -> Option<&Arc<Registry>> {
        self.registry.as_ref()
    }

    /// The current joined layer, `None` until polygons have arrived.
    pub fn layer(&self) -> Option<&RenderedLayer> {
        self.layer.as_ref()
    }

    /// Replaces the polygon layer and re-joins against the current registry, if any.
    pub fn set_polygons(&mut self, polygons: FeatureCollection) -> Option<&RenderedLayer> {
        self.polygons = Some(polygons);
        self.rejoin()
    }

    /// Replaces the registry wholesale and re-joins if polygons are already present. A registry
    /// older than the one already held is ignored.
    pub fn set_registry(&mut self, registry: Arc<Registry>) -> Option<&RenderedLayer> {
        if let Some(current) = &self.registry {
            if current.generation() > registry.generation() {
                tracing::debug!(
                    current = current.generation(),
                    offered = registry.generation(),
                    "ignoring registry older than the one in view"
                );
                return self.layer.as_ref();
            }
        }
        self.registry = Some(registry);
        self.rejoin()
    }

    fn rejoin(&mut self) -> Option<&RenderedLayer> {
        let polygons = self.polygons.as_ref()?;
        self.layer = Some(render_layer(
            polygons,
            self.registry.as_deref(),
            &self.options,
        ));
        self.layer.as_ref()
    }
}
