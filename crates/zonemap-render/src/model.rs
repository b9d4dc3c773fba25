use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use zonemap_core::{HighlightStyle, Resolution, ZoneStyle};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut it = points.into_iter();
        let (x0, y0) = it.next()?;
        let mut b = Self {
            min_x: x0,
            min_y: y0,
            max_x: x0,
            max_y: y0,
        };
        for (x, y) in it {
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x);
            b.max_y = b.max_y.max(y);
        }
        Some(b)
    }

    /// Bounds of every position in a GeoJSON geometry. Positions with fewer than two
    /// coordinates are ignored.
    pub fn from_geometry(value: &geojson::Value) -> Option<Self> {
        let mut points = Vec::new();
        collect_positions(value, &mut points);
        Self::from_points(points)
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// GeoJSON `bbox` member order: west, south, east, north.
    pub fn to_bbox(self) -> Vec<f64> {
        vec![self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

fn collect_positions(value: &geojson::Value, out: &mut Vec<(f64, f64)>) {
    use geojson::Value as G;

    match value {
        G::Point(p) => push_position(p, out),
        G::MultiPoint(ps) | G::LineString(ps) => {
            for p in ps {
                push_position(p, out);
            }
        }
        G::MultiLineString(lines) | G::Polygon(lines) => {
            for p in lines.iter().flatten() {
                push_position(p, out);
            }
        }
        G::MultiPolygon(polygons) => {
            for p in polygons.iter().flatten().flatten() {
                push_position(p, out);
            }
        }
        G::GeometryCollection(geometries) => {
            for geometry in geometries {
                collect_positions(&geometry.value, out);
            }
        }
    }
}

fn push_position(position: &[f64], out: &mut Vec<(f64, f64)>) {
    if let [x, y, ..] = position {
        out.push((*x, *y));
    }
}

/// One polygon after the join.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedZone {
    /// Position of the feature in the input collection.
    pub index: usize,
    /// The feature's raw join property, as a string.
    pub zone_id: Option<String>,
    pub resolution: Option<Resolution>,
    pub state: Option<String>,
    pub style: ZoneStyle,
    pub highlight: HighlightStyle,
    pub popup_html: String,
    pub bounds: Option<Bounds>,
}

impl RenderedZone {
    pub fn is_matched(&self) -> bool {
        self.resolution.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSummary {
    pub features: usize,
    pub matched: usize,
    /// Raw ids of features that resolved to nothing, in collection order.
    pub unmatched: Vec<String>,
    /// Features without a usable join property.
    pub without_id: usize,
    /// Match counts keyed by [`zonemap_core::MatchKind::as_str`].
    pub by_kind: IndexMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedLayer {
    /// Generation of the registry the layer was joined against, if any.
    pub generation: Option<u64>,
    pub zones: Vec<RenderedZone>,
    pub summary: LayerSummary,
    pub bounds: Option<Bounds>,
}
