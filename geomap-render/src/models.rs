//! Styled map primitives and the composed map document.
//!
//! All structs derive `Serialize` so the document can be handed to the
//! Leaflet drawing script as JSON.

use geomap_core::{Bounds, Color};
use geojson::Geometry;
use serde::{Deserialize, Serialize};

/// Fallback center used when no boundaries are available.
pub const PLACEHOLDER_CENTER: [f64; 2] = [53.5213, -113.5213];
pub const PLACEHOLDER_ZOOM: u8 = 15;

/// Polygon style, using Leaflet's option names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonStyle {
    /// A hex color, or `"transparent"` for regions without data.
    pub fill_color: String,
    pub color: Color,
    pub weight: f64,
    pub fill_opacity: f64,
}

/// One boundary feature, styled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyledPolygon {
    pub geometry: Option<Geometry>,
    pub style: PolygonStyle,
    /// `(field, value)` pairs shown on hover.
    pub tooltip: Vec<(String, String)>,
    #[serde(skip)]
    pub bounds: Option<Bounds>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Shape {
    #[default]
    Circle,
    Rectangle,
}

/// One vector point.
///
/// `radius` is in meters for circles and in degrees (half-width) for
/// rectangles.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyledPoint {
    pub lat: f64,
    pub lon: f64,
    pub shape: Shape,
    pub radius: f64,
    pub fill_color: Color,
    pub opacity: f64,
    pub fill_opacity: f64,
    pub stroke: bool,
}

impl StyledPoint {
    /// `[[south, west], [north, east]]` corners of a rectangle marker.
    pub fn rectangle_corners(&self) -> [[f64; 2]; 2] {
        [
            [self.lat - self.radius, self.lon - self.radius],
            [self.lat + self.radius, self.lon + self.radius],
        ]
    }
}

/// Blurred heat layer; the blur itself is drawn by the map library.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterHeatLayer {
    /// `[lat, lon, intensity]` triples.
    pub points: Vec<[f64; 3]>,
    pub min_opacity: f64,
    pub max_zoom: u8,
    pub radius: f64,
    pub blur: f64,
}

/// A named layer on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MapLayer {
    Choropleth {
        name: String,
        polygons: Vec<StyledPolygon>,
    },
    Points {
        name: String,
        points: Vec<StyledPoint>,
    },
    Heat {
        name: String,
        layer: RasterHeatLayer,
    },
}

impl MapLayer {
    pub fn name(&self) -> &str {
        match self {
            MapLayer::Choropleth { name, .. }
            | MapLayer::Points { name, .. }
            | MapLayer::Heat { name, .. } => name,
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        match self {
            MapLayer::Choropleth { polygons, .. } => {
                Bounds::union_all(polygons.iter().filter_map(|p| p.bounds))
            }
            MapLayer::Points { points, .. } => {
                Bounds::union_all(points.iter().map(|p| Bounds::point(p.lat, p.lon)))
            }
            MapLayer::Heat { layer, .. } => {
                Bounds::union_all(layer.points.iter().map(|p| Bounds::point(p[0], p[1])))
            }
        }
    }
}

/// A complete map: base tiles, layers in drawing order, and the view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapDocument {
    pub tiles: String,
    pub layers: Vec<MapLayer>,
    /// View to fit; set by [`MapDocument::fit_bounds`].
    pub bounds: Option<Bounds>,
    /// Explicit center, used only when there is nothing to fit.
    pub center: Option<[f64; 2]>,
    pub zoom: Option<u8>,
}

impl MapDocument {
    pub fn new(tiles: &str) -> Self {
        Self {
            tiles: tiles.to_string(),
            layers: Vec::new(),
            bounds: None,
            center: None,
            zoom: None,
        }
    }

    /// Empty map centered on the fallback coordinate.
    pub fn placeholder(tiles: &str) -> Self {
        Self {
            center: Some(PLACEHOLDER_CENTER),
            zoom: Some(PLACEHOLDER_ZOOM),
            ..Self::new(tiles)
        }
    }

    pub fn add_layer(&mut self, layer: MapLayer) {
        self.layers.push(layer);
    }

    /// Fit the view to every layer. Without layer bounds the center stays.
    pub fn fit_bounds(&mut self) {
        self.bounds = Bounds::union_all(self.layers.iter().filter_map(|l| l.bounds()));
        if self.bounds.is_none() && self.center.is_none() {
            self.center = Some(PLACEHOLDER_CENTER);
            self.zoom = Some(PLACEHOLDER_ZOOM);
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> StyledPoint {
        StyledPoint {
            lat,
            lon,
            shape: Shape::Circle,
            radius: 250.0,
            fill_color: Color::BLACK,
            opacity: 0.7,
            fill_opacity: 0.7,
            stroke: false,
        }
    }

    #[test]
    fn fit_bounds_covers_all_layers() {
        let mut doc = MapDocument::new("CartoDB Positron");
        doc.add_layer(MapLayer::Points {
            name: "a.csv".into(),
            points: vec![point(1.0, 2.0), point(3.0, -1.0)],
        });
        doc.add_layer(MapLayer::Heat {
            name: "b.csv".into(),
            layer: RasterHeatLayer {
                points: vec![[10.0, 5.0, 1.0]],
                min_opacity: 0.7,
                max_zoom: 0,
                radius: 25.0,
                blur: 15.0,
            },
        });
        doc.fit_bounds();
        assert_eq!(
            doc.bounds,
            Some(Bounds { south: 1.0, west: -1.0, north: 10.0, east: 5.0 })
        );
    }

    #[test]
    fn empty_document_falls_back_to_placeholder_center() {
        let mut doc = MapDocument::new("OpenStreetMap");
        doc.fit_bounds();
        assert_eq!(doc.center, Some(PLACEHOLDER_CENTER));
        assert_eq!(doc.zoom, Some(PLACEHOLDER_ZOOM));
    }

    #[test]
    fn layers_serialize_with_type_tag() {
        let layer = MapLayer::Points {
            name: "a.csv".into(),
            points: vec![point(1.0, 2.0)],
        };
        let json = serde_json::to_value(&layer).unwrap();
        assert_eq!(json["type"], "points");
        assert_eq!(json["points"][0]["fillColor"], "#000000");
        assert_eq!(json["points"][0]["stroke"], false);
    }

    #[test]
    fn rectangle_corners() {
        let mut p = point(10.0, 20.0);
        p.shape = Shape::Rectangle;
        p.radius = 0.5;
        assert_eq!(p.rectangle_corners(), [[9.5, 19.5], [10.5, 20.5]]);
    }
}
