//! GeoJSON boundary collections.
//!
//! Geometry is kept opaque apart from bounding boxes; properties are
//! flattened to strings so they can be joined against table cells.

use crate::error::{GeomapError, Result};
use geojson::{GeoJson, Geometry, Value};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::str::FromStr;

/// A latitude/longitude bounding box: `[[south, west], [north, east]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// A degenerate box around a single point.
    pub fn point(lat: f64, lon: f64) -> Self {
        Self {
            south: lat,
            west: lon,
            north: lat,
            east: lon,
        }
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            south: self.south.min(other.south),
            west: self.west.min(other.west),
            north: self.north.max(other.north),
            east: self.east.max(other.east),
        }
    }

    /// Fold an iterator of boxes into one, `None` when empty.
    pub fn union_all<I: IntoIterator<Item = Bounds>>(items: I) -> Option<Bounds> {
        items.into_iter().reduce(|a, b| a.union(&b))
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }
}

/// One named region: its outline and its string properties.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    pub geometry: Option<Geometry>,
    pub properties: BTreeMap<String, String>,
}

impl BoundaryFeature {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|s| s.as_str())
    }

    /// Bounding box of the geometry, if it has any coordinates.
    pub fn bounds(&self) -> Option<Bounds> {
        self.geometry.as_ref().and_then(|g| value_bounds(&g.value))
    }
}

/// An ordered, immutable set of boundary features.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundaryCollection {
    name: String,
    features: Vec<BoundaryFeature>,
}

impl BoundaryCollection {
    pub fn new(name: &str, features: Vec<BoundaryFeature>) -> Self {
        Self {
            name: name.to_string(),
            features,
        }
    }

    /// Parse a GeoJSON document. A bare Feature or Geometry is accepted as a
    /// one-feature collection.
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let geojson = GeoJson::from_str(text).map_err(|e| GeomapError::GeoJson {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        let features = match geojson {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(geometry) => vec![geojson::Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: None,
                foreign_members: None,
            }],
        };
        let features = features
            .into_iter()
            .map(|feature| BoundaryFeature {
                properties: feature
                    .properties
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(k, v)| (k, property_string(&v)))
                    .collect(),
                geometry: feature.geometry,
            })
            .collect::<Vec<_>>();
        log::info!(
            "[Geomap] boundary: Parsed {} features from {}",
            features.len(),
            name
        );
        Ok(Self::new(name, features))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> &[BoundaryFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Selectable join properties, taken from the first feature.
    pub fn property_keys(&self) -> Vec<String> {
        self.features
            .first()
            .map(|f| f.properties.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// The value of `key` for every feature, in feature order.
    pub fn property_values(&self, key: &str) -> Result<Vec<String>> {
        self.features
            .iter()
            .map(|f| {
                f.property(key)
                    .map(|s| s.to_string())
                    .ok_or_else(|| GeomapError::Validation(format!(
                        "Property {} is missing from a feature in {}",
                        key, self.name
                    )))
            })
            .collect()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::union_all(self.features.iter().filter_map(|f| f.bounds()))
    }
}

fn property_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn position_bounds(position: &[f64]) -> Option<Bounds> {
    match position {
        [lon, lat, ..] => Some(Bounds::point(*lat, *lon)),
        _ => None,
    }
}

fn value_bounds(value: &Value) -> Option<Bounds> {
    match value {
        Value::Point(p) => position_bounds(p),
        Value::MultiPoint(points) | Value::LineString(points) => {
            Bounds::union_all(points.iter().filter_map(|p| position_bounds(p)))
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => Bounds::union_all(
            lines
                .iter()
                .flat_map(|line| line.iter())
                .filter_map(|p| position_bounds(p)),
        ),
        Value::MultiPolygon(polygons) => Bounds::union_all(
            polygons
                .iter()
                .flat_map(|polygon| polygon.iter())
                .flat_map(|ring| ring.iter())
                .filter_map(|p| position_bounds(p)),
        ),
        Value::GeometryCollection(geometries) => {
            Bounds::union_all(geometries.iter().filter_map(|g| value_bounds(&g.value)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub const PROVINCES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"name": "A", "code": 1},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
            {"type": "Feature", "properties": {"name": "B", "code": 2},
             "geometry": {"type": "MultiPolygon", "coordinates": [[[[2,2],[3,2],[3,4],[2,2]]]]}}
        ]
    }"#;

    #[test]
    fn parse_feature_collection() {
        let collection = BoundaryCollection::parse("provinces.geojson", PROVINCES).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.property_keys(), vec!["code", "name"]);
        assert_eq!(collection.features()[1].property("code"), Some("2"));
        assert_eq!(collection.property_values("name").unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn missing_property_is_validation_error() {
        let collection = BoundaryCollection::parse("provinces.geojson", PROVINCES).unwrap();
        assert!(collection.property_values("admin").is_err());
    }

    #[test]
    fn bounds_cover_all_geometries() {
        let collection = BoundaryCollection::parse("provinces.geojson", PROVINCES).unwrap();
        let bounds = collection.bounds().unwrap();
        assert_eq!(bounds, Bounds { south: 0.0, west: 0.0, north: 4.0, east: 3.0 });
    }

    #[test]
    fn malformed_geojson_fails() {
        assert!(BoundaryCollection::parse("bad.geojson", "{\"type\": 3}").is_err());
    }
}
