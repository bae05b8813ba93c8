//! Full map rebuilds.
//!
//! Every render starts from a fresh [`MapDocument`] and walks
//! `NoData → GeoJsonLoaded → Joined → Rendered`. A failing step either ends
//! the render with a guidance message, or, for a misconfigured coordinate
//! layer, skips just that layer.

use crate::notice::Notice;
use crate::state::AppState;
use geomap_cache::ResourceCache;
use geomap_core::{ErrorClass, GeomapError, Result};
use geomap_render::choropleth::{choropleth_layer, render_outlines};
use geomap_render::{
    join_rows, render_choropleth, render_coordinate_layer, ColorMap, DensityEstimator, GaussianKde,
    JoinKeys, MapDocument,
};

pub const NO_DATA: &str =
    "No data to display! Please upload your data or select an example data set in the sidebar.";

pub const NO_GEOJSON: &str =
    "Make sure a GeoJSON is selected in the sidebar, or upload your own following the GeoJSON format.";

pub const MISSING_KEYS: &str = "Data could not be displayed. Please upload a Table file and a GeoJSON, \
or select an example data set in the sidebar. Uploaded Table files should include a Key column \
(e.g. 'name', 'continent', 'country', 'location') and a Value column (e.g. 'value', 'weight', 'intensity').";

pub const MISSING_COORDINATES: &str = "The heat map could not be rendered. Please ensure your input data \
contains a latitude column (named \"latitude\" or \"lat\"), and a longitude column (named \"longitude\", \
\"long\", or \"lon\"). Column names are case-insensitive.";

/// How far the last render got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RenderStage {
    NoData,
    GeoJsonLoaded,
    Joined,
    Rendered,
}

/// What the map view should show.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Map(MapDocument),
    /// Guidance shown in place of the map.
    Message { stage: RenderStage, message: String },
    /// Empty map around the fallback center, with the reason.
    Placeholder { map: MapDocument, message: String },
}

impl RenderOutcome {
    pub fn stage(&self) -> RenderStage {
        match self {
            RenderOutcome::Map(_) => RenderStage::Rendered,
            RenderOutcome::Message { stage, .. } => *stage,
            RenderOutcome::Placeholder { .. } => RenderStage::NoData,
        }
    }

    pub fn map(&self) -> Option<&MapDocument> {
        match self {
            RenderOutcome::Map(map) | RenderOutcome::Placeholder { map, .. } => Some(map),
            RenderOutcome::Message { .. } => None,
        }
    }
}

/// Density estimates memoized per file and coordinate columns.
pub struct CachedDensity<'a> {
    cache: &'a ResourceCache,
    file: &'a str,
    lon: &'a str,
    lat: &'a str,
    estimator: &'a dyn DensityEstimator,
}

impl<'a> CachedDensity<'a> {
    pub fn new(
        cache: &'a ResourceCache,
        file: &'a str,
        lon: &'a str,
        lat: &'a str,
        estimator: &'a dyn DensityEstimator,
    ) -> Self {
        Self {
            cache,
            file,
            lon,
            lat,
            estimator,
        }
    }
}

impl DensityEstimator for CachedDensity<'_> {
    fn estimate(&self, points: &[(f64, f64)]) -> Result<Vec<f64>> {
        let key: [&dyn std::fmt::Display; 4] = [&self.file, &self.lon, &self.lat, &"density"];
        if let Some(densities) = self.cache.get::<Vec<f64>>(&key) {
            if densities.len() == points.len() {
                return Ok(densities);
            }
        }
        let densities = self.estimator.estimate(points)?;
        self.cache.store(densities.clone(), &key);
        Ok(densities)
    }
}

fn message(stage: RenderStage, text: impl Into<String>) -> RenderOutcome {
    RenderOutcome::Message {
        stage,
        message: text.into(),
    }
}

impl AppState {
    /// Rebuild the whole map from the current state.
    ///
    /// A [`RenderOutcome::Map`] is also kept as [`AppState::last_map`] for export;
    /// any other outcome leaves the previous map untouched.
    pub fn render(&mut self) -> RenderOutcome {
        let outcome = self.build_map();
        match &outcome {
            RenderOutcome::Map(map) => {
                log::info!("[Geomap] render: Rendered {} layers", map.layers.len());
                self.last_map = Some((self.revision(), map.clone()));
            }
            RenderOutcome::Message { stage, message } => {
                log::info!("[Geomap] render: Stopped at {:?}: {}", stage, message);
            }
            RenderOutcome::Placeholder { message, .. } => {
                log::info!("[Geomap] render: Placeholder map: {}", message);
            }
        }
        outcome
    }

    fn build_map(&mut self) -> RenderOutcome {
        if self.choropleth().is_none() && self.coordinate_layers().is_empty() {
            return message(RenderStage::NoData, NO_DATA);
        }
        let tiles = self.config.tile_url();
        let Some(boundaries) = self.boundaries().cloned() else {
            self.notify(Notice::error(NO_GEOJSON));
            return RenderOutcome::Placeholder {
                map: MapDocument::placeholder(tiles),
                message: NO_GEOJSON.to_string(),
            };
        };
        let mut map = MapDocument::new(tiles);
        let mut stage = RenderStage::GeoJsonLoaded;

        if let Some(table) = self.choropleth().cloned() {
            let selection = self.selection().clone();
            let (Some(key_column), Some(value_column), Some(key_property)) =
                (selection.key_column, selection.value_column, selection.key_property)
            else {
                return message(stage, MISSING_KEYS);
            };
            if !boundaries.property_keys().contains(&key_property) {
                return message(stage, MISSING_KEYS);
            }
            let keys = JoinKeys {
                key_column,
                value_column,
                key_property,
            };

            let mut joined = table.data;
            if let Err(e) = join_rows(&mut joined, &boundaries, &keys) {
                return match e {
                    GeomapError::ColumnNotFound(_) => message(stage, MISSING_KEYS),
                    other => message(stage, other.to_string()),
                };
            }
            let roi = self.config.roi;
            if roi.enabled && joined.numbers(&keys.value_column).is_ok() {
                if let Err(e) = roi.apply_to_column(&mut joined, &keys.value_column) {
                    return message(stage, e.to_string());
                }
            }
            stage = RenderStage::Joined;

            let values = joined.column(&keys.value_column).unwrap_or_default();
            let palette = self.config.color_map;
            let color_map = match ColorMap::for_values(values, palette, self.category_overrides()) {
                Ok(color_map) => color_map,
                Err(e) => return message(stage, e.to_string()),
            };
            match render_choropleth(&joined, &boundaries, &keys, &color_map, self.config.opacity) {
                Ok(polygons) => map.add_layer(choropleth_layer(boundaries.name(), polygons)),
                Err(e) => return message(stage, e.to_string()),
            }
        } else {
            let key_property = self.selection().key_property.clone();
            let outlines = render_outlines(&boundaries, key_property.as_deref());
            map.add_layer(choropleth_layer(boundaries.name(), outlines));
        }

        let layers: Vec<_> = self
            .coordinate_layers()
            .iter()
            .map(|(id, layer)| (id.clone(), layer.clone()))
            .collect();
        for (id, layer) in layers {
            let Some(columns) = &layer.columns else {
                return message(stage, MISSING_COORDINATES);
            };
            let kde = GaussianKde;
            let density =
                CachedDensity::new(self.cache(), id.as_str(), &columns.lon, &columns.lat, &kde);
            let rendered =
                render_coordinate_layer(id.as_str(), &layer.data, columns, &layer.settings, &density);
            match rendered {
                Ok(Some(rendered)) => map.add_layer(rendered),
                Ok(None) => {}
                Err(e) if e.class() == ErrorClass::Guard => {
                    self.notify(Notice::error(format!("{}: {}", id, e)));
                }
                Err(e) => return message(stage, e.to_string()),
            }
        }

        map.fit_bounds();
        RenderOutcome::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::{session, POINTS};
    use crate::state::FileId;
    use geomap_render::{MapLayer, RangeOfInterest, RenderMode, RoiMode};

    #[test]
    fn nothing_loaded_is_no_data() {
        let (_dir, mut state) = session();
        let outcome = state.render();
        assert_eq!(outcome.stage(), RenderStage::NoData);
        assert!(outcome.map().is_none());
    }

    #[tokio::test]
    async fn missing_geojson_gives_placeholder() {
        let (_dir, mut state) = session();
        state.select_choropleth("cases.csv").await.unwrap();
        let RenderOutcome::Placeholder { map, .. } = state.render() else {
            panic!("expected a placeholder");
        };
        assert_eq!(map.center, Some([53.5213, -113.5213]));
        assert_eq!(map.zoom, Some(15));
        assert!(state.last_map().is_none());
    }

    #[tokio::test]
    async fn choropleth_renders_and_fits_bounds() {
        let (_dir, mut state) = session();
        state.select_choropleth("cases.csv").await.unwrap();
        state.select_boundaries("provinces.geojson").await.unwrap();
        let RenderOutcome::Map(map) = state.render() else {
            panic!("expected a map");
        };
        assert_eq!(map.layers.len(), 1);
        let MapLayer::Choropleth { polygons, .. } = &map.layers[0] else {
            panic!("expected a choropleth");
        };
        assert_eq!(polygons.len(), 2);
        assert!(polygons.iter().all(|p| p.style.fill_color != "transparent"));
        assert_eq!(map.bounds.unwrap().south, 42.0);
        assert!(state.last_map().is_some());
    }

    #[tokio::test]
    async fn missing_selection_is_guidance() {
        let (_dir, mut state) = session();
        state.select_choropleth("cases.csv").await.unwrap();
        state.select_boundaries("provinces.geojson").await.unwrap();
        state.set_key_property("admin");
        let outcome = state.render();
        assert_eq!(
            outcome,
            RenderOutcome::Message {
                stage: RenderStage::GeoJsonLoaded,
                message: MISSING_KEYS.to_string()
            }
        );
    }

    #[tokio::test]
    async fn unmatched_names_are_no_locations() {
        let (_dir, mut state) = session();
        state.select_choropleth("cases.csv").await.unwrap();
        state.select_boundaries("provinces.geojson").await.unwrap();
        state.set_key_column("Region");
        let RenderOutcome::Message { message, .. } = state.render() else {
            panic!("expected a message");
        };
        assert!(message.starts_with("No locations were found"));
    }

    #[tokio::test]
    async fn choropleth_roi_filters_rows() {
        let (_dir, mut state) = session();
        state.select_choropleth("cases.csv").await.unwrap();
        state.select_boundaries("provinces.geojson").await.unwrap();
        state.update_config(|config| config.roi = RangeOfInterest::new(RoiMode::Remove, 15.0, 25.0));
        let RenderOutcome::Map(map) = state.render() else {
            panic!("expected a map");
        };
        let MapLayer::Choropleth { polygons, .. } = &map.layers[0] else {
            panic!("expected a choropleth");
        };
        assert_eq!(polygons[0].style.fill_color, "transparent");
        assert_ne!(polygons[1].style.fill_color, "transparent");
    }

    #[tokio::test]
    async fn guard_skips_only_that_layer() {
        let (_dir, mut state) = session();
        state.select_boundaries("provinces.geojson").await.unwrap();
        let files = vec![
            ("a.csv".to_string(), POINTS.as_bytes().to_vec()),
            ("b.csv".to_string(), POINTS.as_bytes().to_vec()),
        ];
        state.upload_coordinates(&files).unwrap();
        state.update_layer(&FileId::new("a.csv"), |s| {
            s.mode = RenderMode::Vector;
            s.colors.clear();
        });
        let RenderOutcome::Map(map) = state.render() else {
            panic!("expected a map");
        };
        let names: Vec<&str> = map.layers.iter().map(|l| l.name()).collect();
        assert_eq!(names.len(), 2);
        assert_eq!(names[1], "b.csv");
        assert!(state.notices().iter().any(|n| n.message.contains("at least one color")));
    }

    #[tokio::test]
    async fn coordinates_without_lat_lon_are_guidance() {
        let (_dir, mut state) = session();
        state.select_boundaries("provinces.geojson").await.unwrap();
        let files = vec![("xy.csv".to_string(), b"x,y\n1,2\n".to_vec())];
        state.upload_coordinates(&files).unwrap();
        let RenderOutcome::Message { message, .. } = state.render() else {
            panic!("expected a message");
        };
        assert_eq!(message, MISSING_COORDINATES);
    }

    #[tokio::test]
    async fn densities_are_memoized_per_file() {
        let (_dir, mut state) = session();
        state.select_boundaries("provinces.geojson").await.unwrap();
        let files = vec![("pts.csv".to_string(), POINTS.as_bytes().to_vec())];
        state.upload_coordinates(&files).unwrap();
        let id = FileId::new("pts.csv");
        state.update_layer(&id, |s| s.density = true);
        assert!(matches!(state.render(), RenderOutcome::Map(_)));
        let key: [&dyn std::fmt::Display; 4] = [&"pts.csv", &"Longitude", &"Latitude", &"density"];
        assert!(state.cache().contains(&key));

        state.upload_coordinates(&files).unwrap();
        assert!(!state.cache().contains(&key));
    }
}
