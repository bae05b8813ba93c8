//! Coordinate (lat/lon) heat layers.
//!
//! A layer goes through, in order: the enabled check, optional density
//! blending, range-of-interest filtering, then either a raster heat layer or
//! one vector marker per point.

use crate::colormap::LinearMap;
use crate::density::DensityEstimator;
use crate::models::{MapLayer, RasterHeatLayer, Shape, StyledPoint};
use crate::roi::RangeOfInterest;
use geomap_core::color::DEFAULT_VECTOR_RAMP;
use geomap_core::{Color, Dataset, GeomapError, Result};
use serde::{Deserialize, Serialize};

/// Name of the synthetic all-ones column used by [`ValueSource::Uniform`].
pub const UNIFORM_COLUMN: &str = "Default_Uniform_Values";

/// Weight of the density estimate when blended into point values.
pub const DENSITY_WEIGHT: f64 = 0.1;

/// Circle radii are `radius * CIRCLE_SCALE` meters.
pub const CIRCLE_SCALE: f64 = 10.0;

/// Rectangle half-widths are `radius / RECTANGLE_SCALE` degrees.
pub const RECTANGLE_SCALE: f64 = 10000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RenderMode {
    #[default]
    Raster,
    Vector,
}

/// Where point values come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ValueSource {
    /// Every point weighs 1.
    #[default]
    Uniform,
    Column(String),
}

impl ValueSource {
    pub fn label(&self) -> &str {
        match self {
            ValueSource::Uniform => UNIFORM_COLUMN,
            ValueSource::Column(name) => name,
        }
    }
}

/// User settings for one coordinate file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerSettings {
    pub enabled: bool,
    pub value: ValueSource,
    pub mode: RenderMode,
    pub shape: Shape,
    pub opacity: f64,
    pub radius: f64,
    pub blur: f64,
    pub density: bool,
    pub roi: RangeOfInterest,
    /// Ramp for vector markers.
    pub colors: Vec<Color>,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            value: ValueSource::Uniform,
            mode: RenderMode::Raster,
            shape: Shape::Circle,
            opacity: 0.7,
            radius: 25.0,
            blur: 15.0,
            density: false,
            roi: RangeOfInterest::default(),
            colors: DEFAULT_VECTOR_RAMP.to_vec(),
        }
    }
}

/// Latitude and longitude column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateColumns {
    pub lat: String,
    pub lon: String,
}

/// Values for every row of `data` according to `source`.
pub fn point_values(data: &Dataset, source: &ValueSource) -> Result<Vec<f64>> {
    match source {
        ValueSource::Uniform => Ok(vec![1.0; data.row_count()]),
        ValueSource::Column(column) => data.numbers(column),
    }
}

/// `(lon, lat)` pairs, the order density estimation expects.
pub fn lon_lat(data: &Dataset, columns: &CoordinateColumns) -> Result<Vec<(f64, f64)>> {
    let lat = data.numbers(&columns.lat)?;
    let lon = data.numbers(&columns.lon)?;
    Ok(lon.into_iter().zip(lat).collect())
}

/// Build the layer for one coordinate file.
///
/// Returns `Ok(None)` for a disabled layer. A vector layer without colors is
/// a [`GeomapError::Guard`]; removing every point is a validation failure.
pub fn render_coordinate_layer(
    name: &str,
    data: &Dataset,
    columns: &CoordinateColumns,
    settings: &LayerSettings,
    estimator: &dyn DensityEstimator,
) -> Result<Option<MapLayer>> {
    if !settings.enabled {
        log::debug!("[Geomap] coordinate: {} is disabled", name);
        return Ok(None);
    }
    if settings.mode == RenderMode::Vector && settings.colors.is_empty() {
        return Err(GeomapError::Guard(format!(
            "Please specify at least one color for {}",
            name
        )));
    }

    let points = lon_lat(data, columns)?;
    let mut values = point_values(data, &settings.value)?;
    if points.is_empty() {
        return Err(GeomapError::Validation(format!(
            "No coordinates were found in {}",
            name
        )));
    }

    if settings.density {
        let densities = estimator.estimate(&points)?;
        for (value, density) in values.iter_mut().zip(densities) {
            *value += DENSITY_WEIGHT * density;
        }
    }

    let kept: Vec<(f64, f64, f64)> = points
        .iter()
        .zip(values)
        .filter_map(|(&(lon, lat), value)| settings.roi.apply(value).map(|v| (lat, lon, v)))
        .collect();
    if kept.is_empty() {
        return Err(GeomapError::Validation(
            "No locations to display! Check your Range of Interest and ensure the Value Column is properly set."
                .to_string(),
        ));
    }

    let layer = match settings.mode {
        RenderMode::Raster => MapLayer::Heat {
            name: name.to_string(),
            layer: RasterHeatLayer {
                points: kept.iter().map(|&(lat, lon, v)| [lat, lon, v]).collect(),
                min_opacity: settings.opacity,
                max_zoom: 0,
                radius: settings.radius,
                blur: settings.blur,
            },
        },
        RenderMode::Vector => {
            let values: Vec<f64> = kept.iter().map(|p| p.2).collect();
            let map = LinearMap::over(&settings.colors, &values)?;
            let radius = match settings.shape {
                Shape::Circle => settings.radius * CIRCLE_SCALE,
                Shape::Rectangle => settings.radius / RECTANGLE_SCALE,
            };
            MapLayer::Points {
                name: name.to_string(),
                points: kept
                    .iter()
                    .map(|&(lat, lon, v)| StyledPoint {
                        lat,
                        lon,
                        shape: settings.shape,
                        radius,
                        fill_color: map.color(v),
                        opacity: settings.opacity,
                        fill_opacity: settings.opacity,
                        stroke: false,
                    })
                    .collect(),
            }
        }
    };
    log::info!(
        "[Geomap] coordinate: Rendered {} points for {} as {:?}",
        kept.len(),
        name,
        settings.mode
    );
    Ok(Some(layer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::GaussianKde;
    use crate::roi::RoiMode;
    use geomap_core::ErrorClass;

    struct Flat(f64);

    impl DensityEstimator for Flat {
        fn estimate(&self, points: &[(f64, f64)]) -> Result<Vec<f64>> {
            Ok(vec![self.0; points.len()])
        }
    }

    fn columns() -> CoordinateColumns {
        CoordinateColumns {
            lat: "lat".into(),
            lon: "lon".into(),
        }
    }

    fn sample() -> Dataset {
        Dataset::from_records(
            "pts.csv",
            vec!["lat".into(), "lon".into(), "count".into()],
            vec![
                vec!["53.5".into(), "-113.5".into(), "-5".into()],
                vec!["53.6".into(), "-113.4".into(), "5".into()],
                vec!["53.7".into(), "-113.3".into(), "15".into()],
            ],
        )
    }

    fn vector(settings: LayerSettings) -> LayerSettings {
        LayerSettings {
            mode: RenderMode::Vector,
            value: ValueSource::Column("count".into()),
            ..settings
        }
    }

    #[test]
    fn disabled_layer_is_skipped() {
        let settings = LayerSettings {
            enabled: false,
            ..LayerSettings::default()
        };
        let layer = render_coordinate_layer("pts.csv", &sample(), &columns(), &settings, &GaussianKde).unwrap();
        assert!(layer.is_none());
    }

    #[test]
    fn raster_carries_parameters() {
        let layer = render_coordinate_layer("pts.csv", &sample(), &columns(), &LayerSettings::default(), &GaussianKde)
            .unwrap()
            .unwrap();
        let MapLayer::Heat { layer, .. } = layer else {
            panic!("expected a heat layer");
        };
        assert_eq!(layer.points[0], [53.5, -113.5, 1.0]);
        assert_eq!(layer.min_opacity, 0.7);
        assert_eq!(layer.max_zoom, 0);
        assert_eq!(layer.radius, 25.0);
        assert_eq!(layer.blur, 15.0);
    }

    #[test]
    fn vector_circles_and_rectangles() {
        let settings = vector(LayerSettings::default());
        let Some(MapLayer::Points { points, .. }) =
            render_coordinate_layer("pts.csv", &sample(), &columns(), &settings, &GaussianKde).unwrap()
        else {
            panic!("expected points");
        };
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].radius, 250.0);
        assert!(!points[0].stroke);
        assert_eq!(points[0].fill_color, DEFAULT_VECTOR_RAMP[0]);
        assert_eq!(points[2].fill_color, DEFAULT_VECTOR_RAMP[5]);

        let settings = LayerSettings {
            shape: Shape::Rectangle,
            ..vector(LayerSettings::default())
        };
        let Some(MapLayer::Points { points, .. }) =
            render_coordinate_layer("pts.csv", &sample(), &columns(), &settings, &GaussianKde).unwrap()
        else {
            panic!("expected points");
        };
        assert_eq!(points[0].radius, 25.0 / 10000.0);
    }

    #[test]
    fn zero_colors_is_guard() {
        let settings = LayerSettings {
            colors: Vec::new(),
            ..vector(LayerSettings::default())
        };
        let err = render_coordinate_layer("pts.csv", &sample(), &columns(), &settings, &GaussianKde).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Guard);
        assert!(err.to_string().contains("at least one color"));
    }

    #[test]
    fn roi_remove_and_round() {
        let remove = LayerSettings {
            roi: RangeOfInterest::new(RoiMode::Remove, 0.0, 10.0),
            ..vector(LayerSettings::default())
        };
        let Some(MapLayer::Points { points, .. }) =
            render_coordinate_layer("pts.csv", &sample(), &columns(), &remove, &GaussianKde).unwrap()
        else {
            panic!("expected points");
        };
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].lat, 53.6);

        let round = LayerSettings {
            mode: RenderMode::Raster,
            roi: RangeOfInterest::new(RoiMode::Round, 0.0, 10.0),
            ..remove
        };
        let Some(MapLayer::Heat { layer, .. }) =
            render_coordinate_layer("pts.csv", &sample(), &columns(), &round, &GaussianKde).unwrap()
        else {
            panic!("expected heat");
        };
        let values: Vec<f64> = layer.points.iter().map(|p| p[2]).collect();
        assert_eq!(values, vec![0.0, 5.0, 10.0]);
    }

    #[test]
    fn roi_removing_everything_is_validation() {
        let settings = LayerSettings {
            roi: RangeOfInterest::new(RoiMode::Remove, 100.0, 200.0),
            ..vector(LayerSettings::default())
        };
        let err = render_coordinate_layer("pts.csv", &sample(), &columns(), &settings, &GaussianKde).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Validation);
    }

    #[test]
    fn density_is_blended_not_replaced() {
        let settings = LayerSettings {
            density: true,
            value: ValueSource::Column("count".into()),
            ..LayerSettings::default()
        };
        let Some(MapLayer::Heat { layer, .. }) =
            render_coordinate_layer("pts.csv", &sample(), &columns(), &settings, &Flat(10.0)).unwrap()
        else {
            panic!("expected heat");
        };
        let values: Vec<f64> = layer.points.iter().map(|p| p[2]).collect();
        assert_eq!(values, vec![-4.0, 6.0, 16.0]);
    }

    #[test]
    fn missing_coordinate_column() {
        let columns = CoordinateColumns {
            lat: "latitude".into(),
            lon: "lon".into(),
        };
        let err = render_coordinate_layer("pts.csv", &sample(), &columns, &LayerSettings::default(), &GaussianKde)
            .unwrap_err();
        assert!(matches!(err, GeomapError::ColumnNotFound(_)));
    }
}
