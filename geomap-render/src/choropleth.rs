//! Joining tables to boundary features and styling the polygons.

use crate::colormap::ColorMap;
use crate::models::{MapLayer, PolygonStyle, StyledPolygon};
use geomap_core::{BoundaryCollection, CellValue, Color, Dataset, GeomapError, Result};
use std::collections::{HashMap, HashSet};

/// Outline weight of every choropleth polygon.
pub const OUTLINE_WEIGHT: f64 = 0.5;

/// Fill used for regions without a matching row.
pub const TRANSPARENT: &str = "transparent";

/// Column and property names that drive a join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinKeys {
    pub key_column: String,
    pub value_column: String,
    pub key_property: String,
}

/// Drop rows whose key does not name any boundary feature.
///
/// Fails with a validation message when no row survives.
pub fn join_rows(data: &mut Dataset, boundaries: &BoundaryCollection, keys: &JoinKeys) -> Result<()> {
    for column in [&keys.key_column, &keys.value_column] {
        if !data.has_column(column) {
            return Err(GeomapError::ColumnNotFound(column.clone()));
        }
    }
    let locations: HashSet<String> = boundaries.property_values(&keys.key_property)?.into_iter().collect();
    let row_keys: Vec<String> = data
        .column(&keys.key_column)
        .map(|values| values.iter().map(|v| v.key()).collect())
        .unwrap_or_default();

    let before = data.row_count();
    data.retain_rows(|row| locations.contains(&row_keys[row]));
    log::debug!(
        "[Geomap] choropleth: {} of {} rows matched {}",
        data.row_count(),
        before,
        keys.key_property
    );
    if data.is_empty() {
        return Err(GeomapError::Validation(format!(
            "No locations were found. Please check that {} in {} matches {} in {}.",
            keys.key_column,
            data.name(),
            keys.key_property,
            boundaries.name()
        )));
    }
    Ok(())
}

/// Style every boundary feature from the joined rows.
///
/// Every feature is emitted; those without a row are transparent. When a key
/// appears on several rows the last one wins.
pub fn render_choropleth(
    data: &Dataset,
    boundaries: &BoundaryCollection,
    keys: &JoinKeys,
    color_map: &ColorMap,
    opacity: f64,
) -> Result<Vec<StyledPolygon>> {
    let key_values = data
        .column(&keys.key_column)
        .ok_or_else(|| GeomapError::ColumnNotFound(keys.key_column.clone()))?;
    let values = data
        .column(&keys.value_column)
        .ok_or_else(|| GeomapError::ColumnNotFound(keys.value_column.clone()))?;
    let lookup: HashMap<String, &CellValue> = key_values
        .iter()
        .map(|k| k.key())
        .zip(values.iter())
        .collect();

    let polygons = boundaries
        .features()
        .iter()
        .map(|feature| {
            let key = feature.property(&keys.key_property).unwrap_or_default();
            let value = lookup.get(key).copied();
            let fill = value
                .and_then(|v| color_map.color(v))
                .map(|c| c.to_hex())
                .unwrap_or_else(|| TRANSPARENT.to_string());
            StyledPolygon {
                geometry: feature.geometry.clone(),
                style: PolygonStyle {
                    fill_color: fill,
                    color: Color::BLACK,
                    weight: OUTLINE_WEIGHT,
                    fill_opacity: opacity,
                },
                tooltip: vec![
                    (keys.key_column.clone(), key.to_string()),
                    (
                        keys.value_column.clone(),
                        value.map(|v| v.to_string()).unwrap_or_default(),
                    ),
                ],
                bounds: feature.bounds(),
            }
        })
        .collect();
    Ok(polygons)
}

/// Transparent, outlined polygons for boundaries shown without a table.
pub fn render_outlines(boundaries: &BoundaryCollection, key_property: Option<&str>) -> Vec<StyledPolygon> {
    boundaries
        .features()
        .iter()
        .map(|feature| StyledPolygon {
            geometry: feature.geometry.clone(),
            style: PolygonStyle {
                fill_color: TRANSPARENT.to_string(),
                color: Color::BLACK,
                weight: OUTLINE_WEIGHT,
                fill_opacity: 0.0,
            },
            tooltip: key_property
                .and_then(|key| feature.property(key).map(|v| (key.to_string(), v.to_string())))
                .into_iter()
                .collect(),
            bounds: feature.bounds(),
        })
        .collect()
}

/// Wrap styled polygons as a named layer.
pub fn choropleth_layer(name: &str, polygons: Vec<StyledPolygon>) -> MapLayer {
    MapLayer::Choropleth {
        name: name.to_string(),
        polygons,
    }
}
