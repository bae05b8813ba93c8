//! User-adjustable settings.
//!
//! Every field has its own default, so a JSON file only needs the keys the
//! user wants to override.

use anyhow::Context;
use geomap_cache::CacheConfig;
use geomap_core::{CellType, Palette};
use geomap_render::{LayerSettings, RangeOfInterest};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Background map styles and their tile URL templates.
pub const MAP_TYPES: [(&str, &str); 2] = [
    (
        "CartoDB Positron",
        "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
    ),
    (
        "OpenStreetMap",
        "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
    ),
];

/// Table export extensions, in menu order.
pub const TABLE_TYPES: [&str; 4] = [".txt", ".csv", ".tsv", ".xlsx"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Background map style, one of [`MAP_TYPES`].
    pub map_type: String,
    /// Ramp for numeric choropleths.
    pub color_map: Palette,
    /// Fill opacity shared by every choropleth polygon.
    pub opacity: f64,
    /// Choropleth range of interest.
    pub roi: RangeOfInterest,
    /// Datatype applied to edited table cells.
    pub datatype: CellType,
    /// Extension used by table export, one of [`TABLE_TYPES`].
    pub download_type: String,
    /// Starting settings for every coordinate layer.
    pub layer: LayerSettings,
    /// Directory that boundary example names resolve against.
    pub boundary_dir: String,
    /// Extensions never fetched in a sandbox.
    pub sandbox_blacklist: Vec<String>,
    pub cache: CacheConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            map_type: "CartoDB Positron".to_string(),
            color_map: Palette::Viridis,
            opacity: 0.5,
            roi: RangeOfInterest::default(),
            datatype: CellType::Integer,
            download_type: ".txt".to_string(),
            layer: LayerSettings::default(),
            boundary_dir: "../data/".to_string(),
            sandbox_blacklist: vec![".xlsx".into(), ".xls".into(), ".odf".into()],
            cache: CacheConfig::default(),
        }
    }
}

impl MapConfig {
    /// Read overrides from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        log::info!("[Geomap] config: Loaded {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: MapConfig = serde_json::from_str(text)?;
        Ok(config.clamped())
    }

    /// Force numeric settings into their allowed ranges.
    pub fn clamped(mut self) -> Self {
        self.opacity = clamp_or(self.opacity, 0.0, 1.0, 0.5);
        self.layer.opacity = clamp_or(self.layer.opacity, 0.0, 1.0, 0.7);
        self.layer.radius = clamp_or(self.layer.radius, 5.0, 100.0, 25.0);
        self.layer.blur = clamp_or(self.layer.blur, 1.0, 30.0, 15.0);
        if !TABLE_TYPES.contains(&self.download_type.as_str()) {
            log::warn!(
                "[Geomap] config: Unknown download type {}, using .txt",
                self.download_type
            );
            self.download_type = ".txt".to_string();
        }
        self
    }

    /// Tile URL template for the configured background map.
    pub fn tile_url(&self) -> &'static str {
        MAP_TYPES
            .iter()
            .find(|(name, _)| *name == self.map_type)
            .map(|(_, url)| *url)
            .unwrap_or(MAP_TYPES[0].1)
    }
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomap_render::{RenderMode, RoiMode, Shape};

    #[test]
    fn defaults() {
        let config = MapConfig::default();
        assert_eq!(config.map_type, "CartoDB Positron");
        assert_eq!(config.color_map, Palette::Viridis);
        assert_eq!(config.opacity, 0.5);
        assert!(!config.roi.enabled);
        assert_eq!(config.roi.mode, RoiMode::Remove);
        assert_eq!(config.datatype, CellType::Integer);
        assert_eq!(config.download_type, ".txt");
        assert_eq!(config.layer.mode, RenderMode::Raster);
        assert_eq!(config.layer.shape, Shape::Circle);
        assert_eq!(config.layer.opacity, 0.7);
        assert_eq!(config.layer.radius, 25.0);
        assert_eq!(config.layer.blur, 15.0);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = MapConfig::from_json(r#"{"opacity": 0.9, "layer": {"mode": "Vector"}}"#).unwrap();
        assert_eq!(config.opacity, 0.9);
        assert_eq!(config.layer.mode, RenderMode::Vector);
        assert_eq!(config.layer.radius, 25.0);
        assert_eq!(config.map_type, "CartoDB Positron");
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = MapConfig::from_json(
            r#"{"opacity": 3, "download_type": ".pdf", "layer": {"radius": 1, "blur": 99, "opacity": -1}}"#,
        )
        .unwrap();
        assert_eq!(config.opacity, 1.0);
        assert_eq!(config.layer.radius, 5.0);
        assert_eq!(config.layer.blur, 30.0);
        assert_eq!(config.layer.opacity, 0.0);
        assert_eq!(config.download_type, ".txt");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geomap.json");
        std::fs::write(&path, r#"{"map_type": "OpenStreetMap"}"#).unwrap();
        let config = MapConfig::load(&path).unwrap();
        assert_eq!(config.tile_url(), MAP_TYPES[1].1);
        assert!(MapConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
