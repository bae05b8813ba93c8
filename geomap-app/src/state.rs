//! Application state and the handlers that change it.
//!
//! `AppState` owns everything one session has selected: the choropleth table,
//! the boundary collection, and one [`CoordinateLayer`] per coordinate file,
//! keyed by [`FileId`]. Handlers take `&mut self`, run to completion, and bump
//! [`AppState::revision`] whenever what the map would show has changed.

use crate::config::MapConfig;
use crate::notice::Notice;
use anyhow::anyhow;
use geomap_cache::progress::LogProgress;
use geomap_cache::{LoadOptions, LoadOutcome, Resource, ResourceCache, SourceMode};
use geomap_core::{
    choose_value_column, classify_column, classify_columns, match_column, BoundaryCollection,
    CellValue, Color, ColumnRole, Dataset, GeomapError,
};
use geomap_render::{CoordinateColumns, LayerSettings, MapDocument};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Accepted table formats, for load failure notices.
pub const TABLE_FORMATS: &str = ".csv, .tsv, .txt, .xlsx, .dat, .tab, or .odf";

/// Extra value option offered for coordinate layers.
pub const UNIFORM: &str = "Uniform";

/// Stable identifier of a loaded file: its resolved path, URL or upload name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The table behind the choropleth.
#[derive(Debug, Clone)]
pub struct ChoroplethTable {
    pub id: FileId,
    pub data: Dataset,
    /// Set once the user has edited a cell; cleared by a reset.
    pub edited: bool,
}

/// One coordinate file and its settings.
#[derive(Debug, Clone)]
pub struct CoordinateLayer {
    pub data: Dataset,
    /// `None` when the file has no recognizable latitude/longitude columns.
    pub columns: Option<CoordinateColumns>,
    /// Value choices: matching columns, then `Uniform`.
    pub value_options: Vec<String>,
    pub settings: LayerSettings,
}

/// Join selections for the choropleth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub key_column: Option<String>,
    pub value_column: Option<String>,
    pub key_property: Option<String>,
}

/// Everything a single session has loaded and chosen.
pub struct AppState {
    pub(crate) config: MapConfig,
    cache: ResourceCache,
    choropleth: Option<ChoroplethTable>,
    boundaries: Option<(FileId, BoundaryCollection)>,
    coordinates: BTreeMap<FileId, CoordinateLayer>,
    selection: Selection,
    category_colors: HashMap<String, Color>,
    revision: u64,
    notices: Vec<Notice>,
    /// Last rendered map and the revision it was rendered at.
    pub(crate) last_map: Option<(u64, MapDocument)>,
}

impl AppState {
    /// Create an empty session.
    pub fn new(config: MapConfig) -> Self {
        let cache = ResourceCache::new(config.cache.clone());
        Self::with_cache(config, cache)
    }

    /// Create a session around an existing cache, e.g. one with a custom handler.
    pub fn with_cache(config: MapConfig, cache: ResourceCache) -> Self {
        Self {
            config,
            cache,
            choropleth: None,
            boundaries: None,
            coordinates: BTreeMap::new(),
            selection: Selection::default(),
            category_colors: HashMap::new(),
            revision: 0,
            notices: Vec::new(),
            last_map: None,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Replace the settings. A changed cache section starts a fresh cache.
    pub fn set_config(&mut self, config: MapConfig) {
        if config == self.config {
            return;
        }
        if config.cache != self.config.cache {
            self.cache = ResourceCache::new(config.cache.clone());
        }
        self.config = config;
        self.touch();
    }

    /// Change some settings in place.
    pub fn update_config<F>(&mut self, update: F)
    where
        F: FnOnce(&mut MapConfig),
    {
        let mut config = self.config.clone();
        update(&mut config);
        self.set_config(config);
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn choropleth(&self) -> Option<&ChoroplethTable> {
        self.choropleth.as_ref()
    }

    pub fn boundaries(&self) -> Option<&BoundaryCollection> {
        self.boundaries.as_ref().map(|(_, b)| b)
    }

    pub fn coordinate_layers(&self) -> &BTreeMap<FileId, CoordinateLayer> {
        &self.coordinates
    }

    /// The last successfully rendered map, even if the state has changed since.
    pub fn last_map(&self) -> Option<&MapDocument> {
        self.last_map.as_ref().map(|(_, map)| map)
    }

    /// The last rendered map, only while it still reflects the current state.
    pub fn current_map(&self) -> Option<&MapDocument> {
        match &self.last_map {
            Some((revision, map)) if *revision == self.revision => Some(map),
            _ => None,
        }
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Remove and return every pending notice.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub(crate) fn notify(&mut self, notice: Notice) {
        notice.log();
        self.notices.push(notice);
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    // ----- loading -----

    async fn load_example(&mut self, name: &str, source: Option<String>, label: &str) -> anyhow::Result<Option<(String, Resource)>> {
        let options = LoadOptions {
            source,
            sandbox_allowed: true,
            sandbox_blacklist: self.config.sandbox_blacklist.clone(),
            label: label.to_string(),
        };
        let mut progress = LogProgress::new(label);
        let outcome = self
            .cache
            .load(SourceMode::Example, &[name.to_string()], &options, &mut progress)
            .await;
        match outcome {
            Ok(LoadOutcome::Loaded(loaded)) => {
                for failure in &loaded.failures {
                    self.notify(Notice::error(failure.clone()));
                }
                Ok(loaded.into_first())
            }
            Ok(LoadOutcome::Unavailable(failures)) => {
                for failure in failures {
                    self.notify(Notice::error(failure));
                }
                Ok(None)
            }
            Ok(LoadOutcome::Forbidden) => {
                self.notify(Notice::error(format!(
                    "{} cannot be loaded in this environment",
                    name
                )));
                Ok(None)
            }
            Ok(LoadOutcome::NoSelection) | Ok(LoadOutcome::NotCacheable) => Ok(None),
            Err(e) => Err(self.parse_failure(label, e)),
        }
    }

    fn parse_failure(&mut self, label: &str, error: GeomapError) -> anyhow::Error {
        let formats = if label == "GeoJSON" { ".geojson" } else { TABLE_FORMATS };
        self.notify(Notice::error(format!(
            "File could not be loaded! {} can be uploaded as a {} file. ({})",
            label, formats, error
        )));
        anyhow::Error::new(error)
    }

    fn ingest(&mut self, name: &str, bytes: &[u8], label: &str) -> anyhow::Result<Resource> {
        let mut progress = LogProgress::new(label);
        match self.cache.ingest(name, bytes, &mut progress) {
            Ok(resource) => Ok(resource),
            Err(e) => Err(self.parse_failure(label, e)),
        }
    }

    /// Load a named example table as the choropleth source.
    pub async fn select_choropleth(&mut self, name: &str) -> anyhow::Result<()> {
        if let Some((id, resource)) = self.load_example(name, None, "choropleth data").await? {
            self.set_choropleth_resource(FileId::new(id), resource)?;
        }
        Ok(())
    }

    /// Use uploaded bytes as the choropleth source.
    pub fn upload_choropleth(&mut self, name: &str, bytes: &[u8]) -> anyhow::Result<()> {
        let resource = self.ingest(name, bytes, "choropleth data")?;
        self.set_choropleth_resource(FileId::new(name), resource)
    }

    fn set_choropleth_resource(&mut self, id: FileId, resource: Resource) -> anyhow::Result<()> {
        let data = resource
            .into_table()
            .ok_or_else(|| anyhow!("{} is not a table", id))?;
        if let Some(previous) = &self.choropleth {
            self.cache.invalidate(previous.id.as_str());
        }
        self.cache.invalidate(id.as_str());

        let columns = data.column_names();
        let key = classify_column::<&str>(&columns, ColumnRole::Name, &[]);
        let value = choose_value_column(&columns, key.as_deref());
        log::info!(
            "[Geomap] state: Choropleth {} with key {:?} and value {:?}",
            id,
            key,
            value
        );
        self.selection.key_column = key;
        self.selection.value_column = value;
        self.category_colors.clear();
        self.choropleth = Some(ChoroplethTable {
            id,
            data,
            edited: false,
        });
        self.touch();
        Ok(())
    }

    /// Load a named example boundary file.
    pub async fn select_boundaries(&mut self, name: &str) -> anyhow::Result<()> {
        let source = Some(self.config.boundary_dir.clone());
        if let Some((id, resource)) = self.load_example(name, source, "GeoJSON").await? {
            self.set_boundaries_resource(FileId::new(id), resource)?;
        }
        Ok(())
    }

    /// Use an uploaded GeoJSON file.
    pub fn upload_boundaries(&mut self, name: &str, bytes: &[u8]) -> anyhow::Result<()> {
        let resource = self.ingest(name, bytes, "GeoJSON")?;
        self.set_boundaries_resource(FileId::new(name), resource)
    }

    fn set_boundaries_resource(&mut self, id: FileId, resource: Resource) -> anyhow::Result<()> {
        let boundaries = resource
            .into_boundaries()
            .ok_or_else(|| anyhow!("{} is not a GeoJSON file", id))?;
        let properties = boundaries.property_keys();
        self.selection.key_property = classify_column::<&str>(&properties, ColumnRole::NameGeoJSON, &[]);
        log::info!(
            "[Geomap] state: Boundaries {} with {} features, key property {:?}",
            id,
            boundaries.len(),
            self.selection.key_property
        );
        self.cache.invalidate(id.as_str());
        self.boundaries = Some((id, boundaries));
        self.touch();
        Ok(())
    }

    /// Replace the coordinate files with named examples.
    pub async fn select_coordinates(&mut self, names: &[String]) -> anyhow::Result<()> {
        let mut layers = Vec::new();
        for name in names {
            if let Some((id, resource)) = self.load_example(name, None, "coordinate data").await? {
                layers.push((FileId::new(id), resource));
            }
        }
        self.replace_coordinates(layers)
    }

    /// Replace the coordinate files with uploads.
    pub fn upload_coordinates(&mut self, files: &[(String, Vec<u8>)]) -> anyhow::Result<()> {
        let mut layers = Vec::new();
        for (name, bytes) in files {
            let resource = self.ingest(name, bytes, "coordinate data")?;
            layers.push((FileId::new(name.clone()), resource));
        }
        self.replace_coordinates(layers)
    }

    /// The file set changed: every layer gets fresh settings.
    fn replace_coordinates(&mut self, files: Vec<(FileId, Resource)>) -> anyhow::Result<()> {
        for id in self.coordinates.keys() {
            self.cache.invalidate(id.as_str());
        }
        self.coordinates.clear();
        for (id, resource) in files {
            let data = resource
                .into_table()
                .ok_or_else(|| anyhow!("{} is not a table", id))?;
            self.cache.invalidate(id.as_str());
            let names = data.column_names();
            let columns = match (
                match_column(&names, ColumnRole::Latitude),
                match_column(&names, ColumnRole::Longitude),
            ) {
                (Some(lat), Some(lon)) => Some(CoordinateColumns { lat, lon }),
                _ => None,
            };
            let value_options = classify_columns(&names, ColumnRole::Value, &[UNIFORM]);
            self.coordinates.insert(
                id,
                CoordinateLayer {
                    data,
                    columns,
                    value_options,
                    settings: self.config.layer.clone(),
                },
            );
        }
        self.touch();
        Ok(())
    }

    // ----- selections -----

    pub fn set_key_column(&mut self, column: &str) {
        self.selection.key_column = Some(column.to_string());
        self.touch();
    }

    /// Choose the choropleth value column; category colors start over.
    pub fn set_value_column(&mut self, column: &str) {
        self.selection.value_column = Some(column.to_string());
        self.category_colors.clear();
        self.touch();
    }

    pub fn set_key_property(&mut self, property: &str) {
        self.selection.key_property = Some(property.to_string());
        self.touch();
    }

    /// Override the color of one category. The key is the raw category value.
    pub fn set_category_color(&mut self, category: &str, color: Color) {
        self.category_colors.insert(category.to_string(), color);
        self.touch();
    }

    pub fn category_overrides(&self) -> &HashMap<String, Color> {
        &self.category_colors
    }

    /// Effective color of every category of the value column, in first-seen order.
    pub fn category_colors(&self) -> Vec<(CellValue, Color)> {
        let (Some(table), Some(column)) = (&self.choropleth, &self.selection.value_column) else {
            return Vec::new();
        };
        let Ok(categories) = table.data.unique_values(column) else {
            return Vec::new();
        };
        let defaults = geomap_render::colormap::default_category_colors(categories.len());
        categories
            .into_iter()
            .zip(defaults)
            .map(|(category, default)| {
                let color = self
                    .category_colors
                    .get(&category.key())
                    .copied()
                    .unwrap_or(default);
                (category, color)
            })
            .collect()
    }

    /// Change one coordinate layer's settings. Returns false for an unknown file.
    pub fn update_layer<F>(&mut self, id: &FileId, update: F) -> bool
    where
        F: FnOnce(&mut LayerSettings),
    {
        match self.coordinates.get_mut(id) {
            Some(layer) => {
                update(&mut layer.settings);
                self.touch();
                true
            }
            None => false,
        }
    }

    // ----- table edits -----

    /// Apply a table edit using the configured cell datatype.
    pub fn edit_cell(&mut self, row: usize, column: &str, raw: &str) -> anyhow::Result<CellValue> {
        let datatype = self.config.datatype;
        let table = self
            .choropleth
            .as_mut()
            .ok_or_else(|| anyhow!("No table is loaded"))?;
        match table.data.patch_cell(row, column, raw, datatype) {
            Ok(value) => {
                table.edited = true;
                let id = table.id.clone();
                self.cache.invalidate(id.as_str());
                self.touch();
                Ok(value)
            }
            Err(e) => {
                self.notify(Notice::error(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Discard table edits by checking the source out of the cache again.
    pub fn reset_table(&mut self) -> anyhow::Result<()> {
        let Some(table) = &self.choropleth else {
            return Ok(());
        };
        let id = table.id.clone();
        let fresh = self
            .cache
            .checkout(id.as_str())
            .and_then(Resource::into_table)
            .ok_or_else(|| anyhow!("{} is no longer cached", id))?;
        self.cache.invalidate(id.as_str());
        self.choropleth = Some(ChoroplethTable {
            id,
            data: fresh,
            edited: false,
        });
        self.touch();
        Ok(())
    }

    /// Key property value of every boundary feature, in feature order.
    pub fn boundary_table(&self) -> geomap_core::Result<(String, Vec<String>)> {
        let boundaries = self.boundaries().ok_or_else(|| {
            GeomapError::Validation(
                "Make sure a GeoJSON is selected, or upload your own following the GeoJSON format."
                    .to_string(),
            )
        })?;
        let key = self
            .selection
            .key_property
            .clone()
            .ok_or_else(|| GeomapError::Validation("Select a GeoJSON property first.".to_string()))?;
        let values = boundaries.property_values(&key)?;
        Ok((key, values))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use geomap_render::RenderMode;

    pub const PROVINCES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"name": "Alberta", "cartodb_id": 1},
             "geometry": {"type": "Polygon", "coordinates": [[[-120,49],[-110,49],[-110,60],[-120,60],[-120,49]]]}},
            {"type": "Feature", "properties": {"name": "Ontario", "cartodb_id": 2},
             "geometry": {"type": "Polygon", "coordinates": [[[-95,42],[-74,42],[-74,57],[-95,57],[-95,42]]]}}
        ]
    }"#;

    pub const CASES: &str = "Location,Cases,Region\nAlberta,10,West\nOntario,20,East\nNunavut,5,North\n";

    pub const POINTS: &str = "Latitude,Longitude,Count\n53.5,-113.5,1\n53.6,-113.4,2\n53.7,-113.6,3\n";

    /// A session whose example and boundary directories hold the fixtures.
    pub fn session() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cases.csv"), CASES).unwrap();
        std::fs::write(dir.path().join("provinces.geojson"), PROVINCES).unwrap();
        std::fs::write(dir.path().join("points.csv"), POINTS).unwrap();
        let base = format!("{}/", dir.path().display());
        let mut config = MapConfig::default();
        config.cache.local_base = base.clone();
        config.boundary_dir = base;
        (dir, AppState::new(config))
    }

    #[tokio::test]
    async fn selecting_files_classifies_columns() {
        let (_dir, mut state) = session();
        state.select_choropleth("cases.csv").await.unwrap();
        state.select_boundaries("provinces.geojson").await.unwrap();
        let selection = state.selection();
        assert_eq!(selection.key_column.as_deref(), Some("Location"));
        assert_eq!(selection.value_column.as_deref(), Some("Cases"));
        assert_eq!(selection.key_property.as_deref(), Some("name"));
        assert_eq!(state.revision(), 2);
    }

    #[test]
    fn config_changes_bump_revision() {
        let (_dir, mut state) = session();
        state.update_config(|config| config.opacity = 0.3);
        assert_eq!(state.revision(), 1);
        assert_eq!(state.config().opacity, 0.3);

        let same = state.config().clone();
        state.set_config(same);
        assert_eq!(state.revision(), 1);
    }

    #[tokio::test]
    async fn missing_example_notifies_and_keeps_state() {
        let (_dir, mut state) = session();
        state.select_choropleth("cases.csv").await.unwrap();
        let before = state.revision();
        state.select_choropleth("nope.csv").await.unwrap();
        assert_eq!(state.revision(), before);
        assert!(state.choropleth().is_some());
        assert_eq!(state.take_notices().len(), 1);
        assert!(state.notices().is_empty());
    }

    #[test]
    fn bad_upload_is_a_parse_failure() {
        let (_dir, mut state) = session();
        assert!(state.upload_boundaries("broken.geojson", b"{ nope").is_err());
        assert!(state.boundaries().is_none());
        assert!(state.notices()[0].message.contains(".geojson"));
    }

    #[tokio::test]
    async fn edit_then_reset() {
        let (_dir, mut state) = session();
        state.select_choropleth("cases.csv").await.unwrap();
        let id = state.choropleth().unwrap().id.clone();
        state.cache().store(1u8, &[&id, &"Cases"]);

        let value = state.edit_cell(0, "Cases", "42").unwrap();
        assert_eq!(value, CellValue::Number(42.0));
        assert!(state.choropleth().unwrap().edited);
        assert!(!state.cache().contains(&[&id, &"Cases"]));

        assert!(state.edit_cell(0, "Cases", "4.5").is_err());

        state.reset_table().unwrap();
        let table = state.choropleth().unwrap();
        assert!(!table.edited);
        assert_eq!(table.data.column("Cases").unwrap()[0], CellValue::Number(10.0));
    }

    #[test]
    fn coordinate_uploads_recreate_settings() {
        let (_dir, mut state) = session();
        let files = vec![("points.csv".to_string(), POINTS.as_bytes().to_vec())];
        state.upload_coordinates(&files).unwrap();
        let id = FileId::new("points.csv");
        assert!(state.update_layer(&id, |s| s.mode = RenderMode::Vector));
        assert_eq!(state.coordinate_layers()[&id].settings.mode, RenderMode::Vector);

        state.upload_coordinates(&files).unwrap();
        let layer = &state.coordinate_layers()[&id];
        assert_eq!(layer.settings.mode, RenderMode::Raster);
        assert_eq!(
            layer.columns,
            Some(CoordinateColumns {
                lat: "Latitude".into(),
                lon: "Longitude".into()
            })
        );
        assert_eq!(layer.value_options, vec!["Count".to_string(), UNIFORM.to_string()]);
        assert!(!state.update_layer(&FileId::new("other.csv"), |_| {}));
    }

    #[tokio::test]
    async fn category_colors_default_and_override() {
        let (_dir, mut state) = session();
        state.select_choropleth("cases.csv").await.unwrap();
        state.set_value_column("Region");
        let colors = state.category_colors();
        assert_eq!(colors.len(), 3);
        assert_eq!(colors[0].1, geomap_core::color::NAMED_COLORS[0].1);
        let pink: Color = "#ff00aa".parse().unwrap();
        state.set_category_color("East", pink);
        assert_eq!(state.category_colors()[1], (CellValue::Text("East".into()), pink));
    }

    #[tokio::test]
    async fn boundary_table_lists_key_property() {
        let (_dir, mut state) = session();
        assert!(state.boundary_table().is_err());
        state.select_boundaries("provinces.geojson").await.unwrap();
        let (key, values) = state.boundary_table().unwrap();
        assert_eq!(key, "name");
        assert_eq!(values, vec!["Alberta", "Ontario"]);
    }
}
