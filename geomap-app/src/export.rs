//! Table and map downloads.

use crate::notice::Notice;
use crate::orchestrate::RenderOutcome;
use crate::state::AppState;
use anyhow::{anyhow, Context};
use geomap_core::Dataset;
use geomap_render::MapDocument;

static MAP_DOCUMENT_JS: &str = include_str!("../assets/js/map-document.js");

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const LEAFLET_HEAT_JS: &str = "https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js";

pub const MAP_FILENAME: &str = "heatmap.html";

pub const EMPTY_TABLE: &str =
    "The downloaded table is empty! Please upload your data or select an example data set in the sidebar.";

/// Table download format, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Aligned plain text with a row index column.
    Text,
    Csv,
    Tsv,
    /// No spreadsheet writer is available; written as [`TableFormat::Text`].
    Xlsx,
}

impl TableFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            ".txt" => Some(TableFormat::Text),
            ".csv" => Some(TableFormat::Csv),
            ".tsv" => Some(TableFormat::Tsv),
            ".xlsx" => Some(TableFormat::Xlsx),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TableFormat::Text => ".txt",
            TableFormat::Csv => ".csv",
            TableFormat::Tsv => ".tsv",
            TableFormat::Xlsx => ".xlsx",
        }
    }

    pub fn render(&self, data: &Dataset) -> anyhow::Result<String> {
        match self {
            TableFormat::Text => Ok(to_text(data)),
            TableFormat::Csv => to_delimited(data, b','),
            TableFormat::Tsv => to_delimited(data, b'\t'),
            TableFormat::Xlsx => {
                log::warn!("[Geomap] export: No .xlsx writer available, writing plain text");
                Ok(to_text(data))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableExport {
    pub filename: String,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapExport {
    pub filename: String,
    pub contents: String,
}

fn cells(data: &Dataset) -> Vec<Vec<String>> {
    (0..data.row_count())
        .map(|row| {
            data.row(row)
                .unwrap_or_default()
                .iter()
                .map(|v| v.to_string())
                .collect()
        })
        .collect()
}

/// Right-aligned columns separated by two spaces, led by the row index.
pub fn to_text(data: &Dataset) -> String {
    let header = data.column_names();
    let rows = cells(data);
    let index: Vec<String> = data.index().iter().map(|i| i.to_string()).collect();
    let index_width = index.iter().map(|i| i.len()).max().unwrap_or(0);

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(col, name)| {
            rows.iter()
                .map(|r| r[col].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |lead: &str, values: &[String]| {
        let mut out = format!("{:<width$}", lead, width = index_width);
        for (value, width) in values.iter().zip(&widths) {
            out.push_str(&format!("  {:>width$}", value, width = *width));
        }
        out
    };

    let mut lines = vec![line("", &header)];
    for (label, row) in index.iter().zip(&rows) {
        lines.push(line(label, row));
    }
    lines.join("\n")
}

fn to_delimited(data: &Dataset, delimiter: u8) -> anyhow::Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(data.column_names())?;
    for row in cells(data) {
        writer.write_record(&row)?;
    }
    let bytes = writer.into_inner().map_err(|e| anyhow!("{}", e))?;
    String::from_utf8(bytes).context("table is not valid UTF-8")
}

/// A self-contained page drawing `map` with Leaflet.
pub fn map_html(map: &MapDocument) -> anyhow::Result<String> {
    let document = map.to_json().context("serializing map document")?;
    // `</` would end the inline script early.
    let document = document.replace("</", "<\\/");
    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Geomap</title>
<link rel="stylesheet" href="{css}">
<script src="{leaflet}"></script>
<script src="{heat}"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
{script}
renderMapDocument("map", {document});
</script>
</body>
</html>
"#,
        css = LEAFLET_CSS,
        leaflet = LEAFLET_JS,
        heat = LEAFLET_HEAT_JS,
        script = MAP_DOCUMENT_JS,
        document = document,
    ))
}

impl AppState {
    /// The current choropleth table in the configured download format.
    ///
    /// An empty or missing table still exports, with an error notice.
    pub fn export_table(&mut self) -> anyhow::Result<TableExport> {
        let extension = self.config.download_type.clone();
        let format = TableFormat::from_extension(&extension).unwrap_or(TableFormat::Text);
        let data = match self.choropleth() {
            Some(table) => table.data.clone(),
            None => Dataset::empty("table"),
        };
        if data.is_empty() {
            self.notify(Notice::error(EMPTY_TABLE));
        }
        let contents = format.render(&data)?;
        log::info!(
            "[Geomap] export: Wrote {} rows as table{}",
            data.row_count(),
            format.extension()
        );
        Ok(TableExport {
            filename: format!("table{}", format.extension()),
            contents,
        })
    }

    /// The current map as HTML, rendering again when the state has changed.
    pub fn export_map(&mut self) -> anyhow::Result<MapExport> {
        let map = match self.current_map() {
            Some(map) => map.clone(),
            None => match self.render() {
                RenderOutcome::Map(map) | RenderOutcome::Placeholder { map, .. } => map,
                RenderOutcome::Message { message, .. } => return Err(anyhow!(message)),
            },
        };
        Ok(MapExport {
            filename: MAP_FILENAME.to_string(),
            contents: map_html(&map)?,
        })
    }
}
