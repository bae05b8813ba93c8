//! Map rendering and table export.

use crate::{flush_notices, Session};
use geomap_app::{map_html, RenderOutcome, TableFormat};
use geomap_render::{RenderMode, ValueSource};
use log::info;
use std::path::Path;

/// Coordinate layer overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct LayerFlags {
    pub vector: bool,
    pub density: bool,
    pub value: Option<String>,
}

/// Load the given files, render the map and write it to `output`.
pub async fn run_render(
    session: &Session,
    table: Option<&str>,
    geojson: Option<&str>,
    points: &[String],
    flags: &LayerFlags,
    json: bool,
    output: &str,
) -> anyhow::Result<()> {
    let mut state = session.state()?;
    if let Some(table) = table {
        state.select_choropleth(table).await?;
    }
    if let Some(geojson) = geojson {
        state.select_boundaries(geojson).await?;
    }
    if !points.is_empty() {
        state.select_coordinates(points).await?;
    }

    let ids: Vec<_> = state.coordinate_layers().keys().cloned().collect();
    for id in &ids {
        state.update_layer(id, |settings| {
            if flags.vector {
                settings.mode = RenderMode::Vector;
            }
            settings.density = flags.density;
            if let Some(column) = &flags.value {
                settings.value = ValueSource::Column(column.clone());
            }
        });
    }

    let outcome = state.render();
    flush_notices(&mut state);
    let map = match outcome {
        RenderOutcome::Map(map) => map,
        RenderOutcome::Placeholder { map, message } => {
            log::warn!("[Geomap] {}", message);
            map
        }
        RenderOutcome::Message { message, .. } => anyhow::bail!(message),
    };

    let contents = if json {
        serde_json::to_string_pretty(&map)?
    } else {
        map_html(&map)?
    };
    std::fs::write(output, contents)?;
    info!("Wrote {} layers to {}", map.layers.len(), output);
    Ok(())
}

/// Load a table and write it as `table<ext>` under `output_dir`.
pub async fn run_export_table(
    session: &Session,
    table: &str,
    format: Option<&str>,
    output_dir: &str,
) -> anyhow::Result<()> {
    let mut state = session.state()?;
    if let Some(format) = format {
        let format = TableFormat::from_extension(format)
            .ok_or_else(|| anyhow::anyhow!("Unsupported table format {}", format))?;
        let extension = format.extension().to_string();
        state.update_config(|config| config.download_type = extension);
    }
    state.select_choropleth(table).await?;
    if state.choropleth().is_none() {
        flush_notices(&mut state);
        anyhow::bail!("{} could not be loaded", table);
    }
    let export = state.export_table()?;
    flush_notices(&mut state);

    let path = Path::new(output_dir).join(&export.filename);
    std::fs::write(&path, export.contents)?;
    info!("Exported {} to {}", table, path.display());
    Ok(())
}
