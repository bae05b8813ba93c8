//! Command implementations for the Geomap CLI.
//!
//! Each subcommand builds an [`AppState`] against a local data directory,
//! runs the matching handlers, and writes its output file.

use clap::{Args, Subcommand};
use geomap_app::{AppState, MapConfig};
use std::path::Path;

pub mod inspect;
pub mod render;

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct Session {
    /// JSON file of settings overriding the defaults
    #[arg(short = 'c', long)]
    pub config: Option<String>,

    /// Directory that table and GeoJSON names are resolved against
    #[arg(short = 'd', long)]
    pub data_dir: Option<String>,
}

impl Session {
    pub fn state(&self) -> anyhow::Result<AppState> {
        let mut config = match &self.config {
            Some(path) => MapConfig::load(Path::new(path))?,
            None => {
                let mut config = MapConfig::default();
                config.cache.local_base = "./".to_string();
                config.boundary_dir = "./".to_string();
                config
            }
        };
        if let Some(dir) = &self.data_dir {
            let base = dir_prefix(dir);
            config.cache.local_base = base.clone();
            config.boundary_dir = base;
        }
        Ok(AppState::new(config))
    }
}

fn dir_prefix(dir: &str) -> String {
    if dir.is_empty() || dir.ends_with('/') {
        dir.to_string()
    } else {
        format!("{}/", dir)
    }
}

/// Log and drop every pending notice.
pub fn flush_notices(state: &mut AppState) {
    for notice in state.take_notices() {
        notice.log();
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Render a table and/or coordinate files over GeoJSON boundaries to HTML
    Render {
        #[command(flatten)]
        session: Session,

        /// Choropleth table, joined to the boundaries
        #[arg(short = 't', long)]
        table: Option<String>,

        /// GeoJSON boundaries
        #[arg(short = 'g', long)]
        geojson: Option<String>,

        /// Coordinate tables with latitude/longitude columns
        #[arg(short = 'p', long = "points")]
        points: Vec<String>,

        /// Draw coordinate layers as vector markers instead of a heat layer
        #[arg(long)]
        vector: bool,

        /// Blend point density into coordinate values
        #[arg(long)]
        density: bool,

        /// Coordinate value column (defaults to uniform values)
        #[arg(long)]
        value: Option<String>,

        /// Write the map document as JSON instead of HTML
        #[arg(long)]
        json: bool,

        /// Output path
        #[arg(short = 'o', long, default_value = "heatmap.html")]
        output: String,
    },

    /// Show how the columns of a table are classified
    Classify {
        #[command(flatten)]
        session: Session,

        /// Table to classify
        #[arg(short = 't', long)]
        table: String,
    },

    /// List a GeoJSON property for every feature
    Properties {
        #[command(flatten)]
        session: Session,

        /// GeoJSON boundaries
        #[arg(short = 'g', long)]
        geojson: String,

        /// Property to list (defaults to the detected join property)
        #[arg(long)]
        property: Option<String>,
    },

    /// Convert a table to the configured download format
    ExportTable {
        #[command(flatten)]
        session: Session,

        /// Table to export
        #[arg(short = 't', long)]
        table: String,

        /// Download extension: .txt, .csv, .tsv or .xlsx
        #[arg(short = 'f', long)]
        format: Option<String>,

        /// Directory to write table<ext> into
        #[arg(short = 'o', long, default_value = ".")]
        output_dir: String,
    },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Render {
            session,
            table,
            geojson,
            points,
            vector,
            density,
            value,
            json,
            output,
        } => {
            let layer = render::LayerFlags {
                vector,
                density,
                value,
            };
            render::run_render(
                &session,
                table.as_deref(),
                geojson.as_deref(),
                &points,
                &layer,
                json,
                &output,
            )
            .await
        }
        Command::Classify { session, table } => inspect::run_classify(&session, &table).await,
        Command::Properties {
            session,
            geojson,
            property,
        } => inspect::run_properties(&session, &geojson, property.as_deref()).await,
        Command::ExportTable {
            session,
            table,
            format,
            output_dir,
        } => render::run_export_table(&session, &table, format.as_deref(), &output_dir).await,
    }
}
