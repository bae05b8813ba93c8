//! Geomap application layer.
//!
//! [`AppState`] holds one session's selections and runs the handlers that
//! change them; [`AppState::render`] rebuilds the map from scratch, and the
//! export functions turn the current table and map into downloadable files.

pub mod config;
pub mod export;
pub mod notice;
pub mod orchestrate;
pub mod state;

pub use config::MapConfig;
pub use export::{map_html, MapExport, TableExport, TableFormat};
pub use notice::{Notice, NoticeLevel};
pub use orchestrate::{CachedDensity, RenderOutcome, RenderStage};
pub use state::{AppState, ChoroplethTable, CoordinateLayer, FileId, Selection};
