//! Core types for Geomap.
//!
//! - `dataset`: typed tables loaded from user files
//! - `boundary`: GeoJSON boundary collections and bounding boxes
//! - `column`: column role inference for table columns and GeoJSON properties
//! - `color`: RGB colors and the fixed palettes
//! - `error`: the error taxonomy shared by every crate

pub mod boundary;
pub mod color;
pub mod column;
pub mod dataset;
pub mod error;

pub use boundary::{BoundaryCollection, BoundaryFeature, Bounds};
pub use color::{Color, Palette};
pub use column::{choose_value_column, classify_column, classify_columns, match_column, ColumnRole};
pub use dataset::{CellType, CellValue, ColumnKind, Dataset};
pub use error::{ErrorClass, GeomapError, Result};
