//! Map rendering for Geomap.
//!
//! Turns datasets and boundary collections into styled map layers:
//!
//! - `colormap`: categorical step maps and linear palette ramps
//! - `choropleth`: table ⋈ boundary join and polygon styling
//! - `coordinate`: raster heat and vector marker layers from lat/lon tables
//! - `density`: the kernel density estimator behind density coloring
//! - `roi`: range-of-interest filtering
//! - `models`: serializable primitives and the composed [`MapDocument`]

pub mod choropleth;
pub mod colormap;
pub mod coordinate;
pub mod density;
pub mod models;
pub mod roi;

pub use choropleth::{choropleth_layer, join_rows, render_choropleth, render_outlines, JoinKeys};
pub use colormap::{CategoricalMap, ColorMap, LinearMap};
pub use coordinate::{render_coordinate_layer, CoordinateColumns, LayerSettings, RenderMode, ValueSource};
pub use density::{DensityEstimator, GaussianKde};
pub use models::{MapDocument, MapLayer, RasterHeatLayer, Shape, StyledPoint, StyledPolygon};
pub use roi::{RangeOfInterest, RoiMode};
