//! Value → color mapping.
//!
//! Two shapes of map:
//!
//! - **Categorical**: a step map, one color per category index. Categories
//!   are indexed in first-seen order and looked up by their original value.
//! - **Linear**: anchor colors evenly spaced over `[min, max]`, interpolated
//!   in RGB space.

use geomap_core::color::NAMED_COLORS;
use geomap_core::{CellValue, Color, GeomapError, Palette, Result};
use geomap_utils::labels::sanitize;
use std::collections::{HashMap, HashSet};

/// Discrete map from category value to color.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalMap {
    index: HashMap<String, usize>,
    colors: Vec<Color>,
}

impl CategoricalMap {
    /// Category `i` gets `colors[i]`. Categories beyond the supplied colors
    /// reuse the last color.
    pub fn new(categories: &[CellValue], colors: &[Color]) -> Result<Self> {
        if colors.is_empty() {
            return Err(GeomapError::Guard(
                "Please specify at least one color".to_string(),
            ));
        }
        let mut index = HashMap::new();
        for category in categories {
            let next = index.len();
            index.entry(category.key()).or_insert(next);
        }
        Ok(Self {
            index,
            colors: colors.to_vec(),
        })
    }

    pub fn color(&self, value: &CellValue) -> Option<Color> {
        self.index
            .get(&value.key())
            .map(|&i| self.colors[i.min(self.colors.len() - 1)])
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Continuous map over a numeric domain.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearMap {
    anchors: Vec<Color>,
    min: f64,
    max: f64,
}

impl LinearMap {
    /// A single color is duplicated into a flat two-stop ramp.
    pub fn new(colors: &[Color], min: f64, max: f64) -> Result<Self> {
        let anchors = match colors {
            [] => {
                return Err(GeomapError::Guard(
                    "Please specify at least one color".to_string(),
                ))
            }
            [only] => vec![*only, *only],
            many => many.to_vec(),
        };
        Ok(Self { anchors, min, max })
    }

    /// Build over the observed range of `values`.
    pub fn over(colors: &[Color], values: &[f64]) -> Result<Self> {
        let (min, max) = value_range(values).unwrap_or((0.0, 0.0));
        Self::new(colors, min, max)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn color(&self, value: f64) -> Color {
        let span = self.max - self.min;
        if span.is_nan() || span <= 0.0 {
            return self.anchors[0];
        }
        let t = ((value - self.min) / span).clamp(0.0, 1.0);
        let segments = (self.anchors.len() - 1) as f64;
        let position = t * segments;
        let i = (position.floor() as usize).min(self.anchors.len() - 2);
        self.anchors[i].lerp(&self.anchors[i + 1], position - i as f64)
    }
}

/// Either kind of map, chosen from the data.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorMap {
    Categorical(CategoricalMap),
    Linear(LinearMap),
}

impl ColorMap {
    /// Numeric values get a linear map over `palette`; anything else gets a
    /// categorical map using `category_colors` with the default palette
    /// filling the gaps.
    pub fn for_values(
        values: &[CellValue],
        palette: Palette,
        category_colors: &HashMap<String, Color>,
    ) -> Result<Self> {
        if is_numeric(values) {
            let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
            return LinearMap::over(&palette.anchors(), &numbers).map(ColorMap::Linear);
        }
        let categories = unique_values(values);
        let defaults = default_category_colors(categories.len());
        let colors: Vec<Color> = categories
            .iter()
            .zip(defaults)
            .map(|(category, default)| {
                category_colors
                    .get(&category.key())
                    .copied()
                    .unwrap_or(default)
            })
            .collect();
        CategoricalMap::new(&categories, &colors).map(ColorMap::Categorical)
    }

    pub fn color(&self, value: &CellValue) -> Option<Color> {
        match self {
            ColorMap::Categorical(map) => map.color(value),
            ColorMap::Linear(map) => value.as_f64().map(|v| map.color(v)),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColorMap::Linear(_))
    }
}

/// True when every unique value parses as a float.
pub fn is_numeric(values: &[CellValue]) -> bool {
    unique_values(values).iter().all(|v| v.as_f64().is_some())
}

/// Unique values in first-seen order.
pub fn unique_values(values: &[CellValue]) -> Vec<CellValue> {
    let mut seen = HashSet::new();
    values
        .iter()
        .filter(|v| seen.insert(v.key()))
        .cloned()
        .collect()
}

/// Default color per category: one palette slot per category, sticking on
/// the last slot once the palette runs out.
pub fn default_category_colors(count: usize) -> Vec<Color> {
    (0..count)
        .map(|i| NAMED_COLORS[i.min(NAMED_COLORS.len() - 1)].1)
        .collect()
}

/// Identifier-safe label for a category. Lookups still use the raw value.
pub fn category_label(value: &CellValue) -> String {
    sanitize(&value.key())
}

/// `(min, max)` of the finite values, `None` when there are none.
pub fn value_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
