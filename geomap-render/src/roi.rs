//! Range-of-interest filtering of layer values.

use geomap_core::{CellValue, Dataset, GeomapError, Result};
use serde::{Deserialize, Serialize};

/// What happens to a value outside the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RoiMode {
    /// Drop the point or row.
    #[default]
    Remove,
    /// Clamp the value to the nearest bound.
    Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeOfInterest {
    pub enabled: bool,
    pub mode: RoiMode,
    pub min: f64,
    pub max: f64,
}

impl Default for RangeOfInterest {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: RoiMode::Remove,
            min: 0.0,
            max: 0.0,
        }
    }
}

impl RangeOfInterest {
    pub fn new(mode: RoiMode, min: f64, max: f64) -> Self {
        Self {
            enabled: true,
            mode,
            min,
            max,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// The value after filtering, `None` when it is removed.
    pub fn apply(&self, value: f64) -> Option<f64> {
        if !self.enabled || self.contains(value) {
            return Some(value);
        }
        match self.mode {
            RoiMode::Remove => None,
            RoiMode::Round => Some(value.max(self.min).min(self.max)),
        }
    }

    /// Filter a list of values, keeping order.
    pub fn filter(&self, values: &[f64]) -> Vec<f64> {
        values.iter().filter_map(|&v| self.apply(v)).collect()
    }

    /// Apply the range to a numeric dataset column in place: rows are dropped
    /// or their cells clamped. Removing every row is a validation failure.
    pub fn apply_to_column(&self, dataset: &mut Dataset, column: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let values = dataset.numbers(column)?;
        match self.mode {
            RoiMode::Remove => dataset.retain_rows(|row| self.contains(values[row])),
            RoiMode::Round => {
                let clamped = values
                    .iter()
                    .map(|&v| CellValue::Number(self.apply(v).unwrap_or(v)))
                    .collect();
                dataset.push_column(column, clamped)?;
            }
        }
        if dataset.is_empty() {
            return Err(GeomapError::Validation(format!(
                "No values of {} are between {} and {}",
                column, self.min, self.max
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_and_round() {
        let values = [-5.0, 5.0, 15.0];
        assert_eq!(RangeOfInterest::new(RoiMode::Remove, 0.0, 10.0).filter(&values), vec![5.0]);
        assert_eq!(
            RangeOfInterest::new(RoiMode::Round, 0.0, 10.0).filter(&values),
            vec![0.0, 5.0, 10.0]
        );
    }

    #[test]
    fn disabled_keeps_everything() {
        let roi = RangeOfInterest::default();
        assert_eq!(roi.filter(&[-5.0, 100.0]), vec![-5.0, 100.0]);
    }

    #[test]
    fn bounds_are_inclusive() {
        let roi = RangeOfInterest::new(RoiMode::Remove, 0.0, 10.0);
        assert_eq!(roi.filter(&[0.0, 10.0]), vec![0.0, 10.0]);
    }

    fn table(values: &[&str]) -> Dataset {
        Dataset::from_records(
            "t.csv",
            vec!["Name".into(), "Value".into()],
            values
                .iter()
                .enumerate()
                .map(|(i, v)| vec![format!("r{}", i), v.to_string()])
                .collect(),
        )
    }

    #[test]
    fn dataset_remove_drops_rows() {
        let mut ds = table(&["-5", "5", "15"]);
        RangeOfInterest::new(RoiMode::Remove, 0.0, 10.0)
            .apply_to_column(&mut ds, "Value")
            .unwrap();
        assert_eq!(ds.row_count(), 1);
        assert_eq!(ds.index(), &[1]);
    }

    #[test]
    fn dataset_round_clamps_cells() {
        let mut ds = table(&["-5", "5", "15"]);
        RangeOfInterest::new(RoiMode::Round, 0.0, 10.0)
            .apply_to_column(&mut ds, "Value")
            .unwrap();
        assert_eq!(ds.numbers("Value").unwrap(), vec![0.0, 5.0, 10.0]);
    }

    #[test]
    fn dataset_remove_everything_is_validation_error() {
        let mut ds = table(&["50", "60"]);
        let err = RangeOfInterest::new(RoiMode::Remove, 0.0, 10.0)
            .apply_to_column(&mut ds, "Value")
            .unwrap_err();
        assert_eq!(err.class(), geomap_core::ErrorClass::Validation);
    }
}
