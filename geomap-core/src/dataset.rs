//! Typed, column-classified tables.
//!
//! A [`Dataset`] is an ordered list of named columns of equal length plus a
//! row index. The index keeps the original row labels, so rows dropped by a
//! filter leave gaps instead of renumbering the survivors.

use crate::error::{GeomapError, Result};
use geomap_utils::numbers::{format_number, parse_float};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A single table cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Numeric view of the cell. Text cells are parsed leniently.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => parse_float(s),
        }
    }

    /// String form used for joins and category lookups.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Classification of a whole column.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Text,
}

/// Datatype applied to edited table cells.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize, Default)]
pub enum CellType {
    #[default]
    Integer,
    Float,
    String,
}

impl CellType {
    /// Convert raw user input into a cell of this type.
    pub fn convert(&self, raw: &str) -> Result<CellValue> {
        match self {
            CellType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(|i| CellValue::Number(i as f64))
                .map_err(|_| GeomapError::InvalidCell {
                    value: raw.to_string(),
                    expected: "Integer".to_string(),
                }),
            CellType::Float => parse_float(raw)
                .map(CellValue::Number)
                .ok_or_else(|| GeomapError::InvalidCell {
                    value: raw.to_string(),
                    expected: "Float".to_string(),
                }),
            CellType::String => Ok(CellValue::Text(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Column {
    name: String,
    values: Vec<CellValue>,
}

/// A named table of typed columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    name: String,
    columns: Vec<Column>,
    index: Vec<usize>,
}

impl Dataset {
    /// An empty table with no columns and no rows.
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            index: Vec::new(),
        }
    }

    /// Build a table from raw string records.
    ///
    /// Each column is Numeric when every non-empty cell parses as a float,
    /// otherwise Text. Empty cells are filled with the number 0. Short rows
    /// are padded with empty cells.
    pub fn from_records(name: &str, header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let mut columns = Vec::with_capacity(header.len());
        for (c, column_name) in header.into_iter().enumerate() {
            let raw: Vec<&str> = rows
                .iter()
                .map(|row| row.get(c).map(|s| s.as_str()).unwrap_or(""))
                .collect();
            let numeric = raw
                .iter()
                .filter(|s| !s.trim().is_empty())
                .all(|s| parse_float(s).is_some());
            let values = raw
                .into_iter()
                .map(|s| {
                    if s.trim().is_empty() {
                        CellValue::Number(0.0)
                    } else if numeric {
                        CellValue::Number(parse_float(s).unwrap_or(0.0))
                    } else {
                        CellValue::Text(s.to_string())
                    }
                })
                .collect();
            columns.push(Column {
                name: column_name,
                values,
            });
        }
        Self {
            name: name.to_string(),
            columns,
            index: (0..rows.len()).collect(),
        }
    }

    /// Build a table from already-typed columns. All columns must have equal length.
    pub fn from_columns(name: &str, columns: Vec<(String, Vec<CellValue>)>) -> Result<Self> {
        let rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        if let Some((bad, _)) = columns.iter().find(|(_, v)| v.len() != rows) {
            return Err(GeomapError::Validation(format!(
                "Column {} does not have {} rows",
                bad, rows
            )));
        }
        Ok(Self {
            name: name.to_string(),
            columns: columns
                .into_iter()
                .map(|(name, values)| Column { name, values })
                .collect(),
            index: (0..rows).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row_count(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Row labels, in row order.
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    /// Column names in their original order and casing.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Exact-match column lookup.
    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&[CellValue]> {
        self.position(name).map(|i| self.columns[i].values.as_slice())
    }

    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        self.column(name).map(|values| {
            if values.iter().all(|v| matches!(v, CellValue::Number(_))) {
                ColumnKind::Numeric
            } else {
                ColumnKind::Text
            }
        })
    }

    /// Numeric view of a column; fails if any cell is not a number.
    pub fn numbers(&self, name: &str) -> Result<Vec<f64>> {
        let values = self
            .column(name)
            .ok_or_else(|| GeomapError::ColumnNotFound(name.to_string()))?;
        values
            .iter()
            .map(|v| {
                v.as_f64().ok_or_else(|| GeomapError::InvalidCell {
                    value: v.to_string(),
                    expected: "Float".to_string(),
                })
            })
            .collect()
    }

    /// Unique values of a column in first-seen order.
    pub fn unique_values(&self, name: &str) -> Result<Vec<CellValue>> {
        let values = self
            .column(name)
            .ok_or_else(|| GeomapError::ColumnNotFound(name.to_string()))?;
        let mut seen = HashSet::new();
        Ok(values
            .iter()
            .filter(|v| seen.insert(v.key()))
            .cloned()
            .collect())
    }

    /// Cells of one row, in column order.
    pub fn row(&self, row: usize) -> Option<Vec<&CellValue>> {
        if row >= self.row_count() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[row]).collect())
    }

    /// Keep only the rows for which `keep(row_position)` is true.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize) -> bool,
    {
        let mask: Vec<bool> = (0..self.row_count()).map(&mut keep).collect();
        let filter = |values: &mut Vec<CellValue>| {
            let mut i = 0;
            values.retain(|_| {
                let k = mask[i];
                i += 1;
                k
            });
        };
        for column in self.columns.iter_mut() {
            filter(&mut column.values);
        }
        let mut i = 0;
        self.index.retain(|_| {
            let k = mask[i];
            i += 1;
            k
        });
    }

    pub fn set_cell(&mut self, row: usize, column: &str, value: CellValue) -> Result<()> {
        let rows = self.row_count();
        let c = self
            .position(column)
            .ok_or_else(|| GeomapError::ColumnNotFound(column.to_string()))?;
        if row >= rows {
            return Err(GeomapError::Validation(format!(
                "Row {} is out of range ({} rows)",
                row, rows
            )));
        }
        self.columns[c].values[row] = value;
        Ok(())
    }

    /// Apply a table edit, converting the raw input to the configured datatype.
    pub fn patch_cell(&mut self, row: usize, column: &str, raw: &str, cell_type: CellType) -> Result<CellValue> {
        let value = cell_type.convert(raw)?;
        self.set_cell(row, column, value.clone())?;
        Ok(value)
    }

    /// Append a column, or replace it if a column of that name already exists.
    pub fn push_column(&mut self, name: &str, values: Vec<CellValue>) -> Result<()> {
        if !self.columns.is_empty() && values.len() != self.row_count() {
            return Err(GeomapError::Validation(format!(
                "Column {} has {} rows, expected {}",
                name,
                values.len(),
                self.row_count()
            )));
        }
        if self.columns.is_empty() {
            self.index = (0..values.len()).collect();
        }
        match self.position(name) {
            Some(c) => self.columns[c].values = values,
            None => self.columns.push(Column {
                name: name.to_string(),
                values,
            }),
        }
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}
