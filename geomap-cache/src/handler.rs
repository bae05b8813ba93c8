//! Parsing raw file bytes into cache resources.
//!
//! The handler is chosen by file extension:
//!
//! - **`.geojson`**: boundary collection
//! - **`.csv`**: comma separated table
//! - **`.tsv`, `.tab`, `.txt`, `.dat`**: tab separated table
//! - **`.xlsx`, `.xls`, `.odf`**: table, through the [`SpreadsheetReader`]
//!   ([`CalamineReader`] unless another is registered)
//! - anything else: raw text
//!
//! Tables whose first row is entirely numeric are treated as headerless and
//! get synthetic column names `Column 0..N`.

use crate::progress::Progress;
use crate::resource::Resource;
use crate::spreadsheet::CalamineReader;
use geomap_core::{BoundaryCollection, Dataset, GeomapError, Result};
use geomap_utils::labels::extension;
use geomap_utils::numbers::all_numeric;

/// Extensions accepted as tables.
pub const TABLE_EXTENSIONS: [&str; 8] = [".csv", ".tsv", ".txt", ".dat", ".tab", ".xls", ".xlsx", ".odf"];

/// Extensions that need a spreadsheet reader.
pub const SPREADSHEET_EXTENSIONS: [&str; 3] = [".xlsx", ".xls", ".odf"];

/// Turns a fetched file into a [`Resource`].
pub trait DataHandler {
    fn handle(&self, name: &str, bytes: &[u8], progress: &mut dyn Progress) -> Result<Resource>;
}

/// Reads binary spreadsheets into raw rows (first row is the header row).
pub trait SpreadsheetReader {
    fn read_rows(&self, name: &str, bytes: &[u8]) -> Result<Vec<Vec<String>>>;
}

/// Extension-dispatching handler used by default.
pub struct DefaultHandler {
    spreadsheet: Option<Box<dyn SpreadsheetReader>>,
}

impl Default for DefaultHandler {
    fn default() -> Self {
        Self {
            spreadsheet: Some(Box::new(CalamineReader)),
        }
    }
}

impl DefaultHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the reader for `.xlsx`, `.xls` and `.odf` files.
    pub fn with_spreadsheet_reader(mut self, reader: Box<dyn SpreadsheetReader>) -> Self {
        self.spreadsheet = Some(reader);
        self
    }
}

impl DataHandler for DefaultHandler {
    fn handle(&self, name: &str, bytes: &[u8], progress: &mut dyn Progress) -> Result<Resource> {
        let ext = extension(name);
        match ext.as_str() {
            ".geojson" => {
                let text = String::from_utf8_lossy(bytes);
                Ok(Resource::Boundaries(BoundaryCollection::parse(name, &text)?))
            }
            ".csv" => parse_delimited(name, bytes, b',', progress).map(Resource::Table),
            ".txt" | ".dat" | ".tsv" | ".tab" => {
                parse_delimited(name, bytes, b'\t', progress).map(Resource::Table)
            }
            ".xlsx" | ".xls" | ".odf" => match &self.spreadsheet {
                Some(reader) => {
                    progress.inc("Reading Table...");
                    let rows = reader.read_rows(name, bytes)?;
                    Ok(Resource::Table(rows_to_dataset(name, rows, progress)))
                }
                None => Err(GeomapError::UnsupportedFormat {
                    name: name.to_string(),
                    extension: ext,
                }),
            },
            _ => Ok(Resource::Text(String::from_utf8_lossy(bytes).into_owned())),
        }
    }
}

/// Parse delimited text into a dataset.
pub fn parse_delimited(name: &str, bytes: &[u8], delimiter: u8, progress: &mut dyn Progress) -> Result<Dataset> {
    progress.inc("Reading Table...");
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|source| GeomapError::Csv {
            name: name.to_string(),
            source,
        })?;
        rows.push(record.iter().map(|s| s.to_string()).collect::<Vec<String>>());
    }
    Ok(rows_to_dataset(name, rows, progress))
}

/// Split raw rows into header and body, applying the numeric-header heuristic.
pub fn rows_to_dataset(name: &str, mut rows: Vec<Vec<String>>, progress: &mut dyn Progress) -> Dataset {
    if rows.is_empty() {
        log::warn!("[Geomap] handler: {} has no rows", name);
        return Dataset::empty(name);
    }

    let header_is_data = all_numeric(rows[0].iter().map(|s| s.as_str()));
    let header = if header_is_data {
        progress.inc("Generating indices...");
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        (0..width).map(|i| format!("Column {}", i)).collect()
    } else {
        rows.remove(0).into_iter().map(|h| h.trim().to_string()).collect()
    };

    let dataset = Dataset::from_records(name, header, rows);
    log::info!(
        "[Geomap] handler: Parsed {} rows x {} columns from {}",
        dataset.row_count(),
        dataset.column_names().len(),
        name
    );
    dataset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{NoProgress, RecordingProgress};
    use geomap_core::{CellValue, ColumnKind};

    #[test]
    fn csv_with_header() {
        let csv = "Name,Value\nAlberta,10\nOntario,\n";
        let resource = DefaultHandler::new()
            .handle("data.csv", csv.as_bytes(), &mut NoProgress)
            .unwrap();
        let ds = resource.into_table().unwrap();
        assert_eq!(ds.column_names(), vec!["Name", "Value"]);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.column("Value").unwrap()[1], CellValue::Number(0.0));
    }

    #[test]
    fn numeric_first_row_means_headerless() {
        let tsv = "53.5\t-113.5\t4\n53.6\t-113.4\t2\n";
        let mut progress = RecordingProgress::default();
        let ds = DefaultHandler::new()
            .handle("points.tsv", tsv.as_bytes(), &mut progress)
            .unwrap()
            .into_table()
            .unwrap();
        assert_eq!(ds.column_names(), vec!["Column 0", "Column 1", "Column 2"]);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.column_kind("Column 1"), Some(ColumnKind::Numeric));
        assert!(progress.messages.iter().any(|m| m.starts_with("Generating")));
    }

    #[test]
    fn txt_is_tab_separated() {
        let txt = "lat\tlon\n1\t2\n";
        let ds = DefaultHandler::new()
            .handle("points.txt", txt.as_bytes(), &mut NoProgress)
            .unwrap()
            .into_table()
            .unwrap();
        assert_eq!(ds.column_names(), vec!["lat", "lon"]);
    }

    #[test]
    fn geojson_dispatch() {
        let geojson = r#"{"type":"FeatureCollection","features":[]}"#;
        let resource = DefaultHandler::new()
            .handle("empty.geojson", geojson.as_bytes(), &mut NoProgress)
            .unwrap();
        assert_eq!(resource.kind(), "boundaries");
    }

    #[test]
    fn spreadsheet_without_reader_is_unsupported() {
        let err = DefaultHandler { spreadsheet: None }
            .handle("book.xlsx", b"PK", &mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, GeomapError::UnsupportedFormat { .. }));
    }

    struct FixedReader;

    impl SpreadsheetReader for FixedReader {
        fn read_rows(&self, _name: &str, _bytes: &[u8]) -> Result<Vec<Vec<String>>> {
            Ok(vec![
                vec!["Country".into(), "Count".into()],
                vec!["Chile".into(), "3".into()],
            ])
        }
    }

    #[test]
    fn spreadsheet_with_reader() {
        let ds = DefaultHandler::new()
            .with_spreadsheet_reader(Box::new(FixedReader))
            .handle("book.xlsx", b"PK", &mut NoProgress)
            .unwrap()
            .into_table()
            .unwrap();
        assert_eq!(ds.column_names(), vec!["Country", "Count"]);
        assert_eq!(ds.column("Count").unwrap()[0], CellValue::Number(3.0));
    }

    #[test]
    fn xlsx_loads_with_default_reader() {
        let bytes = crate::spreadsheet::tests::cases_xlsx();
        let ds = DefaultHandler::new()
            .handle("cases.xlsx", &bytes, &mut NoProgress)
            .unwrap()
            .into_table()
            .unwrap();
        assert_eq!(ds.column_names(), vec!["Location", "Cases"]);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.column("Cases").unwrap()[1], CellValue::Number(20.5));
    }

    #[test]
    fn other_extensions_are_text() {
        let resource = DefaultHandler::new()
            .handle("notes.md", b"hello", &mut NoProgress)
            .unwrap();
        assert_eq!(resource, Resource::Text("hello".into()));
    }
}
