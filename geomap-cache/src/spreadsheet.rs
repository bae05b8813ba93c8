//! Binary spreadsheet support through `calamine`.

use crate::handler::SpreadsheetReader;
use calamine::{open_workbook_auto_from_rs, Reader};
use geomap_core::{GeomapError, Result};
use std::io::Cursor;

/// Reads the first worksheet of an `.xlsx`, `.xls` or OpenDocument file.
#[derive(Debug, Default, Clone, Copy)]
pub struct CalamineReader;

impl SpreadsheetReader for CalamineReader {
    fn read_rows(&self, name: &str, bytes: &[u8]) -> Result<Vec<Vec<String>>> {
        let spreadsheet_error = |reason: String| GeomapError::Spreadsheet {
            name: name.to_string(),
            reason,
        };

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| spreadsheet_error(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| spreadsheet_error("workbook has no worksheets".to_string()))?
            .map_err(|e| spreadsheet_error(e.to_string()))?;

        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        log::debug!("[Geomap] spreadsheet: {} rows in first sheet of {}", rows.len(), name);
        Ok(rows)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    pub(crate) fn cases_xlsx() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Location").unwrap();
        sheet.write_string(0, 1, "Cases").unwrap();
        sheet.write_string(1, 0, "Alberta").unwrap();
        sheet.write_number(1, 1, 10).unwrap();
        sheet.write_string(2, 0, "Ontario").unwrap();
        sheet.write_number(2, 1, 20.5).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn reads_first_sheet() {
        let rows = CalamineReader.read_rows("cases.xlsx", &cases_xlsx()).unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["Location".to_string(), "Cases".to_string()],
                vec!["Alberta".to_string(), "10".to_string()],
                vec!["Ontario".to_string(), "20.5".to_string()],
            ]
        );
    }

    #[test]
    fn garbage_is_a_spreadsheet_error() {
        let err = CalamineReader.read_rows("broken.xlsx", b"not a workbook").unwrap_err();
        assert!(matches!(err, GeomapError::Spreadsheet { .. }));
        assert!(err.to_string().contains("broken.xlsx"));
    }
}
