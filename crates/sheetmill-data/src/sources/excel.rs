//! Excel-family data source using calamine.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::{DataError, Result};
use crate::sources::DataSource;
use crate::value::Value;

/// How date cells are rendered
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_datetime(datetime: &NaiveDateTime) -> String {
    datetime.format(DATETIME_FORMAT).to_string()
}

/// Excel workbook data source (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`)
pub struct ExcelSource {
    /// Path to the workbook file
    path: String,
    /// Sheet names cache
    sheet_names: Vec<String>,
}

impl ExcelSource {
    /// Create a new Excel source from a file path
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().display().to_string();

        if !path.as_ref().exists() {
            return Err(DataError::FileNotFound(path_str));
        }

        let workbook = open_workbook_auto(path.as_ref())
            .map_err(|e| DataError::WorkbookOpen(format!("{path_str}: {e}")))?;
        let sheet_names = workbook.sheet_names().to_vec();

        Ok(Self {
            path: path_str,
            sheet_names,
        })
    }

    /// Convert a calamine cell to a value
    fn cell_to_value(cell: &Data) -> Value {
        match cell {
            Data::Empty => Value::Empty,
            Data::String(s) => Value::String(s.clone()),
            Data::Int(i) => Value::Int(*i),
            Data::Float(f) => Value::Float(*f),
            Data::Bool(b) => Value::Bool(*b),
            Data::Error(e) => Value::String(format!("#ERROR: {:?}", e)),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(datetime) => Value::String(format_datetime(&datetime)),
                None => Value::String(dt.to_string()),
            },
            Data::DateTimeIso(s) => Value::String(s.clone()),
            Data::DurationIso(s) => Value::String(s.clone()),
        }
    }

    /// Extract the grid from row 0 / column 0 to the end of the used range
    fn extract_grid(sheet_range: &Range<Data>) -> Vec<Vec<Value>> {
        let Some((end_row, end_col)) = sheet_range.end() else {
            return Vec::new();
        };

        (0..=end_row)
            .map(|row_idx| {
                (0..=end_col)
                    .map(|col_idx| {
                        sheet_range
                            .get_value((row_idx, col_idx))
                            .map(Self::cell_to_value)
                            .unwrap_or(Value::Empty)
                    })
                    .collect()
            })
            .collect()
    }
}

impl DataSource for ExcelSource {
    fn read_grid(&self, sheet: &str) -> Result<Vec<Vec<Value>>> {
        if !self.sheet_names.iter().any(|name| name == sheet) {
            return Err(DataError::SheetNotFound(sheet.to_string()));
        }

        // Re-open workbook for reading (calamine requires this pattern)
        let mut workbook = open_workbook_auto(&self.path)
            .map_err(|e| DataError::WorkbookOpen(format!("{}: {}", self.path, e)))?;

        let sheet_range = workbook.worksheet_range(sheet)?;
        let grid = Self::extract_grid(&sheet_range);
        debug!(path = %self.path, sheet, rows = grid.len(), "sheet read");
        Ok(grid)
    }

    fn list_sheets(&self) -> Result<Vec<String>> {
        Ok(self.sheet_names.clone())
    }

    fn default_sheet(&self) -> Option<String> {
        self.sheet_names.first().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_to_value() {
        assert_eq!(ExcelSource::cell_to_value(&Data::Empty), Value::Empty);
        assert_eq!(
            ExcelSource::cell_to_value(&Data::String("hello".to_string())),
            Value::from("hello")
        );
        assert_eq!(ExcelSource::cell_to_value(&Data::Int(42)), Value::Int(42));
        assert_eq!(ExcelSource::cell_to_value(&Data::Float(10.0)), Value::Float(10.0));
        assert_eq!(ExcelSource::cell_to_value(&Data::Bool(true)), Value::Bool(true));
    }

    #[test]
    fn test_datetime_format() {
        let datetime = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(format_datetime(&datetime), "2024-01-02 12:00:00");
    }

    #[test]
    fn test_error_cells_become_strings() {
        let value = ExcelSource::cell_to_value(&Data::Error(calamine::CellErrorType::Div0));
        assert_eq!(value, Value::from("#ERROR: Div0"));
    }

    #[test]
    fn test_extract_grid_is_absolute() {
        let mut range: Range<Data> = Range::new((1, 1), (2, 2));
        range.set_value((1, 1), Data::String("Name".to_string()));
        range.set_value((2, 2), Data::Float(3.0));

        let grid = ExcelSource::extract_grid(&range);
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[0], vec![Value::Empty, Value::Empty, Value::Empty]);
        assert_eq!(grid[1][1], Value::from("Name"));
        assert_eq!(grid[2][2], Value::Float(3.0));
    }

    #[test]
    fn test_excel_source_file_not_found() {
        let result = ExcelSource::new("/nonexistent/path/file.xlsx");
        assert!(matches!(result, Err(DataError::FileNotFound(_))));
    }
}
