//! Data source implementations.
//!
//! This module contains adapters for the tabular formats sheetmill reads
//! (Excel-family workbooks through calamine, delimited text through csv).

pub mod csv;
pub mod excel;

use std::path::Path;

pub use self::csv::{CsvOptions, CsvSource};
pub use self::excel::ExcelSource;

use crate::error::{DataError, Result};
use crate::value::Value;

/// Trait for data sources that can provide tabular data
pub trait DataSource {
    /// Read every cell of a sheet as a grid of values
    ///
    /// Grid positions are absolute: row 0 is the first row of the sheet
    /// even when its used range starts lower.
    fn read_grid(&self, sheet: &str) -> Result<Vec<Vec<Value>>>;

    /// List available sheets/tables in the source
    fn list_sheets(&self) -> Result<Vec<String>>;

    /// Get the default sheet name
    fn default_sheet(&self) -> Option<String>;
}

/// Open a data source, choosing the adapter from the file extension
pub fn open_source(path: impl AsRef<Path>) -> Result<Box<dyn DataSource>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => Ok(Box::new(CsvSource::new(path)?)),
        "tsv" | "tab" => Ok(Box::new(CsvSource::with_options(path, CsvOptions::tsv())?)),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "xla" | "xlam" | "ods" => {
            Ok(Box::new(ExcelSource::new(path)?))
        }
        _ => Err(DataError::UnsupportedFormat(path.display().to_string())),
    }
}
