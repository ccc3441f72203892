//! CSV data source.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{DataError, Result};
use crate::sources::DataSource;
use crate::value::Value;

/// Options for CSV parsing
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter (default: comma)
    pub delimiter: u8,
    /// Quote character (default: double quote)
    pub quote: u8,
    /// Whether to trim whitespace from fields (default: off, fields pass verbatim)
    pub trim: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            trim: false,
        }
    }
}

impl CsvOptions {
    /// Create options for tab-separated values (TSV)
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Default::default()
        }
    }
}

/// CSV file data source
///
/// A CSV file is a single sheet named `data`. Fields are typed on read:
/// integers, floats and `true`/`false` become numbers and booleans, empty
/// fields become blanks.
pub struct CsvSource {
    /// Path to the CSV file
    path: String,
    /// Parsing options
    options: CsvOptions,
}

impl CsvSource {
    /// Name of the single sheet a CSV file exposes
    pub const SHEET: &'static str = "data";

    /// Create a new CSV source from a file path
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(path, CsvOptions::default())
    }

    /// Create a new CSV source with custom options
    pub fn with_options(path: impl AsRef<Path>, options: CsvOptions) -> Result<Self> {
        let path_str = path.as_ref().display().to_string();

        if !path.as_ref().exists() {
            return Err(DataError::FileNotFound(path_str));
        }

        Ok(Self {
            path: path_str,
            options,
        })
    }

    /// Read all records as raw strings
    pub fn read_all(&self) -> Result<Vec<Vec<String>>> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .has_headers(false) // The loader picks the header row itself
            .trim(if self.options.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            })
            .flexible(true)
            .from_reader(reader);

        let mut result = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            result.push(record.iter().map(|s| s.to_string()).collect());
        }

        Ok(result)
    }
}

impl DataSource for CsvSource {
    fn read_grid(&self, sheet: &str) -> Result<Vec<Vec<Value>>> {
        if sheet != Self::SHEET {
            return Err(DataError::SheetNotFound(sheet.to_string()));
        }
        Ok(self
            .read_all()?
            .iter()
            .map(|row| row.iter().map(|field| Value::infer(field)).collect())
            .collect())
    }

    fn list_sheets(&self) -> Result<Vec<String>> {
        // CSV files don't have sheets, return a single default sheet
        Ok(vec![Self::SHEET.to_string()])
    }

    fn default_sheet(&self) -> Option<String> {
        Some(Self::SHEET.to_string())
    }
}
