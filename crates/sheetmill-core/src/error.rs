//! Error types for report generation

use sheetmill_data::DataError;
use sheetmill_ooxml::OoxmlError;
use thiserror::Error;

/// Errors that abort a report run
#[derive(Error, Debug)]
pub enum ReportError {
    /// The dataset could not be read
    #[error("Failed to load data: {0}")]
    Load(#[source] DataError),

    /// The template workbook could not be opened or parsed
    #[error("Failed to open template: {0}")]
    Template(#[source] OoxmlError),

    /// The output workbook could not be assembled or written
    #[error("Failed to save report: {0}")]
    Save(#[source] OoxmlError),

    /// The job description is invalid
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<DataError> for ReportError {
    fn from(err: DataError) -> Self {
        ReportError::Load(err)
    }
}

/// Result type for report operations
pub type Result<T> = std::result::Result<T, ReportError>;
