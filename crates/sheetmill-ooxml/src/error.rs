//! Error types for OOXML operations

use thiserror::Error;

/// Errors that can occur while reading or writing a spreadsheet package
#[derive(Error, Debug)]
pub enum OoxmlError {
    /// Error reading or writing the ZIP archive
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Error reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing XML content
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed attribute or escaped text inside otherwise readable XML
    #[error("XML content error: {0}")]
    XmlContent(String),

    /// Required part not found in the package
    #[error("Required file not found: {0}")]
    MissingFile(String),

    /// Invalid package or part structure
    #[error("Invalid document structure: {0}")]
    InvalidStructure(String),

    /// Cell reference that is not of the form `B2`
    #[error("Invalid cell reference: {0}")]
    InvalidCellRef(String),

    /// Sheet not found in the workbook
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),
}

/// Result type for OOXML operations
pub type Result<T> = std::result::Result<T, OoxmlError>;
