//! # sheetmill-ooxml
//!
//! SpreadsheetML package handling for sheetmill.
//!
//! This crate provides functionality to:
//! - Read an `.xlsx` template and its sheets, drawings and pictures
//! - Edit worksheet parts in place (cells, column widths, row heights)
//! - Assemble a new workbook whose sheets replace the template's
//!
//! A sheet copied with [`Worksheet::detach_relationships`] keeps its cell
//! content, styles, merges and hyperlinks, including external ones. Its
//! drawings, cell comments, tables and embedded objects are not copied.
//! Pictures are carried over separately through [`Drawing`].
//!
//! ## Example: Copying the Active Sheet
//!
//! ```no_run
//! use sheetmill_ooxml::{CellRef, CellValue, Drawing, OutputSheet, WorkbookPackage};
//!
//! let package = WorkbookPackage::open("template.xlsx")?;
//! let template = package.active_sheet().clone();
//!
//! let mut worksheet = package.worksheet(&template)?;
//! worksheet.detach_relationships();
//! worksheet.set_cell(CellRef::parse("B2")?, &CellValue::Text("Alice".into()));
//!
//! let bytes = package.assemble(vec![OutputSheet {
//!     title: "Alice".into(),
//!     worksheet,
//!     drawing: Drawing::new(),
//! }])?;
//! std::fs::write("out.xlsx", bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod archive;
pub mod cell;
pub mod content_types;
pub mod drawing;
pub mod error;
pub mod relationships;
pub mod units;
pub mod workbook;
pub mod worksheet;
pub mod xml;

pub use archive::OoxmlArchive;
pub use cell::CellRef;
pub use content_types::ContentTypes;
pub use drawing::{Drawing, ImagePlacement, MediaData, Picture};
pub use error::{OoxmlError, Result};
pub use relationships::Relationships;
pub use workbook::{OutputSheet, SheetEntry, WorkbookPackage};
pub use worksheet::{CellValue, Worksheet};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
