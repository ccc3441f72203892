//! # sheetmill-data
//!
//! Tabular data loading for sheetmill: read Excel and CSV sources into a
//! typed, row-oriented [`Table`] and rewrite columns with simple transforms.
//!
//! ## Features
//!
//! - **Excel Support**: `.xlsx`, `.xlsm`, `.xlsb`, `.xls` and `.ods` through `calamine`
//! - **CSV Support**: comma- and tab-separated files through `csv`, with type inference
//! - **Normalization**: whole-number columns with blanks load as integers
//!
//! ## Example
//!
//! ```rust,ignore
//! use sheetmill_data::{load_table, LoadOptions, SplitKind, SplitRule};
//!
//! let mut table = load_table("before.xlsx", &LoadOptions::default())?;
//! SplitRule::new("Product", SplitKind::RemoveNumbers).apply(&mut table);
//!
//! for row in table.iter() {
//!     println!("{:?}", row.get("Product"));
//! }
//! ```

pub mod error;
pub mod loader;
pub mod sources;
pub mod table;
pub mod transform;
pub mod value;

// Re-exports
pub use error::{DataError, Result};
pub use loader::{load_columns, load_table, table_from_grid, LoadOptions};
pub use sources::{open_source, CsvOptions, CsvSource, DataSource, ExcelSource};
pub use table::{Row, Table};
pub use transform::{SplitKind, SplitRule};
pub use value::Value;
