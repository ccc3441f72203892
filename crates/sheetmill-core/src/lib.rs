//! # sheetmill-core
//!
//! Generate a multi-sheet workbook from a dataset and a template sheet.
//!
//! Every dataset row is rendered onto a copy of the template's active
//! sheet: mapped columns are written into fixed cells, an optional column
//! names the sheet, and an optional per-row lookup image is placed into
//! target cells next to the pictures already on the template.
//!
//! ## Example
//!
//! ```no_run
//! use sheetmill_core::{generate_report, ReportJob, Settings};
//!
//! let settings = Settings::from_toml_str(r#"
//! sheet_name_column = "Name"
//!
//! [[fields]]
//! column = "Name"
//! cells = ["B2"]
//! "#)?;
//!
//! let job = ReportJob {
//!     data: "before.xlsx".into(),
//!     template: "template.xlsx".into(),
//!     output: "processed_excel.xlsx".into(),
//!     config: settings.into_config()?,
//! };
//! let summary = generate_report(&job)?;
//! println!("{} sheets", summary.sheets.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod assembler;
pub mod config;
pub mod engine;
pub mod error;
pub mod images;
pub mod naming;
pub mod registry;

pub use assembler::{generate_report, render_report};
pub use config::{
    FieldMapping, FieldTarget, ImageSettings, ImageSpec, ReportConfig, ReportJob, Settings,
};
pub use engine::{ReportSummary, RowOutcome, TemplateEngine};
pub use error::{ReportError, Result};
pub use images::{resolve_image, ImageFormat, ImageResolver, ResolvedImage};
pub use naming::{SheetNaming, FALLBACK_TITLE};
pub use registry::{SheetRegistry, SheetSlot};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
