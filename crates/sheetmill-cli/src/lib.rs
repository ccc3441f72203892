//! sheetmill CLI - Command-line interface library
//!
//! This library provides the CLI functionality for sheetmill:
//! - Generate: render one template sheet per dataset row
//! - Columns: list the header names of a dataset
//!
//! # Library Usage
//!
//! ```ignore
//! use clap::Parser;
//! use sheetmill_cli::{run, Cli};
//!
//! let cli = Cli::parse_from(["sheetmill", "columns", "--data", "before.xlsx"]);
//! run(cli)?;
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! # One sheet per row, named by the Name column
//! sheetmill generate --data before.xlsx --template template.xlsx \
//!     --map "Name=B2" --sheet-name-column Name
//!
//! # Everything from a job file, barcodes from an archive
//! sheetmill generate -d before.xlsx -t template.xlsx -c job.toml --images barcodes.zip
//!
//! # Inspect the header row
//! sheetmill columns --data before.xlsx --skip-rows 2
//! ```

pub mod app;
pub mod staging;

pub use app::{
    columns_command, generate_command, init_logging, run, run_cli, Cli, Commands, GenerateArgs,
    OutputFormat,
};
pub use staging::{stage_images, StagedImages};
