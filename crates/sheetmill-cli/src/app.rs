//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sheetmill_core::config::{FieldSettings, SplitSettings};
use sheetmill_core::{generate_report, ImageSettings, ReportJob, ReportSummary, Settings};
use sheetmill_data::{load_columns, LoadOptions};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use crate::staging::stage_images;

/// Default output file name
pub const DEFAULT_OUTPUT: &str = "processed_excel.xlsx";

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for scripts
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "sheetmill")]
#[command(author, version, about = "One template sheet per data row", long_about = None)]
pub struct Cli {
    /// More logging (-v for debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a workbook with one sheet per dataset row
    Generate(GenerateArgs),

    /// List the column names of a dataset
    Columns {
        /// Dataset file (.xlsx, .xls, .ods, .csv, .tsv)
        #[arg(short, long)]
        data: PathBuf,

        /// Rows above the header row
        #[arg(long, default_value_t = 0)]
        skip_rows: usize,

        /// Sheet of the dataset to read
        #[arg(long)]
        data_sheet: Option<String>,

        /// Output format (text or json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Arguments of `sheetmill generate`
///
/// Flags override the values of the job file given with `--config`.
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Dataset file (.xlsx, .xls, .ods, .csv, .tsv)
    #[arg(short, long)]
    pub data: PathBuf,

    /// Template workbook; its active sheet is copied for every row
    #[arg(short, long)]
    pub template: PathBuf,

    /// Output workbook
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// TOML job file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Rows above the header row
    #[arg(long)]
    pub skip_rows: Option<usize>,

    /// Sheet of the dataset to read
    #[arg(long)]
    pub data_sheet: Option<String>,

    /// Column-to-cells mapping, e.g. "Name=B2,D4" (repeatable)
    #[arg(short, long = "map", value_name = "COLUMN=CELLS")]
    pub map: Vec<String>,

    /// Column whose value names each sheet
    #[arg(long)]
    pub sheet_name_column: Option<String>,

    /// Column rewritten before rendering
    #[arg(long)]
    pub split_column: Option<String>,

    /// Transform applied to the split column
    #[arg(long)]
    pub split_method: Option<String>,

    /// Image directory or .zip archive
    #[arg(long)]
    pub images: Option<PathBuf>,

    /// Column holding each row's image key
    #[arg(long)]
    pub image_key: Option<String>,

    /// Cells receiving the image, e.g. "C3,C10"
    #[arg(long, value_delimiter = ',')]
    pub image_cells: Vec<String>,

    /// Image width in pixels
    #[arg(long)]
    pub image_width: Option<u32>,

    /// Image height in pixels
    #[arg(long)]
    pub image_height: Option<u32>,

    /// Output format (text or json)
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl GenerateArgs {
    /// Job settings: the job file (if any) with flags applied on top
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => load_job_file(path)?,
            None => Settings::default(),
        };

        if let Some(skip_rows) = self.skip_rows {
            settings.skip_rows = skip_rows;
        }
        if let Some(sheet) = &self.data_sheet {
            settings.data_sheet = Some(sheet.clone());
        }
        if !self.map.is_empty() {
            settings.fields = self
                .map
                .iter()
                .map(|mapping| parse_mapping(mapping))
                .collect::<Result<_>>()?;
        }
        if let Some(column) = &self.sheet_name_column {
            settings.sheet_name_column = Some(column.clone());
        }

        if let Some(column) = &self.split_column {
            settings.split.get_or_insert_with(SplitSettings::default).column = column.clone();
        }
        if let Some(method) = &self.split_method {
            match settings.split.as_mut() {
                Some(split) => split.method = method.clone(),
                None => anyhow::bail!("--split-method needs a split column"),
            }
        }

        let image_flags = self.images.is_some()
            || self.image_key.is_some()
            || !self.image_cells.is_empty()
            || self.image_width.is_some()
            || self.image_height.is_some();
        if image_flags {
            let image = settings.image.get_or_insert_with(ImageSettings::default);
            if let Some(directory) = &self.images {
                image.directory = directory.clone();
            }
            if let Some(key) = &self.image_key {
                image.key_column = key.clone();
            }
            if !self.image_cells.is_empty() {
                image.cells = self.image_cells.clone();
            }
            if let Some(width) = self.image_width {
                image.width = width;
            }
            if let Some(height) = self.image_height {
                image.height = height;
            }
        }

        Ok(settings)
    }
}

/// Read a job file; a relative image directory is taken from the file's folder
fn load_job_file(path: &Path) -> Result<Settings> {
    let mut settings = Settings::load(path)?;
    if let Some(image) = settings.image.as_mut() {
        if image.directory.is_relative() {
            if let Some(base) = path.parent() {
                image.directory = base.join(&image.directory);
            }
        }
    }
    Ok(settings)
}

/// Parse `Column=B2,D4` into a field mapping
fn parse_mapping(mapping: &str) -> Result<FieldSettings> {
    let (column, cells) = mapping
        .rsplit_once('=')
        .with_context(|| format!("Invalid mapping '{mapping}': expected COLUMN=CELLS"))?;
    let cells: Vec<String> = cells
        .split(',')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect();
    if column.trim().is_empty() || cells.is_empty() {
        anyhow::bail!("Invalid mapping '{mapping}': expected COLUMN=CELLS");
    }
    Ok(FieldSettings {
        column: column.trim().to_string(),
        cells,
    })
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is info, or debug with
/// `-v` and trace with `-vv`.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    // A second call (as in tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the CLI application
///
/// This is the main entry point for the command-line interface.
/// It parses arguments and dispatches to the appropriate command.
pub fn run_cli() -> Result<()> {
    run(Cli::parse())
}

/// Dispatch parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose);

    match cli.command {
        Commands::Generate(args) => {
            let summary = generate_command(&args)?;
            print_summary(&args.output, &summary, args.format)?;
        }
        Commands::Columns {
            data,
            skip_rows,
            data_sheet,
            format,
        } => {
            let columns = columns_command(&data, skip_rows, data_sheet)?;
            match format {
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&columns)
                        .context("Failed to serialize columns to JSON")?;
                    println!("{}", json);
                }
                OutputFormat::Text => {
                    for column in columns {
                        println!("{}", column);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Execute the generate command
pub fn generate_command(args: &GenerateArgs) -> Result<ReportSummary> {
    if !args.data.exists() {
        anyhow::bail!("Data file not found: {}", args.data.display());
    }
    if !args.template.exists() {
        anyhow::bail!("Template file not found: {}", args.template.display());
    }

    let mut settings = args.settings()?;

    // Held until the report is written
    let staged = match settings.image.as_mut() {
        Some(image) => {
            let staged = stage_images(&image.directory)?;
            image.directory = staged.directory().to_path_buf();
            Some(staged)
        }
        None => None,
    };

    let job = ReportJob {
        data: args.data.clone(),
        template: args.template.clone(),
        output: args.output.clone(),
        config: settings.into_config()?,
    };
    info!(
        data = %job.data.display(),
        template = %job.template.display(),
        "generating report"
    );

    let summary = generate_report(&job)
        .with_context(|| format!("Failed to generate {}", job.output.display()))?;
    drop(staged);
    Ok(summary)
}

/// Execute the columns command
pub fn columns_command(
    data: &Path,
    skip_rows: usize,
    data_sheet: Option<String>,
) -> Result<Vec<String>> {
    if !data.exists() {
        anyhow::bail!("Data file not found: {}", data.display());
    }
    let options = LoadOptions {
        skip_rows,
        sheet: data_sheet,
    };
    load_columns(data, &options)
        .with_context(|| format!("Failed to read columns of {}", data.display()))
}

#[derive(Serialize)]
struct GenerateOutput<'a> {
    output: &'a Path,
    #[serde(flatten)]
    summary: &'a ReportSummary,
}

fn print_summary(output: &Path, summary: &ReportSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&GenerateOutput { output, summary })
                .context("Failed to serialize summary to JSON")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("✓ Wrote {}", output.display());
            println!("  Rows:   {}", summary.rows);
            println!(
                "  Sheets: {} ({})",
                summary.sheets.len(),
                summary.sheets.join(", ")
            );
            if summary.reused_rows > 0 {
                println!("  Rows merged into an existing sheet: {}", summary.reused_rows);
            }
            if summary.images_placed > 0 || summary.images_missing > 0 {
                println!(
                    "  Images: {} placed, {} missing",
                    summary.images_placed, summary.images_missing
                );
            }
        }
    }
    Ok(())
}
