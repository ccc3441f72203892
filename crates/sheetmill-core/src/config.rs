//! Job configuration
//!
//! A job file is TOML deserialized into [`Settings`]. Settings are loose:
//! every field has a default and cell positions are plain strings.
//! [`Settings::into_config`] validates them into the immutable
//! [`ReportConfig`] that the engine consumes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sheetmill_data::{LoadOptions, SplitKind, SplitRule};
use sheetmill_ooxml::CellRef;

use crate::error::{ReportError, Result};
use crate::naming::SheetNaming;

/// Default width of a lookup image in pixels
pub const DEFAULT_IMAGE_WIDTH_PX: u32 = 200;
/// Default height of a lookup image in pixels
pub const DEFAULT_IMAGE_HEIGHT_PX: u32 = 60;

/// Job settings as written in a TOML file
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Rows above the header row
    pub skip_rows: usize,
    /// Sheet of the dataset to read
    pub data_sheet: Option<String>,
    /// Column whose value names each generated sheet
    pub sheet_name_column: Option<String>,
    pub fields: Vec<FieldSettings>,
    pub split: Option<SplitSettings>,
    pub image: Option<ImageSettings>,
}

/// One `[[fields]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct FieldSettings {
    pub column: String,
    pub cells: Vec<String>,
}

/// The `[split]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SplitSettings {
    pub column: String,
    pub method: String,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            column: String::new(),
            method: SplitKind::RemoveNumbers.to_string(),
        }
    }
}

/// The `[image]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageSettings {
    /// Directory (or archive, staged by the caller) holding the images
    pub directory: PathBuf,
    pub key_column: String,
    pub cells: Vec<String>,
    pub width: u32,
    pub height: u32,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::new(),
            key_column: String::new(),
            cells: Vec::new(),
            width: DEFAULT_IMAGE_WIDTH_PX,
            height: DEFAULT_IMAGE_HEIGHT_PX,
        }
    }
}

impl Settings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Read settings from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ReportError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
            .map_err(|e| ReportError::Config(format!("{}: {e}", path.display())))
    }

    /// Validate into a [`ReportConfig`]
    pub fn into_config(self) -> Result<ReportConfig> {
        let mut fields = FieldMapping::default();
        for field in self.fields {
            if field.column.is_empty() {
                return Err(ReportError::Config("field mapping without a column".into()));
            }
            let cells = parse_cells(&field.cells)?;
            fields.push(field.column, cells);
        }

        let split = self
            .split
            .filter(|split| !split.column.is_empty())
            .map(|split| {
                // FromStr for SplitKind never fails
                let kind = split.method.parse().unwrap_or(SplitKind::RemoveNumbers);
                SplitRule::new(split.column, kind)
            });

        let image = self.image.map(ImageSpec::try_from).transpose()?;

        if fields.is_empty() && image.is_none() {
            return Err(ReportError::Config(
                "nothing to write: no field mapping and no image".into(),
            ));
        }

        Ok(ReportConfig {
            load: LoadOptions {
                skip_rows: self.skip_rows,
                sheet: self.data_sheet,
            },
            fields,
            split,
            naming: SheetNaming::new(self.sheet_name_column.filter(|c| !c.is_empty())),
            image,
        })
    }
}

fn parse_cells(cells: &[String]) -> Result<Vec<CellRef>> {
    cells
        .iter()
        .map(|cell| {
            CellRef::parse(cell)
                .map_err(|_| ReportError::Config(format!("invalid cell position '{cell}'")))
        })
        .collect()
}

/// One mapped column and the cells it is written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTarget {
    pub column: String,
    pub cells: Vec<CellRef>,
}

/// Ordered column-to-cells mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    targets: Vec<FieldTarget>,
}

impl FieldMapping {
    pub fn push(&mut self, column: impl Into<String>, cells: Vec<CellRef>) {
        self.targets.push(FieldTarget {
            column: column.into(),
            cells,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldTarget> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Mapped column names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.column.as_str())
    }
}

/// Where and how large to place a row's lookup image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    pub directory: PathBuf,
    pub key_column: String,
    pub cells: Vec<CellRef>,
    pub width_px: u32,
    pub height_px: u32,
}

impl TryFrom<ImageSettings> for ImageSpec {
    type Error = ReportError;

    fn try_from(settings: ImageSettings) -> Result<Self> {
        if settings.key_column.is_empty() {
            return Err(ReportError::Config("image key column is empty".into()));
        }
        if settings.cells.is_empty() {
            return Err(ReportError::Config("image has no target cells".into()));
        }
        if settings.width == 0 || settings.height == 0 {
            return Err(ReportError::Config(format!(
                "image size {}x{} must be positive",
                settings.width, settings.height
            )));
        }
        Ok(Self {
            cells: parse_cells(&settings.cells)?,
            directory: settings.directory,
            key_column: settings.key_column,
            width_px: settings.width,
            height_px: settings.height,
        })
    }
}

/// Validated, immutable job configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    pub load: LoadOptions,
    pub fields: FieldMapping,
    pub split: Option<SplitRule>,
    pub naming: SheetNaming,
    pub image: Option<ImageSpec>,
}

/// Everything needed for one report run
#[derive(Debug, Clone, PartialEq)]
pub struct ReportJob {
    pub data: PathBuf,
    pub template: PathBuf,
    pub output: PathBuf,
    pub config: ReportConfig,
}
