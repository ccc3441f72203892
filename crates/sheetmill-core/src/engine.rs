//! The row-to-sheet template engine
//!
//! The engine owns the opened template package. On construction it takes
//! the active sheet as the prototype for every generated sheet and reads
//! the pictures on it once. Each [`TemplateEngine::process_row`] call
//! routes a row to its sheet (creating it from the prototype on first
//! sight), writes the mapped values, places the row's lookup image and
//! replays the template pictures. [`TemplateEngine::finish`] hands the
//! sheets to the package for assembly.

use std::path::Path;

use serde::Serialize;
use sheetmill_data::{Row, Value};
use sheetmill_ooxml::{
    CellRef, CellValue, Drawing, ImagePlacement, MediaData, OutputSheet, Picture, WorkbookPackage,
    Worksheet,
};
use tracing::{debug, info, warn};

use crate::config::{FieldMapping, ImageSpec, ReportConfig};
use crate::error::{ReportError, Result};
use crate::images::{ImageResolver, ResolvedImage};
use crate::registry::{SheetRegistry, SheetSlot};

/// Totals for one report run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// Rows processed
    pub rows: usize,
    /// Generated sheet titles in workbook order
    pub sheets: Vec<String>,
    /// Rows written onto a sheet an earlier row created
    pub reused_rows: usize,
    /// Lookup images placed, counting every target cell
    pub images_placed: usize,
    /// Rows whose lookup image was not found
    pub images_missing: usize,
}

/// What happened to one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowOutcome {
    pub slot: SheetSlot,
    pub images_placed: usize,
    pub image_missing: bool,
}

#[derive(Debug, Clone)]
struct GeneratedSheet {
    worksheet: Worksheet,
    drawing: Drawing,
}

pub struct TemplateEngine {
    package: WorkbookPackage,
    template_sheet: String,
    prototype: Worksheet,
    pictures: Vec<Picture>,
    config: ReportConfig,
    resolver: Option<ImageResolver>,
    registry: SheetRegistry,
    sheets: Vec<GeneratedSheet>,
    summary: ReportSummary,
}

impl TemplateEngine {
    /// Open the template workbook at `template`
    pub fn open(template: impl AsRef<Path>, config: ReportConfig) -> Result<Self> {
        let package = WorkbookPackage::open(template).map_err(ReportError::Template)?;
        Self::from_package(package, config)
    }

    /// Use an already opened template package
    pub fn from_package(package: WorkbookPackage, config: ReportConfig) -> Result<Self> {
        let entry = package.active_sheet().clone();
        let mut prototype = package.worksheet(&entry).map_err(ReportError::Template)?;
        prototype.detach_relationships();
        let pictures = package.pictures(&entry).map_err(ReportError::Template)?;
        info!(
            sheet = %entry.name,
            pictures = pictures.len(),
            "template sheet loaded"
        );

        let resolver = config
            .image
            .as_ref()
            .map(|spec| ImageResolver::new(spec.directory.clone()));

        Ok(Self {
            package,
            template_sheet: entry.name,
            prototype,
            pictures,
            config,
            resolver,
            registry: SheetRegistry::new(),
            sheets: Vec::new(),
            summary: ReportSummary::default(),
        })
    }

    /// Name of the template sheet every generated sheet is cloned from
    pub fn template_sheet(&self) -> &str {
        &self.template_sheet
    }

    /// Pictures replayed onto every generated sheet
    pub fn template_pictures(&self) -> &[Picture] {
        &self.pictures
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Number of sheets generated so far
    pub fn sheet_count(&self) -> usize {
        self.registry.len()
    }

    /// Render one row onto its sheet
    pub fn process_row(&mut self, row: &Row<'_>) -> RowOutcome {
        let title = self.config.naming.title_for(row);
        let slot = self.registry.lookup(&title);
        match slot {
            SheetSlot::Created(index) => {
                debug!(title = %title, index, "sheet created");
                self.sheets.push(GeneratedSheet {
                    worksheet: self.prototype.clone(),
                    drawing: Drawing::new(),
                });
            }
            SheetSlot::Reused(index) => {
                debug!(title = %title, index, "row merged into existing sheet");
                self.summary.reused_rows += 1;
            }
        }
        let sheet = &mut self.sheets[slot.index()];

        write_fields(&mut sheet.worksheet, &self.config.fields, row);

        let mut outcome = RowOutcome {
            slot,
            images_placed: 0,
            image_missing: false,
        };
        if let (Some(spec), Some(resolver)) = (&self.config.image, self.resolver.as_mut()) {
            if let Some(value) = row.get(&spec.key_column) {
                let key = value.to_string();
                match resolver.resolve(&key) {
                    Some(image) => {
                        for &cell in &spec.cells {
                            place_image(sheet, cell, spec, &image);
                        }
                        outcome.images_placed = spec.cells.len();
                    }
                    None => {
                        warn!(key = %key, sheet = %title, "no image for key");
                        outcome.image_missing = true;
                    }
                }
            }
        }

        for picture in &self.pictures {
            sheet.drawing.add_picture(picture);
        }

        self.summary.rows += 1;
        self.summary.images_placed += outcome.images_placed;
        self.summary.images_missing += usize::from(outcome.image_missing);
        outcome
    }

    /// Assemble the output workbook
    pub fn finish(self) -> Result<(Vec<u8>, ReportSummary)> {
        let mut summary = self.summary;
        summary.sheets = self.registry.titles().to_vec();

        let sheets: Vec<OutputSheet> = summary
            .sheets
            .iter()
            .cloned()
            .zip(self.sheets)
            .map(|(title, sheet)| OutputSheet {
                title,
                worksheet: sheet.worksheet,
                drawing: sheet.drawing,
            })
            .collect();

        let bytes = self.package.assemble(sheets).map_err(ReportError::Save)?;
        Ok((bytes, summary))
    }
}

/// Cell value written for a row value
pub fn cell_value(value: &Value) -> CellValue {
    match value {
        Value::Empty => CellValue::Text(String::new()),
        Value::String(s) => CellValue::Text(s.clone()),
        Value::Int(i) => CellValue::Integer(*i),
        Value::Float(f) => CellValue::Number(*f),
        Value::Bool(b) => CellValue::Boolean(*b),
    }
}

fn write_fields(worksheet: &mut Worksheet, fields: &FieldMapping, row: &Row<'_>) {
    for target in fields.iter() {
        let value = row
            .get(&target.column)
            .map(cell_value)
            .unwrap_or_else(|| CellValue::Text(String::new()));
        for &cell in &target.cells {
            worksheet.set_cell(cell, &value);
        }
    }
}

/// Where an image of `width` x `height` centered in a cell of the given size goes
pub fn centered_placement(
    cell: CellRef,
    cell_width_px: u32,
    cell_height_px: u32,
    width_px: u32,
    height_px: u32,
) -> ImagePlacement {
    ImagePlacement {
        cell,
        offset_x_px: cell_width_px.saturating_sub(width_px) / 2,
        offset_y_px: cell_height_px.saturating_sub(height_px) / 2,
        width_px,
        height_px,
    }
}

fn place_image(sheet: &mut GeneratedSheet, cell: CellRef, spec: &ImageSpec, image: &ResolvedImage) {
    let placement = centered_placement(
        cell,
        sheet.worksheet.column_width_px(cell.col),
        sheet.worksheet.row_height_px(cell.row),
        spec.width_px,
        spec.height_px,
    );
    sheet.drawing.add_image(
        &placement,
        MediaData::new(image.bytes.clone(), image.format.extension()),
    );

    // Grow only; a cell already larger than the image keeps its size
    if sheet.worksheet.ensure_column_width_px(cell.col, spec.width_px) {
        debug!(column = %cell.column_name(), px = spec.width_px, "column widened");
    }
    if sheet.worksheet.ensure_row_height_px(cell.row, spec.height_px) {
        debug!(row = cell.row_number(), px = spec.height_px, "row heightened");
    }
}
