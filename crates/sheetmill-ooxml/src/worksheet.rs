//! Worksheet part editing
//!
//! A [`Worksheet`] wraps the parsed XML tree of one `xl/worksheets/*.xml`
//! part. Cells, rows and columns are edited in place so that everything the
//! editor does not touch (styles, merges, print settings, conditional
//! formats) is written back unchanged.

use std::collections::BTreeMap;

use tracing::trace;

use crate::cell::CellRef;
use crate::error::{OoxmlError, Result};
use crate::relationships::{Relationships, OFFICE_RELATIONSHIPS_NS};
use crate::units::{
    column_width_to_pixels, pixels_to_column_width, pixels_to_points, points_to_pixels,
    DEFAULT_COLUMN_WIDTH_PX, DEFAULT_ROW_HEIGHT_PT,
};
use crate::xml::{Element, Node, XmlDocument};

/// Worksheet children that point into the sheet's own relationships and
/// cannot be carried over to a copy
const RELATIONSHIP_ELEMENTS: &[&str] = &[
    "drawing",
    "legacyDrawing",
    "legacyDrawingHF",
    "drawingHF",
    "picture",
    "oleObjects",
    "controls",
    "webPublishItems",
    "tableParts",
    "AlternateContent",
];

/// Worksheet children that come after `<drawing>` in schema order
const AFTER_DRAWING: &[&str] = &[
    "legacyDrawing",
    "legacyDrawingHF",
    "drawingHF",
    "picture",
    "oleObjects",
    "controls",
    "webPublishItems",
    "tableParts",
    "extLst",
];

/// A value written into a cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
}

/// An editable worksheet part
#[derive(Debug, Clone)]
pub struct Worksheet {
    doc: XmlDocument,
    /// External hyperlink targets by the relationship id the sheet uses
    external_links: BTreeMap<String, String>,
}

impl Worksheet {
    /// Parse a worksheet part.
    ///
    /// Rows and cells without an explicit `r` attribute get one, so later
    /// lookups can rely on every position being spelled out.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let doc = XmlDocument::parse(xml)?;
        if doc.root.local_name() != "worksheet" {
            return Err(OoxmlError::InvalidStructure(format!(
                "expected <worksheet>, found <{}>",
                doc.root.name
            )));
        }
        if doc.root.child("sheetData").is_none() {
            return Err(OoxmlError::InvalidStructure(
                "worksheet has no <sheetData>".to_string(),
            ));
        }

        let mut sheet = Self {
            doc,
            external_links: BTreeMap::new(),
        };
        sheet.number_rows_and_cells()?;
        Ok(sheet)
    }

    /// Qualified name for a new element in the worksheet namespace
    fn qualify(&self, local: &str) -> String {
        match self.doc.root.prefix() {
            Some(prefix) => format!("{prefix}:{local}"),
            None => local.to_string(),
        }
    }

    fn sheet_data(&self) -> Option<&Element> {
        self.doc.root.child("sheetData")
    }

    fn sheet_data_mut(&mut self) -> &mut Element {
        let name = self.qualify("sheetData");
        let root = &mut self.doc.root;
        root.ensure_child(
            "sheetData",
            |root| {
                root.position("extLst")
                    .unwrap_or(root.children.len())
            },
            || Element::new(name),
        )
    }

    fn number_rows_and_cells(&mut self) -> Result<()> {
        let sheet_data = self.sheet_data_mut();
        let mut next_row = 1u32;

        for row in sheet_data
            .elements_mut()
            .filter(|el| el.local_name() == "row")
        {
            let number = match row.attr("r") {
                Some(r) => r
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        OoxmlError::InvalidStructure(format!("invalid row number '{r}'"))
                    })?,
                None => {
                    row.set_attr("r", next_row.to_string());
                    next_row
                }
            };
            next_row = number + 1;

            let mut next_col = 0u32;
            for cell in row.elements_mut().filter(|el| el.local_name() == "c") {
                let col = match cell.attr("r") {
                    Some(r) => CellRef::parse(r)?.col,
                    None => {
                        cell.set_attr("r", CellRef::new(next_col, number - 1).to_string());
                        next_col
                    }
                };
                next_col = col + 1;
            }
        }
        Ok(())
    }

    /// Row element for a 1-based row number, if present
    pub fn row(&self, number: u32) -> Option<&Element> {
        self.sheet_data()?
            .elements()
            .find(|el| el.local_name() == "row" && row_number_of(el) == Some(number))
    }

    /// Cell element at `cell`, if present
    pub fn cell(&self, cell: CellRef) -> Option<&Element> {
        let reference = cell.to_string();
        self.row(cell.row_number())?
            .elements()
            .find(|el| el.local_name() == "c" && el.attr("r") == Some(reference.as_str()))
    }

    /// Raw value of a cell: inline string text or the `<v>` content
    pub fn cell_text(&self, cell: CellRef) -> Option<String> {
        let c = self.cell(cell)?;
        if let Some(inline) = c.child("is") {
            return Some(inline.text());
        }
        c.child("v").map(|v| v.text())
    }

    fn row_mut(&mut self, number: u32) -> &mut Element {
        let name = self.qualify("row");
        let sheet_data = self.sheet_data_mut();

        let mut insert_at = sheet_data.children.len();
        let mut found = None;
        for (index, node) in sheet_data.children.iter().enumerate() {
            let Node::Element(el) = node else { continue };
            if el.local_name() != "row" {
                continue;
            }
            match row_number_of(el) {
                Some(n) if n == number => {
                    found = Some(index);
                    break;
                }
                Some(n) if n > number => {
                    insert_at = index;
                    break;
                }
                _ => {}
            }
        }

        let index = match found {
            Some(index) => index,
            None => {
                sheet_data.insert(
                    insert_at,
                    Element::new(name).with_attr("r", number.to_string()),
                );
                insert_at
            }
        };
        sheet_data.child_at_mut(index)
    }

    fn cell_mut(&mut self, cell: CellRef) -> &mut Element {
        let name = self.qualify("c");
        let reference = cell.to_string();
        let row = self.row_mut(cell.row_number());

        let mut insert_at = row.children.len();
        let mut found = None;
        for (index, node) in row.children.iter().enumerate() {
            let Node::Element(el) = node else { continue };
            if el.local_name() != "c" {
                continue;
            }
            let col = el.attr("r").and_then(|r| CellRef::parse(r).ok()).map(|c| c.col);
            match col {
                Some(col) if col == cell.col => {
                    found = Some(index);
                    break;
                }
                Some(col) if col > cell.col => {
                    insert_at = index;
                    break;
                }
                _ => {}
            }
        }

        let index = match found {
            Some(index) => index,
            None => {
                row.insert(insert_at, Element::new(name).with_attr("r", reference));
                insert_at
            }
        };
        row.child_at_mut(index)
    }

    /// Write a value into `cell`, keeping its style.
    ///
    /// Text is stored as an inline string so the shared string table never
    /// needs to change.
    pub fn set_cell(&mut self, cell: CellRef, value: &CellValue) {
        let v_name = self.qualify("v");
        let is_name = self.qualify("is");
        let t_name = self.qualify("t");

        let c = self.cell_mut(cell);
        c.attributes.retain(|(key, _)| key == "r" || key == "s");
        c.children.clear();

        let text_cell = |c: &mut Element, text: &str| {
            c.set_attr("t", "inlineStr");
            c.push(
                Element::new(is_name.clone()).with_child(
                    Element::new(t_name.clone())
                        .with_attr("xml:space", "preserve")
                        .with_text(text),
                ),
            );
        };

        match value {
            CellValue::Text(text) => text_cell(c, text),
            CellValue::Integer(n) => c.push(Element::new(v_name).with_text(n.to_string())),
            CellValue::Number(n) if n.is_finite() => {
                c.push(Element::new(v_name).with_text(n.to_string()))
            }
            CellValue::Number(n) => text_cell(c, &n.to_string()),
            CellValue::Boolean(b) => {
                c.set_attr("t", "b");
                c.push(Element::new(v_name).with_text(if *b { "1" } else { "0" }));
            }
        }
        trace!(cell = %cell, "cell written");
    }

    fn column_element(&self, col: u32) -> Option<&Element> {
        let number = col + 1;
        self.doc
            .root
            .child("cols")?
            .elements()
            .filter(|el| el.local_name() == "col")
            .find(|el| column_span(el).is_some_and(|(min, max)| min <= number && number <= max))
    }

    /// Rendered width of a 0-based column in pixels
    pub fn column_width_px(&self, col: u32) -> u32 {
        let explicit = self
            .column_element(col)
            .and_then(|el| el.attr("width"))
            .and_then(|w| w.trim().parse::<f64>().ok());
        match explicit {
            Some(width) => column_width_to_pixels(width),
            None => self.default_column_width_px(),
        }
    }

    fn default_column_width_px(&self) -> u32 {
        self.doc
            .root
            .child("sheetFormatPr")
            .and_then(|fmt| fmt.attr("defaultColWidth"))
            .and_then(|w| w.trim().parse::<f64>().ok())
            .map(column_width_to_pixels)
            .unwrap_or(DEFAULT_COLUMN_WIDTH_PX)
    }

    /// Rendered height of a 0-based row in pixels
    pub fn row_height_px(&self, row: u32) -> u32 {
        let explicit = self
            .row(row + 1)
            .and_then(|el| el.attr("ht"))
            .and_then(|ht| ht.trim().parse::<f64>().ok());
        let points = explicit
            .or_else(|| {
                self.doc
                    .root
                    .child("sheetFormatPr")
                    .and_then(|fmt| fmt.attr("defaultRowHeight"))
                    .and_then(|ht| ht.trim().parse::<f64>().ok())
            })
            .unwrap_or(DEFAULT_ROW_HEIGHT_PT);
        points_to_pixels(points)
    }

    /// Widen a 0-based column to at least `pixels`.
    ///
    /// A `<col>` range covering the column is split so neighbouring columns
    /// keep their width. Returns whether anything changed.
    pub fn ensure_column_width_px(&mut self, col: u32, pixels: u32) -> bool {
        if self.column_width_px(col) >= pixels {
            return false;
        }

        let number = col + 1;
        let width = pixels_to_column_width(pixels).to_string();
        let col_name = self.qualify("col");
        let cols_name = self.qualify("cols");
        let cols = self.doc.root.ensure_child(
            "cols",
            |root| root.position("sheetData").unwrap_or(root.children.len()),
            || Element::new(cols_name),
        );

        let covering = cols.children.iter().position(|node| match node {
            Node::Element(el) if el.local_name() == "col" => {
                column_span(el).is_some_and(|(min, max)| min <= number && number <= max)
            }
            _ => false,
        });

        match covering {
            Some(index) => {
                let existing = cols.child_at_mut(index).clone();
                let (min, max) = column_span(&existing).unwrap_or((number, number));
                let mut pieces = Vec::new();
                if min < number {
                    pieces.push(existing.clone().with_attr("max", (number - 1).to_string()));
                }
                pieces.push(
                    existing
                        .clone()
                        .with_attr("min", number.to_string())
                        .with_attr("max", number.to_string())
                        .with_attr("width", width)
                        .with_attr("customWidth", "1"),
                );
                if number < max {
                    pieces.push(existing.with_attr("min", (number + 1).to_string()));
                }
                cols.children.remove(index);
                for (offset, piece) in pieces.into_iter().enumerate() {
                    cols.insert(index + offset, piece);
                }
            }
            None => {
                let insert_at = cols
                    .children
                    .iter()
                    .position(|node| match node {
                        Node::Element(el) if el.local_name() == "col" => {
                            column_span(el).is_some_and(|(min, _)| min > number)
                        }
                        _ => false,
                    })
                    .unwrap_or(cols.children.len());
                cols.insert(
                    insert_at,
                    Element::new(col_name)
                        .with_attr("min", number.to_string())
                        .with_attr("max", number.to_string())
                        .with_attr("width", width)
                        .with_attr("customWidth", "1"),
                );
            }
        }
        true
    }

    /// Raise a 0-based row to at least `pixels` tall.
    ///
    /// Returns whether anything changed.
    pub fn ensure_row_height_px(&mut self, row: u32, pixels: u32) -> bool {
        if self.row_height_px(row) >= pixels {
            return false;
        }
        let el = self.row_mut(row + 1);
        el.set_attr("ht", pixels_to_points(pixels).to_string());
        el.set_attr("customHeight", "1");
        true
    }

    /// Remember the external hyperlinks among `rels`, the relationships of
    /// the part this sheet was read from
    pub fn record_external_links(&mut self, rels: &Relationships) {
        self.external_links = rels
            .iter()
            .filter(|(_, rel)| rel.rel_type == Relationships::TYPE_HYPERLINK && rel.is_external())
            .map(|(id, rel)| (id.to_string(), rel.target.clone()))
            .collect();
    }

    /// Drop everything that refers to the sheet's own relationships.
    ///
    /// What remains can be written as a new part: drawings, comments, tables
    /// and embedded objects go. In-workbook hyperlinks stay, and so do
    /// hyperlinks to targets recorded by [`Self::record_external_links`].
    /// [`Self::bind_external_links`] gives those their new relationships.
    pub fn detach_relationships(&mut self) {
        let external = &self.external_links;
        let root = &mut self.doc.root;
        root.retain_elements(|el| !RELATIONSHIP_ELEMENTS.contains(&el.local_name()));

        if let Some(links) = root.child_mut("hyperlinks") {
            links.retain_elements(|link| {
                link.attr_local("id")
                    .map_or(true, |id| external.contains_key(id))
            });
        }
        if root.child("hyperlinks").is_some_and(|links| !links.has_elements()) {
            root.retain_elements(|el| el.local_name() != "hyperlinks");
        }
        if let Some(setup) = root.child_mut("pageSetup") {
            setup.remove_attr_local("id");
        }
        if let Some(views) = root.child_mut("sheetViews") {
            for view in views.elements_mut() {
                view.remove_attr("tabSelected");
            }
        }
    }

    /// Add the kept external hyperlinks to `rels`, the relationships of the
    /// part this sheet is written to, and point each link at its new id
    pub fn bind_external_links(&mut self, rels: &mut Relationships) -> usize {
        let external = std::mem::take(&mut self.external_links);
        let Some(links) = self.doc.root.child_mut("hyperlinks") else {
            return 0;
        };
        let mut bound = 0;
        for link in links.elements_mut() {
            let Some(target) = link.attr_local("id").and_then(|id| external.get(id)) else {
                continue;
            };
            let id = rels.add_with_mode(
                target.clone(),
                Relationships::TYPE_HYPERLINK.to_string(),
                Some("External".to_string()),
            );
            link.set_attr_local("id", id);
            bound += 1;
        }
        bound
    }

    /// Point the sheet at a drawing part through relationship `rel_id`
    pub fn set_drawing(&mut self, rel_id: &str) {
        let r_prefix = self.relationships_prefix();
        let name = self.qualify("drawing");
        let root = &mut self.doc.root;

        root.retain_elements(|el| el.local_name() != "drawing");
        let index = root
            .children
            .iter()
            .position(|node| {
                matches!(node, Node::Element(el) if AFTER_DRAWING.contains(&el.local_name()))
            })
            .unwrap_or(root.children.len());
        root.insert(
            index,
            Element::new(name).with_attr(&format!("{r_prefix}:id"), rel_id),
        );
    }

    /// Drawing relationship id, if the sheet has a drawing
    pub fn drawing_rel_id(&self) -> Option<&str> {
        self.doc.root.child("drawing")?.attr_local("id")
    }

    /// Prefix bound to the office relationships namespace, declaring one
    /// on the root element when missing
    fn relationships_prefix(&mut self) -> String {
        if let Some(prefix) = self.doc.root.namespace_prefix(OFFICE_RELATIONSHIPS_NS) {
            return prefix.to_string();
        }
        let mut prefix = "r".to_string();
        let mut n = 1;
        while self.doc.root.attr(&format!("xmlns:{prefix}")).is_some() {
            prefix = format!("r{n}");
            n += 1;
        }
        self.doc
            .root
            .set_attr(&format!("xmlns:{prefix}"), OFFICE_RELATIONSHIPS_NS);
        prefix
    }

    /// Bounds of all cells in `sheetData`
    pub fn used_range(&self) -> Option<(CellRef, CellRef)> {
        let mut bounds: Option<(CellRef, CellRef)> = None;
        let cells = self
            .sheet_data()?
            .elements()
            .filter(|el| el.local_name() == "row")
            .flat_map(|row| row.elements().filter(|el| el.local_name() == "c"))
            .filter_map(|c| c.attr("r").and_then(|r| CellRef::parse(r).ok()));

        for cell in cells {
            bounds = Some(match bounds {
                None => (cell, cell),
                Some((first, last)) => (
                    CellRef::new(first.col.min(cell.col), first.row.min(cell.row)),
                    CellRef::new(last.col.max(cell.col), last.row.max(cell.row)),
                ),
            });
        }
        bounds
    }

    /// Update `<dimension ref="..">` to the used range
    pub fn refresh_dimension(&mut self) {
        let Some((first, last)) = self.used_range() else {
            return;
        };
        let reference = if first == last {
            first.to_string()
        } else {
            format!("{first}:{last}")
        };
        if let Some(dimension) = self.doc.root.child_mut("dimension") {
            dimension.set_attr("ref", reference);
        }
    }

    pub fn to_xml(&self) -> String {
        self.doc.to_xml()
    }
}

fn row_number_of(row: &Element) -> Option<u32> {
    row.attr("r")?.trim().parse().ok()
}

fn column_span(col: &Element) -> Option<(u32, u32)> {
    let min = col.attr("min")?.trim().parse().ok()?;
    let max = col.attr("max")?.trim().parse().ok()?;
    Some((min, max))
}
