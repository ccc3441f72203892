//! Worksheet drawings: pictures anchored to cells
//!
//! Pictures are read from an existing drawing part as whole anchor elements,
//! so their position and properties survive untouched when replayed into a
//! new drawing. Generated pictures use a one-cell anchor with an absolute
//! size, placed at a pixel offset inside their cell.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::archive::OoxmlArchive;
use crate::cell::CellRef;
use crate::error::Result;
use crate::relationships::{
    relative_target, resolve_target, Relationships, OFFICE_RELATIONSHIPS_NS,
};
use crate::units::pixels_to_emu;
use crate::xml::{Element, XmlDocument};

/// SpreadsheetML drawing namespace (`xdr:`)
pub const SPREADSHEET_DRAWING_NS: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";

/// DrawingML main namespace (`a:`)
pub const DRAWINGML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

const ANCHORS: &[&str] = &["twoCellAnchor", "oneCellAnchor", "absoluteAnchor"];

/// Descendants that carry relationship ids this module does not carry over
const UNSUPPORTED_LINKS: &[&str] = &["hlinkClick", "hlinkHover"];

/// Image bytes with the file extension they are stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaData {
    pub bytes: Arc<[u8]>,
    /// Lowercase extension without the dot
    pub extension: String,
}

impl MediaData {
    pub fn new(bytes: impl Into<Arc<[u8]>>, extension: &str) -> Self {
        Self {
            bytes: bytes.into(),
            extension: extension.to_ascii_lowercase(),
        }
    }
}

/// A picture lifted from an existing drawing part
#[derive(Debug, Clone)]
pub struct Picture {
    anchor: Element,
    /// Namespace declarations of the source drawing's root
    namespaces: Vec<(String, String)>,
    pub media: MediaData,
}

impl Picture {
    /// Cell the picture's top-left corner is anchored to
    pub fn anchor_cell(&self) -> Option<CellRef> {
        let from = self.anchor.child("from")?;
        let col = from.child("col")?.text().trim().parse().ok()?;
        let row = from.child("row")?.text().trim().parse().ok()?;
        Some(CellRef::new(col, row))
    }

    /// Anchor kind, e.g. `twoCellAnchor`
    pub fn anchor_kind(&self) -> &str {
        self.anchor.local_name()
    }

    /// Shape name from `cNvPr`
    pub fn name(&self) -> Option<&str> {
        self.anchor.descendant("cNvPr")?.attr("name")
    }
}

/// Read every embedded picture of a drawing part.
///
/// Linked pictures and anchors holding shapes or charts are skipped.
pub fn read_pictures(archive: &OoxmlArchive, drawing_part: &str) -> Result<Vec<Picture>> {
    let doc = XmlDocument::parse(archive.require(drawing_part)?)?;
    let rels = archive.relationships_of(drawing_part)?;
    let namespaces: Vec<(String, String)> = doc
        .root
        .attributes
        .iter()
        .filter(|(key, _)| key.starts_with("xmlns"))
        .cloned()
        .collect();

    let mut pictures = Vec::new();
    for anchor in anchor_elements(&doc.root) {
        let Some(blip) = anchor.child("pic").and_then(|pic| pic.descendant("blip")) else {
            continue;
        };
        let Some(embed) = blip.attr_local("embed") else {
            debug!(part = drawing_part, "skipping linked picture");
            continue;
        };
        let Some(rel) = rels.get_target(embed).filter(|rel| !rel.is_external()) else {
            warn!(part = drawing_part, id = embed, "picture relationship not found");
            continue;
        };
        let media_part = resolve_target(drawing_part, &rel.target);
        let Some(bytes) = archive.get(&media_part) else {
            warn!(part = %media_part, "picture media missing from package");
            continue;
        };
        let extension = media_part
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or("png");

        let mut anchor = anchor.clone();
        strip_descendants(&mut anchor, UNSUPPORTED_LINKS);
        if let Some(blip) = anchor.descendant_mut("blip") {
            blip.retain_elements(|el| el.local_name() != "extLst");
        }

        pictures.push(Picture {
            anchor,
            namespaces: namespaces.clone(),
            media: MediaData::new(bytes, extension),
        });
    }
    debug!(part = drawing_part, count = pictures.len(), "pictures read");
    Ok(pictures)
}

/// Anchors of a `wsDr` root, looking through `mc:AlternateContent`
/// wrappers (first `Choice` holding anchors, else `Fallback`)
fn anchor_elements(root: &Element) -> Vec<&Element> {
    let mut out = Vec::new();
    for el in root.elements() {
        if ANCHORS.contains(&el.local_name()) {
            out.push(el);
        } else if el.local_name() == "AlternateContent" {
            let branch = el
                .elements()
                .filter(|branch| branch.local_name() == "Choice")
                .find(|branch| branch.elements().any(|a| ANCHORS.contains(&a.local_name())))
                .or_else(|| el.child("Fallback"));
            if let Some(branch) = branch {
                out.extend(
                    branch
                        .elements()
                        .filter(|a| ANCHORS.contains(&a.local_name())),
                );
            }
        }
    }
    out
}

fn strip_descendants(el: &mut Element, names: &[&str]) {
    el.retain_elements(|child| !names.contains(&child.local_name()));
    for child in el.elements_mut() {
        strip_descendants(child, names);
    }
}

/// Where a generated picture goes, in pixels relative to its cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePlacement {
    pub cell: CellRef,
    pub offset_x_px: u32,
    pub offset_y_px: u32,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone)]
struct Entry {
    anchor: Element,
    media: MediaData,
}

/// A drawing part under construction
#[derive(Debug, Clone, Default)]
pub struct Drawing {
    entries: Vec<Entry>,
    namespaces: Vec<(String, String)>,
}

impl Drawing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Replay a picture read from another drawing
    pub fn add_picture(&mut self, picture: &Picture) {
        for (key, value) in &picture.namespaces {
            if !self.namespaces.iter().any(|(existing, _)| existing == key) {
                self.namespaces.push((key.clone(), value.clone()));
            }
        }
        self.entries.push(Entry {
            anchor: picture.anchor.clone(),
            media: picture.media.clone(),
        });
    }

    /// Add a generated picture at `placement`
    pub fn add_image(&mut self, placement: &ImagePlacement, media: MediaData) {
        let number = self.entries.len() + 1;
        self.entries.push(Entry {
            anchor: one_cell_anchor(placement, number),
            media,
        });
    }

    /// Media of each picture, in drawing order
    pub fn media(&self) -> impl Iterator<Item = &MediaData> {
        self.entries.iter().map(|entry| &entry.media)
    }

    /// Serialize the drawing stored at `drawing_part`.
    ///
    /// `media_parts[i]` is the package path holding the media of picture
    /// `i`. Returns the part XML and its relationships; pictures sharing a
    /// media part share one relationship.
    pub fn render(&self, drawing_part: &str, media_parts: &[String]) -> (String, Relationships) {
        let mut root = Element::new("xdr:wsDr")
            .with_attr("xmlns:xdr", SPREADSHEET_DRAWING_NS)
            .with_attr("xmlns:a", DRAWINGML_NS);
        for (key, value) in &self.namespaces {
            if root.attr(key).is_none() {
                root.set_attr(key, value.clone());
            }
        }

        let mut rels = Relationships::new();
        let mut ids: HashMap<&str, String> = HashMap::new();

        for (index, (entry, media_part)) in self.entries.iter().zip(media_parts).enumerate() {
            let rel_id = ids
                .entry(media_part.as_str())
                .or_insert_with(|| {
                    rels.add(
                        relative_target(drawing_part, media_part),
                        Relationships::TYPE_IMAGE.to_string(),
                    )
                })
                .clone();

            let mut anchor = entry.anchor.clone();
            if let Some(blip) = anchor.descendant_mut("blip") {
                let key = blip
                    .attributes
                    .iter()
                    .find(|(key, _)| key.ends_with(":embed"))
                    .map(|(key, _)| key.clone());
                match key {
                    Some(key) => blip.set_attr(&key, rel_id),
                    None => {
                        blip.set_attr("xmlns:r", OFFICE_RELATIONSHIPS_NS);
                        blip.set_attr("r:embed", rel_id);
                    }
                }
            }
            if let Some(props) = anchor.descendant_mut("cNvPr") {
                props.set_attr("id", (index + 2).to_string());
            }
            root.push(anchor);
        }

        (XmlDocument { root }.to_xml(), rels)
    }
}

fn xdr(local: &str) -> Element {
    Element::new(format!("xdr:{local}"))
}

fn a(local: &str) -> Element {
    Element::new(format!("a:{local}"))
}

fn one_cell_anchor(placement: &ImagePlacement, number: usize) -> Element {
    let cx = pixels_to_emu(placement.width_px).to_string();
    let cy = pixels_to_emu(placement.height_px).to_string();

    let from = xdr("from")
        .with_child(xdr("col").with_text(placement.cell.col.to_string()))
        .with_child(xdr("colOff").with_text(pixels_to_emu(placement.offset_x_px).to_string()))
        .with_child(xdr("row").with_text(placement.cell.row.to_string()))
        .with_child(xdr("rowOff").with_text(pixels_to_emu(placement.offset_y_px).to_string()));

    let pic = xdr("pic")
        .with_child(
            xdr("nvPicPr")
                .with_child(
                    xdr("cNvPr")
                        .with_attr("id", (number + 1).to_string())
                        .with_attr("name", format!("Picture {number}")),
                )
                .with_child(
                    xdr("cNvPicPr").with_child(a("picLocks").with_attr("noChangeAspect", "1")),
                ),
        )
        .with_child(
            xdr("blipFill")
                .with_child(
                    a("blip")
                        .with_attr("xmlns:r", OFFICE_RELATIONSHIPS_NS)
                        .with_attr("r:embed", ""),
                )
                .with_child(a("stretch").with_child(a("fillRect"))),
        )
        .with_child(
            xdr("spPr")
                .with_child(
                    a("xfrm")
                        .with_child(a("off").with_attr("x", "0").with_attr("y", "0"))
                        .with_child(a("ext").with_attr("cx", cx.as_str()).with_attr("cy", cy.as_str())),
                )
                .with_child(a("prstGeom").with_attr("prst", "rect").with_child(a("avLst"))),
        );

    xdr("oneCellAnchor")
        .with_child(from)
        .with_child(xdr("ext").with_attr("cx", cx.as_str()).with_attr("cy", cy.as_str()))
        .with_child(pic)
        .with_child(xdr("clientData"))
}
