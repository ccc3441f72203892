//! Workbook-level package handling
//!
//! [`WorkbookPackage`] opens a template workbook, exposes its sheets for
//! reading, and assembles a new package in which the template's sheets are
//! replaced by generated ones. Everything else in the package (styles,
//! shared strings, theme, document properties) is kept as it was.

use std::collections::HashMap;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::archive::{OoxmlArchive, CONTENT_TYPES_PATH};
use crate::content_types::{content_type_for_extension, ContentTypes};
use crate::drawing::{read_pictures, Drawing, MediaData, Picture};
use crate::error::{OoxmlError, Result};
use crate::relationships::{
    rels_path_for, relative_target, resolve_target, Relationships, OFFICE_RELATIONSHIPS_NS,
};
use crate::worksheet::Worksheet;
use crate::xml::{Element, XmlDocument};

const TYPE_EXTENDED_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";

const DOC_PROPS_VTYPES_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes";

/// A sheet listed in `<sheets>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    pub sheet_id: String,
    pub rel_id: String,
    /// Package path of the worksheet part
    pub part: String,
}

/// A generated sheet handed to [`WorkbookPackage::assemble`]
#[derive(Debug, Clone)]
pub struct OutputSheet {
    pub title: String,
    pub worksheet: Worksheet,
    pub drawing: Drawing,
}

/// An opened workbook package
#[derive(Debug, Clone)]
pub struct WorkbookPackage {
    archive: OoxmlArchive,
    workbook_part: String,
    workbook: XmlDocument,
    relationships: Relationships,
    sheets: Vec<SheetEntry>,
}

impl WorkbookPackage {
    /// Open a workbook from disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_archive(OoxmlArchive::open(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_archive(OoxmlArchive::from_bytes(bytes)?)
    }

    pub fn from_archive(archive: OoxmlArchive) -> Result<Self> {
        let root_rels = archive.relationships_of("")?;
        let (_, main) = root_rels
            .find_by_type(Relationships::TYPE_OFFICE_DOCUMENT)
            .ok_or_else(|| OoxmlError::MissingFile("officeDocument relationship".to_string()))?;
        let workbook_part = resolve_target("", &main.target);

        let workbook = XmlDocument::parse(archive.require(&workbook_part)?)?;
        if workbook.root.local_name() != "workbook" {
            return Err(OoxmlError::InvalidStructure(format!(
                "expected <workbook> in {workbook_part}, found <{}>",
                workbook.root.name
            )));
        }
        let relationships = archive.relationships_of(&workbook_part)?;
        let sheets = read_sheet_entries(&workbook, &relationships, &workbook_part)?;
        if sheets.is_empty() {
            return Err(OoxmlError::InvalidStructure(
                "workbook has no sheets".to_string(),
            ));
        }

        debug!(part = %workbook_part, sheets = sheets.len(), "workbook opened");
        Ok(Self {
            archive,
            workbook_part,
            workbook,
            relationships,
            sheets,
        })
    }

    pub fn sheets(&self) -> &[SheetEntry] {
        &self.sheets
    }

    /// Index of the sheet Excel shows on open (`workbookView@activeTab`)
    pub fn active_sheet_index(&self) -> usize {
        self.workbook
            .root
            .child("bookViews")
            .and_then(|views| views.child("workbookView"))
            .and_then(|view| view.attr("activeTab"))
            .and_then(|tab| tab.trim().parse::<usize>().ok())
            .filter(|tab| *tab < self.sheets.len())
            .unwrap_or(0)
    }

    pub fn active_sheet(&self) -> &SheetEntry {
        &self.sheets[self.active_sheet_index()]
    }

    /// Sheet entry by name
    pub fn sheet(&self, name: &str) -> Result<&SheetEntry> {
        self.sheets
            .iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| OoxmlError::SheetNotFound(name.to_string()))
    }

    /// Parse the worksheet part of `entry`, recording its external hyperlinks
    pub fn worksheet(&self, entry: &SheetEntry) -> Result<Worksheet> {
        let mut worksheet = Worksheet::parse(self.archive.require(&entry.part)?)?;
        worksheet.record_external_links(&self.archive.relationships_of(&entry.part)?);
        Ok(worksheet)
    }

    /// Pictures on every drawing attached to `entry`
    pub fn pictures(&self, entry: &SheetEntry) -> Result<Vec<Picture>> {
        let rels = self.archive.relationships_of(&entry.part)?;
        let mut pictures = Vec::new();
        for (_, rel) in rels.iter() {
            if rel.rel_type != Relationships::TYPE_DRAWING || rel.is_external() {
                continue;
            }
            let drawing_part = resolve_target(&entry.part, &rel.target);
            pictures.extend(read_pictures(&self.archive, &drawing_part)?);
        }
        Ok(pictures)
    }

    /// Replace every template sheet with `sheets` and serialize the result.
    ///
    /// The first output sheet becomes the active tab. Workbook-scoped
    /// defined names and the calculation chain are dropped because they
    /// refer to the template's sheets.
    pub fn assemble(mut self, sheets: Vec<OutputSheet>) -> Result<Vec<u8>> {
        if sheets.is_empty() {
            return Err(OoxmlError::InvalidStructure(
                "a workbook needs at least one sheet".to_string(),
            ));
        }

        for entry in &self.sheets {
            self.relationships.remove(&entry.rel_id);
        }
        self.relationships
            .remove_by_type(Relationships::TYPE_CALC_CHAIN);
        self.archive.set_string(
            rels_path_for(&self.workbook_part),
            self.relationships.to_xml(),
        );
        let removed = self.archive.retain_reachable()?;
        debug!(parts = removed.len(), "template sheet parts dropped");

        let base = self
            .workbook_part
            .rsplit_once('/')
            .map(|(dir, _)| format!("{dir}/"))
            .unwrap_or_default();
        let mut content_types = self.archive.content_types()?;
        content_types.ensure_default("rels", ContentTypes::RELATIONSHIPS);
        content_types.ensure_default("xml", "application/xml");
        let mut media = MediaStore::new(format!("{base}media/image"));

        let mut entries = Vec::with_capacity(sheets.len());
        for (index, sheet) in sheets.into_iter().enumerate() {
            let OutputSheet {
                title,
                mut worksheet,
                drawing,
            } = sheet;
            let part = self
                .archive
                .next_free_part(&format!("{base}worksheets/sheet"), ".xml");

            let mut sheet_rels = Relationships::new();
            if !drawing.is_empty() {
                let drawing_part = self
                    .archive
                    .next_free_part(&format!("{base}drawings/drawing"), ".xml");
                let mut media_parts = Vec::with_capacity(drawing.len());
                for item in drawing.media() {
                    media_parts.push(media.store(&mut self.archive, &mut content_types, item));
                }

                let (xml, drawing_rels) = drawing.render(&drawing_part, &media_parts);
                self.archive.set_string(&drawing_part, xml);
                self.archive
                    .set_string(rels_path_for(&drawing_part), drawing_rels.to_xml());
                content_types.set_override(&drawing_part, ContentTypes::DRAWING);

                let rel_id = sheet_rels.add(
                    relative_target(&part, &drawing_part),
                    Relationships::TYPE_DRAWING.to_string(),
                );
                worksheet.set_drawing(&rel_id);
            }
            worksheet.bind_external_links(&mut sheet_rels);
            if !sheet_rels.is_empty() {
                self.archive
                    .set_string(rels_path_for(&part), sheet_rels.to_xml());
            }

            worksheet.refresh_dimension();
            self.archive.set_string(&part, worksheet.to_xml());
            content_types.set_override(&part, ContentTypes::WORKSHEET);

            let rel_id = self.relationships.add(
                relative_target(&self.workbook_part, &part),
                Relationships::TYPE_WORKSHEET.to_string(),
            );
            entries.push(SheetEntry {
                name: title,
                sheet_id: (index + 1).to_string(),
                rel_id,
                part,
            });
        }

        self.rewrite_sheet_list(&entries);
        self.archive
            .set_string(&self.workbook_part, self.workbook.to_xml());
        self.archive.set_string(
            rels_path_for(&self.workbook_part),
            self.relationships.to_xml(),
        );
        self.update_app_properties(&entries)?;
        self.archive
            .set_string(CONTENT_TYPES_PATH, content_types.to_xml());

        info!(
            sheets = entries.len(),
            media = media.len(),
            "workbook assembled"
        );
        self.archive.to_bytes()
    }

    fn rewrite_sheet_list(&mut self, entries: &[SheetEntry]) {
        let root = &mut self.workbook.root;
        let r_prefix = match root.namespace_prefix(OFFICE_RELATIONSHIPS_NS) {
            Some(prefix) => prefix.to_string(),
            None => {
                root.set_attr("xmlns:r", OFFICE_RELATIONSHIPS_NS);
                "r".to_string()
            }
        };
        let sheet_name = match root.prefix() {
            Some(prefix) => format!("{prefix}:sheet"),
            None => "sheet".to_string(),
        };

        root.retain_elements(|el| el.local_name() != "definedNames");
        if let Some(list) = root.child_mut("sheets") {
            list.children.clear();
            for entry in entries {
                list.push(
                    Element::new(sheet_name.clone())
                        .with_attr("name", entry.name.as_str())
                        .with_attr("sheetId", entry.sheet_id.as_str())
                        .with_attr(&format!("{r_prefix}:id"), entry.rel_id.as_str()),
                );
            }
        }
        if let Some(views) = root.child_mut("bookViews") {
            for view in views.elements_mut() {
                view.set_attr("activeTab", "0");
                view.remove_attr("firstSheet");
            }
        }
    }

    /// Refresh the sheet titles listed in `docProps/app.xml`
    fn update_app_properties(&mut self, entries: &[SheetEntry]) -> Result<()> {
        let root_rels = self.archive.relationships_of("")?;
        let Some((_, rel)) = root_rels.find_by_type(TYPE_EXTENDED_PROPERTIES) else {
            return Ok(());
        };
        let part = resolve_target("", &rel.target);
        let Some(bytes) = self.archive.get(&part) else {
            return Ok(());
        };

        let mut doc = XmlDocument::parse(bytes)?;
        let root = &mut doc.root;
        let vt = match root.namespace_prefix(DOC_PROPS_VTYPES_NS) {
            Some(prefix) => prefix.to_string(),
            None => {
                root.set_attr("xmlns:vt", DOC_PROPS_VTYPES_NS);
                "vt".to_string()
            }
        };
        let count = entries.len().to_string();
        let vt_el = |local: &str| Element::new(format!("{vt}:{local}"));

        let heading_pairs = Element::new("HeadingPairs").with_child(
            vt_el("vector")
                .with_attr("size", "2")
                .with_attr("baseType", "variant")
                .with_child(vt_el("variant").with_child(vt_el("lpstr").with_text("Worksheets")))
                .with_child(vt_el("variant").with_child(vt_el("i4").with_text(count.as_str()))),
        );
        let mut titles = vt_el("vector")
            .with_attr("size", count.as_str())
            .with_attr("baseType", "lpstr");
        for entry in entries {
            titles.push(vt_el("lpstr").with_text(entry.name.as_str()));
        }

        root.retain_elements(|el| {
            el.local_name() != "HeadingPairs" && el.local_name() != "TitlesOfParts"
        });
        root.push(heading_pairs);
        root.push(Element::new("TitlesOfParts").with_child(titles));

        self.archive.set_string(&part, doc.to_xml());
        Ok(())
    }
}

fn read_sheet_entries(
    workbook: &XmlDocument,
    relationships: &Relationships,
    workbook_part: &str,
) -> Result<Vec<SheetEntry>> {
    let Some(list) = workbook.root.child("sheets") else {
        return Ok(Vec::new());
    };

    let mut entries = Vec::new();
    for sheet in list.elements().filter(|el| el.local_name() == "sheet") {
        let name = sheet
            .attr("name")
            .ok_or_else(|| OoxmlError::InvalidStructure("sheet without name".to_string()))?;
        let rel_id = sheet.attr_local("id").ok_or_else(|| {
            OoxmlError::InvalidStructure(format!("sheet '{name}' has no relationship id"))
        })?;
        let rel = relationships.get_target(rel_id).ok_or_else(|| {
            OoxmlError::MissingFile(format!("relationship {rel_id} for sheet '{name}'"))
        })?;
        entries.push(SheetEntry {
            name: name.to_string(),
            sheet_id: sheet.attr("sheetId").unwrap_or_default().to_string(),
            rel_id: rel_id.to_string(),
            part: resolve_target(workbook_part, &rel.target),
        });
    }
    Ok(entries)
}

/// Media parts written into the package, one per distinct image content
#[derive(Debug)]
struct MediaStore {
    prefix: String,
    by_digest: HashMap<Vec<u8>, String>,
}

impl MediaStore {
    fn new(prefix: String) -> Self {
        Self {
            prefix,
            by_digest: HashMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.by_digest.len()
    }

    /// Package path holding `media`, writing it on first use
    fn store(
        &mut self,
        archive: &mut OoxmlArchive,
        content_types: &mut ContentTypes,
        media: &MediaData,
    ) -> String {
        let digest = Sha256::digest(&media.bytes[..]).to_vec();
        if let Some(part) = self.by_digest.get(&digest) {
            return part.clone();
        }

        let part = archive.next_free_part(&self.prefix, &format!(".{}", media.extension));
        archive.set(part.clone(), media.bytes.to_vec());
        content_types.ensure_default(&media.extension, content_type_for_extension(&media.extension));
        self.by_digest.insert(digest, part.clone());
        part
    }
}
