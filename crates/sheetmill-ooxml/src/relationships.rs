//! Relationships parsing and modification for OOXML packages
//!
//! OOXML uses relationship files (_rels/*.rels) to map IDs to targets.
//! A workbook reaches its worksheets this way, a worksheet its drawing,
//! and a drawing its images.
//!
//! # Example
//!
//! ```ignore
//! use sheetmill_ooxml::relationships::Relationships;
//!
//! let mut rels = Relationships::parse(xml_bytes)?;
//! let id = rels.add(
//!     "../media/image1.png".to_string(),
//!     Relationships::TYPE_IMAGE.to_string(),
//! );
//! let xml = rels.to_xml();
//! ```

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};
use crate::xml::escape_xml;

/// OOXML namespace for relationships
pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Namespace of `r:id` / `r:embed` attributes inside parts
pub const OFFICE_RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Common relationship type URIs
impl Relationships {
    /// Main workbook part, referenced from the package root
    pub const TYPE_OFFICE_DOCUMENT: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    /// Worksheet relationship type
    pub const TYPE_WORKSHEET: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
    /// Drawing relationship type
    pub const TYPE_DRAWING: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing";
    /// Image relationship type
    pub const TYPE_IMAGE: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    /// Calculation chain relationship type
    pub const TYPE_CALC_CHAIN: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain";
    /// Hyperlink relationship type
    pub const TYPE_HYPERLINK: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
}

/// Parsed relationships from a .rels file
#[derive(Debug, Clone)]
pub struct Relationships {
    /// Ordered list of relationship IDs (maintains insertion order)
    order: Vec<String>,
    /// Map of relationship ID to target (for fast lookups)
    map: HashMap<String, RelationshipTarget>,
    /// Counter for generating unique IDs (starts at 1)
    next_id_counter: u32,
}

impl Default for Relationships {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            map: HashMap::new(),
            next_id_counter: 1, // IDs start at rId1
        }
    }
}

/// A relationship target with its type and mode
#[derive(Debug, Clone)]
pub struct RelationshipTarget {
    /// The target URL or path
    pub target: String,
    /// The relationship type URI (e.g., worksheet, drawing, image)
    pub rel_type: String,
    /// Target mode: "External" for URLs, None for internal paths
    pub target_mode: Option<String>,
}

impl RelationshipTarget {
    /// Whether the target lives outside the package
    pub fn is_external(&self) -> bool {
        self.target_mode.as_deref() == Some("External")
    }
}

impl Relationships {
    /// Create an empty relationships map
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse relationships from XML bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut order = Vec::new();
        let mut map = HashMap::new();
        let mut max_id: u32 = 0;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let mut id = None;
                        let mut target = None;
                        let mut rel_type = None;
                        let mut target_mode = None;

                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            let value = attr.unescape_value().ok().map(|s| s.to_string());
                            match attr.key.as_ref() {
                                b"Id" => id = value,
                                b"Target" => target = value,
                                b"Type" => rel_type = value,
                                b"TargetMode" => target_mode = value,
                                _ => {}
                            }
                        }

                        if let (Some(id), Some(target)) = (id, target) {
                            if let Some(num) = extract_id_number(&id) {
                                max_id = max_id.max(num);
                            }

                            order.push(id.clone());
                            map.insert(
                                id,
                                RelationshipTarget {
                                    target,
                                    rel_type: rel_type.unwrap_or_default(),
                                    target_mode,
                                },
                            );
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OoxmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(Self {
            order,
            map,
            next_id_counter: max_id + 1,
        })
    }

    /// Add a new relationship and return the generated ID
    ///
    /// # Arguments
    ///
    /// * `target` - The target path (relative to the source part) or URL
    /// * `rel_type` - The relationship type URI (use TYPE_* constants)
    pub fn add(&mut self, target: String, rel_type: String) -> String {
        let target_mode = if rel_type.contains("hyperlink") && target.starts_with("http") {
            Some("External".to_string())
        } else {
            None
        };
        self.add_with_mode(target, rel_type, target_mode)
    }

    /// Add a new relationship with explicit target mode
    pub fn add_with_mode(
        &mut self,
        target: String,
        rel_type: String,
        target_mode: Option<String>,
    ) -> String {
        let id = format!("rId{}", self.next_id_counter);
        self.next_id_counter += 1;

        self.order.push(id.clone());
        self.map.insert(
            id.clone(),
            RelationshipTarget {
                target,
                rel_type,
                target_mode,
            },
        );

        id
    }

    /// Remove a relationship by ID
    ///
    /// The ID counter is not rewound, so removed IDs are never reissued.
    pub fn remove(&mut self, id: &str) -> Option<RelationshipTarget> {
        let removed = self.map.remove(id)?;
        self.order.retain(|existing| existing != id);
        Some(removed)
    }

    /// Remove every relationship of the given type, returning their IDs
    pub fn remove_by_type(&mut self, rel_type: &str) -> Vec<String> {
        let ids: Vec<String> = self
            .iter()
            .filter(|(_, rel)| rel.rel_type == rel_type)
            .map(|(id, _)| id.to_string())
            .collect();
        for id in &ids {
            self.remove(id);
        }
        ids
    }

    /// Serialize relationships to OOXML format
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<Relationships xmlns="{}">"#, RELATIONSHIPS_NS));
        xml.push('\n');

        for (id, rel) in self.iter() {
            xml.push_str("  <Relationship");
            xml.push_str(&format!(r#" Id="{}""#, escape_xml(id)));
            xml.push_str(&format!(r#" Type="{}""#, escape_xml(&rel.rel_type)));
            xml.push_str(&format!(r#" Target="{}""#, escape_xml(&rel.target)));
            if let Some(mode) = &rel.target_mode {
                xml.push_str(&format!(r#" TargetMode="{}""#, escape_xml(mode)));
            }
            xml.push_str("/>\n");
        }

        xml.push_str("</Relationships>");
        xml
    }

    /// Get the target for a relationship ID
    pub fn get(&self, id: &str) -> Option<&str> {
        self.map.get(id).map(|r| r.target.as_str())
    }

    /// Get the full relationship target for an ID
    pub fn get_target(&self, id: &str) -> Option<&RelationshipTarget> {
        self.map.get(id)
    }

    /// First relationship of the given type
    pub fn find_by_type(&self, rel_type: &str) -> Option<(&str, &RelationshipTarget)> {
        self.iter().find(|(_, rel)| rel.rel_type == rel_type)
    }

    /// Check if a relationship ID exists
    pub fn contains(&self, id: &str) -> bool {
        self.map.contains_key(id)
    }

    /// Get the number of relationships
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if there are no relationships
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over relationships in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelationshipTarget)> {
        self.order
            .iter()
            .filter_map(|id| self.map.get(id).map(|rel| (id.as_str(), rel)))
    }
}

/// Path of the `.rels` file describing `part`'s relationships.
///
/// The empty string stands for the package root.
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None if part.is_empty() => "_rels/.rels".to_string(),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the part that declares it,
/// yielding a package path without a leading slash.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize_path(absolute.split('/'));
    }
    let base = source_part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    normalize_path(base.split('/').chain(target.split('/')))
}

/// Relative target that points from `source_part` to `target_part`
pub fn relative_target(source_part: &str, target_part: &str) -> String {
    let source_dir: Vec<&str> = source_part
        .rsplit_once('/')
        .map(|(dir, _)| dir.split('/').collect())
        .unwrap_or_default();
    let target: Vec<&str> = target_part.split('/').collect();

    let common = source_dir
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<&str> = vec![".."; source_dir.len() - common];
    segments.extend(&target[common..]);
    segments.join("/")
}

fn normalize_path<'a>(segments: impl Iterator<Item = &'a str>) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in segments {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.join("/")
}

/// Extract the numeric portion from a relationship ID (e.g., "rId5" -> 5)
fn extract_id_number(id: &str) -> Option<u32> {
    id.strip_prefix("rId")
        .or_else(|| id.strip_prefix("RId"))
        .or_else(|| id.strip_prefix("rid"))
        .and_then(|num_str| num_str.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relationships() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
        <Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
            <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
        </Relationships>"#;

        let rels = Relationships::parse(xml).unwrap();

        assert_eq!(rels.get("rId1"), Some("https://example.com"));
        assert_eq!(rels.get("rId2"), Some("worksheets/sheet1.xml"));
        assert!(rels.get_target("rId1").unwrap().is_external());
        assert!(!rels.get_target("rId2").unwrap().is_external());
        assert_eq!(rels.len(), 2);
    }

    #[test]
    fn test_add_continues_from_existing() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
        <Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
            <Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/>
        </Relationships>"#;

        let mut rels = Relationships::parse(xml).unwrap();

        // Next ID should be rId6 (max existing is 5)
        let new_id = rels.add(
            "worksheets/sheet1.xml".to_string(),
            Relationships::TYPE_WORKSHEET.to_string(),
        );
        assert_eq!(new_id, "rId6");
    }

    #[test]
    fn test_remove_keeps_counter() {
        let mut rels = Relationships::new();
        let first = rels.add("a.xml".to_string(), Relationships::TYPE_WORKSHEET.to_string());
        rels.add("b.xml".to_string(), Relationships::TYPE_CALC_CHAIN.to_string());

        assert!(rels.remove(&first).is_some());
        assert_eq!(rels.remove_by_type(Relationships::TYPE_CALC_CHAIN), vec!["rId2"]);
        assert!(rels.is_empty());

        let next = rels.add("c.xml".to_string(), Relationships::TYPE_WORKSHEET.to_string());
        assert_eq!(next, "rId3");
    }

    #[test]
    fn test_to_xml_reparses() {
        let mut rels = Relationships::new();
        rels.add(
            "../media/image1.png".to_string(),
            Relationships::TYPE_IMAGE.to_string(),
        );
        rels.add(
            "https://example.com/?a=1&b=2".to_string(),
            Relationships::TYPE_HYPERLINK.to_string(),
        );

        let xml = rels.to_xml();
        assert!(xml.contains(r#"TargetMode="External""#));
        assert!(xml.contains("&amp;b=2"));

        let reparsed = Relationships::parse(xml.as_bytes()).unwrap();
        assert_eq!(reparsed.get("rId1"), Some("../media/image1.png"));
        assert_eq!(reparsed.get("rId2"), Some("https://example.com/?a=1&b=2"));
    }

    #[test]
    fn test_rels_path_for() {
        assert_eq!(rels_path_for(""), "_rels/.rels");
        assert_eq!(rels_path_for("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
        assert_eq!(
            rels_path_for("xl/worksheets/sheet1.xml"),
            "xl/worksheets/_rels/sheet1.xml.rels"
        );
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("", "xl/workbook.xml"), "xl/workbook.xml");
        assert_eq!(
            resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/drawings/drawing1.xml", "../media/image1.png"),
            "xl/media/image1.png"
        );
        assert_eq!(
            resolve_target("xl/workbook.xml", "/xl/worksheets/sheet2.xml"),
            "xl/worksheets/sheet2.xml"
        );
    }

    #[test]
    fn test_relative_target() {
        assert_eq!(
            relative_target("xl/workbook.xml", "xl/worksheets/sheet1.xml"),
            "worksheets/sheet1.xml"
        );
        assert_eq!(
            relative_target("xl/drawings/drawing1.xml", "xl/media/image1.png"),
            "../media/image1.png"
        );
        assert_eq!(
            relative_target("xl/worksheets/sheet1.xml", "xl/drawings/drawing1.xml"),
            "../drawings/drawing1.xml"
        );
    }

    #[test]
    fn test_extract_id_number() {
        assert_eq!(extract_id_number("rId1"), Some(1));
        assert_eq!(extract_id_number("rId123"), Some(123));
        assert_eq!(extract_id_number("RId5"), Some(5));
        assert_eq!(extract_id_number("invalid"), None);
    }
}
