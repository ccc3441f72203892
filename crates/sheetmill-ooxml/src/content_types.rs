//! `[Content_Types].xml` handling
//!
//! Every part in the package needs a content type, either through a
//! `<Default Extension=..>` entry or a `<Override PartName=..>` entry.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};
use crate::xml::{escape_xml, XML_DECLARATION};

/// Content types namespace
pub const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

impl ContentTypes {
    pub const WORKSHEET: &'static str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
    pub const DRAWING: &'static str = "application/vnd.openxmlformats-officedocument.drawing+xml";
    pub const RELATIONSHIPS: &'static str =
        "application/vnd.openxmlformats-package.relationships+xml";
}

/// Parsed content type table
#[derive(Debug, Clone, Default)]
pub struct ContentTypes {
    /// (extension, content type), extension stored lowercase
    defaults: Vec<(String, String)>,
    /// (part name with leading slash, content type)
    overrides: Vec<(String, String)>,
}

impl ContentTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut types = Self::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let mut key = None;
                    let mut content_type = None;
                    for attr in e.attributes().filter_map(|a| a.ok()) {
                        let value = attr.unescape_value().ok().map(|s| s.to_string());
                        match attr.key.as_ref() {
                            b"Extension" | b"PartName" => key = value,
                            b"ContentType" => content_type = value,
                            _ => {}
                        }
                    }
                    match (e.local_name().as_ref(), key, content_type) {
                        (b"Default", Some(ext), Some(ct)) => {
                            types.defaults.push((ext.to_lowercase(), ct));
                        }
                        (b"Override", Some(part), Some(ct)) => {
                            types.overrides.push((part, ct));
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OoxmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(types)
    }

    /// Register a default content type for an extension unless one exists
    pub fn ensure_default(&mut self, extension: &str, content_type: &str) {
        let extension = extension.to_lowercase();
        if self.default_for(&extension).is_none() {
            self.defaults.push((extension, content_type.to_string()));
        }
    }

    pub fn default_for(&self, extension: &str) -> Option<&str> {
        let extension = extension.to_lowercase();
        self.defaults
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, ct)| ct.as_str())
    }

    /// Set the override for a package path (with or without leading slash)
    pub fn set_override(&mut self, part: &str, content_type: &str) {
        let part_name = part_name(part);
        match self.overrides.iter_mut().find(|(name, _)| *name == part_name) {
            Some((_, existing)) => *existing = content_type.to_string(),
            None => self.overrides.push((part_name, content_type.to_string())),
        }
    }

    pub fn remove_override(&mut self, part: &str) {
        let part_name = part_name(part);
        self.overrides.retain(|(name, _)| *name != part_name);
    }

    pub fn override_for(&self, part: &str) -> Option<&str> {
        let part_name = part_name(part);
        self.overrides
            .iter()
            .find(|(name, _)| *name == part_name)
            .map(|(_, ct)| ct.as_str())
    }

    /// Keep overrides whose package path (without leading slash) passes `keep`
    pub fn retain_overrides(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.overrides
            .retain(|(name, _)| keep(name.trim_start_matches('/')));
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(XML_DECLARATION);
        xml.push('\n');
        xml.push_str(&format!(r#"<Types xmlns="{}">"#, CONTENT_TYPES_NS));
        xml.push('\n');
        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(
                "  <Default Extension=\"{}\" ContentType=\"{}\"/>\n",
                escape_xml(ext),
                escape_xml(ct)
            ));
        }
        for (part, ct) in &self.overrides {
            xml.push_str(&format!(
                "  <Override PartName=\"{}\" ContentType=\"{}\"/>\n",
                escape_xml(part),
                escape_xml(ct)
            ));
        }
        xml.push_str("</Types>");
        xml
    }
}

fn part_name(part: &str) -> String {
    if part.starts_with('/') {
        part.to_string()
    } else {
        format!("/{part}")
    }
}

/// Get the MIME content type for an image extension
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        "tiff" | "tif" => "image/tiff",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="XML" ContentType="application/xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
  <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

    #[test]
    fn test_parse_content_types() {
        let types = ContentTypes::parse(SAMPLE).unwrap();
        assert_eq!(types.default_for("xml"), Some("application/xml"));
        assert_eq!(
            types.override_for("xl/worksheets/sheet1.xml"),
            Some(ContentTypes::WORKSHEET)
        );
    }

    #[test]
    fn test_ensure_default_does_not_duplicate() {
        let mut types = ContentTypes::parse(SAMPLE).unwrap();
        types.ensure_default("png", "image/png");
        types.ensure_default("PNG", "image/png");

        let xml = types.to_xml();
        assert_eq!(xml.matches("Extension=\"png\"").count(), 1);
    }

    #[test]
    fn test_override_editing() {
        let mut types = ContentTypes::parse(SAMPLE).unwrap();
        types.set_override("xl/drawings/drawing1.xml", ContentTypes::DRAWING);
        types.remove_override("/xl/worksheets/sheet1.xml");

        assert_eq!(
            types.override_for("/xl/drawings/drawing1.xml"),
            Some(ContentTypes::DRAWING)
        );
        assert!(types.override_for("xl/worksheets/sheet1.xml").is_none());

        let reparsed = ContentTypes::parse(types.to_xml().as_bytes()).unwrap();
        assert!(reparsed.override_for("xl/drawings/drawing1.xml").is_some());
    }

    #[test]
    fn test_content_type_for_extension() {
        assert_eq!(content_type_for_extension("png"), "image/png");
        assert_eq!(content_type_for_extension("PNG"), "image/png");
        assert_eq!(content_type_for_extension("jpg"), "image/jpeg");
        assert_eq!(content_type_for_extension("emf"), "image/x-emf");
    }
}
