//! Archive handling for XLSX packages
//!
//! XLSX files are ZIP archives of XML parts and binary resources, wired
//! together by relationship files (`_rels/*.rels`).

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use zip::read::ZipArchive;
use zip::write::ZipWriter;
use zip::CompressionMethod;

use crate::content_types::ContentTypes;
use crate::error::{OoxmlError, Result};
use crate::relationships::{rels_path_for, resolve_target, Relationships};

/// Path of the content types part
pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

/// Represents an unpacked OOXML package
#[derive(Debug, Clone, Default)]
pub struct OoxmlArchive {
    /// All files in the archive, keyed by path
    files: BTreeMap<String, Vec<u8>>,
}

impl OoxmlArchive {
    /// Create an empty archive
    pub fn new() -> Self {
        Self::default()
    }

    /// Open and unpack an XLSX file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Unpack an XLSX held in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Create from any reader that implements Read + Seek
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut files = BTreeMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();

            // Skip directories
            if name.ends_with('/') {
                continue;
            }

            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            files.insert(name, contents);
        }

        Ok(Self { files })
    }

    /// Get a file's contents by path
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|v| v.as_slice())
    }

    /// Get a file's contents, failing if it is absent
    pub fn require(&self, path: &str) -> Result<&[u8]> {
        self.get(path)
            .ok_or_else(|| OoxmlError::MissingFile(path.to_string()))
    }

    /// Get a file's contents as a string
    pub fn get_string(&self, path: &str) -> Result<Option<String>> {
        match self.files.get(path) {
            Some(bytes) => {
                let s = String::from_utf8_lossy(bytes).into_owned();
                Ok(Some(s))
            }
            None => Ok(None),
        }
    }

    /// Relationships of a part, empty when the part has no `.rels` file
    pub fn relationships_of(&self, part: &str) -> Result<Relationships> {
        match self.get(&rels_path_for(part)) {
            Some(xml) => Relationships::parse(xml),
            None => Ok(Relationships::new()),
        }
    }

    /// Parsed `[Content_Types].xml`
    pub fn content_types(&self) -> Result<ContentTypes> {
        ContentTypes::parse(self.require(CONTENT_TYPES_PATH)?)
    }

    /// Check if a file exists in the archive
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// List all files in the archive
    pub fn file_list(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|s| s.as_str())
    }

    /// Set or update a file's contents
    pub fn set(&mut self, path: impl Into<String>, contents: Vec<u8>) {
        self.files.insert(path.into(), contents);
    }

    /// Set a file's contents from a string
    pub fn set_string(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into().into_bytes());
    }

    /// Remove a file from the archive
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path)
    }

    /// First free part name of the form `{prefix}{n}{suffix}`, starting at 1
    pub fn next_free_part(&self, prefix: &str, suffix: &str) -> String {
        (1..)
            .map(|n| format!("{prefix}{n}{suffix}"))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| format!("{prefix}0{suffix}"))
    }

    /// Drop every part that cannot be reached from the package root
    /// through internal relationships, together with its content type
    /// override. Returns the removed part names.
    pub fn retain_reachable(&mut self) -> Result<Vec<String>> {
        let mut keep: HashSet<String> = HashSet::new();
        keep.insert(CONTENT_TYPES_PATH.to_string());

        let mut queue = VecDeque::from([String::new()]);
        while let Some(source) = queue.pop_front() {
            let rels_path = rels_path_for(&source);
            let Some(rels_xml) = self.get(&rels_path) else {
                continue;
            };
            keep.insert(rels_path);

            let rels = Relationships::parse(rels_xml)?;
            for (_, rel) in rels.iter() {
                if rel.is_external() {
                    continue;
                }
                let target = resolve_target(&source, &rel.target);
                if self.contains(&target) && keep.insert(target.clone()) {
                    queue.push_back(target);
                }
            }
        }

        let removed: Vec<String> = self
            .files
            .keys()
            .filter(|path| !keep.contains(*path))
            .cloned()
            .collect();
        for path in &removed {
            self.files.remove(path);
        }

        if !removed.is_empty() {
            let mut content_types = self.content_types()?;
            content_types.retain_overrides(|part| keep.contains(part));
            self.set_string(CONTENT_TYPES_PATH, content_types.to_xml());
        }

        Ok(removed)
    }

    /// Write the archive to a file
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(file)
    }

    /// Serialize the archive into memory
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.write_to(&mut buffer)?;
        Ok(buffer.into_inner())
    }

    /// Write the archive to any writer
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated);

        // Excel expects the content types part first
        if let Some(contents) = self.files.get(CONTENT_TYPES_PATH) {
            zip.start_file(CONTENT_TYPES_PATH, options)?;
            zip.write_all(contents)?;
        }

        for (path, contents) in &self.files {
            if path == CONTENT_TYPES_PATH {
                continue;
            }
            zip.start_file(path.as_str(), options)?;
            zip.write_all(contents)?;
        }

        zip.finish()?;
        Ok(())
    }
}
