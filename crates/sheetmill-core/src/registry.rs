//! Title-to-sheet bookkeeping for generated sheets.
//!
//! Excel compares sheet names without regard to letter case, so a title
//! that only differs in case from one already taken gets a numeric suffix.
//! Later rows with the same raw title land on the same suffixed sheet.

use std::collections::HashMap;

use crate::naming::{truncate_chars, MAX_TITLE_CHARS};

/// Result of looking a title up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetSlot {
    /// A new sheet was registered at this index
    Created(usize),
    /// The title already had a sheet at this index
    Reused(usize),
}

impl SheetSlot {
    pub fn index(self) -> usize {
        match self {
            SheetSlot::Created(index) | SheetSlot::Reused(index) => index,
        }
    }
}

/// Generated sheet titles in first-seen order
#[derive(Debug, Clone, Default)]
pub struct SheetRegistry {
    titles: Vec<String>,
    /// Requested title to sheet index
    by_request: HashMap<String, usize>,
    /// Lower-cased final titles in use
    taken: HashMap<String, usize>,
}

impl SheetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or register the sheet for `title`
    pub fn lookup(&mut self, title: &str) -> SheetSlot {
        if let Some(&index) = self.by_request.get(title) {
            return SheetSlot::Reused(index);
        }

        let unique = self.unique_title(title);
        let index = self.titles.len();
        self.taken.insert(unique.to_lowercase(), index);
        self.by_request.insert(title.to_string(), index);
        self.titles.push(unique);
        SheetSlot::Created(index)
    }

    fn unique_title(&self, title: &str) -> String {
        if !self.taken.contains_key(&title.to_lowercase()) {
            return title.to_string();
        }
        (1usize..)
            .map(|n| {
                let suffix = n.to_string();
                let stem = truncate_chars(title, MAX_TITLE_CHARS - suffix.len());
                format!("{stem}{suffix}")
            })
            .find(|candidate| !self.taken.contains_key(&candidate.to_lowercase()))
            .unwrap_or_else(|| title.to_string())
    }

    /// Final title of the sheet at `index`
    pub fn title(&self, index: usize) -> Option<&str> {
        self.titles.get(index).map(String::as_str)
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}
