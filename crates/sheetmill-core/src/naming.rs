//! Sheet titles derived from row values.

use sheetmill_data::Row;

/// Title used when no naming column is configured or the row lacks it
pub const FALLBACK_TITLE: &str = "Default";

/// Longest sheet title Excel accepts, in characters
pub const MAX_TITLE_CHARS: usize = 31;

const FORBIDDEN: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Optional column naming each generated sheet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetNaming {
    column: Option<String>,
}

impl SheetNaming {
    pub fn new(column: Option<String>) -> Self {
        Self { column }
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    /// Title for `row`
    pub fn title_for(&self, row: &Row<'_>) -> String {
        self.column
            .as_deref()
            .and_then(|column| row.get(column))
            .map(|value| sanitize_title(&value.to_string()))
            .unwrap_or_else(|| FALLBACK_TITLE.to_string())
    }
}

/// Make `raw` a legal sheet title.
///
/// Forbidden characters become `_`, as does an apostrophe at either end.
/// The result is cut to [`MAX_TITLE_CHARS`]; an empty title falls back to
/// [`FALLBACK_TITLE`].
pub fn sanitize_title(raw: &str) -> String {
    let mut chars: Vec<char> = raw
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) || c.is_control() { '_' } else { c })
        .take(MAX_TITLE_CHARS)
        .collect();

    if chars.is_empty() {
        return FALLBACK_TITLE.to_string();
    }
    if chars[0] == '\'' {
        chars[0] = '_';
    }
    if let Some(last) = chars.last_mut() {
        if *last == '\'' {
            *last = '_';
        }
    }
    chars.into_iter().collect()
}

/// Cut `title` to at most `max` characters
pub fn truncate_chars(title: &str, max: usize) -> String {
    title.chars().take(max).collect()
}
