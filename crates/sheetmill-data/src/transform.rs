//! Column transforms applied after loading.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::table::Table;
use crate::value::Value;

/// A string transform applied to every value of one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitKind {
    /// Strip a leading run of digits followed by one whitespace character
    RemoveNumbers,
    /// Any other transform name; applying it changes nothing
    Other(String),
}

impl SplitKind {
    pub fn apply(&self, text: &str) -> String {
        match self {
            SplitKind::RemoveNumbers => {
                static LEADING_NUMBER_RE: OnceLock<Regex> = OnceLock::new();
                let re = LEADING_NUMBER_RE
                    .get_or_init(|| Regex::new(r"^\d+\s").expect("leading-number pattern is valid"));
                re.replace(text, "").into_owned()
            }
            SplitKind::Other(_) => text.to_string(),
        }
    }
}

impl FromStr for SplitKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(&['-', '_'][..], " ");
        Ok(match normalized.as_str() {
            "remove numbers" => SplitKind::RemoveNumbers,
            _ => SplitKind::Other(s.to_string()),
        })
    }
}

impl fmt::Display for SplitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitKind::RemoveNumbers => f.write_str("Remove Numbers"),
            SplitKind::Other(name) => f.write_str(name),
        }
    }
}

/// Rewrite one column with a [`SplitKind`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRule {
    pub column: String,
    pub kind: SplitKind,
}

impl SplitRule {
    pub fn new(column: impl Into<String>, kind: SplitKind) -> Self {
        Self {
            column: column.into(),
            kind,
        }
    }

    /// Apply the rule to every row.
    ///
    /// Values are converted to strings first, so the column ends up all
    /// strings even when the transform leaves them unchanged. A missing
    /// column is skipped.
    pub fn apply(&self, table: &mut Table) {
        let Some(index) = table.column_index(&self.column) else {
            debug!(column = %self.column, "split column not in table, skipped");
            return;
        };
        if let SplitKind::Other(name) = &self.kind {
            debug!(column = %self.column, kind = %name, "unknown split method, values left as text");
        }

        for value in table.column_values_mut(index) {
            let text = value.to_string();
            *value = Value::String(self.kind.apply(&text));
        }
    }
}
