//! Dataset loading: from a raw grid to a typed [`Table`].
//!
//! The header is the first row after `skip_rows`. Below it, rows that are
//! entirely blank are dropped and whole-number columns are normalized to
//! integers so values like `1.0` never reach a template as `"1.0"`.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{DataError, Result};
use crate::sources::{open_source, DataSource};
use crate::table::Table;
use crate::value::Value;

/// How to read a dataset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Rows above the header row to skip
    pub skip_rows: usize,
    /// Sheet to read; the first sheet when `None`
    pub sheet: Option<String>,
}

/// Load a table from a file
pub fn load_table(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Table> {
    let path = path.as_ref();
    let source = open_source(path)?;
    let grid = read_sheet(source.as_ref(), options)?;
    let table = table_from_grid(grid, options.skip_rows);
    info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns().len(),
        "dataset loaded"
    );
    Ok(table)
}

/// Header names of a file's table, using the same skip count as
/// [`load_table`]
pub fn load_columns(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Vec<String>> {
    let source = open_source(path)?;
    let grid = read_sheet(source.as_ref(), options)?;
    Ok(grid
        .into_iter()
        .nth(options.skip_rows)
        .map(|header| header_names(&header))
        .unwrap_or_default())
}

fn read_sheet(source: &dyn DataSource, options: &LoadOptions) -> Result<Vec<Vec<Value>>> {
    let sheet = match &options.sheet {
        Some(name) => name.clone(),
        None => source
            .default_sheet()
            .ok_or_else(|| DataError::SheetNotFound("No sheets in workbook".to_string()))?,
    };
    source.read_grid(&sheet)
}

/// Build a table from a grid whose header sits at row `skip_rows`
pub fn table_from_grid(grid: Vec<Vec<Value>>, skip_rows: usize) -> Table {
    let mut rows = grid.into_iter().skip(skip_rows);
    let Some(header) = rows.next() else {
        debug!(skip_rows, "no header row");
        return Table::default();
    };
    let columns = header_names(&header);

    let data: Vec<Vec<Value>> = rows
        .filter(|row| !row.iter().all(Value::is_blank))
        .collect();
    let mut table = Table::new(columns, data);
    normalize_integer_columns(&mut table);
    table
}

/// Header cells as column names: blanks become `Unnamed: <index>`,
/// repeated names get `.1`, `.2` suffixes
fn header_names(header: &[Value]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(header.len());

    for (index, cell) in header.iter().enumerate() {
        let base = if cell.is_blank() {
            format!("Unnamed: {index}")
        } else {
            cell.to_string()
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }
        seen.insert(name.clone());
        names.push(name);
    }
    names
}

/// Coerce every column whose non-blank values are all whole numbers to
/// [`Value::Int`], filling blanks with zero
fn normalize_integer_columns(table: &mut Table) {
    for index in 0..table.columns().len() {
        let integral = table
            .iter()
            .filter_map(|row| row.iter().nth(index).map(|(_, value)| value))
            .filter(|value| !value.is_blank())
            .all(|value| value.as_integral().is_some());
        if !integral {
            continue;
        }

        for value in table.column_values_mut(index) {
            *value = Value::Int(value.as_integral().unwrap_or(0));
        }
        debug!(column = %table.columns()[index], "column normalized to integers");
    }
}
