//! End-to-end report generation.

use std::io::Write;
use std::path::Path;

use sheetmill_data::{load_table, Table};
use sheetmill_ooxml::OoxmlError;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::config::{ReportConfig, ReportJob};
use crate::engine::{ReportSummary, TemplateEngine};
use crate::error::{ReportError, Result};

/// Load the dataset, run every row through the template and return the
/// serialized workbook
pub fn render_report(job: &ReportJob) -> Result<(Vec<u8>, ReportSummary)> {
    let mut table = load_table(&job.data, &job.config.load)?;
    if let Some(rule) = &job.config.split {
        rule.apply(&mut table);
    }
    warn_missing_columns(&table, &job.config);

    let mut engine = TemplateEngine::open(&job.template, job.config.clone())?;
    for row in table.iter() {
        engine.process_row(&row);
    }
    if table.is_empty() {
        warn!(path = %job.data.display(), "dataset has no rows");
    }
    engine.finish()
}

/// [`render_report`] and write the result to `job.output`
pub fn generate_report(job: &ReportJob) -> Result<ReportSummary> {
    let (bytes, summary) = render_report(job)?;
    write_atomically(&job.output, &bytes).map_err(ReportError::Save)?;
    info!(
        output = %job.output.display(),
        rows = summary.rows,
        sheets = summary.sheets.len(),
        images = summary.images_placed,
        "report written"
    );
    Ok(summary)
}

/// Write `bytes` next to `path` and rename into place
fn write_atomically(path: &Path, bytes: &[u8]) -> std::result::Result<(), OoxmlError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| OoxmlError::Io(e.error))?;
    Ok(())
}

fn warn_missing_columns(table: &Table, config: &ReportConfig) {
    for column in config.fields.columns() {
        if !table.has_column(column) {
            warn!(column, "mapped column not in dataset, cells will be empty");
        }
    }
    if let Some(column) = config.naming.column() {
        if !table.has_column(column) {
            warn!(column, "sheet name column not in dataset, using fallback title");
        }
    }
    if let Some(spec) = &config.image {
        if !table.has_column(&spec.key_column) {
            warn!(column = %spec.key_column, "image key column not in dataset, no images placed");
        }
    }
}
