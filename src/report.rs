//! CSV report writer.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::debug;

use crate::harvest::{COLUMNS, HarvestResult};

const DATE_PLACEHOLDER: &str = "{date}";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write report {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Persists a finalized harvest.
pub trait ReportSink {
    /// Writes the report and returns where it went.
    fn write(&self, result: &HarvestResult) -> Result<PathBuf, ReportError>;
}

pub struct CsvReport {
    path: PathBuf,
}

impl CsvReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolves `{date}` in `template` to `date` as `YYYY-MM-DD`.
    pub fn dated(template: &str, date: NaiveDate) -> Self {
        let stamp = date.format("%Y-%m-%d").to_string();
        Self::new(template.replace(DATE_PLACEHOLDER, &stamp))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for CsvReport {
    fn write(&self, result: &HarvestResult) -> Result<PathBuf, ReportError> {
        let io_err = |source| ReportError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let file = fs::File::create(&self.path).map_err(io_err)?;
        let mut out = BufWriter::new(file);
        write_csv(&mut out, result).map_err(io_err)?;
        out.flush().map_err(io_err)?;

        debug!(path = %self.path.display(), rows = result.len(), "report written");
        Ok(self.path.clone())
    }
}

fn write_csv(out: &mut impl Write, result: &HarvestResult) -> io::Result<()> {
    write_row(out, &COLUMNS)?;
    for record in result.records() {
        write_row(out, &record.values())?;
    }
    Ok(())
}

fn write_row(out: &mut impl Write, fields: &[&str]) -> io::Result<()> {
    let line = fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",");
    out.write_all(line.as_bytes())?;
    out.write_all(b"\n")
}

/// Quotes fields containing a delimiter, quote or line break; doubles quotes.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
