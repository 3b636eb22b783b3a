//! CSV-backed results table

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{ExtentError, ExtentResult};
use crate::pipeline::ResultRecord;
use super::{ResultTable, COLUMNS};

/// Results table stored as a CSV file with a `data_source,area` header
#[derive(Debug, Clone)]
pub struct CsvResultTable {
    path: PathBuf,
}

impl CsvResultTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvResultTable { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every record back
    pub fn read_records(&self) -> ExtentResult<Vec<ResultRecord>> {
        let content = fs::read_to_string(&self.path).map_err(|e| ExtentError::storage(&self.path, e))?;
        let mut records = Vec::new();

        for (number, line) in content.lines().enumerate().skip(1) {
            if line.is_empty() {
                continue;
            }
            let fields = split_line(line);
            let parsed = match fields.as_slice() {
                [source, area] => area.parse::<f64>().ok().map(|a| ResultRecord::new(source.clone(), a)),
                _ => None,
            };
            let record = parsed.ok_or_else(|| ExtentError::storage(
                &self.path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, format!("malformed row {}: {}", number + 1, line)),
            ))?;
            records.push(record);
        }

        Ok(records)
    }
}

impl ResultTable for CsvResultTable {
    fn ensure_exists(&mut self) -> ExtentResult<()> {
        if self.path.is_dir() {
            return Err(ExtentError::storage(
                &self.path,
                std::io::Error::other("results table path is a directory"),
            ));
        }

        let has_content = fs::metadata(&self.path).map(|m| m.len() > 0).unwrap_or(false);
        if has_content {
            debug!("Results table {} already exists", self.path.display());
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ExtentError::storage(parent, e))?;
        }

        let mut file = File::create(&self.path).map_err(|e| ExtentError::storage(&self.path, e))?;
        file.write_all(format!("{}\n", COLUMNS.join(",")).as_bytes())
            .map_err(|e| ExtentError::storage(&self.path, e))?;

        info!("Created results table {}", self.path.display());
        Ok(())
    }

    fn append(&mut self, record: &ResultRecord) -> ExtentResult<()> {
        let line = format!("{},{}\n", quote_field(&record.source_identifier), record.total_area);

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| ExtentError::storage(&self.path, e))?;
        file.write_all(line.as_bytes()).map_err(|e| ExtentError::storage(&self.path, e))?;

        debug!("Appended {} to {}", record.source_identifier, self.path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Quotes a field when it holds a comma, quote or line break
fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Splits one CSV line, honouring quoted fields
fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            },
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
