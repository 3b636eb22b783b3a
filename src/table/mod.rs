//! Results tables
//!
//! A results table is an append-only sequence of `(data_source, area)`
//! records. It is created once and never truncated; re-running a batch
//! appends after the existing rows.

mod csv;

pub use self::csv::CsvResultTable;

use crate::error::ExtentResult;
use crate::pipeline::ResultRecord;

/// Column names, in order
pub const COLUMNS: [&str; 2] = ["data_source", "area"];

/// Storage strategy for result records
pub trait ResultTable {
    /// Creates the table with its columns if it does not exist yet
    fn ensure_exists(&mut self) -> ExtentResult<()>;

    /// Appends one record as a single write
    fn append(&mut self, record: &ResultRecord) -> ExtentResult<()>;

    /// Where the table lives, for messages
    fn location(&self) -> String;
}
