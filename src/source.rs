//! Source identifiers and file-name metadata
//!
//! NSIDC concentration grids are named
//! `nt_<YYYYMMDD>_<sensor>_<version>_<hemisphere>.tif` (daily) or
//! `nt_<YYYYMM>_...` (monthly). The record identifier is always the file
//! stem; the parsed fields are diagnostics only.

use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use log::trace;
use regex::Regex;

use crate::coordinate::Pole;

lazy_static! {
    static ref NSIDC_NAME: Regex = Regex::new(
        r"^nt_(?P<date>\d{8}|\d{6})_(?P<sensor>[a-z]\d{2})_(?P<version>v[0-9.]+)_(?P<hemisphere>[ns])$"
    ).expect("file name pattern compiles");
}

/// Temporal coverage of a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Monthly,
}

/// Metadata parsed from an NSIDC file name
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    /// Acquisition day, first of the month for monthly grids
    pub date: NaiveDate,
    pub period: Period,
    /// Platform code, e.g. `n07` (Nimbus-7) or `f17` (DMSP F17)
    pub sensor: String,
    pub version: String,
    pub hemisphere: Pole,
}

impl SourceInfo {
    /// Parses a file name or path; `None` when it does not follow the pattern
    pub fn parse(path: impl AsRef<Path>) -> Option<Self> {
        let stem = source_identifier(path.as_ref());
        let caps = NSIDC_NAME.captures(&stem)?;

        let digits = &caps["date"];
        let (date, period) = if digits.len() == 8 {
            (NaiveDate::parse_from_str(digits, "%Y%m%d").ok()?, Period::Daily)
        } else {
            let year = digits[..4].parse().ok()?;
            let month = digits[4..].parse().ok()?;
            (NaiveDate::from_ymd_opt(year, month, 1)?, Period::Monthly)
        };

        let hemisphere = match &caps["hemisphere"] {
            "n" => Pole::North,
            _ => Pole::South,
        };

        let info = SourceInfo {
            date,
            period,
            sensor: caps["sensor"].to_string(),
            version: caps["version"].to_string(),
            hemisphere,
        };
        trace!("Parsed {} as {}", stem, info);
        Some(info)
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hemisphere = match self.hemisphere {
            Pole::North => "north",
            Pole::South => "south",
        };
        match self.period {
            Period::Daily => write!(f, "{}", self.date.format("%Y-%m-%d"))?,
            Period::Monthly => write!(f, "{}", self.date.format("%Y-%m"))?,
        }
        write!(f, " {} {} {}", self.sensor, self.version, hemisphere)
    }
}

/// Identifier recorded for a source: its file name without the extension
pub fn source_identifier(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
