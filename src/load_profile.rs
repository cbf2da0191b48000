//! Load-profile ingestion from CSV.
//!
//! Only the scalars the calculators need are derived here: average daily
//! load, annual load, and peak demand. An empty profile yields `None` for
//! all of them rather than zero.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::units::{AnnualLoadKwh, DailyLoadKwh};

/// Accepted names for the timestamp column (exact, case-insensitive).
const TIMESTAMP_COLUMNS: &[&str] = &["timestamp", "time", "date", "datetime"];

/// Accepted names for the load column (exact, case-insensitive).
const LOAD_COLUMNS: &[&str] = &["load_kwh", "load", "kwh", "energy_kwh"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M",
];

/// Error reading a load-profile CSV.
#[derive(Debug)]
pub enum LoadProfileError {
    Io(io::Error),
    Csv(csv::Error),
    /// No header matched any accepted name for the column.
    MissingColumn(&'static str),
}

impl fmt::Display for LoadProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "load profile: {e}"),
            Self::Csv(e) => write!(f, "load profile: {e}"),
            Self::MissingColumn(kind) => write!(f, "load profile: no {kind} column found"),
        }
    }
}

impl std::error::Error for LoadProfileError {}

impl From<io::Error> for LoadProfileError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for LoadProfileError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

/// One metered energy value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSample {
    pub timestamp: NaiveDateTime,
    /// Energy consumed in the interval (kWh, >= 0).
    pub kwh: f64,
}

/// Time-ordered, de-duplicated energy samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadProfile {
    samples: Vec<LoadSample>,
    dropped_rows: usize,
}

impl LoadProfile {
    /// Builds a profile, dropping negative or non-finite samples, sorting
    /// by time, and keeping the first of any duplicate timestamps.
    pub fn from_samples(samples: impl IntoIterator<Item = LoadSample>) -> Self {
        let mut dropped_rows = 0;
        let mut kept: Vec<LoadSample> = samples
            .into_iter()
            .filter(|s| {
                let ok = s.kwh.is_finite() && s.kwh >= 0.0;
                if !ok {
                    dropped_rows += 1;
                }
                ok
            })
            .collect();

        kept.sort_by_key(|s| s.timestamp);
        let before = kept.len();
        kept.dedup_by_key(|s| s.timestamp);
        dropped_rows += before - kept.len();

        Self {
            samples: kept,
            dropped_rows,
        }
    }

    /// Reads a CSV with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the CSV is malformed or lacks a timestamp or
    /// load column. Individual unparseable rows are dropped, not errors.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, LoadProfileError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();

        let ts_col = find_column(&headers, TIMESTAMP_COLUMNS)
            .ok_or(LoadProfileError::MissingColumn("timestamp"))?;
        let load_col =
            find_column(&headers, LOAD_COLUMNS).ok_or(LoadProfileError::MissingColumn("load"))?;

        let mut samples = Vec::new();
        let mut unparsed = 0;
        for record in rdr.records() {
            let record = record?;
            let timestamp = record.get(ts_col).and_then(parse_timestamp);
            let kwh = record.get(load_col).and_then(|v| v.parse::<f64>().ok());
            match (timestamp, kwh) {
                (Some(timestamp), Some(kwh)) => samples.push(LoadSample { timestamp, kwh }),
                _ => unparsed += 1,
            }
        }

        let mut profile = Self::from_samples(samples);
        profile.dropped_rows += unparsed;
        debug!(
            samples = profile.samples.len(),
            dropped = profile.dropped_rows,
            "parsed load profile"
        );
        Ok(profile)
    }

    /// Reads a CSV file.
    ///
    /// # Errors
    ///
    /// See [`LoadProfile::from_csv_reader`]; also fails if the file cannot
    /// be opened.
    pub fn from_csv_path(path: &Path) -> Result<Self, LoadProfileError> {
        let file = File::open(path)?;
        Self::from_csv_reader(io::BufReader::new(file))
    }

    pub fn samples(&self) -> &[LoadSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Rows discarded as unparseable, negative, or duplicate.
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    /// Sum of all samples (kWh).
    pub fn total_kwh(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.samples.iter().map(|s| s.kwh).sum())
    }

    /// Median spacing between consecutive samples, in hours.
    ///
    /// A single sample is treated as one day of consumption.
    pub fn interval_hours(&self) -> Option<f64> {
        match self.samples.len() {
            0 => None,
            1 => Some(24.0),
            _ => {
                let mut gaps: Vec<f64> = self
                    .samples
                    .windows(2)
                    .map(|w| (w[1].timestamp - w[0].timestamp).num_seconds() as f64 / 3600.0)
                    .collect();
                gaps.sort_by(f64::total_cmp);
                Some(gaps[gaps.len() / 2])
            }
        }
    }

    /// Days covered: first to last sample plus one interval.
    pub fn covered_days(&self) -> Option<f64> {
        let interval = self.interval_hours()?;
        let first = self.samples.first()?.timestamp;
        let last = self.samples.last()?.timestamp;
        let span_hours = (last - first).num_seconds() as f64 / 3600.0;
        Some((span_hours + interval) / 24.0)
    }

    /// Average consumption per day.
    pub fn daily_load(&self) -> Option<DailyLoadKwh> {
        let days = self.covered_days()?;
        DailyLoadKwh::new(self.total_kwh()? / days).ok()
    }

    /// Annual consumption extrapolated from the daily average.
    pub fn annual_load(&self) -> Option<AnnualLoadKwh> {
        self.daily_load().map(DailyLoadKwh::to_annual)
    }

    /// Largest single-interval draw, expressed as average power (kW).
    pub fn peak_load_kw(&self) -> Option<f64> {
        let interval = self.interval_hours()?;
        let peak = self.samples.iter().map(|s| s.kwh).fold(0.0, f64::max);
        Some(peak / interval)
    }
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| n.eq_ignore_ascii_case(h.trim())))
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
