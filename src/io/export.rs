//! CSV export for the yearly cash-flow projection.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::calc::CashFlowProjection;

/// Column header for cash-flow CSV export.
const HEADER: &str = "year,degradation_factor,gross_savings,net_savings,discounted,\
                       cumulative_savings,cumulative_cashflow";

/// Exports a cash-flow projection to a CSV file at the given path.
///
/// Writes a header row followed by one data row per projected year.
/// Produces deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_cashflow_csv(projection: &CashFlowProjection, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_cashflow_csv(projection, buf)
}

/// Writes a cash-flow projection as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_cashflow_csv(projection: &CashFlowProjection, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for y in &projection.years {
        wtr.write_record(&[
            y.year.to_string(),
            format!("{:.6}", y.degradation_factor),
            format!("{:.2}", y.gross_savings),
            format!("{:.2}", y.net_savings),
            format!("{:.2}", y.discounted),
            format!("{:.2}", y.cumulative_savings),
            format!("{:.2}", y.cumulative_cashflow),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
