//! CSV report output.

use csv::{Writer, WriterBuilder};
use std::io::Write;

use ttp_types::SweepResult;

use crate::aggregate::CellSummary;

const BASE_COLUMNS: &[&str] = &[
    "Temp",
    "Beta",
    "Weight",
    "Delta",
    "Reheat",
    "Phase",
    "Counter",
    "Successful",
    "Min-Seed",
    "Max-Seed",
    "Min-Cost",
    "Max-Cost",
    "Avg-Cost",
];

const TIMING_COLUMNS: &[&str] = &["Min-Time", "Max-Time", "Avg-Time"];

/// Column names of the report, in output order.
pub fn header_columns(timing: bool) -> Vec<&'static str> {
    let mut columns = BASE_COLUMNS.to_vec();
    if timing {
        columns.extend_from_slice(TIMING_COLUMNS);
    }
    columns
}

/// Field values of one data row.
///
/// Float parameters print with six decimals; delta is truncated to an
/// integer.
pub fn record_fields(summary: &CellSummary, timing: bool) -> Vec<String> {
    let c = &summary.cell;
    let mut fields = vec![
        format!("{:.6}", c.temperature as f64),
        format!("{:.6}", c.beta),
        format!("{:.6}", c.weight),
        (c.delta.trunc() as i64).to_string(),
        c.reheat.to_string(),
        c.phase.to_string(),
        c.iterations.to_string(),
        summary.successful.to_string(),
        summary.min_seed.to_string(),
        summary.max_seed.to_string(),
        summary.min_cost.to_string(),
        summary.max_cost.to_string(),
        summary.mean_cost.to_string(),
    ];
    if timing {
        fields.push(summary.min_time_ns.to_string());
        fields.push(summary.max_time_ns.to_string());
        fields.push(summary.mean_time_ns.to_string());
    }
    fields
}

/// Appends one record per cell to a sink, flushing after every write.
pub struct ReportWriter<W: Write> {
    csv: Writer<W>,
    timing: bool,
    records: usize,
}

impl<W: Write> ReportWriter<W> {
    /// Wrap `sink` and write the header row.
    pub fn new(sink: W, timing: bool) -> SweepResult<Self> {
        let mut csv = WriterBuilder::new().has_headers(false).from_writer(sink);
        csv.write_record(header_columns(timing))?;
        csv.flush()?;
        Ok(Self {
            csv,
            timing,
            records: 0,
        })
    }

    /// Number of data rows written so far.
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn append(&mut self, summary: &CellSummary) -> SweepResult<()> {
        self.csv.write_record(record_fields(summary, self.timing))?;
        self.csv.flush()?;
        self.records += 1;
        Ok(())
    }

    pub fn into_inner(self) -> SweepResult<W> {
        self.csv
            .into_inner()
            .map_err(|e| e.into_error().into())
    }
}
