use crate::error::{DashboardError, DashboardResult, ParseError};
use crate::types::{Field, Observation, ObservationTable, TIMESTAMP_COLUMN};
use crate::util::{parse_f64_cell, parse_timestamp};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub missing_columns: Vec<Field>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

pub fn load_table<P: AsRef<Path>>(path: P) -> DashboardResult<(ObservationTable, LoadReport)> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DashboardError::DataUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "loading observations");
    load_from_reader(file)
}

/// Parses observations from any reader. Rows come back sorted by timestamp.
pub fn load_from_reader<R: Read>(reader: R) -> DashboardResult<(ObservationTable, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let ts_idx = headers
        .iter()
        .position(|h| h.trim() == TIMESTAMP_COLUMN)
        .ok_or_else(|| ParseError::MissingTimestampColumn(TIMESTAMP_COLUMN.to_string()))?;

    // (column index, field) for every known column in the header
    let known: Vec<(usize, Field)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, h)| Field::from_column(h).map(|f| (idx, f)))
        .collect();
    let columns: BTreeSet<Field> = known.iter().map(|(_, f)| *f).collect();
    let missing_columns: Vec<Field> = Field::ALL
        .into_iter()
        .filter(|f| !columns.contains(f))
        .collect();
    for f in &missing_columns {
        warn!(column = %f, "column not present in input");
    }

    let mut rows: Vec<Observation> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let raw_ts = record.get(ts_idx).unwrap_or("");
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| ParseError::InvalidTimestamp {
            line,
            value: raw_ts.to_string(),
        })?;

        let mut obs = Observation::new(timestamp);
        for &(idx, field) in &known {
            let raw = record.get(idx).unwrap_or("");
            let value = parse_f64_cell(raw).map_err(|_| ParseError::InvalidNumber {
                line,
                column: field.column_name().to_string(),
                value: raw.to_string(),
            })?;
            obs.set(field, value);
        }
        rows.push(obs);
    }

    let table = ObservationTable::new(rows, columns);
    let report = LoadReport {
        total_rows: table.len(),
        missing_columns,
        first_date: table.rows().first().map(|r| r.timestamp.date_naive()),
        last_date: table.rows().last().map(|r| r.timestamp.date_naive()),
    };
    debug!(columns = table.columns().len(), "known columns parsed");
    info!(
        rows = report.total_rows,
        first = ?report.first_date,
        last = ?report.last_date,
        "observations loaded"
    );
    Ok((table, report))
}
