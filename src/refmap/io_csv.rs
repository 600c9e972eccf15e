// Primitives for reading CSV files.

use std::fs::File;

use snafu::prelude::*;

use crate::refmap::{io_common::RawTable, *};

/// Reads a whole CSV file as text. The first row is the header.
pub fn read_csv_table(path: &str, delimiter: u8) -> RefmapResult<RawTable> {
    let (header, records) = get_records(path, delimiter)?;

    let mut rows: Vec<(usize, Vec<String>)> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let line = line_r.context(CsvLineParseSnafu { path })?;
        // Quoted fields may span several lines. The header is on line 1.
        let lineno = line
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);
        let row: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        rows.push((lineno, row));
    }
    debug!("read_csv_table: {}: {} rows, header {:?}", path, rows.len(), header);
    Ok(RawTable {
        path: path.to_string(),
        header,
        rows,
    })
}

fn get_records(
    path: &str,
    delimiter: u8,
) -> RefmapResult<(Vec<String>, csv::StringRecordsIntoIter<File>)> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let header: Vec<String> = rdr
        .headers()
        .context(CsvLineParseSnafu { path })?
        .iter()
        .map(|s| s.trim_start_matches('\u{feff}').to_string())
        .collect();
    Ok((header, rdr.into_records()))
}
