// Primitives shared by the table readers.

use std::path::Path;

use snafu::prelude::*;

use crate::refmap::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// A table as read from a file: the header and the rows, all as text.
///
/// Nothing is converted at this point. In particular, codes stay strings.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawTable {
    pub path: String,
    pub header: Vec<String>,
    /// The rows, with their line number in the file (the header is line 1).
    pub rows: Vec<(usize, Vec<String>)>,
}

impl RawTable {
    pub fn column_index(&self, column: &str) -> RefmapResult<usize> {
        self.header
            .iter()
            .position(|h| h.trim() == column)
            .context(MissingColumnSnafu {
                column,
                path: simplify_file_name(&self.path),
            })
    }

    fn cell<'a>(&self, lineno: usize, row: &'a [String], idx: usize) -> RefmapResult<&'a str> {
        let cell = row.get(idx).context(LineTooShortSnafu {
            lineno,
            path: simplify_file_name(&self.path),
        })?;
        Ok(cell.as_str())
    }

    fn count(&self, lineno: usize, row: &[String], idx: usize) -> RefmapResult<u64> {
        let content = self.cell(lineno, row, idx)?;
        parse_count(content).context(ParsingCountSnafu {
            lineno,
            path: simplify_file_name(&self.path),
            column: self.header[idx].clone(),
            content,
        })
    }
}

/// Reads a vote count. Counts are non-negative integers, possibly written
/// with a trailing `.0` by spreadsheet exports.
pub fn parse_count(content: &str) -> Option<u64> {
    let s = content.trim();
    let s = s.strip_suffix(".0").unwrap_or(s);
    s.parse::<u64>().ok()
}

pub fn regions_from_table(table: &RawTable, cfs: &FileSource) -> RefmapResult<Vec<Region>> {
    let code_idx = table.column_index(cfs.code_column())?;
    let name_idx = table.column_index(cfs.name_column())?;
    let mut res: Vec<Region> = Vec::new();
    for (lineno, row) in table.rows.iter() {
        res.push(Region {
            code: table.cell(*lineno, row, code_idx)?.to_string(),
            name: table.cell(*lineno, row, name_idx)?.to_string(),
        });
    }
    debug!("regions_from_table: {} regions", res.len());
    Ok(res)
}

pub fn departments_from_table(table: &RawTable, cfs: &FileSource) -> RefmapResult<Vec<Department>> {
    let code_idx = table.column_index(cfs.code_column())?;
    let region_idx = table.column_index(cfs.region_code_column())?;
    let name_idx = table.column_index(cfs.name_column())?;
    let mut res: Vec<Department> = Vec::new();
    for (lineno, row) in table.rows.iter() {
        res.push(Department {
            code: table.cell(*lineno, row, code_idx)?.to_string(),
            region_code: table.cell(*lineno, row, region_idx)?.to_string(),
            name: table.cell(*lineno, row, name_idx)?.to_string(),
        });
    }
    debug!("departments_from_table: {} departments", res.len());
    Ok(res)
}

pub fn ballots_from_table(table: &RawTable, cfs: &FileSource) -> RefmapResult<Vec<BallotRecord>> {
    let code_idx = table.column_index(cfs.department_code_column())?;
    let registered_idx = table.column_index(cfs.registered_column())?;
    let abstentions_idx = table.column_index(cfs.abstentions_column())?;
    let null_idx = table.column_index(cfs.null_column())?;
    let choice_a_idx = table.column_index(cfs.choice_a_column())?;
    let choice_b_idx = table.column_index(cfs.choice_b_column())?;
    let mut res: Vec<BallotRecord> = Vec::new();
    for (lineno, row) in table.rows.iter() {
        let lineno = *lineno;
        res.push(BallotRecord {
            department_code: table.cell(lineno, row, code_idx)?.to_string(),
            registered: table.count(lineno, row, registered_idx)?,
            abstentions: table.count(lineno, row, abstentions_idx)?,
            null_votes: table.count(lineno, row, null_idx)?,
            choice_a: table.count(lineno, row, choice_a_idx)?,
            choice_b: table.count(lineno, row, choice_b_idx)?,
        });
    }
    debug!("ballots_from_table: {} ballot rows", res.len());
    Ok(res)
}
