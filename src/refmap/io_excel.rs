use calamine::{open_workbook, DataType, Range, Reader, Xlsx};
use snafu::prelude::*;

use crate::refmap::{io_common::RawTable, *};

/// Reads a worksheet as text. The first row is the header.
pub fn read_excel_table(path: &str, cfs: &FileSource) -> RefmapResult<RawTable> {
    let wrange = get_range(path, cfs)?;

    let mut iter = wrange.rows();
    let header: Vec<String> = iter
        .next()
        .context(EmptyExcelSnafu { path })?
        .iter()
        .map(|cell| cell_to_text(cell, 1))
        .collect::<RefmapResult<Vec<String>>>()?;
    debug!("read_excel_table: header: {:?}", header);

    let mut rows: Vec<(usize, Vec<String>)> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let lineno = idx + 2;
        let cells = row
            .iter()
            .map(|cell| cell_to_text(cell, lineno))
            .collect::<RefmapResult<Vec<String>>>()?;
        rows.push((lineno, cells));
    }
    debug!("read_excel_table: {}: {} rows", path, rows.len());
    Ok(RawTable {
        path: path.to_string(),
        header,
        rows,
    })
}

/// The text of a cell.
///
/// Codes typed into a spreadsheet often end up as numbers (`1.0` for `01`).
/// They are written back as integers here, and padded later by the pipeline.
fn cell_to_text(cell: &DataType, lineno: usize) -> RefmapResult<String> {
    match cell {
        DataType::String(s) => Ok(s.trim().to_string()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 && f.is_finite() => Ok(format!("{}", *f as i64)),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Empty => Ok("".to_string()),
        _ => Err(RefmapError::ExcelWrongCellType {
            lineno: lineno as u64,
            content: format!("{:?}", cell),
        }),
    }
}

fn get_range(path: &str, cfs: &FileSource) -> RefmapResult<Range<DataType>> {
    let worksheet_name_o = cfs.excel_worksheet_name.clone();
    debug!(
        "read_excel_table: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => EmptyExcelSnafu { path }.fail(),
            [(worksheet_name, wrange)] => {
                debug!(
                    "read_excel_table: path: {:?} worksheet: {:?}",
                    &path, &worksheet_name
                );
                Ok(wrange.clone())
            }
            _ => AmbiguousWorksheetSnafu { path }.fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_codes_become_integers() {
        assert_eq!(cell_to_text(&DataType::Float(1.0), 2).unwrap(), "1");
        assert_eq!(cell_to_text(&DataType::Int(84), 2).unwrap(), "84");
        assert_eq!(cell_to_text(&DataType::String(" 2A ".to_string()), 2).unwrap(), "2A");
        assert_eq!(cell_to_text(&DataType::Empty, 2).unwrap(), "");
        // Not an integer: kept as is, the count parser will refuse it.
        assert_eq!(cell_to_text(&DataType::Float(1.5), 2).unwrap(), "1.5");
    }

    #[test]
    fn unexpected_cells_are_errors() {
        let res = cell_to_text(&DataType::Bool(true), 7);
        assert!(matches!(
            res,
            Err(RefmapError::ExcelWrongCellType { lineno: 7, .. })
        ));
    }

    #[test]
    fn missing_workbook() {
        let cfs = FileSource::new("xlsx", "/no/such/book.xlsx");
        let res = read_excel_table("/no/such/book.xlsx", &cfs);
        assert!(matches!(res, Err(RefmapError::OpeningExcel { .. })));
    }
}
