// Excel ledger import (xlsx, xls, xlsb, ods)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use icpp_attribution::RawTable;

use crate::table::into_table;

/// Read the first worksheet into a table. Title rows above the first row
/// carrying one of `header_markers` are skipped.
pub fn import(path: &Path, header_markers: &[String]) -> Result<RawTable, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let Some(first) = sheet_names.first() else {
        return Err("Excel file contains no sheets".to_string());
    };

    let range = workbook
        .worksheet_range(first)
        .map_err(|e| format!("Failed to read sheet '{}': {}", first, e))?;

    // Ranges start at the first used cell; pad so column positions stay stable
    let col_offset = range.start().map(|(_, c)| c as usize).unwrap_or(0);
    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| {
            std::iter::repeat(String::new())
                .take(col_offset)
                .chain(row.iter().map(cell_text))
                .collect()
        })
        .collect();

    log::info!("read {} rows from sheet '{}' of {}", rows.len(), first, path.display());
    Ok(into_table(rows, header_markers))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            // Integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}
