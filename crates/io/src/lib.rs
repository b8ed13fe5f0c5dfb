// File I/O: ledger/fee readers and report writers (CSV, JSON, HTML)

pub mod csv;
pub mod export;
pub mod html;
pub mod json;
pub mod money;
pub mod table;
pub mod xlsx;

use std::path::Path;

use icpp_attribution::RawTable;

/// Extensions routed to the spreadsheet reader. Anything else is read as delimited text.
pub const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xls", "xlsb", "ods"];

pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SPREADSHEET_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(e)))
}

/// Load a table from CSV/TSV or a spreadsheet, chosen by file extension.
pub fn load_table(path: &Path, header_markers: &[String]) -> Result<RawTable, String> {
    if is_spreadsheet(path) {
        self::xlsx::import(path, header_markers)
    } else {
        self::csv::import(path, header_markers)
    }
}
