use icpp_attribution::RawTable;

/// Split raw rows into headers and data.
///
/// The header row is the first row with a cell matching one of `markers`
/// (trimmed, ASCII case-insensitive). Rows above it are titles and are dropped.
/// Without a marker hit the first non-blank row is the header.
pub fn into_table(rows: Vec<Vec<String>>, markers: &[String]) -> RawTable {
    let is_marker = |cell: &String| {
        markers
            .iter()
            .any(|m| cell.trim().eq_ignore_ascii_case(m.trim()))
    };
    let header_idx = rows
        .iter()
        .position(|row| row.iter().any(is_marker))
        .or_else(|| rows.iter().position(|row| row.iter().any(|c| !c.trim().is_empty())));

    let Some(header_idx) = header_idx else {
        return RawTable::default();
    };
    if header_idx > 0 {
        log::debug!("header found on row {}, {} title row(s) skipped", header_idx + 1, header_idx);
    }

    let mut rows = rows.into_iter().skip(header_idx);
    let headers: Vec<String> = rows
        .next()
        .map(|h| h.into_iter().map(|c| c.trim().to_string()).collect())
        .unwrap_or_default();
    RawTable::new(headers, rows.collect())
}
