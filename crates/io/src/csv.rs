// CSV/TSV table import

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use icpp_attribution::RawTable;

use crate::table::into_table;

/// Read a delimited file into a table. The delimiter is sniffed; the header
/// row is the first row containing one of `header_markers`.
pub fn import(path: &Path, header_markers: &[String]) -> Result<RawTable, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content, header_markers);
    import_from_string(&content, delimiter, header_markers)
}

const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];
const SAMPLE_LINES: usize = 20;

fn split_line(line: &str, delimiter: u8) -> Vec<String> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(|r| r.ok())
        .map(|r| r.iter().map(|f| f.trim().to_string()).collect())
        .unwrap_or_default()
}

/// The delimiter that isolates a header marker as its own field wins. Without
/// a marker hit, score each candidate by its most common field count weighted
/// by width, so title rows above the header do not decide.
fn sniff_delimiter(content: &str, header_markers: &[String]) -> u8 {
    let sample: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SAMPLE_LINES)
        .collect();

    let is_marker = |field: &String| header_markers.iter().any(|m| m.trim().eq_ignore_ascii_case(field));
    for delimiter in DELIMITERS {
        let header_hit = sample.iter().any(|line| {
            let fields = split_line(line, delimiter);
            fields.len() > 1 && fields.iter().any(is_marker)
        });
        if header_hit {
            return delimiter;
        }
    }

    let mut best = (b',', 0usize);
    for delimiter in DELIMITERS {
        let mut widths: BTreeMap<usize, usize> = BTreeMap::new();
        for line in &sample {
            *widths.entry(split_line(line, delimiter).len()).or_default() += 1;
        }
        let score = widths
            .iter()
            .filter(|(width, _)| **width > 1)
            .map(|(width, lines)| width * lines)
            .max()
            .unwrap_or(0);
        if score > best.1 {
            best = (delimiter, score);
        }
    }
    best.0
}

/// Read file and convert to UTF-8 if needed (Excel-exported CSVs are often Windows-1252).
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| format!("cannot open {}: {e}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            log::debug!("{} is not UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
}

fn import_from_string(content: &str, delimiter: u8, header_markers: &[String]) -> Result<RawTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| format!("line {}: {e}", line + 1))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(into_table(rows, header_markers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn markers() -> Vec<String> {
        vec!["Transaction ID".to_string()]
    }

    #[test]
    fn delimiter_follows_header_marker() {
        let content = "Export;generated 2026-03-01, UTC\nTransaction ID;MDR Amount\nt1;\"1,234.50\"\n";
        assert_eq!(sniff_delimiter(content, &markers()), b';');

        let tsv = "Transaction ID\tAmount\nt1\t5\n";
        assert_eq!(sniff_delimiter(tsv, &markers()), b'\t');
    }

    #[test]
    fn delimiter_by_field_count_without_marker() {
        let none: Vec<String> = Vec::new();
        assert_eq!(sniff_delimiter("Ref|Fee|Tax\na|1|0\nb|2|0\n", &none), b'|');
        assert_eq!(sniff_delimiter("Ref;Fee\nx;\"1,234.50\"\ny;\"99\"\n", &none), b';');
        assert_eq!(sniff_delimiter("", &none), b',');
    }

    #[test]
    fn title_row_does_not_pick_the_delimiter() {
        // One-field title line followed by a semicolon table
        let content = "March fees\nRef;Fee;Tax\na;1;0\nb;2;0\n";
        assert_eq!(sniff_delimiter(content, &[]), b';');
    }

    #[test]
    fn test_import_skips_title_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fees.csv");
        fs::write(
            &path,
            "Fee report March,,\nTransaction ID,MDR Amount,MDR Currency\nt1,12.50,HKD\n",
        )
        .unwrap();

        let table = import(&path, &markers()).unwrap();
        assert_eq!(table.headers, vec!["Transaction ID", "MDR Amount", "MDR Currency"]);
        assert_eq!(table.rows, vec![vec!["t1", "12.50", "HKD"]]);
    }

    #[test]
    fn test_import_windows_1252() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        // 0xE9 = 'é' in Windows-1252, invalid as UTF-8
        let mut bytes = b"Transaction ID,Merchant\nt1,Caf".to_vec();
        bytes.push(0xE9);
        bytes.push(b'\n');
        fs::write(&path, bytes).unwrap();

        let table = import(&path, &markers()).unwrap();
        assert_eq!(table.rows[0][1], "Café");
    }

    #[test]
    fn test_import_strips_bom() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        fs::write(&path, "\u{feff}Transaction ID,Amount\nt1,5\n").unwrap();

        let table = import(&path, &markers()).unwrap();
        assert_eq!(table.column_index("Transaction ID"), Some(0));
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let err = import(&dir.path().join("nope.csv"), &markers()).unwrap_err();
        assert!(err.contains("cannot open"), "{err}");
    }
}
