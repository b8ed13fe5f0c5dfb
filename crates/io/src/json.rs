// JSON report export

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use icpp_attribution::AttributionReport;

pub fn to_string(report: &AttributionReport) -> Result<String, String> {
    serde_json::to_string_pretty(report).map_err(|e| e.to_string())
}

/// Write the full report (meta, summary, groups, warnings) as pretty JSON.
pub fn export(report: &AttributionReport, path: &Path) -> Result<(), String> {
    let file = File::create(path).map_err(|e| format!("cannot create {}: {e}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report).map_err(|e| e.to_string())
}
