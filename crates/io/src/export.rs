// Flat CSV export of aggregated groups

use std::io::Write;
use std::path::Path;

use icpp_attribution::{AggregateRecord, FeeCategory};

/// Column header of the flat export, in order.
pub fn export_header() -> Vec<&'static str> {
    let mut header = vec![
        "Region",
        "CardType",
        "TxnCount",
        "TotalVolume",
        "Currency",
        "IC_Total",
        "IC_Avg_Pct",
        "FirstPlus_Total",
        "FirstPlus_Avg_Pct",
        "SecondPlus_Total",
        "SecondPlus_Avg_Pct",
    ];
    header.extend(FeeCategory::ITEMIZED.iter().map(|c| c.export_column()));
    header.push(FeeCategory::NetAcquirerMarkup.export_column());
    header.push("MDR_Total");
    header.push("MDR_Avg_Pct");
    header
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

fn export_row(group: &AggregateRecord) -> Vec<String> {
    let mut row = vec![
        group.region.clone(),
        group.card_type.clone(),
        group.transaction_count.to_string(),
        money(group.total_volume),
        group.currency.clone(),
        money(group.interchange.total),
        money(group.interchange.avg_pct),
        money(group.first_plus.total),
        money(group.first_plus.avg_pct),
        money(group.second_plus.total),
        money(group.second_plus.avg_pct),
    ];
    row.extend(FeeCategory::ITEMIZED.iter().map(|c| money(group.total(*c))));
    row.push(money(group.net_acquirer_markup()));
    row.push(money(group.mdr.total));
    row.push(money(group.mdr.avg_pct));
    row
}

/// Write groups as CSV to any writer, one row per (region, card type).
pub fn write_groups<W: Write>(groups: &[AggregateRecord], out: W) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(export_header()).map_err(|e| e.to_string())?;
    for group in groups {
        writer.write_record(export_row(group)).map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())?;
    Ok(())
}

pub fn export(groups: &[AggregateRecord], path: &Path) -> Result<(), String> {
    let file = std::fs::File::create(path)
        .map_err(|e| format!("cannot create {}: {e}", path.display()))?;
    write_groups(groups, file)?;
    log::info!("wrote {} group(s) to {}", groups.len(), path.display());
    Ok(())
}
