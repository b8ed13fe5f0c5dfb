//! Record normalizer: raw tables with heterogeneous headers → typed records.
//!
//! Header resolution happens here and only here. Every logical field has an
//! ordered list of accepted header names; the first one present in the table
//! is used for every row.

use log::{debug, info};

use crate::category::FeeCategory;
use crate::config::{
    region_code, FeeColumns, LedgerConfig, RegionConfig, StatusConfig, UNKNOWN_CARD_TYPE, UNKNOWN_REGION,
};
use crate::error::AttributionError;
use crate::model::{
    FeeIndex, FeeRecord, IdentifierField, Identifiers, Money, RawTable, Transaction,
    TransactionStatus,
};

const LEDGER: &str = "ledger";
const FEES: &str = "fees";

/// Parse a numeric cell. Accepts surrounding whitespace and thousands
/// separators. Empty or non-numeric cells yield `None`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// First accepted header present in the table.
fn resolve(table: &RawTable, accepted: &[String]) -> Option<usize> {
    accepted.iter().find_map(|name| table.column_index(name))
}

/// All accepted headers present in the table, in priority order.
fn resolve_all(table: &RawTable, accepted: &[String]) -> Vec<usize> {
    let mut found = Vec::new();
    for name in accepted {
        if let Some(idx) = table.column_index(name) {
            if !found.contains(&idx) {
                found.push(idx);
            }
        }
    }
    found
}

fn cell(row: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map(|s| s.trim()).unwrap_or("")
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn missing(source: &str, accepted: &[String]) -> AttributionError {
    AttributionError::MissingColumn {
        source: source.into(),
        column: accepted.join(" | "),
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Turn the ledger table into transactions, one per non-blank row.
pub fn normalize_transactions(
    table: &RawTable,
    ledger: &LedgerConfig,
    regions: &[RegionConfig],
) -> Result<Vec<Transaction>, AttributionError> {
    let col = &ledger.columns;

    let id_columns = [
        (IdentifierField::PrimaryTransactionId, resolve(table, &col.primary_id)),
        (IdentifierField::SecondaryTransactionId, resolve(table, &col.secondary_id)),
        (IdentifierField::GatewayId, resolve(table, &col.gateway_id)),
        (IdentifierField::GatewayReference, resolve(table, &col.gateway_reference)),
    ];
    if id_columns.iter().all(|(_, idx)| idx.is_none()) {
        let accepted: Vec<String> = col.identifier_headers().cloned().collect();
        return Err(missing(LEDGER, &accepted));
    }

    let region_idx = resolve(table, &col.region);
    let merchant_idx = resolve(table, &col.merchant);
    let country_idx = resolve(table, &col.card_country);
    let card_type_idx = resolve(table, &col.card_type);
    let status_idx = resolve(table, &col.status);
    let payment_type_idx = resolve(table, &col.payment_type);
    let amount_idx = resolve(table, &col.amount);
    let currency_idx = resolve(table, &col.currency);

    let mut transactions = Vec::with_capacity(table.rows.len());
    for (i, row) in table.rows.iter().enumerate() {
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let mut ids = Identifiers::default();
        for (field, idx) in id_columns {
            if let Some(value) = non_empty(cell(row, idx)) {
                ids.set(field, value);
            }
        }

        let region = match non_empty(cell(row, region_idx)) {
            Some(explicit) => region_code(&explicit),
            None => identify_region(cell(row, merchant_idx), cell(row, country_idx), regions),
        };

        let card_type = non_empty(cell(row, card_type_idx))
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| UNKNOWN_CARD_TYPE.into());

        // An absent column means "no amount reported", which reads as zero.
        let gross_amount = match amount_idx {
            Some(_) => parse_amount(cell(row, amount_idx)),
            None => Some(0.0),
        };

        let status = derive_status(
            cell(row, status_idx),
            cell(row, payment_type_idx),
            &ledger.status,
        );

        transactions.push(Transaction {
            row: i + 1,
            ids,
            region,
            card_type,
            status,
            gross_amount,
            currency: cell(row, currency_idx).to_ascii_uppercase(),
        });
    }

    info!("normalized {} ledger rows into transactions", transactions.len());
    Ok(transactions)
}

/// Region code from merchant keywords, then card country, else `UNKNOWN`.
pub fn identify_region(merchant: &str, card_country: &str, regions: &[RegionConfig]) -> String {
    for region in regions {
        if region
            .merchant_keywords
            .iter()
            .any(|k| !k.is_empty() && merchant.contains(k.as_str()))
        {
            return region.code.clone();
        }
    }

    let country = card_country.trim();
    if !country.is_empty() {
        for region in regions {
            if region.card_countries.iter().any(|c| c.eq_ignore_ascii_case(country)) {
                return region.code.clone();
            }
        }
    }

    UNKNOWN_REGION.into()
}

/// Collapse processor status and payment type into one state.
/// A declined status outranks a refund marker.
pub fn derive_status(status: &str, payment_type: &str, cfg: &StatusConfig) -> TransactionStatus {
    let status_up = status.trim().to_ascii_uppercase();
    let payment_up = payment_type.trim().to_ascii_uppercase();

    if cfg.declined.iter().any(|d| d.eq_ignore_ascii_case(&status_up)) {
        return TransactionStatus::Declined;
    }

    let has_marker = |value: &str| {
        cfg.refund_markers
            .iter()
            .any(|m| !m.is_empty() && value.contains(&m.to_ascii_uppercase()))
    };
    if has_marker(&payment_up)
        || has_marker(&status_up)
        || cfg.refund_codes.iter().any(|c| c.eq_ignore_ascii_case(&payment_up))
    {
        return TransactionStatus::Refunded;
    }

    if status_up.is_empty() || cfg.captured.iter().any(|c| c.eq_ignore_ascii_case(&status_up)) {
        return TransactionStatus::Captured;
    }

    TransactionStatus::Other(status.trim().to_string())
}

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

/// Index fee rows by identifier. The first row for an identifier wins.
pub fn build_fee_index(table: &RawTable, columns: &FeeColumns) -> Result<FeeIndex, AttributionError> {
    let id_indices = resolve_all(table, &columns.identifier);
    if id_indices.is_empty() {
        return Err(missing(FEES, &columns.identifier));
    }
    let mdr_idx = resolve(table, &columns.mdr_amount)
        .ok_or_else(|| missing(FEES, &columns.mdr_amount))?;
    let ic_idx = resolve(table, &columns.interchange_amount)
        .ok_or_else(|| missing(FEES, &columns.interchange_amount))?;
    let scheme_idx = resolve(table, &columns.scheme_fee_amount)
        .ok_or_else(|| missing(FEES, &columns.scheme_fee_amount))?;

    let mdr_cur_idx = resolve(table, &columns.mdr_currency);
    let ic_cur_idx = resolve(table, &columns.interchange_currency);
    let scheme_cur_idx = resolve(table, &columns.scheme_fee_currency);

    let itemized_columns: Vec<(FeeCategory, Option<usize>, Option<usize>)> = FeeCategory::ITEMIZED
        .iter()
        .map(|&c| {
            let prefix = columns.itemized_prefix(c);
            (
                c,
                table.column_index(&format!("{prefix} Amount")),
                table.column_index(&format!("{prefix} Currency")),
            )
        })
        .collect();

    let money = |row: &[String], amount_idx: usize, currency_idx: Option<usize>| {
        Money::new(
            parse_amount(cell(row, Some(amount_idx))).unwrap_or(0.0),
            cell(row, currency_idx).to_ascii_uppercase(),
        )
    };

    let mut index = FeeIndex::default();
    for row in &table.rows {
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let identifier = id_indices
            .iter()
            .map(|&i| cell(row, Some(i)))
            .find(|v| !v.is_empty());
        let Some(identifier) = identifier else {
            index.rows_without_id += 1;
            continue;
        };

        let mut itemized = std::collections::BTreeMap::new();
        for (category, amount_idx, currency_idx) in &itemized_columns {
            if let Some(amount) = parse_amount(cell(row, *amount_idx)) {
                itemized.insert(
                    *category,
                    Money::new(amount, cell(row, *currency_idx).to_ascii_uppercase()),
                );
            }
        }

        let record = FeeRecord {
            identifier: identifier.to_string(),
            mdr: money(row, mdr_idx, mdr_cur_idx),
            interchange: money(row, ic_idx, ic_cur_idx),
            scheme_fee: money(row, scheme_idx, scheme_cur_idx),
            itemized,
        };
        if !index.insert(record) {
            debug!("duplicate fee record '{identifier}' ignored");
        }
    }

    info!(
        "indexed {} fee records ({} duplicate identifiers, {} rows without identifier)",
        index.len(),
        index.duplicates.len(),
        index.rows_without_id
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AttributionConfig;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn amounts() {
        assert_eq!(parse_amount(" 1,234.50 "), Some(1234.5));
        assert_eq!(parse_amount("-3"), Some(-3.0));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount("NaN"), None);
    }

    #[test]
    fn ledger_rows_become_transactions() {
        let config = AttributionConfig::default();
        let t = table(
            &["Transaction ID", "Gateway UUID", "Merchant", "Card Type", "Processor Status", "Amount", "Currency"],
            &[
                &["t1", "g1", "Acme Hong Kong Ltd", "visa", "CAPTURED", "100.00", "hkd"],
                &["", "g2", "Acme", "", "DECLINED", "abc", "HKD"],
                &["", "", "", "", "", "", ""],
            ],
        );
        let txns = normalize_transactions(&t, &config.ledger, &config.regions).unwrap();
        assert_eq!(txns.len(), 2);

        assert_eq!(txns[0].row, 1);
        assert_eq!(txns[0].ids.primary.as_deref(), Some("t1"));
        assert_eq!(txns[0].ids.gateway_id.as_deref(), Some("g1"));
        assert_eq!(txns[0].region, "HK");
        assert_eq!(txns[0].card_type, "VISA");
        assert_eq!(txns[0].status, TransactionStatus::Captured);
        assert_eq!(txns[0].gross_amount, Some(100.0));
        assert_eq!(txns[0].currency, "HKD");

        assert_eq!(txns[1].ids.primary, None);
        assert_eq!(txns[1].region, UNKNOWN_REGION);
        assert_eq!(txns[1].card_type, UNKNOWN_CARD_TYPE);
        assert_eq!(txns[1].status, TransactionStatus::Declined);
        assert_eq!(txns[1].gross_amount, None);
    }

    #[test]
    fn explicit_region_column_wins() {
        let config = AttributionConfig::default();
        let t = table(&["Transaction ID", "Region", "Merchant"], &[&["t1", "sg", "Malaysia Shop"]]);
        let txns = normalize_transactions(&t, &config.ledger, &config.regions).unwrap();
        assert_eq!(txns[0].region, "SG");
    }

    #[test]
    fn missing_amount_column_reads_as_zero() {
        let config = AttributionConfig::default();
        let t = table(&["Transaction ID"], &[&["t1"]]);
        let txns = normalize_transactions(&t, &config.ledger, &config.regions).unwrap();
        assert_eq!(txns[0].gross_amount, Some(0.0));
    }

    #[test]
    fn ledger_without_identifier_columns_is_fatal() {
        let config = AttributionConfig::default();
        let t = table(&["Amount", "Currency"], &[&["1", "HKD"]]);
        let err = normalize_transactions(&t, &config.ledger, &config.regions).unwrap_err();
        assert!(matches!(err, AttributionError::MissingColumn { ref source, .. } if source == "ledger"));
    }

    #[test]
    fn region_falls_back_to_card_country() {
        let regions = AttributionConfig::default().regions;
        assert_eq!(identify_region("Acme Thailand", "", &regions), "TH");
        assert_eq!(identify_region("Acme", "mys", &regions), "MY");
        assert_eq!(identify_region("Acme", "SGP", &regions), UNKNOWN_REGION);
        // Keyword beats country.
        assert_eq!(identify_region("Malaysia Store", "HKG", &regions), "MY");
    }

    #[test]
    fn status_precedence() {
        let cfg = StatusConfig::default();
        assert_eq!(derive_status("failed", "REFUND", &cfg), TransactionStatus::Declined);
        assert_eq!(derive_status("CAPTURED", "Partial Refund", &cfg), TransactionStatus::Refunded);
        assert_eq!(derive_status("", "RF", &cfg), TransactionStatus::Refunded);
        assert_eq!(derive_status("REFUNDED", "", &cfg), TransactionStatus::Refunded);
        assert_eq!(derive_status("", "SALE", &cfg), TransactionStatus::Captured);
        assert_eq!(derive_status("Pending", "SALE", &cfg), TransactionStatus::Other("Pending".into()));
    }

    #[test]
    fn fee_index_reads_all_columns() {
        let config = AttributionConfig::default();
        let t = table(
            &[
                "NP Transaction ID", "Gateway Reference", "MDR Amount", "MDR Currency",
                "Interchange Amount", "Scheme Fee Bucket Amount", "Gateway Fee Amount",
                "Gateway Fee Currency", "VAT Amount", "ST Amount",
            ],
            &[
                &["t1", "r1", "10", "hkd", "5", "2", "1.5", "HKD", "0.3", "junk"],
                &["", "r2", "4", "HKD", "", "", "", "", "", ""],
                &["", "", "9", "HKD", "1", "1", "", "", "", ""],
                &["t1", "", "99", "HKD", "1", "1", "", "", "", ""],
            ],
        );
        let idx = build_fee_index(&t, &config.fees.columns).unwrap();
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.rows_without_id, 1);
        assert_eq!(idx.duplicates.get("t1"), Some(&1));

        let t1 = idx.get("t1").unwrap();
        assert_eq!(t1.mdr, Money::new(10.0, "HKD"));
        assert_eq!(t1.interchange.amount, 5.0);
        assert_eq!(t1.scheme_fee.amount, 2.0);
        assert_eq!(t1.itemized_amount(FeeCategory::Gateway), 1.5);
        assert_eq!(t1.itemized_amount(FeeCategory::Vat), 0.3);
        assert!(!t1.itemized.contains_key(&FeeCategory::St));
        assert_eq!(t1.itemized_amount(FeeCategory::St), 0.0);

        // Falls through to the gateway reference when the NP id is blank.
        let r2 = idx.get("r2").unwrap();
        assert_eq!(r2.interchange.amount, 0.0);
    }

    #[test]
    fn fee_source_missing_required_column_is_fatal() {
        let config = AttributionConfig::default();
        let t = table(&["Transaction ID", "MDR Amount", "Interchange Amount"], &[]);
        let err = build_fee_index(&t, &config.fees.columns).unwrap_err();
        assert!(err.to_string().contains("Scheme Fee Bucket Amount"));

        let t = table(&["Reference", "MDR Amount"], &[]);
        let err = build_fee_index(&t, &config.fees.columns).unwrap_err();
        assert!(err.to_string().contains("NP Transaction ID"));
    }
}
