use log::{info, warn};

use crate::aggregate::aggregate;
use crate::classify::classify;
use crate::config::AttributionConfig;
use crate::error::AttributionError;
use crate::evidence::{compute_summary, fee_index_warnings, negative_markup, shared_fee_warnings};
use crate::matcher::match_transactions;
use crate::model::{AttributionInput, AttributionReport, MatchResult, ReportMeta};
use crate::normalize::{build_fee_index, normalize_transactions};
use crate::rules::{apply_region_rules, RuleTable};

/// Run the full attribution pipeline. Returns grouped totals, summary and warnings.
pub fn run(config: &AttributionConfig, input: &AttributionInput) -> Result<AttributionReport, AttributionError> {
    config.validate()?;

    let transactions = normalize_transactions(&input.ledger, &config.ledger, &config.regions)?;
    let index = build_fee_index(&input.fees, &config.fees.columns)?;
    info!("{} transactions, {} fee records", transactions.len(), index.len());

    let matched = match_transactions(transactions, &index, &config.matching)?;

    let mut warnings = fee_index_warnings(&index);
    warnings.extend(shared_fee_warnings(&matched.shared));

    let rules = RuleTable::new(config.region_rules.clone());
    let mut classified = Vec::with_capacity(matched.matched_count());
    for result in &matched.results {
        let MatchResult::Matched { transaction, fee, .. } = result else {
            continue;
        };
        let classification = classify(transaction, fee);
        warnings.extend(classification.warnings);
        let adjusted = apply_region_rules(&rules, &transaction.region, classification.fee);
        warnings.extend(negative_markup(transaction, &adjusted));
        classified.push((transaction.clone(), adjusted));
    }

    for warning in &warnings {
        warn!("{warning}");
    }

    let groups = aggregate(classified, config.tolerance.reconciliation)?;
    let summary = compute_summary(&matched, warnings.len());
    info!(
        "processed {} of {} transactions into {} groups ({} warnings)",
        summary.total_processed,
        summary.total_transactions,
        groups.len(),
        summary.warning_count
    );

    Ok(AttributionReport {
        meta: ReportMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        groups,
        warnings,
    })
}
