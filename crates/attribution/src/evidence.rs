use crate::model::{
    ClassifiedFee, FeeIndex, MatchOutput, SharedFeeRecord, Summary, Transaction, Warning,
};

/// Compute summary statistics from the match output.
pub fn compute_summary(matched: &MatchOutput, warning_count: usize) -> Summary {
    Summary {
        total_transactions: matched.results.len(),
        total_processed: matched.matched_count(),
        total_skipped: matched.skipped_count(),
        skipped_by_reason: matched.skipped.clone(),
        warning_count,
    }
}

/// Findings about the fee source itself: unkeyed rows, then duplicates by identifier.
pub fn fee_index_warnings(index: &FeeIndex) -> Vec<Warning> {
    let mut warnings = Vec::new();
    if index.rows_without_id > 0 {
        warnings.push(Warning::FeeRowsWithoutIdentifier {
            count: index.rows_without_id,
        });
    }
    warnings.extend(index.duplicates.iter().map(|(identifier, ignored)| {
        Warning::DuplicateFeeRecord {
            identifier: identifier.clone(),
            ignored: *ignored,
        }
    }));
    warnings
}

pub fn shared_fee_warnings(shared: &[SharedFeeRecord]) -> Vec<Warning> {
    shared
        .iter()
        .map(|s| Warning::SharedFeeRecord {
            identifier: s.identifier.clone(),
            transactions: s.transactions.clone(),
        })
        .collect()
}

/// Flag a negative residual. Checked on the fee after region rules.
pub fn negative_markup(transaction: &Transaction, fee: &ClassifiedFee) -> Option<Warning> {
    let amount = fee.net_acquirer_markup();
    (amount < 0.0).then(|| Warning::NegativeNetMarkup {
        transaction_id: transaction.ids.display_id(),
        region: transaction.region.clone(),
        card_type: transaction.card_type.clone(),
        amount,
    })
}
