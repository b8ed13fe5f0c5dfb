use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::config::{MatchConfig, SharedFeePolicy};
use crate::error::AttributionError;
use crate::model::{
    FeeIndex, MatchOutput, MatchResult, ReasonCode, SharedFeeRecord, Transaction,
    TransactionStatus,
};

/// Exclusion reason for a transaction, checked before any fee lookup.
/// First match wins: declined, refund, then the gross amount.
fn exclusion(txn: &Transaction) -> Option<ReasonCode> {
    match txn.status {
        TransactionStatus::Declined => return Some(ReasonCode::Declined),
        TransactionStatus::Refunded => return Some(ReasonCode::Refund),
        TransactionStatus::Captured | TransactionStatus::Other(_) => {}
    }
    match txn.gross_amount {
        None => Some(ReasonCode::InvalidAmount),
        Some(amount) if amount == 0.0 => Some(ReasonCode::ZeroAmount),
        Some(_) => None,
    }
}

/// Join every transaction to at most one fee record.
///
/// Produces exactly one [`MatchResult`] per input transaction, in input order.
/// Identifier slots are tried in priority order; the first slot with a fee
/// record wins.
pub fn match_transactions(
    transactions: Vec<Transaction>,
    fees: &FeeIndex,
    config: &MatchConfig,
) -> Result<MatchOutput, AttributionError> {
    let mut results = Vec::with_capacity(transactions.len());
    let mut skipped: BTreeMap<ReasonCode, usize> = BTreeMap::new();
    // fee identifier → claiming transactions, in claim order
    let mut claims: HashMap<String, Vec<String>> = HashMap::new();

    for transaction in transactions {
        if let Some(reason) = exclusion(&transaction) {
            debug!("row {}: skipped ({reason})", transaction.row);
            *skipped.entry(reason).or_insert(0) += 1;
            results.push(MatchResult::Skipped { transaction, reason });
            continue;
        }

        let hit = transaction
            .ids
            .in_priority_order()
            .find_map(|(field, id)| fees.get(id).map(|fee| (field, fee)));

        match hit {
            Some((via, fee)) => {
                claims
                    .entry(fee.identifier.clone())
                    .or_default()
                    .push(transaction.ids.display_id());
                let fee = fee.clone();
                results.push(MatchResult::Matched { transaction, fee, via });
            }
            None => {
                debug!("row {}: no fee record for '{}'", transaction.row, transaction.ids.display_id());
                *skipped.entry(ReasonCode::MissingFeeData).or_insert(0) += 1;
                results.push(MatchResult::Skipped {
                    transaction,
                    reason: ReasonCode::MissingFeeData,
                });
            }
        }
    }

    let mut shared: Vec<SharedFeeRecord> = claims
        .into_iter()
        .filter(|(_, txns)| txns.len() > 1)
        .map(|(identifier, transactions)| SharedFeeRecord { identifier, transactions })
        .collect();
    shared.sort_by(|a, b| a.identifier.cmp(&b.identifier));

    if config.shared_fee_policy == SharedFeePolicy::Reject {
        if let Some(first) = shared.first() {
            return Err(AttributionError::SharedFeeRecord {
                identifier: first.identifier.clone(),
                transactions: first.transactions.clone(),
            });
        }
    }

    Ok(MatchOutput { results, skipped, shared })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FeeRecord, IdentifierField, Identifiers, Money};

    fn txn(row: usize, id: &str, status: TransactionStatus, amount: Option<f64>) -> Transaction {
        let mut ids = Identifiers::default();
        if !id.is_empty() {
            ids.set(IdentifierField::PrimaryTransactionId, id.into());
        }
        Transaction {
            row,
            ids,
            region: "HK".into(),
            card_type: "VISA".into(),
            status,
            gross_amount: amount,
            currency: "HKD".into(),
        }
    }

    fn fee(id: &str, mdr: f64) -> FeeRecord {
        FeeRecord {
            identifier: id.into(),
            mdr: Money::new(mdr, "HKD"),
            interchange: Money::new(0.0, "HKD"),
            scheme_fee: Money::new(0.0, "HKD"),
            itemized: BTreeMap::new(),
        }
    }

    fn index(records: Vec<FeeRecord>) -> FeeIndex {
        let mut idx = FeeIndex::default();
        for r in records {
            idx.insert(r);
        }
        idx
    }

    #[test]
    fn every_transaction_gets_one_result() {
        let fees = index(vec![fee("t1", 3.0)]);
        let txns = vec![
            txn(1, "t1", TransactionStatus::Captured, Some(100.0)),
            txn(2, "t2", TransactionStatus::Declined, Some(100.0)),
            txn(3, "t3", TransactionStatus::Refunded, Some(100.0)),
            txn(4, "t4", TransactionStatus::Captured, Some(0.0)),
            txn(5, "t5", TransactionStatus::Captured, None),
            txn(6, "t6", TransactionStatus::Captured, Some(50.0)),
        ];
        let out = match_transactions(txns, &fees, &MatchConfig::default()).unwrap();
        assert_eq!(out.results.len(), 6);
        assert_eq!(out.matched_count(), 1);
        assert_eq!(out.skipped_count(), 5);
        for reason in [
            ReasonCode::Declined,
            ReasonCode::Refund,
            ReasonCode::ZeroAmount,
            ReasonCode::InvalidAmount,
            ReasonCode::MissingFeeData,
        ] {
            assert_eq!(out.skipped[&reason], 1, "{reason}");
        }
        let rows: Vec<usize> = out.results.iter().map(|r| r.transaction().row).collect();
        assert_eq!(rows, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn declined_outranks_bad_amount_and_missing_fee() {
        let fees = index(vec![]);
        let out = match_transactions(
            vec![txn(1, "x", TransactionStatus::Declined, None)],
            &fees,
            &MatchConfig::default(),
        )
        .unwrap();
        assert_eq!(out.results[0].reason(), Some(ReasonCode::Declined));
    }

    #[test]
    fn falls_through_identifier_priority() {
        let fees = index(vec![fee("gw-9", 1.0)]);
        let mut t = txn(1, "t1", TransactionStatus::Captured, Some(10.0));
        t.ids.set(IdentifierField::GatewayReference, "gw-9".into());
        let out = match_transactions(vec![t], &fees, &MatchConfig::default()).unwrap();
        match &out.results[0] {
            MatchResult::Matched { fee, via, .. } => {
                assert_eq!(fee.identifier, "gw-9");
                assert_eq!(*via, IdentifierField::GatewayReference);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn primary_id_preferred_over_later_slots() {
        let fees = index(vec![fee("t1", 1.0), fee("g1", 2.0)]);
        let mut t = txn(1, "t1", TransactionStatus::Captured, Some(10.0));
        t.ids.set(IdentifierField::GatewayId, "g1".into());
        let out = match_transactions(vec![t], &fees, &MatchConfig::default()).unwrap();
        let MatchResult::Matched { fee, .. } = &out.results[0] else {
            panic!("expected match");
        };
        assert_eq!(fee.mdr.amount, 1.0);
    }

    #[test]
    fn transaction_without_identifiers_is_missing_fee_data() {
        let fees = index(vec![fee("t1", 1.0)]);
        let out = match_transactions(
            vec![txn(1, "", TransactionStatus::Captured, Some(10.0))],
            &fees,
            &MatchConfig::default(),
        )
        .unwrap();
        assert_eq!(out.results[0].reason(), Some(ReasonCode::MissingFeeData));
    }

    #[test]
    fn shared_fee_record_summed_and_reported() {
        let fees = index(vec![fee("t1", 1.0)]);
        let txns = vec![
            txn(1, "t1", TransactionStatus::Captured, Some(10.0)),
            txn(2, "t1", TransactionStatus::Captured, Some(20.0)),
        ];
        let out = match_transactions(txns, &fees, &MatchConfig::default()).unwrap();
        assert_eq!(out.matched_count(), 2);
        assert_eq!(out.shared.len(), 1);
        assert_eq!(out.shared[0].identifier, "t1");
        assert_eq!(out.shared[0].transactions, vec!["t1", "t1"]);
    }

    #[test]
    fn shared_fee_record_rejected_by_policy() {
        let fees = index(vec![fee("t1", 1.0)]);
        let txns = vec![
            txn(1, "t1", TransactionStatus::Captured, Some(10.0)),
            txn(2, "t1", TransactionStatus::Captured, Some(20.0)),
        ];
        let config = MatchConfig { shared_fee_policy: SharedFeePolicy::Reject };
        let err = match_transactions(txns, &fees, &config).unwrap_err();
        assert!(matches!(err, AttributionError::SharedFeeRecord { ref identifier, .. } if identifier == "t1"));
    }
}
