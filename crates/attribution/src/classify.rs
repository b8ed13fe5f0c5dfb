use std::collections::BTreeMap;

use crate::category::FeeCategory;
use crate::model::{ClassifiedFee, FeeRecord, Money, Transaction, Warning};

/// A classified fee plus the consistency findings raised while reading it.
#[derive(Debug, Clone)]
pub struct Classification {
    pub fee: ClassifiedFee,
    pub warnings: Vec<Warning>,
}

/// Map a matched fee record onto the fixed taxonomy.
///
/// The record's currency is its MDR currency (the transaction currency when
/// the MDR currency is blank). Any non-zero component reported in another
/// currency raises `CurrencyMismatch`; its amount is still attributed as-is.
pub fn classify(transaction: &Transaction, record: &FeeRecord) -> Classification {
    let currency = if record.mdr.currency.is_empty() {
        transaction.currency.clone()
    } else {
        record.mdr.currency.clone()
    };
    let txn_id = transaction.ids.display_id();
    let mut warnings = Vec::new();

    if !transaction.currency.is_empty() && currency != transaction.currency {
        warnings.push(Warning::CurrencyMismatch {
            transaction_id: txn_id.clone(),
            field: "mdr".into(),
            expected: transaction.currency.clone(),
            found: currency.clone(),
        });
    }

    let mut check = |field: &str, money: &Money| {
        if money.amount != 0.0 && !money.currency.is_empty() && money.currency != currency {
            warnings.push(Warning::CurrencyMismatch {
                transaction_id: txn_id.clone(),
                field: field.to_string(),
                expected: currency.clone(),
                found: money.currency.clone(),
            });
        }
    };

    check(FeeCategory::Interchange.as_str(), &record.interchange);
    check(FeeCategory::Scheme.as_str(), &record.scheme_fee);

    let mut itemized = BTreeMap::new();
    for (category, money) in &record.itemized {
        check(category.as_str(), money);
        itemized.insert(*category, money.amount);
    }

    let fee = ClassifiedFee::new(
        currency,
        record.mdr.amount,
        record.interchange.amount,
        record.scheme_fee.amount,
        &itemized,
    );

    Classification { fee, warnings }
}
