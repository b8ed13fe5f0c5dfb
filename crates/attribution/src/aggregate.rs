use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::category::FeeCategory;
use crate::error::AttributionError;
use crate::model::{
    AggregateRecord, CategoryLine, CategoryTotal, ClassifiedFee, GroupKey, Transaction,
};

// Column layout of one contribution row.
const VOLUME: usize = 0;
const IC: usize = 1;
const SCHEME: usize = 2;
const SECOND_PLUS: usize = 3;
const MDR: usize = 4;
const ITEMIZED_START: usize = 5;
const MARKUP: usize = ITEMIZED_START + FeeCategory::ITEMIZED.len();
const WIDTH: usize = MARKUP + 1;

type Row = [f64; WIDTH];

fn row_of(transaction: &Transaction, fee: &ClassifiedFee) -> Row {
    let mut row = [0.0; WIDTH];
    row[VOLUME] = transaction.gross_amount.unwrap_or(0.0);
    row[IC] = fee.interchange();
    row[SCHEME] = fee.scheme_fee();
    row[SECOND_PLUS] = fee.second_plus();
    row[MDR] = fee.mdr();
    for (i, category) in FeeCategory::ITEMIZED.iter().enumerate() {
        row[ITEMIZED_START + i] = fee.amount(*category);
    }
    row[MARKUP] = fee.net_acquirer_markup();
    row
}

#[derive(Default)]
struct Bucket {
    rows: Vec<Row>,
    currencies: BTreeSet<String>,
    negative_markups: usize,
}

/// Sum contribution rows in a canonical order so the result does not depend
/// on input order (float addition is not associative).
fn sum_rows(mut rows: Vec<Row>) -> Row {
    rows.sort_by(|a, b| {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| x.total_cmp(y))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    rows.iter().fold([0.0; WIDTH], |mut acc, row| {
        for (total, value) in acc.iter_mut().zip(row.iter()) {
            *total += value;
        }
        acc
    })
}

/// Group classified transactions by (region, card type) and sum every figure.
///
/// Percentages are computed once on the group sums. Groups are emitted in
/// (region, card type) order. Fails on a group spanning several currencies,
/// or on a group that does not reconcile within `tolerance`.
pub fn aggregate(
    classified: Vec<(Transaction, ClassifiedFee)>,
    tolerance: f64,
) -> Result<Vec<AggregateRecord>, AttributionError> {
    let mut buckets: BTreeMap<GroupKey, Bucket> = BTreeMap::new();

    for (transaction, fee) in &classified {
        let key = GroupKey {
            region: transaction.region.clone(),
            card_type: transaction.card_type.clone(),
        };
        let bucket = buckets.entry(key).or_default();
        let currency = if transaction.currency.is_empty() {
            fee.currency()
        } else {
            transaction.currency.as_str()
        };
        bucket.currencies.insert(currency.to_string());
        if fee.net_acquirer_markup() < 0.0 {
            bucket.negative_markups += 1;
        }
        bucket.rows.push(row_of(transaction, fee));
    }

    let mut records = Vec::with_capacity(buckets.len());
    for (key, bucket) in buckets {
        if bucket.currencies.len() > 1 {
            return Err(AttributionError::MixedCurrencyInGroup {
                region: key.region,
                card_type: key.card_type,
                currencies: bucket.currencies.into_iter().collect(),
            });
        }
        let currency = bucket.currencies.into_iter().next().unwrap_or_default();
        let count = bucket.rows.len();
        let sums = sum_rows(bucket.rows);
        let volume = sums[VOLUME];

        let mut breakdown: Vec<CategoryLine> = FeeCategory::ITEMIZED
            .iter()
            .enumerate()
            .map(|(i, category)| line(*category, sums[ITEMIZED_START + i], volume))
            .collect();
        breakdown.push(line(FeeCategory::NetAcquirerMarkup, sums[MARKUP], volume));

        let tax_total: f64 = breakdown
            .iter()
            .filter(|l| l.category.is_tax())
            .map(|l| l.total)
            .sum();

        let record = AggregateRecord {
            region: key.region,
            card_type: key.card_type,
            transaction_count: count,
            total_volume: volume,
            currency,
            interchange: CategoryTotal::of(sums[IC], volume),
            first_plus: CategoryTotal::of(sums[SCHEME], volume),
            second_plus: CategoryTotal::of(sums[SECOND_PLUS], volume),
            mdr: CategoryTotal::of(sums[MDR], volume),
            breakdown,
            tax_total: CategoryTotal::of(tax_total, volume),
            negative_markup_count: bucket.negative_markups,
        };
        check_reconciliation(&record, tolerance)?;
        debug!(
            "group {}/{}: {} transactions, volume {:.2} {}",
            record.region, record.card_type, record.transaction_count, record.total_volume, record.currency
        );
        records.push(record);
    }

    Ok(records)
}

fn line(category: FeeCategory, total: f64, volume: f64) -> CategoryLine {
    let t = CategoryTotal::of(total, volume);
    CategoryLine {
        category,
        total: t.total,
        avg_pct: t.avg_pct,
    }
}

/// `IC + 1st Plus + 2nd Plus == MDR` and `2nd Plus == Σ sub-categories + markup`.
pub fn check_reconciliation(record: &AggregateRecord, tolerance: f64) -> Result<(), AttributionError> {
    let fail = |detail: String| AttributionError::ReconciliationFailed {
        region: record.region.clone(),
        card_type: record.card_type.clone(),
        detail,
    };

    let totals = [
        ("volume", record.total_volume),
        ("IC", record.interchange.total),
        ("1st Plus", record.first_plus.total),
        ("2nd Plus", record.second_plus.total),
        ("MDR", record.mdr.total),
    ];
    let lines = record.breakdown.iter().map(|l| (l.category.as_str(), l.total));
    if let Some((name, value)) = totals.into_iter().chain(lines).find(|(_, v)| !v.is_finite()) {
        return Err(fail(format!("{name} total is not finite ({value})")));
    }

    let layers = record.interchange.total + record.first_plus.total + record.second_plus.total;
    if (layers - record.mdr.total).abs() > tolerance {
        return Err(fail(format!(
            "IC + 1st Plus + 2nd Plus = {layers:.4}, MDR = {:.4}",
            record.mdr.total
        )));
    }

    let parts: f64 = record.breakdown.iter().map(|l| l.total).sum();
    if (parts - record.second_plus.total).abs() > tolerance {
        return Err(fail(format!(
            "2nd Plus breakdown = {parts:.4}, 2nd Plus = {:.4}",
            record.second_plus.total
        )));
    }

    Ok(())
}
