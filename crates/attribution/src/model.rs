use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::category::FeeCategory;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A header row plus string cells, as handed over by a loader.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Position of `name` among the headers. Whitespace-trimmed, ASCII case-insensitive.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
    }
}

/// The two pre-loaded sources for one run.
pub struct AttributionInput {
    pub ledger: RawTable,
    pub fees: RawTable,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Identifier slots on a ledger row, in matching priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierField {
    PrimaryTransactionId,
    SecondaryTransactionId,
    GatewayId,
    GatewayReference,
}

impl IdentifierField {
    pub const PRIORITY: [IdentifierField; 4] = [
        Self::PrimaryTransactionId,
        Self::SecondaryTransactionId,
        Self::GatewayId,
        Self::GatewayReference,
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identifiers {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub gateway_id: Option<String>,
    pub gateway_reference: Option<String>,
}

impl Identifiers {
    pub fn get(&self, field: IdentifierField) -> Option<&str> {
        let slot = match field {
            IdentifierField::PrimaryTransactionId => &self.primary,
            IdentifierField::SecondaryTransactionId => &self.secondary,
            IdentifierField::GatewayId => &self.gateway_id,
            IdentifierField::GatewayReference => &self.gateway_reference,
        };
        slot.as_deref()
    }

    pub fn set(&mut self, field: IdentifierField, value: String) {
        let slot = match field {
            IdentifierField::PrimaryTransactionId => &mut self.primary,
            IdentifierField::SecondaryTransactionId => &mut self.secondary,
            IdentifierField::GatewayId => &mut self.gateway_id,
            IdentifierField::GatewayReference => &mut self.gateway_reference,
        };
        *slot = Some(value);
    }

    pub fn in_priority_order(&self) -> impl Iterator<Item = (IdentifierField, &str)> + '_ {
        IdentifierField::PRIORITY
            .into_iter()
            .filter_map(move |f| self.get(f).map(|v| (f, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.in_priority_order().next().is_none()
    }

    /// Label used in warnings and logs.
    pub fn display_id(&self) -> String {
        self.in_priority_order()
            .next()
            .map(|(_, v)| v.to_string())
            .unwrap_or_else(|| "N/A".into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Captured,
    Declined,
    Refunded,
    Other(String),
}

/// One ledger row.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// 1-based data row in the source table.
    pub row: usize,
    pub ids: Identifiers,
    pub region: String,
    pub card_type: String,
    pub status: TransactionStatus,
    /// `None` when the cell held something non-numeric.
    pub gross_amount: Option<f64>,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Money {
    pub amount: f64,
    pub currency: String,
}

impl Money {
    pub fn new(amount: f64, currency: impl Into<String>) -> Self {
        Self { amount, currency: currency.into() }
    }
}

/// One fee-export row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeRecord {
    pub identifier: String,
    pub mdr: Money,
    pub interchange: Money,
    pub scheme_fee: Money,
    /// Only categories the source reported. Missing entries read as zero.
    pub itemized: BTreeMap<FeeCategory, Money>,
}

impl FeeRecord {
    pub fn itemized_amount(&self, category: FeeCategory) -> f64 {
        self.itemized.get(&category).map(|m| m.amount).unwrap_or(0.0)
    }
}

/// Fee records keyed by identifier. First-seen record wins.
#[derive(Debug, Default)]
pub struct FeeIndex {
    records: HashMap<String, FeeRecord>,
    /// Identifiers seen more than once, with the number of ignored duplicates.
    pub duplicates: BTreeMap<String, usize>,
    pub rows_without_id: usize,
}

impl FeeIndex {
    /// Insert unless the identifier is already present. Returns whether it was inserted.
    pub fn insert(&mut self, record: FeeRecord) -> bool {
        if self.records.contains_key(&record.identifier) {
            *self.duplicates.entry(record.identifier).or_insert(0) += 1;
            return false;
        }
        self.records.insert(record.identifier.clone(), record);
        true
    }

    pub fn get(&self, identifier: &str) -> Option<&FeeRecord> {
        self.records.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    Declined,
    Refund,
    ZeroAmount,
    InvalidAmount,
    MissingFeeData,
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Declined => write!(f, "declined"),
            Self::Refund => write!(f, "refund"),
            Self::ZeroAmount => write!(f, "zero_amount"),
            Self::InvalidAmount => write!(f, "invalid_amount"),
            Self::MissingFeeData => write!(f, "missing_fee_data"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum MatchResult {
    Matched {
        transaction: Transaction,
        fee: FeeRecord,
        via: IdentifierField,
    },
    Skipped {
        transaction: Transaction,
        reason: ReasonCode,
    },
}

impl MatchResult {
    pub fn transaction(&self) -> &Transaction {
        match self {
            Self::Matched { transaction, .. } | Self::Skipped { transaction, .. } => transaction,
        }
    }

    pub fn reason(&self) -> Option<ReasonCode> {
        match self {
            Self::Matched { .. } => None,
            Self::Skipped { reason, .. } => Some(*reason),
        }
    }
}

/// A fee record claimed by more than one transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedFeeRecord {
    pub identifier: String,
    pub transactions: Vec<String>,
}

#[derive(Debug)]
pub struct MatchOutput {
    pub results: Vec<MatchResult>,
    pub skipped: BTreeMap<ReasonCode, usize>,
    pub shared: Vec<SharedFeeRecord>,
}

impl MatchOutput {
    pub fn matched_count(&self) -> usize {
        self.results.len() - self.skipped_count()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.values().sum()
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Fee structure of one matched transaction.
///
/// Only constructible through [`ClassifiedFee::new`], which derives the 2nd
/// Plus and the net acquirer markup, so the residual can never drift from the
/// figures it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedFee {
    currency: String,
    mdr: f64,
    interchange: f64,
    scheme_fee: f64,
    second_plus: f64,
    itemized: BTreeMap<FeeCategory, f64>,
    net_acquirer_markup: f64,
    waived_scheme_fee: f64,
}

impl ClassifiedFee {
    /// Build from raw figures. Every itemized category is present in the
    /// result; categories missing from `itemized` are zero.
    pub fn new(
        currency: impl Into<String>,
        mdr: f64,
        interchange: f64,
        scheme_fee: f64,
        itemized: &BTreeMap<FeeCategory, f64>,
    ) -> Self {
        let itemized: BTreeMap<FeeCategory, f64> = FeeCategory::ITEMIZED
            .iter()
            .map(|c| (*c, itemized.get(c).copied().unwrap_or(0.0)))
            .collect();
        let second_plus = mdr - interchange - scheme_fee;
        let known: f64 = itemized.values().sum();
        Self {
            currency: currency.into(),
            mdr,
            interchange,
            scheme_fee,
            second_plus,
            itemized,
            net_acquirer_markup: second_plus - known,
            waived_scheme_fee: 0.0,
        }
    }

    /// Same fee with the scheme fee removed from the MDR structure.
    /// 2nd Plus and the residual are re-derived; the removed amount is kept
    /// only in [`ClassifiedFee::waived_scheme_fee`].
    pub fn without_scheme_fee(&self) -> Self {
        let mut waived = Self::new(
            self.currency.clone(),
            self.mdr,
            self.interchange,
            0.0,
            &self.itemized,
        );
        waived.waived_scheme_fee = self.waived_scheme_fee + self.scheme_fee;
        waived
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn mdr(&self) -> f64 {
        self.mdr
    }

    pub fn interchange(&self) -> f64 {
        self.interchange
    }

    pub fn scheme_fee(&self) -> f64 {
        self.scheme_fee
    }

    pub fn second_plus(&self) -> f64 {
        self.second_plus
    }

    pub fn net_acquirer_markup(&self) -> f64 {
        self.net_acquirer_markup
    }

    pub fn waived_scheme_fee(&self) -> f64 {
        self.waived_scheme_fee
    }

    pub fn itemized(&self) -> &BTreeMap<FeeCategory, f64> {
        &self.itemized
    }

    /// Amount for any category in the taxonomy.
    pub fn amount(&self, category: FeeCategory) -> f64 {
        match category {
            FeeCategory::Interchange => self.interchange,
            FeeCategory::Scheme => self.scheme_fee,
            FeeCategory::NetAcquirerMarkup => self.net_acquirer_markup,
            other => self.itemized.get(&other).copied().unwrap_or(0.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Non-fatal data-consistency findings. Always reported alongside the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    CurrencyMismatch {
        transaction_id: String,
        field: String,
        expected: String,
        found: String,
    },
    NegativeNetMarkup {
        transaction_id: String,
        region: String,
        card_type: String,
        amount: f64,
    },
    DuplicateFeeRecord {
        identifier: String,
        ignored: usize,
    },
    SharedFeeRecord {
        identifier: String,
        transactions: Vec<String>,
    },
    FeeRowsWithoutIdentifier {
        count: usize,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CurrencyMismatch { transaction_id, field, expected, found } => write!(
                f,
                "transaction '{transaction_id}': {field} currency {found} differs from {expected}"
            ),
            Self::NegativeNetMarkup { transaction_id, region, card_type, amount } => write!(
                f,
                "transaction '{transaction_id}' ({region}/{card_type}): net acquirer markup is negative ({amount:.4})"
            ),
            Self::DuplicateFeeRecord { identifier, ignored } => write!(
                f,
                "fee record '{identifier}' appears more than once; {ignored} duplicate(s) ignored"
            ),
            Self::SharedFeeRecord { identifier, transactions } => write!(
                f,
                "fee record '{identifier}' is attributed to {} transactions ({})",
                transactions.len(),
                transactions.join(", ")
            ),
            Self::FeeRowsWithoutIdentifier { count } => {
                write!(f, "{count} fee row(s) have no identifier and were ignored")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Aggregation bucket. Ordering (region, then card type) is the emission order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey {
    pub region: String,
    pub card_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CategoryTotal {
    pub total: f64,
    pub avg_pct: f64,
}

impl CategoryTotal {
    pub fn of(total: f64, volume: f64) -> Self {
        let avg_pct = if volume != 0.0 { total / volume * 100.0 } else { 0.0 };
        Self { total, avg_pct }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryLine {
    pub category: FeeCategory,
    pub total: f64,
    pub avg_pct: f64,
}

/// One row of the final report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRecord {
    pub region: String,
    pub card_type: String,
    pub transaction_count: usize,
    pub total_volume: f64,
    pub currency: String,
    pub interchange: CategoryTotal,
    pub first_plus: CategoryTotal,
    pub second_plus: CategoryTotal,
    pub mdr: CategoryTotal,
    /// The twelve itemized 2nd-Plus categories, then the net acquirer markup.
    pub breakdown: Vec<CategoryLine>,
    pub tax_total: CategoryTotal,
    pub negative_markup_count: usize,
}

impl AggregateRecord {
    pub fn key(&self) -> GroupKey {
        GroupKey {
            region: self.region.clone(),
            card_type: self.card_type.clone(),
        }
    }

    pub fn line(&self, category: FeeCategory) -> Option<&CategoryLine> {
        self.breakdown.iter().find(|l| l.category == category)
    }

    /// Total for any category in the taxonomy.
    pub fn total(&self, category: FeeCategory) -> f64 {
        match category {
            FeeCategory::Interchange => self.interchange.total,
            FeeCategory::Scheme => self.first_plus.total,
            other => self.line(other).map(|l| l.total).unwrap_or(0.0),
        }
    }

    pub fn net_acquirer_markup(&self) -> f64 {
        self.total(FeeCategory::NetAcquirerMarkup)
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_transactions: usize,
    pub total_processed: usize,
    pub total_skipped: usize,
    pub skipped_by_reason: BTreeMap<ReasonCode, usize>,
    pub warning_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttributionReport {
    pub meta: ReportMeta,
    pub summary: Summary,
    pub groups: Vec<AggregateRecord>,
    pub warnings: Vec<Warning>,
}
