use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

use crate::category::FeeCategory;
use crate::error::AttributionError;

/// Region code for rows no region entry claims.
pub const UNKNOWN_REGION: &str = "UNKNOWN";

/// Card type for rows without one.
pub const UNKNOWN_CARD_TYPE: &str = "UNKNOWN";

/// Canonical form of a region code: trimmed, ASCII upper-case.
pub fn region_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration. Every section has defaults, so an empty TOML document
/// describes the standard HK/MY/TH merchant-funding export.
#[derive(Debug, Clone, Deserialize)]
pub struct AttributionConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default = "default_regions")]
    pub regions: Vec<RegionConfig>,
    #[serde(default = "default_region_rules")]
    pub region_rules: BTreeMap<String, Vec<RegionRule>>,
    #[serde(default)]
    pub matching: MatchConfig,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
}

fn default_name() -> String {
    "IC++ breakdown".into()
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            ledger: LedgerConfig::default(),
            fees: FeeConfig::default(),
            regions: default_regions(),
            region_rules: default_region_rules(),
            matching: MatchConfig::default(),
            tolerance: ToleranceConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub columns: LedgerColumns,
    #[serde(default)]
    pub status: StatusConfig,
}

/// Accepted header names per logical ledger field, first match wins.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerColumns {
    #[serde(default = "default_primary_id")]
    pub primary_id: Vec<String>,
    #[serde(default = "default_secondary_id")]
    pub secondary_id: Vec<String>,
    #[serde(default = "default_gateway_id")]
    pub gateway_id: Vec<String>,
    #[serde(default = "default_gateway_reference")]
    pub gateway_reference: Vec<String>,
    #[serde(default = "default_region_column")]
    pub region: Vec<String>,
    #[serde(default = "default_merchant")]
    pub merchant: Vec<String>,
    #[serde(default = "default_card_country")]
    pub card_country: Vec<String>,
    #[serde(default = "default_card_type")]
    pub card_type: Vec<String>,
    #[serde(default = "default_status")]
    pub status: Vec<String>,
    #[serde(default = "default_payment_type")]
    pub payment_type: Vec<String>,
    #[serde(default = "default_amount")]
    pub amount: Vec<String>,
    #[serde(default = "default_currency")]
    pub currency: Vec<String>,
}

fn default_primary_id() -> Vec<String> {
    names(&["Transaction ID"])
}
fn default_secondary_id() -> Vec<String> {
    names(&["NP Transaction ID", "Merchant Transaction ID"])
}
fn default_gateway_id() -> Vec<String> {
    names(&["Gateway UUID"])
}
fn default_gateway_reference() -> Vec<String> {
    names(&["Gateway Reference"])
}
fn default_region_column() -> Vec<String> {
    names(&["Region", "Region Code"])
}
fn default_merchant() -> Vec<String> {
    names(&["Merchant", "Merchant Name"])
}
fn default_card_country() -> Vec<String> {
    names(&["Card Country", "Issuer Country"])
}
fn default_card_type() -> Vec<String> {
    names(&["Card Type", "Card Brand"])
}
fn default_status() -> Vec<String> {
    names(&["Processor Status", "Status"])
}
fn default_payment_type() -> Vec<String> {
    names(&["Payment Type"])
}
fn default_amount() -> Vec<String> {
    names(&["Amount", "Gross Amount"])
}
fn default_currency() -> Vec<String> {
    names(&["Currency"])
}

impl Default for LedgerColumns {
    fn default() -> Self {
        Self {
            primary_id: default_primary_id(),
            secondary_id: default_secondary_id(),
            gateway_id: default_gateway_id(),
            gateway_reference: default_gateway_reference(),
            region: default_region_column(),
            merchant: default_merchant(),
            card_country: default_card_country(),
            card_type: default_card_type(),
            status: default_status(),
            payment_type: default_payment_type(),
            amount: default_amount(),
            currency: default_currency(),
        }
    }
}

impl LedgerColumns {
    /// Every header that can carry a ledger identifier, in priority order.
    pub fn identifier_headers(&self) -> impl Iterator<Item = &String> {
        self.primary_id
            .iter()
            .chain(&self.secondary_id)
            .chain(&self.gateway_id)
            .chain(&self.gateway_reference)
    }
}

/// How raw status / payment-type values map onto transaction states.
/// Comparison is case-insensitive.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    #[serde(default = "default_declined")]
    pub declined: Vec<String>,
    /// Substrings marking a refund in either the status or the payment type.
    #[serde(default = "default_refund_markers")]
    pub refund_markers: Vec<String>,
    /// Exact payment-type codes marking a refund.
    #[serde(default = "default_refund_codes")]
    pub refund_codes: Vec<String>,
    #[serde(default = "default_captured")]
    pub captured: Vec<String>,
}

fn default_declined() -> Vec<String> {
    names(&["DECLINED", "FAILED", "ERROR"])
}
fn default_refund_markers() -> Vec<String> {
    names(&["REFUND"])
}
fn default_refund_codes() -> Vec<String> {
    names(&["RF"])
}
fn default_captured() -> Vec<String> {
    names(&["CAPTURED", "SETTLED", "APPROVED", "SUCCESS", "SUCCEEDED"])
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            declined: default_declined(),
            refund_markers: default_refund_markers(),
            refund_codes: default_refund_codes(),
            captured: default_captured(),
        }
    }
}

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeeConfig {
    #[serde(default)]
    pub columns: FeeColumns,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeeColumns {
    #[serde(default = "default_fee_identifier")]
    pub identifier: Vec<String>,
    #[serde(default = "default_mdr_amount")]
    pub mdr_amount: Vec<String>,
    #[serde(default = "default_mdr_currency")]
    pub mdr_currency: Vec<String>,
    #[serde(default = "default_interchange_amount")]
    pub interchange_amount: Vec<String>,
    #[serde(default = "default_interchange_currency")]
    pub interchange_currency: Vec<String>,
    #[serde(default = "default_scheme_amount")]
    pub scheme_fee_amount: Vec<String>,
    #[serde(default = "default_scheme_currency")]
    pub scheme_fee_currency: Vec<String>,
    /// Category name → column prefix, overriding the built-in prefix.
    /// Columns are read as `"<prefix> Amount"` / `"<prefix> Currency"`.
    #[serde(default)]
    pub itemized: BTreeMap<String, String>,
}

fn default_fee_identifier() -> Vec<String> {
    names(&["NP Transaction ID", "Transaction ID", "Gateway Reference", "Gateway UUID"])
}
fn default_mdr_amount() -> Vec<String> {
    names(&["MDR Amount"])
}
fn default_mdr_currency() -> Vec<String> {
    names(&["MDR Currency"])
}
fn default_interchange_amount() -> Vec<String> {
    names(&["Interchange Amount"])
}
fn default_interchange_currency() -> Vec<String> {
    names(&["Interchange Currency"])
}
fn default_scheme_amount() -> Vec<String> {
    names(&["Scheme Fee Bucket Amount", "Scheme Fee Amount"])
}
fn default_scheme_currency() -> Vec<String> {
    names(&["Scheme Fee Bucket Currency", "Scheme Fee Currency"])
}

impl Default for FeeColumns {
    fn default() -> Self {
        Self {
            identifier: default_fee_identifier(),
            mdr_amount: default_mdr_amount(),
            mdr_currency: default_mdr_currency(),
            interchange_amount: default_interchange_amount(),
            interchange_currency: default_interchange_currency(),
            scheme_fee_amount: default_scheme_amount(),
            scheme_fee_currency: default_scheme_currency(),
            itemized: BTreeMap::new(),
        }
    }
}

impl FeeColumns {
    /// Column prefix for an itemized category.
    pub fn itemized_prefix(&self, category: FeeCategory) -> String {
        if let Some(prefix) = self.itemized.get(category.as_str()) {
            return prefix.clone();
        }
        let builtin = match category {
            FeeCategory::Gateway => "Gateway Fee",
            FeeCategory::Authorization => "Authorization",
            FeeCategory::Clearing => "Clearing",
            FeeCategory::CrossBorder => "Cross Border",
            FeeCategory::CrossCurrency => "Cross Currency",
            FeeCategory::Preauth => "Preauthorization",
            FeeCategory::ThreeDs => "Three Ds",
            FeeCategory::NonThreeDs => "Non Three Ds",
            FeeCategory::Vat => "VAT",
            FeeCategory::Wht => "WHT",
            FeeCategory::Grt => "GRT",
            FeeCategory::St => "ST",
            FeeCategory::Interchange => "Interchange",
            FeeCategory::Scheme => "Scheme Fee Bucket",
            FeeCategory::NetAcquirerMarkup => "Net Acquirer Markup",
        };
        builtin.to_string()
    }
}

// ---------------------------------------------------------------------------
// Regions + rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RegionConfig {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Substrings of the merchant name identifying the region.
    #[serde(default)]
    pub merchant_keywords: Vec<String>,
    /// Card-country codes used when no merchant keyword matches.
    #[serde(default)]
    pub card_countries: Vec<String>,
}

fn default_regions() -> Vec<RegionConfig> {
    let region = |code: &str, name: &str, countries: &[&str]| RegionConfig {
        code: code.into(),
        name: Some(name.into()),
        merchant_keywords: vec![name.into()],
        card_countries: names(countries),
    };
    vec![
        region("HK", "Hong Kong", &["HKG", "HK"]),
        region("MY", "Malaysia", &["MYS", "MY"]),
        region("TH", "Thailand", &["THA", "TH"]),
    ]
}

/// A jurisdiction-specific transform over a classified fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionRule {
    /// The region's MDR has no scheme-fee component.
    ZeroSchemeFee,
}

impl std::fmt::Display for RegionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroSchemeFee => write!(f, "zero_scheme_fee"),
        }
    }
}

fn default_region_rules() -> BTreeMap<String, Vec<RegionRule>> {
    BTreeMap::from([("MY".to_string(), vec![RegionRule::ZeroSchemeFee])])
}

// ---------------------------------------------------------------------------
// Matching + tolerance
// ---------------------------------------------------------------------------

/// What to do when several transactions resolve to the same fee record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharedFeePolicy {
    /// Attribute the record to every claimant and warn.
    #[default]
    Sum,
    /// Abort the run.
    Reject,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchConfig {
    #[serde(default)]
    pub shared_fee_policy: SharedFeePolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToleranceConfig {
    /// Maximum reconciliation error per aggregate, in currency units.
    #[serde(default = "default_reconciliation")]
    pub reconciliation: f64,
}

fn default_reconciliation() -> f64 {
    0.01
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            reconciliation: default_reconciliation(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl AttributionConfig {
    pub fn from_toml(input: &str) -> Result<Self, AttributionError> {
        let mut config: AttributionConfig =
            toml::from_str(input).map_err(|e| AttributionError::ConfigParse(e.to_string()))?;
        config.canonicalize_region_codes()?;
        config.validate()?;
        Ok(config)
    }

    /// Upper-case region codes and rule keys so a code written `sg` in the
    /// file matches the `SG` read from a ledger's region column.
    fn canonicalize_region_codes(&mut self) -> Result<(), AttributionError> {
        for region in &mut self.regions {
            region.code = region_code(&region.code);
        }
        let mut rules = BTreeMap::new();
        for (key, list) in std::mem::take(&mut self.region_rules) {
            let code = region_code(&key);
            if rules.insert(code.clone(), list).is_some() {
                return Err(AttributionError::ConfigValidation(format!(
                    "region_rules lists region '{code}' more than once"
                )));
            }
        }
        self.region_rules = rules;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AttributionError> {
        let ledger = &self.ledger.columns;
        let ledger_lists = [
            ("ledger.columns.primary_id", &ledger.primary_id),
            ("ledger.columns.secondary_id", &ledger.secondary_id),
            ("ledger.columns.gateway_id", &ledger.gateway_id),
            ("ledger.columns.gateway_reference", &ledger.gateway_reference),
            ("ledger.columns.card_type", &ledger.card_type),
            ("ledger.columns.amount", &ledger.amount),
            ("ledger.columns.currency", &ledger.currency),
        ];
        let fees = &self.fees.columns;
        let fee_lists = [
            ("fees.columns.identifier", &fees.identifier),
            ("fees.columns.mdr_amount", &fees.mdr_amount),
            ("fees.columns.interchange_amount", &fees.interchange_amount),
            ("fees.columns.scheme_fee_amount", &fees.scheme_fee_amount),
        ];
        for (key, list) in ledger_lists.iter().chain(fee_lists.iter()) {
            if list.iter().all(|h| h.trim().is_empty()) {
                return Err(AttributionError::ConfigValidation(format!(
                    "{key} must name at least one column"
                )));
            }
        }

        for name in fees.itemized.keys() {
            let known = FeeCategory::from_name(name).is_some_and(|c| c.is_itemized());
            if !known {
                return Err(AttributionError::ConfigValidation(format!(
                    "fees.columns.itemized: '{name}' is not an itemized fee category"
                )));
            }
        }

        let mut seen = HashSet::new();
        for region in &self.regions {
            if region.code.trim().is_empty() {
                return Err(AttributionError::ConfigValidation(
                    "region code must not be empty".into(),
                ));
            }
            if region.code != region_code(&region.code) {
                return Err(AttributionError::ConfigValidation(format!(
                    "region code '{}' must be upper-case",
                    region.code
                )));
            }
            if !seen.insert(region.code.as_str()) {
                return Err(AttributionError::ConfigValidation(format!(
                    "duplicate region code '{}'",
                    region.code
                )));
            }
        }

        for key in self.region_rules.keys() {
            if *key != region_code(key) {
                return Err(AttributionError::ConfigValidation(format!(
                    "region_rules key '{key}' must be upper-case"
                )));
            }
        }

        let tol = self.tolerance.reconciliation;
        if !tol.is_finite() || tol < 0.0 {
            return Err(AttributionError::ConfigValidation(format!(
                "tolerance.reconciliation must be a finite number >= 0, got {tol}"
            )));
        }

        Ok(())
    }

    /// Display name for a region code, falling back to the code itself.
    pub fn region_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.regions
            .iter()
            .find(|r| r.code.eq_ignore_ascii_case(code))
            .and_then(|r| r.name.as_deref())
            .unwrap_or(code)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AttributionConfig::from_toml("").unwrap();
        assert_eq!(config.name, "IC++ breakdown");
        assert_eq!(config.regions.len(), 3);
        assert_eq!(config.region_rules["MY"], vec![RegionRule::ZeroSchemeFee]);
        assert_eq!(config.matching.shared_fee_policy, SharedFeePolicy::Sum);
        assert_eq!(config.tolerance.reconciliation, 0.01);
        assert_eq!(config.ledger.columns.primary_id, vec!["Transaction ID"]);
        assert_eq!(config.fees.columns.identifier[0], "NP Transaction ID");
        assert_eq!(config.region_name("MY"), "Malaysia");
        assert_eq!(config.region_name("SG"), "SG");
    }

    #[test]
    fn parse_full_document() {
        let input = r#"
name = "Q1 funding"

[ledger.columns]
primary_id = ["Txn Ref"]
amount = ["Gross"]

[ledger.status]
declined = ["REJECTED"]

[fees.columns]
mdr_amount = ["Total Fee"]

[fees.columns.itemized]
gateway = "Gateway Charge"

[[regions]]
code = "SG"
name = "Singapore"
merchant_keywords = ["Singapore", "SG Pte"]
card_countries = ["SGP"]

[region_rules]
SG = ["zero_scheme_fee"]

[matching]
shared_fee_policy = "reject"

[tolerance]
reconciliation = 0.005
"#;
        let config = AttributionConfig::from_toml(input).unwrap();
        assert_eq!(config.name, "Q1 funding");
        assert_eq!(config.ledger.columns.primary_id, vec!["Txn Ref"]);
        // Untouched lists keep their defaults.
        assert_eq!(config.ledger.columns.currency, vec!["Currency"]);
        assert_eq!(config.ledger.status.declined, vec!["REJECTED"]);
        assert_eq!(config.ledger.status.refund_codes, vec!["RF"]);
        assert_eq!(config.fees.columns.mdr_amount, vec!["Total Fee"]);
        assert_eq!(config.fees.columns.itemized_prefix(FeeCategory::Gateway), "Gateway Charge");
        assert_eq!(config.fees.columns.itemized_prefix(FeeCategory::Vat), "VAT");
        assert_eq!(config.regions.len(), 1);
        assert_eq!(config.region_rules.len(), 1);
        assert!(config.region_rules.get("MY").is_none());
        assert_eq!(config.matching.shared_fee_policy, SharedFeePolicy::Reject);
        assert_eq!(config.tolerance.reconciliation, 0.005);
    }

    #[test]
    fn reject_unknown_rule() {
        let err = AttributionConfig::from_toml("[region_rules]\nMY = [\"zero_vat\"]\n").unwrap_err();
        assert!(matches!(err, AttributionError::ConfigParse(_)));
    }

    #[test]
    fn reject_unknown_itemized_category() {
        let input = "[fees.columns.itemized]\ninterchange = \"IC\"\n";
        let err = AttributionConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("'interchange'"));
    }

    #[test]
    fn reject_duplicate_region() {
        let input = r#"
[[regions]]
code = "HK"
[[regions]]
code = "HK"
"#;
        let err = AttributionConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("duplicate region code 'HK'"));
    }

    #[test]
    fn region_codes_are_upper_cased() {
        let input = r#"
[[regions]]
code = " sg"
name = "Singapore"

[region_rules]
sg = ["zero_scheme_fee"]
"#;
        let config = AttributionConfig::from_toml(input).unwrap();
        assert_eq!(config.regions[0].code, "SG");
        assert_eq!(config.region_rules["SG"], vec![RegionRule::ZeroSchemeFee]);
        assert_eq!(config.region_name("sg"), "Singapore");
    }

    #[test]
    fn reject_rule_keys_differing_only_in_case() {
        let input = "[region_rules]\nsg = [\"zero_scheme_fee\"]\nSG = []\n";
        let err = AttributionConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("'SG' more than once"), "{err}");
    }

    #[test]
    fn validate_rejects_lower_case_codes() {
        let mut config = AttributionConfig::default();
        config.region_rules.insert("th".into(), vec![RegionRule::ZeroSchemeFee]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'th' must be upper-case"));

        let mut config = AttributionConfig::default();
        config.regions[0].code = "hk".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_empty_column_list() {
        let err = AttributionConfig::from_toml("[fees.columns]\nmdr_amount = []\n").unwrap_err();
        assert!(err.to_string().contains("fees.columns.mdr_amount"));
    }

    #[test]
    fn reject_negative_or_infinite_tolerance() {
        for value in ["-1.0", "inf", "nan"] {
            let input = format!("[tolerance]\nreconciliation = {value}\n");
            let err = AttributionConfig::from_toml(&input).unwrap_err();
            assert!(err.to_string().contains("tolerance.reconciliation"), "{value}");
        }
    }
}
