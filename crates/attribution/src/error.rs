use std::fmt;

#[derive(Debug)]
pub enum AttributionError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty column list, duplicate region, etc.).
    ConfigValidation(String),
    /// A required column is absent from an entire input table.
    MissingColumn { source: String, column: String },
    /// A fee record is claimed by more than one transaction under `shared_fee_policy = "reject"`.
    SharedFeeRecord { identifier: String, transactions: Vec<String> },
    /// A (region, card type) group contains transactions in more than one currency.
    MixedCurrencyInGroup { region: String, card_type: String, currencies: Vec<String> },
    /// An aggregate failed its reconciliation check.
    ReconciliationFailed { region: String, card_type: String, detail: String },
}

impl fmt::Display for AttributionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { source, column } => {
                write!(f, "{source}: missing column '{column}'")
            }
            Self::SharedFeeRecord { identifier, transactions } => write!(
                f,
                "fee record '{identifier}' is claimed by {} transactions ({})",
                transactions.len(),
                transactions.join(", ")
            ),
            Self::MixedCurrencyInGroup { region, card_type, currencies } => write!(
                f,
                "group {region}/{card_type} mixes currencies: {}",
                currencies.join(", ")
            ),
            Self::ReconciliationFailed { region, card_type, detail } => {
                write!(f, "group {region}/{card_type} does not reconcile: {detail}")
            }
        }
    }
}

impl std::error::Error for AttributionError {}
