//! The closed fee taxonomy.
//!
//! Names returned by [`FeeCategory::as_str`] are a contract with every
//! presentation adapter; they never change.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FeeCategory {
    #[serde(rename = "interchange")]
    Interchange,
    #[serde(rename = "scheme")]
    Scheme,
    #[serde(rename = "gateway")]
    Gateway,
    #[serde(rename = "authorization")]
    Authorization,
    #[serde(rename = "clearing")]
    Clearing,
    #[serde(rename = "cross-border")]
    CrossBorder,
    #[serde(rename = "cross-currency")]
    CrossCurrency,
    #[serde(rename = "preauth")]
    Preauth,
    #[serde(rename = "3DS")]
    ThreeDs,
    #[serde(rename = "non-3DS")]
    NonThreeDs,
    #[serde(rename = "VAT")]
    Vat,
    #[serde(rename = "WHT")]
    Wht,
    #[serde(rename = "GRT")]
    Grt,
    #[serde(rename = "ST")]
    St,
    #[serde(rename = "net-acquirer-markup")]
    NetAcquirerMarkup,
}

impl FeeCategory {
    pub const ALL: [FeeCategory; 15] = [
        Self::Interchange,
        Self::Scheme,
        Self::Gateway,
        Self::Authorization,
        Self::Clearing,
        Self::CrossBorder,
        Self::CrossCurrency,
        Self::Preauth,
        Self::ThreeDs,
        Self::NonThreeDs,
        Self::Vat,
        Self::Wht,
        Self::Grt,
        Self::St,
        Self::NetAcquirerMarkup,
    ];

    /// The 2nd-Plus sub-categories read directly from a fee record.
    pub const ITEMIZED: [FeeCategory; 12] = [
        Self::Gateway,
        Self::Authorization,
        Self::Clearing,
        Self::CrossBorder,
        Self::CrossCurrency,
        Self::Preauth,
        Self::ThreeDs,
        Self::NonThreeDs,
        Self::Vat,
        Self::Wht,
        Self::Grt,
        Self::St,
    ];

    pub const TAXES: [FeeCategory; 4] = [Self::Vat, Self::Wht, Self::Grt, Self::St];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interchange => "interchange",
            Self::Scheme => "scheme",
            Self::Gateway => "gateway",
            Self::Authorization => "authorization",
            Self::Clearing => "clearing",
            Self::CrossBorder => "cross-border",
            Self::CrossCurrency => "cross-currency",
            Self::Preauth => "preauth",
            Self::ThreeDs => "3DS",
            Self::NonThreeDs => "non-3DS",
            Self::Vat => "VAT",
            Self::Wht => "WHT",
            Self::Grt => "GRT",
            Self::St => "ST",
            Self::NetAcquirerMarkup => "net-acquirer-markup",
        }
    }

    /// Human label used by the console renderer.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Interchange => "IC (Interchange)",
            Self::Scheme => "1st Plus (Scheme)",
            Self::Gateway => "Gateway Fee",
            Self::Authorization => "Authorization Fee",
            Self::Clearing => "Clearing Fee",
            Self::CrossBorder => "Cross-Border Fee",
            Self::CrossCurrency => "Cross-Currency Fee",
            Self::Preauth => "Preauthorization Fee",
            Self::ThreeDs => "3DS Fee",
            Self::NonThreeDs => "Non-3DS Fee",
            Self::Vat => "VAT",
            Self::Wht => "WHT (Withholding Tax)",
            Self::Grt => "GRT (Gross Receipt Tax)",
            Self::St => "ST (Sales Tax)",
            Self::NetAcquirerMarkup => "Net Acquirer Markup",
        }
    }

    /// Column name in the flat CSV export.
    pub fn export_column(&self) -> &'static str {
        match self {
            Self::Interchange => "IC_Total",
            Self::Scheme => "FirstPlus_Total",
            Self::Gateway => "GatewayFee_Total",
            Self::Authorization => "AuthorizationFee_Total",
            Self::Clearing => "ClearingFee_Total",
            Self::CrossBorder => "CrossBorderFee_Total",
            Self::CrossCurrency => "CrossCurrencyFee_Total",
            Self::Preauth => "PreauthFee_Total",
            Self::ThreeDs => "ThreeDSFee_Total",
            Self::NonThreeDs => "NonThreeDSFee_Total",
            Self::Vat => "VAT_Total",
            Self::Wht => "WHT_Total",
            Self::Grt => "GRT_Total",
            Self::St => "ST_Total",
            Self::NetAcquirerMarkup => "NetAcquirerMarkup_Total",
        }
    }

    pub fn is_tax(&self) -> bool {
        Self::TAXES.contains(self)
    }

    pub fn is_itemized(&self) -> bool {
        Self::ITEMIZED.contains(self)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for FeeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
