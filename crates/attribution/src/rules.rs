//! Region rule engine.
//!
//! Jurisdiction overrides live in a table keyed by region code. Each rule is a
//! pure transform over a [`ClassifiedFee`]; callers never branch on region.

use std::collections::BTreeMap;

use log::debug;

use crate::config::RegionRule;
use crate::model::ClassifiedFee;

#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: BTreeMap<String, Vec<RegionRule>>,
}

impl RuleTable {
    pub fn new(rules: BTreeMap<String, Vec<RegionRule>>) -> Self {
        Self { rules }
    }

    pub fn rules_for(&self, region: &str) -> &[RegionRule] {
        self.rules.get(region).map(|r| r.as_slice()).unwrap_or(&[])
    }

    /// Whether `region` carries `rule`. Used by renderers to mark overridden rows.
    pub fn has_rule(&self, region: &str, rule: RegionRule) -> bool {
        self.rules_for(region).contains(&rule)
    }
}

impl RegionRule {
    pub fn apply(&self, fee: &ClassifiedFee) -> ClassifiedFee {
        match self {
            Self::ZeroSchemeFee => fee.without_scheme_fee(),
        }
    }
}

/// Apply every rule registered for `region`, in table order.
pub fn apply_region_rules(table: &RuleTable, region: &str, classified: ClassifiedFee) -> ClassifiedFee {
    table.rules_for(region).iter().fold(classified, |fee, rule| {
        debug!("region {region}: applying {rule}");
        rule.apply(&fee)
    })
}
