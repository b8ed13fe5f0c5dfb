//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 2       | Universal        | CLI usage error (bad args)               |
//! | 60-69   | run / validate   | Attribution codes                        |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use icpp_attribution::AttributionError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
/// Also what clap exits with on a parse failure.
#[allow(dead_code)]
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Attribution (60-69)
// =============================================================================

/// Config file unreadable, unparseable or invalid.
pub const EXIT_CONFIG_INVALID: u8 = 60;

/// Ledger or fee file unreadable, or missing a required column.
pub const EXIT_INPUT_INVALID: u8 = 61;

/// Attribution aborted: shared fee record under `reject`, mixed currencies
/// in a group, or a group that does not reconcile. Also report write failures.
pub const EXIT_ATTRIBUTION_FAILED: u8 = 62;

/// Run completed but produced warnings and `--strict` was given.
pub const EXIT_WARNINGS: u8 = 63;

/// Map an engine error to its exit code.
pub fn attribution_exit_code(err: &AttributionError) -> u8 {
    match err {
        AttributionError::ConfigParse(_) | AttributionError::ConfigValidation(_) => EXIT_CONFIG_INVALID,
        AttributionError::MissingColumn { .. } => EXIT_INPUT_INVALID,
        AttributionError::SharedFeeRecord { .. }
        | AttributionError::MixedCurrencyInGroup { .. }
        | AttributionError::ReconciliationFailed { .. } => EXIT_ATTRIBUTION_FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [EXIT_SUCCESS, EXIT_USAGE, EXIT_CONFIG_INVALID, EXIT_INPUT_INVALID, EXIT_ATTRIBUTION_FAILED, EXIT_WARNINGS];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn engine_errors_map_to_range() {
        let missing = AttributionError::MissingColumn { source: "fees".into(), column: "MDR Amount".into() };
        assert_eq!(attribution_exit_code(&missing), EXIT_INPUT_INVALID);
        let parse = AttributionError::ConfigParse("bad".into());
        assert_eq!(attribution_exit_code(&parse), EXIT_CONFIG_INVALID);
        let mixed = AttributionError::MixedCurrencyInGroup {
            region: "HK".into(),
            card_type: "VISA".into(),
            currencies: vec!["HKD".into(), "USD".into()],
        };
        assert_eq!(attribution_exit_code(&mixed), EXIT_ATTRIBUTION_FAILED);
    }
}
