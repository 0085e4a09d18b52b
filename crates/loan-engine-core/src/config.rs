//! Default-value contracts and advisory thresholds.
//!
//! Rating inputs that are missing from the store never silently become zero:
//! each one falls back to the value configured here.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LoanEngineError;
use crate::types::*;
use crate::LoanEngineResult;

/// Combined deposit + savings balance at or above which a tier is shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceTier {
    pub name: String,
    pub min_combined_balance: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LendingConfig {
    /// Score assumed for users without a recorded credit score.
    pub fallback_credit_score: i32,
    /// Used when the employment status has no multiplier row.
    pub fallback_employment_multiplier: Multiple,
    /// Used when the credit score falls outside every configured tier.
    pub fallback_credit_multiplier: Multiple,
    /// Used when no loan settings row exists.
    pub fallback_dti_ratio: Rate,
    /// APR percent used when no loan settings row exists.
    pub fallback_annual_percent: Decimal,
    pub balance_tiers: Vec<BalanceTier>,
    /// Maximum number of applications returned by a status query.
    pub history_limit: u32,
    /// Account type credited on disbursement.
    pub loan_account_type: String,
    /// Actor recorded in the audit log for system-originated actions.
    pub audit_actor_id: UserId,
}

impl Default for LendingConfig {
    fn default() -> Self {
        LendingConfig {
            fallback_credit_score: 300,
            fallback_employment_multiplier: dec!(1.0),
            fallback_credit_multiplier: dec!(0.8),
            fallback_dti_ratio: dec!(0.30),
            fallback_annual_percent: dec!(24),
            balance_tiers: vec![
                BalanceTier {
                    name: "tier3".into(),
                    min_combined_balance: dec!(300000),
                },
                BalanceTier {
                    name: "tier2".into(),
                    min_combined_balance: dec!(150000),
                },
                BalanceTier {
                    name: "tier1".into(),
                    min_combined_balance: dec!(50000),
                },
            ],
            history_limit: 50,
            loan_account_type: "Loan".into(),
            audit_actor_id: 0,
        }
    }
}

impl LendingConfig {
    pub fn validate(&self) -> LoanEngineResult<()> {
        if self.fallback_dti_ratio <= Decimal::ZERO || self.fallback_dti_ratio > Decimal::ONE {
            return Err(LoanEngineError::invalid(
                "fallback_dti_ratio",
                "DTI ratio must be in (0, 1]",
            ));
        }
        if self.fallback_annual_percent < Decimal::ZERO {
            return Err(LoanEngineError::invalid(
                "fallback_annual_percent",
                "APR cannot be negative",
            ));
        }
        if self.fallback_employment_multiplier < Decimal::ZERO {
            return Err(LoanEngineError::invalid(
                "fallback_employment_multiplier",
                "Multiplier cannot be negative",
            ));
        }
        if self.fallback_credit_multiplier < Decimal::ZERO {
            return Err(LoanEngineError::invalid(
                "fallback_credit_multiplier",
                "Multiplier cannot be negative",
            ));
        }
        if self.history_limit == 0 {
            return Err(LoanEngineError::invalid(
                "history_limit",
                "History limit must be at least 1",
            ));
        }
        if self.loan_account_type.trim().is_empty() {
            return Err(LoanEngineError::invalid(
                "loan_account_type",
                "Loan account type cannot be blank",
            ));
        }
        if let Some(tier) = self
            .balance_tiers
            .iter()
            .find(|t| t.min_combined_balance < Decimal::ZERO)
        {
            return Err(LoanEngineError::invalid(
                "balance_tiers",
                format!("Tier {} has a negative threshold", tier.name),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = LendingConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.fallback_credit_score, 300);
        assert_eq!(cfg.balance_tiers.len(), 3);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg: LendingConfig =
            serde_json::from_str(r#"{ "fallback_dti_ratio": "0.40", "history_limit": 10 }"#)
                .unwrap();
        assert_eq!(cfg.fallback_dti_ratio, dec!(0.40));
        assert_eq!(cfg.history_limit, 10);
        assert_eq!(cfg.fallback_annual_percent, dec!(24));
    }

    #[test]
    fn test_dti_out_of_range_rejected() {
        let cfg = LendingConfig {
            fallback_dti_ratio: dec!(1.5),
            ..LendingConfig::default()
        };
        match cfg.validate().unwrap_err() {
            LoanEngineError::InvalidInput { field, .. } => assert_eq!(field, "fallback_dti_ratio"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }
}
