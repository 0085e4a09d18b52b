//! Affordability-based maximum principal and balance-tier hints.
//!
//! The affordable monthly payment is `income × DTI × employment × credit`,
//! rounded to cents; the maximum principal is the annuity present value of
//! that payment at the product APR over the requested term.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::annuity::{monthly_rate, principal_from_monthly};
use crate::config::BalanceTier;
use crate::error::LoanEngineError;
use crate::types::*;
use crate::LoanEngineResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaxLoanInput {
    /// Monthly income.
    pub income: Money,
    /// Share of income that may go to debt service, in (0, 1].
    pub dti_ratio: Rate,
    pub employment_multiplier: Multiple,
    pub credit_multiplier: Multiple,
    /// APR as a percent.
    pub annual_percent: Decimal,
    pub term_months: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxLoan {
    pub allowed_monthly: Money,
    pub max_principal: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derive the affordable monthly payment and the largest principal it can
/// service. Advisory quotes and enforcement at apply time both call this.
pub fn calculate_max_loan(input: &MaxLoanInput) -> LoanEngineResult<MaxLoan> {
    validate_input(input)?;

    let allowed_monthly = input
        .income
        .checked_mul(input.dti_ratio)
        .and_then(|v| v.checked_mul(input.employment_multiplier))
        .and_then(|v| v.checked_mul(input.credit_multiplier))
        .map(round_cents)
        .ok_or_else(|| LoanEngineError::overflow("income"))?;
    let rate = monthly_rate(input.annual_percent);
    let max_principal = round_cents(principal_from_monthly(
        allowed_monthly,
        rate,
        input.term_months,
    )?);

    Ok(MaxLoan {
        allowed_monthly,
        max_principal,
    })
}

pub fn calculate_max_loan_with_metadata(
    input: &MaxLoanInput,
) -> LoanEngineResult<ComputationOutput<MaxLoan>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let output = calculate_max_loan(input)?;
    if output.max_principal.is_zero() {
        warnings.push("Affordable monthly payment is zero; no principal can be offered".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "DTI-capped affordability, annuity present value",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Every tier whose threshold the combined balance meets, in configured order.
pub fn eligible_tiers(combined_balance: Money, tiers: &[BalanceTier]) -> Vec<String> {
    tiers
        .iter()
        .filter(|t| combined_balance >= t.min_combined_balance)
        .map(|t| t.name.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_input(input: &MaxLoanInput) -> LoanEngineResult<()> {
    if input.income < Decimal::ZERO {
        return Err(LoanEngineError::invalid("income", "Income cannot be negative"));
    }
    if input.dti_ratio <= Decimal::ZERO || input.dti_ratio > Decimal::ONE {
        return Err(LoanEngineError::invalid(
            "dti_ratio",
            "DTI ratio must be in (0, 1]",
        ));
    }
    if input.employment_multiplier < Decimal::ZERO {
        return Err(LoanEngineError::invalid(
            "employment_multiplier",
            "Multiplier cannot be negative",
        ));
    }
    if input.credit_multiplier < Decimal::ZERO {
        return Err(LoanEngineError::invalid(
            "credit_multiplier",
            "Multiplier cannot be negative",
        ));
    }
    if input.annual_percent < Decimal::ZERO {
        return Err(LoanEngineError::invalid(
            "annual_percent",
            "APR cannot be negative",
        ));
    }
    if input.term_months == 0 {
        return Err(LoanEngineError::invalid(
            "term_months",
            "Term must be at least 1 month",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LendingConfig;
    use rust_decimal_macros::dec;

    fn base_input() -> MaxLoanInput {
        MaxLoanInput {
            income: dec!(20_000),
            dti_ratio: dec!(0.30),
            employment_multiplier: dec!(1.0),
            credit_multiplier: dec!(0.8),
            annual_percent: dec!(24),
            term_months: 12,
        }
    }

    #[test]
    fn test_reference_case() {
        let out = calculate_max_loan(&base_input()).unwrap();
        assert_eq!(out.allowed_monthly, dec!(4800.00));
        assert_eq!(out.max_principal, dec!(50761.64));
    }

    #[test]
    fn test_strong_profile() {
        let input = MaxLoanInput {
            income: dec!(50_000),
            employment_multiplier: dec!(1.2),
            credit_multiplier: dec!(1.1),
            term_months: 24,
            ..base_input()
        };
        let out = calculate_max_loan(&input).unwrap();
        assert_eq!(out.allowed_monthly, dec!(19800.00));
        assert_eq!(out.max_principal, dec!(374495.73));
    }

    #[test]
    fn test_zero_rate_is_payment_times_term() {
        let input = MaxLoanInput {
            annual_percent: Decimal::ZERO,
            ..base_input()
        };
        let out = calculate_max_loan(&input).unwrap();
        assert_eq!(out.max_principal, dec!(57600));
    }

    #[test]
    fn test_zero_income_yields_zero() {
        let input = MaxLoanInput {
            income: Decimal::ZERO,
            ..base_input()
        };
        let out = calculate_max_loan_with_metadata(&input).unwrap();
        assert_eq!(out.result.max_principal, Decimal::ZERO);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_monotone_in_each_factor() {
        let base = calculate_max_loan(&base_input()).unwrap().max_principal;
        let bumps = [
            MaxLoanInput { income: dec!(20_001), ..base_input() },
            MaxLoanInput { dti_ratio: dec!(0.35), ..base_input() },
            MaxLoanInput { employment_multiplier: dec!(1.1), ..base_input() },
            MaxLoanInput { credit_multiplier: dec!(0.9), ..base_input() },
        ];
        for bumped in bumps {
            let p = calculate_max_loan(&bumped).unwrap().max_principal;
            assert!(p >= base, "max principal fell from {base} to {p}");
        }
    }

    #[test]
    fn test_dti_bounds() {
        for bad in [Decimal::ZERO, dec!(1.01), dec!(-0.1)] {
            let input = MaxLoanInput { dti_ratio: bad, ..base_input() };
            match calculate_max_loan(&input).unwrap_err() {
                LoanEngineError::InvalidInput { field, .. } => assert_eq!(field, "dti_ratio"),
                other => panic!("Expected InvalidInput, got {other:?}"),
            }
        }
        let full = MaxLoanInput { dti_ratio: Decimal::ONE, ..base_input() };
        assert!(calculate_max_loan(&full).is_ok());
    }

    #[test]
    fn test_huge_income_is_rejected_not_panicking() {
        let input = MaxLoanInput {
            income: Decimal::MAX,
            employment_multiplier: dec!(100),
            ..base_input()
        };
        match calculate_max_loan(&input).unwrap_err() {
            LoanEngineError::InvalidInput { field, .. } => assert_eq!(field, "income"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_income_rejected() {
        let input = MaxLoanInput { income: dec!(-1), ..base_input() };
        assert!(calculate_max_loan(&input).is_err());
    }

    #[test]
    fn test_eligible_tiers_thresholds() {
        let tiers = LendingConfig::default().balance_tiers;
        assert!(eligible_tiers(dec!(49_999.99), &tiers).is_empty());
        assert_eq!(eligible_tiers(dec!(50_000), &tiers), vec!["tier1"]);
        assert_eq!(eligible_tiers(dec!(150_000), &tiers), vec!["tier2", "tier1"]);
        assert_eq!(
            eligible_tiers(dec!(1_000_000), &tiers),
            vec!["tier3", "tier2", "tier1"]
        );
    }
}
