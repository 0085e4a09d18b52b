//! Fixed-rate annuity formulas for monthly amortizing loans.
//!
//! `monthly_payment` and `principal_from_monthly` are exact inverses of one
//! another. Both special-case a zero rate, where the closed form would divide
//! by `(1 + r)^n - 1 = 0`.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::LoanEngineError;
use crate::types::*;
use crate::LoanEngineResult;

const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Convert an APR expressed as a percent (24 = 24%) into a monthly rate.
pub fn monthly_rate(annual_percent: Decimal) -> Rate {
    annual_percent / dec!(100) / MONTHS_PER_YEAR
}

/// Level monthly payment that retires `principal` over `term_months` at
/// `rate` per month: `M = P·r·(1+r)^n / ((1+r)^n − 1)`.
pub fn monthly_payment(principal: Money, rate: Rate, term_months: u32) -> LoanEngineResult<Money> {
    validate_terms(principal, "principal", rate, term_months)?;

    if rate.is_zero() {
        return principal
            .checked_div(Decimal::from(term_months))
            .ok_or_else(|| LoanEngineError::overflow("principal"));
    }

    let factor = growth_factor(rate, term_months)?;
    let denom = factor - Decimal::ONE;
    if denom.is_zero() {
        return Err(LoanEngineError::DivisionByZero {
            context: "monthly payment annuity factor".into(),
        });
    }
    principal
        .checked_mul(rate)
        .and_then(|v| v.checked_mul(factor))
        .and_then(|v| v.checked_div(denom))
        .ok_or_else(|| LoanEngineError::overflow("principal"))
}

/// Principal that a level `monthly` payment retires over `term_months`:
/// `P = M·((1+r)^n − 1) / (r·(1+r)^n)`.
pub fn principal_from_monthly(
    monthly: Money,
    rate: Rate,
    term_months: u32,
) -> LoanEngineResult<Money> {
    validate_terms(monthly, "monthly_payment", rate, term_months)?;

    if rate.is_zero() {
        return monthly
            .checked_mul(Decimal::from(term_months))
            .ok_or_else(|| LoanEngineError::overflow("monthly_payment"));
    }

    let factor = growth_factor(rate, term_months)?;
    let denom = rate
        .checked_mul(factor)
        .ok_or_else(|| LoanEngineError::overflow("rate"))?;
    if denom.is_zero() {
        return Err(LoanEngineError::DivisionByZero {
            context: "principal annuity factor".into(),
        });
    }
    (factor - Decimal::ONE)
        .checked_div(denom)
        .and_then(|v| monthly.checked_mul(v))
        .ok_or_else(|| LoanEngineError::overflow("monthly_payment"))
}

fn growth_factor(rate: Rate, term_months: u32) -> LoanEngineResult<Decimal> {
    (Decimal::ONE + rate)
        .checked_powi(i64::from(term_months))
        .ok_or_else(|| {
            LoanEngineError::invalid(
                "term_months",
                format!("(1 + r)^{term_months} overflows decimal precision"),
            )
        })
}

fn validate_terms(
    amount: Money,
    amount_field: &str,
    rate: Rate,
    term_months: u32,
) -> LoanEngineResult<()> {
    if term_months == 0 {
        return Err(LoanEngineError::invalid(
            "term_months",
            "Term must be at least 1 month",
        ));
    }
    if rate < Decimal::ZERO {
        return Err(LoanEngineError::invalid("rate", "Rate cannot be negative"));
    }
    if amount < Decimal::ZERO {
        return Err(LoanEngineError::invalid(
            amount_field,
            "Amount cannot be negative",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Envelope for callers that work with APR percentages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyPaymentInput {
    pub principal: Money,
    /// APR as a percent, e.g. 24 for 24%.
    pub annual_percent: Decimal,
    pub term_months: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyPaymentOutput {
    pub monthly_rate: Rate,
    pub monthly_payment: Money,
    pub total_payment: Money,
    pub total_interest: Money,
}

/// Rounded monthly payment and lifetime totals for a level-payment loan.
pub fn calculate_monthly_payment(
    input: &MonthlyPaymentInput,
) -> LoanEngineResult<ComputationOutput<MonthlyPaymentOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.annual_percent < Decimal::ZERO {
        return Err(LoanEngineError::invalid(
            "annual_percent",
            "APR cannot be negative",
        ));
    }
    if input.annual_percent > dec!(100) {
        warnings.push(format!(
            "APR of {}% is unusually high",
            input.annual_percent
        ));
    }

    let rate = monthly_rate(input.annual_percent);
    let payment = round_cents(monthly_payment(input.principal, rate, input.term_months)?);
    let total_payment = payment
        .checked_mul(Decimal::from(input.term_months))
        .ok_or_else(|| LoanEngineError::overflow("principal"))?;

    let output = MonthlyPaymentOutput {
        monthly_rate: rate,
        monthly_payment: payment,
        total_payment,
        total_interest: total_payment - input.principal,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Level-payment annuity (monthly compounding)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_monthly_rate_from_percent() {
        assert_eq!(monthly_rate(dec!(24)), dec!(0.02));
        assert_eq!(monthly_rate(dec!(0)), Decimal::ZERO);
    }

    #[test]
    fn test_monthly_payment_reference() {
        // 10k over 12 months at 2%/month
        let m = monthly_payment(dec!(10_000), dec!(0.02), 12).unwrap();
        assert_eq!(round_cents(m), dec!(945.60));
    }

    #[test]
    fn test_thirty_year_mortgage() {
        // 100k, 6% APR, 360 months => 599.55
        let m = monthly_payment(dec!(100_000), monthly_rate(dec!(6)), 360).unwrap();
        assert_eq!(round_cents(m), dec!(599.55));
    }

    #[test]
    fn test_zero_rate_is_straight_division() {
        assert_eq!(monthly_payment(dec!(1200), Decimal::ZERO, 12).unwrap(), dec!(100));
        assert_eq!(principal_from_monthly(dec!(100), Decimal::ZERO, 12).unwrap(), dec!(1200));
    }

    #[test]
    fn test_zero_rate_inverse_non_divisible() {
        let m = monthly_payment(dec!(1000), Decimal::ZERO, 3).unwrap();
        let p = principal_from_monthly(m, Decimal::ZERO, 3).unwrap();
        assert!((p - dec!(1000)).abs() <= dec!(0.01));
    }

    #[test]
    fn test_principal_from_monthly_reference() {
        // 4800/month, 2%/month, 12 months
        let p = principal_from_monthly(dec!(4800), dec!(0.02), 12).unwrap();
        assert_eq!(round_cents(p), dec!(50761.64));
    }

    #[test]
    fn test_round_trip_positive_rate() {
        for (principal, apr, term) in [
            (dec!(10_000), dec!(24), 12u32),
            (dec!(250_000), dec!(6.5), 360),
            (dec!(1), dec!(0.5), 1),
            (dec!(75_432.19), dec!(18), 48),
        ] {
            let r = monthly_rate(apr);
            let m = monthly_payment(principal, r, term).unwrap();
            let back = principal_from_monthly(m, r, term).unwrap();
            assert!(
                (back - principal).abs() <= dec!(0.01),
                "round trip drifted for {principal} @ {apr}% x {term}: {back}"
            );
        }
    }

    #[test]
    fn test_single_period_repays_principal_plus_interest() {
        let m = monthly_payment(dec!(1000), dec!(0.02), 1).unwrap();
        assert_eq!(round_cents(m), dec!(1020.00));
    }

    #[test]
    fn test_zero_term_rejected() {
        let err = monthly_payment(dec!(1000), dec!(0.02), 0).unwrap_err();
        match err {
            LoanEngineError::InvalidInput { field, .. } => assert_eq!(field, "term_months"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_rate_rejected() {
        assert!(principal_from_monthly(dec!(100), dec!(-0.01), 12).is_err());
    }

    #[test]
    fn test_overflow_is_an_error_not_a_panic() {
        for rate in [Decimal::ZERO, dec!(0.02)] {
            match principal_from_monthly(Decimal::MAX, rate, 12).unwrap_err() {
                LoanEngineError::InvalidInput { field, .. } => assert_eq!(field, "monthly_payment"),
                other => panic!("Expected InvalidInput, got {other:?}"),
            }
        }
        // 100% per month over one period doubles the principal
        match monthly_payment(Decimal::MAX, Decimal::ONE, 1).unwrap_err() {
            LoanEngineError::InvalidInput { field, .. } => assert_eq!(field, "principal"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_envelope_totals() {
        let input = MonthlyPaymentInput {
            principal: dec!(10_000),
            annual_percent: dec!(24),
            term_months: 12,
        };
        let out = calculate_monthly_payment(&input).unwrap();
        assert_eq!(out.result.monthly_payment, dec!(945.60));
        assert_eq!(out.result.total_payment, dec!(11347.20));
        assert_eq!(out.result.total_interest, dec!(1347.20));
        assert!(out.warnings.is_empty());
    }
}
