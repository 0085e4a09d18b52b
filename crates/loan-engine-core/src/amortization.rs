//! Period-by-period amortization schedules.
//!
//! Every period is rounded to cents as it is produced: interest comes from the
//! running rounded balance, and the final period takes whatever balance is
//! left so the schedule closes at exactly zero.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::annuity::{monthly_payment, monthly_rate};
use crate::clock::Clock;
use crate::error::LoanEngineError;
use crate::types::*;
use crate::LoanEngineResult;

/// One row of an amortization schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationEntry {
    pub period: u32,
    pub due_date: NaiveDate,
    pub payment: Money,
    pub principal: Money,
    pub interest: Money,
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    /// Nominal level payment, rounded to cents.
    pub monthly_payment: Money,
    pub schedule: Vec<AmortizationEntry>,
    pub total_interest: Money,
    pub total_paid: Money,
}

impl AmortizationSchedule {
    pub fn last_due_date(&self) -> Option<NaiveDate> {
        self.schedule.last().map(|e| e.due_date)
    }

    pub fn total_principal(&self) -> Money {
        self.schedule.iter().map(|e| e.principal).sum()
    }
}

/// Build the full schedule for `principal` at `annual_percent` APR over
/// `term_months`, with period 1 due one month after `start_date`.
pub fn amortization_schedule(
    principal: Money,
    annual_percent: Decimal,
    term_months: u32,
    start_date: NaiveDate,
) -> LoanEngineResult<AmortizationSchedule> {
    if annual_percent < Decimal::ZERO {
        return Err(LoanEngineError::invalid(
            "annual_percent",
            "APR cannot be negative",
        ));
    }

    let rate = monthly_rate(annual_percent);
    // Unrounded: per-period principal is derived from the exact payment.
    let level_payment = monthly_payment(principal, rate, term_months)?;

    let mut schedule = Vec::with_capacity(term_months as usize);
    let mut balance = principal;
    let mut total_interest = Decimal::ZERO;
    let mut total_paid = Decimal::ZERO;

    for period in 1..=term_months {
        let interest = balance
            .checked_mul(rate)
            .map(round_cents)
            .ok_or_else(|| LoanEngineError::overflow("principal"))?;
        let principal_portion = if period == term_months {
            round_cents(balance)
        } else {
            round_cents(level_payment - interest)
        };
        let payment = round_cents(principal_portion + interest);
        balance = round_cents(balance - principal_portion);

        total_interest = total_interest
            .checked_add(interest)
            .ok_or_else(|| LoanEngineError::overflow("principal"))?;
        total_paid = total_paid
            .checked_add(payment)
            .ok_or_else(|| LoanEngineError::overflow("principal"))?;

        schedule.push(AmortizationEntry {
            period,
            due_date: due_date(start_date, period)?,
            payment,
            principal: principal_portion,
            interest,
            balance: balance.max(Decimal::ZERO),
        });
    }

    Ok(AmortizationSchedule {
        monthly_payment: round_cents(level_payment),
        schedule,
        total_interest,
        total_paid,
    })
}

/// `start + period` calendar months, clamped to the last day of short months.
/// Each date is taken from `start`, so a clamp never carries forward:
/// Jan 31 gives Feb 28 then Mar 31.
pub fn due_date(start: NaiveDate, period: u32) -> LoanEngineResult<NaiveDate> {
    start.checked_add_months(Months::new(period)).ok_or_else(|| {
        LoanEngineError::DateError(format!("{start} + {period} months is out of range"))
    })
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInput {
    pub principal: Money,
    pub annual_percent: Decimal,
    pub term_months: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

/// Schedule envelope. A missing `start_date` falls back to `clock.today()`.
pub fn calculate_schedule<C: Clock + ?Sized>(
    input: &ScheduleInput,
    clock: &C,
) -> LoanEngineResult<ComputationOutput<AmortizationSchedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.principal <= Decimal::ZERO {
        return Err(LoanEngineError::invalid(
            "principal",
            "Principal must be positive",
        ));
    }

    let start_date = input.start_date.unwrap_or_else(|| {
        warnings.push("start_date not supplied; schedule starts today".into());
        clock.today()
    });

    let output = amortization_schedule(
        input.principal,
        input.annual_percent,
        input.term_months,
        start_date,
    )?;

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "rounding": "cents per period, half away from zero",
        "final_period": "absorbs residual balance",
        "start_date": start_date.to_string(),
    });

    Ok(with_metadata(
        "Level-payment amortization schedule",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    #[test]
    fn test_first_and_last_rows() {
        let s = amortization_schedule(dec!(10_000), dec!(24), 12, jan(15)).unwrap();
        assert_eq!(s.monthly_payment, dec!(945.60));
        assert_eq!(
            s.schedule[0],
            AmortizationEntry {
                period: 1,
                due_date: NaiveDate::from_ymd_opt(2025, 2, 15).unwrap(),
                payment: dec!(945.60),
                principal: dec!(745.60),
                interest: dec!(200.00),
                balance: dec!(9254.40),
            }
        );
        assert_eq!(
            s.schedule[11],
            AmortizationEntry {
                period: 12,
                due_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
                payment: dec!(945.55),
                principal: dec!(927.01),
                interest: dec!(18.54),
                balance: dec!(0.00),
            }
        );
    }

    #[test]
    fn test_totals() {
        let s = amortization_schedule(dec!(10_000), dec!(24), 12, jan(15)).unwrap();
        assert_eq!(s.total_principal(), dec!(10_000));
        assert_eq!(s.total_interest, dec!(1347.15));
        assert_eq!(s.total_paid, dec!(11347.15));
    }

    #[test]
    fn test_zero_rate_schedule() {
        let s = amortization_schedule(dec!(1200), Decimal::ZERO, 12, jan(1)).unwrap();
        assert_eq!(s.monthly_payment, dec!(100));
        assert!(s.schedule.iter().all(|e| e.interest.is_zero()));
        assert!(s.schedule.iter().all(|e| e.payment == dec!(100)));
        assert_eq!(s.schedule[0].balance, dec!(1100));
    }

    #[test]
    fn test_due_dates_clamp_to_month_end_without_drift() {
        let s = amortization_schedule(dec!(3000), dec!(12), 3, jan(31)).unwrap();
        let dates: Vec<NaiveDate> = s.schedule.iter().map(|e| e.due_date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
                NaiveDate::from_ymd_opt(2025, 4, 30).unwrap(),
            ]
        );
    }

    #[test]
    fn test_single_period() {
        let s = amortization_schedule(dec!(1000), dec!(24), 1, jan(1)).unwrap();
        assert_eq!(s.schedule.len(), 1);
        assert_eq!(s.schedule[0].principal, dec!(1000));
        assert_eq!(s.schedule[0].interest, dec!(20));
        assert_eq!(s.schedule[0].balance, Decimal::ZERO);
    }

    #[test]
    fn test_zero_term_rejected() {
        assert!(amortization_schedule(dec!(1000), dec!(24), 0, jan(1)).is_err());
    }

    #[test]
    fn test_envelope_defaults_start_date() {
        let input = ScheduleInput {
            principal: dec!(5000),
            annual_percent: dec!(10),
            term_months: 6,
            start_date: None,
        };
        let out = calculate_schedule(&input, &FixedClock::on(jan(31))).unwrap();
        assert_eq!(out.result.schedule.len(), 6);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(
            out.result.schedule[0].due_date,
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
    }

    #[test]
    fn test_envelope_rejects_non_positive_principal() {
        let input = ScheduleInput {
            principal: Decimal::ZERO,
            annual_percent: dec!(10),
            term_months: 6,
            start_date: Some(jan(1)),
        };
        match calculate_schedule(&input, &FixedClock::on(jan(1))).unwrap_err() {
            LoanEngineError::InvalidInput { field, .. } => assert_eq!(field, "principal"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }
}
