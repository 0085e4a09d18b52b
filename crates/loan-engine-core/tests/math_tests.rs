use chrono::NaiveDate;
use loan_engine_core::amortization::{self, ScheduleInput};
use loan_engine_core::annuity::{self, MonthlyPaymentInput};
use loan_engine_core::clock::FixedClock;
use loan_engine_core::eligibility::{self, MaxLoanInput};
use loan_engine_core::LoanEngineError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn assert_close(actual: Decimal, expected: Decimal) {
    assert!(
        (actual - expected).abs() <= dec!(0.01),
        "expected {expected}, got {actual}"
    );
}

// ===========================================================================
// Annuity
// ===========================================================================

#[test]
fn test_thirty_year_mortgage_payment() {
    let out = annuity::calculate_monthly_payment(&MonthlyPaymentInput {
        principal: dec!(100_000),
        annual_percent: dec!(6),
        term_months: 360,
    })
    .unwrap();
    assert_eq!(out.result.monthly_payment, dec!(599.55));
    assert_eq!(out.result.monthly_rate, dec!(0.005));
    assert!(out.warnings.is_empty());
}

#[test]
fn test_zero_rate_is_straight_line() {
    let out = annuity::calculate_monthly_payment(&MonthlyPaymentInput {
        principal: dec!(1200),
        annual_percent: Decimal::ZERO,
        term_months: 12,
    })
    .unwrap();
    assert_eq!(out.result.monthly_payment, dec!(100));
    assert_eq!(out.result.total_interest, Decimal::ZERO);
}

#[test]
fn test_payment_and_principal_are_inverses() {
    let r = annuity::monthly_rate(dec!(24));
    for n in [1u32, 12, 60, 360] {
        let m = annuity::monthly_payment(dec!(25_000), r, n).unwrap();
        let p = annuity::principal_from_monthly(m, r, n).unwrap();
        assert_close(p, dec!(25_000));
    }
}

#[test]
fn test_zero_term_rejected() {
    let err = annuity::monthly_payment(dec!(1000), dec!(0.02), 0).unwrap_err();
    match err {
        LoanEngineError::InvalidInput { field, .. } => assert_eq!(field, "term_months"),
        other => panic!("Expected InvalidInput, got {other:?}"),
    }
}

// ===========================================================================
// Amortization
// ===========================================================================

#[test]
fn test_schedule_closes_at_zero_with_exact_principal() {
    let s = amortization::amortization_schedule(dec!(50_000), dec!(24), 12, date(2025, 3, 1))
        .unwrap();
    assert_eq!(s.monthly_payment, dec!(4727.98));
    assert_eq!(s.schedule.len(), 12);
    assert_eq!(s.schedule[0].interest, dec!(1000.00));
    assert_eq!(s.total_principal(), dec!(50_000));
    assert_eq!(s.schedule.last().unwrap().balance, Decimal::ZERO);
    for entry in &s.schedule {
        assert_eq!(entry.payment, entry.principal + entry.interest);
        assert!(entry.balance >= Decimal::ZERO);
    }
}

#[test]
fn test_schedule_totals() {
    let s = amortization::amortization_schedule(dec!(10_000), dec!(24), 12, date(2025, 1, 15))
        .unwrap();
    assert_eq!(s.total_interest, dec!(1347.15));
    assert_eq!(s.total_paid, dec!(11347.15));
}

#[test]
fn test_due_dates_clamp_to_month_end() {
    let s = amortization::amortization_schedule(dec!(3000), dec!(12), 3, date(2025, 1, 31))
        .unwrap();
    let dates: Vec<NaiveDate> = s.schedule.iter().map(|e| e.due_date).collect();
    assert_eq!(dates, vec![date(2025, 2, 28), date(2025, 3, 31), date(2025, 4, 30)]);
}

#[test]
fn test_leap_year_february() {
    assert_eq!(
        amortization::due_date(date(2024, 1, 31), 1).unwrap(),
        date(2024, 2, 29)
    );
}

#[test]
fn test_single_period_schedule() {
    let s = amortization::amortization_schedule(dec!(1000), dec!(12), 1, date(2025, 6, 10))
        .unwrap();
    assert_eq!(s.schedule.len(), 1);
    let only = &s.schedule[0];
    assert_eq!(only.interest, dec!(10.00));
    assert_eq!(only.principal, dec!(1000.00));
    assert_eq!(only.payment, dec!(1010.00));
    assert_eq!(only.balance, Decimal::ZERO);
}

#[test]
fn test_schedule_envelope_with_start_date_has_no_warnings() {
    let out = amortization::calculate_schedule(
        &ScheduleInput {
            principal: dec!(10_000),
            annual_percent: dec!(24),
            term_months: 12,
            start_date: Some(date(2025, 1, 15)),
        },
        &FixedClock::on(date(2030, 6, 1)),
    )
    .unwrap();
    assert!(out.warnings.is_empty());
    assert_eq!(out.result.schedule[0].due_date, date(2025, 2, 15));
}

#[test]
fn test_schedule_envelope_defaults_start_date() {
    let out = amortization::calculate_schedule(
        &ScheduleInput {
            principal: dec!(10_000),
            annual_percent: dec!(24),
            term_months: 12,
            start_date: None,
        },
        &FixedClock::on(date(2025, 3, 10)),
    )
    .unwrap();
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.result.schedule[0].due_date, date(2025, 4, 10));
}

// ===========================================================================
// Maximum loan
// ===========================================================================

fn fallback_input() -> MaxLoanInput {
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
fn test_max_loan_with_fallback_inputs() {
    let m = eligibility::calculate_max_loan(&fallback_input()).unwrap();
    assert_eq!(m.allowed_monthly, dec!(4800.00));
    assert_eq!(m.max_principal, dec!(50761.64));
}

#[test]
fn test_max_loan_with_configured_multipliers() {
    let m = eligibility::calculate_max_loan(&MaxLoanInput {
        income: dec!(50_000),
        employment_multiplier: dec!(1.2),
        credit_multiplier: dec!(1.1),
        term_months: 24,
        ..fallback_input()
    })
    .unwrap();
    assert_eq!(m.allowed_monthly, dec!(19800.00));
    assert_eq!(m.max_principal, dec!(374495.73));
}

#[test]
fn test_max_principal_services_at_allowed_monthly() {
    let m = eligibility::calculate_max_loan(&fallback_input()).unwrap();
    let s = amortization::amortization_schedule(m.max_principal, dec!(24), 12, date(2025, 1, 1))
        .unwrap();
    assert_close(s.monthly_payment, m.allowed_monthly);
}

#[test]
fn test_zero_income_gives_zero_ceiling() {
    let out = eligibility::calculate_max_loan_with_metadata(&MaxLoanInput {
        income: Decimal::ZERO,
        ..fallback_input()
    })
    .unwrap();
    assert_eq!(out.result.max_principal, Decimal::ZERO);
    assert_eq!(out.warnings.len(), 1);
}

#[test]
fn test_dti_out_of_range_rejected() {
    for dti in [Decimal::ZERO, dec!(1.01)] {
        let err = eligibility::calculate_max_loan(&MaxLoanInput {
            dti_ratio: dti,
            ..fallback_input()
        })
        .unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }
}
