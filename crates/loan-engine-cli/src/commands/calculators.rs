use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use loan_engine_core::amortization::{self, ScheduleInput};
use loan_engine_core::annuity::{self, MonthlyPaymentInput};
use loan_engine_core::clock::SystemClock;
use loan_engine_core::eligibility::{self, MaxLoanInput};

use crate::input;

/// Arguments for the level monthly payment
#[derive(Args)]
pub struct MonthlyPaymentArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// APR as a percent (24 = 24%)
    #[arg(long, alias = "apr")]
    pub annual_percent: Option<Decimal>,

    /// Term in months
    #[arg(long, alias = "term")]
    pub term_months: Option<u32>,
}

/// Arguments for an amortization schedule
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// APR as a percent (24 = 24%)
    #[arg(long, alias = "apr")]
    pub annual_percent: Option<Decimal>,

    /// Term in months
    #[arg(long, alias = "term")]
    pub term_months: Option<u32>,

    /// Start date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
}

/// Arguments for the maximum-loan calculation
#[derive(Args)]
pub struct MaxLoanArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Monthly income
    #[arg(long)]
    pub income: Option<Decimal>,

    /// Debt-to-income ratio in (0, 1]
    #[arg(long, alias = "dti", default_value = "0.30")]
    pub dti_ratio: Decimal,

    /// Employment multiplier
    #[arg(long, default_value = "1.0")]
    pub employment_multiplier: Decimal,

    /// Credit multiplier
    #[arg(long, default_value = "0.8")]
    pub credit_multiplier: Decimal,

    /// APR as a percent (24 = 24%)
    #[arg(long, alias = "apr", default_value = "24")]
    pub annual_percent: Decimal,

    /// Term in months
    #[arg(long, alias = "term")]
    pub term_months: Option<u32>,
}

pub fn run_monthly_payment(args: MonthlyPaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let payment_input: MonthlyPaymentInput = if let Some(ref path) = args.input {
        input::file::read_structured(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        MonthlyPaymentInput {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_percent: args
                .annual_percent
                .ok_or("--annual-percent is required (or provide --input)")?,
            term_months: args
                .term_months
                .ok_or("--term-months is required (or provide --input)")?,
        }
    };

    let result = annuity::calculate_monthly_payment(&payment_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let schedule_input: ScheduleInput = if let Some(ref path) = args.input {
        input::file::read_structured(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        ScheduleInput {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_percent: args
                .annual_percent
                .ok_or("--annual-percent is required (or provide --input)")?,
            term_months: args
                .term_months
                .ok_or("--term-months is required (or provide --input)")?,
            start_date: args.start_date,
        }
    };

    let result = amortization::calculate_schedule(&schedule_input, &SystemClock)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_max_loan(args: MaxLoanArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let max_loan_input: MaxLoanInput = if let Some(ref path) = args.input {
        input::file::read_structured(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        MaxLoanInput {
            income: args
                .income
                .ok_or("--income is required (or provide --input)")?,
            dti_ratio: args.dti_ratio,
            employment_multiplier: args.employment_multiplier,
            credit_multiplier: args.credit_multiplier,
            annual_percent: args.annual_percent,
            term_months: args
                .term_months
                .ok_or("--term-months is required (or provide --input)")?,
        }
    };

    let result = eligibility::calculate_max_loan_with_metadata(&max_loan_input)?;
    Ok(serde_json::to_value(result)?)
}
