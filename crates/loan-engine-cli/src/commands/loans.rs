use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use loan_engine_core::origination::{Decision, LoanRequest};

use super::Context;
use crate::input;

/// A single user
#[derive(Args)]
pub struct UserArgs {
    /// User id
    #[arg(long)]
    pub user_id: i64,
}

pub type StatusArgs = UserArgs;
pub type HistoryArgs = UserArgs;

/// A borrower's request, used by both `calculate` and `apply`
#[derive(Args)]
pub struct RequestArgs {
    /// Path to JSON/YAML request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// User id
    #[arg(long)]
    pub user_id: Option<i64>,

    /// Requested principal
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Term in months
    #[arg(long, alias = "term")]
    pub term_months: Option<u32>,

    /// Monthly income
    #[arg(long)]
    pub income: Option<Decimal>,

    /// Employment status, e.g. "Employed"
    #[arg(long, default_value = "")]
    pub employment_status: String,

    /// Loan purpose
    #[arg(long)]
    pub purpose: Option<String>,
}

/// Arguments for reviewing a pending application
#[derive(Args)]
pub struct ReviewArgs {
    /// Application id
    #[arg(long)]
    pub application_id: i64,

    /// Approve the application
    #[arg(long, conflicts_with = "deny", required_unless_present = "deny")]
    pub approve: bool,

    /// Deny the application
    #[arg(long, requires = "reason")]
    pub deny: bool,

    /// Reason recorded with a denial
    #[arg(long)]
    pub reason: Option<String>,
}

fn read_request(args: RequestArgs) -> Result<LoanRequest, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        return input::file::read_structured(path);
    }
    if let Some(request) = input::stdin::read_stdin()? {
        return Ok(request);
    }
    Ok(LoanRequest {
        user_id: args
            .user_id
            .ok_or("--user-id is required (or provide --input)")?,
        amount: args.amount,
        term_months: args
            .term_months
            .ok_or("--term-months is required (or provide --input)")?,
        income: args
            .income
            .ok_or("--income is required (or provide --input)")?,
        employment_status: args.employment_status,
        purpose: args.purpose,
    })
}

pub fn run_eligibility(ctx: &Context, args: UserArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let service = ctx.service()?;
    Ok(serde_json::to_value(service.eligibility(args.user_id)?)?)
}

pub fn run_calculate(ctx: &Context, args: RequestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = read_request(args)?;
    let service = ctx.service()?;
    Ok(serde_json::to_value(service.calculate(&request)?)?)
}

pub fn run_apply(ctx: &Context, args: RequestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = read_request(args)?;
    let mut service = ctx.service()?;
    Ok(serde_json::to_value(service.apply(&request)?)?)
}

pub fn run_status(ctx: &Context, args: StatusArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let service = ctx.service()?;
    Ok(serde_json::to_value(service.status(args.user_id)?)?)
}

pub fn run_history(ctx: &Context, args: HistoryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let service = ctx.service()?;
    Ok(serde_json::to_value(service.history(args.user_id)?)?)
}

pub fn run_review(ctx: &Context, args: ReviewArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let decision = if args.deny {
        Decision::Deny {
            reason: args.reason.unwrap_or_default(),
        }
    } else {
        Decision::Approve
    };

    let mut service = ctx.service()?;
    let outcome = service.review(args.application_id, &decision)?;
    for task in outcome.failed_follow_ups() {
        tracing::warn!(?task, "follow-up failed and can be retried");
    }
    Ok(serde_json::to_value(outcome)?)
}
