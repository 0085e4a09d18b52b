use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::amortization::{AmortizationEntry, AmortizationSchedule};
use crate::error::LoanEngineError;
use crate::types::*;
use crate::LoanEngineResult;

#[derive(Debug, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Denied,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Approved => "Approved",
            ApplicationStatus::Denied => "Denied",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ApplicationStatus::Pending),
            "Approved" => Ok(ApplicationStatus::Approved),
            "Denied" => Ok(ApplicationStatus::Denied),
            other => Err(UnknownVariant {
                kind: "application status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Overdue => "Overdue",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(PaymentStatus::Pending),
            "Paid" => Ok(PaymentStatus::Paid),
            "Overdue" => Ok(PaymentStatus::Overdue),
            other => Err(UnknownVariant {
                kind: "payment status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    Create,
    Update,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "Create",
            AuditAction::Update => "Update",
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound request
// ---------------------------------------------------------------------------

/// A borrower's request as it arrives for quoting or applying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRequest {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Money>,
    pub term_months: u32,
    /// Monthly income.
    pub income: Money,
    #[serde(default)]
    pub employment_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

impl LoanRequest {
    /// Checks shared by quoting and applying. Runs before any store access.
    pub fn validate_for_quote(&self) -> LoanEngineResult<()> {
        if self.term_months == 0 {
            return Err(LoanEngineError::invalid(
                "term_months",
                "Term must be at least 1 month",
            ));
        }
        if self.income < Decimal::ZERO {
            return Err(LoanEngineError::invalid("income", "Income cannot be negative"));
        }
        if let Some(amount) = self.amount {
            if amount <= Decimal::ZERO {
                return Err(LoanEngineError::invalid("amount", "Amount must be positive"));
            }
        }
        Ok(())
    }

    /// Applying additionally requires an amount; returns it.
    pub fn validate_for_apply(&self) -> LoanEngineResult<Money> {
        self.validate_for_quote()?;
        self.amount
            .ok_or_else(|| LoanEngineError::invalid("amount", "Amount is required to apply"))
    }
}

// ---------------------------------------------------------------------------
// Rating inputs
// ---------------------------------------------------------------------------

/// Global lending settings, read fresh for every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSettings {
    pub dti_ratio: Rate,
    /// APR as a percent.
    pub base_interest_rate: Decimal,
}

/// Every input to a max-loan calculation after defaults have been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingInputs {
    pub income: Money,
    pub employment_status: String,
    pub credit_score: i32,
    pub employment_multiplier: Multiple,
    pub credit_multiplier: Multiple,
    pub settings: LoanSettings,
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoanApplication {
    pub user_id: UserId,
    pub loan_amount: Money,
    pub loan_term_months: u32,
    pub income: Money,
    pub employment_status: String,
    pub purpose: Option<String>,
    pub calculated_max_loan: Money,
    pub monthly_payment: Money,
    pub credit_score: i32,
    pub interest_rate: Decimal,
    pub repayment_schedule: Vec<AmortizationEntry>,
    pub status: ApplicationStatus,
    pub application_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: ApplicationId,
    pub user_id: UserId,
    pub loan_amount: Money,
    pub loan_term_months: u32,
    pub income: Money,
    pub employment_status: String,
    pub purpose: Option<String>,
    pub calculated_max_loan: Money,
    pub monthly_payment: Money,
    pub credit_score: i32,
    pub interest_rate: Decimal,
    pub repayment_schedule: Vec<AmortizationEntry>,
    pub status: ApplicationStatus,
    pub application_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSummary {
    pub application_id: ApplicationId,
    pub loan_amount: Money,
    pub loan_term_months: u32,
    pub status: ApplicationStatus,
    pub application_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub actor_id: UserId,
    pub target_id: i64,
    pub target_table: String,
    pub action: AuditAction,
    pub remarks: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub type_name: String,
    pub balance: Money,
    pub account_status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveLoan {
    pub loan_id: LoanId,
    pub application_id: ApplicationId,
    pub principal: Money,
    pub interest_rate: Decimal,
    pub term_months: u32,
    pub monthly_payment: Money,
    pub remaining_balance: Money,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub next_due: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoan {
    pub application_id: ApplicationId,
    pub user_id: UserId,
    pub principal: Money,
    pub interest_rate: Decimal,
    pub term_months: u32,
    pub monthly_payment: Money,
    pub remaining_balance: Money,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanPayment {
    pub payment_id: i64,
    pub loan_id: LoanId,
    pub user_id: UserId,
    pub period: u32,
    pub payment_date: NaiveDate,
    pub amount: Money,
    pub principal: Money,
    pub interest: Money,
    pub status: PaymentStatus,
    /// Original principal of the loan this payment belongs to.
    pub loan_principal: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub user_id: UserId,
    pub transaction_type: String,
    pub amount: Money,
    pub reference_number: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityReport {
    pub deposit_total: Money,
    pub savings_total: Money,
    pub combined: Money,
    pub eligible_tiers: Vec<String>,
    #[serde(rename = "activeLoan")]
    pub active_loan: Option<ActiveLoan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanQuote {
    #[serde(rename = "allowedMonthly")]
    pub allowed_monthly: Money,
    #[serde(rename = "maxPrincipal")]
    pub max_principal: Money,
    #[serde(rename = "monthlyForRequested")]
    pub monthly_for_requested: Option<Money>,
    #[serde(rename = "requestedSchedule")]
    pub requested_schedule: Option<AmortizationSchedule>,
    #[serde(rename = "interestRate")]
    pub interest_rate: Decimal,
    pub credit_score: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationReceipt {
    #[serde(rename = "applicationId")]
    pub application_id: ApplicationId,
    pub monthly_payment: Money,
    #[serde(rename = "maxPrincipal")]
    pub max_principal: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanStatus {
    #[serde(rename = "activeLoan")]
    pub active_loan: Option<ActiveLoan>,
    pub history: Vec<ApplicationSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentHistory {
    pub payments: Vec<LoanPayment>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> LoanRequest {
        LoanRequest {
            user_id: 7,
            amount: Some(dec!(10_000)),
            term_months: 12,
            income: dec!(20_000),
            employment_status: "Employed".into(),
            purpose: Some("Car".into()),
        }
    }

    #[test]
    fn test_status_text_round_trip() {
        for status in [
            ApplicationStatus::Pending,
            ApplicationStatus::Approved,
            ApplicationStatus::Denied,
        ] {
            assert_eq!(status.as_str().parse::<ApplicationStatus>().unwrap(), status);
        }
        assert!("Cancelled".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn test_apply_requires_amount() {
        let req = LoanRequest { amount: None, ..request() };
        assert!(req.validate_for_quote().is_ok());
        match req.validate_for_apply().unwrap_err() {
            LoanEngineError::InvalidInput { field, .. } => assert_eq!(field, "amount"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_term_income_amount() {
        let zero_term = LoanRequest { term_months: 0, ..request() };
        let neg_income = LoanRequest { income: dec!(-5), ..request() };
        let zero_amount = LoanRequest { amount: Some(Decimal::ZERO), ..request() };
        for (req, field) in [
            (zero_term, "term_months"),
            (neg_income, "income"),
            (zero_amount, "amount"),
        ] {
            match req.validate_for_quote().unwrap_err() {
                LoanEngineError::InvalidInput { field: f, .. } => assert_eq!(f, field),
                other => panic!("Expected InvalidInput, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_request_deserializes_without_optional_fields() {
        let req: LoanRequest =
            serde_json::from_str(r#"{"user_id": 3, "term_months": 24, "income": "15000"}"#).unwrap();
        assert_eq!(req.amount, None);
        assert_eq!(req.employment_status, "");
        assert_eq!(req.purpose, None);
    }

    #[test]
    fn test_receipt_wire_names() {
        let receipt = ApplicationReceipt {
            application_id: 12,
            monthly_payment: dec!(945.60),
            max_principal: dec!(50761.64),
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["applicationId"], 12);
        assert_eq!(json["monthly_payment"], "945.60");
        assert_eq!(json["maxPrincipal"], "50761.64");
    }
}
