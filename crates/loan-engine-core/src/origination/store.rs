//! Persistence seams for origination.
//!
//! A [`LoanStore`] hands out transactions. Everything the service writes goes
//! through a transaction's [`LoanWriter`]; a transaction that is dropped
//! without [`UnitOfWork::commit`] rolls back.

use chrono::NaiveDate;

use crate::amortization::AmortizationEntry;
use crate::error::StoreError;
use crate::origination::model::*;
use crate::types::*;
use crate::LoanEngineResult;

pub type StoreResult<T> = Result<T, StoreError>;

/// Reads that feed a max-loan calculation. `None` means "no row"; callers
/// apply the configured fallback.
pub trait RatingSource {
    fn credit_score(&self, user_id: UserId) -> StoreResult<Option<i32>>;
    fn employment_multiplier(&self, employment_status: &str) -> StoreResult<Option<Multiple>>;
    /// Multiplier of the tier whose inclusive range contains `credit_score`.
    fn credit_multiplier(&self, credit_score: i32) -> StoreResult<Option<Multiple>>;
    fn loan_settings(&self) -> StoreResult<Option<LoanSettings>>;
}

pub trait LoanReader {
    fn account_balances(&self, user_id: UserId) -> StoreResult<Vec<AccountBalance>>;
    fn active_loan(&self, user_id: UserId) -> StoreResult<Option<ActiveLoan>>;
    /// Newest first.
    fn application_history(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> StoreResult<Vec<ApplicationSummary>>;
    /// Newest first.
    fn payment_history(&self, user_id: UserId) -> StoreResult<Vec<LoanPayment>>;
    fn application(&self, id: ApplicationId) -> StoreResult<Option<LoanApplication>>;
}

pub trait LoanWriter {
    fn insert_application(&self, application: &NewLoanApplication) -> StoreResult<ApplicationId>;
    fn insert_audit_entry(&self, entry: &AuditEntry) -> StoreResult<()>;
    fn set_application_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> StoreResult<()>;
    fn insert_loan(&self, loan: &NewLoan) -> StoreResult<LoanId>;
    fn insert_loan_payments(
        &self,
        loan_id: LoanId,
        schedule: &[AmortizationEntry],
    ) -> StoreResult<()>;
    /// Add `amount` to the user's account of `type_name` and mark it open.
    /// Returns `false` when no such account exists.
    fn credit_account(&self, user_id: UserId, type_name: &str, amount: Money)
        -> StoreResult<bool>;
    fn insert_transaction(&self, transaction: &LedgerTransaction) -> StoreResult<()>;
    fn insert_notification(&self, notification: &Notification) -> StoreResult<()>;
}

pub trait UnitOfWork {
    fn commit(self) -> StoreResult<()>;
}

pub trait LoanStore: RatingSource + LoanReader {
    type Tx<'a>: RatingSource + LoanReader + LoanWriter + UnitOfWork
    where
        Self: 'a;

    fn begin(&mut self) -> StoreResult<Self::Tx<'_>>;
}

/// Run `work` inside one transaction: commit on `Ok`, roll back on `Err`.
pub fn in_transaction<'s, S, T, F>(store: &'s mut S, operation: &str, work: F) -> LoanEngineResult<T>
where
    S: LoanStore,
    F: FnOnce(&S::Tx<'s>) -> LoanEngineResult<T>,
{
    let tx = store.begin().map_err(|e| {
        tracing::error!(operation, error = %e, "could not open transaction");
        e
    })?;

    match work(&tx) {
        Ok(value) => {
            tx.commit().map_err(|e| {
                tracing::error!(operation, error = %e, "commit failed");
                e
            })?;
            Ok(value)
        }
        Err(e) => {
            drop(tx);
            if e.is_client_error() {
                tracing::warn!(operation, code = e.code(), error = %e, "transaction rolled back");
            } else {
                tracing::error!(operation, error = %e, "transaction rolled back");
            }
            Err(e)
        }
    }
}

/// Last due date of a schedule, or `fallback` for an empty one.
pub(crate) fn schedule_end(schedule: &[AmortizationEntry], fallback: NaiveDate) -> NaiveDate {
    schedule.last().map(|e| e.due_date).unwrap_or(fallback)
}
