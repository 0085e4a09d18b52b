use rust_decimal::Decimal;

use crate::amortization::amortization_schedule;
use crate::annuity::{monthly_payment, monthly_rate};
use crate::clock::{Clock, SystemClock};
use crate::config::LendingConfig;
use crate::eligibility::{calculate_max_loan, eligible_tiers, MaxLoan, MaxLoanInput};
use crate::error::{LoanEngineError, StoreError};
use crate::origination::model::*;
use crate::origination::store::{in_transaction, LoanReader, LoanStore, LoanWriter, RatingSource};
use crate::types::*;
use crate::LoanEngineResult;

const DEPOSIT_ACCOUNT: &str = "Deposit";
const SAVINGS_ACCOUNT: &str = "Savings";

/// Request-scoped loan operations over a store. Holds no state between calls
/// apart from the store handle, the clock and the static configuration.
pub struct LoanService<S, C = SystemClock> {
    pub(crate) store: S,
    pub(crate) clock: C,
    pub(crate) config: LendingConfig,
}

impl<S: LoanStore> LoanService<S, SystemClock> {
    pub fn new(store: S, config: LendingConfig) -> LoanEngineResult<Self> {
        Self::with_clock(store, SystemClock, config)
    }
}

impl<S: LoanStore, C: Clock> LoanService<S, C> {
    pub fn with_clock(store: S, clock: C, config: LendingConfig) -> LoanEngineResult<Self> {
        config.validate()?;
        Ok(LoanService {
            store,
            clock,
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    /// Balance totals and tier hints for the loan UI. Advisory only.
    pub fn eligibility(&self, user_id: UserId) -> LoanEngineResult<EligibilityReport> {
        let balances = self.store.account_balances(user_id)?;
        let total_of = |type_name: &str| -> Money {
            balances
                .iter()
                .filter(|b| b.type_name == type_name)
                .map(|b| b.balance)
                .sum()
        };
        let deposit_total = total_of(DEPOSIT_ACCOUNT);
        let savings_total = total_of(SAVINGS_ACCOUNT);
        let combined = deposit_total + savings_total;

        Ok(EligibilityReport {
            deposit_total,
            savings_total,
            combined,
            eligible_tiers: eligible_tiers(combined, &self.config.balance_tiers),
            active_loan: self.store.active_loan(user_id)?,
        })
    }

    /// Quote what the user could borrow, and what `amount` would cost if given.
    /// Nothing is written.
    pub fn calculate(&self, request: &LoanRequest) -> LoanEngineResult<LoanQuote> {
        request.validate_for_quote()?;

        let (inputs, max_loan) = rate(&self.store, &self.config, request)?;
        let apr = inputs.settings.base_interest_rate;

        let (monthly_for_requested, requested_schedule) = match request.amount {
            Some(amount) => {
                let monthly = monthly_payment(amount, monthly_rate(apr), request.term_months)?;
                let schedule = amortization_schedule(
                    amount,
                    apr,
                    request.term_months,
                    self.clock.today(),
                )?;
                (Some(round_cents(monthly)), Some(schedule))
            }
            None => (None, None),
        };

        Ok(LoanQuote {
            allowed_monthly: max_loan.allowed_monthly,
            max_principal: max_loan.max_principal,
            monthly_for_requested,
            requested_schedule,
            interest_rate: apr,
            credit_score: inputs.credit_score,
        })
    }

    /// Re-rate the user inside one transaction, enforce the ceiling, and
    /// persist a `Pending` application together with its audit entry.
    pub fn apply(&mut self, request: &LoanRequest) -> LoanEngineResult<ApplicationReceipt> {
        let amount = request.validate_for_apply()?;
        let config = &self.config;
        let now = self.clock.now();
        let today = self.clock.today();

        let receipt = in_transaction(&mut self.store, "apply", |tx| {
            let (inputs, max_loan) = rate(tx, config, request)?;

            if amount > max_loan.max_principal {
                return Err(LoanEngineError::RequestedAmountExceedsMax {
                    requested: amount,
                    max_principal: max_loan.max_principal,
                });
            }

            let apr = inputs.settings.base_interest_rate;
            let schedule = amortization_schedule(amount, apr, request.term_months, today)?;

            let application_id = tx.insert_application(&NewLoanApplication {
                user_id: request.user_id,
                loan_amount: amount,
                loan_term_months: request.term_months,
                income: request.income,
                employment_status: inputs.employment_status.clone(),
                purpose: request.purpose.clone(),
                calculated_max_loan: max_loan.max_principal,
                monthly_payment: schedule.monthly_payment,
                credit_score: inputs.credit_score,
                interest_rate: apr,
                repayment_schedule: schedule.schedule,
                status: ApplicationStatus::Pending,
                application_date: now,
            })?;

            tx.insert_audit_entry(&AuditEntry {
                actor_id: config.audit_actor_id,
                target_id: application_id,
                target_table: "loan_applications".into(),
                action: AuditAction::Create,
                remarks: "Application submitted".into(),
                created_at: now,
            })?;

            Ok(ApplicationReceipt {
                application_id,
                monthly_payment: schedule.monthly_payment,
                max_principal: max_loan.max_principal,
            })
        })?;

        tracing::info!(
            user_id = request.user_id,
            application_id = receipt.application_id,
            amount = %amount,
            "loan application submitted"
        );
        Ok(receipt)
    }

    /// Active loan (with next pending due date) and recent applications.
    pub fn status(&self, user_id: UserId) -> LoanEngineResult<LoanStatus> {
        Ok(LoanStatus {
            active_loan: self.store.active_loan(user_id)?,
            history: self
                .store
                .application_history(user_id, self.config.history_limit)?,
        })
    }

    /// Every scheduled payment across the user's loans, newest first.
    pub fn history(&self, user_id: UserId) -> LoanEngineResult<PaymentHistory> {
        Ok(PaymentHistory {
            payments: self.store.payment_history(user_id)?,
        })
    }
}

/// Fetch every rating input, apply fallbacks, and compute the ceiling.
/// Quoting and applying share this path so the two can never disagree.
pub(crate) fn rate<R>(
    source: &R,
    config: &LendingConfig,
    request: &LoanRequest,
) -> LoanEngineResult<(RatingInputs, MaxLoan)>
where
    R: RatingSource + ?Sized,
{
    let credit_score = source
        .credit_score(request.user_id)?
        .unwrap_or(config.fallback_credit_score);
    let employment_multiplier = match source.employment_multiplier(&request.employment_status)? {
        Some(m) if m < Decimal::ZERO => {
            return Err(corrupt(
                "employment_multipliers",
                format!("negative multiplier {m} for {:?}", request.employment_status),
            ))
        }
        Some(m) => m,
        None => config.fallback_employment_multiplier,
    };
    let credit_multiplier = match source.credit_multiplier(credit_score)? {
        Some(m) if m < Decimal::ZERO => {
            return Err(corrupt(
                "credit_tiers",
                format!("negative multiplier {m} for score {credit_score}"),
            ))
        }
        Some(m) => m,
        None => config.fallback_credit_multiplier,
    };
    let settings = match source.loan_settings()? {
        Some(s) if s.dti_ratio <= Decimal::ZERO || s.dti_ratio > Decimal::ONE => {
            return Err(corrupt(
                "loan_settings",
                format!("dti_ratio {} outside (0, 1]", s.dti_ratio),
            ))
        }
        Some(s) if s.base_interest_rate < Decimal::ZERO => {
            return Err(corrupt(
                "loan_settings",
                format!("negative base_interest_rate {}", s.base_interest_rate),
            ))
        }
        Some(s) => s,
        None => LoanSettings {
            dti_ratio: config.fallback_dti_ratio,
            base_interest_rate: config.fallback_annual_percent,
        },
    };

    let max_loan = calculate_max_loan(&MaxLoanInput {
        income: request.income,
        dti_ratio: settings.dti_ratio,
        employment_multiplier,
        credit_multiplier,
        annual_percent: settings.base_interest_rate,
        term_months: request.term_months,
    })?;

    tracing::debug!(
        user_id = request.user_id,
        credit_score,
        employment_multiplier = %employment_multiplier,
        credit_multiplier = %credit_multiplier,
        allowed_monthly = %max_loan.allowed_monthly,
        max_principal = %max_loan.max_principal,
        "rated loan request"
    );

    Ok((
        RatingInputs {
            income: request.income,
            employment_status: request.employment_status.clone(),
            credit_score,
            employment_multiplier,
            credit_multiplier,
            settings,
        },
        max_loan,
    ))
}

/// A stored rating input outside its valid range is a store fault, not a
/// problem with the caller's request.
fn corrupt(table: &str, reason: String) -> LoanEngineError {
    tracing::error!(table, %reason, "rating input out of range");
    StoreError::Corrupt {
        table: table.into(),
        reason,
    }
    .into()
}
