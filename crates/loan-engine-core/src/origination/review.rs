//! Admin decisions on pending applications, and the best-effort follow-ups
//! (disbursement, notification) that run after the decision has committed.

use serde::{Deserialize, Serialize};

use crate::amortization::amortization_schedule;
use crate::clock::Clock;
use crate::error::LoanEngineError;
use crate::origination::model::*;
use crate::origination::service::LoanService;
use crate::origination::store::{in_transaction, schedule_end, LoanReader, LoanStore, LoanWriter};
use crate::types::*;
use crate::LoanEngineResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Deny { reason: String },
}

/// Work queued after a committed review. Each task runs in its own
/// transaction and may be retried on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum FollowUp {
    Disburse {
        user_id: UserId,
        loan_id: LoanId,
        amount: Money,
    },
    Notify {
        user_id: UserId,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FollowUpStatus {
    Done,
    Failed { code: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpReport {
    pub task: FollowUp,
    pub status: FollowUpStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    pub loan_id: Option<LoanId>,
    pub follow_ups: Vec<FollowUpReport>,
}

impl ReviewOutcome {
    pub fn failed_follow_ups(&self) -> impl Iterator<Item = &FollowUp> {
        self.follow_ups
            .iter()
            .filter(|r| matches!(r.status, FollowUpStatus::Failed { .. }))
            .map(|r| &r.task)
    }
}

impl<S: LoanStore, C: Clock> LoanService<S, C> {
    /// Decide a `Pending` application. The decision, the loan and its payment
    /// rows commit together; follow-ups run afterwards and cannot undo it.
    pub fn review(
        &mut self,
        application_id: ApplicationId,
        decision: &Decision,
    ) -> LoanEngineResult<ReviewOutcome> {
        let now = self.clock.now();
        let today = self.clock.today();
        let actor_id = self.config.audit_actor_id;

        let (status, loan_id, tasks) = in_transaction(&mut self.store, "review", |tx| {
            let application = tx.application(application_id)?.ok_or_else(|| {
                LoanEngineError::NotFound {
                    entity: "loan application".into(),
                    id: application_id.to_string(),
                }
            })?;

            if application.status != ApplicationStatus::Pending {
                return Err(LoanEngineError::InvalidState {
                    entity: "loan application".into(),
                    id: application_id.to_string(),
                    reason: format!("already {}", application.status),
                });
            }

            match decision {
                Decision::Approve => {
                    tx.set_application_status(application_id, ApplicationStatus::Approved)?;

                    // Repayment starts from the approval date, not the application date.
                    let schedule = amortization_schedule(
                        application.loan_amount,
                        application.interest_rate,
                        application.loan_term_months,
                        today,
                    )?;
                    let loan_id = tx.insert_loan(&NewLoan {
                        application_id,
                        user_id: application.user_id,
                        principal: application.loan_amount,
                        interest_rate: application.interest_rate,
                        term_months: application.loan_term_months,
                        monthly_payment: schedule.monthly_payment,
                        remaining_balance: application.loan_amount,
                        start_date: today,
                        end_date: schedule_end(&schedule.schedule, today),
                    })?;
                    tx.insert_loan_payments(loan_id, &schedule.schedule)?;
                    tx.insert_audit_entry(&AuditEntry {
                        actor_id,
                        target_id: application_id,
                        target_table: "loan_applications".into(),
                        action: AuditAction::Update,
                        remarks: format!("Application approved; loan {loan_id} opened"),
                        created_at: now,
                    })?;

                    let tasks = vec![
                        FollowUp::Disburse {
                            user_id: application.user_id,
                            loan_id,
                            amount: application.loan_amount,
                        },
                        FollowUp::Notify {
                            user_id: application.user_id,
                            message: format!(
                                "Your loan application #{application_id} for {} was approved.",
                                application.loan_amount
                            ),
                        },
                    ];
                    Ok((ApplicationStatus::Approved, Some(loan_id), tasks))
                }
                Decision::Deny { reason } => {
                    tx.set_application_status(application_id, ApplicationStatus::Denied)?;
                    tx.insert_audit_entry(&AuditEntry {
                        actor_id,
                        target_id: application_id,
                        target_table: "loan_applications".into(),
                        action: AuditAction::Update,
                        remarks: format!("Application denied: {reason}"),
                        created_at: now,
                    })?;

                    let tasks = vec![FollowUp::Notify {
                        user_id: application.user_id,
                        message: format!("Your loan application #{application_id} was denied."),
                    }];
                    Ok((ApplicationStatus::Denied, None, tasks))
                }
            }
        })?;

        tracing::info!(application_id, status = %status, ?loan_id, "loan application reviewed");

        let follow_ups = tasks
            .into_iter()
            .map(|task| {
                let status = match self.run_follow_up(&task) {
                    Ok(()) => FollowUpStatus::Done,
                    Err(e) => FollowUpStatus::Failed {
                        code: e.code().to_string(),
                        reason: e.client_message(),
                    },
                };
                FollowUpReport { task, status }
            })
            .collect();

        Ok(ReviewOutcome {
            application_id,
            status,
            loan_id,
            follow_ups,
        })
    }

    /// Execute one follow-up in its own transaction. Failures are logged and
    /// returned; they never touch the decision that queued the task.
    pub fn run_follow_up(&mut self, task: &FollowUp) -> LoanEngineResult<()> {
        let now = self.clock.now();
        let today = self.clock.today();
        let loan_account_type = self.config.loan_account_type.as_str();

        let result = in_transaction(&mut self.store, "follow_up", |tx| match task {
            FollowUp::Disburse {
                user_id,
                loan_id,
                amount,
            } => {
                if !tx.credit_account(*user_id, loan_account_type, *amount)? {
                    return Err(LoanEngineError::NotFound {
                        entity: format!("{loan_account_type} account"),
                        id: user_id.to_string(),
                    });
                }
                tx.insert_transaction(&LedgerTransaction {
                    user_id: *user_id,
                    transaction_type: "Loan Disbursement".into(),
                    amount: *amount,
                    reference_number: format!("LOAN-{loan_id}-{}", today.format("%Y%m%d")),
                    created_at: now,
                })?;
                Ok(())
            }
            FollowUp::Notify { user_id, message } => {
                tx.insert_notification(&Notification {
                    user_id: *user_id,
                    message: message.clone(),
                    created_at: now,
                })?;
                Ok(())
            }
        });

        match &result {
            Ok(()) => tracing::debug!(?task, "follow-up completed"),
            Err(e) => tracing::error!(
                ?task,
                error = %e,
                "follow-up failed; the committed decision stands"
            ),
        }
        result
    }
}
