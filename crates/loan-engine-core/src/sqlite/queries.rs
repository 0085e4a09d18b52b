//! SQL for the origination traits. Every function takes a plain connection so
//! the same statements serve both autocommit reads and open transactions.

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::amortization::AmortizationEntry;
use crate::origination::model::*;
use crate::origination::store::StoreResult;
use crate::types::*;

// ---------------------------------------------------------------------------
// Column helpers
// ---------------------------------------------------------------------------

/// Parse a TEXT column with `FromStr` (decimals, status enums).
fn parse_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn schedule_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<AmortizationEntry>> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ---------------------------------------------------------------------------
// Rating inputs
// ---------------------------------------------------------------------------

pub(crate) fn credit_score(conn: &Connection, user_id: UserId) -> StoreResult<Option<i32>> {
    let score: Option<Option<i32>> = conn
        .query_row(
            "SELECT credit_score FROM users WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(score.flatten())
}

pub(crate) fn employment_multiplier(
    conn: &Connection,
    employment_status: &str,
) -> StoreResult<Option<Multiple>> {
    let multiplier = conn
        .query_row(
            "SELECT multiplier FROM employment_multipliers WHERE employment_status = ?1",
            params![employment_status],
            |row| parse_col::<Decimal>(row, 0),
        )
        .optional()?;
    Ok(multiplier)
}

pub(crate) fn credit_multiplier(conn: &Connection, credit_score: i32) -> StoreResult<Option<Multiple>> {
    let multiplier = conn
        .query_row(
            "SELECT multiplier FROM credit_tiers
             WHERE ?1 BETWEEN min_score AND max_score
             ORDER BY min_score DESC, tier_id ASC LIMIT 1",
            params![credit_score],
            |row| parse_col::<Decimal>(row, 0),
        )
        .optional()?;
    Ok(multiplier)
}

pub(crate) fn loan_settings(conn: &Connection) -> StoreResult<Option<LoanSettings>> {
    let settings = conn
        .query_row(
            "SELECT dti_ratio, base_interest_rate FROM loan_settings WHERE settings_id = 1",
            [],
            |row| {
                Ok(LoanSettings {
                    dti_ratio: parse_col(row, 0)?,
                    base_interest_rate: parse_col(row, 1)?,
                })
            },
        )
        .optional()?;
    Ok(settings)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

pub(crate) fn account_balances(conn: &Connection, user_id: UserId) -> StoreResult<Vec<AccountBalance>> {
    let mut stmt = conn.prepare(
        "SELECT type_name, balance, account_status FROM account_type
         WHERE user_id = ?1 ORDER BY type_id",
    )?;
    let balances = stmt
        .query_map(params![user_id], |row| {
            Ok(AccountBalance {
                type_name: row.get(0)?,
                balance: parse_col(row, 1)?,
                account_status: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(balances)
}

pub(crate) fn active_loan(conn: &Connection, user_id: UserId) -> StoreResult<Option<ActiveLoan>> {
    let loan = conn
        .query_row(
            "SELECT l.loan_id, l.application_id, l.principal, l.interest_rate, l.term_months,
                    l.monthly_payment, l.remaining_balance, l.status, l.start_date, l.end_date,
                    (SELECT MIN(p.payment_date) FROM loan_payments p
                      WHERE p.loan_id = l.loan_id AND p.status = 'Pending') AS next_due
             FROM loans l
             WHERE l.user_id = ?1 AND l.status = 'Active'
             ORDER BY l.loan_id ASC LIMIT 1",
            params![user_id],
            |row| {
                Ok(ActiveLoan {
                    loan_id: row.get(0)?,
                    application_id: row.get(1)?,
                    principal: parse_col(row, 2)?,
                    interest_rate: parse_col(row, 3)?,
                    term_months: row.get(4)?,
                    monthly_payment: parse_col(row, 5)?,
                    remaining_balance: parse_col(row, 6)?,
                    status: row.get(7)?,
                    start_date: row.get(8)?,
                    end_date: row.get(9)?,
                    next_due: row.get(10)?,
                })
            },
        )
        .optional()?;
    Ok(loan)
}

pub(crate) fn application_history(
    conn: &Connection,
    user_id: UserId,
    limit: u32,
) -> StoreResult<Vec<ApplicationSummary>> {
    let mut stmt = conn.prepare(
        "SELECT application_id, loan_amount, loan_term_months, status, application_date
         FROM loan_applications WHERE user_id = ?1
         ORDER BY application_date DESC, application_id DESC LIMIT ?2",
    )?;
    let history = stmt
        .query_map(params![user_id, limit], |row| {
            Ok(ApplicationSummary {
                application_id: row.get(0)?,
                loan_amount: parse_col(row, 1)?,
                loan_term_months: row.get(2)?,
                status: parse_col(row, 3)?,
                application_date: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(history)
}

pub(crate) fn payment_history(conn: &Connection, user_id: UserId) -> StoreResult<Vec<LoanPayment>> {
    let mut stmt = conn.prepare(
        "SELECT p.payment_id, p.loan_id, l.user_id, p.period, p.payment_date, p.amount,
                p.principal, p.interest, p.status, l.principal
         FROM loan_payments p
         JOIN loans l ON l.loan_id = p.loan_id
         WHERE l.user_id = ?1
         ORDER BY p.payment_date DESC, p.loan_id DESC, p.period DESC",
    )?;
    let payments = stmt
        .query_map(params![user_id], |row| {
            Ok(LoanPayment {
                payment_id: row.get(0)?,
                loan_id: row.get(1)?,
                user_id: row.get(2)?,
                period: row.get(3)?,
                payment_date: row.get(4)?,
                amount: parse_col(row, 5)?,
                principal: parse_col(row, 6)?,
                interest: parse_col(row, 7)?,
                status: parse_col(row, 8)?,
                loan_principal: parse_col(row, 9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(payments)
}

pub(crate) fn application(conn: &Connection, id: ApplicationId) -> StoreResult<Option<LoanApplication>> {
    let application = conn
        .query_row(
            "SELECT application_id, user_id, loan_amount, loan_term_months, income,
                    employment_status, purpose, calculated_max_loan, monthly_payment,
                    credit_score, interest_rate, repayment_schedule, status, application_date
             FROM loan_applications WHERE application_id = ?1",
            params![id],
            |row| {
                Ok(LoanApplication {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    loan_amount: parse_col(row, 2)?,
                    loan_term_months: row.get(3)?,
                    income: parse_col(row, 4)?,
                    employment_status: row.get(5)?,
                    purpose: row.get(6)?,
                    calculated_max_loan: parse_col(row, 7)?,
                    monthly_payment: parse_col(row, 8)?,
                    credit_score: row.get(9)?,
                    interest_rate: parse_col(row, 10)?,
                    repayment_schedule: schedule_col(row, 11)?,
                    status: parse_col(row, 12)?,
                    application_date: row.get(13)?,
                })
            },
        )
        .optional()?;
    Ok(application)
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

pub(crate) fn insert_application(
    conn: &Connection,
    application: &NewLoanApplication,
) -> StoreResult<ApplicationId> {
    let schedule_json = serde_json::to_string(&application.repayment_schedule)?;
    conn.execute(
        "INSERT INTO loan_applications
         (user_id, loan_amount, loan_term_months, income, employment_status, purpose,
          calculated_max_loan, monthly_payment, credit_score, interest_rate,
          repayment_schedule, status, application_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            application.user_id,
            application.loan_amount.to_string(),
            application.loan_term_months,
            application.income.to_string(),
            application.employment_status,
            application.purpose,
            application.calculated_max_loan.to_string(),
            application.monthly_payment.to_string(),
            application.credit_score,
            application.interest_rate.to_string(),
            schedule_json,
            application.status.as_str(),
            application.application_date,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn insert_audit_entry(conn: &Connection, entry: &AuditEntry) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO admin_actions (user_id, target_id, target_table, action_type, remarks, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.actor_id,
            entry.target_id,
            entry.target_table,
            entry.action.as_str(),
            entry.remarks,
            entry.created_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn set_application_status(
    conn: &Connection,
    id: ApplicationId,
    status: ApplicationStatus,
) -> StoreResult<()> {
    conn.execute(
        "UPDATE loan_applications SET status = ?2 WHERE application_id = ?1",
        params![id, status.as_str()],
    )?;
    Ok(())
}

pub(crate) fn insert_loan(conn: &Connection, loan: &NewLoan) -> StoreResult<LoanId> {
    conn.execute(
        "INSERT INTO loans
         (application_id, user_id, principal, interest_rate, term_months, monthly_payment,
          remaining_balance, status, start_date, end_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'Active', ?8, ?9)",
        params![
            loan.application_id,
            loan.user_id,
            loan.principal.to_string(),
            loan.interest_rate.to_string(),
            loan.term_months,
            loan.monthly_payment.to_string(),
            loan.remaining_balance.to_string(),
            loan.start_date,
            loan.end_date,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn insert_loan_payments(
    conn: &Connection,
    loan_id: LoanId,
    schedule: &[AmortizationEntry],
) -> StoreResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO loan_payments (loan_id, period, payment_date, amount, principal, interest, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for entry in schedule {
        stmt.execute(params![
            loan_id,
            entry.period,
            entry.due_date,
            entry.payment.to_string(),
            entry.principal.to_string(),
            entry.interest.to_string(),
            PaymentStatus::Pending.as_str(),
        ])?;
    }
    Ok(())
}

pub(crate) fn credit_account(
    conn: &Connection,
    user_id: UserId,
    type_name: &str,
    amount: Money,
) -> StoreResult<bool> {
    let current: Option<(i64, Decimal)> = conn
        .query_row(
            "SELECT type_id, balance FROM account_type WHERE user_id = ?1 AND type_name = ?2",
            params![user_id, type_name],
            |row| Ok((row.get(0)?, parse_col(row, 1)?)),
        )
        .optional()?;

    let Some((type_id, balance)) = current else {
        return Ok(false);
    };

    conn.execute(
        "UPDATE account_type SET balance = ?2, account_status = 'Open' WHERE type_id = ?1",
        params![type_id, round_cents(balance + amount).to_string()],
    )?;
    Ok(true)
}

pub(crate) fn insert_transaction(conn: &Connection, transaction: &LedgerTransaction) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO transactions (user_id, transaction_type, amount, reference_number, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            transaction.user_id,
            transaction.transaction_type,
            transaction.amount.to_string(),
            transaction.reference_number,
            transaction.created_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_notification(conn: &Connection, notification: &Notification) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO notifications (user_id, message, is_read, created_at) VALUES (?1, ?2, 0, ?3)",
        params![notification.user_id, notification.message, notification.created_at],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Admin configuration
// ---------------------------------------------------------------------------

pub(crate) fn put_loan_settings(conn: &Connection, settings: &LoanSettings) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO loan_settings (settings_id, dti_ratio, base_interest_rate)
         VALUES (1, ?1, ?2)
         ON CONFLICT(settings_id) DO UPDATE SET
            dti_ratio = excluded.dti_ratio,
            base_interest_rate = excluded.base_interest_rate",
        params![
            settings.dti_ratio.to_string(),
            settings.base_interest_rate.to_string()
        ],
    )?;
    Ok(())
}

pub(crate) fn put_employment_multiplier(
    conn: &Connection,
    employment_status: &str,
    multiplier: Multiple,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO employment_multipliers (employment_status, multiplier) VALUES (?1, ?2)
         ON CONFLICT(employment_status) DO UPDATE SET multiplier = excluded.multiplier",
        params![employment_status, multiplier.to_string()],
    )?;
    Ok(())
}

pub(crate) fn put_credit_tier(
    conn: &Connection,
    min_score: i32,
    max_score: i32,
    multiplier: Multiple,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO credit_tiers (min_score, max_score, multiplier) VALUES (?1, ?2, ?3)",
        params![min_score, max_score, multiplier.to_string()],
    )?;
    Ok(())
}

pub(crate) fn upsert_user(
    conn: &Connection,
    user_id: UserId,
    full_name: &str,
    credit_score: Option<i32>,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO users (user_id, full_name, credit_score) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET
            full_name = excluded.full_name,
            credit_score = excluded.credit_score",
        params![user_id, full_name, credit_score],
    )?;
    Ok(())
}

pub(crate) fn open_account(
    conn: &Connection,
    user_id: UserId,
    type_name: &str,
    balance: Money,
    account_status: &str,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO account_type (user_id, type_name, balance, account_status)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id, type_name) DO UPDATE SET
            balance = excluded.balance,
            account_status = excluded.account_status",
        params![user_id, type_name, balance.to_string(), account_status],
    )?;
    Ok(())
}
