//! SQLite implementation of the origination store.
//!
//! Money and rate columns hold decimal strings. The repayment schedule of an
//! application is kept as a JSON array.

mod queries;

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::amortization::AmortizationEntry;
use crate::origination::model::*;
use crate::origination::store::{
    LoanReader, LoanStore, LoanWriter, RatingSource, StoreResult, UnitOfWork,
};
use crate::types::*;

const SCHEMA: &str = include_str!("../../migrations/001_loan_engine.sql");
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed loan store
pub struct SqliteStore {
    conn: Connection,
}

/// An open write transaction. Rolls back when dropped without `commit`.
pub struct SqliteTx<'a>(Transaction<'a>);

impl SqliteStore {
    /// Open (or create) a database file and bring its schema up to date.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Apply the schema. Idempotent.
    pub fn migrate(&self) -> StoreResult<()> {
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        self.conn.busy_timeout(BUSY_TIMEOUT)?;
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Raw connection, for fixtures and inspection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // -----------------------------------------------------------------------
    // Admin configuration
    // -----------------------------------------------------------------------

    pub fn put_loan_settings(&self, settings: &LoanSettings) -> StoreResult<()> {
        queries::put_loan_settings(&self.conn, settings)
    }

    pub fn put_employment_multiplier(
        &self,
        employment_status: &str,
        multiplier: Multiple,
    ) -> StoreResult<()> {
        queries::put_employment_multiplier(&self.conn, employment_status, multiplier)
    }

    /// Tiers are matched on an inclusive `[min_score, max_score]` range.
    pub fn put_credit_tier(
        &self,
        min_score: i32,
        max_score: i32,
        multiplier: Multiple,
    ) -> StoreResult<()> {
        queries::put_credit_tier(&self.conn, min_score, max_score, multiplier)
    }

    pub fn upsert_user(
        &self,
        user_id: UserId,
        full_name: &str,
        credit_score: Option<i32>,
    ) -> StoreResult<()> {
        queries::upsert_user(&self.conn, user_id, full_name, credit_score)
    }

    pub fn open_account(
        &self,
        user_id: UserId,
        type_name: &str,
        balance: Money,
        account_status: &str,
    ) -> StoreResult<()> {
        queries::open_account(&self.conn, user_id, type_name, balance, account_status)
    }

    /// Load a whole fixture in one transaction.
    pub fn load_seed(&mut self, seed: &SeedData) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        if let Some(settings) = &seed.loan_settings {
            queries::put_loan_settings(&tx, settings)?;
        }
        for m in &seed.employment_multipliers {
            queries::put_employment_multiplier(&tx, &m.employment_status, m.multiplier)?;
        }
        for t in &seed.credit_tiers {
            queries::put_credit_tier(&tx, t.min_score, t.max_score, t.multiplier)?;
        }
        for u in &seed.users {
            queries::upsert_user(&tx, u.user_id, &u.full_name, u.credit_score)?;
            for a in &u.accounts {
                queries::open_account(&tx, u.user_id, &a.type_name, a.balance, &a.account_status)?;
            }
        }
        tx.commit()?;

        tracing::info!(
            users = seed.users.len(),
            credit_tiers = seed.credit_tiers.len(),
            employment_multipliers = seed.employment_multipliers.len(),
            "seed loaded"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Seed fixtures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub loan_settings: Option<LoanSettings>,
    pub employment_multipliers: Vec<SeedEmploymentMultiplier>,
    pub credit_tiers: Vec<SeedCreditTier>,
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedEmploymentMultiplier {
    pub employment_status: String,
    pub multiplier: Multiple,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCreditTier {
    pub min_score: i32,
    pub max_score: i32,
    pub multiplier: Multiple,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedUser {
    pub user_id: UserId,
    pub full_name: String,
    #[serde(default)]
    pub credit_score: Option<i32>,
    #[serde(default)]
    pub accounts: Vec<SeedAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAccount {
    pub type_name: String,
    pub balance: Money,
    #[serde(default = "default_account_status")]
    pub account_status: String,
}

fn default_account_status() -> String {
    "Open".to_string()
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

/// Reads are identical inside and outside a transaction.
macro_rules! impl_reads {
    ($ty:ty, $field:tt) => {
        impl RatingSource for $ty {
            fn credit_score(&self, user_id: UserId) -> StoreResult<Option<i32>> {
                queries::credit_score(&self.$field, user_id)
            }

            fn employment_multiplier(&self, employment_status: &str) -> StoreResult<Option<Multiple>> {
                queries::employment_multiplier(&self.$field, employment_status)
            }

            fn credit_multiplier(&self, credit_score: i32) -> StoreResult<Option<Multiple>> {
                queries::credit_multiplier(&self.$field, credit_score)
            }

            fn loan_settings(&self) -> StoreResult<Option<LoanSettings>> {
                queries::loan_settings(&self.$field)
            }
        }

        impl LoanReader for $ty {
            fn account_balances(&self, user_id: UserId) -> StoreResult<Vec<AccountBalance>> {
                queries::account_balances(&self.$field, user_id)
            }

            fn active_loan(&self, user_id: UserId) -> StoreResult<Option<ActiveLoan>> {
                queries::active_loan(&self.$field, user_id)
            }

            fn application_history(
                &self,
                user_id: UserId,
                limit: u32,
            ) -> StoreResult<Vec<ApplicationSummary>> {
                queries::application_history(&self.$field, user_id, limit)
            }

            fn payment_history(&self, user_id: UserId) -> StoreResult<Vec<LoanPayment>> {
                queries::payment_history(&self.$field, user_id)
            }

            fn application(&self, id: ApplicationId) -> StoreResult<Option<LoanApplication>> {
                queries::application(&self.$field, id)
            }
        }
    };
}

impl_reads!(SqliteStore, conn);
impl_reads!(SqliteTx<'_>, 0);

impl LoanWriter for SqliteTx<'_> {
    fn insert_application(&self, application: &NewLoanApplication) -> StoreResult<ApplicationId> {
        queries::insert_application(&self.0, application)
    }

    fn insert_audit_entry(&self, entry: &AuditEntry) -> StoreResult<()> {
        queries::insert_audit_entry(&self.0, entry)
    }

    fn set_application_status(&self, id: ApplicationId, status: ApplicationStatus) -> StoreResult<()> {
        queries::set_application_status(&self.0, id, status)
    }

    fn insert_loan(&self, loan: &NewLoan) -> StoreResult<LoanId> {
        queries::insert_loan(&self.0, loan)
    }

    fn insert_loan_payments(&self, loan_id: LoanId, schedule: &[AmortizationEntry]) -> StoreResult<()> {
        queries::insert_loan_payments(&self.0, loan_id, schedule)
    }

    fn credit_account(&self, user_id: UserId, type_name: &str, amount: Money) -> StoreResult<bool> {
        queries::credit_account(&self.0, user_id, type_name, amount)
    }

    fn insert_transaction(&self, transaction: &LedgerTransaction) -> StoreResult<()> {
        queries::insert_transaction(&self.0, transaction)
    }

    fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        queries::insert_notification(&self.0, notification)
    }
}

impl UnitOfWork for SqliteTx<'_> {
    fn commit(self) -> StoreResult<()> {
        self.0.commit()?;
        Ok(())
    }
}

impl LoanStore for SqliteStore {
    type Tx<'a> = SqliteTx<'a>
    where
        Self: 'a;

    /// `BEGIN IMMEDIATE`: the write lock is taken before the rating reads, so
    /// two writers never rate against the same snapshot.
    fn begin(&mut self) -> StoreResult<SqliteTx<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(SqliteTx(tx))
    }
}
