pub mod admin;
pub mod calculators;
pub mod loans;

use std::path::PathBuf;

use loan_engine_core::origination::LoanService;
use loan_engine_core::sqlite::SqliteStore;
use loan_engine_core::LoanEngineError;

/// Global flags shared by the store-backed commands.
pub struct Context {
    pub db: PathBuf,
    pub config: Option<String>,
}

impl Context {
    pub fn open_store(&self) -> Result<SqliteStore, LoanEngineError> {
        tracing::debug!(db = %self.db.display(), "opening database");
        Ok(SqliteStore::open(&self.db)?)
    }

    pub fn service(&self) -> Result<LoanService<SqliteStore>, Box<dyn std::error::Error>> {
        let config = crate::config::load_config(self.config.as_deref())?;
        let store = self.open_store()?;
        Ok(LoanService::new(store, config)?)
    }
}
