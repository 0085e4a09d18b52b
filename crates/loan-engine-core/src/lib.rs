pub mod amortization;
pub mod annuity;
pub mod clock;
pub mod config;
pub mod error;
pub mod types;

#[cfg(feature = "eligibility")]
pub mod eligibility;

#[cfg(feature = "origination")]
pub mod origination;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::LendingConfig;
pub use error::{LoanEngineError, StoreError};
pub use types::*;

/// Standard result type for all loan-engine operations
pub type LoanEngineResult<T> = Result<T, LoanEngineError>;
