//! Loan origination: request validation, rating, transactional apply, and the
//! read-only views that sit next to it.
//!
//! Persistence is reached only through the traits in [`store`]; every write
//! happens inside a unit of work opened by [`store::in_transaction`].

pub mod model;
pub mod review;
pub mod service;
pub mod store;

pub use model::*;
pub use review::{Decision, FollowUp, FollowUpReport, FollowUpStatus, ReviewOutcome};
pub use service::LoanService;
pub use store::{in_transaction, LoanReader, LoanStore, LoanWriter, RatingSource, UnitOfWork};
