use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoanEngineError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Requested amount {requested} exceeds the maximum loanable principal {max_principal}")]
    RequestedAmountExceedsMax {
        requested: Decimal,
        max_principal: Decimal,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    #[error("{entity} {id} is in the wrong state: {reason}")]
    InvalidState {
        entity: String,
        id: String,
        reason: String,
    },

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl LoanEngineError {
    /// Stable wire code for callers.
    pub fn code(&self) -> &'static str {
        match self {
            LoanEngineError::InvalidInput { .. } => "invalid_input",
            LoanEngineError::RequestedAmountExceedsMax { .. } => "requested_amount_exceeds_max",
            LoanEngineError::NotFound { .. } => "not_found",
            LoanEngineError::InvalidState { .. } => "invalid_state",
            LoanEngineError::Store(_)
            | LoanEngineError::DivisionByZero { .. }
            | LoanEngineError::DateError(_)
            | LoanEngineError::SerializationError(_) => "server_error",
        }
    }

    /// Message that is safe to hand back to a caller. Infrastructure
    /// failures collapse to a generic text; their cause is only logged.
    pub fn client_message(&self) -> String {
        match self.code() {
            "server_error" => "Server error.".to_string(),
            _ => self.to_string(),
        }
    }

    /// True for failures of a well-formed request against business rules
    /// or caller input, as opposed to infrastructure failures.
    pub fn is_client_error(&self) -> bool {
        self.code() != "server_error"
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        LoanEngineError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn overflow(field: &str) -> Self {
        LoanEngineError::invalid(field, "Value exceeds decimal range")
    }
}

impl From<serde_json::Error> for LoanEngineError {
    fn from(e: serde_json::Error) -> Self {
        LoanEngineError::SerializationError(e.to_string())
    }
}

/// Failures raised by a persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt row in {table}: {reason}")]
    Corrupt { table: String, reason: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_policy_rejection_code_and_message() {
        let err = LoanEngineError::RequestedAmountExceedsMax {
            requested: dec!(100000),
            max_principal: dec!(50761.64),
        };
        assert_eq!(err.code(), "requested_amount_exceeds_max");
        assert!(err.client_message().contains("50761.64"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_store_error_is_not_leaked() {
        let err = LoanEngineError::from(StoreError::Unavailable(
            "connection refused at 10.0.0.3:3306".into(),
        ));
        assert_eq!(err.code(), "server_error");
        assert_eq!(err.client_message(), "Server error.");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_invalid_input_message_names_field() {
        let err = LoanEngineError::invalid("term_months", "must be at least 1");
        assert_eq!(err.code(), "invalid_input");
        assert!(err.client_message().contains("term_months"));
    }
}
