use napi::Result as NapiResult;
use napi_derive::napi;

use loan_engine_core::clock::SystemClock;
use loan_engine_core::origination::{Decision, LoanRequest, LoanService};
use loan_engine_core::sqlite::SqliteStore;
use loan_engine_core::{LendingConfig, LoanEngineError};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Engine errors cross the boundary as `"<code>: <client message>"` so the
/// HTTP layer can map the code to a status without seeing server internals.
fn engine_error(e: LoanEngineError) -> napi::Error {
    if !e.is_client_error() {
        tracing::error!(error = %e, "loan engine call failed");
    }
    napi::Error::from_reason(format!("{}: {}", e.code(), e.client_message()))
}

fn malformed(field: &str, e: serde_json::Error) -> LoanEngineError {
    LoanEngineError::InvalidInput {
        field: field.to_string(),
        reason: e.to_string(),
    }
}

fn open_service(db_path: &str) -> NapiResult<LoanService<SqliteStore>> {
    let store = SqliteStore::open(db_path)
        .map_err(|e| engine_error(LoanEngineError::from(e)))?;
    LoanService::new(store, LendingConfig::default()).map_err(engine_error)
}

fn parse_request(request_json: &str) -> NapiResult<LoanRequest> {
    serde_json::from_str(request_json)
        .map_err(|e| engine_error(malformed("request", e)))
}

// ---------------------------------------------------------------------------
// Calculators
// ---------------------------------------------------------------------------

#[napi]
pub fn monthly_payment(input_json: String) -> NapiResult<String> {
    let input: loan_engine_core::annuity::MonthlyPaymentInput =
        serde_json::from_str(&input_json)
            .map_err(|e| engine_error(malformed("input", e)))?;
    let output =
        loan_engine_core::annuity::calculate_monthly_payment(&input).map_err(engine_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn amortization_schedule(input_json: String) -> NapiResult<String> {
    let input: loan_engine_core::amortization::ScheduleInput =
        serde_json::from_str(&input_json)
            .map_err(|e| engine_error(malformed("input", e)))?;
    let output =
        loan_engine_core::amortization::calculate_schedule(&input, &SystemClock)
            .map_err(engine_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn max_loan(input_json: String) -> NapiResult<String> {
    let input: loan_engine_core::eligibility::MaxLoanInput =
        serde_json::from_str(&input_json)
            .map_err(|e| engine_error(malformed("input", e)))?;
    let output = loan_engine_core::eligibility::calculate_max_loan_with_metadata(&input)
        .map_err(engine_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Store-backed loan operations
// ---------------------------------------------------------------------------

#[napi]
pub fn loan_eligibility(db_path: String, user_id: i64) -> NapiResult<String> {
    let service = open_service(&db_path)?;
    let output = service.eligibility(user_id).map_err(engine_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn loan_calculate(db_path: String, request_json: String) -> NapiResult<String> {
    let request = parse_request(&request_json)?;
    let service = open_service(&db_path)?;
    let output = service.calculate(&request).map_err(engine_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn loan_apply(db_path: String, request_json: String) -> NapiResult<String> {
    let request = parse_request(&request_json)?;
    let mut service = open_service(&db_path)?;
    let output = service.apply(&request).map_err(engine_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn loan_status(db_path: String, user_id: i64) -> NapiResult<String> {
    let service = open_service(&db_path)?;
    let output = service.status(user_id).map_err(engine_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn loan_history(db_path: String, user_id: i64) -> NapiResult<String> {
    let service = open_service(&db_path)?;
    let output = service.history(user_id).map_err(engine_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// `decision_json` is `{"decision": "approve"}` or
/// `{"decision": "deny", "reason": "..."}`.
#[napi]
pub fn loan_review(db_path: String, application_id: i64, decision_json: String) -> NapiResult<String> {
    let decision: Decision = serde_json::from_str(&decision_json)
        .map_err(|e| engine_error(malformed("decision", e)))?;
    let mut service = open_service(&db_path)?;
    let output = service
        .review(application_id, &decision)
        .map_err(engine_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
