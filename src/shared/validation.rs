//! Validation Utilities
//!
//! Request body validation and id parsing shared by the HTTP and WebSocket
//! boundaries.

use validator::{Validate, ValidationErrors};

use super::error::AppError;

/// Validate a request body, reporting the first failing field.
pub fn validate_request<T: Validate>(request: &T) -> Result<(), AppError> {
    request.validate().map_err(validation_error)
}

/// Convert validation errors to AppError
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let mut fields: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                (field.to_string(), message)
            })
        })
        .collect();
    fields.sort();

    let message = fields
        .first()
        .map(|(field, message)| format!("{}: {}", field, message))
        .unwrap_or_else(|| "Validation failed".into());

    AppError::Validation(message)
}

/// Parse a string-encoded Snowflake id.
pub fn parse_id(raw: &str, what: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid {} ID", what)))
}

/// Parse a list of string-encoded ids, failing on the first invalid entry.
pub fn parse_ids(raw: &[String], what: &str) -> Result<Vec<i64>, AppError> {
    raw.iter().map(|id| parse_id(id, what)).collect()
}
