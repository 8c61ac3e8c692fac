//! Payload validation collaborator.
//!
//! The core doesn't know what shape an application's event payloads or route
//! bodies should take; it only calls through [`Validator`] at the point
//! specified by the error taxonomy (after parsing, before the handler runs)
//! and turns a failure into [`crate::error::Error::Validation`].

use thiserror::Error;

/// A single field/payload validation failure.
#[derive(Debug, Error, Clone)]
#[error("validation failed{}: {message}", field.as_deref().map(|f| format!(" for '{f}'")).unwrap_or_default())]
pub struct ValidationError {
    /// Human-readable description of what failed.
    pub message: String,
    /// The field that failed, if the validator can attribute one.
    pub field: Option<String>,
}

impl ValidationError {
    /// Construct a validation error without a specific field.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), field: None }
    }

    /// Construct a validation error attributed to a specific field.
    pub fn on_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { message: message.into(), field: Some(field.into()) }
    }
}

/// Validates a JSON payload before it reaches a route or event handler.
pub trait Validator: Send + Sync {
    /// Check `payload`, returning the first failure found.
    fn validate(&self, payload: &serde_json::Value) -> Result<(), ValidationError>;
}

/// A validator built from a plain closure.
impl<F> Validator for F
where
    F: Fn(&serde_json::Value) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, payload: &serde_json::Value) -> Result<(), ValidationError> {
        self(payload)
    }
}

/// Requires a fixed set of top-level keys to be present on an object payload.
#[derive(Debug, Clone)]
pub struct RequiredFields(pub Vec<String>);

impl Validator for RequiredFields {
    fn validate(&self, payload: &serde_json::Value) -> Result<(), ValidationError> {
        let obj = payload.as_object().ok_or_else(|| ValidationError::new("payload must be a JSON object"))?;

        for field in &self.0 {
            if !obj.contains_key(field) {
                return Err(ValidationError::on_field(field.clone(), "missing required field"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_fields_passes_when_all_present() {
        let validator = RequiredFields(vec!["id".into(), "name".into()]);
        assert!(validator.validate(&json!({"id": 1, "name": "a"})).is_ok());
    }

    #[test]
    fn required_fields_fails_when_missing() {
        let validator = RequiredFields(vec!["id".into()]);
        let err = validator.validate(&json!({"name": "a"})).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("id"));
    }
}
