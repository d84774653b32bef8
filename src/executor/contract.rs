//! Request/Response Contracts
//!
//! A contract is the typed shape a function accepts or produces. Request
//! contracts are validated in two steps: serde enforces the structure, then
//! [`Contract::check`] enforces value-level rules (ranges, non-empty lists).
//! Response contracts only need to serialize back into JSON.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A single field-level validation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct FieldError {
    /// Name of the offending field, or `body` when the whole payload is wrong.
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Shape definition for a function's request.
pub trait Contract: Serialize + DeserializeOwned + Send + 'static {
    /// Value-level rules applied after deserialization succeeded.
    fn check(&self) -> Vec<FieldError> {
        Vec::new()
    }
}

/// Validates raw JSON into a typed request.
pub fn validate<T: Contract>(raw: &Value) -> Result<T, Vec<FieldError>> {
    let value: T = serde_json::from_value(raw.clone()).map_err(|e| vec![from_serde(&e)])?;

    let problems = value.check();
    if problems.is_empty() {
        Ok(value)
    } else {
        Err(problems)
    }
}

/// Serializes a typed response back into JSON.
pub fn serialize<T: Serialize>(value: &T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(value)
}

/// serde quotes the offending field in backticks ("missing field `x`",
/// "unknown field `z`, expected ..."). Anything else is reported against `body`.
fn from_serde(err: &serde_json::Error) -> FieldError {
    let message = err.to_string();
    let field = if message.contains("field `") {
        message.split('`').nth(1).unwrap_or("body")
    } else {
        "body"
    };
    FieldError::new(field, message.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Probe {
        x: f64,
    }

    impl Contract for Probe {
        fn check(&self) -> Vec<FieldError> {
            if self.x.is_finite() && self.x >= 0.0 {
                Vec::new()
            } else {
                vec![FieldError::new("x", "must be a non-negative number")]
            }
        }
    }

    #[test]
    fn test_missing_field_is_reported_by_name() {
        let errors = validate::<Probe>(&serde_json::json!({})).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "x");
        assert!(errors[0].message.contains("missing field"));
    }

    #[test]
    fn test_unknown_field_is_reported_by_name() {
        let errors = validate::<Probe>(&serde_json::json!({"x": 1.0, "z": 2})).unwrap_err();
        assert_eq!(errors[0].field, "z");
    }

    #[test]
    fn test_type_mismatch_is_reported_against_body() {
        let errors = validate::<Probe>(&serde_json::json!("not an object")).unwrap_err();
        assert_eq!(errors[0].field, "body");
    }

    #[test]
    fn test_check_runs_after_deserialization() {
        let errors = validate::<Probe>(&serde_json::json!({"x": -1.0})).unwrap_err();
        assert_eq!(errors, vec![FieldError::new("x", "must be a non-negative number")]);

        let ok = validate::<Probe>(&serde_json::json!({"x": 4.0})).unwrap();
        assert_eq!(ok.x, 4.0);
    }
}
