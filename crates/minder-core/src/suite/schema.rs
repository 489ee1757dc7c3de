//! JSON Schema validation for suite documents.
//!
//! Suite files are validated against spec/suite.schema.json before typed
//! deserialization, so structural mistakes (unknown rule kinds, missing
//! fields) produce pointable error messages instead of serde noise.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded suite schema (loaded at compile time).
const SUITE_SCHEMA_JSON: &str = include_str!("../../../../spec/suite.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema validation.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("failed to load suite schema: {0}")]
    LoadError(String),
}

/// Get or initialize the compiled schema validator.
fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = match serde_json::from_str(SUITE_SCHEMA_JSON) {
            Ok(v) => v,
            Err(e) => return Err(format!("invalid schema JSON: {}", e)),
        };

        match jsonschema::options().build(&schema_value) {
            Ok(v) => Ok(v),
            Err(e) => Err(format!("failed to compile schema: {}", e)),
        }
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(SchemaError::LoadError(e.clone())),
    }
}

/// Validate a suite JSON value against the schema.
///
/// Returns Ok(()) if valid, or the list of validation error messages.
pub fn validate_suite_schema(suite_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(suite_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
