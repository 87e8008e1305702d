//! JSON Schema validation for crawler configuration payloads.
//!
//! Every payload is checked against an embedded schema before it is handed
//! to the crawler service, so a payload the service would store but the
//! crawler could not use is caught at build time rather than at crawl time.
//!
//! # Security Guarantees
//! - Validation messages are scrubbed with the caller's [`Redactor`]
//! - JDBC URLs carrying inline credentials (`user@host`, query parameters)
//!   do not match the URL pattern and are rejected
//! - The password is only checked for presence, never echoed
//!
//! # Example
//! ```rust
//! use crawlsync_core::security::Redactor;
//! use crawlsync_core::validation::validate_configuration_json;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let payload = r#"{"JDBC_CONNECTION_URL":"jdbc:postgresql://db:5432/app",
//!     "PASSWORD":"pw","USERNAME":"admin","STORAGE_DESCRIPTOR":[]}"#;
//! validate_configuration_json(payload, &Redactor::new())?;
//! # Ok(())
//! # }
//! ```

use crate::security::Redactor;
use jsonschema::Validator;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

/// Configuration payload validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Schema compilation failed during initialization
    #[error("JSON Schema compilation failed: {message}")]
    SchemaCompilation { message: String },

    /// Validation failed with specific field errors
    #[error("Configuration validation failed with {error_count} errors: {errors:?}")]
    ValidationFailed {
        error_count: usize,
        errors: Vec<String>,
    },

    /// The payload is not JSON. The parser message is dropped since it can
    /// quote the input.
    #[error("Configuration payload is not valid JSON (line {line}, column {column})")]
    JsonParsing { line: usize, column: usize },
}

/// Embedded JSON Schema for the crawler configuration payload
const CONFIGURATION_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "Crawler JDBC configuration payload",
  "type": "object",
  "required": ["JDBC_CONNECTION_URL", "PASSWORD", "USERNAME", "STORAGE_DESCRIPTOR"],
  "additionalProperties": false,
  "properties": {
    "JDBC_CONNECTION_URL": {
      "type": "string",
      "pattern": "^jdbc:[a-z]+://[^/\\s@]+:[0-9]{1,5}/[^/?#;\\s]+$"
    },
    "PASSWORD": { "type": "string", "minLength": 1 },
    "USERNAME": { "type": "string", "minLength": 1 },
    "STORAGE_DESCRIPTOR": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["COLUMN_NAME", "DATA_TYPE"],
        "additionalProperties": false,
        "properties": {
          "COLUMN_NAME": { "type": "string", "minLength": 1 },
          "DATA_TYPE": { "type": "string", "minLength": 1 }
        }
      }
    }
  }
}"#;

/// Compiled JSON Schema instance (initialized once)
static COMPILED_SCHEMA: OnceLock<Validator> = OnceLock::new();

/// Compile the embedded schema and cache it.
///
/// Called lazily by [`validate_configuration`]; calling it at startup only
/// moves the compilation cost.
///
/// # Errors
/// Returns `ValidationError::SchemaCompilation` if the embedded schema is invalid.
pub fn initialize_configuration_validator() -> Result<(), ValidationError> {
    if COMPILED_SCHEMA.get().is_some() {
        return Ok(());
    }

    let schema_json: Value = serde_json::from_str(CONFIGURATION_SCHEMA).map_err(|e| {
        ValidationError::SchemaCompilation {
            message: format!("Failed to parse embedded schema: {}", e),
        }
    })?;

    let compiled = jsonschema::validator_for(&schema_json).map_err(|e| {
        ValidationError::SchemaCompilation {
            message: format!("Schema compilation error: {}", e),
        }
    })?;

    // Another thread may have won the race; either instance is equivalent
    let _ = COMPILED_SCHEMA.set(compiled);

    Ok(())
}

/// Validate a configuration payload value.
///
/// Collects every schema violation rather than stopping at the first.
///
/// # Errors
/// Returns `ValidationFailed` listing each violation, scrubbed with
/// `redactor`.
pub fn validate_configuration(json_value: &Value, redactor: &Redactor) -> Result<(), ValidationError> {
    initialize_configuration_validator()?;
    let schema = COMPILED_SCHEMA
        .get()
        .ok_or_else(|| ValidationError::SchemaCompilation {
            message: "Schema validator not initialized".to_string(),
        })?;

    let errors: Vec<String> = schema
        .iter_errors(json_value)
        .map(|error| redactor.redact(&error.to_string()))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::ValidationFailed {
            error_count: errors.len(),
            errors,
        })
    }
}

/// Parse and validate a serialized configuration payload.
///
/// # Errors
/// Returns `JsonParsing` for unparseable input, otherwise as
/// [`validate_configuration`].
pub fn validate_configuration_json(json: &str, redactor: &Redactor) -> Result<(), ValidationError> {
    let value: Value = serde_json::from_str(json).map_err(|e| ValidationError::JsonParsing {
        line: e.line(),
        column: e.column(),
    })?;
    validate_configuration(&value, redactor)
}
