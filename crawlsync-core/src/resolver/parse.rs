//! Parsing of structured secret values into [`SecretRecord`]s.

use crate::error::ResolveError;
use crate::resolver::SecretRef;
use crate::security::{REQUIRED_SECRET_FIELDS, SecretRecord};
use serde_json::{Map, Value};

/// Parses the JSON value of a database secret.
///
/// Numbers are accepted for any field and rendered as text (stores commonly
/// keep `port` as a number). Missing keys, `null`, empty strings and
/// non-scalar values all count as missing; no defaults are substituted.
///
/// # Security
/// Errors name the offending fields but never include any value from the
/// secret, not even a JSON parser excerpt.
///
/// # Errors
/// Returns `ResolveError::MalformedSecret` if the value is not a JSON object
/// or any required field is unusable.
pub fn parse_secret_value(secret_ref: &SecretRef, raw: &str) -> Result<SecretRecord, ResolveError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        ResolveError::unreadable(
            secret_ref.as_str(),
            format!(
                "secret value is not valid JSON (line {}, column {})",
                e.line(),
                e.column()
            ),
        )
    })?;

    let Value::Object(fields) = value else {
        return Err(ResolveError::unreadable(
            secret_ref.as_str(),
            "secret value is not a JSON object",
        ));
    };

    let mut missing = Vec::new();
    let mut values = Vec::with_capacity(REQUIRED_SECRET_FIELDS.len());
    for field in REQUIRED_SECRET_FIELDS {
        match field_text(&fields, field) {
            Some(text) => values.push(text),
            None => missing.push(field.to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(ResolveError::malformed(secret_ref.as_str(), missing));
    }

    let [host, port, dbname, username, password]: [String; 5] =
        values.try_into().map_err(|_| {
            ResolveError::unreadable(secret_ref.as_str(), "secret value is incomplete")
        })?;

    Ok(SecretRecord::new(host, port, dbname, username, password))
}

fn field_text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
