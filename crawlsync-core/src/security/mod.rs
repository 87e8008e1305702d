//! Security utilities for credential protection.
//!
//! This module provides:
//! - `SecretRecord`, the zeroizing container for resolved database credentials
//! - `Redactor`, which scrubs known secret values from outbound text
//!
//! # Security Guarantees
//! - Passwords are stored in `Zeroizing` containers for automatic memory clearing
//! - `Debug` output of every credential-bearing type is redacted
//! - Service diagnostics are scrubbed before they reach errors or logs

mod credentials;
mod redaction;

pub use credentials::{REDACTED, REQUIRED_SECRET_FIELDS, SecretRecord};
pub use redaction::Redactor;
