//! Secrets Manager secret store.

use super::{CallFailure, classify, describe};
use crate::adapters::SecretStore;
use crate::error::ResolveError;
use crate::resolver::SecretRef;
use async_trait::async_trait;
use aws_sdk_secretsmanager::Client;
use tracing::debug;
use zeroize::Zeroizing;

/// Reads database secrets with `GetSecretValue` at the current version.
#[derive(Debug, Clone)]
pub struct SecretsManagerStore {
    client: Client,
}

impl SecretsManagerStore {
    /// Creates the adapter
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn classify_code(secret: &SecretRef, code: &str, detail: String) -> ResolveError {
    let secret = secret.to_string();
    match code {
        "ResourceNotFoundException" => ResolveError::NotFound { secret },
        "AccessDeniedException" | "DecryptionFailure" | "UnrecognizedClientException" => {
            ResolveError::AccessDenied { secret }
        }
        // Secrets scheduled for deletion are reported as invalid requests.
        "InvalidRequestException" => ResolveError::NotFound { secret },
        "InvalidParameterException" => ResolveError::invalid_request(
            secret,
            format!("{code}: the store rejected the request parameters"),
        ),
        _ => ResolveError::unavailable(secret, detail),
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn get(&self, secret_ref: &SecretRef) -> Result<Zeroizing<String>, ResolveError> {
        debug!(secret = %secret_ref, "Calling GetSecretValue");

        let response = self
            .client
            .get_secret_value()
            .secret_id(secret_ref.as_str())
            .send()
            .await
            .map_err(|e| match classify(&e) {
                CallFailure::Service(code) => classify_code(secret_ref, &code, code.clone()),
                CallFailure::Timeout => {
                    ResolveError::unavailable(secret_ref.as_str(), "request timed out")
                }
                CallFailure::Transport => {
                    ResolveError::unavailable(secret_ref.as_str(), describe(&e))
                }
            })?;

        response
            .secret_string()
            .map(|value| Zeroizing::new(value.to_string()))
            .ok_or_else(|| {
                ResolveError::unreadable(
                    secret_ref.as_str(),
                    "secret has no string value (binary secrets are not supported)",
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> SecretRef {
        SecretRef::parse("prod/db").unwrap()
    }

    #[test]
    fn test_error_codes_map_to_kinds() {
        let kind = |code: &str| classify_code(&reference(), code, code.to_string()).kind();

        assert_eq!(kind("ResourceNotFoundException"), "not_found");
        assert_eq!(kind("AccessDeniedException"), "access_denied");
        assert_eq!(kind("DecryptionFailure"), "access_denied");
        assert_eq!(kind("InvalidRequestException"), "not_found");
        assert_eq!(kind("InvalidParameterException"), "store_unavailable");
        assert_eq!(kind("InternalServiceError"), "store_unavailable");
        assert_eq!(kind("ThrottlingException"), "store_unavailable");
    }

    #[test]
    fn test_unavailable_is_retryable() {
        assert!(classify_code(&reference(), "InternalServiceError", String::new()).is_retryable());
        assert!(
            !classify_code(&reference(), "AccessDeniedException", String::new()).is_retryable()
        );
    }

    #[test]
    fn test_invalid_parameter_is_not_a_missing_secret() {
        let error = classify_code(&reference(), "InvalidParameterException", String::new());

        assert!(matches!(
            error,
            ResolveError::StoreUnavailable {
                retryable: false,
                ..
            }
        ));
        assert!(!error.is_retryable());
        assert!(error.to_string().contains("InvalidParameterException"));
    }
}
