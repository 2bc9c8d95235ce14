use async_trait::async_trait;

use crate::error::AuthenticatorError;
use crate::types::{Assertion, Credential};

/// Abstraction for a platform passkey authenticator.
/// This allows the SDK to work with:
/// 1. Browser or OS WebAuthn prompts (through a host binding)
/// 2. Software keys for tests and headless runs
///    ([`SoftwareAuthenticator`](crate::advanced::authenticator::SoftwareAuthenticator))
///
/// Each call is a single user-facing prompt. Callers never retry on error.
#[async_trait]
pub trait PasskeyAuthenticator: Send + Sync {
    /// Create a new P-256 credential bound to `challenge`.
    async fn create_credential(
        &self,
        user_name: &str,
        challenge: &[u8],
    ) -> Result<Credential, AuthenticatorError>;

    /// Assert over `challenge`. `None` lets the operator pick any
    /// discoverable credential.
    async fn request_assertion(
        &self,
        credential_id: Option<&str>,
        challenge: &[u8],
    ) -> Result<Assertion, AuthenticatorError>;
}
