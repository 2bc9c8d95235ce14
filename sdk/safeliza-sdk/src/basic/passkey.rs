use std::sync::Arc;

use safeliza_state::OperationHash;
use tracing::{debug, info};

use crate::advanced::webauthn::encode_validator_signature;
use crate::core::connection::SessionBackend;
use crate::core::signer::PasskeyAuthenticator;
use crate::error::Result;
use crate::types::{EncodedSignature, LoginRequest, RegistrationRequest};
use crate::utils::base64url_decode;

/// Outcome of a verified passkey signup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasskeyRegistration {
    pub credential_id: String,
    /// `0x04...` uncompressed public key as sent to the backend
    pub public_key_hex: String,
}

/// Runs the passkey ceremonies against the session backend.
///
/// Authenticator failures surface as [`SafelizaSdkError::Authenticator`]
/// and are never retried here.
///
/// [`SafelizaSdkError::Authenticator`]: crate::error::SafelizaSdkError::Authenticator
#[derive(Clone)]
pub struct PasskeyChallengeClient {
    backend: Arc<dyn SessionBackend>,
    authenticator: Arc<dyn PasskeyAuthenticator>,
}

impl PasskeyChallengeClient {
    pub fn new(
        backend: Arc<dyn SessionBackend>,
        authenticator: Arc<dyn PasskeyAuthenticator>,
    ) -> Self {
        Self {
            backend,
            authenticator,
        }
    }

    /// Create a credential for `username` and have the backend verify it.
    /// Success is only reported once the verify call succeeds.
    pub async fn register(&self, username: &str) -> Result<PasskeyRegistration> {
        let challenge = self.backend.request_challenge(Some(username)).await?;
        let challenge_bytes = base64url_decode(&challenge.challenge)?;

        let name = match (username.is_empty(), &challenge.user) {
            (true, Some(user)) => {
                String::from_utf8_lossy(&base64url_decode(&user.id)?).into_owned()
            },
            _ => username.to_string(),
        };

        let credential = self
            .authenticator
            .create_credential(&name, &challenge_bytes)
            .await?;
        let request = RegistrationRequest::from(&credential);
        self.backend.verify_registration(&request).await?;

        info!(credential_id = %credential.id, "passkey registered");
        Ok(PasskeyRegistration {
            credential_id: credential.id,
            public_key_hex: request.public_key_hex,
        })
    }

    /// Log in with any discoverable credential. Returns the credential id
    /// the authenticator picked.
    pub async fn login(&self) -> Result<String> {
        let challenge = self.backend.request_challenge(None).await?;
        let challenge_bytes = base64url_decode(&challenge.challenge)?;

        let assertion = self
            .authenticator
            .request_assertion(None, &challenge_bytes)
            .await?;
        self.backend
            .verify_login(&LoginRequest::from(&assertion))
            .await?;

        info!(credential_id = %assertion.credential_id, "passkey login verified");
        Ok(assertion.credential_id)
    }

    /// Sign a 32-byte operation hash with `credential_id`, producing the
    /// validator signature the backend submits on chain.
    pub async fn sign(
        &self,
        credential_id: &str,
        hash: &OperationHash,
    ) -> Result<EncodedSignature> {
        debug!(credential_id, %hash, "requesting passkey assertion");
        let assertion = self
            .authenticator
            .request_assertion(Some(credential_id), hash.as_bytes())
            .await?;
        Ok(encode_validator_signature(&assertion, false)?)
    }
}
