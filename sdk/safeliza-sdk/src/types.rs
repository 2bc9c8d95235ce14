use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::base64url_encode;

/// Response of `/auth/passkey/challenge`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PasskeyChallenge {
    /// base64url-encoded challenge bytes
    pub challenge: String,
    /// Present on registration challenges
    #[serde(default)]
    pub user: Option<ChallengeUser>,
}

/// User handle the backend assigns to a new registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeUser {
    /// base64url user handle
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A freshly created passkey credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub id: String,
    pub client_data_json: Vec<u8>,
    pub attestation_object: Vec<u8>,
    /// Uncompressed SEC1 point (`0x04 || x || y`)
    pub public_key: Vec<u8>,
}

/// A WebAuthn assertion over a challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    pub credential_id: String,
    pub client_data_json: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    /// ASN.1 DER encoded ECDSA signature
    pub signature: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub attestation_object: String,
}

/// Signup body for `/auth/passkey/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub id: String,
    pub response: AttestationResponse,
    pub public_key_hex: String,
}

impl From<&Credential> for RegistrationRequest {
    fn from(credential: &Credential) -> Self {
        Self {
            id: credential.id.clone(),
            response: AttestationResponse {
                client_data_json: base64url_encode(&credential.client_data_json),
                attestation_object: base64url_encode(&credential.attestation_object),
            },
            public_key_hex: format!("0x{}", hex::encode(&credential.public_key)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub authenticator_data: String,
    pub signature: String,
    pub user_handle: Option<String>,
}

/// Login body for `/auth/passkey/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub id: String,
    pub response: AssertionResponse,
}

impl From<&Assertion> for LoginRequest {
    fn from(assertion: &Assertion) -> Self {
        Self {
            id: assertion.credential_id.clone(),
            response: AssertionResponse {
                client_data_json: base64url_encode(&assertion.client_data_json),
                authenticator_data: base64url_encode(&assertion.authenticator_data),
                signature: base64url_encode(&assertion.signature),
                user_handle: assertion.user_handle.as_deref().map(base64url_encode),
            },
        }
    }
}

/// Validator-compatible WebAuthn signature, `0x`-prefixed hex.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EncodedSignature(String);

impl EncodedSignature {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EncodedSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EncodedSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncodedSignature({} bytes)", (self.0.len() - 2) / 2)
    }
}
