//! In-process P-256 passkey authenticator.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::advanced::webauthn::{
    client_data_json, CeremonyType, FLAG_ATTESTED_CREDENTIAL, FLAG_USER_PRESENT,
    FLAG_USER_VERIFIED,
};
use crate::core::signer::PasskeyAuthenticator;
use crate::error::AuthenticatorError;
use crate::types::{Assertion, Credential};
use crate::utils::{base64url_encode, lock};

struct StoredCredential {
    key: SigningKey,
    user_handle: Vec<u8>,
}

/// Software authenticator holding its keys in memory.
///
/// Produces the same payloads a platform authenticator would (client data
/// JSON, authenticator data, a `none` attestation object, DER signatures),
/// so the rest of the SDK cannot tell the difference. Used by the test
/// suite and the e2e runner.
pub struct SoftwareAuthenticator {
    rp_id: String,
    origin: String,
    credentials: DashMap<String, StoredCredential>,
    // Registration order, for discoverable-credential lookups.
    order: Mutex<Vec<String>>,
    sign_count: AtomicU32,
    fail_next: Mutex<Option<AuthenticatorError>>,
}

impl SoftwareAuthenticator {
    pub fn new(rp_id: impl Into<String>) -> Self {
        let rp_id = rp_id.into();
        Self {
            origin: format!("https://{}", rp_id),
            rp_id,
            credentials: DashMap::new(),
            order: Mutex::new(Vec::new()),
            sign_count: AtomicU32::new(0),
            fail_next: Mutex::new(None),
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Register an existing key under `credential_id`.
    pub fn import(&self, credential_id: impl Into<String>, key: SigningKey, user_handle: &[u8]) {
        let credential_id = credential_id.into();
        self.remember(
            credential_id,
            StoredCredential {
                key,
                user_handle: user_handle.to_vec(),
            },
        );
    }

    /// Make the next prompt fail with `error`, as a declining user would.
    pub fn fail_next(&self, error: AuthenticatorError) {
        *lock(&self.fail_next) = Some(error);
    }

    pub fn verifying_key(&self, credential_id: &str) -> Option<VerifyingKey> {
        self.credentials
            .get(credential_id)
            .map(|c| *c.key.verifying_key())
    }

    pub fn credential_ids(&self) -> Vec<String> {
        lock(&self.order).clone()
    }

    fn remember(&self, credential_id: String, credential: StoredCredential) {
        if self.credentials.insert(credential_id.clone(), credential).is_none() {
            lock(&self.order).push(credential_id);
        }
    }

    fn take_failure(&self) -> Result<(), AuthenticatorError> {
        match lock(&self.fail_next).take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn rp_id_hash(&self) -> [u8; 32] {
        Sha256::digest(self.rp_id.as_bytes()).into()
    }

    fn authenticator_data(&self, flags: u8) -> Vec<u8> {
        let counter = self.sign_count.fetch_add(1, Ordering::SeqCst) + 1;
        let mut data = Vec::with_capacity(37);
        data.extend_from_slice(&self.rp_id_hash());
        data.push(flags);
        data.extend_from_slice(&counter.to_be_bytes());
        data
    }
}

/// COSE_Key for an ES256 public key: `{1: 2, 3: -7, -1: 1, -2: x, -3: y}`.
fn cose_public_key(verifying_key: &VerifyingKey) -> Vec<u8> {
    let point = verifying_key.to_encoded_point(false);
    let mut out = vec![0xa5, 0x01, 0x02, 0x03, 0x26, 0x20, 0x01];
    out.extend_from_slice(&[0x21, 0x58, 0x20]);
    out.extend_from_slice(point.x().map(|x| x.as_slice()).unwrap_or(&[0u8; 32]));
    out.extend_from_slice(&[0x22, 0x58, 0x20]);
    out.extend_from_slice(point.y().map(|y| y.as_slice()).unwrap_or(&[0u8; 32]));
    out
}

fn cbor_text(out: &mut Vec<u8>, text: &str) {
    out.push(0x60 | text.len() as u8);
    out.extend_from_slice(text.as_bytes());
}

fn cbor_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    match bytes.len() {
        len if len < 24 => out.push(0x40 | len as u8),
        len if len < 256 => out.extend_from_slice(&[0x58, len as u8]),
        len => {
            out.push(0x59);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        },
    }
    out.extend_from_slice(bytes);
}

/// `{"fmt": "none", "attStmt": {}, "authData": auth_data}`
fn none_attestation(auth_data: &[u8]) -> Vec<u8> {
    let mut out = vec![0xa3];
    cbor_text(&mut out, "fmt");
    cbor_text(&mut out, "none");
    cbor_text(&mut out, "attStmt");
    out.push(0xa0);
    cbor_text(&mut out, "authData");
    cbor_bytes(&mut out, auth_data);
    out
}

#[async_trait]
impl PasskeyAuthenticator for SoftwareAuthenticator {
    async fn create_credential(
        &self,
        user_name: &str,
        challenge: &[u8],
    ) -> Result<Credential, AuthenticatorError> {
        self.take_failure()?;

        let key = SigningKey::random(&mut OsRng);
        let verifying_key = *key.verifying_key();
        let mut raw_id = [0u8; 16];
        OsRng.fill_bytes(&mut raw_id);
        let credential_id = base64url_encode(&raw_id);

        let mut auth_data = self.authenticator_data(
            FLAG_USER_PRESENT | FLAG_USER_VERIFIED | FLAG_ATTESTED_CREDENTIAL,
        );
        auth_data.extend_from_slice(&[0u8; 16]); // aaguid
        auth_data.extend_from_slice(&(raw_id.len() as u16).to_be_bytes());
        auth_data.extend_from_slice(&raw_id);
        auth_data.extend_from_slice(&cose_public_key(&verifying_key));

        self.remember(
            credential_id.clone(),
            StoredCredential {
                key,
                user_handle: user_name.as_bytes().to_vec(),
            },
        );

        Ok(Credential {
            id: credential_id,
            client_data_json: client_data_json(CeremonyType::Create, challenge, &self.origin),
            attestation_object: none_attestation(&auth_data),
            public_key: verifying_key.to_encoded_point(false).as_bytes().to_vec(),
        })
    }

    async fn request_assertion(
        &self,
        credential_id: Option<&str>,
        challenge: &[u8],
    ) -> Result<Assertion, AuthenticatorError> {
        self.take_failure()?;

        let credential_id = match credential_id {
            Some(id) => id.to_string(),
            None => lock(&self.order)
                .first()
                .cloned()
                .ok_or(AuthenticatorError::NoCredential)?,
        };
        let stored = self
            .credentials
            .get(&credential_id)
            .ok_or(AuthenticatorError::NoCredential)?;

        let client_data = client_data_json(CeremonyType::Get, challenge, &self.origin);
        let authenticator_data = self.authenticator_data(FLAG_USER_PRESENT | FLAG_USER_VERIFIED);

        let mut message = authenticator_data.clone();
        message.extend_from_slice(&Sha256::digest(&client_data));
        let signature: Signature = stored.key.sign(&message);

        Ok(Assertion {
            credential_id,
            client_data_json: client_data,
            authenticator_data,
            signature: signature.to_der().as_bytes().to_vec(),
            user_handle: Some(stored.user_handle.clone()),
        })
    }
}
