//! WebAuthn payload helpers and the smart-account validator signature
//! encoding.

use p256::ecdsa::Signature;

use crate::error::AuthenticatorError;
use crate::types::{Assertion, EncodedSignature};
use crate::utils::base64url_encode;

const WORD: usize = 32;
const HEAD_WORDS: usize = 6;

/// Flag bits of the authenticator data flags byte.
pub const FLAG_USER_PRESENT: u8 = 0x01;
pub const FLAG_USER_VERIFIED: u8 = 0x04;
pub const FLAG_ATTESTED_CREDENTIAL: u8 = 0x40;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CeremonyType {
    Create,
    Get,
}

impl CeremonyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CeremonyType::Create => "webauthn.create",
            CeremonyType::Get => "webauthn.get",
        }
    }
}

/// Build the client data JSON a browser would produce for `challenge`.
pub fn client_data_json(ceremony: CeremonyType, challenge: &[u8], origin: &str) -> Vec<u8> {
    let mut json = Vec::with_capacity(128 + challenge.len() * 2);
    json.extend_from_slice(b"{\"type\":\"");
    json.extend_from_slice(ceremony.as_str().as_bytes());
    json.extend_from_slice(b"\",\"challenge\":\"");
    json.extend_from_slice(base64url_encode(challenge).as_bytes());
    json.extend_from_slice(b"\",\"origin\":\"");
    json.extend_from_slice(origin.as_bytes());
    json.extend_from_slice(b"\",\"crossOrigin\":false}");
    json
}

/// Byte offset of the `"type":` key inside client data JSON.
pub fn type_index(client_data_json: &[u8]) -> Option<usize> {
    const NEEDLE: &[u8] = b"\"type\":";
    client_data_json
        .windows(NEEDLE.len())
        .position(|window| window == NEEDLE)
}

/// Read-only view over authenticator data.
pub struct AuthDataParser<'a> {
    data: &'a [u8],
}

impl<'a> AuthDataParser<'a> {
    /// rpIdHash (32) + flags (1) + signCount (4)
    pub const MIN_LEN: usize = 37;

    pub fn new(data: &'a [u8]) -> Result<Self, AuthenticatorError> {
        if data.len() < Self::MIN_LEN {
            return Err(AuthenticatorError::InvalidAssertion(format!(
                "authenticator data is {} bytes, need at least {}",
                data.len(),
                Self::MIN_LEN
            )));
        }
        Ok(Self { data })
    }

    pub fn rp_id_hash(&self) -> &'a [u8] {
        &self.data[0..32]
    }

    pub fn flags(&self) -> u8 {
        self.data[32]
    }

    pub fn is_user_present(&self) -> bool {
        self.flags() & FLAG_USER_PRESENT != 0
    }

    pub fn is_user_verified(&self) -> bool {
        self.flags() & FLAG_USER_VERIFIED != 0
    }

    pub fn counter(&self) -> u32 {
        u32::from_be_bytes([self.data[33], self.data[34], self.data[35], self.data[36]])
    }
}

/// Decode a DER ECDSA signature into `(r, s)` with `s` in the lower half of
/// the curve order.
pub fn split_der_signature(der: &[u8]) -> Result<([u8; 32], [u8; 32]), AuthenticatorError> {
    let signature = Signature::from_der(der)
        .map_err(|e| AuthenticatorError::InvalidAssertion(format!("bad DER signature: {}", e)))?;
    let signature = signature.normalize_s().unwrap_or(signature);
    let (r_bytes, s_bytes) = signature.split_bytes();
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&r_bytes);
    s.copy_from_slice(&s_bytes);
    Ok((r, s))
}

/// The validator's WebAuthn signature for one assertion:
/// `abi.encode(bytes authenticatorData, string clientDataJSON,
/// uint256 typeIndex, uint256 r, uint256 s, bool usePrecompiled)`.
pub fn encode_validator_signature(
    assertion: &Assertion,
    use_precompiled: bool,
) -> Result<EncodedSignature, AuthenticatorError> {
    AuthDataParser::new(&assertion.authenticator_data)?;
    let type_index = type_index(&assertion.client_data_json).ok_or_else(|| {
        AuthenticatorError::InvalidAssertion("client data JSON has no \"type\" key".into())
    })?;
    let (r, s) = split_der_signature(&assertion.signature)?;

    let auth_data = &assertion.authenticator_data;
    let client_data = &assertion.client_data_json;
    let auth_data_offset = HEAD_WORDS * WORD;
    let client_data_offset = auth_data_offset + WORD + padded_len(auth_data.len());

    let mut out = Vec::with_capacity(
        client_data_offset + WORD + padded_len(client_data.len()),
    );
    out.extend_from_slice(&uint_word(auth_data_offset as u64));
    out.extend_from_slice(&uint_word(client_data_offset as u64));
    out.extend_from_slice(&uint_word(type_index as u64));
    out.extend_from_slice(&r);
    out.extend_from_slice(&s);
    out.extend_from_slice(&uint_word(use_precompiled as u64));
    push_dynamic(&mut out, auth_data);
    push_dynamic(&mut out, client_data);

    Ok(EncodedSignature::from_bytes(&out))
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

fn push_dynamic(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&uint_word(bytes.len() as u64));
    out.extend_from_slice(bytes);
    out.resize(out.len() + padded_len(bytes.len()) - bytes.len(), 0);
}
