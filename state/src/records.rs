//! Records owned by the session backend and the handles that reference them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::{Address, OperationHash};

/// A Safe on a specific chain. Identity of every per-account resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRef {
    pub safe_address: Address,
    pub chain_id: u64,
}

impl AccountRef {
    pub fn new(safe_address: Address, chain_id: u64) -> Self {
        Self {
            safe_address,
            chain_id,
        }
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.safe_address, self.chain_id)
    }
}

/// Externally reachable endpoint attached to a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointState {
    pub active: bool,
    #[serde(default)]
    pub url: String,
}

/// One active session configuration, as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfigRecord {
    pub session_key: String,
    pub permission_enable_hash: String,
    /// Identity of the record within an account's list
    pub permission_id: String,
    /// Backend-defined JSON, kept verbatim
    pub session_details: String,
    #[serde(default)]
    pub endpoint: EndpointState,
}

impl SessionConfigRecord {
    pub fn parsed_details(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.session_details)
    }
}

/// Which approval endpoint a pending hash belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingKind {
    /// Installing a newly configured smart session
    SessionCreation,
    /// Executing a prepared passkey user operation
    UserOperation {
        /// Backend-serialised user operation, for review before signing
        user_operation: String,
    },
}

/// Hash awaiting the operator's passkey approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSession {
    pub hash: OperationHash,
    pub passkey_id: String,
    pub kind: PendingKind,
}

/// Response of `configure-smart-session`. Extra fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfigured {
    pub hash: OperationHash,
    pub passkey_id: String,
}

/// Response of `sign-session-creation`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreationReceipt {
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

/// Outcome of an executed user operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    pub transaction_hash: String,
    pub user_op_hash: String,
    pub success: bool,
}

/// Terminal artifact of a successful approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Receipt {
    SessionCreation(SessionCreationReceipt),
    UserOperation(UserOperationReceipt),
}

/// Validator modules installed on a Safe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledModules {
    pub ownable_validator_installed: bool,
    pub webauthn_validator_installed: bool,
    pub smart_sessions_validator_installed: bool,
}

/// A Safe known to the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeSummary {
    pub safe_address: Address,
    #[serde(default)]
    pub safe_legacy_owners: Vec<String>,
    #[serde(default)]
    pub safe_module_owners: Option<Vec<String>>,
    /// JSON-encoded passkey descriptor
    #[serde(default)]
    pub safe_module_passkey: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSafes {
    pub chain_id: u64,
    #[serde(default)]
    pub safes: Vec<SafeSummary>,
}

/// The authenticated operator and the Safes they act for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub safes_by_chain: Vec<ChainSafes>,
}

impl UserProfile {
    pub fn accounts(&self) -> impl Iterator<Item = AccountRef> + '_ {
        self.safes_by_chain.iter().flat_map(|chain| {
            chain
                .safes
                .iter()
                .map(move |safe| AccountRef::new(safe.safe_address, chain.chain_id))
        })
    }
}

/// Contract call to wrap into a passkey user operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationCall {
    pub to: Address,
    pub function_name: String,
    pub abi: serde_json::Value,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

/// User operation built by the backend, awaiting a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedUserOperation {
    pub user_operation: String,
    pub user_op_hash_to_sign: OperationHash,
}
