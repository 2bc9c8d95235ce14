#![allow(dead_code)]

use async_trait::async_trait;
use safeliza_sdk::core::connection::SessionBackend;
use safeliza_sdk::types::{EncodedSignature, LoginRequest, PasskeyChallenge, RegistrationRequest};
use safeliza_sdk::utils::base64url_encode;
use safeliza_sdk::{
    PasskeyChallengeClient, PendingSessionRegistry, Result, SafelizaSdkError,
    SessionDetailsCache, SigningOrchestrator, SoftwareAuthenticator,
};
use safeliza_state::{
    AccountRef, EndpointState, InstalledModules, OperationHash, PreparedUserOperation,
    SessionConfigDto, SessionConfigRecord, SessionConfigured, SessionCreationReceipt,
    UserOperationCall, UserOperationReceipt, UserProfile,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const SAFE: &str = "0x1111111111111111111111111111111111111111";
pub const OTHER_SAFE: &str = "0x2222222222222222222222222222222222222222";
pub const CHAIN_ID: u64 = 8453;
pub const RP_ID: &str = "safeliza.test";

pub fn account() -> AccountRef {
    AccountRef::new(SAFE.parse().unwrap(), CHAIN_ID)
}

pub fn other_account() -> AccountRef {
    AccountRef::new(OTHER_SAFE.parse().unwrap(), CHAIN_ID)
}

/// In-memory session backend. Records every call, can fail or hold any
/// endpoint on demand, and keeps per-account session lists so signing a
/// session creation shows up in `session_details`.
#[derive(Default)]
pub struct MockBackend {
    calls: Mutex<Vec<(&'static str, Value)>>,
    failures: Mutex<HashMap<&'static str, Vec<SafelizaSdkError>>>,
    holds: Mutex<HashMap<&'static str, Arc<Notify>>>,
    sessions: Mutex<HashMap<AccountRef, Vec<SessionConfigRecord>>>,
    passkey_id: Mutex<Option<String>>,
    counter: AtomicU32,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue an error for the next call to `endpoint`.
    pub fn fail_next(&self, endpoint: &'static str, error: SafelizaSdkError) {
        self.failures
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push(error);
    }

    pub fn reject_next(&self, endpoint: &'static str, status: u16) {
        self.fail_next(
            endpoint,
            SafelizaSdkError::BackendRejection {
                status,
                message: "rejected by mock".into(),
            },
        );
    }

    /// Block calls to `endpoint` until the returned handle is notified.
    pub fn hold(&self, endpoint: &'static str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.holds
            .lock()
            .unwrap()
            .insert(endpoint, Arc::clone(&notify));
        notify
    }

    pub fn release(&self, endpoint: &'static str) {
        if let Some(notify) = self.holds.lock().unwrap().remove(endpoint) {
            notify.notify_one();
        }
    }

    pub fn set_passkey_id(&self, id: impl Into<String>) {
        *self.passkey_id.lock().unwrap() = Some(id.into());
    }

    pub fn seed_sessions(&self, account: AccountRef, records: Vec<SessionConfigRecord>) {
        self.sessions.lock().unwrap().insert(account, records);
    }

    pub fn calls(&self) -> Vec<(&'static str, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(name, _)| *name == endpoint)
            .map(|(_, body)| body)
            .collect()
    }

    async fn enter(&self, endpoint: &'static str, body: Value) -> Result<()> {
        self.calls.lock().unwrap().push((endpoint, body));
        let hold = self.holds.lock().unwrap().get(endpoint).cloned();
        if let Some(notify) = hold {
            notify.notified().await;
        }
        let failure = self
            .failures
            .lock()
            .unwrap()
            .get_mut(endpoint)
            .and_then(|queue| (!queue.is_empty()).then(|| queue.remove(0)));
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn next_hash(&self) -> OperationHash {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("0x{:064x}", n).parse().unwrap()
    }
}

pub fn record(permission_id: &str, url: &str, active: bool) -> SessionConfigRecord {
    SessionConfigRecord {
        session_key: format!("0xkey{}", permission_id),
        permission_enable_hash: format!("0xenable{}", permission_id),
        permission_id: permission_id.to_string(),
        session_details: json!({ "permissionId": permission_id }).to_string(),
        endpoint: EndpointState {
            active,
            url: url.to_string(),
        },
    }
}

#[async_trait]
impl SessionBackend for MockBackend {
    async fn request_challenge(&self, username: Option<&str>) -> Result<PasskeyChallenge> {
        self.enter("challenge", json!({ "username": username })).await?;
        let body = json!({
            "challenge": base64url_encode(&[0x5a; 32]),
            "user": username.map(|u| json!({ "id": base64url_encode(u.as_bytes()) })),
        });
        Ok(serde_json::from_value(body).unwrap())
    }

    async fn verify_registration(&self, request: &RegistrationRequest) -> Result<()> {
        self.enter("verify", serde_json::to_value(request).unwrap())
            .await?;
        self.set_passkey_id(request.id.clone());
        Ok(())
    }

    async fn verify_login(&self, request: &LoginRequest) -> Result<()> {
        self.enter("verify", serde_json::to_value(request).unwrap())
            .await
    }

    async fn current_user(&self) -> Result<UserProfile> {
        self.enter("user", Value::Null).await?;
        Ok(serde_json::from_value(json!({
            "id": "user-1",
            "username": "agent",
            "safesByChain": [{ "chainId": CHAIN_ID, "safes": [{ "safeAddress": SAFE }] }]
        }))
        .unwrap())
    }

    async fn logout(&self) -> Result<()> {
        self.enter("logout", Value::Null).await
    }

    async fn installed_modules(&self, account: &AccountRef) -> Result<InstalledModules> {
        self.enter("installed-modules", serde_json::to_value(account).unwrap())
            .await?;
        Ok(InstalledModules {
            ownable_validator_installed: true,
            webauthn_validator_installed: true,
            smart_sessions_validator_installed: false,
        })
    }

    async fn configure_smart_session(
        &self,
        account: &AccountRef,
        session: &SessionConfigDto,
    ) -> Result<SessionConfigured> {
        self.enter(
            "configure",
            json!({ "account": account, "sessionConfigDto": session }),
        )
        .await?;
        let passkey_id = self
            .passkey_id
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "unregistered".into());
        Ok(SessionConfigured {
            hash: self.next_hash(),
            passkey_id,
        })
    }

    async fn sign_session_creation(
        &self,
        account: &AccountRef,
        hash: &OperationHash,
        signature: &EncodedSignature,
    ) -> Result<SessionCreationReceipt> {
        self.enter(
            "sign-session-creation",
            json!({ "account": account, "hash": hash, "encodedSignature": signature }),
        )
        .await?;
        let mut sessions = self.sessions.lock().unwrap();
        let list = sessions.entry(*account).or_default();
        let permission_id = format!("perm-{}", list.len() + 1);
        list.push(record(&permission_id, &format!("/agent/{}", permission_id), false));
        Ok(SessionCreationReceipt {
            transaction_hash: Some(format!("0xtx{}", hash)),
        })
    }

    async fn create_passkey_user_operation(
        &self,
        account: &AccountRef,
        calls: &[UserOperationCall],
        passkey_id: &str,
    ) -> Result<PreparedUserOperation> {
        self.enter(
            "create-user-operation",
            json!({ "account": account, "calls": calls, "passkeyId": passkey_id }),
        )
        .await?;
        Ok(PreparedUserOperation {
            user_operation: json!({ "sender": account.safe_address, "calls": calls.len() })
                .to_string(),
            user_op_hash_to_sign: self.next_hash(),
        })
    }

    async fn execute_signed_user_operation(
        &self,
        account: &AccountRef,
        user_op_hash: &OperationHash,
        signature: &EncodedSignature,
    ) -> Result<UserOperationReceipt> {
        self.enter(
            "execute-user-operation",
            json!({ "account": account, "userOpHashToSign": user_op_hash, "encodedSignature": signature }),
        )
        .await?;
        Ok(UserOperationReceipt {
            transaction_hash: "0xfeed".into(),
            user_op_hash: user_op_hash.to_string(),
            success: true,
        })
    }

    async fn session_details(&self, account: &AccountRef) -> Result<Vec<SessionConfigRecord>> {
        self.enter("session-details", serde_json::to_value(account).unwrap())
            .await?;
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(account)
            .cloned()
            .unwrap_or_default())
    }

    async fn activate_endpoint(
        &self,
        account: &AccountRef,
        path: &str,
        active: bool,
    ) -> Result<()> {
        self.enter(
            "activate-endpoint",
            json!({ "account": account, "path": path, "active": active }),
        )
        .await?;
        if let Some(list) = self.sessions.lock().unwrap().get_mut(account) {
            for record in list.iter_mut().filter(|r| r.endpoint.url == path) {
                record.endpoint.active = active;
            }
        }
        Ok(())
    }
}

/// Mock backend, software authenticator and a shared pending registry.
pub struct TestContext {
    pub backend: Arc<MockBackend>,
    pub authenticator: Arc<SoftwareAuthenticator>,
    pub registry: PendingSessionRegistry,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            backend: MockBackend::new(),
            authenticator: Arc::new(SoftwareAuthenticator::new(RP_ID)),
            registry: PendingSessionRegistry::new(),
        }
    }

    pub fn passkeys(&self) -> PasskeyChallengeClient {
        PasskeyChallengeClient::new(self.backend.clone(), self.authenticator.clone())
    }

    pub fn cache(&self) -> SessionDetailsCache {
        SessionDetailsCache::new(self.backend.clone())
    }

    pub fn orchestrator(&self) -> SigningOrchestrator {
        SigningOrchestrator::new(
            account(),
            self.backend.clone(),
            self.passkeys(),
            self.registry.clone(),
        )
    }

    /// Register a passkey so configure-smart-session hands out its id.
    pub async fn registered(self) -> anyhow::Result<Self> {
        self.passkeys().register("agent").await?;
        Ok(self)
    }
}
