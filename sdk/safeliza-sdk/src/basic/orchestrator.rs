//! Submit, approve and sign flow for session creation and passkey user
//! operations.

use std::future::Future;
use std::sync::Arc;

use safeliza_state::{
    AccountRef, PendingKind, PendingSession, PolicyConfig, Receipt, SessionConfigDto,
    UserOperationCall,
};
use tracing::{info, warn};

use crate::basic::passkey::PasskeyChallengeClient;
use crate::basic::pending::{PendingLease, PendingSessionRegistry};
use crate::basic::policy::compile;
use crate::basic::sessions::SessionDetailsCache;
use crate::core::connection::SessionBackend;
use crate::error::{AuthenticatorError, Result, SafelizaSdkError};

#[derive(Debug, Clone)]
pub enum SigningState {
    Idle,
    Configuring,
    Submitting,
    AwaitingApproval(PendingSession),
    Signing(PendingSession),
    Signed(Receipt),
    Failed(SafelizaSdkError),
}

impl SigningState {
    pub fn name(&self) -> &'static str {
        match self {
            SigningState::Idle => "idle",
            SigningState::Configuring => "configuring",
            SigningState::Submitting => "submitting",
            SigningState::AwaitingApproval(_) => "awaiting approval",
            SigningState::Signing(_) => "signing",
            SigningState::Signed(_) => "signed",
            SigningState::Failed(_) => "failed",
        }
    }

    pub fn pending(&self) -> Option<&PendingSession> {
        match self {
            SigningState::AwaitingApproval(p) | SigningState::Signing(p) => Some(p),
            _ => None,
        }
    }

    fn accepts_edits(&self) -> bool {
        matches!(
            self,
            SigningState::Idle
                | SigningState::Configuring
                | SigningState::Signed(_)
                | SigningState::Failed(_)
        )
    }
}

/// Drives one account's policy form through submission, passkey approval
/// and on-chain signing.
///
/// Every await is cancellation safe: dropping a `submit` or `approve`
/// future returns the orchestrator to the state it was in before the call
/// (with the pending session intact while approving).
pub struct SigningOrchestrator {
    account: AccountRef,
    backend: Arc<dyn SessionBackend>,
    passkeys: PasskeyChallengeClient,
    registry: PendingSessionRegistry,
    sessions: Option<SessionDetailsCache>,
    config: PolicyConfig,
    state: SigningState,
    lease: Option<PendingLease>,
    last_error: Option<SafelizaSdkError>,
}

impl SigningOrchestrator {
    pub fn new(
        account: AccountRef,
        backend: Arc<dyn SessionBackend>,
        passkeys: PasskeyChallengeClient,
        registry: PendingSessionRegistry,
    ) -> Self {
        Self {
            account,
            backend,
            passkeys,
            registry,
            sessions: None,
            config: PolicyConfig::default(),
            state: SigningState::Idle,
            lease: None,
            last_error: None,
        }
    }

    /// Load this account's sessions into `cache` once a session creation is
    /// signed, selecting the account if the cache tracks another one.
    pub fn with_session_cache(mut self, cache: SessionDetailsCache) -> Self {
        self.sessions = Some(cache);
        self
    }

    pub fn account(&self) -> &AccountRef {
        &self.account
    }

    pub fn state(&self) -> &SigningState {
        &self.state
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Error of the most recent failed approval attempt, if any.
    pub fn last_error(&self) -> Option<&SafelizaSdkError> {
        self.last_error.as_ref()
    }

    /// Edit the policy form. Allowed unless a submission or approval is in
    /// progress.
    pub fn config_mut(&mut self) -> Result<&mut PolicyConfig> {
        if !self.state.accepts_edits() {
            return Err(self.invalid("edit policies"));
        }
        self.state = SigningState::Configuring;
        Ok(&mut self.config)
    }

    pub fn set_config(&mut self, config: PolicyConfig) -> Result<()> {
        *self.config_mut()? = config;
        Ok(())
    }

    /// Compile the form and ask the backend to configure the session.
    pub async fn submit(&mut self) -> Result<PendingSession> {
        let dto = SessionConfigDto::from(compile(&self.config));
        self.open_pending("submit", move |backend, account| async move {
            let configured = backend.configure_smart_session(&account, &dto).await?;
            Ok(PendingSession {
                hash: configured.hash,
                passkey_id: configured.passkey_id,
                kind: PendingKind::SessionCreation,
            })
        })
        .await
    }

    /// Have the backend build a passkey user operation for `calls`.
    pub async fn prepare_user_operation(
        &mut self,
        calls: Vec<UserOperationCall>,
        passkey_id: String,
    ) -> Result<PendingSession> {
        self.open_pending("prepare user operation", move |backend, account| async move {
            let prepared = backend
                .create_passkey_user_operation(&account, &calls, &passkey_id)
                .await?;
            Ok(PendingSession {
                hash: prepared.user_op_hash_to_sign,
                passkey_id,
                kind: PendingKind::UserOperation {
                    user_operation: prepared.user_operation,
                },
            })
        })
        .await
    }

    /// Sign the pending hash with the passkey and submit the signature.
    pub async fn approve(&mut self) -> Result<Receipt> {
        self.approve_or_cancel(std::future::pending::<()>()).await
    }

    /// Like [`approve`](Self::approve), abandoning the attempt when `cancel`
    /// resolves first. A cancelled attempt leaves the pending session
    /// awaiting approval.
    pub async fn approve_or_cancel<C>(&mut self, cancel: C) -> Result<Receipt>
    where
        C: Future<Output = ()>,
    {
        let pending = match &self.state {
            SigningState::AwaitingApproval(pending) => pending.clone(),
            _ => return Err(self.invalid("approve")),
        };

        let passkeys = &self.passkeys;
        let backend = &self.backend;
        let account = self.account;
        let guard = StateGuard::enter(
            &mut self.state,
            SigningState::Signing(pending.clone()),
            SigningState::AwaitingApproval(pending.clone()),
        );

        let attempt = async {
            let signature = passkeys.sign(&pending.passkey_id, &pending.hash).await?;
            match &pending.kind {
                PendingKind::SessionCreation => backend
                    .sign_session_creation(&account, &pending.hash, &signature)
                    .await
                    .map(Receipt::SessionCreation),
                PendingKind::UserOperation { .. } => backend
                    .execute_signed_user_operation(&account, &pending.hash, &signature)
                    .await
                    .map(Receipt::UserOperation),
            }
        };

        let outcome = tokio::select! {
            result = attempt => Some(result),
            _ = cancel => None,
        };

        match outcome {
            None => {
                drop(guard);
                info!(account = %self.account, "approval cancelled, session still pending");
                Err(SafelizaSdkError::Authenticator(AuthenticatorError::Cancelled))
            },
            Some(Ok(receipt)) => {
                guard.settle(SigningState::Signed(receipt.clone()));
                self.lease = None;
                self.last_error = None;
                info!(account = %self.account, hash = %pending.hash, "pending session signed");

                if let (PendingKind::SessionCreation, Some(cache)) = (&pending.kind, &self.sessions)
                {
                    if let Err(e) = cache.fetch(self.account).await {
                        warn!(error = %e, "session refresh after signing failed");
                    }
                }
                Ok(receipt)
            },
            Some(Err(e)) => {
                guard.settle(SigningState::AwaitingApproval(pending));
                warn!(account = %self.account, error = %e, "approval failed, retry re-uses the same hash");
                self.last_error = Some(e.clone());
                Err(e)
            },
        }
    }

    /// Abandon the pending session and return to editing.
    pub fn discard_pending(&mut self) -> Result<()> {
        if !matches!(self.state, SigningState::AwaitingApproval(_)) {
            return Err(self.invalid("discard pending session"));
        }
        self.lease = None;
        self.last_error = None;
        self.state = SigningState::Configuring;
        Ok(())
    }

    async fn open_pending<F, Fut>(
        &mut self,
        operation: &'static str,
        request: F,
    ) -> Result<PendingSession>
    where
        F: FnOnce(Arc<dyn SessionBackend>, AccountRef) -> Fut,
        Fut: Future<Output = Result<PendingSession>>,
    {
        if !self.state.accepts_edits() {
            return Err(self.invalid(operation));
        }
        let lease = self.registry.try_acquire(self.account)?;

        let prior = std::mem::replace(&mut self.state, SigningState::Idle);
        let guard = StateGuard::enter(&mut self.state, SigningState::Submitting, prior);

        match request(Arc::clone(&self.backend), self.account).await {
            Ok(pending) => {
                guard.settle(SigningState::AwaitingApproval(pending.clone()));
                self.lease = Some(lease);
                self.last_error = None;
                info!(account = %self.account, hash = %pending.hash, "awaiting passkey approval");
                Ok(pending)
            },
            Err(e) => {
                guard.settle(SigningState::Failed(e.clone()));
                drop(lease);
                warn!(account = %self.account, operation, error = %e, "submission failed");
                Err(e)
            },
        }
    }

    fn invalid(&self, operation: &'static str) -> SafelizaSdkError {
        SafelizaSdkError::InvalidState {
            operation,
            state: self.state.name(),
        }
    }
}

/// Holds a transitional state and puts `fallback` back unless settled.
struct StateGuard<'a> {
    state: &'a mut SigningState,
    fallback: Option<SigningState>,
}

impl<'a> StateGuard<'a> {
    fn enter(state: &'a mut SigningState, during: SigningState, fallback: SigningState) -> Self {
        *state = during;
        Self {
            state,
            fallback: Some(fallback),
        }
    }

    fn settle(mut self, next: SigningState) {
        self.fallback = None;
        *self.state = next;
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        if let Some(fallback) = self.fallback.take() {
            *self.state = fallback;
        }
    }
}
