use async_trait::async_trait;
use safeliza_state::{
    AccountRef, InstalledModules, OperationHash, PreparedUserOperation, SessionConfigDto,
    SessionConfigRecord, SessionConfigured, SessionCreationReceipt, UserOperationCall,
    UserOperationReceipt, UserProfile,
};

use crate::error::Result;
use crate::types::{EncodedSignature, LoginRequest, PasskeyChallenge, RegistrationRequest};

/// The session backend, one method per endpoint.
///
/// Implementations map transport failures to `Network`, non-2xx answers to
/// `BackendRejection` and undecodable bodies to `InvalidResponse`. The
/// authenticated session is carried by the implementation (cookies for
/// [`HttpBackend`](crate::core::http::HttpBackend)).
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// `None` requests a login challenge, `Some` a registration challenge.
    async fn request_challenge(&self, username: Option<&str>) -> Result<PasskeyChallenge>;

    async fn verify_registration(&self, request: &RegistrationRequest) -> Result<()>;

    async fn verify_login(&self, request: &LoginRequest) -> Result<()>;

    async fn current_user(&self) -> Result<UserProfile>;

    async fn logout(&self) -> Result<()>;

    async fn installed_modules(&self, account: &AccountRef) -> Result<InstalledModules>;

    async fn configure_smart_session(
        &self,
        account: &AccountRef,
        session: &SessionConfigDto,
    ) -> Result<SessionConfigured>;

    async fn sign_session_creation(
        &self,
        account: &AccountRef,
        hash: &OperationHash,
        signature: &EncodedSignature,
    ) -> Result<SessionCreationReceipt>;

    async fn create_passkey_user_operation(
        &self,
        account: &AccountRef,
        calls: &[UserOperationCall],
        passkey_id: &str,
    ) -> Result<PreparedUserOperation>;

    async fn execute_signed_user_operation(
        &self,
        account: &AccountRef,
        user_op_hash: &OperationHash,
        signature: &EncodedSignature,
    ) -> Result<UserOperationReceipt>;

    async fn session_details(&self, account: &AccountRef) -> Result<Vec<SessionConfigRecord>>;

    async fn activate_endpoint(&self, account: &AccountRef, path: &str, active: bool)
        -> Result<()>;
}
