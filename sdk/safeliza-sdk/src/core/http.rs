//! reqwest-backed [`SessionBackend`].

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use safeliza_state::{
    AccountRef, Address, InstalledModules, OperationHash, PreparedUserOperation,
    SessionConfigDto, SessionConfigRecord, SessionConfigured, SessionCreationReceipt,
    UserOperationCall, UserOperationReceipt, UserProfile,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::config::ClientConfig;
use crate::core::connection::SessionBackend;
use crate::core::constants::*;
use crate::error::{Result, SafelizaSdkError};
use crate::types::{EncodedSignature, LoginRequest, PasskeyChallenge, RegistrationRequest};

/// Session backend reached over HTTP with a cookie-carried login.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: ClientConfig,
}

#[derive(Serialize)]
struct ChallengeBody<'a> {
    username: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountBody {
    safe_address: Address,
    chain_id: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigureBody<'a> {
    safe_address: Address,
    chain_id: u64,
    session_config_dto: &'a SessionConfigDto,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignCreationBody<'a> {
    hash: &'a OperationHash,
    safe_address: Address,
    chain_id: u64,
    encoded_signature: &'a EncodedSignature,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserOperationBody<'a> {
    address: Address,
    chain_id: u64,
    calls: &'a [UserOperationCall],
    passkey_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteUserOperationBody<'a> {
    encoded_signature: &'a EncodedSignature,
    user_op_hash_to_sign: &'a OperationHash,
    safe_address: Address,
    chain_id: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivateEndpointBody<'a> {
    path: &'a str,
    safe_address: Address,
    chain_id: u64,
    active: bool,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| SafelizaSdkError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send(&self, path: &str, request: RequestBuilder) -> Result<Response> {
        debug!(path, "backend request");
        let response = request
            .send()
            .await
            .map_err(|e| SafelizaSdkError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(path, status = status.as_u16(), %message, "backend rejected request");
            return Err(SafelizaSdkError::BackendRejection {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SafelizaSdkError::Network(e.to_string()))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| SafelizaSdkError::InvalidResponse(format!("{}: {}", path, e)))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.config.endpoint(path)).json(body);
        let response = self.send(path, request).await?;
        Self::decode(path, response).await
    }

    async fn post_unit<B>(&self, path: &str, body: Option<&B>) -> Result<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        let mut request = self.client.post(self.config.endpoint(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(path, request).await.map(|_| ())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.client.get(self.config.endpoint(path));
        let response = self.send(path, request).await?;
        Self::decode(path, response).await
    }
}

#[async_trait]
impl SessionBackend for HttpBackend {
    async fn request_challenge(&self, username: Option<&str>) -> Result<PasskeyChallenge> {
        let mut request = self.client.post(self.config.endpoint(PASSKEY_CHALLENGE_PATH));
        if let Some(username) = username {
            request = request.json(&ChallengeBody { username });
        }
        let response = self.send(PASSKEY_CHALLENGE_PATH, request).await?;
        Self::decode(PASSKEY_CHALLENGE_PATH, response).await
    }

    async fn verify_registration(&self, request: &RegistrationRequest) -> Result<()> {
        self.post_unit(PASSKEY_VERIFY_PATH, Some(request)).await
    }

    async fn verify_login(&self, request: &LoginRequest) -> Result<()> {
        self.post_unit(PASSKEY_VERIFY_PATH, Some(request)).await
    }

    async fn current_user(&self) -> Result<UserProfile> {
        self.get_json(CURRENT_USER_PATH).await
    }

    async fn logout(&self) -> Result<()> {
        self.post_unit::<()>(LOGOUT_PATH, None).await
    }

    async fn installed_modules(&self, account: &AccountRef) -> Result<InstalledModules> {
        let body = AccountBody {
            safe_address: account.safe_address,
            chain_id: account.chain_id,
        };
        self.post_json(INSTALLED_MODULES_PATH, &body).await
    }

    async fn configure_smart_session(
        &self,
        account: &AccountRef,
        session: &SessionConfigDto,
    ) -> Result<SessionConfigured> {
        let body = ConfigureBody {
            safe_address: account.safe_address,
            chain_id: account.chain_id,
            session_config_dto: session,
        };
        self.post_json(CONFIGURE_SMART_SESSION_PATH, &body).await
    }

    async fn sign_session_creation(
        &self,
        account: &AccountRef,
        hash: &OperationHash,
        signature: &EncodedSignature,
    ) -> Result<SessionCreationReceipt> {
        let body = SignCreationBody {
            hash,
            safe_address: account.safe_address,
            chain_id: account.chain_id,
            encoded_signature: signature,
        };
        let request = self
            .client
            .post(self.config.endpoint(SIGN_SESSION_CREATION_PATH))
            .json(&body);
        let response = self.send(SIGN_SESSION_CREATION_PATH, request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SafelizaSdkError::Network(e.to_string()))?;
        // Older backends answer with an empty body.
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(SessionCreationReceipt::default());
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            SafelizaSdkError::InvalidResponse(format!("{}: {}", SIGN_SESSION_CREATION_PATH, e))
        })
    }

    async fn create_passkey_user_operation(
        &self,
        account: &AccountRef,
        calls: &[UserOperationCall],
        passkey_id: &str,
    ) -> Result<PreparedUserOperation> {
        let body = CreateUserOperationBody {
            address: account.safe_address,
            chain_id: account.chain_id,
            calls,
            passkey_id,
        };
        self.post_json(CREATE_USER_OPERATION_PATH, &body).await
    }

    async fn execute_signed_user_operation(
        &self,
        account: &AccountRef,
        user_op_hash: &OperationHash,
        signature: &EncodedSignature,
    ) -> Result<UserOperationReceipt> {
        let body = ExecuteUserOperationBody {
            encoded_signature: signature,
            user_op_hash_to_sign: user_op_hash,
            safe_address: account.safe_address,
            chain_id: account.chain_id,
        };
        self.post_json(EXECUTE_USER_OPERATION_PATH, &body).await
    }

    async fn session_details(&self, account: &AccountRef) -> Result<Vec<SessionConfigRecord>> {
        let path = format!(
            "{}/{}/{}",
            SESSION_DETAILS_PATH, account.safe_address, account.chain_id
        );
        self.get_json(&path).await
    }

    async fn activate_endpoint(
        &self,
        account: &AccountRef,
        path: &str,
        active: bool,
    ) -> Result<()> {
        let body = ActivateEndpointBody {
            path,
            safe_address: account.safe_address,
            chain_id: account.chain_id,
            active,
        };
        self.post_unit(ACTIVATE_ENDPOINT_PATH, Some(&body)).await
    }
}
