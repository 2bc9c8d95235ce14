use safeliza_state::{AccountRef, StateError};
use thiserror::Error;

/// Failures of the platform authenticator. None of these warrant a network
/// retry; the operator re-invokes the passkey prompt instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticatorError {
    /// Platform refused the request
    #[error("Authenticator declined the request: {0}")]
    Declined(String),

    /// Operator dismissed the prompt
    #[error("Passkey prompt was cancelled")]
    Cancelled,

    /// No credential matches the requested id
    #[error("No passkey credential available")]
    NoCredential,

    /// Authenticator returned data that cannot be encoded
    #[error("Invalid assertion: {0}")]
    InvalidAssertion(String),
}

/// SDK-specific error types for SafeLiza operations
#[derive(Debug, Clone, Error)]
pub enum SafelizaSdkError {
    /// Request could not complete (offline, timeout, DNS)
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-2xx status
    #[error("Backend rejected request ({status}): {message}")]
    BackendRejection { status: u16, message: String },

    /// Passkey step failed
    #[error(transparent)]
    Authenticator(#[from] AuthenticatorError),

    /// Backend answered 2xx with a body we cannot use
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    /// Operation not allowed in the orchestrator's current state
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// Another orchestrator holds the account's pending session
    #[error("A pending session is already held for {0}")]
    PendingSessionBusy(AccountRef),

    /// Endpoint toggle already in flight
    #[error("Endpoint access update already in progress")]
    EndpointToggleInFlight,

    /// Operator input failed validation
    #[error(transparent)]
    State(#[from] StateError),

    /// Missing or invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SafelizaSdkError {
    /// Whether the failure came from the backend or transport rather than
    /// the authenticator or local state.
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::BackendRejection { .. } | Self::InvalidResponse(_)
        )
    }
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, SafelizaSdkError>;
