//! SafeLiza SDK
//!
//! Client side of SafeLiza smart sessions: compiles an operator's policy
//! form into the session backend's encoding, runs the passkey ceremonies,
//! and drives a session from submission through passkey approval to a
//! signed receipt.

pub mod advanced;
pub mod basic;
pub mod core;
pub mod error;
pub mod types;
pub mod utils;

pub use crate::advanced::authenticator::SoftwareAuthenticator;
pub use crate::basic::access::SessionAccessGate;
pub use crate::basic::orchestrator::{SigningOrchestrator, SigningState};
pub use crate::basic::passkey::{PasskeyChallengeClient, PasskeyRegistration};
pub use crate::basic::pending::{PendingLease, PendingSessionRegistry};
pub use crate::basic::policy::{compile, compile_authority};
pub use crate::basic::sessions::SessionDetailsCache;
pub use crate::core::config::ClientConfig;
pub use crate::core::connection::SessionBackend;
pub use crate::core::http::HttpBackend;
pub use crate::core::signer::PasskeyAuthenticator;
pub use crate::error::{AuthenticatorError, Result, SafelizaSdkError};
pub use crate::types::{Assertion, Credential, EncodedSignature};

pub mod state {
    pub use safeliza_state::*;
}
