use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use safeliza_sdk::{
    ClientConfig, HttpBackend, PasskeyChallengeClient, PendingSessionRegistry,
    SessionDetailsCache, SigningOrchestrator, SoftwareAuthenticator,
};
use safeliza_state::AccountRef;

use crate::Args;

/// Live backend plus a software passkey standing in for the browser.
pub struct TestContext {
    pub backend: Arc<HttpBackend>,
    pub authenticator: Arc<SoftwareAuthenticator>,
    pub registry: PendingSessionRegistry,
    pub username: String,
    /// Set once the happy path has resolved the user's Safe
    pub account: Option<AccountRef>,
}

impl TestContext {
    pub fn new(args: &Args) -> Result<Self> {
        let config = ClientConfig::new(args.backend_url.as_str())
            .with_request_timeout(Duration::from_millis(args.request_timeout_ms))
            .with_connect_timeout(Duration::from_millis(args.connect_timeout_ms));
        let backend = HttpBackend::new(config).context("Failed to build backend client")?;

        let mut authenticator = SoftwareAuthenticator::new(args.rp_id.as_str());
        if let Some(origin) = &args.origin {
            authenticator = authenticator.with_origin(origin.as_str());
        }

        let username = args
            .username
            .clone()
            .unwrap_or_else(|| format!("e2e-{:08x}", rand::random::<u32>()));

        Ok(Self {
            backend: Arc::new(backend),
            authenticator: Arc::new(authenticator),
            registry: PendingSessionRegistry::new(),
            username,
            account: None,
        })
    }

    pub fn passkeys(&self) -> PasskeyChallengeClient {
        PasskeyChallengeClient::new(self.backend.clone(), self.authenticator.clone())
    }

    pub fn cache(&self) -> SessionDetailsCache {
        SessionDetailsCache::new(self.backend.clone())
    }

    pub fn account(&self) -> Result<AccountRef> {
        self.account
            .ok_or_else(|| anyhow!("no Safe resolved, run the happy path first"))
    }

    pub fn orchestrator(&self) -> Result<SigningOrchestrator> {
        Ok(SigningOrchestrator::new(
            self.account()?,
            self.backend.clone(),
            self.passkeys(),
            self.registry.clone(),
        ))
    }
}
