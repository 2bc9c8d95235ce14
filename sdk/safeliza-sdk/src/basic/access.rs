use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use safeliza_state::{AccountRef, SessionConfigRecord};
use tracing::{info, warn};

use crate::basic::sessions::SessionDetailsCache;
use crate::core::connection::SessionBackend;
use crate::error::{Result, SafelizaSdkError};

/// Revocable access switch for one session endpoint.
///
/// The displayed state only flips after the backend confirms the change.
/// While a request is in flight further toggles are refused.
pub struct SessionAccessGate {
    backend: Arc<dyn SessionBackend>,
    account: AccountRef,
    url: String,
    active: AtomicBool,
    loading: AtomicBool,
    refresh: Option<SessionDetailsCache>,
}

impl SessionAccessGate {
    pub fn new(
        backend: Arc<dyn SessionBackend>,
        account: AccountRef,
        url: impl Into<String>,
        active: bool,
    ) -> Self {
        Self {
            backend,
            account,
            url: url.into(),
            active: AtomicBool::new(active),
            loading: AtomicBool::new(false),
            refresh: None,
        }
    }

    /// Gate for the endpoint attached to `record`.
    pub fn for_record(
        backend: Arc<dyn SessionBackend>,
        account: AccountRef,
        record: &SessionConfigRecord,
    ) -> Self {
        Self::new(backend, account, record.endpoint.url.clone(), record.endpoint.active)
    }

    /// Refresh `cache` after every successful toggle.
    pub fn with_refresh(mut self, cache: SessionDetailsCache) -> Self {
        self.refresh = Some(cache);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Ask the backend to enable or disable the endpoint. Returns the new
    /// displayed state.
    pub async fn toggle(&self, active: bool) -> Result<bool> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SafelizaSdkError::EndpointToggleInFlight);
        }
        let _in_flight = InFlight(&self.loading);

        if let Err(e) = self
            .backend
            .activate_endpoint(&self.account, &self.url, active)
            .await
        {
            warn!(url = %self.url, active, error = %e, "endpoint toggle failed");
            return Err(e);
        }

        self.active.store(active, Ordering::SeqCst);
        info!(url = %self.url, active, "endpoint access updated");

        if let Some(cache) = &self.refresh {
            if let Err(e) = cache.refresh().await {
                warn!(error = %e, "session refresh after toggle failed");
            }
        }
        Ok(active)
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
