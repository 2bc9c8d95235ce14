use std::sync::{Arc, Mutex};

use safeliza_state::{AccountRef, SessionConfigRecord};
use tracing::{debug, warn};

use crate::core::connection::SessionBackend;
use crate::error::{Result, SafelizaSdkError};
use crate::utils::lock;

#[derive(Default)]
struct CacheState {
    account: Option<AccountRef>,
    generation: u64,
    records: Vec<SessionConfigRecord>,
    loading: bool,
    error: Option<SafelizaSdkError>,
}

/// Latest session configurations for the selected account.
///
/// Every fetch replaces the whole list. A response that arrives after the
/// account changed, or after a newer fetch started, is dropped.
#[derive(Clone)]
pub struct SessionDetailsCache {
    backend: Arc<dyn SessionBackend>,
    state: Arc<Mutex<CacheState>>,
}

impl SessionDetailsCache {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Select `account` and load its sessions. Switching accounts clears
    /// the previous account's records first.
    pub async fn fetch(&self, account: AccountRef) -> Result<Vec<SessionConfigRecord>> {
        {
            let mut state = lock(&self.state);
            if state.account != Some(account) {
                state.account = Some(account);
                state.records.clear();
                state.error = None;
            }
        }
        self.refresh().await
    }

    /// Re-fetch the selected account's sessions and return what the cache
    /// holds afterwards.
    pub async fn refresh(&self) -> Result<Vec<SessionConfigRecord>> {
        let (account, generation) = {
            let mut state = lock(&self.state);
            let account = state.account.ok_or(SafelizaSdkError::InvalidState {
                operation: "refresh sessions",
                state: "no account selected",
            })?;
            state.generation += 1;
            state.loading = true;
            (account, state.generation)
        };

        let mut loading = LoadingGuard {
            state: &self.state,
            generation,
            armed: true,
        };
        let result = self.backend.session_details(&account).await;
        loading.armed = false;

        let mut state = lock(&self.state);
        if state.generation != generation || state.account != Some(account) {
            debug!(%account, generation, "discarding stale session details");
            return Ok(state.records.clone());
        }
        state.loading = false;
        match result {
            Ok(records) => {
                debug!(%account, count = records.len(), "session details loaded");
                state.records = records;
                state.error = None;
                Ok(state.records.clone())
            },
            Err(e) => {
                warn!(%account, error = %e, "failed to load session details");
                state.error = Some(e.clone());
                Err(e)
            },
        }
    }

    pub fn account(&self) -> Option<AccountRef> {
        lock(&self.state).account
    }

    pub fn records(&self) -> Vec<SessionConfigRecord> {
        lock(&self.state).records.clone()
    }

    /// Look up a session by its permission id.
    pub fn record(&self, permission_id: &str) -> Option<SessionConfigRecord> {
        lock(&self.state)
            .records
            .iter()
            .find(|r| r.permission_id == permission_id)
            .cloned()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.state).loading
    }

    pub fn last_error(&self) -> Option<SafelizaSdkError> {
        lock(&self.state).error.clone()
    }
}

// Clears `loading` if a fetch is dropped before its response arrives.
struct LoadingGuard<'a> {
    state: &'a Mutex<CacheState>,
    generation: u64,
    armed: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = lock(self.state);
        if state.generation == self.generation {
            state.loading = false;
        }
    }
}
