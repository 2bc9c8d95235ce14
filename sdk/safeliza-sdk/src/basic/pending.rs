use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use safeliza_state::AccountRef;
use tracing::debug;

use crate::error::{Result, SafelizaSdkError};

/// Per-account pending-session slots shared by every orchestrator.
///
/// At most one lease exists per account. Dropping the lease frees the slot.
#[derive(Clone, Default)]
pub struct PendingSessionRegistry {
    slots: Arc<DashMap<AccountRef, u64>>,
    next_token: Arc<AtomicU64>,
}

impl PendingSessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, account: AccountRef) -> Result<PendingLease> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        match self.slots.entry(account) {
            Entry::Occupied(_) => Err(SafelizaSdkError::PendingSessionBusy(account)),
            Entry::Vacant(slot) => {
                slot.insert(token);
                debug!(%account, "pending session slot acquired");
                Ok(PendingLease {
                    slots: Arc::clone(&self.slots),
                    account,
                    token,
                })
            },
        }
    }

    pub fn is_held(&self, account: &AccountRef) -> bool {
        self.slots.contains_key(account)
    }
}

/// Exclusive hold on one account's pending-session slot.
#[derive(Debug)]
pub struct PendingLease {
    slots: Arc<DashMap<AccountRef, u64>>,
    account: AccountRef,
    token: u64,
}

impl PendingLease {
    pub fn account(&self) -> &AccountRef {
        &self.account
    }
}

impl Drop for PendingLease {
    fn drop(&mut self) {
        if self
            .slots
            .remove_if(&self.account, |_, token| *token == self.token)
            .is_some()
        {
            debug!(account = %self.account, "pending session slot released");
        }
    }
}
