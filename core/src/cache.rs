//! Process-wide account lookup cache.
//!
//! # Design
//! Pages resolve many account ids (board owners, report authors) that all
//! come from one public collection endpoint. `AccountCache` keeps the whole
//! collection and refetches it when it is older than the TTL or when an id
//! is missing. A refresh replaces the map wholesale. Lookups never fail:
//! unknown ids, and ids requested while the API is unreachable, resolve to
//! [`Account::unavailable`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::auth::{public_request, Call, Outcome};
use crate::config::ClientConfig;
use crate::session::Context;
use crate::transport::Transport;
use crate::types::{Account, Collection};

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[derive(Debug, Default)]
struct CacheState {
    accounts: HashMap<String, Account>,
    last_refresh: Option<Instant>,
}

#[derive(Debug)]
pub struct AccountCache<C = SystemClock> {
    ttl: Duration,
    clock: C,
    state: RwLock<CacheState>,
}

impl AccountCache<SystemClock> {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.account_cache_ttl(), SystemClock)
    }
}

impl<C: Clock> AccountCache<C> {
    pub fn new(ttl: Duration, clock: C) -> Self {
        Self {
            ttl,
            clock,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn lookup<T: Transport>(&self, ctx: &Context<'_, T>, id: &str) -> Account {
        self.lookup_many(ctx, &[id])
            .remove(id)
            .unwrap_or_else(Account::unavailable)
    }

    /// Resolve every id, refreshing at most once.
    pub fn lookup_many<T: Transport>(
        &self,
        ctx: &Context<'_, T>,
        ids: &[&str],
    ) -> HashMap<String, Account> {
        if self.needs_refresh(ids) {
            self.refresh(ctx);
        }
        let state = self.state.read();
        ids.iter()
            .map(|id| {
                let account = state
                    .accounts
                    .get(*id)
                    .cloned()
                    .unwrap_or_else(Account::unavailable);
                (id.to_string(), account)
            })
            .collect()
    }

    fn needs_refresh(&self, ids: &[&str]) -> bool {
        let state = self.state.read();
        let stale = match state.last_refresh {
            Some(at) => self.clock.now().saturating_duration_since(at) >= self.ttl,
            None => true,
        };
        stale || ids.iter().any(|id| !state.accounts.contains_key(*id))
    }

    fn refresh<T: Transport>(&self, ctx: &Context<'_, T>) {
        let outcome: Outcome<Collection<Account>> = public_request(ctx, &Call::get("/accounts"));
        match outcome {
            Outcome::Success { payload, .. } => {
                let accounts: HashMap<_, _> = payload
                    .contents
                    .into_iter()
                    .map(|account| (account.id.clone(), account))
                    .collect();
                debug!(count = accounts.len(), "account cache refreshed");
                let mut state = self.state.write();
                state.accounts = accounts;
                state.last_refresh = Some(self.clock.now());
            }
            Outcome::Failure { error, .. } => {
                warn!(error = %error, "account cache refresh failed, serving stale entries");
            }
            Outcome::Redirect(_) => {}
        }
    }
}
