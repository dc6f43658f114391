//! The session bridge between orchestrated calls and the cookie store.
//!
//! # Design
//! Accessors never write cookies themselves. They run against a read-only
//! [`Context`] and hand their cookie mutations back inside an [`Outcome`];
//! [`Session::call`] then applies those mutations to the store it owns and
//! returns only the payload. This keeps "what the server asked for" separate
//! from "where the cookies live" and lets a mutation set cross a context
//! boundary (serialized) before [`Session::apply_cookies`] persists it.

use std::time::SystemTime;

use tracing::debug;

use crate::auth::{Outcome, Redirect};
use crate::cache::{AccountCache, Clock};
use crate::config::ClientConfig;
use crate::cookies::CookieMutationSet;
use crate::error::{ConfigError, Error};
use crate::resources::{accounts, auth, boards, items, reports};
use crate::store::{CookieStore, MemoryCookieStore};
use crate::transport::{ApiClient, Transport, UreqTransport};
use crate::types::{
    Account, AuthenticatedAccount, Board, Collection, Credentials, Item, NewBoard, NewReport,
    Report,
};

/// Borrowed view an action runs against: the client, the current cookies
/// and the page being served.
pub struct Context<'a, T> {
    client: &'a ApiClient<T>,
    cookies: &'a dyn CookieStore,
    return_to: Option<&'a str>,
}

impl<'a, T: Transport> Context<'a, T> {
    pub fn new(client: &'a ApiClient<T>, cookies: &'a dyn CookieStore) -> Self {
        Self {
            client,
            cookies,
            return_to: None,
        }
    }

    pub fn with_return_to(mut self, path: &'a str) -> Self {
        self.return_to = Some(path);
        self
    }

    pub fn client(&self) -> &'a ApiClient<T> {
        self.client
    }

    pub fn cookies(&self) -> &'a dyn CookieStore {
        self.cookies
    }

    pub fn config(&self) -> &'a ClientConfig {
        self.client.config()
    }

    /// The redirect to the login page for this context.
    pub fn redirect(&self) -> Redirect {
        Redirect::to_login(&self.config().login_page, self.return_to)
    }
}

/// One user's session: an API client plus the cookie store it owns.
#[derive(Debug)]
pub struct Session<T, S = MemoryCookieStore> {
    client: ApiClient<T>,
    store: S,
    return_to: Option<String>,
}

impl Session<UreqTransport, MemoryCookieStore> {
    /// A blocking session with an empty in-memory cookie store.
    pub fn connect(config: ClientConfig) -> Self {
        Session::new(ApiClient::with_ureq(config), MemoryCookieStore::new())
    }

    /// [`Session::connect`] with configuration read from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::connect(ClientConfig::from_env()?))
    }
}

impl<T: Transport, S: CookieStore> Session<T, S> {
    pub fn new(client: ApiClient<T>, store: S) -> Self {
        Self {
            client,
            store,
            return_to: None,
        }
    }

    /// Remember the page being served so redirects can send the user back.
    pub fn with_return_to(mut self, path: &str) -> Self {
        self.return_to = Some(path.to_string());
        self
    }

    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn context(&self) -> Context<'_, T> {
        let ctx = Context::new(&self.client, &self.store);
        match self.return_to.as_deref() {
            Some(path) => ctx.with_return_to(path),
            None => ctx,
        }
    }

    /// Run `action`, persist the cookie mutations it returns (on success and
    /// on failure) and hand back the payload.
    pub fn call<P>(&mut self, action: impl FnOnce(&Context<'_, T>) -> Outcome<P>) -> Result<P, Error> {
        let outcome = {
            let ctx = self.context();
            action(&ctx)
        };
        let (result, cookies) = outcome.into_parts();
        if let Some(cookies) = cookies {
            self.apply_cookies(cookies);
        }
        result
    }

    /// Write every mutation of `cookies` to the store; removals delete the
    /// cookie.
    pub fn apply_cookies(&mut self, cookies: CookieMutationSet) {
        debug!(count = cookies.len(), "applying cookie mutations");
        let now = SystemTime::now();
        for mutation in cookies {
            if mutation.is_removal(now) {
                self.store.remove(&mutation.name);
            } else {
                self.store.set(mutation.to_cookie());
            }
        }
    }

    pub fn login(&mut self, credentials: &Credentials) -> Result<(), Error> {
        self.call(|ctx| auth::login(ctx, credentials))
    }

    pub fn logout(&mut self) -> Result<(), Error> {
        self.call(auth::logout)
    }

    pub fn own_account(&mut self, redirect: bool) -> Result<AuthenticatedAccount, Error> {
        self.call(|ctx| accounts::own_account(ctx, redirect))
    }

    pub fn all_accounts(&mut self) -> Result<Collection<Account>, Error> {
        self.call(accounts::all_accounts)
    }

    /// Resolve an account through `cache`; never fails.
    pub fn lookup_account<C: Clock>(&self, cache: &AccountCache<C>, id: &str) -> Account {
        cache.lookup(&self.context(), id)
    }

    pub fn editable_boards(&mut self) -> Result<Collection<Board>, Error> {
        self.call(boards::editable_boards)
    }

    pub fn create_board(&mut self, board: &NewBoard) -> Result<Board, Error> {
        self.call(|ctx| boards::create_board(ctx, board))
    }

    pub fn board(&mut self, slug: &str) -> Result<Board, Error> {
        self.call(|ctx| boards::board(ctx, slug))
    }

    pub fn board_items(&mut self, board_id: &str) -> Result<Collection<Item>, Error> {
        self.call(|ctx| items::board_items(ctx, board_id))
    }

    pub fn my_reports(&mut self) -> Result<Collection<Report>, Error> {
        self.call(reports::my_reports)
    }

    pub fn create_report(&mut self, report: &NewReport) -> Result<Report, Error> {
        self.call(|ctx| reports::create_report(ctx, report))
    }
}
