//! The ambient cookie store a session reads credentials from and writes
//! cookie mutations into.

use cookie::{Cookie, CookieJar};
use time::OffsetDateTime;

/// Read/write access to the cookies of one user session.
pub trait CookieStore {
    /// Current value of a live cookie.
    fn get(&self, name: &str) -> Option<String>;

    /// Store `cookie`, or drop it when it is already expired.
    fn set(&mut self, cookie: Cookie<'static>);

    fn remove(&mut self, name: &str);
}

/// In-memory `CookieStore` over a `cookie::CookieJar`.
///
/// `Max-Age` is converted to an absolute expiry when a cookie is stored,
/// and expired entries read as absent.
#[derive(Debug, Clone, Default)]
pub struct MemoryCookieStore {
    jar: CookieJar,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with plain name/value pairs.
    pub fn with_values<'a>(values: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut store = Self::new();
        for (name, value) in values {
            store.set(Cookie::new(name.to_string(), value.to_string()));
        }
        store
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }
}

impl CookieStore for MemoryCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        let cookie = self.jar.get(name)?;
        let expired = cookie
            .expires_datetime()
            .is_some_and(|at| at <= OffsetDateTime::now_utc());
        (!expired).then(|| cookie.value().to_string())
    }

    fn set(&mut self, mut cookie: Cookie<'static>) {
        let now = OffsetDateTime::now_utc();
        if let Some(max_age) = cookie.max_age() {
            if max_age <= time::Duration::ZERO {
                self.remove(cookie.name());
                return;
            }
            match now.checked_add(max_age) {
                Some(at) => cookie.set_expires(at),
                // Beyond the representable range: keep it for the session.
                None => cookie.unset_expires(),
            }
        }
        if cookie.expires_datetime().is_some_and(|at| at <= now) {
            self.remove(cookie.name());
            return;
        }
        self.jar.add(cookie);
    }

    fn remove(&mut self, name: &str) {
        self.jar.remove(Cookie::new(name.to_string(), ""));
    }
}
