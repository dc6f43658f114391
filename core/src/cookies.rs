//! Cookie mutations carried by API responses.
//!
//! # Design
//! `extract_cookies` reads every `set-cookie` header of a response into a
//! `CookieMutationSet`, keyed by cookie name. Attributes are kept as the raw
//! strings the server sent; they only become typed values (dates, durations,
//! flags) in `CookieMutation::to_cookie`, right before a mutation is written
//! to a [`CookieStore`](crate::store::CookieStore). The set is serializable
//! so it can be handed across a context boundary and applied later.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::time::SystemTime;

use cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::http::HttpResponse;

/// One cookie write instructed by a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieMutation {
    pub name: String,
    pub value: String,
    /// Lower-cased attribute name to raw value; flags map to `""`.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl CookieMutation {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Parse a single `set-cookie` directive.
    pub fn parse(directive: &str) -> Option<Self> {
        let mut segments = directive.split(';');
        let (name, value) = segments.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut mutation = CookieMutation::new(name, value.trim());
        for segment in segments.map(str::trim).filter(|s| !s.is_empty()) {
            let (key, raw) = segment.split_once('=').unwrap_or((segment, ""));
            mutation
                .attributes
                .insert(key.trim().to_ascii_lowercase(), raw.trim().to_string());
        }
        Some(mutation)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn path(&self) -> Option<&str> {
        self.attribute("path")
    }

    /// The `Expires` attribute as a date; unparseable dates read as absent.
    pub fn expires(&self) -> Option<SystemTime> {
        self.attribute("expires")
            .and_then(|raw| httpdate::parse_http_date(raw).ok())
    }

    /// The `Max-Age` attribute in seconds.
    pub fn max_age(&self) -> Option<i64> {
        self.attribute("max-age").and_then(|raw| raw.parse().ok())
    }

    pub fn same_site(&self) -> Option<SameSite> {
        let raw = self.attribute("samesite")?;
        if raw.eq_ignore_ascii_case("strict") {
            Some(SameSite::Strict)
        } else if raw.eq_ignore_ascii_case("lax") {
            Some(SameSite::Lax)
        } else if raw.eq_ignore_ascii_case("none") {
            Some(SameSite::None)
        } else {
            None
        }
    }

    /// Whether applying this mutation deletes the cookie at `now`.
    pub fn is_removal(&self, now: SystemTime) -> bool {
        self.max_age().is_some_and(|age| age <= 0) || self.expires().is_some_and(|at| at <= now)
    }

    /// Convert into a typed cookie, translating the raw attributes.
    pub fn to_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.name.clone(), self.value.clone());
        if let Some(path) = self.path() {
            cookie.set_path(path.to_string());
        }
        if let Some(domain) = self.attribute("domain") {
            cookie.set_domain(domain.to_string());
        }
        if let Some(expires) = self.expires() {
            cookie.set_expires(OffsetDateTime::from(expires));
        }
        if let Some(max_age) = self.max_age() {
            cookie.set_max_age(time::Duration::seconds(max_age));
        }
        if self.has_flag("secure") {
            cookie.set_secure(true);
        }
        if self.has_flag("httponly") {
            cookie.set_http_only(true);
        }
        if let Some(same_site) = self.same_site() {
            cookie.set_same_site(same_site);
        }
        cookie
    }
}

/// Cookie writes keyed by name; later writes for a name replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieMutationSet {
    mutations: BTreeMap<String, CookieMutation>,
}

impl CookieMutationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mutation: CookieMutation) {
        self.mutations.insert(mutation.name.clone(), mutation);
    }

    /// Merge `later` into `self`; entries of `later` win.
    pub fn merge(&mut self, later: CookieMutationSet) {
        self.mutations.extend(later.mutations);
    }

    pub fn get(&self, name: &str) -> Option<&CookieMutation> {
        self.mutations.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mutations.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CookieMutation> {
        self.mutations.values()
    }
}

impl FromIterator<CookieMutation> for CookieMutationSet {
    fn from_iter<I: IntoIterator<Item = CookieMutation>>(iter: I) -> Self {
        let mut set = CookieMutationSet::new();
        for mutation in iter {
            set.insert(mutation);
        }
        set
    }
}

impl IntoIterator for CookieMutationSet {
    type Item = CookieMutation;
    type IntoIter = btree_map::IntoValues<String, CookieMutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.into_values()
    }
}

/// Collect the cookie mutations a response instructs the client to apply.
pub fn extract_cookies(response: &HttpResponse) -> CookieMutationSet {
    response
        .header_values("set-cookie")
        .filter_map(CookieMutation::parse)
        .collect()
}
