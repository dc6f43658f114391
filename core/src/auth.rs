//! Authenticated calls with transparent access-token refresh.
//!
//! # Design
//! `authed_request` attaches the access token from the session's cookie
//! store to a `Call` and sends it. When the API rejects the token with
//! `invalid_access_token`, it presents the refresh token to the refresh
//! endpoint once, and on success retries the same call exactly once
//! with the new token. The result is an `Outcome`: a payload (plus the
//! cookie mutations to persist), a failure, or a redirect to the login page
//! when the session cannot be recovered.
//!
//! After a refresh, the refreshed access-token mutation takes precedence over
//! any access cookie the retried response sets, so the store always ends up
//! holding the refreshed token.
//!
//! There is no single-flight coordination: concurrent calls that all hit an
//! expired token each refresh independently.

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::form_urlencoded;

use crate::cookies::{extract_cookies, CookieMutation, CookieMutationSet};
use crate::error::{ApiError, Error};
use crate::http::{HttpMethod, HttpResponse};
use crate::session::Context;
use crate::transport::{parse_response, Body, Transport};

/// "Send the user to the login page", optionally remembering where they were.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub return_to: Option<String>,
}

impl Redirect {
    pub fn to_login(location: &str, return_to: Option<&str>) -> Self {
        Self {
            location: location.to_string(),
            return_to: return_to.map(str::to_string),
        }
    }

    /// The URL to navigate to, with `next=<return_to>` when present.
    pub fn target(&self) -> String {
        match &self.return_to {
            Some(path) => {
                let next: String = form_urlencoded::byte_serialize(path.as_bytes()).collect();
                format!("{}?next={next}", self.location)
            }
            None => self.location.clone(),
        }
    }
}

/// One API call, independent of the credential attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Body,
    /// Return the response's cookie mutations alongside the payload.
    pub forward_cookies: bool,
    /// Turn "no usable credentials" into a redirect instead of an error.
    pub redirect_on_failure: bool,
}

impl Call {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: Body::Empty,
            forward_cookies: false,
            redirect_on_failure: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Body) -> Self {
        Self::new(HttpMethod::Post, path).body(body)
    }

    pub fn put(path: impl Into<String>, body: Body) -> Self {
        Self::new(HttpMethod::Put, path).body(body)
    }

    /// A DELETE carries no body; adding one makes the call fail before sending.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn forward_cookies(mut self) -> Self {
        self.forward_cookies = true;
        self
    }

    pub fn redirect_on_failure(mut self, redirect: bool) -> Self {
        self.redirect_on_failure = redirect;
        self
    }

    fn with_credential(&self, cookie_name: &str, token: &str) -> Vec<(String, String)> {
        let mut headers = self.headers.clone();
        headers.push(("cookie".to_string(), format!("{cookie_name}={token}")));
        headers
    }
}

/// Result of one orchestrated call.
#[derive(Debug)]
#[must_use]
pub enum Outcome<P> {
    Success {
        payload: P,
        cookies: Option<CookieMutationSet>,
    },
    /// The call failed; `cookies` still holds mutations that must be
    /// persisted, such as a freshly refreshed access token.
    Failure {
        error: ApiError,
        cookies: Option<CookieMutationSet>,
    },
    Redirect(Redirect),
}

impl<P> Outcome<P> {
    pub fn success(payload: P) -> Self {
        Outcome::Success {
            payload,
            cookies: None,
        }
    }

    pub fn failure(error: ApiError) -> Self {
        Outcome::Failure {
            error,
            cookies: None,
        }
    }

    pub fn map<Q>(self, f: impl FnOnce(P) -> Q) -> Outcome<Q> {
        match self {
            Outcome::Success { payload, cookies } => Outcome::Success {
                payload: f(payload),
                cookies,
            },
            Outcome::Failure { error, cookies } => Outcome::Failure { error, cookies },
            Outcome::Redirect(redirect) => Outcome::Redirect(redirect),
        }
    }

    pub fn cookies(&self) -> Option<&CookieMutationSet> {
        match self {
            Outcome::Success { cookies, .. } | Outcome::Failure { cookies, .. } => cookies.as_ref(),
            Outcome::Redirect(_) => None,
        }
    }

    /// Split into the caller-visible result and the cookies to persist.
    pub fn into_parts(self) -> (Result<P, Error>, Option<CookieMutationSet>) {
        match self {
            Outcome::Success { payload, cookies } => (Ok(payload), cookies),
            Outcome::Failure { error, cookies } => (Err(Error::Api(error)), cookies),
            Outcome::Redirect(redirect) => (Err(Error::Redirect(redirect)), None),
        }
    }
}

/// Send `call` without credentials.
pub fn public_request<T, P>(ctx: &Context<'_, T>, call: &Call) -> Outcome<P>
where
    T: Transport,
    P: DeserializeOwned,
{
    match ctx
        .client()
        .exchange(call.method, &call.path, &call.headers, &call.body)
    {
        Ok(response) => finish(&response, call.forward_cookies.then(CookieMutationSet::new)),
        Err(error) => Outcome::failure(error),
    }
}

/// Send `call` with the session's access token, refreshing it once if the
/// API reports it expired.
pub fn authed_request<T, P>(ctx: &Context<'_, T>, call: &Call) -> Outcome<P>
where
    T: Transport,
    P: DeserializeOwned,
{
    let config = ctx.config();
    let Some(access_token) = ctx.cookies().get(&config.access_cookie) else {
        debug!(path = %call.path, "no access token");
        return if call.redirect_on_failure {
            Outcome::Redirect(ctx.redirect())
        } else {
            Outcome::failure(ApiError::not_authenticated())
        };
    };

    let response = match send_with_token(ctx, call, &access_token) {
        Ok(response) => response,
        Err(error) => return Outcome::failure(error),
    };
    match parse_response::<P>(&response) {
        Ok(payload) => {
            let cookies = call.forward_cookies.then(|| extract_cookies(&response));
            return Outcome::Success { payload, cookies };
        }
        Err(error) if error.is_invalid_access_token() => {}
        Err(error) => return Outcome::failure(error),
    }

    let renewed = match refresh_access_token(ctx) {
        Refresh::Renewed(mutation) => mutation,
        Refresh::Expired => return Outcome::Redirect(ctx.redirect()),
        Refresh::Failed(error) => return Outcome::failure(error),
    };

    info!(path = %call.path, "retrying request with refreshed access token");
    let token = renewed.value.clone();
    let refreshed: CookieMutationSet = [renewed].into_iter().collect();
    match send_with_token(ctx, call, &token) {
        Ok(response) => finish(&response, Some(refreshed)),
        Err(error) => Outcome::Failure {
            error,
            cookies: Some(refreshed),
        },
    }
}

/// Decode `response`. When `overlay` is given, the response's cookie
/// mutations are returned with the result, with `overlay` merged over them.
fn finish<P: DeserializeOwned>(
    response: &HttpResponse,
    overlay: Option<CookieMutationSet>,
) -> Outcome<P> {
    let cookies = overlay.map(|overlay| {
        let mut cookies = extract_cookies(response);
        cookies.merge(overlay);
        cookies
    });
    match parse_response(response) {
        Ok(payload) => Outcome::Success { payload, cookies },
        Err(error) => Outcome::Failure { error, cookies },
    }
}

fn send_with_token<T: Transport>(
    ctx: &Context<'_, T>,
    call: &Call,
    token: &str,
) -> Result<HttpResponse, ApiError> {
    let headers = call.with_credential(&ctx.config().access_cookie, token);
    ctx.client()
        .exchange(call.method, &call.path, &headers, &call.body)
}

enum Refresh {
    Renewed(CookieMutation),
    /// The session cannot be refreshed; the user must log in again.
    Expired,
    Failed(ApiError),
}

fn refresh_access_token<T: Transport>(ctx: &Context<'_, T>) -> Refresh {
    let config = ctx.config();
    let Some(refresh_token) = ctx.cookies().get(&config.refresh_cookie) else {
        info!("access token expired and no refresh token is present");
        return Refresh::Expired;
    };

    info!("refreshing access token");
    let headers = vec![(
        "cookie".to_string(),
        format!("{}={refresh_token}", config.refresh_cookie),
    )];
    let response = match ctx.client().exchange(
        HttpMethod::Post,
        &config.paths.refresh,
        &headers,
        &Body::Empty,
    ) {
        Ok(response) => response,
        Err(error) => return Refresh::Failed(error),
    };

    if let Err(error) = parse_response::<serde_json::Value>(&response) {
        if error.is_invalid_refresh_token() {
            info!("refresh token rejected, session expired");
        } else {
            warn!(status = response.status, error = %error, "access token refresh failed");
        }
        return Refresh::Expired;
    }

    match extract_cookies(&response).get(&config.access_cookie) {
        Some(mutation) => Refresh::Renewed(mutation.clone()),
        None => {
            warn!("refresh response did not set an access token");
            Refresh::Expired
        }
    }
}
