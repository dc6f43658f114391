//! Typed accessors for the bulletin API.
//!
//! Each accessor is a thin function over a [`Context`] that names the
//! method, path, payload type and credential policy of one endpoint and
//! returns an [`Outcome`]. Run them through
//! [`Session::call`](crate::session::Session::call) to persist the cookies
//! they forward.

pub mod accounts;
pub mod auth;
pub mod boards;
pub mod items;
pub mod reports;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::{authed_request, Call, Outcome};
use crate::http::HttpMethod;
use crate::session::Context;
use crate::transport::{Body, Transport};

/// Authenticated call with a JSON body.
fn authed_json<T, B, P>(ctx: &Context<'_, T>, method: HttpMethod, path: &str, body: &B) -> Outcome<P>
where
    T: Transport,
    B: Serialize,
    P: DeserializeOwned,
{
    match Body::json(body) {
        Ok(body) => authed_request(ctx, &Call::new(method, path).body(body)),
        Err(error) => Outcome::failure(error),
    }
}
