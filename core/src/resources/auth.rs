use serde_json::json;

use crate::auth::{authed_request, public_request, Call, Outcome};
use crate::session::Context;
use crate::transport::{Body, Transport};
use crate::types::Credentials;

/// Log in with a username or email. The forwarded cookies hold the new
/// access and refresh tokens.
pub fn login<T: Transport>(ctx: &Context<'_, T>, credentials: &Credentials) -> Outcome<()> {
    let form = Body::form([
        ("identifier", credentials.identifier.as_str()),
        ("password", credentials.password.as_str()),
    ]);
    let call = Call::post(ctx.config().paths.login.as_str(), form).forward_cookies();
    public_request(ctx, &call)
}

/// Log out; the forwarded cookies remove both tokens.
pub fn logout<T: Transport>(ctx: &Context<'_, T>) -> Outcome<()> {
    let call = Call::post(ctx.config().paths.logout.as_str(), Body::Json(json!({}))).forward_cookies();
    authed_request(ctx, &call)
}
