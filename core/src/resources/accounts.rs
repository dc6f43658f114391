use crate::auth::{authed_request, public_request, Call, Outcome};
use crate::session::Context;
use crate::transport::Transport;
use crate::types::{Account, AuthenticatedAccount, Collection};

/// The logged-in account. With `redirect` unset, a missing session is
/// reported as a `not_authenticated` failure instead of a redirect.
pub fn own_account<T: Transport>(ctx: &Context<'_, T>, redirect: bool) -> Outcome<AuthenticatedAccount> {
    authed_request(ctx, &Call::get("/accounts/me").redirect_on_failure(redirect))
}

/// Every public account profile.
pub fn all_accounts<T: Transport>(ctx: &Context<'_, T>) -> Outcome<Collection<Account>> {
    public_request(ctx, &Call::get("/accounts"))
}
