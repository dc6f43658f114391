use crate::auth::{authed_request, Call, Outcome};
use crate::session::Context;
use crate::transport::Transport;
use crate::types::{Collection, Item};

pub fn board_items<T: Transport>(ctx: &Context<'_, T>, board_id: &str) -> Outcome<Collection<Item>> {
    authed_request(ctx, &Call::get(format!("/boards/{board_id}/items")))
}
