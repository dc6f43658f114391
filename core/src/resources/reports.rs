use crate::auth::{authed_request, Call, Outcome};
use crate::http::HttpMethod;
use crate::session::Context;
use crate::transport::Transport;
use crate::types::{Collection, NewReport, Report};

use super::authed_json;

/// Reports filed by the logged-in account.
pub fn my_reports<T: Transport>(ctx: &Context<'_, T>) -> Outcome<Collection<Report>> {
    authed_request(ctx, &Call::get("/reports"))
}

pub fn create_report<T: Transport>(ctx: &Context<'_, T>, report: &NewReport) -> Outcome<Report> {
    authed_json(ctx, HttpMethod::Post, "/reports", report)
}
