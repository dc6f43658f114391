use crate::auth::{authed_request, Call, Outcome};
use crate::http::HttpMethod;
use crate::session::Context;
use crate::transport::Transport;
use crate::types::{Board, Collection, NewBoard};

use super::authed_json;

/// Boards the logged-in account may edit.
pub fn editable_boards<T: Transport>(ctx: &Context<'_, T>) -> Outcome<Collection<Board>> {
    authed_request(ctx, &Call::get("/boards/editable"))
}

pub fn create_board<T: Transport>(ctx: &Context<'_, T>, board: &NewBoard) -> Outcome<Board> {
    authed_json(ctx, HttpMethod::Post, "/boards", board)
}

/// A board by id or identifier.
pub fn board<T: Transport>(ctx: &Context<'_, T>, slug: &str) -> Outcome<Board> {
    authed_request(ctx, &Call::get(format!("/boards/{slug}")))
}

/// Default identifier for a board called `name`.
///
/// Runs of spaces and dashes become one underscore, characters outside
/// `[A-Za-z0-9_]` are dropped and repeated underscores collapse.
pub fn identifier_from_name(name: &str) -> String {
    let mut identifier = String::with_capacity(name.len());
    let mut in_separator_run = false;
    for c in name.chars() {
        if c == ' ' || c == '-' {
            if !in_separator_run {
                identifier.push('_');
            }
            in_separator_run = true;
            continue;
        }
        in_separator_run = false;
        if c.is_ascii_alphanumeric() || c == '_' {
            identifier.push(c);
        }
    }

    let mut collapsed = String::with_capacity(identifier.len());
    for c in identifier.chars() {
        if c == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::config::ClientConfig;
    use crate::error::ApiError;
    use crate::http::{HttpRequest, HttpResponse};
    use crate::resources::{accounts, auth, items, reports};
    use crate::store::MemoryCookieStore;
    use crate::transport::ApiClient;
    use crate::types::{Credentials, NewReport};

    #[test]
    fn identifier_replaces_separators() {
        assert_eq!(identifier_from_name("My Board"), "My_Board");
        assert_eq!(identifier_from_name("road - trip  plans"), "road_trip_plans");
    }

    #[test]
    fn identifier_drops_disallowed_characters() {
        assert_eq!(identifier_from_name("Café & Crêpes!"), "Caf_Crpes");
        assert_eq!(identifier_from_name("2024: goals"), "2024_goals");
    }

    #[test]
    fn identifier_collapses_underscores() {
        assert_eq!(identifier_from_name("a__b"), "a_b");
        assert_eq!(identifier_from_name("a _ b"), "a_b");
        assert_eq!(identifier_from_name("a & b"), "a_b");
    }

    /// Answers every request with 204 and records what was sent.
    #[derive(Default)]
    struct Recorder {
        sent: RefCell<Vec<HttpRequest>>,
    }

    impl Transport for Recorder {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            self.sent.borrow_mut().push(request.clone());
            Ok(HttpResponse {
                status: 204,
                headers: Vec::new(),
                body: String::new(),
            })
        }
    }

    fn sent_by<P>(action: impl FnOnce(&Context<'_, Recorder>) -> Outcome<P>) -> HttpRequest {
        let client = ApiClient::new(ClientConfig::default(), Recorder::default());
        let store = MemoryCookieStore::with_values([("bulletinator_access_token", "a1")]);
        let _ = action(&Context::new(&client, &store));
        let sent = client.transport().sent.borrow();
        assert_eq!(sent.len(), 1);
        sent[0].clone()
    }

    #[test]
    fn accessors_target_their_endpoints() {
        let cases: Vec<(HttpRequest, HttpMethod, &str)> = vec![
            (sent_by(|ctx| accounts::own_account(ctx, true).map(|_| ())), HttpMethod::Get, "/accounts/me"),
            (sent_by(|ctx| accounts::all_accounts(ctx).map(|_| ())), HttpMethod::Get, "/accounts"),
            (sent_by(|ctx| editable_boards(ctx).map(|_| ())), HttpMethod::Get, "/boards/editable"),
            (sent_by(|ctx| board(ctx, "ideas").map(|_| ())), HttpMethod::Get, "/boards/ideas"),
            (sent_by(|ctx| items::board_items(ctx, "b1").map(|_| ())), HttpMethod::Get, "/boards/b1/items"),
            (sent_by(|ctx| reports::my_reports(ctx).map(|_| ())), HttpMethod::Get, "/reports"),
            (sent_by(auth::logout), HttpMethod::Post, "/auth/web/logout"),
        ];
        for (request, method, path) in cases {
            assert_eq!(request.method, method, "{path}");
            assert_eq!(request.path, path);
        }
    }

    #[test]
    fn authed_accessors_send_the_access_token() {
        let request = sent_by(|ctx| editable_boards(ctx).map(|_| ()));
        assert_eq!(request.header("cookie"), Some("bulletinator_access_token=a1"));

        let request = sent_by(|ctx| accounts::all_accounts(ctx).map(|_| ()));
        assert_eq!(request.header("cookie"), None);
    }

    #[test]
    fn login_posts_a_form() {
        let request = sent_by(|ctx| auth::login(ctx, &Credentials::new("ada", "secret")));
        assert_eq!(request.path, "/auth/web/login");
        assert_eq!(request.body.as_deref(), Some("identifier=ada&password=secret"));
        assert_eq!(request.header("cookie"), None);
    }

    #[test]
    fn create_accessors_post_json() {
        let board = NewBoard {
            name: "My Board".to_string(),
            identifier: identifier_from_name("My Board"),
            icon: "board".to_string(),
            public: true,
        };
        let request = sent_by(|ctx| create_board(ctx, &board).map(|_| ()));
        assert_eq!(request.path, "/boards");
        let body: serde_json::Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["identifier"], "My_Board");

        let report = NewReport {
            entity_id: "b1".to_string(),
            entity_type: "board".to_string(),
            report_type: "spam".to_string(),
            report_text: "ads everywhere".to_string(),
        };
        let request = sent_by(|ctx| reports::create_report(ctx, &report).map(|_| ()));
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.header("content-type"), Some("application/json"));
    }
}
