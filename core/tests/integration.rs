//! End-to-end sessions against the live mock server.
//!
//! # Design
//! Each test starts its own mock API on a random port and drives a real
//! `Session` over HTTP with `UreqTransport`. The `MockApi` handle is kept
//! so tests can expire tokens and count requests behind the client's back.

use bulletin_core::{
    AccountCache, ApiError, ClientConfig, CookieStore, Credentials, Error, ItemContent, NewBoard,
    NewReport, Session, UreqTransport,
};
use mock_server::{MockApi, ACCESS_COOKIE, REFRESH_COOKIE};

fn start() -> (MockApi, Session<UreqTransport>) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let api = MockApi::new();
    let server = api.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::serve(listener, server).await
        })
        .unwrap();
    });

    let config = ClientConfig::default().with_api_base(&format!("http://{addr}"));
    (api, Session::connect(config))
}

fn logged_in() -> (MockApi, Session<UreqTransport>) {
    let (api, mut session) = start();
    session.login(&Credentials::new("ada", "lovelace")).unwrap();
    (api, session)
}

#[test]
fn login_stores_tokens_and_authorizes_calls() {
    let (api, session) = logged_in();
    assert!(session.store().get(ACCESS_COOKIE).is_some());
    assert!(session.store().get(REFRESH_COOKIE).is_some());

    let mut session = session;
    let me = session.own_account(true).unwrap();
    assert_eq!(me.account.username, "ada");
    assert_eq!(me.email, "ada@example.com");
    assert_eq!(api.hits("/auth/web/refresh"), 0);
}

#[test]
fn login_with_wrong_password_stores_nothing() {
    let (_api, mut session) = start();
    let err = session
        .login(&Credentials::new("ada", "guess"))
        .unwrap_err();
    let api_error = err.as_api().unwrap();
    assert_eq!(api_error.status(), Some(401));
    assert_eq!(api_error.code(), Some("invalid_credentials"));
    assert!(session.store().get(ACCESS_COOKIE).is_none());
}

#[test]
fn board_workflow() {
    let (_api, mut session) = logged_in();

    let boards = session.editable_boards().unwrap();
    assert_eq!(boards.metadata.count, 1);
    let ideas = session.board("ideas").unwrap();
    assert_eq!(ideas, boards.contents[0]);

    let items = session.board_items(&ideas.id).unwrap();
    assert_eq!(items.contents.len(), 2);
    assert_eq!(items.contents[0].content.kind(), "note");
    match &items.contents[1].content {
        ItemContent::Todo {
            text,
            items: Some(todos),
        } => {
            assert_eq!(text, "Errands");
            assert!(!todos.contents[0].done);
        }
        other => panic!("unexpected item: {other:?}"),
    }

    let new_board = NewBoard {
        name: "Road Trip".to_string(),
        identifier: bulletin_core::resources::boards::identifier_from_name("Road Trip"),
        icon: "car".to_string(),
        public: true,
    };
    let created = session.create_board(&new_board).unwrap();
    assert_eq!(created.identifier, "Road_Trip");
    assert_eq!(session.editable_boards().unwrap().contents.len(), 2);

    let duplicate = session.create_board(&new_board).unwrap_err();
    assert_eq!(duplicate.as_api().unwrap().code(), Some("duplicate_entity"));

    let missing = session.board("nowhere").unwrap_err();
    assert!(missing.as_api().unwrap().is_not_found());
}

#[test]
fn reports_round_trip() {
    let (_api, mut session) = logged_in();
    assert!(session.my_reports().unwrap().contents.is_empty());

    let report = session
        .create_report(&NewReport {
            entity_id: "b1".to_string(),
            entity_type: "board".to_string(),
            report_type: "spam".to_string(),
            report_text: "ads everywhere".to_string(),
        })
        .unwrap();
    assert_eq!(report.status, "open");

    let reports = session.my_reports().unwrap();
    assert_eq!(reports.contents, vec![report]);
}

#[test]
fn expired_access_token_is_refreshed_transparently() {
    let (api, mut session) = logged_in();
    let stale = session.store().get(ACCESS_COOKIE).unwrap();
    api.expire_access_tokens();

    let me = session.own_account(true).unwrap();
    assert_eq!(me.account.username, "ada");
    assert_eq!(api.hits("/auth/web/refresh"), 1);
    assert_eq!(api.hits("/accounts/me"), 2);

    let fresh = session.store().get(ACCESS_COOKIE).unwrap();
    assert_ne!(fresh, stale);

    // The persisted token works without another refresh.
    session.editable_boards().unwrap();
    assert_eq!(api.hits("/auth/web/refresh"), 1);
}

#[test]
fn revoked_session_redirects_to_login() {
    let (api, session) = logged_in();
    let mut session = session.with_return_to("/boards/ideas");
    api.expire_access_tokens();
    api.revoke_refresh_tokens();

    match session.editable_boards().unwrap_err() {
        Error::Redirect(redirect) => {
            assert_eq!(redirect.target(), "/login?next=%2Fboards%2Fideas");
        }
        other => panic!("expected redirect, got {other:?}"),
    }
    assert_eq!(api.hits("/boards/editable"), 1);
    assert_eq!(api.hits("/auth/web/refresh"), 1);
}

#[test]
fn logout_clears_cookies() {
    let (api, mut session) = logged_in();
    session.logout().unwrap();
    assert!(session.store().get(ACCESS_COOKIE).is_none());
    assert!(session.store().get(REFRESH_COOKIE).is_none());

    let err = session.own_account(false).unwrap_err();
    assert!(err.as_api().is_some_and(ApiError::is_not_authenticated));
    assert_eq!(api.hits("/accounts/me"), 0);
}

#[test]
fn account_cache_resolves_ids_from_the_public_collection() {
    let (api, session) = start();
    let cache = AccountCache::from_config(session.client().config());
    let ada = api.account_id("ada").unwrap();
    let bob = api.account_id("bob").unwrap();

    assert_eq!(session.lookup_account(&cache, &ada).username, "ada");
    assert_eq!(session.lookup_account(&cache, &bob).username, "bob");
    assert_eq!(api.hits("/accounts"), 1);

    assert!(session.lookup_account(&cache, "ghost").is_unavailable());
    assert_eq!(api.hits("/accounts"), 2);
}
