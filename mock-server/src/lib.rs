//! In-memory stand-in for the bulletin API.
//!
//! Serves the cookie-authenticated routes the client core talks to, seeded
//! with two accounts and one board. Access and refresh tokens are opaque
//! UUIDs. [`MockApi`] exposes controls that let tests expire or revoke
//! them and count requests per path.

mod error;

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{FromRequestParts, Path, Request, State},
    http::{request::Parts, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

pub use error::{ApiFailure, ErrorBody};

pub const ACCESS_COOKIE: &str = "bulletinator_access_token";
pub const REFRESH_COOKIE: &str = "bulletinator_refresh_token";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Collection<T> {
    pub metadata: Metadata,
    pub contents: Vec<T>,
}

impl<T> Collection<T> {
    fn new(contents: Vec<T>) -> Self {
        Self {
            metadata: Metadata {
                count: contents.len(),
            },
            contents,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub profile_image: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedAccount {
    #[serde(flatten)]
    pub account: Account,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub identifier: String,
    pub name: String,
    pub icon: String,
    pub owner_id: String,
    pub public: bool,
}

#[derive(Debug, Deserialize)]
pub struct NewBoard {
    pub name: String,
    pub identifier: String,
    pub icon: String,
    #[serde(default)]
    pub public: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub account_id: String,
    pub entity_id: String,
    pub entity_type: String,
    pub report_type: String,
    pub report_text: String,
    pub status: String,
    pub moderator_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub resolved_at: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct NewReport {
    pub entity_id: String,
    pub entity_type: String,
    pub report_type: String,
    pub report_text: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Clone)]
struct StoredAccount {
    account: Account,
    email: String,
    password: String,
}

#[derive(Debug, Clone)]
struct AccessGrant {
    account_id: String,
    expired: bool,
}

#[derive(Debug, Default)]
struct Db {
    accounts: Vec<StoredAccount>,
    boards: Vec<Board>,
    /// Items are kept as raw JSON; their shape varies by `type`.
    items: Vec<serde_json::Value>,
    reports: Vec<Report>,
    access_tokens: HashMap<String, AccessGrant>,
    /// Refresh token to account id.
    refresh_tokens: HashMap<String, String>,
    hits: HashMap<String, usize>,
}

/// Shared state of one mock API instance.
#[derive(Clone, Debug)]
pub struct MockApi {
    db: Arc<Mutex<Db>>,
}

/// Seeded users, as `(username, email, password)`.
pub const SEED_USERS: [(&str, &str, &str); 2] = [
    ("ada", "ada@example.com", "lovelace"),
    ("bob", "bob@example.com", "builder"),
];

impl MockApi {
    /// An instance seeded with [`SEED_USERS`] and a private board
    /// `ideas` owned by `ada`.
    pub fn new() -> Self {
        let mut db = Db::default();
        for (username, email, password) in SEED_USERS {
            db.accounts.push(StoredAccount {
                account: Account {
                    id: Uuid::new_v4().to_string(),
                    username: username.to_string(),
                    profile_image: None,
                    display_name: Some(capitalize(username)),
                },
                email: email.to_string(),
                password: password.to_string(),
            });
        }

        let owner_id = db.accounts[0].account.id.clone();
        let board_id = Uuid::new_v4().to_string();
        db.boards.push(Board {
            id: board_id.clone(),
            identifier: "ideas".to_string(),
            name: "Ideas".to_string(),
            icon: "lightbulb".to_string(),
            owner_id,
            public: false,
        });

        let todo_id = Uuid::new_v4().to_string();
        db.items.push(json!({
            "id": Uuid::new_v4().to_string(),
            "board_id": board_id,
            "position": "120,80",
            "list_id": null,
            "index": null,
            "pin": null,
            "type": "note",
            "text": "Welcome to your board",
        }));
        db.items.push(json!({
            "id": todo_id,
            "board_id": board_id,
            "position": "400,80",
            "list_id": null,
            "index": null,
            "pin": null,
            "type": "todo",
            "text": "Errands",
            "items": {
                "metadata": {"count": 1},
                "contents": [{
                    "id": Uuid::new_v4().to_string(),
                    "list_id": todo_id,
                    "text": "Buy milk",
                    "link": null,
                    "done": false,
                }],
            },
        }));

        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/auth/web/login", post(login))
            .route("/auth/web/refresh", post(refresh))
            .route("/auth/web/logout", post(logout))
            .route("/accounts", get(list_accounts))
            .route("/accounts/me", get(own_account))
            .route("/boards", post(create_board))
            .route("/boards/editable", get(editable_boards))
            .route("/boards/{slug}", get(get_board))
            .route("/boards/{slug}/items", get(board_items))
            .route("/reports", get(my_reports).post(create_report))
            .layer(middleware::from_fn_with_state(self.clone(), count_hits))
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    pub fn account_id(&self, username: &str) -> Option<String> {
        self.db
            .lock()
            .accounts
            .iter()
            .find(|a| a.account.username == username)
            .map(|a| a.account.id.clone())
    }

    /// Make every access token issued so far fail with `invalid_access_token`.
    pub fn expire_access_tokens(&self) {
        for grant in self.db.lock().access_tokens.values_mut() {
            grant.expired = true;
        }
    }

    /// Forget every refresh token issued so far.
    pub fn revoke_refresh_tokens(&self) {
        self.db.lock().refresh_tokens.clear();
    }

    /// Number of requests received for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.db.lock().hits.get(path).copied().unwrap_or(0)
    }

    fn issue_tokens(&self, identifier: &str, password: &str) -> Result<(String, String), ApiFailure> {
        let mut db = self.db.lock();
        let account_id = db
            .accounts
            .iter()
            .find(|a| {
                (a.account.username == identifier || a.email == identifier) && a.password == password
            })
            .map(|a| a.account.id.clone())
            .ok_or(ApiFailure::InvalidCredentials)?;

        let access = Uuid::new_v4().to_string();
        let refresh = Uuid::new_v4().to_string();
        db.access_tokens.insert(
            access.clone(),
            AccessGrant {
                account_id: account_id.clone(),
                expired: false,
            },
        );
        db.refresh_tokens.insert(refresh.clone(), account_id);
        Ok((access, refresh))
    }

    fn refresh_access(&self, refresh_token: &str) -> Result<String, ApiFailure> {
        let mut db = self.db.lock();
        let account_id = db
            .refresh_tokens
            .get(refresh_token)
            .cloned()
            .ok_or(ApiFailure::InvalidRefreshToken)?;
        let access = Uuid::new_v4().to_string();
        db.access_tokens.insert(
            access.clone(),
            AccessGrant {
                account_id,
                expired: false,
            },
        );
        Ok(access)
    }

    fn authenticate(&self, access_token: &str) -> Result<StoredAccount, ApiFailure> {
        let db = self.db.lock();
        let grant = db
            .access_tokens
            .get(access_token)
            .filter(|grant| !grant.expired)
            .ok_or(ApiFailure::InvalidAccessToken)?;
        db.accounts
            .iter()
            .find(|a| a.account.id == grant.account_id)
            .cloned()
            .ok_or(ApiFailure::InvalidAccessToken)
    }

    /// A board by id or identifier that `viewer` may see.
    fn visible_board(&self, slug: &str, viewer: &str) -> Result<Board, ApiFailure> {
        let db = self.db.lock();
        let board = db
            .boards
            .iter()
            .find(|b| b.id == slug || b.identifier == slug)
            .cloned()
            .ok_or_else(|| ApiFailure::EntityNotFound {
                entity: "Board",
                property: "identifier",
                value: slug.to_string(),
            })?;
        if !board.public && board.owner_id != viewer {
            return Err(ApiFailure::AccessDenied);
        }
        Ok(board)
    }
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a freshly seeded API on `listener`.
pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, MockApi::new()).await
}

/// Run `api` on `listener`, keeping the caller's handle for test controls.
pub async fn serve(listener: TcpListener, api: MockApi) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock bulletin api listening");
    }
    axum::serve(listener, api.router()).await
}

pub fn app() -> Router {
    MockApi::new().router()
}

async fn count_hits(State(api): State<MockApi>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    *api.db.lock().hits.entry(path).or_insert(0) += 1;
    next.run(request).await
}

/// The account owning the request's access cookie.
struct CurrentAccount(StoredAccount);

impl FromRequestParts<MockApi> for CurrentAccount {
    type Rejection = ApiFailure;

    async fn from_request_parts(parts: &mut Parts, api: &MockApi) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(ACCESS_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or(ApiFailure::NotAuthenticated)?;
        api.authenticate(&token).map(CurrentAccount)
    }
}

fn token_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .build()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

async fn login(
    State(api): State<MockApi>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(StatusCode, CookieJar), ApiFailure> {
    let (access, refresh) = api.issue_tokens(&form.identifier, &form.password)?;
    debug!(identifier = %form.identifier, "login");
    let jar = jar
        .add(token_cookie(ACCESS_COOKIE, access))
        .add(token_cookie(REFRESH_COOKIE, refresh));
    Ok((StatusCode::NO_CONTENT, jar))
}

async fn refresh(
    State(api): State<MockApi>,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar), ApiFailure> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(ApiFailure::InvalidRefreshToken)?;
    let access = api.refresh_access(&token)?;
    Ok((StatusCode::NO_CONTENT, jar.add(token_cookie(ACCESS_COOKIE, access))))
}

async fn logout(
    State(api): State<MockApi>,
    _account: CurrentAccount,
    jar: CookieJar,
) -> (StatusCode, CookieJar) {
    if let Some(token) = jar.get(REFRESH_COOKIE) {
        api.db.lock().refresh_tokens.remove(token.value());
    }
    let jar = jar
        .add(removal_cookie(ACCESS_COOKIE))
        .add(removal_cookie(REFRESH_COOKIE));
    (StatusCode::NO_CONTENT, jar)
}

async fn list_accounts(State(api): State<MockApi>) -> Json<Collection<Account>> {
    let db = api.db.lock();
    Json(Collection::new(
        db.accounts.iter().map(|a| a.account.clone()).collect(),
    ))
}

async fn own_account(CurrentAccount(me): CurrentAccount) -> Json<AuthenticatedAccount> {
    Json(AuthenticatedAccount {
        account: me.account,
        email: me.email,
    })
}

async fn editable_boards(
    State(api): State<MockApi>,
    CurrentAccount(me): CurrentAccount,
) -> Json<Collection<Board>> {
    let db = api.db.lock();
    Json(Collection::new(
        db.boards
            .iter()
            .filter(|b| b.owner_id == me.account.id)
            .cloned()
            .collect(),
    ))
}

async fn create_board(
    State(api): State<MockApi>,
    CurrentAccount(me): CurrentAccount,
    Json(input): Json<NewBoard>,
) -> Result<(StatusCode, Json<Board>), ApiFailure> {
    let mut db = api.db.lock();
    if db.boards.iter().any(|b| b.identifier == input.identifier) {
        return Err(ApiFailure::DuplicateEntity {
            entity: "Board",
            field: "identifier",
            value: input.identifier,
        });
    }
    let board = Board {
        id: Uuid::new_v4().to_string(),
        identifier: input.identifier,
        name: input.name,
        icon: input.icon,
        owner_id: me.account.id,
        public: input.public,
    };
    db.boards.push(board.clone());
    Ok((StatusCode::CREATED, Json(board)))
}

async fn get_board(
    State(api): State<MockApi>,
    CurrentAccount(me): CurrentAccount,
    Path(slug): Path<String>,
) -> Result<Json<Board>, ApiFailure> {
    api.visible_board(&slug, &me.account.id).map(Json)
}

async fn board_items(
    State(api): State<MockApi>,
    CurrentAccount(me): CurrentAccount,
    Path(slug): Path<String>,
) -> Result<Json<Collection<serde_json::Value>>, ApiFailure> {
    let board = api.visible_board(&slug, &me.account.id)?;
    let db = api.db.lock();
    let items = db
        .items
        .iter()
        .filter(|item| item["board_id"] == board.id.as_str())
        .cloned()
        .collect();
    Ok(Json(Collection::new(items)))
}

async fn my_reports(
    State(api): State<MockApi>,
    CurrentAccount(me): CurrentAccount,
) -> Json<Collection<Report>> {
    let db = api.db.lock();
    Json(Collection::new(
        db.reports
            .iter()
            .filter(|r| r.account_id == me.account.id)
            .cloned()
            .collect(),
    ))
}

async fn create_report(
    State(api): State<MockApi>,
    CurrentAccount(me): CurrentAccount,
    Json(input): Json<NewReport>,
) -> (StatusCode, Json<Report>) {
    let report = Report {
        id: Uuid::new_v4().to_string(),
        account_id: me.account.id,
        entity_id: input.entity_id,
        entity_type: input.entity_type,
        report_type: input.report_type,
        report_text: input.report_text,
        status: "open".to_string(),
        moderator_id: None,
        created_at: OffsetDateTime::now_utc(),
        resolved_at: None,
    };
    api.db.lock().reports.push(report.clone());
    (StatusCode::CREATED, Json(report))
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_accounts_have_display_names() {
        let api = MockApi::new();
        let db = api.db.lock();
        let names: Vec<_> = db
            .accounts
            .iter()
            .map(|a| a.account.display_name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["Ada", "Bob"]);
    }

    #[test]
    fn login_accepts_username_or_email() {
        let api = MockApi::new();
        assert!(api.issue_tokens("ada", "lovelace").is_ok());
        assert!(api.issue_tokens("bob@example.com", "builder").is_ok());
        assert!(matches!(
            api.issue_tokens("ada", "wrong"),
            Err(ApiFailure::InvalidCredentials)
        ));
    }

    #[test]
    fn expired_tokens_no_longer_authenticate() {
        let api = MockApi::new();
        let (access, refresh) = api.issue_tokens("ada", "lovelace").unwrap();
        assert_eq!(api.authenticate(&access).unwrap().account.username, "ada");

        api.expire_access_tokens();
        assert!(matches!(
            api.authenticate(&access),
            Err(ApiFailure::InvalidAccessToken)
        ));

        let renewed = api.refresh_access(&refresh).unwrap();
        assert_eq!(api.authenticate(&renewed).unwrap().account.username, "ada");
    }

    #[test]
    fn revoked_refresh_tokens_are_rejected() {
        let api = MockApi::new();
        let (_, refresh) = api.issue_tokens("ada", "lovelace").unwrap();
        api.revoke_refresh_tokens();
        assert!(matches!(
            api.refresh_access(&refresh),
            Err(ApiFailure::InvalidRefreshToken)
        ));
    }

    #[test]
    fn private_boards_are_hidden_from_other_accounts() {
        let api = MockApi::new();
        let ada = api.account_id("ada").unwrap();
        let bob = api.account_id("bob").unwrap();
        assert_eq!(api.visible_board("ideas", &ada).unwrap().name, "Ideas");
        assert!(matches!(
            api.visible_board("ideas", &bob),
            Err(ApiFailure::AccessDenied)
        ));
        assert!(matches!(
            api.visible_board("nope", &ada),
            Err(ApiFailure::EntityNotFound { .. })
        ));
    }

    #[test]
    fn failure_status_and_code_agree() {
        assert_eq!(ApiFailure::NotAuthenticated.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiFailure::InvalidAccessToken.code(),
            "invalid_access_token"
        );
        let duplicate = ApiFailure::DuplicateEntity {
            entity: "Board",
            field: "identifier",
            value: "ideas".to_string(),
        };
        assert_eq!(duplicate.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            duplicate.to_string(),
            "Entity Board with identifier=ideas already exists"
        );
    }
}
