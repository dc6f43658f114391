//! Synchronous client core for the bulletin board API.
//!
//! # Overview
//! Requests are built as plain `HttpRequest` values and executed through a
//! [`Transport`], so the host decides how bytes move and tests can script
//! every response. On top of that sit the cookie-diff extractor, the
//! authenticated-call orchestrator (refresh once, retry once, or redirect to
//! login) and a [`Session`] that owns the cookie store and applies the
//! cookie mutations each call returns.
//!
//! # Design
//! - `ApiClient` is stateless: configuration plus a transport.
//! - Accessors in [`resources`] never mutate cookies; they return an
//!   [`Outcome`] carrying the payload and the mutations to persist.
//! - [`Session::call`] is the only place cookies are written.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod auth;
pub mod cache;
pub mod config;
pub mod cookies;
pub mod error;
pub mod http;
pub mod resources;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;

pub use auth::{authed_request, public_request, Call, Outcome, Redirect};
pub use cache::{AccountCache, Clock, ManualClock, SystemClock};
pub use config::{ApiPaths, ClientConfig};
pub use cookies::{extract_cookies, CookieMutation, CookieMutationSet};
pub use error::{ApiError, ConfigError, Error};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::{Context, Session};
pub use store::{CookieStore, MemoryCookieStore};
pub use transport::{build_request, parse_response, ApiClient, Body, Transport, UreqTransport};
pub use types::{
    Account, AuthenticatedAccount, Board, Collection, Credentials, Item, ItemContent, Metadata,
    NewBoard, NewReport, Pin, Report, TodoItem,
};
