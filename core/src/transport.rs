//! Request building, response parsing and the transport seam.
//!
//! # Design
//! `build_request` and `parse_response` are pure: they turn arguments into an
//! `HttpRequest` and an `HttpResponse` into a typed payload or `ApiError`.
//! The one impure step, executing the request, sits behind the `Transport`
//! trait so the host decides how bytes move. `UreqTransport` is the default
//! blocking implementation.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::form_urlencoded;

use crate::config::ClientConfig;
use crate::error::{codes, ApiError, ErrorDocument};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

impl Body {
    pub fn json<B: Serialize>(value: &B) -> Result<Self, ApiError> {
        serde_json::to_value(value)
            .map(Body::Json)
            .map_err(|e| ApiError::Serialization(e.to_string()))
    }

    pub fn form<K: Into<String>, V: Into<String>>(fields: impl IntoIterator<Item = (K, V)>) -> Self {
        Body::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Executes an `HttpRequest` against the network.
///
/// Implementations return non-2xx responses as data; only a failure to get a
/// response at all is an `Err`.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        // Status interpretation belongs to `parse_response`.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url.as_str();
        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), &request.headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(url), &request.headers).call(),
            HttpMethod::Post => {
                let builder = with_headers(self.agent.post(url), &request.headers);
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
            HttpMethod::Put => {
                let builder = with_headers(self.agent.put(url), &request.headers);
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// Build a request for `path` relative to `base`.
///
/// JSON bodies get `content-type: application/json`, form bodies
/// `application/x-www-form-urlencoded`. Caller headers come first.
/// GET and DELETE requests carry no body; passing one is an error.
pub fn build_request(
    base: &str,
    method: HttpMethod,
    path: &str,
    headers: &[(String, String)],
    body: &Body,
) -> Result<HttpRequest, ApiError> {
    if matches!(method, HttpMethod::Get | HttpMethod::Delete) && !matches!(body, Body::Empty) {
        return Err(ApiError::Serialization(format!(
            "{method} {path} cannot carry a request body"
        )));
    }
    let mut headers = headers.to_vec();
    let body = match body {
        Body::Empty => None,
        Body::Json(value) => {
            headers.push(("content-type".to_string(), "application/json".to_string()));
            Some(serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))?)
        }
        Body::Form(fields) => {
            headers.push((
                "content-type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            ));
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(fields.iter())
                .finish();
            Some(encoded)
        }
    };
    Ok(HttpRequest {
        method,
        path: path.to_string(),
        url: format!("{}{path}", base.trim_end_matches('/')),
        headers,
        body,
    })
}

/// Map a response to a typed payload or an `ApiError`.
///
/// A 204 yields the empty payload (JSON `null`) without reading the body, so
/// `()` and `Option<_>` payloads succeed.
pub fn parse_response<P: DeserializeOwned>(response: &HttpResponse) -> Result<P, ApiError> {
    if response.status == 204 {
        return serde_json::from_value(serde_json::Value::Null)
            .map_err(|e| ApiError::Deserialization(e.to_string()));
    }
    if response.is_success() {
        return serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Deserialization(e.to_string()));
    }
    Err(parse_error(response))
}

fn parse_error(response: &HttpResponse) -> ApiError {
    if let Ok(document) = serde_json::from_str::<ErrorDocument>(&response.body) {
        return ApiError::from_document(response.status, document);
    }
    ApiError::Status {
        status: response.status,
        code: codes::UNEXPECTED_RESPONSE.to_string(),
        message: response.body.trim().to_string(),
        detail: serde_json::from_str(&response.body).ok(),
    }
}

/// Stateless client for the bulletin API: a base URL and a transport.
#[derive(Debug, Clone)]
pub struct ApiClient<T> {
    config: ClientConfig,
    transport: T,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one request and return the raw response.
    pub fn exchange(
        &self,
        method: HttpMethod,
        path: &str,
        headers: &[(String, String)],
        body: &Body,
    ) -> Result<HttpResponse, ApiError> {
        let request = build_request(&self.config.api_base, method, path, headers, body)?;
        debug!(method = %request.method, path = %request.path, "sending request");
        let response = self.transport.execute(&request)?;
        debug!(status = response.status, path = %request.path, "received response");
        Ok(response)
    }

    /// Send one request and decode the payload.
    pub fn request<P: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        headers: &[(String, String)],
        body: &Body,
    ) -> Result<P, ApiError> {
        let response = self.exchange(method, path, headers, body)?;
        parse_response(&response)
    }
}

impl ApiClient<UreqTransport> {
    pub fn with_ureq(config: ClientConfig) -> Self {
        Self::new(config, UreqTransport::new())
    }
}
