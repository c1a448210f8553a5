//! HTTP-agnostic request handling.
//!
//! [`RequestDispatcher`] turns a raw query string or a raw request body into
//! a [`FetchRequest`], runs the [`PageGenerator`] pipeline and maps the outcome
//! to an [`ApiResponse`]. Two entry styles exist:
//!
//! - query-style (`GET`): missing or non-http(s) `repo_url` is a 400 with an
//!   HTML body; failures are 500 with an HTML body.
//! - body-style (`POST`, JSON or form encoded): missing `repo_url` is a 400
//!   with a JSON body; failures are 500 with a JSON body. The scheme is only
//!   checked when [`DispatchConfig::validate_body_scheme`] is set.
//!
//! `max_bytes` never causes an error: absent, empty, non-numeric or
//! non-positive values resolve to the injected default.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::config::DispatchConfig;
use crate::contract::PageGenerator;
use crate::error::InputError;

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

pub const MISSING_QUERY_REPO_URL: &str = "Missing 'repo_url' query parameter.";
pub const MISSING_BODY_REPO_URL: &str = "Missing 'repo_url' in request body";
pub const BAD_SCHEME: &str = "repo_url must start with http:// or https://";
pub const GENERIC_FAILURE: &str = "Failed to render repository. See server logs for details.";

const ACCEPTED_SCHEMES: [&str; 2] = ["http://", "https://"];

/// Inbound request style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Via {
    Get,
    Post,
}

/// A validated request, with `max_bytes` already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub repo_url: String,
    pub max_bytes: u64,
    pub via: Via,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn html(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: HTML_CONTENT_TYPE,
            body: body.into().into_bytes(),
        }
    }

    pub fn json(status: StatusCode, value: &Value) -> Self {
        Self {
            status,
            content_type: JSON_CONTENT_TYPE,
            body: value.to_string().into_bytes(),
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn html_error_page(status: StatusCode, inner: &str) -> String {
    format!(
        "<html><body><h1>{} {}</h1>{}</body></html>",
        status.as_u16(),
        status.canonical_reason().unwrap_or(""),
        inner
    )
}

pub fn has_accepted_scheme(url: &str) -> bool {
    ACCEPTED_SCHEMES.iter().any(|s| url.starts_with(s))
}

/// First non-empty value per key of a url-encoded string.
pub fn parse_form(input: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for (k, v) in url::form_urlencoded::parse(input.as_bytes()) {
        if v.is_empty() {
            continue;
        }
        out.entry(k.into_owned()).or_insert_with(|| v.into_owned());
    }
    out
}

/// Decode a request body into a mapping according to its content type.
/// Undecodable input and unknown content types yield an empty mapping.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Map<String, Value> {
    let content_type = content_type.unwrap_or("");
    if body.is_empty() {
        return Map::new();
    }
    if content_type.contains("application/json") {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    } else if content_type.contains("application/x-www-form-urlencoded") {
        match std::str::from_utf8(body) {
            Ok(text) => parse_form(text)
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
            Err(_) => Map::new(),
        }
    } else {
        Map::new()
    }
}

pub struct RequestDispatcher {
    generator: Arc<dyn PageGenerator>,
    default_max_bytes: u64,
    config: DispatchConfig,
}

impl RequestDispatcher {
    /// `default_max_bytes` is clamped to at least 1.
    pub fn new(
        generator: Arc<dyn PageGenerator>,
        default_max_bytes: u64,
        config: DispatchConfig,
    ) -> Self {
        Self {
            generator,
            default_max_bytes: default_max_bytes.max(1),
            config,
        }
    }

    pub fn default_max_bytes(&self) -> u64 {
        self.default_max_bytes
    }

    /// Query-style `max_bytes`: only a plain run of ASCII digits counts.
    pub fn resolve_query_max_bytes(&self, raw: Option<&str>) -> u64 {
        raw.filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(self.default_max_bytes)
    }

    /// Body-style `max_bytes`: integers, truncated floats and integer strings.
    pub fn resolve_body_max_bytes(&self, raw: Option<&Value>) -> u64 {
        let parsed = match raw {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed
            .filter(|n| *n > 0)
            .map(|n| n as u64)
            .unwrap_or(self.default_max_bytes)
    }

    pub fn query_request(&self, raw_query: Option<&str>) -> Result<FetchRequest, InputError> {
        let params = parse_form(raw_query.unwrap_or(""));
        let max_bytes = self.resolve_query_max_bytes(params.get("max_bytes").map(String::as_str));
        let repo_url = params
            .get("repo_url")
            .cloned()
            .ok_or(InputError::MissingRepoUrl)?;
        if !has_accepted_scheme(&repo_url) {
            return Err(InputError::BadScheme);
        }
        Ok(FetchRequest {
            repo_url,
            max_bytes,
            via: Via::Get,
        })
    }

    pub fn body_request(
        &self,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<FetchRequest, InputError> {
        let fields = parse_body(content_type, body);
        let max_bytes = self.resolve_body_max_bytes(fields.get("max_bytes"));
        let repo_url = match fields.get("repo_url") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(InputError::MissingRepoUrl),
        };
        if self.config.validate_body_scheme && !has_accepted_scheme(&repo_url) {
            return Err(InputError::BadScheme);
        }
        Ok(FetchRequest {
            repo_url,
            max_bytes,
            via: Via::Post,
        })
    }

    /// Query-style entry point.
    pub async fn handle_query(&self, raw_query: Option<&str>) -> ApiResponse {
        let request = match self.query_request(raw_query) {
            Ok(req) => req,
            Err(e) => {
                info!(error = %e, "Rejected query-style request");
                let message = match e {
                    InputError::MissingRepoUrl => MISSING_QUERY_REPO_URL,
                    InputError::BadScheme => BAD_SCHEME,
                };
                return ApiResponse::html(
                    StatusCode::BAD_REQUEST,
                    html_error_page(StatusCode::BAD_REQUEST, &format!("<p>{message}</p>")),
                );
            }
        };

        match self.run(&request).await {
            Ok(html) => ApiResponse::html(StatusCode::OK, html),
            Err(message) => ApiResponse::html(
                StatusCode::INTERNAL_SERVER_ERROR,
                html_error_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &format!("<pre>{}</pre>", tera::escape_html(&message)),
                ),
            ),
        }
    }

    /// Body-style entry point.
    pub async fn handle_body(&self, content_type: Option<&str>, body: &[u8]) -> ApiResponse {
        let request = match self.body_request(content_type, body) {
            Ok(req) => req,
            Err(e) => {
                info!(error = %e, "Rejected body-style request");
                let message = match e {
                    InputError::MissingRepoUrl => MISSING_BODY_REPO_URL,
                    InputError::BadScheme => BAD_SCHEME,
                };
                return ApiResponse::json(StatusCode::BAD_REQUEST, &json!({ "error": message }));
            }
        };

        match self.run(&request).await {
            Ok(html) => ApiResponse::html(StatusCode::OK, html),
            Err(message) => ApiResponse::json(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "error": message }),
            ),
        }
    }

    /// Run the pipeline; on failure returns the client-facing message.
    async fn run(&self, request: &FetchRequest) -> Result<String, String> {
        info!(
            repo_url = %request.repo_url,
            max_bytes = request.max_bytes,
            via = ?request.via,
            "Rendering repository"
        );
        match self
            .generator
            .generate(&request.repo_url, request.max_bytes)
            .await
        {
            Ok(page) => Ok(page.into_string()),
            Err(e) => {
                if self.config.expose_error_details {
                    Err(e.to_string())
                } else {
                    Err(GENERIC_FAILURE.to_string())
                }
            }
        }
    }
}
