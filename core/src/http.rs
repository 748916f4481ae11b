//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! `WallboxClient` builds `HttpRequest` values and parses `HttpResponse`
//! values without touching the network; a `Transport` executes the round-trip
//! in between. The `Wallbox` session wires the two together, and tests swap
//! in a recording transport to count and inspect the calls made.
//!
//! All fields use owned types (`String`, `Vec`) so requests can be recorded,
//! cloned and compared freely.

use std::time::Duration;

use crate::error::Result;

pub const ACCEPT: &str = "application/json";
pub const CONTENT_TYPE: &str = "application/json;charset=UTF-8";
pub const USER_AGENT: &str = "HomeAssistantWallboxPlugin/1.0.0";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute. `query` pairs are appended by the transport, and
/// `timeout` bounds the whole round-trip when set.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Headers attached to every operational API call.
///
/// Starts with the fixed accept/content-type/user-agent triple. A successful
/// authentication adds (or replaces) `Authorization: Bearer <token>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeaders {
    entries: Vec<(String, String)>,
}

impl RequestHeaders {
    pub fn new() -> Self {
        Self {
            entries: vec![
                ("Accept".to_string(), ACCEPT.to_string()),
                ("Content-Type".to_string(), CONTENT_TYPE.to_string()),
                ("User-Agent".to_string(), USER_AGENT.to_string()),
            ],
        }
    }

    pub fn set_bearer(&mut self, token: &str) {
        let value = format!("Bearer {token}");
        match self.entries.iter_mut().find(|(k, _)| k == "Authorization") {
            Some(entry) => entry.1 = value,
            None => self.entries.push(("Authorization".to_string(), value)),
        }
    }

    pub fn authorization(&self) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == "Authorization")
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn to_vec(&self) -> Vec<(String, String)> {
        self.entries.clone()
    }
}

impl Default for RequestHeaders {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes an `HttpRequest` and hands back the raw response.
///
/// Implementations must return non-2xx responses as `Ok` data; status
/// interpretation belongs to `WallboxClient::parse_*`. Only failures to
/// complete the round-trip (connect errors, timeouts) are `Err`.
pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}
