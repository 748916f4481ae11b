//! `Transport` implementation backed by a blocking `ureq` agent.

use log::debug;

use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

/// Blocking HTTP transport.
///
/// The agent is configured with `http_status_as_error(false)` so 4xx/5xx
/// responses come back as data and the core client decides what they mean.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
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
    fn execute(&self, req: HttpRequest) -> Result<HttpResponse> {
        debug!("{} {}", req.method.as_str(), req.url);

        let result = match req.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&req.url);
                for (k, v) in &req.headers {
                    builder = builder.header(k.as_str(), v.as_str());
                }
                for (k, v) in &req.query {
                    builder = builder.query(k.as_str(), v.as_str());
                }
                builder
                    .config()
                    .timeout_global(req.timeout)
                    .build()
                    .call()
            }
            HttpMethod::Post | HttpMethod::Put => {
                let mut builder = if req.method == HttpMethod::Post {
                    self.agent.post(&req.url)
                } else {
                    self.agent.put(&req.url)
                };
                for (k, v) in &req.headers {
                    builder = builder.header(k.as_str(), v.as_str());
                }
                for (k, v) in &req.query {
                    builder = builder.query(k.as_str(), v.as_str());
                }
                let builder = builder.config().timeout_global(req.timeout).build();
                match &req.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|e| {
            debug!("  transport error: {e}");
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        debug!("  -> {status} ({} bytes)", body.len());

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
