//! Stateless HTTP request builder and response parser for the Wallbox API.
//!
//! # Design
//! `WallboxClient` holds only the two host URLs and the optional timeout; it
//! carries no token state. Each endpoint is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. Operational calls take the session's `RequestHeaders`, so
//! whoever owns the tokens decides which `Authorization` header goes out.
//!
//! Only the authentication host sees the `Partner` header and the
//! basic/refresh credentials; the operational host only ever sees the bearer
//! access token.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestHeaders};
use crate::token::TokenState;
use crate::types::{AuthEnvelope, ChargerId, GroupsResponse, RemoteAction};

const PARTNER: (&str, &str) = ("Partner", "wallbox");

/// Synchronous, stateless request builder for the Wallbox API.
#[derive(Debug, Clone)]
pub struct WallboxClient {
    base_url: String,
    auth_url: String,
    request_timeout: Option<Duration>,
}

impl WallboxClient {
    pub fn new(base_url: &str, auth_url: &str, request_timeout: Option<Duration>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_url: auth_url.trim_end_matches('/').to_string(),
            request_timeout,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    // -----------------------------------------------------------------------
    // Authentication
    // -----------------------------------------------------------------------

    /// Full sign-in with basic credentials.
    pub fn build_signin(&self, username: &str, password: &str) -> HttpRequest {
        let credentials = STANDARD.encode(format!("{username}:{password}"));
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}/users/signin", self.auth_url),
            headers: vec![
                ("Authorization".to_string(), format!("Basic {credentials}")),
                (PARTNER.0.to_string(), PARTNER.1.to_string()),
            ],
            query: Vec::new(),
            body: None,
            timeout: self.request_timeout,
        }
    }

    /// Token renewal authenticated with the refresh token as bearer.
    pub fn build_refresh(&self, refresh_token: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}/users/refresh-token", self.auth_url),
            headers: vec![
                ("Authorization".to_string(), format!("Bearer {refresh_token}")),
                (PARTNER.0.to_string(), PARTNER.1.to_string()),
            ],
            query: Vec::new(),
            body: None,
            timeout: self.request_timeout,
        }
    }

    /// Parse a sign-in or refresh response into a complete `TokenState`.
    pub fn parse_auth(&self, response: HttpResponse) -> Result<TokenState> {
        check_status(&response)?;
        let envelope: AuthEnvelope = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Deserialization(e.to_string()))?;
        let attrs = envelope.data.attributes;
        Ok(TokenState {
            access_token: attrs.token,
            refresh_token: attrs.refresh_token,
            access_expires_ms: attrs.ttl,
            refresh_expires_ms: attrs.refresh_token_ttl,
        })
    }

    // -----------------------------------------------------------------------
    // Chargers
    // -----------------------------------------------------------------------

    pub fn build_chargers_list(&self, headers: &RequestHeaders) -> HttpRequest {
        self.get(headers, "v3/chargers/groups".to_string(), Vec::new())
    }

    /// Flatten `result.groups[].chargers[].id` in encounter order.
    pub fn parse_chargers_list(&self, response: HttpResponse) -> Result<Vec<ChargerId>> {
        check_status(&response)?;
        let groups: GroupsResponse = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Deserialization(e.to_string()))?;
        Ok(groups
            .result
            .groups
            .into_iter()
            .flat_map(|group| group.chargers)
            .map(|charger| charger.id)
            .collect())
    }

    pub fn build_charger_status(&self, headers: &RequestHeaders, charger_id: ChargerId) -> HttpRequest {
        self.get(headers, format!("chargers/status/{charger_id}"), Vec::new())
    }

    pub fn build_unlock_charger(&self, headers: &RequestHeaders, charger_id: ChargerId) -> HttpRequest {
        self.send(
            headers,
            HttpMethod::Put,
            format!("v2/charger/{charger_id}"),
            json!({ "locked": 0 }),
        )
    }

    pub fn build_lock_charger(&self, headers: &RequestHeaders, charger_id: ChargerId) -> HttpRequest {
        self.send(
            headers,
            HttpMethod::Put,
            format!("v2/charger/{charger_id}"),
            json!({ "locked": 1 }),
        )
    }

    pub fn build_set_max_charging_current(
        &self,
        headers: &RequestHeaders,
        charger_id: ChargerId,
        amps: u32,
    ) -> HttpRequest {
        self.send(
            headers,
            HttpMethod::Put,
            format!("v2/charger/{charger_id}"),
            json!({ "maxChargingCurrent": amps }),
        )
    }

    pub fn build_remote_action(
        &self,
        headers: &RequestHeaders,
        charger_id: ChargerId,
        action: RemoteAction,
    ) -> HttpRequest {
        self.send(
            headers,
            HttpMethod::Post,
            format!("v3/chargers/{charger_id}/remote-action"),
            json!({ "action": action as u8 }),
        )
    }

    pub fn build_pause_charging_session(&self, headers: &RequestHeaders, charger_id: ChargerId) -> HttpRequest {
        self.build_remote_action(headers, charger_id, RemoteAction::Pause)
    }

    pub fn build_resume_charging_session(&self, headers: &RequestHeaders, charger_id: ChargerId) -> HttpRequest {
        self.build_remote_action(headers, charger_id, RemoteAction::Resume)
    }

    pub fn build_restart_charger(&self, headers: &RequestHeaders, charger_id: ChargerId) -> HttpRequest {
        self.build_remote_action(headers, charger_id, RemoteAction::Restart)
    }

    /// Session statistics between two instants, sent as epoch seconds.
    pub fn build_session_list(
        &self,
        headers: &RequestHeaders,
        charger_id: ChargerId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> HttpRequest {
        // Whole epoch seconds (`1704067200`), not the float form
        // (`1704067200.0`); sub-second precision is dropped.
        let query = vec![
            ("charger".to_string(), charger_id.to_string()),
            ("start_date".to_string(), start.timestamp().to_string()),
            ("end_date".to_string(), end.timestamp().to_string()),
        ];
        self.get(headers, "v4/sessions/stats".to_string(), query)
    }

    /// JSON has no NaN or infinity, so a non-finite cost is a serialization error.
    pub fn build_set_energy_cost(
        &self,
        headers: &RequestHeaders,
        charger_id: ChargerId,
        cost: f64,
    ) -> Result<HttpRequest> {
        if !cost.is_finite() {
            return Err(ApiError::Serialization(format!("energy cost {cost} is not a finite number")));
        }
        Ok(self.send(
            headers,
            HttpMethod::Post,
            format!("chargers/config/{charger_id}"),
            json!({ "energyCost": cost }),
        ))
    }

    pub fn build_charger_schedules(&self, headers: &RequestHeaders, charger_id: ChargerId) -> HttpRequest {
        self.get(headers, format!("chargers/{charger_id}/schedules"), Vec::new())
    }

    /// Every slot's `chargerId` is forced to `charger_id`, whatever it held.
    ///
    /// `schedules` is anything that serializes to `{"schedules": [...]}`: a
    /// `ScheduleRequest` or a raw `serde_json::Value`. Apart from `chargerId`
    /// the body is sent exactly as given; a missing `schedules` key is left
    /// missing.
    pub fn build_set_charger_schedules<S: Serialize + ?Sized>(
        &self,
        headers: &RequestHeaders,
        charger_id: ChargerId,
        schedules: &S,
    ) -> Result<HttpRequest> {
        let mut body = serde_json::to_value(schedules).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let root = body
            .as_object_mut()
            .ok_or_else(|| ApiError::Serialization("schedules payload is not a JSON object".to_string()))?;
        if let Some(slots) = root.get_mut("schedules") {
            let slots = slots
                .as_array_mut()
                .ok_or_else(|| ApiError::Serialization("`schedules` is not an array".to_string()))?;
            for slot in slots {
                let slot = slot
                    .as_object_mut()
                    .ok_or_else(|| ApiError::Serialization("schedule entry is not an object".to_string()))?;
                slot.insert("chargerId".to_string(), Value::from(charger_id));
            }
        }
        Ok(self.send(
            headers,
            HttpMethod::Post,
            format!("chargers/{charger_id}/schedules"),
            body,
        ))
    }

    /// Parse any operational response into an untyped JSON value.
    pub fn parse_json(&self, response: HttpResponse) -> Result<Value> {
        check_status(&response)?;
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    fn get(&self, headers: &RequestHeaders, path: String, query: Vec<(String, String)>) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}/{path}", self.base_url),
            headers: headers.to_vec(),
            query,
            body: None,
            timeout: self.request_timeout,
        }
    }

    // Writes go out without the request timeout.
    fn send(&self, headers: &RequestHeaders, method: HttpMethod, path: String, body: Value) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("{}/{path}", self.base_url),
            headers: headers.to_vec(),
            query: Vec::new(),
            body: Some(body.to_string()),
            timeout: None,
        }
    }
}

/// Map any non-2xx status to `ApiError::Http`.
fn check_status(response: &HttpResponse) -> Result<()> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}
