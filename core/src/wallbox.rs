//! Authenticated session: credentials, token pair and request headers.
//!
//! # Design
//! `Wallbox` owns a `Transport` and drives `WallboxClient` through it. The
//! only state it keeps is the token pair and the headers derived from it, and
//! only `authenticate` mutates them. A new `TokenState` is parsed in full
//! before anything is assigned, so a failed sign-in or refresh leaves the
//! previous tokens and `Authorization` header exactly as they were.
//!
//! Operations never authenticate on their own. Callers run `authenticate`
//! first; an expired token shows up as the server's 401/403.
//!
//! The session is single-owner: `authenticate` takes `&mut self`, so sharing
//! it across threads needs the caller's own lock.

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;

use crate::client::WallboxClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{RequestHeaders, Transport};
use crate::token::{self, TokenState, TokenStatus};
use crate::transport::UreqTransport;
use crate::types::ChargerId;

pub struct Wallbox<T: Transport = UreqTransport> {
    username: String,
    password: String,
    token_drift: Duration,
    client: WallboxClient,
    transport: T,
    token: Option<TokenState>,
    headers: RequestHeaders,
}

impl Wallbox<UreqTransport> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T: Transport> Wallbox<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let client = WallboxClient::new(&config.base_url, &config.auth_url, config.request_timeout);
        Self {
            username: config.username,
            password: config.password,
            token_drift: config.token_drift,
            client,
            transport,
            token: None,
            headers: RequestHeaders::new(),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.client.request_timeout()
    }

    pub fn token(&self) -> Option<&TokenState> {
        self.token.as_ref()
    }

    pub fn headers(&self) -> &RequestHeaders {
        &self.headers
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn token_status_at(&self, now: f64) -> TokenStatus {
        token::status_of(self.token.as_ref(), self.token_drift, now)
    }

    /// Make sure a usable access token is installed, using the wall clock.
    pub fn authenticate(&mut self) -> Result<()> {
        self.authenticate_at(now_secs())
    }

    /// Same as `authenticate`, with `now` in epoch seconds.
    ///
    /// No I/O while the access token is valid. Otherwise exactly one call:
    /// refresh when the refresh token is still good, full sign-in when not.
    /// A rejected refresh is returned as an error, not retried as sign-in.
    pub fn authenticate_at(&mut self, now: f64) -> Result<()> {
        let status = self.token_status_at(now);
        let request = match (status, &self.token) {
            (TokenStatus::AccessValid, _) => {
                debug!("access token still valid, skipping authentication");
                return Ok(());
            }
            (TokenStatus::RefreshValid, Some(current)) => {
                info!("access token expired, refreshing");
                self.client.build_refresh(&current.refresh_token)
            }
            _ => {
                info!("signing in as {}", self.username);
                self.client.build_signin(&self.username, &self.password)
            }
        };

        let response = self.transport.execute(request)?;
        let fresh = self.client.parse_auth(response)?;
        self.headers.set_bearer(&fresh.access_token);
        self.token = Some(fresh);
        Ok(())
    }

    /// Identifiers of every charger across all groups, in encounter order.
    pub fn get_chargers_list(&self) -> Result<Vec<ChargerId>> {
        let request = self.client.build_chargers_list(&self.headers);
        self.client.parse_chargers_list(self.transport.execute(request)?)
    }

    pub fn get_charger_status(&self, charger_id: ChargerId) -> Result<Value> {
        let request = self.client.build_charger_status(&self.headers, charger_id);
        self.client.parse_json(self.transport.execute(request)?)
    }

    pub fn unlock_charger(&self, charger_id: ChargerId) -> Result<Value> {
        let request = self.client.build_unlock_charger(&self.headers, charger_id);
        self.client.parse_json(self.transport.execute(request)?)
    }

    pub fn lock_charger(&self, charger_id: ChargerId) -> Result<Value> {
        let request = self.client.build_lock_charger(&self.headers, charger_id);
        self.client.parse_json(self.transport.execute(request)?)
    }

    pub fn set_max_charging_current(&self, charger_id: ChargerId, amps: u32) -> Result<Value> {
        let request = self
            .client
            .build_set_max_charging_current(&self.headers, charger_id, amps);
        self.client.parse_json(self.transport.execute(request)?)
    }

    pub fn pause_charging_session(&self, charger_id: ChargerId) -> Result<Value> {
        let request = self.client.build_pause_charging_session(&self.headers, charger_id);
        self.client.parse_json(self.transport.execute(request)?)
    }

    pub fn resume_charging_session(&self, charger_id: ChargerId) -> Result<Value> {
        let request = self.client.build_resume_charging_session(&self.headers, charger_id);
        self.client.parse_json(self.transport.execute(request)?)
    }

    pub fn restart_charger(&self, charger_id: ChargerId) -> Result<Value> {
        let request = self.client.build_restart_charger(&self.headers, charger_id);
        self.client.parse_json(self.transport.execute(request)?)
    }

    pub fn get_session_list(
        &self,
        charger_id: ChargerId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Value> {
        let request = self
            .client
            .build_session_list(&self.headers, charger_id, start, end);
        self.client.parse_json(self.transport.execute(request)?)
    }

    pub fn set_energy_cost(&self, charger_id: ChargerId, cost: f64) -> Result<Value> {
        let request = self
            .client
            .build_set_energy_cost(&self.headers, charger_id, cost)?;
        self.client.parse_json(self.transport.execute(request)?)
    }

    pub fn get_charger_schedules(&self, charger_id: ChargerId) -> Result<Value> {
        let request = self.client.build_charger_schedules(&self.headers, charger_id);
        self.client.parse_json(self.transport.execute(request)?)
    }

    /// `schedules` may be a `ScheduleRequest` or a raw `serde_json::Value`.
    pub fn set_charger_schedules<S: Serialize + ?Sized>(&self, charger_id: ChargerId, schedules: &S) -> Result<Value> {
        let request = self
            .client
            .build_set_charger_schedules(&self.headers, charger_id, schedules)?;
        self.client.parse_json(self.transport.execute(request)?)
    }
}

fn now_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}
