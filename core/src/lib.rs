//! Synchronous client for the Wallbox charger-management API.
//!
//! # Overview
//! Signs in against the vendor's authentication host, keeps the short-lived
//! access/refresh token pair current, and wraps each operational endpoint
//! (charger listing, status, locking, current limit, remote actions, session
//! history, energy cost, schedules) in one blocking call.
//!
//! # Design
//! - `WallboxClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`, and no I/O happens in between.
//! - `Wallbox` owns the token state plus a `Transport` and runs the
//!   build/execute/parse cycle. `UreqTransport` is the default transport.
//! - Responses are returned as `serde_json::Value` except the charger list,
//!   which is flattened to bare identifiers.
//! - Errors carry the HTTP status and body; nothing is retried.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod token;
pub mod transport;
pub mod types;
pub mod wallbox;

pub use client::WallboxClient;
pub use config::ClientConfig;
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestHeaders, Transport};
pub use token::{TokenState, TokenStatus};
pub use transport::UreqTransport;
pub use types::{ChargerId, RemoteAction, Schedule, ScheduleDays, ScheduleRequest};
pub use wallbox::Wallbox;
