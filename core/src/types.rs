//! Payload types for the Wallbox API.
//!
//! Most responses are returned as `serde_json::Value`; only the shapes the
//! client itself has to look inside are modelled here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Vendor-assigned charger identifier. Never validated locally.
pub type ChargerId = u64;

/// Remote actions accepted by `v3/chargers/{id}/remote-action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAction {
    Resume = 1,
    Pause = 2,
    Restart = 3,
}

/// Days a schedule slot is active on. Missing days read as `false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleDays {
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScheduleDays {
    pub fn every_day() -> Self {
        Self {
            monday: true,
            tuesday: true,
            wednesday: true,
            thursday: true,
            friday: true,
            saturday: true,
            sunday: true,
            extra: Map::new(),
        }
    }
}

/// One charging schedule slot.
///
/// `id` is the slot position to add or replace. `start` and `stop` are
/// four-digit `HHMM` strings such as `"2100"`. `charger_id` is overwritten
/// with the target charger before the slot is sent. Fields the API knows and
/// this struct does not are kept in `extra` and sent back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub id: u32,
    #[serde(rename = "chargerId", default, skip_serializing_if = "Option::is_none")]
    pub charger_id: Option<ChargerId>,
    pub enable: u8,
    pub max_current: u32,
    pub max_energy: u32,
    pub days: ScheduleDays,
    pub start: String,
    pub stop: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST chargers/{id}/schedules`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    #[serde(default)]
    pub schedules: Vec<Schedule>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `v3/chargers/groups` response, reduced to what the charger list needs.
#[derive(Debug, Deserialize)]
pub(crate) struct GroupsResponse {
    pub result: GroupsResult,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GroupsResult {
    pub groups: Vec<ChargerGroup>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChargerGroup {
    pub chargers: Vec<ChargerSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChargerSummary {
    pub id: ChargerId,
}

/// `data.attributes` of the sign-in and refresh responses.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthEnvelope {
    pub data: AuthData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthData {
    pub attributes: AuthAttributes,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthAttributes {
    pub token: String,
    pub refresh_token: String,
    pub ttl: i64,
    pub refresh_token_ttl: i64,
}
