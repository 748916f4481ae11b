use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_USERNAME: &str = "user@example.com";
pub const DEFAULT_PASSWORD: &str = "secret";

const ACCESS_TTL_MS: i64 = 15 * 60 * 1000;
const REFRESH_TTL_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// Charger status codes reported by `chargers/status/{id}`.
pub const STATUS_READY: u32 = 161;
pub const STATUS_PAUSED: u32 = 182;
pub const STATUS_CHARGING: u32 = 194;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChargerRef {
    pub id: u64,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,
    pub name: String,
    pub chargers: Vec<ChargerRef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Charger {
    pub id: u64,
    pub name: String,
    pub locked: u8,
    pub max_charging_current: u32,
    pub energy_cost: f64,
    pub status_id: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub id: u64,
    pub charger: u64,
    pub start: i64,
    pub end: i64,
    pub energy: f64,
}

#[derive(Default)]
struct Inner {
    access_token: Option<String>,
    refresh_token: Option<String>,
    groups: Vec<Group>,
    chargers: HashMap<u64, Charger>,
    sessions: Vec<Session>,
    schedules: HashMap<u64, Vec<Value>>,
}

/// In-memory state of the fake vendor backend.
///
/// Counts authentication round-trips so tests can tell a no-op
/// authentication from a sign-in or a refresh.
pub struct MockState {
    username: String,
    password: String,
    access_ttl_ms: i64,
    refresh_ttl_ms: i64,
    signins: AtomicUsize,
    refreshes: AtomicUsize,
    inner: RwLock<Inner>,
}

pub type Db = Arc<MockState>;

impl MockState {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            access_ttl_ms: ACCESS_TTL_MS,
            refresh_ttl_ms: REFRESH_TTL_MS,
            signins: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            inner: RwLock::new(seed()),
        }
    }

    /// Override the token lifetimes handed out by sign-in and refresh.
    pub fn with_ttls(mut self, access_ms: i64, refresh_ms: i64) -> Self {
        self.access_ttl_ms = access_ms;
        self.refresh_ttl_ms = refresh_ms;
        self
    }

    pub fn signin_count(&self) -> usize {
        self.signins.load(Ordering::SeqCst)
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME, DEFAULT_PASSWORD)
    }
}

/// Two groups, three chargers. Charger 101 is listed in both groups.
fn seed() -> Inner {
    let charger = |id: u64, name: &str| Charger {
        id,
        name: name.to_string(),
        locked: 0,
        max_charging_current: 32,
        energy_cost: 0.0,
        status_id: STATUS_READY,
    };
    let chargers = [charger(101, "Garage"), charger(102, "Driveway"), charger(201, "Office")];
    let groups = vec![
        Group {
            id: 1,
            name: "Home".to_string(),
            chargers: vec![ref_of(&chargers[0]), ref_of(&chargers[1])],
        },
        Group {
            id: 2,
            name: "Shared".to_string(),
            chargers: vec![ref_of(&chargers[2]), ref_of(&chargers[0])],
        },
    ];
    let sessions = vec![
        Session { id: 1, charger: 101, start: 1_704_110_400, end: 1_704_124_800, energy: 11.2 },
        Session { id: 2, charger: 101, start: 1_706_788_800, end: 1_706_796_000, energy: 4.5 },
        Session { id: 3, charger: 102, start: 1_704_196_800, end: 1_704_204_000, energy: 7.0 },
    ];
    Inner {
        groups,
        chargers: chargers.into_iter().map(|c| (c.id, c)).collect(),
        sessions,
        ..Inner::default()
    }
}

fn ref_of(charger: &Charger) -> ChargerRef {
    ChargerRef {
        id: charger.id,
        name: charger.name.clone(),
    }
}

pub fn app() -> Router {
    app_with_state(Arc::new(MockState::default()))
}

pub fn app_with_state(state: Db) -> Router {
    Router::new()
        .route("/users/signin", get(signin))
        .route("/users/refresh-token", get(refresh_token))
        .route("/v3/chargers/groups", get(list_groups))
        .route("/chargers/status/{id}", get(charger_status))
        .route("/v2/charger/{id}", put(update_charger))
        .route("/v3/chargers/{id}/remote-action", post(remote_action))
        .route("/v4/sessions/stats", get(session_stats))
        .route("/chargers/config/{id}", post(update_config))
        .route("/chargers/{id}/schedules", get(get_schedules).post(set_schedules))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok())
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    authorization(headers).and_then(|v| v.strip_prefix("Bearer "))
}

fn check_partner(headers: &HeaderMap) -> Result<(), StatusCode> {
    match headers.get("partner").and_then(|v| v.to_str().ok()) {
        Some("wallbox") => Ok(()),
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

/// Issue a fresh token pair and remember it as the only valid one.
fn issue_tokens(state: &MockState, inner: &mut Inner) -> Json<Value> {
    let access = format!("access-{}", Uuid::new_v4());
    let refresh = format!("refresh-{}", Uuid::new_v4());
    inner.access_token = Some(access.clone());
    inner.refresh_token = Some(refresh.clone());
    let now = now_ms();
    Json(json!({
        "data": {
            "attributes": {
                "token": access,
                "refresh_token": refresh,
                "ttl": now + state.access_ttl_ms,
                "refresh_token_ttl": now + state.refresh_ttl_ms,
            }
        }
    }))
}

async fn signin(State(state): State<Db>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    check_partner(&headers)?;
    let expected = format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", state.username, state.password))
    );
    if authorization(&headers) != Some(expected.as_str()) {
        debug!("signin rejected");
        return Err(StatusCode::UNAUTHORIZED);
    }
    state.signins.fetch_add(1, Ordering::SeqCst);
    let mut inner = state.inner.write().await;
    Ok(issue_tokens(&state, &mut inner))
}

async fn refresh_token(State(state): State<Db>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    check_partner(&headers)?;
    let mut inner = state.inner.write().await;
    let sent = bearer(&headers);
    if sent.is_none() || sent != inner.refresh_token.as_deref() {
        debug!("refresh rejected");
        return Err(StatusCode::UNAUTHORIZED);
    }
    state.refreshes.fetch_add(1, Ordering::SeqCst);
    Ok(issue_tokens(&state, &mut inner))
}

fn check_access(headers: &HeaderMap, inner: &Inner) -> Result<(), StatusCode> {
    match (bearer(headers), inner.access_token.as_deref()) {
        (Some(sent), Some(current)) if sent == current => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn list_groups(State(state): State<Db>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    let inner = state.inner.read().await;
    check_access(&headers, &inner)?;
    Ok(Json(json!({ "result": { "groups": inner.groups } })))
}

fn status_body(charger: &Charger) -> Value {
    json!({
        "charger_id": charger.id,
        "name": charger.name,
        "status_id": charger.status_id,
        "config_data": {
            "locked": charger.locked,
            "max_charging_current": charger.max_charging_current,
            "energyCost": { "value": charger.energy_cost },
        }
    })
}

async fn charger_status(
    State(state): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Value>, StatusCode> {
    let inner = state.inner.read().await;
    check_access(&headers, &inner)?;
    inner
        .chargers
        .get(&id)
        .map(|c| Json(status_body(c)))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_charger(
    State(state): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(input): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let mut inner = state.inner.write().await;
    check_access(&headers, &inner)?;
    let charger = inner.chargers.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(locked) = input.get("locked") {
        charger.locked = match locked.as_u64() {
            Some(0) => 0,
            Some(1) => 1,
            _ => return Err(StatusCode::UNPROCESSABLE_ENTITY),
        };
    }
    if let Some(current) = input.get("maxChargingCurrent") {
        let amps = current.as_u64().ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
        charger.max_charging_current = amps as u32;
    }
    Ok(Json(json!({
        "data": {
            "chargerData": {
                "id": charger.id,
                "locked": charger.locked,
                "maxChargingCurrent": charger.max_charging_current,
            }
        }
    })))
}

#[derive(Deserialize)]
pub struct RemoteActionBody {
    pub action: u8,
}

async fn remote_action(
    State(state): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(input): Json<RemoteActionBody>,
) -> Result<Json<Value>, StatusCode> {
    let mut inner = state.inner.write().await;
    check_access(&headers, &inner)?;
    let charger = inner.chargers.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    charger.status_id = match input.action {
        1 => STATUS_CHARGING,
        2 => STATUS_PAUSED,
        3 => STATUS_READY,
        _ => return Err(StatusCode::BAD_REQUEST),
    };
    Ok(Json(json!({ "id": id, "action": input.action, "status_id": charger.status_id })))
}

#[derive(Deserialize)]
pub struct SessionQuery {
    pub charger: u64,
    pub start_date: i64,
    pub end_date: i64,
}

async fn session_stats(
    State(state): State<Db>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Value>, StatusCode> {
    let inner = state.inner.read().await;
    check_access(&headers, &inner)?;
    let sessions: Vec<&Session> = inner
        .sessions
        .iter()
        .filter(|s| s.charger == query.charger && s.start >= query.start_date && s.start <= query.end_date)
        .collect();
    Ok(Json(json!({ "data": sessions })))
}

#[derive(Deserialize)]
pub struct ConfigBody {
    #[serde(rename = "energyCost")]
    pub energy_cost: f64,
}

async fn update_config(
    State(state): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(input): Json<ConfigBody>,
) -> Result<Json<Value>, StatusCode> {
    let mut inner = state.inner.write().await;
    check_access(&headers, &inner)?;
    let charger = inner.chargers.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    charger.energy_cost = input.energy_cost;
    Ok(Json(json!({ "chargerId": id, "energyCost": charger.energy_cost })))
}

async fn get_schedules(
    State(state): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Value>, StatusCode> {
    let inner = state.inner.read().await;
    check_access(&headers, &inner)?;
    if !inner.chargers.contains_key(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    let schedules = inner.schedules.get(&id).cloned().unwrap_or_default();
    Ok(Json(json!({ "schedules": schedules })))
}

/// Slots are stored by their `id` position. Every slot must name the charger
/// in the path.
async fn set_schedules(
    State(state): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(input): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let mut inner = state.inner.write().await;
    check_access(&headers, &inner)?;
    if !inner.chargers.contains_key(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    let slots = input
        .get("schedules")
        .and_then(Value::as_array)
        .ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
    let mut positioned = Vec::with_capacity(slots.len());
    for slot in slots {
        if slot.get("chargerId").and_then(Value::as_u64) != Some(id) {
            return Err(StatusCode::BAD_REQUEST);
        }
        let position = slot
            .get("id")
            .and_then(Value::as_u64)
            .ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
        positioned.push((position as usize, slot));
    }
    let stored = inner.schedules.entry(id).or_default();
    for (position, slot) in positioned {
        if position < stored.len() {
            stored[position] = slot.clone();
        } else {
            stored.push(slot.clone());
        }
    }
    Ok(Json(json!({ "schedules": stored })))
}
