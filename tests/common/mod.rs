//! Shared test plumbing: an in-process stand-in for the table service.
//!
//! The real service answers `GET /tables/{id}` with the whole table as JSON
//! and writes the literal text `NewState` to every websocket subscribed at
//! `/state-updates/{id}` whenever anything changed. The stand-in keeps the
//! same routes, status codes, and plain-text error bodies (trailing newline
//! included, like Go's `http.Error`), but lets tests reach in: seed or swap
//! table state wholesale, push arbitrary frames, fail the next pull, and
//! count how often the client actually pulled.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use url::Url;

use bjack_client::{ClientConfig, TableSession, TableState};

/// A frame queued for every websocket subscribed to a table.
#[derive(Clone)]
enum Push {
    Text(String),
    Binary(Vec<u8>),
    /// Makes the service side close the socket.
    Disconnect,
}

struct TableEntry {
    state: Value,
    /// Seat order, aligned with the `players` array inside `state`.
    player_ids: Vec<String>,
    /// Turn actions received, oldest first.
    actions: Vec<(String, String)>,
    pulls: usize,
    pushes: broadcast::Sender<Push>,
}

impl TableEntry {
    fn new(state: Value) -> Self {
        let (pushes, _) = broadcast::channel(16);
        Self {
            state,
            player_ids: Vec::new(),
            actions: Vec::new(),
            pulls: 0,
            pushes,
        }
    }
}

#[derive(Default)]
struct ServiceState {
    tables: Mutex<HashMap<String, TableEntry>>,
    next_id: AtomicUsize,
    /// How many upcoming pulls answer 500 instead of the state.
    failing_pulls: AtomicUsize,
    /// When set, the next turn action is rejected the way the game core
    /// rejects an out-of-turn hit.
    action_rejection: Mutex<Option<String>>,
}

impl Default for TableEntry {
    fn default() -> Self {
        Self::new(fresh_table())
    }
}

pub struct MockTableService {
    addr: SocketAddr,
    service: Arc<ServiceState>,
    server: JoinHandle<()>,
}

impl MockTableService {
    pub async fn spawn() -> Self {
        let service = Arc::new(ServiceState::default());
        let app = Router::new()
            .route("/tables", post(create_table))
            .route("/tables/:table_id", get(table_state))
            .route("/tables/:table_id/:player_id", post(turn_action))
            .route("/tables/players/:table_id", post(add_player))
            .route("/tables/players/:table_id/:player_id", delete(remove_player))
            .route("/tables/ready/:table_id/:player_id", post(toggle_ready))
            .route("/state-updates/:table_id", get(state_updates))
            .with_state(Arc::clone(&service));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            service,
            server,
        }
    }

    /// Client configuration pointed at this service, with delays shrunk so
    /// reconnect behaviour is observable within a test's patience.
    pub fn config(&self) -> ClientConfig {
        let api_url = Url::parse(&format!("http://{}", self.addr)).unwrap();
        ClientConfig::new(api_url)
            .unwrap()
            .with_request_timeout(Duration::from_secs(2))
            .with_handshake_timeout(Duration::from_secs(2))
            .with_reconnect_delay(Duration::from_millis(50))
    }

    /// Seeds a table directly, without the REST surface and without pushing.
    pub fn seed_table(&self, table_id: &str, state: Value) {
        self.tables()
            .insert(table_id.to_owned(), TableEntry::new(state));
    }

    /// Swaps a table's state wholesale. No push happens: callers decide
    /// whether the client gets told.
    pub fn set_state(&self, table_id: &str, state: Value) {
        self.with_table(table_id, |entry| entry.state = state);
    }

    pub fn push_text(&self, table_id: &str, text: &str) {
        self.with_table(table_id, |entry| {
            let _ = entry.pushes.send(Push::Text(text.to_owned()));
        });
    }

    pub fn push_binary(&self, table_id: &str, bytes: &[u8]) {
        self.with_table(table_id, |entry| {
            let _ = entry.pushes.send(Push::Binary(bytes.to_vec()));
        });
    }

    /// Closes every websocket subscribed to the table from the service side.
    pub fn drop_subscribers(&self, table_id: &str) {
        self.with_table(table_id, |entry| {
            let _ = entry.pushes.send(Push::Disconnect);
        });
    }

    /// How many times `GET /tables/{id}` has been answered, failures included.
    pub fn pull_count(&self, table_id: &str) -> usize {
        self.with_table(table_id, |entry| entry.pulls)
    }

    pub fn subscriber_count(&self, table_id: &str) -> usize {
        self.with_table(table_id, |entry| entry.pushes.receiver_count())
    }

    pub fn player_names(&self, table_id: &str) -> Vec<String> {
        self.with_table(table_id, |entry| {
            entry.state["players"]
                .as_array()
                .map(|rows| {
                    rows.iter()
                        .filter_map(|row| row["name"].as_str().map(str::to_owned))
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    pub fn actions(&self, table_id: &str) -> Vec<(String, String)> {
        self.with_table(table_id, |entry| entry.actions.clone())
    }

    /// The next `GET /tables/{id}` answers 500, whatever the table.
    pub fn fail_next_pull(&self) {
        self.service.failing_pulls.fetch_add(1, Ordering::SeqCst);
    }

    /// The next turn action is rejected with `Invalid action: {reason}`.
    pub fn reject_next_action(&self, reason: &str) {
        *self.service.action_rejection.lock().unwrap() = Some(reason.to_owned());
    }

    fn tables(&self) -> MutexGuard<'_, HashMap<String, TableEntry>> {
        self.service.tables.lock().unwrap()
    }

    fn with_table<R>(&self, table_id: &str, f: impl FnOnce(&mut TableEntry) -> R) -> R {
        let mut tables = self.tables();
        let entry = tables
            .get_mut(table_id)
            .unwrap_or_else(|| panic!("unknown table {table_id}"));
        f(entry)
    }
}

impl Drop for MockTableService {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// The state a freshly created table serves: nobody seated, one empty dealer
/// hand.
pub fn fresh_table() -> Value {
    json!({ "players": [], "hands": [[]], "state": 0, "currentPlayer": 1 })
}

/// A player row as the service would serialize it right after seating.
pub fn player_row(name: &str) -> Value {
    json!({ "name": name, "isReady": false, "chips": 100, "bet": 0, "outcome": 0 })
}

/// Polls the session's state until `predicate` holds. Panics if it never
/// does within two seconds.
pub async fn wait_for_state(
    session: &TableSession,
    predicate: impl Fn(&TableState) -> bool,
) -> TableState {
    let mut state_rx = session.state();
    let converged = async move {
        loop {
            let snapshot = state_rx.borrow_and_update().clone();
            if predicate(&snapshot) {
                return snapshot;
            }
            state_rx.changed().await.expect("state channel closed");
        }
    };
    tokio::time::timeout(Duration::from_secs(2), converged)
        .await
        .expect("table state never reached the expected shape")
}

/// Polls `condition` until it holds. Panics if it never does within two
/// seconds.
pub async fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
    let started = tokio::time::Instant::now();
    while started.elapsed() < Duration::from_secs(2) {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}

/// A grace period for asserting that something does NOT happen.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NameRequest {
    #[serde(default)]
    player_name: String,
}

#[derive(Deserialize)]
struct ActionQuery {
    action: Option<String>,
}

fn plain_error(status: StatusCode, message: &str) -> Response {
    (status, format!("{message}\n")).into_response()
}

fn push_row(state: &mut Value, key: &str, row: Value) {
    if !state[key].is_array() {
        state[key] = json!([]);
    }
    if let Some(rows) = state[key].as_array_mut() {
        rows.push(row);
    }
}

async fn create_table(
    State(service): State<Arc<ServiceState>>,
    Json(request): Json<NameRequest>,
) -> Response {
    if request.player_name.is_empty() {
        return plain_error(StatusCode::BAD_REQUEST, "Player name cannot be empty");
    }
    let table_id = format!("T{}", service.next_id.fetch_add(1, Ordering::SeqCst) + 1);
    service
        .tables
        .lock()
        .unwrap()
        .insert(table_id.clone(), TableEntry::default());
    Json(json!({ "tableId": table_id })).into_response()
}

async fn table_state(
    State(service): State<Arc<ServiceState>>,
    Path(table_id): Path<String>,
) -> Response {
    let mut tables = service.tables.lock().unwrap();
    let Some(entry) = tables.get_mut(&table_id) else {
        return plain_error(StatusCode::NOT_FOUND, "Game not found");
    };
    entry.pulls += 1;
    let should_fail = service
        .failing_pulls
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if should_fail {
        return plain_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
    }
    Json(entry.state.clone()).into_response()
}

async fn add_player(
    State(service): State<Arc<ServiceState>>,
    Path(table_id): Path<String>,
    Json(request): Json<NameRequest>,
) -> Response {
    let mut tables = service.tables.lock().unwrap();
    let Some(entry) = tables.get_mut(&table_id) else {
        return plain_error(StatusCode::NOT_FOUND, "Game not found");
    };
    if request.player_name.is_empty() {
        return plain_error(StatusCode::BAD_REQUEST, "Player name cannot be empty");
    }
    let player_id = format!("P{}", service.next_id.fetch_add(1, Ordering::SeqCst) + 1);
    entry.player_ids.push(player_id.clone());
    push_row(&mut entry.state, "players", player_row(&request.player_name));
    push_row(&mut entry.state, "hands", json!([]));
    let _ = entry.pushes.send(Push::Text("NewState".to_owned()));
    Json(json!({ "playerId": player_id })).into_response()
}

async fn toggle_ready(
    State(service): State<Arc<ServiceState>>,
    Path((table_id, player_id)): Path<(String, String)>,
) -> Response {
    let mut tables = service.tables.lock().unwrap();
    let Some(entry) = tables.get_mut(&table_id) else {
        return plain_error(StatusCode::NOT_FOUND, "Game not found");
    };
    let Some(seat) = entry.player_ids.iter().position(|id| *id == player_id) else {
        return plain_error(
            StatusCode::BAD_REQUEST,
            "Failed to toggle readiness: not found",
        );
    };
    let row = &mut entry.state["players"][seat];
    let was_ready = row["isReady"].as_bool().unwrap_or(false);
    row["isReady"] = Value::Bool(!was_ready);
    let player = row.clone();
    let _ = entry.pushes.send(Push::Text("NewState".to_owned()));
    Json(player).into_response()
}

async fn turn_action(
    State(service): State<Arc<ServiceState>>,
    Path((table_id, player_id)): Path<(String, String)>,
    Query(query): Query<ActionQuery>,
) -> Response {
    let mut tables = service.tables.lock().unwrap();
    let Some(entry) = tables.get_mut(&table_id) else {
        return plain_error(StatusCode::NOT_FOUND, "Game not found");
    };
    let action = query.action.unwrap_or_default();
    if action != "hit" && action != "stand" {
        return plain_error(StatusCode::BAD_REQUEST, "Invalid action");
    }
    if let Some(reason) = service.action_rejection.lock().unwrap().take() {
        return plain_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Invalid action: {reason}"),
        );
    }
    entry.actions.push((player_id, action));
    let _ = entry.pushes.send(Push::Text("NewState".to_owned()));
    StatusCode::OK.into_response()
}

async fn remove_player(
    State(service): State<Arc<ServiceState>>,
    Path((table_id, player_id)): Path<(String, String)>,
) -> Response {
    let mut tables = service.tables.lock().unwrap();
    let Some(entry) = tables.get_mut(&table_id) else {
        return plain_error(StatusCode::NOT_FOUND, "Game not found");
    };
    let Some(seat) = entry.player_ids.iter().position(|id| *id == player_id) else {
        return plain_error(StatusCode::BAD_REQUEST, "not found");
    };
    entry.player_ids.remove(seat);
    if let Some(rows) = entry.state["players"].as_array_mut() {
        if seat < rows.len() {
            rows.remove(seat);
        }
    }
    if let Some(hands) = entry.state["hands"].as_array_mut() {
        if seat + 1 < hands.len() {
            hands.remove(seat + 1);
        }
    }
    let _ = entry.pushes.send(Push::Text("NewState".to_owned()));
    StatusCode::OK.into_response()
}

async fn state_updates(
    ws: WebSocketUpgrade,
    State(service): State<Arc<ServiceState>>,
    Path(table_id): Path<String>,
) -> Response {
    let pushes = {
        let tables = service.tables.lock().unwrap();
        match tables.get(&table_id) {
            Some(entry) => entry.pushes.subscribe(),
            None => return plain_error(StatusCode::NOT_FOUND, "Game not found"),
        }
    };
    ws.on_upgrade(move |socket| forward_pushes(socket, pushes))
}

async fn forward_pushes(mut socket: WebSocket, mut pushes: broadcast::Receiver<Push>) {
    loop {
        tokio::select! {
            frame = pushes.recv() => {
                let outbound = match frame {
                    Ok(Push::Text(text)) => WsMessage::Text(text),
                    Ok(Push::Binary(bytes)) => WsMessage::Binary(bytes),
                    Ok(Push::Disconnect) | Err(_) => {
                        let _ = socket.send(WsMessage::Close(None)).await;
                        break;
                    }
                };
                if socket.send(outbound).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}
