//! # Viewer-Facing Server
//!
//! WebSocket push channel plus the read-only HTTP status surface, on one
//! axum router. Each accepted socket becomes a viewer session:
//!
//! 1. Register with the dispatcher and immediately send the `INITIAL_DATA`
//!    snapshot, so a newly joined viewer does not wait for the next event.
//! 2. While open, forward every broadcast frame and answer the one inbound
//!    request kind (`REQUEST_ALL_DATA`) point-to-point. Malformed requests
//!    are logged and ignored; the session stays open.
//! 3. On close or send failure, deregister from the dispatcher.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::StreamExt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use cycle_common::model::{ClientMessage, ServerMessage};
use cycle_common::{CycleStore, DashboardState, Dispatcher};

static NEXT_CLIENT_ID: AtomicUsize = AtomicUsize::new(1);

/// Shared state for the viewer-facing routes.
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub state: Arc<DashboardState>,
    pub store: Arc<dyn CycleStore>,
}

pub async fn run(port: u16, app_state: Arc<AppState>, mut shutdown: broadcast::Receiver<()>) {
    // The dashboard may be served from anywhere; keep CORS permissive.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/ng-trend", get(trend_handler))
        .route("/api/all-data", get(all_data_handler))
        .layer(cors)
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log::info!("Viewer gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind viewer gateway port");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.recv().await.ok();
            log::info!("Viewer gateway shutting down.");
        })
        .await
        .expect("Viewer gateway server error");
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn health_handler() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "OK")
}

/// Current daily statistics (read-only, for debugging and monitoring).
async fn stats_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.state.stats().await;
    Json(serde_json::json!({
        "totalOK": stats.total_ok,
        "totalNG": stats.total_ng,
        "totalParts": stats.total_ok + stats.total_ng,
        "currentOutput": stats.current_output,
        "avgCycleTime": stats.avg_cycle_time,
    }))
}

/// Current NG trend series (read-only).
async fn trend_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.state.trend().await)
}

/// Current cached record list (read-only).
async fn all_data_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.state.cache.snapshot().await)
}

/// One viewer session: Connecting → Open → Closed.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let client_id = format!("viewer-{}", NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed));
    let mut rx = state.dispatcher.add_client(&client_id);
    log::info!("Viewer {} connected", client_id);

    // Full-state snapshot, sent point-to-point before anything else.
    let snapshot = ServerMessage::InitialData(state.state.initial_snapshot().await);
    match serde_json::to_string(&snapshot) {
        Ok(text) => {
            if socket.send(Message::Text(text.into())).await.is_err() {
                state.dispatcher.remove_client(&client_id);
                return;
            }
        }
        Err(e) => log::error!("Failed to serialize initial snapshot: {}", e),
    }

    loop {
        tokio::select! {
            // Inbound requests from this viewer
            msg = socket.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_request(&mut socket, &state, &client_id, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong/binary: nothing to do
                    Some(Err(_)) => break,
                }
            }
            // Broadcast frames from the dispatcher
            frame = rx.recv() => {
                match frame {
                    Some(text) => {
                        if socket.send(Message::Text(text.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    None => break, // deregistered elsewhere
                }
            }
        }
    }

    state.dispatcher.remove_client(&client_id);
    log::info!("Viewer {} disconnected", client_id);
}

/// Answers `REQUEST_ALL_DATA` point-to-point. The unscoped request is served
/// from the cache; a period-scoped one queries the store directly.
async fn handle_client_request(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    client_id: &str,
    text: &str,
) {
    let request = match serde_json::from_str::<ClientMessage>(text) {
        Ok(req) => req,
        Err(e) => {
            // Session-local problem: log and keep the session open.
            log::warn!("Viewer {} sent malformed request, ignoring: {}", client_id, e);
            return;
        }
    };

    let ClientMessage::RequestAllData { payload } = request;
    let records = match payload.map(|p| p.period) {
        None => state.state.cache.snapshot().await,
        Some(period) => match state.store.recent_records(period).await {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("History query for viewer {} failed: {}", client_id, e);
                return;
            }
        },
    };

    match serde_json::to_string(&ServerMessage::AllCycleData(records)) {
        Ok(reply) => {
            if socket.send(Message::Text(reply.into())).await.is_err() {
                log::info!("Viewer {} went away during history reply", client_id);
            }
        }
        Err(e) => log::error!("Failed to serialize history reply: {}", e),
    }
}
