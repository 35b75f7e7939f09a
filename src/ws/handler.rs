//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::dispatch::OUTBOUND_CAPACITY;
use crate::util::rate_limit::PlayerRateLimiter;
use crate::ws::protocol::ServerMsg;
use crate::ws::session::Session;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (ws_sink, ws_stream) = socket.split();

    let mut session = Session::new(
        state.gateway.clone(),
        state.config.arena,
        PlayerRateLimiter::new(state.config.input_rate_limit),
    );
    let player_id = session.id();
    info!(player_id = %player_id, "New WebSocket connection");

    let (outbound_tx, outbound_rx) = mpsc::channel::<ServerMsg>(OUTBOUND_CAPACITY);

    // Spawn writer first so the init snapshot is flushed as soon as it lands
    let writer_handle = tokio::spawn(run_writer(player_id, ws_sink, outbound_rx));

    if let Err(e) = session.connect(outbound_tx).await {
        error!(player_id = %player_id, error = %e, "Failed to join room");
        writer_handle.abort();
        return;
    }

    run_reader(&mut session, ws_stream).await;

    session.disconnect().await;
    writer_handle.abort();

    info!(player_id = %player_id, state = ?session.state(), "WebSocket connection closed");
}

/// Outbound queue -> WebSocket
async fn run_writer(
    player_id: uuid::Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<ServerMsg>,
) {
    while let Some(msg) = outbound_rx.recv().await {
        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            debug!(player_id = %player_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// WebSocket -> session, until the client goes away
async fn run_reader(session: &mut Session, mut ws_stream: futures::stream::SplitStream<WebSocket>) {
    let player_id = session.id();

    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if let Err(e) = session.handle_text(&text).await {
                    error!(player_id = %player_id, error = %e, "Dropping connection");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(player_id = %player_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(player_id = %player_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                warn!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
