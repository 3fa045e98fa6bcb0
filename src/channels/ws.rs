//! Web channel — WebSocket chat server for the browser portal UI.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures::stream;
use serde::Deserialize;
use tokio::sync::{Mutex, broadcast, mpsc};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::channels::{
    Attachment, Channel, IncomingMessage, MessageStream, OutgoingResponse,
};
use crate::error::ChannelError;

// ── JSON Protocol ───────────────────────────────────────────────────────

/// Message from the browser → client.
///
/// Attachments arrive as an `attachment` text frame naming the file,
/// immediately followed by one binary frame with its bytes.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Message { content: String },
    Attachment { file_name: String },
}

// Server → browser messages are `OutgoingResponse` serialized directly; its
// tagged representation is the wire protocol.

// ── Shared State ────────────────────────────────────────────────────────

/// Internal state shared between the channel and WS handlers.
struct WsChannelInner {
    /// Sender for incoming messages (WS handler → `Channel::start` stream).
    incoming_tx: mpsc::UnboundedSender<IncomingMessage>,
    /// Broadcast sender for outgoing messages (`Channel::respond` → WS handlers).
    outgoing_tx: broadcast::Sender<OutgoingResponse>,
}

/// Axum handler state (cloneable).
#[derive(Clone)]
struct WsState {
    inner: Arc<WsChannelInner>,
}

// ── WsChannel ───────────────────────────────────────────────────────────

/// A WebSocket-based channel for the browser chat UI.
///
/// Architecture:
/// - `start()` returns a stream backed by an mpsc receiver. WS handlers push
///   `IncomingMessage`s into the mpsc sender when clients send frames.
/// - `respond()` broadcasts `OutgoingResponse`s to all connected clients via
///   a `broadcast::Sender`, so reconnects keep working.
pub struct WsChannel {
    inner: Arc<WsChannelInner>,
    /// Receiver side of the incoming channel — consumed once in `start()`.
    incoming_rx: Mutex<Option<mpsc::UnboundedReceiver<IncomingMessage>>>,
}

impl WsChannel {
    pub fn new() -> Self {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, _) = broadcast::channel(256);

        let inner = Arc::new(WsChannelInner {
            incoming_tx,
            outgoing_tx,
        });

        Self {
            inner,
            incoming_rx: Mutex::new(Some(incoming_rx)),
        }
    }

    /// Build the Axum router with the `/ws/chat` and `/health` endpoints.
    ///
    /// CORS is wide open: the portal UI is a static page served from
    /// elsewhere.
    pub fn router(&self) -> Router {
        let state = WsState {
            inner: Arc::clone(&self.inner),
        };

        Router::new()
            .route("/ws/chat", get(ws_chat_handler))
            .route("/health", get(health))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }
}

impl Default for WsChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for WsChannel {
    fn name(&self) -> &str {
        "web"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let rx = self
            .incoming_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| ChannelError::StartupFailed {
                name: "web".to_string(),
                reason: "start() already called".to_string(),
            })?;

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(&self, response: OutgoingResponse) -> Result<(), ChannelError> {
        // A send error only means no client is connected right now; the
        // browser will re-sync through the conversation when it reconnects.
        if self.inner.outgoing_tx.send(response).is_err() {
            debug!("No WS clients connected to receive response");
        }
        Ok(())
    }
}

// ── Handlers ────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "credit-intake"
    }))
}

async fn ws_chat_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> impl IntoResponse {
    info!("WebSocket chat client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state.inner))
}

async fn handle_socket(mut socket: WebSocket, inner: Arc<WsChannelInner>) {
    info!("WebSocket chat client connected");

    let mut rx = inner.outgoing_tx.subscribe();
    // File name announced by the most recent `attachment` frame, claimed by
    // the binary frame that follows it.
    let mut pending_file_name: Option<String> = None;

    loop {
        tokio::select! {
            // Forward broadcast responses to this client
            result = rx.recv() => {
                match result {
                    Ok(response) => {
                        if let Ok(json) = serde_json::to_string(&response) {
                            if socket.send(Message::Text(json.into())).await.is_err() {
                                debug!("Client disconnected during send");
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS chat client lagged behind broadcast");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                }
            }

            // Receive frames from the client
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Message { content }) => {
                                let msg = IncomingMessage::text("web", "web-client", &content);
                                if inner.incoming_tx.send(msg).is_err() {
                                    break;
                                }
                            }
                            Ok(ClientMessage::Attachment { file_name }) => {
                                pending_file_name = Some(file_name);
                            }
                            Err(e) => {
                                debug!(error = %e, text = %text, "Unrecognized WS message from client");
                            }
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        let file_name = pending_file_name
                            .take()
                            .unwrap_or_else(|| "attachment.bin".to_string());
                        let msg = IncomingMessage::attachment(
                            "web",
                            "web-client",
                            Attachment {
                                file_name,
                                bytes: data.to_vec(),
                            },
                        );
                        if inner.incoming_tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket chat client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket chat connection closed");
}
