//! Thin WebSocket listener for the portal's notification feed.
//!
//! The portal pushes JSON notices (`{"message": ..., "report_url"?: ...}`)
//! when an application moves through review. This listener only forwards
//! them to the active channel; it never drives the intake itself.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Deserialize;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::channels::{Channel, OutgoingResponse};

/// A server-pushed notice.
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    pub message: String,
    #[serde(default)]
    pub report_url: Option<String>,
}

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Listen to the notification feed and forward each notice to the channel.
///
/// Reconnects with a fixed delay on any error; runs until the task is
/// aborted.
pub async fn listen(url: String, user_id: i64, channel: Arc<dyn Channel>) {
    let connect_url = format!("{url}?userId={user_id}");
    loop {
        match connect_async(&connect_url).await {
            Ok((mut ws, _resp)) => {
                info!(url = %url, "Notification feed connected");
                while let Some(frame) = ws.next().await {
                    match frame {
                        Ok(Message::Text(text)) => {
                            match serde_json::from_str::<Notification>(&text) {
                                Ok(notice) => {
                                    debug!(message = %notice.message, "Notification received");
                                    let response = OutgoingResponse::Notification {
                                        content: notice.message,
                                        report_url: notice.report_url,
                                    };
                                    if let Err(e) = channel.respond(response).await {
                                        warn!(error = %e, "Failed to render notification");
                                    }
                                }
                                Err(e) => {
                                    debug!(error = %e, "Unrecognized notification payload");
                                }
                            }
                        }
                        Ok(Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(e) => {
                            warn!(error = %e, "Notification feed error");
                            break;
                        }
                    }
                }
                warn!("Notification feed disconnected; reconnecting");
            }
            Err(e) => {
                warn!(error = %e, "Could not connect to notification feed");
            }
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}
