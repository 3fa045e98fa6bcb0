//! Channel abstraction for chat I/O.
//!
//! A channel is a presentation adapter: it turns user activity into
//! [`IncomingMessage`]s and renders [`OutgoingResponse`]s. All decisions about
//! *what* to render come from the intake machine's effects via the flow layer;
//! channels only decide *how*.

pub mod cli;
pub mod ws;

pub use cli::CliChannel;
pub use ws::WsChannel;

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ChannelError;

/// A user-submitted chat event.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: Uuid,
    pub channel: String,
    pub sender: String,
    pub body: MessageBody,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn text(channel: &str, sender: &str, line: &str) -> Self {
        Self::new(channel, sender, MessageBody::Text(line.to_string()))
    }

    pub fn attachment(channel: &str, sender: &str, attachment: Attachment) -> Self {
        Self::new(channel, sender, MessageBody::Attachment(attachment))
    }

    fn new(channel: &str, sender: &str, body: MessageBody) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            sender: sender.to_string(),
            body,
            received_at: Utc::now(),
        }
    }
}

/// The payload of an incoming event.
#[derive(Debug, Clone)]
pub enum MessageBody {
    /// A chat line typed by the applicant.
    Text(String),
    /// A document handed over for upload.
    Attachment(Attachment),
}

/// A file the applicant handed to the client.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// What the UI should render — the machine's effects plus submission
/// outcomes and server notices, as data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingResponse {
    /// A bot utterance; the input stays open.
    Bot { content: String },
    /// Render the message, hide the chat input, reveal the statement control.
    RequestStatement { content: String },
    /// Render the message and clear any in-progress upload widgets.
    Restart { content: String },
    /// The application went in; show the preliminary decision.
    Submitted {
        content: String,
        application_id: i64,
        preliminary_decision: Option<String>,
    },
    /// Render the message and reveal the two-document verification form
    /// (Aadhaar image, then salary slip).
    RequestDocuments {
        content: String,
        application_id: i64,
    },
    /// Verification documents were accepted by the portal.
    DocumentsAccepted { content: String },
    /// A server-pushed notice from the notification feed.
    Notification {
        content: String,
        report_url: Option<String>,
    },
    /// An external failure surfaced to the applicant.
    Error { content: String },
}

/// Stream of incoming messages produced by a channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A chat presentation adapter.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel identifier, e.g. "cli", "web".
    fn name(&self) -> &str;

    /// Start the channel and return its incoming message stream.
    ///
    /// May only be called once per channel instance.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Render a response to the user.
    async fn respond(&self, response: OutgoingResponse) -> Result<(), ChannelError>;
}
