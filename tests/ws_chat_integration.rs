//! Integration tests for the WebSocket chat channel + intake flow.
//!
//! Each test spins up an Axum server on a random port, connects via
//! tokio-tungstenite, and drives the real chat contract end-to-end. The
//! portal client points at an unroutable address, so submission attempts
//! exercise the external-failure path.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use credit_intake::api::PortalClient;
use credit_intake::channels::{Channel, WsChannel};
use credit_intake::flow::IntakeFlow;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

type WsClient = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Start the chat server and flow on a random port, return a connected client.
///
/// The client connects before the flow starts so the greeting broadcast is
/// not missed.
async fn start_chat() -> WsClient {
    let channel = Arc::new(WsChannel::new());
    let app = channel.router();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (ws, _resp) = connect_async(format!("ws://127.0.0.1:{port}/ws/chat"))
        .await
        .expect("WS connect failed");

    // Let the server-side socket handler subscribe before the flow greets.
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Nothing listens on port 9 — every portal call fails fast.
    let client = Arc::new(PortalClient::new("http://127.0.0.1:9"));
    let flow_channel: Arc<dyn Channel> = channel;
    tokio::spawn(async move {
        IntakeFlow::new().run(flow_channel, client).await.unwrap();
    });

    ws
}

/// Read the next text frame as JSON.
async fn next_json(ws: &mut WsClient) -> Value {
    loop {
        let msg = ws.next().await.unwrap().unwrap();
        match msg {
            Message::Text(txt) => {
                return serde_json::from_str(&txt).expect("invalid JSON from server");
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("expected Text frame, got {other:?}"),
        }
    }
}

async fn send_chat(ws: &mut WsClient, content: &str) {
    let frame = json!({"type": "message", "content": content}).to_string();
    ws.send(Message::Text(frame.into())).await.unwrap();
}

async fn send_attachment(ws: &mut WsClient, file_name: &str, bytes: &[u8]) {
    let meta = json!({"type": "attachment", "file_name": file_name}).to_string();
    ws.send(Message::Text(meta.into())).await.unwrap();
    ws.send(Message::Binary(bytes.to_vec().into())).await.unwrap();
}

/// Drive the scripted dialogue up to (and including) the given replies,
/// asserting each one is answered with a bot message.
async fn drive(ws: &mut WsClient, replies: &[&str]) {
    for reply in replies {
        send_chat(ws, reply).await;
        let json = next_json(ws).await;
        assert_eq!(json["type"], "bot", "unexpected reply to {reply:?}: {json}");
    }
}

const HAPPY_PATH: [&str; 12] = [
    "Jane Doe", "Female", "No", "2", "Graduate", "No", "55000", "0", "150", "360", "Yes", "Urban",
];

#[tokio::test]
async fn greeting_arrives_on_connect() {
    timeout(TEST_TIMEOUT, async {
        let mut ws = start_chat().await;

        let json = next_json(&mut ws).await;
        assert_eq!(json["type"], "bot");
        assert!(
            json["content"].as_str().unwrap().contains("full name"),
            "greeting should ask for the name: {json}"
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn invalid_reply_is_rejected_and_retryable() {
    timeout(TEST_TIMEOUT, async {
        let mut ws = start_chat().await;
        let _greeting = next_json(&mut ws).await;

        send_chat(&mut ws, "Jane").await;
        let json = next_json(&mut ws).await;
        assert_eq!(json["type"], "bot");
        assert_eq!(
            json["content"],
            "Please enter your full name (first and last name)."
        );

        // The same question is still open.
        send_chat(&mut ws, "Jane Doe").await;
        let json = next_json(&mut ws).await;
        assert_eq!(json["type"], "bot");
        assert!(json["content"].as_str().unwrap().starts_with("Thank you, Jane Doe."));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn declining_confirmation_restarts_the_dialogue() {
    timeout(TEST_TIMEOUT, async {
        let mut ws = start_chat().await;
        let _greeting = next_json(&mut ws).await;

        drive(&mut ws, &HAPPY_PATH).await;

        send_chat(&mut ws, "no thanks").await;
        let json = next_json(&mut ws).await;
        assert_eq!(json["type"], "restart");
        assert!(json["content"].as_str().unwrap().contains("start over"));

        // The dialogue is back at the first question.
        send_chat(&mut ws, "John Smith").await;
        let json = next_json(&mut ws).await;
        assert_eq!(json["type"], "bot");
        assert!(json["content"].as_str().unwrap().starts_with("Thank you, John Smith."));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn confirmation_reveals_the_statement_upload() {
    timeout(TEST_TIMEOUT, async {
        let mut ws = start_chat().await;
        let _greeting = next_json(&mut ws).await;

        drive(&mut ws, &HAPPY_PATH).await;

        send_chat(&mut ws, "Yes").await;
        let json = next_json(&mut ws).await;
        assert_eq!(json["type"], "request_statement");
        assert!(json["content"].as_str().unwrap().contains("bank statement"));

        // Free text has no handler now; the flow re-prompts for the file.
        send_chat(&mut ws, "here you go").await;
        let json = next_json(&mut ws).await;
        assert_eq!(json["type"], "bot");
        assert!(json["content"].as_str().unwrap().contains("bank statement PDF"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn failed_submission_surfaces_error_and_reprompts() {
    timeout(TEST_TIMEOUT, async {
        let mut ws = start_chat().await;
        let _greeting = next_json(&mut ws).await;

        drive(&mut ws, &HAPPY_PATH).await;
        send_chat(&mut ws, "yes").await;
        let json = next_json(&mut ws).await;
        assert_eq!(json["type"], "request_statement");

        // A statement fixture on disk, handed over as a binary frame.
        let mut statement = tempfile::NamedTempFile::new().unwrap();
        statement.write_all(b"%PDF-1.4 not a real statement").unwrap();
        let bytes = std::fs::read(statement.path()).unwrap();
        send_attachment(&mut ws, "statement.pdf", &bytes).await;

        let json = next_json(&mut ws).await;
        assert_eq!(json["type"], "bot");
        assert!(json["content"].as_str().unwrap().contains("please wait"));

        // No portal is listening, so the submission fails externally…
        let json = next_json(&mut ws).await;
        assert_eq!(json["type"], "error");
        assert!(
            json["content"]
                .as_str()
                .unwrap()
                .contains("error occurred during submission")
        );

        // …and the flow re-opens the statement upload for a retry.
        let json = next_json(&mut ws).await;
        assert_eq!(json["type"], "request_statement");
    })
    .await
    .expect("test timed out");
}
