//! CLI channel — stdin/stdout chat REPL for local use.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{
    Attachment, Channel, IncomingMessage, MessageStream, OutgoingResponse,
};
use crate::error::ChannelError;

/// A CLI channel that reads from stdin and writes to stdout.
///
/// When the flow asks for files (statement, verification documents), the next
/// lines are interpreted as file paths and read from disk; otherwise every
/// line is a chat message.
pub struct CliChannel {
    /// How many of the upcoming input lines are file paths.
    pending_files: Arc<AtomicUsize>,
}

impl CliChannel {
    pub fn new() -> Self {
        Self {
            pending_files: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let pending_files = Arc::clone(&self.pending_files);

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }

                        let msg = if pending_files.load(Ordering::SeqCst) > 0 {
                            match tokio::fs::read(&line).await {
                                Ok(bytes) => {
                                    pending_files.fetch_sub(1, Ordering::SeqCst);
                                    let file_name = std::path::Path::new(&line)
                                        .file_name()
                                        .and_then(|n| n.to_str())
                                        .unwrap_or("attachment")
                                        .to_string();
                                    IncomingMessage::attachment(
                                        "cli",
                                        "local-user",
                                        Attachment { file_name, bytes },
                                    )
                                }
                                Err(e) => {
                                    eprintln!("Could not read {line}: {e}");
                                    eprint!("> ");
                                    continue;
                                }
                            }
                        } else {
                            IncomingMessage::text("cli", "local-user", &line)
                        };

                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(&self, response: OutgoingResponse) -> Result<(), ChannelError> {
        match response {
            OutgoingResponse::Bot { content } => {
                println!("\n{content}\n");
            }
            OutgoingResponse::RequestStatement { content } => {
                self.pending_files.store(1, Ordering::SeqCst);
                println!("\n{content}\n");
                eprintln!("(enter the path to your bank statement PDF)");
            }
            OutgoingResponse::Restart { content } => {
                self.pending_files.store(0, Ordering::SeqCst);
                println!("\n{content}\n");
            }
            OutgoingResponse::Submitted { content, .. } => {
                println!("\n{content}\n");
            }
            OutgoingResponse::RequestDocuments {
                content,
                application_id,
            } => {
                // Aadhaar first, then the salary slip.
                self.pending_files.store(2, Ordering::SeqCst);
                println!("\n{content}\n");
                eprintln!(
                    "(application #{application_id}: enter the path to your Aadhaar image, \
                     then the path to your salary slip)"
                );
            }
            OutgoingResponse::DocumentsAccepted { content } => {
                self.pending_files.store(0, Ordering::SeqCst);
                println!("\n{content}\n");
            }
            OutgoingResponse::Notification {
                content,
                report_url,
            } => {
                match report_url {
                    Some(url) => eprintln!("🔔 {content} ({url})"),
                    None => eprintln!("🔔 {content}"),
                }
            }
            OutgoingResponse::Error { content } => {
                eprintln!("⚠️  {content}");
            }
        }
        eprint!("> ");
        Ok(())
    }
}
