//! The intake flow — wires the state machine to a channel and the portal.
//!
//! The machine returns data-only effects; this layer renders them, collects
//! the attachments the portal requires, and performs the network calls the
//! machine must never make. One flow drives one channel with one session at a
//! time; a fresh session starts automatically after a completed application.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::api::PortalClient;
use crate::channels::{Attachment, Channel, IncomingMessage, MessageBody, OutgoingResponse};
use crate::error::Result;
use crate::intake::{Effect, GREETING, IntakeSession};

/// Where the flow is relative to the portal's upload steps.
///
/// `Chat` spans the whole machine-driven dialogue; the rest track the
/// externally-owned submission sequence.
#[derive(Debug)]
enum FlowPhase {
    Chat,
    AwaitStatement,
    AwaitAadhaar {
        application_id: i64,
    },
    AwaitSalarySlip {
        application_id: i64,
        aadhaar: Attachment,
    },
}

/// Drives intake sessions over a channel.
pub struct IntakeFlow {
    session: IntakeSession,
    phase: FlowPhase,
}

impl IntakeFlow {
    pub fn new() -> Self {
        Self {
            session: IntakeSession::new(),
            phase: FlowPhase::Chat,
        }
    }

    /// Run the flow until the channel's incoming stream ends.
    pub async fn run(
        mut self,
        channel: Arc<dyn Channel>,
        client: Arc<PortalClient>,
    ) -> Result<()> {
        let mut incoming = channel.start().await?;
        info!(channel = channel.name(), session = %self.session.id(), "Intake flow starting");
        channel
            .respond(OutgoingResponse::Bot {
                content: GREETING.to_string(),
            })
            .await?;

        while let Some(message) = incoming.next().await {
            self.handle(message, channel.as_ref(), &client).await?;
        }
        info!("Incoming stream ended; intake flow stopping");
        Ok(())
    }

    async fn handle(
        &mut self,
        message: IncomingMessage,
        channel: &dyn Channel,
        client: &PortalClient,
    ) -> Result<()> {
        debug!(message_id = %message.id, channel = %message.channel, "Handling incoming message");

        // Take the phase by value; every arm (or the helper it calls) decides
        // the phase that follows.
        let phase = std::mem::replace(&mut self.phase, FlowPhase::Chat);
        match (phase, message.body) {
            (FlowPhase::Chat, MessageBody::Text(line)) => {
                self.handle_chat_line(&line, channel).await?;
            }
            (FlowPhase::Chat, MessageBody::Attachment(attachment)) => {
                debug!(file = %attachment.file_name, "Ignoring attachment outside an upload step");
            }

            (FlowPhase::AwaitStatement, MessageBody::Text(_)) => {
                self.phase = FlowPhase::AwaitStatement;
                channel
                    .respond(OutgoingResponse::Bot {
                        content: "Please select your bank statement PDF to continue.".to_string(),
                    })
                    .await?;
            }
            (FlowPhase::AwaitStatement, MessageBody::Attachment(statement)) => {
                self.submit_application(statement, channel, client).await?;
            }

            (FlowPhase::AwaitAadhaar { application_id }, MessageBody::Attachment(aadhaar)) => {
                self.phase = FlowPhase::AwaitSalarySlip {
                    application_id,
                    aadhaar,
                };
                channel
                    .respond(OutgoingResponse::Bot {
                        content: "Aadhaar received. Now your salary slip, please.".to_string(),
                    })
                    .await?;
            }
            (
                FlowPhase::AwaitSalarySlip {
                    application_id,
                    aadhaar,
                },
                MessageBody::Attachment(salary_slip),
            ) => {
                self.upload_documents(application_id, aadhaar, salary_slip, channel, client)
                    .await?;
            }
            (
                phase @ (FlowPhase::AwaitAadhaar { .. } | FlowPhase::AwaitSalarySlip { .. }),
                MessageBody::Text(_),
            ) => {
                self.phase = phase;
                channel
                    .respond(OutgoingResponse::Bot {
                        content: "Please select both Aadhaar and Salary Slip files.".to_string(),
                    })
                    .await?;
            }
        }
        Ok(())
    }

    /// Feed one chat line to the machine and render its effect.
    async fn handle_chat_line(&mut self, line: &str, channel: &dyn Channel) -> Result<()> {
        let Some(effect) = self.session.submit(line) else {
            debug!(state = %self.session.state(), "No handler for free text in this state");
            return Ok(());
        };

        let response = match effect {
            Effect::Reject { message } | Effect::AdvanceAndPrompt { message } => {
                OutgoingResponse::Bot { content: message }
            }
            Effect::RestartAndPrompt { message } => OutgoingResponse::Restart { content: message },
            Effect::RequestExternalSubmission { message } => {
                self.phase = FlowPhase::AwaitStatement;
                OutgoingResponse::RequestStatement { content: message }
            }
        };
        channel.respond(response).await?;
        Ok(())
    }

    /// Submit the completed draft with the statement attachment.
    ///
    /// On an external failure the machine stays where it is (it defines no
    /// rollback); this layer re-prompts for a fresh statement instead.
    async fn submit_application(
        &mut self,
        statement: Attachment,
        channel: &dyn Channel,
        client: &PortalClient,
    ) -> Result<()> {
        channel
            .respond(OutgoingResponse::Bot {
                content: "Submitting application and analyzing bank statement, please wait..."
                    .to_string(),
            })
            .await?;

        if let Err(e) = self.session.begin_submission() {
            warn!(error = %e, "Submission requested outside the statement step");
            return Ok(());
        }

        let payload = match self.session.draft().to_payload() {
            Ok(payload) => payload,
            Err(missing) => {
                // Unreachable through the dialogue; guard for direct misuse.
                warn!(error = %missing, "Draft incomplete at submission time");
                self.phase = FlowPhase::AwaitStatement;
                channel
                    .respond(OutgoingResponse::Error {
                        content: format!("Sorry, an error occurred during submission: {missing}"),
                    })
                    .await?;
                return Ok(());
            }
        };

        match client.submit_application(&payload, &statement).await {
            Ok(application) => {
                let decision = application
                    .preliminary_decision
                    .clone()
                    .unwrap_or_else(|| "N/A".to_string());
                channel
                    .respond(OutgoingResponse::Submitted {
                        content: format!(
                            "Application submitted (ID #{}). Initial AI assessment: {decision}.",
                            application.id
                        ),
                        application_id: application.id,
                        preliminary_decision: application.preliminary_decision.clone(),
                    })
                    .await?;
                channel
                    .respond(OutgoingResponse::RequestDocuments {
                        content: "Please upload your other documents for final verification."
                            .to_string(),
                        application_id: application.id,
                    })
                    .await?;
                self.phase = FlowPhase::AwaitAadhaar {
                    application_id: application.id,
                };
            }
            Err(e) => {
                warn!(error = %e, "Application submission failed");
                channel
                    .respond(OutgoingResponse::Error {
                        content: format!("Sorry, an error occurred during submission: {e}"),
                    })
                    .await?;
                channel
                    .respond(OutgoingResponse::RequestStatement {
                        content: "Please upload your bank statement PDF to try again.".to_string(),
                    })
                    .await?;
                self.phase = FlowPhase::AwaitStatement;
            }
        }
        Ok(())
    }

    /// Upload both verification documents, then start a fresh session.
    async fn upload_documents(
        &mut self,
        application_id: i64,
        aadhaar: Attachment,
        salary_slip: Attachment,
        channel: &dyn Channel,
        client: &PortalClient,
    ) -> Result<()> {
        match client
            .upload_documents(application_id, &aadhaar, &salary_slip)
            .await
        {
            Ok(()) => {
                channel
                    .respond(OutgoingResponse::DocumentsAccepted {
                        content: "Documents uploaded! Verification is in progress.".to_string(),
                    })
                    .await?;
                // The application is now fully in the portal's hands; start
                // over for the next intake.
                self.session = IntakeSession::new();
                self.phase = FlowPhase::Chat;
                channel
                    .respond(OutgoingResponse::Bot {
                        content: GREETING.to_string(),
                    })
                    .await?;
            }
            Err(e) => {
                warn!(error = %e, application_id, "Document upload failed");
                channel
                    .respond(OutgoingResponse::Error {
                        content: format!("Upload failed: {e}"),
                    })
                    .await?;
                channel
                    .respond(OutgoingResponse::RequestDocuments {
                        content: "Please upload your Aadhaar and salary slip again.".to_string(),
                        application_id,
                    })
                    .await?;
                self.phase = FlowPhase::AwaitAadhaar { application_id };
            }
        }
        Ok(())
    }
}

impl Default for IntakeFlow {
    fn default() -> Self {
        Self::new()
    }
}

// Note: the flow is exercised end-to-end by tests/ws_chat_integration.rs,
// which drives it over a real WebSocket channel. The machine's semantics are
// covered by the intake module's unit tests.
