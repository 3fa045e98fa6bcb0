//! Admin review console — list applications and record final decisions.
//!
//! The terminal rendition of the portal's admin table: each row shows the
//! owner, the model decisions, and the OCR match flags the backend computed
//! from the uploaded documents.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::api::{AdminDecision, CreditApplicationWithOwner, PortalClient};
use crate::error::Result;

pub async fn run(client: Arc<PortalClient>) -> Result<()> {
    print_table(&client).await?;
    println!("Commands: list, approve <id>, reject <id>, quit");

    let stdin = tokio::io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    eprint!("admin> ");
    while let Ok(Some(line)) = lines.next_line().await {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("list"), _) => print_table(&client).await?,
            (Some("quit"), _) | (Some("exit"), _) => break,
            (Some(cmd @ ("approve" | "reject")), Some(raw_id)) => {
                let decision = if cmd == "approve" {
                    AdminDecision::Approve
                } else {
                    AdminDecision::Reject
                };
                match raw_id.parse::<i64>() {
                    Ok(id) => match client.decide(id, decision).await {
                        Ok(()) => {
                            println!("Application #{id} has been {cmd}d.");
                            print_table(&client).await?;
                        }
                        Err(e) => {
                            warn!(error = %e, id, "Admin decision failed");
                            println!("Action failed: {e}");
                        }
                    },
                    Err(_) => println!("Not an application id: {raw_id}"),
                }
            }
            (Some(_), _) => println!("Commands: list, approve <id>, reject <id>, quit"),
            (None, _) => {}
        }
        eprint!("admin> ");
    }
    Ok(())
}

async fn print_table(client: &PortalClient) -> Result<()> {
    let apps = client.admin_applications().await?;
    if apps.is_empty() {
        println!("No applications to review.");
        return Ok(());
    }
    for app in &apps {
        println!("{}", format_row(app));
    }
    Ok(())
}

fn format_row(app: &CreditApplicationWithOwner) -> String {
    let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());
    let match_mark = |m: Option<bool>| match m {
        Some(true) => "✅",
        Some(false) => "❌",
        None => "N/A",
    };
    format!(
        "#{} {} [{}] — Prelim: {} / Verified: {} / Final: {} — Name: {} Income: {}",
        app.id,
        app.owner.email,
        app.status,
        or_na(&app.preliminary_decision),
        or_na(&app.verified_decision),
        or_na(&app.final_decision),
        match_mark(app.ocr_name_match),
        match_mark(app.ocr_income_match),
    )
}
