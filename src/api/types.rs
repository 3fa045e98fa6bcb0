//! Wire models for the portal REST backend.

use serde::{Deserialize, Serialize};

/// Authenticated account as the portal reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub is_admin: bool,
}

/// Bearer credential issued by the portal on login.
///
/// The token itself is opaque to this client — it is stored and forwarded,
/// never inspected. `PortalClient` moves it into a `SecretString` right after
/// decoding.
#[derive(Debug, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    pub user: User,
}

/// An application as the applicant sees it.
#[derive(Debug, Clone, Deserialize)]
pub struct CreditApplication {
    pub id: i64,
    pub status: String,
    #[serde(default)]
    pub preliminary_decision: Option<String>,
    #[serde(default)]
    pub final_decision: Option<String>,
}

impl CreditApplication {
    /// Whether a final report PDF exists for this application.
    pub fn is_decided(&self) -> bool {
        matches!(self.status.as_str(), "approved" | "rejected")
    }
}

/// An application as the admin review table sees it.
#[derive(Debug, Clone, Deserialize)]
pub struct CreditApplicationWithOwner {
    pub id: i64,
    pub owner: User,
    pub status: String,
    #[serde(default)]
    pub aadhaar_path: Option<String>,
    #[serde(default)]
    pub salary_slip_path: Option<String>,
    #[serde(default)]
    pub preliminary_decision: Option<String>,
    #[serde(default)]
    pub verified_decision: Option<String>,
    #[serde(default)]
    pub final_decision: Option<String>,
    #[serde(default)]
    pub ocr_name_match: Option<bool>,
    #[serde(default)]
    pub ocr_income_match: Option<bool>,
}

/// Admin decision on a reviewed application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminDecision {
    Approve,
    Reject,
}

impl AdminDecision {
    pub fn as_path_segment(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

/// Error body the portal returns on failures.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub detail: String,
}
