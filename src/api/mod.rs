//! REST client for the credit-application portal backend.
//!
//! Everything "hard" — statement analysis, OCR matching, decisioning, report
//! generation — happens on the other side of these endpoints and is opaque
//! here. This client stores the bearer credential from login and forwards it
//! on every call.

pub mod types;

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tracing::info;

use crate::channels::Attachment;
use crate::error::ApiError;
use crate::intake::ApplicationPayload;

pub use types::{AdminDecision, CreditApplication, CreditApplicationWithOwner, Token, User};

/// Client for the portal REST backend.
pub struct PortalClient {
    base_url: String,
    http: reqwest::Client,
    /// Bearer token from the most recent login.
    token: RwLock<Option<SecretString>>,
}

impl PortalClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            token: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Where the portal serves the final report PDF for a decided application.
    pub fn report_url(&self, application_id: i64) -> String {
        self.url(&format!("/reports/report_app_{application_id}.pdf"))
    }

    /// Create an account.
    pub async fn register(&self, email: &str, password: &SecretString) -> Result<(), ApiError> {
        let endpoint = "/api/users/register";
        let body = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
        });
        let resp = self
            .http
            .post(self.url(endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failed(endpoint, e))?;
        check_status(endpoint, resp).await?;
        Ok(())
    }

    /// Log in and keep the issued bearer token for subsequent calls.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<User, ApiError> {
        let endpoint = "/api/users/token";
        let form = [
            ("username", email),
            ("password", password.expose_secret()),
        ];
        let resp = self
            .http
            .post(self.url(endpoint))
            .form(&form)
            .send()
            .await
            .map_err(|e| request_failed(endpoint, e))?;
        let resp = check_status(endpoint, resp).await?;

        let Token {
            access_token, user, ..
        } = resp
            .json()
            .await
            .map_err(|e| invalid_response(endpoint, e))?;
        info!(user = %user.email, "Logged in to portal");

        *self.token.write().await = Some(SecretString::from(access_token));
        Ok(user)
    }

    /// Submit the completed application together with the bank statement.
    ///
    /// The portal analyzes the statement and runs its preliminary decision
    /// synchronously; the returned record carries the result.
    pub async fn submit_application(
        &self,
        payload: &ApplicationPayload,
        statement: &Attachment,
    ) -> Result<CreditApplication, ApiError> {
        let endpoint = "/api/applications";
        let app_data = serde_json::to_string(payload).map_err(|e| ApiError::RequestFailed {
            endpoint: endpoint.to_string(),
            reason: format!("could not encode app_data: {e}"),
        })?;

        let form = Form::new().text("app_data", app_data).part(
            "bank_statement",
            Part::bytes(statement.bytes.clone()).file_name(statement.file_name.clone()),
        );

        let resp = self
            .authorized_post(endpoint)
            .await?
            .multipart(form)
            .send()
            .await
            .map_err(|e| request_failed(endpoint, e))?;
        let resp = check_status(endpoint, resp).await?;

        let application: CreditApplication = resp
            .json()
            .await
            .map_err(|e| invalid_response(endpoint, e))?;
        info!(
            application_id = application.id,
            decision = application.preliminary_decision.as_deref().unwrap_or("N/A"),
            "Application submitted"
        );
        Ok(application)
    }

    /// Upload the verification documents for a submitted application.
    pub async fn upload_documents(
        &self,
        application_id: i64,
        aadhaar: &Attachment,
        salary_slip: &Attachment,
    ) -> Result<(), ApiError> {
        let endpoint = format!("/api/applications/{application_id}/documents");

        let form = Form::new()
            .part(
                "aadhaar_file",
                Part::bytes(aadhaar.bytes.clone()).file_name(aadhaar.file_name.clone()),
            )
            .part(
                "salary_slip_file",
                Part::bytes(salary_slip.bytes.clone()).file_name(salary_slip.file_name.clone()),
            );

        let resp = self
            .authorized_post(&endpoint)
            .await?
            .multipart(form)
            .send()
            .await
            .map_err(|e| request_failed(&endpoint, e))?;
        check_status(&endpoint, resp).await?;
        info!(application_id, "Verification documents uploaded");
        Ok(())
    }

    /// List the logged-in applicant's applications.
    pub async fn my_applications(&self) -> Result<Vec<CreditApplication>, ApiError> {
        let endpoint = "/api/applications/me";
        let resp = self
            .authorized_get(endpoint)
            .await?
            .send()
            .await
            .map_err(|e| request_failed(endpoint, e))?;
        let resp = check_status(endpoint, resp).await?;
        resp.json().await.map_err(|e| invalid_response(endpoint, e))
    }

    /// List every application for admin review.
    pub async fn admin_applications(&self) -> Result<Vec<CreditApplicationWithOwner>, ApiError> {
        let endpoint = "/api/admin/applications";
        let resp = self
            .authorized_get(endpoint)
            .await?
            .send()
            .await
            .map_err(|e| request_failed(endpoint, e))?;
        let resp = check_status(endpoint, resp).await?;
        resp.json().await.map_err(|e| invalid_response(endpoint, e))
    }

    /// Record the admin's final decision on an application.
    pub async fn decide(
        &self,
        application_id: i64,
        decision: AdminDecision,
    ) -> Result<(), ApiError> {
        let endpoint = format!(
            "/api/admin/applications/{application_id}/{}",
            decision.as_path_segment()
        );
        let resp = self
            .authorized_post(&endpoint)
            .await?
            .send()
            .await
            .map_err(|e| request_failed(&endpoint, e))?;
        check_status(&endpoint, resp).await?;
        info!(application_id, decision = decision.as_path_segment(), "Admin decision recorded");
        Ok(())
    }

    async fn authorized_get(&self, endpoint: &str) -> Result<reqwest::RequestBuilder, ApiError> {
        let token = self.bearer(endpoint).await?;
        Ok(self.http.get(self.url(endpoint)).bearer_auth(token))
    }

    async fn authorized_post(&self, endpoint: &str) -> Result<reqwest::RequestBuilder, ApiError> {
        let token = self.bearer(endpoint).await?;
        Ok(self.http.post(self.url(endpoint)).bearer_auth(token))
    }

    async fn bearer(&self, endpoint: &str) -> Result<String, ApiError> {
        self.token
            .read()
            .await
            .as_ref()
            .map(|t| t.expose_secret().to_string())
            .ok_or_else(|| ApiError::NotAuthenticated {
                endpoint: endpoint.to_string(),
            })
    }
}

fn request_failed(endpoint: &str, e: reqwest::Error) -> ApiError {
    ApiError::RequestFailed {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    }
}

fn invalid_response(endpoint: &str, e: reqwest::Error) -> ApiError {
    ApiError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    }
}

/// Map non-2xx responses to `ApiError::Status`, pulling the portal's
/// `{"detail": ...}` body when it has one.
async fn check_status(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let detail = resp
        .json::<types::ErrorDetail>()
        .await
        .map(|e| e.detail)
        .unwrap_or_else(|_| "An unknown server error occurred.".to_string());
    Err(ApiError::Status {
        endpoint: endpoint.to_string(),
        status,
        detail,
    })
}
