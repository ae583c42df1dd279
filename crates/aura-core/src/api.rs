//! Backend API contract.
//!
//! Defines the interface the client uses to reach the REST backend. The
//! HTTP implementation lives in `aura-interaction`; tests substitute fakes.

use crate::admin::{AccountStatus, AssignDoctorRequest, AssignmentReceipt, ManagedUser};
use crate::chat::{ChatMessage, ConversationSummary, SendMessageRequest, SendReceipt};
use crate::error::Result;
use crate::record::MedicalRecord;
use crate::roster::PatientRoster;
use crate::session::Profile;
use crate::user::{ProfileDetails, ProfileUpdate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Username/password credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "userName")]
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Body of `POST /register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(rename = "userName")]
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Result of any login exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub token: String,
    pub profile: Profile,
    /// First social login; the user still has to pick a username.
    pub is_new_user: bool,
}

/// An abstract client for the AURA backend.
///
/// Every authenticated method takes the bearer token explicitly; the
/// implementation holds no session state of its own.
///
/// # Errors
///
/// Implementations map failures onto [`crate::AuraError`]:
/// - 401 → `SessionExpired`
/// - 403 → `Forbidden`
/// - other 4xx → `Validation` carrying the server's detail text
/// - 5xx → `Server`
/// - transport failures and timeouts → `Connectivity`
/// - undecodable bodies → `MalformedResponse`
#[async_trait]
pub trait AuraApi: Send + Sync {
    /// Exchanges username and password for a session (`POST /login`).
    async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome>;

    /// Creates an account (`POST /register`). No session is returned.
    async fn register(&self, request: &RegisterRequest) -> Result<()>;

    /// Exchanges a Google ID credential for a session.
    async fn google_login(&self, credential: &str) -> Result<LoginOutcome>;

    /// Exchanges a Facebook access token for a session.
    async fn facebook_login(&self, access_token: &str) -> Result<LoginOutcome>;

    /// Sets the username of the current account.
    ///
    /// # Returns
    ///
    /// The rotated access token; the old one must no longer be used.
    async fn set_username(&self, token: &str, new_username: &str) -> Result<String>;

    /// Current user's profile (`GET /users/me`).
    async fn me(&self, token: &str) -> Result<ProfileDetails>;

    /// Submits profile changes (`PUT /users/profile`).
    ///
    /// # Returns
    ///
    /// - `Ok(Some(details))`: the server echoed the updated profile
    /// - `Ok(None)`: accepted without a body to reconcile
    async fn update_profile(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<ProfileDetails>>;

    /// Analysis history of the current user.
    async fn list_records(&self, token: &str) -> Result<Vec<MedicalRecord>>;

    async fn get_record(&self, token: &str, record_id: &str) -> Result<MedicalRecord>;

    /// Inbox: one summary per conversation partner.
    async fn list_chats(&self, token: &str) -> Result<Vec<ConversationSummary>>;

    /// Full message history with one partner.
    async fn chat_history(&self, token: &str, partner_id: &str) -> Result<Vec<ChatMessage>>;

    async fn send_message(&self, token: &str, message: &SendMessageRequest)
    -> Result<SendReceipt>;

    /// All accounts (admin only).
    async fn admin_users(&self, token: &str) -> Result<Vec<ManagedUser>>;

    async fn assign_doctor(
        &self,
        token: &str,
        request: &AssignDoctorRequest,
    ) -> Result<AssignmentReceipt>;

    async fn set_user_status(&self, token: &str, user_id: &str, status: AccountStatus)
    -> Result<()>;

    /// Patients assigned to the current doctor.
    async fn my_patients(&self, token: &str) -> Result<PatientRoster>;
}
