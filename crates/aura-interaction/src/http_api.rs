//! HttpAuraApi - `reqwest` implementation of [`AuraApi`].
//!
//! JSON over HTTP against `ClientConfig::api_base_url`, with the bearer token
//! in the `Authorization` header and a per-request timeout. Response bodies
//! are read as text first so failures can be classified from the server's
//! detail message.

use crate::classify::{classify_failure, classify_transport};
use crate::dto::{
    ConversationDto, FacebookLoginRequest, GoogleLoginRequest, LoginResponseDto, MessageDto,
    ProfileEnvelope, SendReceiptDto, SetUsernameRequest, SetUsernameResponse, decode,
    decode_list, decode_profile_echo,
};
use async_trait::async_trait;
use aura_core::admin::{AccountStatus, AssignDoctorRequest, AssignmentReceipt, ManagedUser};
use aura_core::api::{AuraApi, Credentials, LoginOutcome, RegisterRequest};
use aura_core::chat::{ChatMessage, ConversationSummary, SendMessageRequest, SendReceipt};
use aura_core::config::ClientConfig;
use aura_core::error::{AuraError, Result};
use aura_core::record::MedicalRecord;
use aura_core::roster::PatientRoster;
use aura_core::user::{ProfileDetails, ProfileUpdate};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use std::time::Duration;

/// REST client for the AURA backend.
#[derive(Clone)]
pub struct HttpAuraApi {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpAuraApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| AuraError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .timeout(self.timeout)
    }

    /// Makes an authenticated request to the backend.
    fn auth_request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.request(method, path)
            .header("Authorization", format!("Bearer {}", token))
    }

    /// Sends the request and returns the body of a 2xx response.
    async fn execute(&self, request: RequestBuilder) -> Result<String> {
        let response = request.send().await.map_err(|e| {
            let err = classify_transport(&e);
            tracing::debug!("[HttpAuraApi] transport failure: {}", err);
            err
        })?;

        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.text().await.map_err(|e| classify_transport(&e))?;

        if status.is_success() {
            tracing::debug!("[HttpAuraApi] {} -> {}", url, status.as_u16());
            return Ok(body);
        }

        let err = classify_failure(status.as_u16(), status.canonical_reason(), &body);
        if err.is_auth() {
            tracing::info!("[HttpAuraApi] {} rejected the session", url);
        } else {
            tracing::warn!("[HttpAuraApi] {} failed: {}", url, err);
        }
        Err(err)
    }

    async fn post_login<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<LoginOutcome> {
        let text = self.execute(self.request(Method::POST, path).json(body)).await?;
        let dto: LoginResponseDto = decode(&text)?;
        LoginOutcome::try_from(dto)
    }
}

#[async_trait]
impl AuraApi for HttpAuraApi {
    async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome> {
        self.post_login("login", credentials).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<()> {
        // The success body is a bare message; nothing to decode.
        self.execute(self.request(Method::POST, "register").json(request))
            .await
            .map(|_| ())
    }

    async fn google_login(&self, credential: &str) -> Result<LoginOutcome> {
        self.post_login("google-login", &GoogleLoginRequest { credential })
            .await
    }

    async fn facebook_login(&self, access_token: &str) -> Result<LoginOutcome> {
        self.post_login("facebook-login", &FacebookLoginRequest { access_token })
            .await
    }

    async fn set_username(&self, token: &str, new_username: &str) -> Result<String> {
        let request = self
            .auth_request(Method::PUT, "users/set-username", token)
            .json(&SetUsernameRequest { new_username });
        let response: SetUsernameResponse = decode(&self.execute(request).await?)?;
        if response.new_access_token.trim().is_empty() {
            return Err(AuraError::malformed("empty new_access_token"));
        }
        Ok(response.new_access_token)
    }

    async fn me(&self, token: &str) -> Result<ProfileDetails> {
        let body = self
            .execute(self.auth_request(Method::GET, "users/me", token))
            .await?;
        let envelope: ProfileEnvelope = decode(&body)?;
        Ok(envelope.into_details())
    }

    async fn update_profile(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<ProfileDetails>> {
        let request = self
            .auth_request(Method::PUT, "users/profile", token)
            .json(update);
        decode_profile_echo(&self.execute(request).await?)
    }

    async fn list_records(&self, token: &str) -> Result<Vec<MedicalRecord>> {
        let body = self
            .execute(self.auth_request(Method::GET, "medical-records", token))
            .await?;
        decode_list(&body, "records")
    }

    async fn get_record(&self, token: &str, record_id: &str) -> Result<MedicalRecord> {
        let path = format!("medical-records/{}", record_id);
        decode(&self.execute(self.auth_request(Method::GET, &path, token)).await?)
    }

    async fn list_chats(&self, token: &str) -> Result<Vec<ConversationSummary>> {
        let body = self
            .execute(self.auth_request(Method::GET, "chats", token))
            .await?;
        let rows: Vec<ConversationDto> = decode_list(&body, "chats")?;
        Ok(rows.into_iter().map(ConversationSummary::from).collect())
    }

    async fn chat_history(&self, token: &str, partner_id: &str) -> Result<Vec<ChatMessage>> {
        let path = format!("chat/history/{}", partner_id);
        let body = self
            .execute(self.auth_request(Method::GET, &path, token))
            .await?;
        let rows: Vec<MessageDto> = decode_list(&body, "messages")?;
        Ok(rows
            .into_iter()
            .map(|dto| dto.into_message(partner_id))
            .collect())
    }

    async fn send_message(
        &self,
        token: &str,
        message: &SendMessageRequest,
    ) -> Result<SendReceipt> {
        let request = self
            .auth_request(Method::POST, "chat/send", token)
            .json(message);
        let body = self.execute(request).await?;
        // Any 2xx counts as delivered, even without a usable receipt.
        let dto: SendReceiptDto = serde_json::from_str(&body).unwrap_or_default();
        Ok(SendReceipt {
            message_id: dto.message_id,
            timestamp: dto.timestamp,
        })
    }

    async fn admin_users(&self, token: &str) -> Result<Vec<ManagedUser>> {
        let body = self
            .execute(self.auth_request(Method::GET, "admin/users", token))
            .await?;
        decode_list(&body, "users")
    }

    async fn assign_doctor(
        &self,
        token: &str,
        request: &AssignDoctorRequest,
    ) -> Result<AssignmentReceipt> {
        let body = self
            .execute(
                self.auth_request(Method::POST, "admin/assign-doctor", token)
                    .json(request),
            )
            .await?;
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    async fn set_user_status(
        &self,
        token: &str,
        user_id: &str,
        status: AccountStatus,
    ) -> Result<()> {
        let path = format!("admin/users/{}/status", user_id);
        let request = self
            .auth_request(Method::PUT, &path, token)
            .query(&[("status", status.as_ref())]);
        self.execute(request).await.map(|_| ())
    }

    async fn my_patients(&self, token: &str) -> Result<PatientRoster> {
        let body = self
            .execute(self.auth_request(Method::GET, "doctor/my-patients", token))
            .await?;
        let patients = decode_list(&body, "patients")?;
        Ok(PatientRoster { patients })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let config = ClientConfig {
            api_base_url: "http://localhost:8000/api/".to_string(),
            ..Default::default()
        };
        let api = HttpAuraApi::new(&config).unwrap();
        assert_eq!(api.base_url(), "http://localhost:8000/api");
        assert_eq!(api.url("/users/me"), "http://localhost:8000/api/users/me");
        assert_eq!(api.url("chats"), "http://localhost:8000/api/chats");
    }
}
