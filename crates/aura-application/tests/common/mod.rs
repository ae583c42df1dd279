//! In-memory backend and session fixtures shared by the controller tests.

#![allow(dead_code)]

use async_trait::async_trait;
use aura_application::AppContext;
use aura_core::admin::{AccountStatus, AssignDoctorRequest, AssignmentReceipt, ManagedUser};
use aura_core::api::{AuraApi, Credentials, LoginOutcome, RegisterRequest};
use aura_core::chat::{ChatMessage, ConversationSummary, SendMessageRequest, SendReceipt};
use aura_core::config::ClientConfig;
use aura_core::error::{AuraError, Result};
use aura_core::record::MedicalRecord;
use aura_core::roster::PatientRoster;
use aura_core::session::{Profile, Role, SessionStore, TieredSessionStore};
use aura_core::user::{ProfileDetails, ProfileUpdate};
use aura_infrastructure::storage::MemoryKeyValueStore;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const TOKEN: &str = "tok";

/// Backend state. Authenticated calls fail with `SessionExpired` unless
/// they present `valid_token`.
pub struct FakeState {
    pub valid_token: String,
    pub calls: HashMap<&'static str, usize>,
    pub login: Option<LoginOutcome>,
    pub rotated_token: String,
    pub registered: Vec<RegisterRequest>,
    pub records: Vec<MedicalRecord>,
    /// Consumed by `get_record` before falling back to `records`.
    pub record_script: VecDeque<Result<MedicalRecord>>,
    pub chats: Vec<ConversationSummary>,
    pub history: Vec<ChatMessage>,
    pub sent: Vec<SendMessageRequest>,
    pub send_error: Option<AuraError>,
    pub users: Vec<ManagedUser>,
    pub users_error: Option<AuraError>,
    pub status_error: Option<AuraError>,
    pub roster: PatientRoster,
    pub profile: ProfileDetails,
    pub profile_error: Option<AuraError>,
    /// When false, `update_profile` answers without an echo and leaves
    /// `profile` untouched, like a lagging replica.
    pub profile_echo: bool,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            valid_token: TOKEN.to_string(),
            calls: HashMap::new(),
            login: None,
            rotated_token: "rotated".to_string(),
            registered: Vec::new(),
            records: Vec::new(),
            record_script: VecDeque::new(),
            chats: Vec::new(),
            history: Vec::new(),
            sent: Vec::new(),
            send_error: None,
            users: Vec::new(),
            users_error: None,
            status_error: None,
            roster: PatientRoster::default(),
            profile: ProfileDetails::default(),
            profile_error: None,
            profile_echo: true,
        }
    }
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.with(|s| s.calls.get(endpoint).copied().unwrap_or(0))
    }

    fn call(&self, endpoint: &'static str) -> std::sync::MutexGuard<'_, FakeState> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(endpoint).or_default() += 1;
        state
    }

    fn authed(&self, endpoint: &'static str, token: &str) -> Result<std::sync::MutexGuard<'_, FakeState>> {
        let state = self.call(endpoint);
        if token != state.valid_token {
            return Err(AuraError::SessionExpired);
        }
        Ok(state)
    }
}

#[async_trait]
impl AuraApi for FakeApi {
    async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome> {
        let state = self.call("login");
        if credentials.password != "secret" {
            return Err(AuraError::validation("Sai tên đăng nhập hoặc mật khẩu"));
        }
        state
            .login
            .clone()
            .ok_or_else(|| AuraError::internal("no login scripted"))
    }

    async fn register(&self, request: &RegisterRequest) -> Result<()> {
        let mut state = self.call("register");
        if state.registered.iter().any(|r| r.username == request.username) {
            return Err(AuraError::validation("Tên đăng nhập đã tồn tại"));
        }
        state.registered.push(request.clone());
        Ok(())
    }

    async fn google_login(&self, _credential: &str) -> Result<LoginOutcome> {
        let state = self.call("google_login");
        state
            .login
            .clone()
            .ok_or_else(|| AuraError::internal("no login scripted"))
    }

    async fn facebook_login(&self, _access_token: &str) -> Result<LoginOutcome> {
        let state = self.call("facebook_login");
        state
            .login
            .clone()
            .ok_or_else(|| AuraError::internal("no login scripted"))
    }

    async fn set_username(&self, token: &str, new_username: &str) -> Result<String> {
        let mut state = self.authed("set_username", token)?;
        state.profile.display_name = new_username.to_string();
        let rotated = state.rotated_token.clone();
        state.valid_token = rotated.clone();
        Ok(rotated)
    }

    async fn me(&self, token: &str) -> Result<ProfileDetails> {
        let state = self.authed("me", token)?;
        Ok(state.profile.clone())
    }

    async fn update_profile(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<ProfileDetails>> {
        let mut state = self.authed("update_profile", token)?;
        if let Some(err) = state.profile_error.clone() {
            return Err(err);
        }
        if !state.profile_echo {
            return Ok(None);
        }
        apply_update(&mut state.profile, update);
        state.profile.updated_at = Some(Utc::now());
        Ok(Some(state.profile.clone()))
    }

    async fn list_records(&self, token: &str) -> Result<Vec<MedicalRecord>> {
        let state = self.authed("list_records", token)?;
        Ok(state.records.clone())
    }

    async fn get_record(&self, token: &str, record_id: &str) -> Result<MedicalRecord> {
        let mut state = self.authed("get_record", token)?;
        if let Some(scripted) = state.record_script.pop_front() {
            return scripted;
        }
        state
            .records
            .iter()
            .find(|r| r.id == record_id)
            .cloned()
            .ok_or_else(|| AuraError::validation("Không tìm thấy hồ sơ"))
    }

    async fn list_chats(&self, token: &str) -> Result<Vec<ConversationSummary>> {
        let state = self.authed("list_chats", token)?;
        Ok(state.chats.clone())
    }

    async fn chat_history(&self, token: &str, _partner_id: &str) -> Result<Vec<ChatMessage>> {
        let state = self.authed("chat_history", token)?;
        Ok(state.history.clone())
    }

    async fn send_message(&self, token: &str, message: &SendMessageRequest) -> Result<SendReceipt> {
        let mut state = self.authed("send_message", token)?;
        if let Some(err) = state.send_error.clone() {
            return Err(err);
        }
        state.sent.push(message.clone());
        Ok(SendReceipt::default())
    }

    async fn admin_users(&self, token: &str) -> Result<Vec<ManagedUser>> {
        let state = self.authed("admin_users", token)?;
        if let Some(err) = state.users_error.clone() {
            return Err(err);
        }
        Ok(state.users.clone())
    }

    async fn assign_doctor(
        &self,
        token: &str,
        request: &AssignDoctorRequest,
    ) -> Result<AssignmentReceipt> {
        let mut state = self.authed("assign_doctor", token)?;
        let doctor_name = state
            .users
            .iter()
            .find(|u| u.id == request.doctor_id)
            .map(|u| u.display_name.clone());
        if let Some(patient) = state.users.iter_mut().find(|u| u.id == request.patient_id) {
            patient.assigned_doctor_id = Some(request.doctor_id.clone());
        }
        Ok(AssignmentReceipt { doctor_name })
    }

    async fn set_user_status(
        &self,
        token: &str,
        user_id: &str,
        status: AccountStatus,
    ) -> Result<()> {
        let mut state = self.authed("set_user_status", token)?;
        if let Some(err) = state.status_error.clone() {
            return Err(err);
        }
        if let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) {
            user.status = status;
        }
        Ok(())
    }

    async fn my_patients(&self, token: &str) -> Result<PatientRoster> {
        let state = self.authed("my_patients", token)?;
        Ok(state.roster.clone())
    }
}

fn apply_update(profile: &mut ProfileDetails, update: &ProfileUpdate) {
    if let Some(v) = &update.email {
        profile.email = v.clone();
    }
    if let Some(v) = &update.phone {
        profile.phone = v.clone();
    }
    if let Some(v) = &update.age {
        profile.age = v.clone();
    }
    if let Some(v) = &update.hometown {
        profile.hometown = v.clone();
    }
    if let Some(v) = &update.insurance_id {
        profile.insurance_id = v.clone();
    }
    if let Some(v) = &update.height {
        profile.height = v.clone();
    }
    if let Some(v) = &update.weight {
        profile.weight = v.clone();
    }
    if let Some(v) = &update.gender {
        profile.gender = v.clone();
    }
    if let Some(v) = &update.nationality {
        profile.nationality = v.clone();
    }
}

pub fn store() -> Arc<dyn SessionStore> {
    Arc::new(TieredSessionStore::new(
        Arc::new(MemoryKeyValueStore::new()),
        Arc::new(MemoryKeyValueStore::new()),
    ))
}

pub fn context(api: Arc<FakeApi>) -> Arc<AppContext> {
    Arc::new(AppContext::new(api, store(), ClientConfig::default()))
}

/// A context whose store already holds a session with `role`.
pub fn signed_in(api: Arc<FakeApi>, role: Option<Role>) -> Arc<AppContext> {
    let ctx = context(api);
    ctx.store()
        .set_session(TOKEN, &Profile::new("u1", "Lan", role), true)
        .unwrap();
    ctx
}

pub fn record(id: &str, status: &str, result: Option<&str>) -> MedicalRecord {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "status": status,
        "result": result,
        "date": "01/03/2025",
        "time": "08:30",
        "image_url": format!("/uploads/{id}.png"),
        "annotated_image_url": format!("/uploads/{id}_annotated.png"),
    }))
    .unwrap()
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    Utc::now() - Duration::hours(hours)
}

pub fn conversation(partner: &str, last: &str, at: DateTime<Utc>) -> ConversationSummary {
    ConversationSummary {
        partner_id: partner.to_string(),
        partner_name: format!("Dr. {partner}"),
        last_message: last.to_string(),
        last_message_at: Some(at),
        unread: 0,
    }
}

pub fn managed_user(id: &str, name: &str, role: &str, status: &str) -> ManagedUser {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "userName": name,
        "role": role,
        "status": status,
    }))
    .unwrap()
}
