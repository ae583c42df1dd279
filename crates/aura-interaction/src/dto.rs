//! Wire formats of the AURA backend and their mapping onto domain types.
//!
//! The backend is loose about shapes: lists come bare or wrapped in an
//! object, timestamps may lack a zone, and a few fields have historical
//! aliases. Everything is normalized here so the domain types stay strict.

use aura_core::api::LoginOutcome;
use aura_core::chat::{ChatMessage, ConversationSummary};
use aura_core::error::{AuraError, Result};
use aura_core::session::{Profile, Role};
use aura_core::user::ProfileDetails;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Parses an RFC 3339 timestamp, or a zone-less one taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn required_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
}

/// `unread` is a flag on older servers and a count on newer ones.
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(flag)) => u32::from(flag),
        Some(Value::Number(n)) => n.as_u64().map(|n| n.min(u64::from(u32::MAX)) as u32).unwrap_or(0),
        _ => 0,
    })
}

/// Decodes a response body, mapping failures to `MalformedResponse`.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| AuraError::malformed(e.to_string()))
}

/// Decodes a list that may arrive bare or under `key`.
pub fn decode_list<T: DeserializeOwned>(body: &str, key: &str) -> Result<Vec<T>> {
    let value: Value = decode(body)?;
    let items = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => map
            .remove(key)
            .ok_or_else(|| AuraError::malformed(format!("missing '{}' list", key)))?,
        other => {
            return Err(AuraError::malformed(format!(
                "expected a list, got {}",
                kind_of(&other)
            )));
        }
    };
    serde_json::from_value(items).map_err(|e| AuraError::malformed(e.to_string()))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// `user_info` as returned by the login exchanges.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfoDto {
    #[serde(default, alias = "_id")]
    pub id: String,
    #[serde(rename = "userName", alias = "full_name", default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub role: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
}

impl From<UserInfoDto> for Profile {
    fn from(dto: UserInfoDto) -> Self {
        let role = dto.role.as_ref().and_then(Value::as_str).and_then(Role::from_raw);
        Profile {
            id: dto.id,
            display_name: dto.user_name.unwrap_or_default(),
            role,
            status: dto.status,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponseDto {
    pub access_token: String,
    #[serde(default)]
    pub user_info: Option<UserInfoDto>,
    #[serde(default)]
    pub is_new_user: bool,
}

impl TryFrom<LoginResponseDto> for LoginOutcome {
    type Error = AuraError;

    fn try_from(dto: LoginResponseDto) -> Result<Self> {
        if dto.access_token.trim().is_empty() {
            return Err(AuraError::malformed("login response without access_token"));
        }
        let profile = dto
            .user_info
            .map(Profile::from)
            .unwrap_or_else(|| Profile::new("", "", None));
        Ok(LoginOutcome {
            token: dto.access_token,
            profile,
            is_new_user: dto.is_new_user,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct GoogleLoginRequest<'a> {
    pub credential: &'a str,
}

#[derive(Debug, Serialize)]
pub struct FacebookLoginRequest<'a> {
    pub access_token: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SetUsernameRequest<'a> {
    pub new_username: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SetUsernameResponse {
    pub new_access_token: String,
}

/// `GET /users/me` wraps the profile in `user_info`; some deployments don't.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProfileEnvelope {
    Wrapped { user_info: ProfileDetails },
    Bare(ProfileDetails),
}

impl ProfileEnvelope {
    pub fn into_details(self) -> ProfileDetails {
        match self {
            ProfileEnvelope::Wrapped { user_info } => user_info,
            ProfileEnvelope::Bare(details) => details,
        }
    }
}

/// Profile echoed by `PUT /users/profile`, if the body carries one.
pub fn decode_profile_echo(body: &str) -> Result<Option<ProfileDetails>> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = decode(body)?;
    let candidate = match value.get("user_info") {
        Some(inner) => inner.clone(),
        None => value,
    };
    let looks_like_profile = candidate
        .as_object()
        .is_some_and(|map| map.contains_key("userName") || map.contains_key("id"));
    if !looks_like_profile {
        return Ok(None);
    }
    serde_json::from_value(candidate)
        .map(Some)
        .map_err(|e| AuraError::malformed(e.to_string()))
}

/// One inbox row.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationDto {
    #[serde(alias = "id")]
    pub partner_id: String,
    #[serde(default, alias = "sender", alias = "userName")]
    pub partner_name: String,
    #[serde(default, alias = "preview")]
    pub last_message: String,
    #[serde(default, alias = "time", deserialize_with = "lenient_timestamp")]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub unread: u32,
}

impl From<ConversationDto> for ConversationSummary {
    fn from(dto: ConversationDto) -> Self {
        ConversationSummary {
            partner_id: dto.partner_id,
            partner_name: dto.partner_name,
            last_message: dto.last_message,
            last_message_at: dto.last_message_at,
            unread: dto.unread,
        }
    }
}

/// One message of `GET /chat/history/{partner}`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDto {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub is_me: Option<bool>,
    pub content: String,
    #[serde(deserialize_with = "required_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl MessageDto {
    /// Converts to a domain message in the thread with `partner_id`.
    ///
    /// Without an explicit `is_me`, anything not sent by the partner is ours.
    pub fn into_message(self, partner_id: &str) -> ChatMessage {
        let mine = self
            .is_me
            .unwrap_or_else(|| self.sender_id.as_deref() != Some(partner_id));
        ChatMessage::from_server(self.id, mine, self.content, self.timestamp)
    }
}

/// Raw `SendReceipt` body, which may name the id `id` or `message_id`.
#[derive(Debug, Default, Deserialize)]
pub struct SendReceiptDto {
    #[serde(default, alias = "id", alias = "_id")]
    pub message_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}
