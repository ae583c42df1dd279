use crate::reconcile::TrackedSnapshot;
use crate::session::Role;
use crate::session::model::lenient_role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Editable profile fields, in form order.
pub const PROFILE_FIELDS: [&str; 9] = [
    "email",
    "phone",
    "age",
    "hometown",
    "insurance_id",
    "height",
    "weight",
    "gender",
    "nationality",
];

/// Accepts strings, numbers or null and yields text.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}

/// The signed-in user's profile as returned by `GET /users/me`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDetails {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "userName", default)]
    pub display_name: String,
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub age: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub hometown: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub insurance_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub height: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub weight: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub gender: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub nationality: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProfileDetails {
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "email" => &self.email,
            "phone" => &self.phone,
            "age" => &self.age,
            "hometown" => &self.hometown,
            "insurance_id" => &self.insurance_id,
            "height" => &self.height,
            "weight" => &self.weight,
            "gender" => &self.gender,
            "nationality" => &self.nationality,
            _ => return None,
        };
        Some(value.as_str())
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut String> {
        Some(match name {
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            "age" => &mut self.age,
            "hometown" => &mut self.hometown,
            "insurance_id" => &mut self.insurance_id,
            "height" => &mut self.height,
            "weight" => &mut self.weight,
            "gender" => &mut self.gender,
            "nationality" => &mut self.nationality,
            _ => return None,
        })
    }

    /// The full editable field set, as the profile form submits it.
    pub fn to_update(&self) -> ProfileUpdate {
        let mut update = ProfileUpdate::default();
        for name in PROFILE_FIELDS {
            if let Some(value) = self.field(name) {
                // Known field names always stage.
                let _ = update.set(name, value);
            }
        }
        update
    }
}

/// A staged set of profile field changes (`PUT /users/profile`).
///
/// Unset fields are left untouched by the server and by the local render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hometown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
}

impl ProfileUpdate {
    fn slot(&mut self, name: &str) -> Option<&mut Option<String>> {
        Some(match name {
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            "age" => &mut self.age,
            "hometown" => &mut self.hometown,
            "insurance_id" => &mut self.insurance_id,
            "height" => &mut self.height,
            "weight" => &mut self.weight,
            "gender" => &mut self.gender,
            "nationality" => &mut self.nationality,
            _ => return None,
        })
    }

    /// Stages one field. Fails for names outside [`PROFILE_FIELDS`].
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), String> {
        match self.slot(name) {
            Some(slot) => {
                *slot = Some(value.into());
                Ok(())
            }
            None => Err(format!("unknown profile field '{}'", name)),
        }
    }

    /// Staged `(name, value)` pairs.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        let values = [
            &self.email,
            &self.phone,
            &self.age,
            &self.hometown,
            &self.insurance_id,
            &self.height,
            &self.weight,
            &self.gender,
            &self.nationality,
        ];
        PROFILE_FIELDS
            .iter()
            .zip(values)
            .filter_map(|(name, value)| value.as_deref().map(|v| (*name, v)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }
}

impl TrackedSnapshot for ProfileDetails {
    type Version = Option<DateTime<Utc>>;
    type Mutation = ProfileUpdate;

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> Self::Version {
        self.updated_at
    }

    fn reflects(&self, update: &ProfileUpdate) -> bool {
        update
            .fields()
            .into_iter()
            .all(|(name, value)| self.field(name) == Some(value))
    }

    fn apply(&self, update: &ProfileUpdate) -> Self {
        let mut rendered = self.clone();
        for (name, value) in update.fields() {
            if let Some(slot) = rendered.field_mut(name) {
                *slot = value.to_string();
            }
        }
        rendered
    }

    // The profile endpoint may omit the id; only the display name is required.
    fn validate(&self) -> Result<(), String> {
        if self.display_name.is_empty() && self.id.is_empty() {
            return Err("profile has neither id nor userName".to_string());
        }
        Ok(())
    }
}
