//! Account management models for the admin dashboard.

use crate::reconcile::TrackedSnapshot;
use crate::session::Role;
use crate::session::model::lenient_role;
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
}

impl AccountStatus {
    pub fn toggled(self) -> Self {
        match self {
            AccountStatus::Active => AccountStatus::Inactive,
            AccountStatus::Inactive => AccountStatus::Active,
        }
    }
}

/// A user row in `GET /admin/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedUser {
    pub id: String,
    #[serde(rename = "userName", default)]
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Option<Role>,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub assigned_doctor_id: Option<String>,
}

impl ManagedUser {
    pub fn is_doctor(&self) -> bool {
        self.role == Some(Role::Doctor)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }
}

impl TrackedSnapshot for ManagedUser {
    // Rows carry no server timestamp; a pending toggle waits for its echo.
    type Version = ();
    type Mutation = AccountStatus;

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) {}

    fn reflects(&self, mutation: &AccountStatus) -> bool {
        self.status == *mutation
    }

    fn apply(&self, mutation: &AccountStatus) -> Self {
        Self {
            status: *mutation,
            ..self.clone()
        }
    }
}

/// Splits users into those an admin manages and the doctors available for assignment.
pub fn partition_users(users: &[ManagedUser]) -> (Vec<ManagedUser>, Vec<ManagedUser>) {
    let manageable = users.iter().filter(|u| !u.is_admin()).cloned().collect();
    let doctors = users.iter().filter(|u| u.is_doctor()).cloned().collect();
    (manageable, doctors)
}

/// Body of `POST /admin/assign-doctor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignDoctorRequest {
    pub patient_id: String,
    pub doctor_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentReceipt {
    #[serde(default)]
    pub doctor_name: Option<String>,
}
