//! Doctor's patient roster.

use crate::reconcile::TrackedSnapshot;
use crate::record::is_severe_text;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

/// AI status of a patient's latest scan.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ScanStatus {
    Pending,
    Completed,
    Failed,
    /// No scan yet.
    #[default]
    Na,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestScan {
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub ai_status: ScanStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: String,
    #[serde(rename = "userName", default)]
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub latest_scan: LatestScan,
}

/// A completed severe scan waiting for the doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingReview {
    pub record_id: String,
    pub patient_name: String,
    pub date: String,
    pub ai_result: String,
}

/// The roster as one tracked snapshot. It is read-only and never terminal,
/// so each snapshot simply replaces the last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRoster {
    #[serde(default)]
    pub patients: Vec<PatientSummary>,
}

impl PatientRoster {
    pub const ID: &'static str = "my-patients";

    pub fn pending_reviews(&self) -> Vec<PendingReview> {
        self.patients
            .iter()
            .filter(|p| {
                p.latest_scan.ai_status == ScanStatus::Completed
                    && is_severe_text(&p.latest_scan.result)
            })
            .map(|p| PendingReview {
                record_id: p.latest_scan.record_id.clone().unwrap_or_default(),
                patient_name: p.display_name.clone(),
                date: p.latest_scan.date.clone(),
                ai_result: p.latest_scan.result.clone(),
            })
            .collect()
    }
}

impl TrackedSnapshot for PatientRoster {
    type Version = ();
    type Mutation = Infallible;

    fn id(&self) -> &str {
        Self::ID
    }

    fn version(&self) {}

    fn reflects(&self, mutation: &Infallible) -> bool {
        match *mutation {}
    }

    fn apply(&self, mutation: &Infallible) -> Self {
        match *mutation {}
    }

    fn validate(&self) -> Result<(), String> {
        match self.patients.iter().position(|p| p.id.is_empty()) {
            Some(index) => Err(format!("patient #{} has no id", index)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> PatientRoster {
        serde_json::from_value(serde_json::json!({
            "patients": [
                {"id": "p1", "userName": "Lan", "latest_scan": {
                    "record_id": "r1", "date": "2025-01-02",
                    "result": "Nặng (Severe DR) (90%)", "ai_status": "COMPLETED"}},
                {"id": "p2", "userName": "Huy", "latest_scan": {
                    "record_id": "r2", "date": "2025-01-03",
                    "result": "Tăng sinh (PDR) (88%)", "ai_status": "PENDING"}},
                {"id": "p3", "userName": "Mai", "latest_scan": {
                    "record_id": "r3", "date": "2025-01-04",
                    "result": "Nhẹ (Mild) (80%)", "ai_status": "COMPLETED"}},
                {"id": "p4", "userName": "Tú"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_pending_reviews_are_completed_and_severe() {
        let reviews = roster().pending_reviews();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].record_id, "r1");
        assert_eq!(reviews[0].patient_name, "Lan");
    }

    #[test]
    fn test_missing_scan_defaults_to_na() {
        let roster = roster();
        assert_eq!(roster.patients[3].latest_scan.ai_status, ScanStatus::Na);
    }

    #[test]
    fn test_patient_without_id_is_malformed() {
        let mut roster = roster();
        roster.patients[1].id.clear();
        assert_eq!(roster.validate(), Err("patient #1 has no id".to_string()));
    }
}
