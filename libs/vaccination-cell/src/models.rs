// libs/vaccination-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A saved snapshot of one vaccine eligibility check. The recommendation
/// lists arrive precomputed; this cell only logs them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveVaccineCheckRequest {
    pub patient_id: Option<i64>,
    pub age: i32,
    pub gender: String,
    #[serde(default)]
    pub received_vaccines: Vec<String>,
    #[serde(default)]
    pub mandatory_vaccines: Vec<String>,
    #[serde(default)]
    pub optional_vaccines: Vec<String>,
}

/// Stored rows arrive snake_case from the gateway but serialize camelCase
/// toward clients, hence the aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccineCheckLog {
    #[serde(rename = "logId", alias = "id")]
    pub id: i64,
    #[serde(alias = "patient_id")]
    pub patient_id: Option<i64>,
    pub age: i32,
    pub gender: String,
    #[serde(alias = "received_vaccines")]
    pub received_vaccines: Vec<String>,
    #[serde(alias = "mandatory_vaccines")]
    pub mandatory_vaccines: Vec<String>,
    #[serde(alias = "optional_vaccines")]
    pub optional_vaccines: Vec<String>,
    #[serde(alias = "checked_at")]
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum VaccineError {
    #[error("Valid age is required (0-150)")]
    InvalidAge,

    #[error("Valid gender is required")]
    InvalidGender,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<shared_database::DbError> for VaccineError {
    fn from(err: shared_database::DbError) -> Self {
        VaccineError::DatabaseError(err.to_string())
    }
}
