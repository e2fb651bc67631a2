// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
}

/// Appointment status as stored in the database. `No Show` carries a space
/// in its stored form, hence the serde rename.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    #[serde(rename = "No Show")]
    NoShow,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "Scheduled"),
            AppointmentStatus::Completed => write!(f, "Completed"),
            AppointmentStatus::Cancelled => write!(f, "Cancelled"),
            AppointmentStatus::NoShow => write!(f, "No Show"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Scheduled" => Ok(AppointmentStatus::Scheduled),
            "Completed" => Ok(AppointmentStatus::Completed),
            "Cancelled" => Ok(AppointmentStatus::Cancelled),
            "No Show" => Ok(AppointmentStatus::NoShow),
            other => Err(AppointmentError::InvalidStatus(other.to_string())),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: Option<String>,
    pub speciality: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: Option<String>,
}

/// The status arrives as a free string so unknown values map to a 400
/// instead of a deserialization rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// ==============================================================================
// VIEW MODELS (gateway rows with embedded joins)
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorBrief {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientBrief {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientCalendarEntry {
    pub id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub doctor_id: i64,
    pub doctor: Option<DoctorBrief>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorCalendarEntry {
    pub id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub patient_id: i64,
    pub patient: Option<PatientBrief>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugBrief {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionSummary {
    pub id: i64,
    pub drug_id: i64,
    pub drug: Option<DrugBrief>,
    pub dosage: Option<String>,
    pub instructions: Option<String>,
    pub date_issued: NaiveDate,
    pub follow_up_date: Option<NaiveDate>,
    pub appointment_id: Option<i64>,
}

/// A completed appointment together with the prescriptions written for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedAppointment {
    pub id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub patient_id: i64,
    pub doctor_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<DoctorBrief>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientBrief>,
    #[serde(default)]
    pub prescriptions: Vec<PrescriptionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSlotBrief {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub appointment_id: i64,
    pub patient_id: i64,
    pub old_status: Option<String>,
    pub new_status: String,
    pub changed_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub patient: Option<PatientBrief>,
    pub appointment: Option<AppointmentSlotBrief>,
}

// ==============================================================================
// SERVICE RESULT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub appointment_id: i64,
    pub old_status: AppointmentStatus,
    pub new_status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepOutcome {
    pub updated_count: usize,
    pub appointment_ids: Vec<i64>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("This time slot is already booked. Please choose another time.")]
    SlotTaken,

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Cannot transition appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<shared_database::DbError> for AppointmentError {
    fn from(err: shared_database::DbError) -> Self {
        match err {
            shared_database::DbError::Conflict(_) => AppointmentError::SlotTaken,
            shared_database::DbError::NotFound(_) => AppointmentError::NotFound,
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}
