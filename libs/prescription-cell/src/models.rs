// libs/prescription-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ==============================================================================
// CORE PRESCRIPTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_id: Option<i64>,
    pub drug_id: i64,
    pub dosage: Option<String>,
    pub instructions: Option<String>,
    pub date_issued: NaiveDate,
    pub follow_up_date: Option<NaiveDate>,
}

/// Either `appointment_id` (patient/doctor resolved from the appointment) or
/// both `doctor_id` and `patient_id` must be supplied. The drug is referenced
/// by id or resolved by exact name lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrescriptionRequest {
    pub appointment_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub drug_id: Option<i64>,
    pub drug_name: Option<String>,
    pub dosage: Option<String>,
    pub instructions: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

// ==============================================================================
// VIEW MODELS (gateway rows with embedded joins)
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugInfo {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rx_otc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescribingDoctor {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedAppointment {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: Option<String>,
}

/// A prescription row joined with its drug, doctor and appointment context,
/// as returned by the patient-facing list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientPrescription {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_id: Option<i64>,
    pub drug_id: i64,
    pub dosage: Option<String>,
    pub instructions: Option<String>,
    pub date_issued: NaiveDate,
    pub follow_up_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drug: Option<DrugInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<PrescribingDoctor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment: Option<LinkedAppointment>,
}

// ==============================================================================
// TREND MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendPeriod {
    Weekly,
    Monthly,
}

impl TrendPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendPeriod::Weekly => "weekly",
            TrendPeriod::Monthly => "monthly",
        }
    }
}

impl FromStr for TrendPeriod {
    type Err = PrescriptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(TrendPeriod::Weekly),
            "monthly" => Ok(TrendPeriod::Monthly),
            _ => Err(PrescriptionError::InvalidPeriod),
        }
    }
}

/// The minimal projection the trend aggregation reads from the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendRow {
    pub date_issued: NaiveDate,
    pub drug_id: i64,
    pub doctor_id: i64,
    #[serde(default)]
    pub drug: Option<DrugInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    SlightlyIncreasing,
    SlightlyDecreasing,
}

/// One bucket of the trend series, keyed by week or month.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub period: String,
    pub total_prescriptions: usize,
    pub unique_drugs: usize,
    pub unique_doctors: usize,
    pub drug_names: String,
    pub prescription_drugs: usize,
    pub over_the_counter_drugs: usize,
    pub trend: TrendDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    pub total_periods: usize,
    pub total_prescriptions: usize,
    pub average_per_period: f64,
    pub max_prescriptions: usize,
    pub min_prescriptions: usize,
}

// ==============================================================================
// SERVICE RESULT MODELS
// ==============================================================================

/// A freshly created prescription plus the informational statistics the
/// response carries alongside it.
#[derive(Debug, Clone)]
pub struct CreatedPrescription {
    pub prescription: Prescription,
    pub drug_name: Option<String>,
    pub total_for_patient: usize,
    pub same_drug_count: usize,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum PrescriptionError {
    #[error("Appointment not found.")]
    AppointmentNotFound,

    #[error("{0}")]
    AppointmentMismatch(String),

    #[error("Cannot create prescription for appointment with status: {0}")]
    AppointmentNotPrescribable(String),

    #[error("Drug not found with name: {0}")]
    DrugNotFoundByName(String),

    #[error("Drug not found. Please provide a valid DrugID.")]
    DrugNotFound,

    #[error("Invalid period. Only 'weekly' and 'monthly' are supported.")]
    InvalidPeriod,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<shared_database::DbError> for PrescriptionError {
    fn from(err: shared_database::DbError) -> Self {
        match err {
            shared_database::DbError::NotFound(_) => PrescriptionError::AppointmentNotFound,
            other => PrescriptionError::DatabaseError(other.to_string()),
        }
    }
}
