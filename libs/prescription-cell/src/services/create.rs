// libs/prescription-cell/src/services/create.rs
use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::GatewayClient;

use crate::models::{CreatePrescriptionRequest, CreatedPrescription, DrugInfo, Prescription, PrescriptionError};

#[derive(Debug, Deserialize)]
struct AppointmentRef {
    patient_id: i64,
    doctor_id: i64,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ExistingPrescription {
    #[allow(dead_code)]
    id: i64,
    drug_id: i64,
}

/// Creates prescriptions. Patient and doctor ids can be resolved from an
/// appointment, and the drug can be referenced by id or by exact name.
pub struct PrescriptionService {
    gateway: Arc<GatewayClient>,
    clinic_offset: FixedOffset,
}

impl PrescriptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            gateway: Arc::new(GatewayClient::new(config)),
            clinic_offset: config.clinic_offset(),
        }
    }

    pub async fn create_prescription(
        &self,
        request: CreatePrescriptionRequest,
        auth_token: &str,
    ) -> Result<CreatedPrescription, PrescriptionError> {
        let mut patient_id = request.patient_id;
        let mut doctor_id = request.doctor_id;

        // Resolve patient/doctor from the appointment when one is given, and
        // reject explicit ids that contradict it.
        if let Some(appointment_id) = request.appointment_id {
            let appointment = self.fetch_appointment(appointment_id, auth_token).await?;

            if let Some(id) = request.doctor_id {
                if id != appointment.doctor_id {
                    return Err(PrescriptionError::AppointmentMismatch(
                        "DoctorID does not match the appointment.".to_string(),
                    ));
                }
            }
            if let Some(id) = request.patient_id {
                if id != appointment.patient_id {
                    return Err(PrescriptionError::AppointmentMismatch(
                        "PatientID does not match the appointment.".to_string(),
                    ));
                }
            }

            if appointment.status != "Scheduled" && appointment.status != "Completed" {
                return Err(PrescriptionError::AppointmentNotPrescribable(
                    appointment.status,
                ));
            }

            patient_id = patient_id.or(Some(appointment.patient_id));
            doctor_id = doctor_id.or(Some(appointment.doctor_id));
        }

        let patient_id = patient_id.ok_or_else(|| {
            PrescriptionError::ValidationError(
                "PatientID is required. Provide either AppointmentID or PatientID.".to_string(),
            )
        })?;
        let doctor_id = doctor_id.ok_or_else(|| {
            PrescriptionError::ValidationError(
                "DoctorID is required. Provide either AppointmentID or DoctorID.".to_string(),
            )
        })?;

        let drug = self.resolve_drug(&request, auth_token).await?;

        let existing = self
            .existing_prescriptions(patient_id, doctor_id, auth_token)
            .await?;
        let same_drug_count = existing.iter().filter(|p| p.drug_id == drug.id).count();
        if same_drug_count > 0 {
            debug!(
                "Patient {} already has {} prescription(s) for drug {}",
                patient_id, same_drug_count, drug.id
            );
        }

        let date_issued = Utc::now().with_timezone(&self.clinic_offset).date_naive();

        let body = json!({
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_id": request.appointment_id,
            "drug_id": drug.id,
            "dosage": trimmed(request.dosage),
            "instructions": trimmed(request.instructions),
            "date_issued": date_issued,
            "follow_up_date": request.follow_up_date,
        });

        let rows: Vec<Prescription> = self
            .gateway
            .request_returning(
                Method::POST,
                "/rest/v1/prescriptions",
                Some(auth_token),
                Some(body),
            )
            .await?;

        let prescription = rows.into_iter().next().ok_or_else(|| {
            PrescriptionError::DatabaseError("Prescription insert returned no rows".to_string())
        })?;

        info!(
            "Created prescription {} for patient {} by doctor {}",
            prescription.id, patient_id, doctor_id
        );

        Ok(CreatedPrescription {
            prescription,
            drug_name: Some(drug.name),
            total_for_patient: existing.len(),
            same_drug_count,
        })
    }

    async fn fetch_appointment(
        &self,
        appointment_id: i64,
        auth_token: &str,
    ) -> Result<AppointmentRef, PrescriptionError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&select=patient_id,doctor_id,status",
            appointment_id
        );
        let rows: Vec<AppointmentRef> = self
            .gateway
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        rows.into_iter()
            .next()
            .ok_or(PrescriptionError::AppointmentNotFound)
    }

    async fn resolve_drug(
        &self,
        request: &CreatePrescriptionRequest,
        auth_token: &str,
    ) -> Result<DrugInfo, PrescriptionError> {
        if let Some(drug_id) = request.drug_id {
            let path = format!("/rest/v1/drugs?id=eq.{}&select=id,name,rx_otc", drug_id);
            let rows: Vec<DrugInfo> = self
                .gateway
                .request(Method::GET, &path, Some(auth_token), None)
                .await?;
            return rows.into_iter().next().ok_or(PrescriptionError::DrugNotFound);
        }

        if let Some(name) = request.drug_name.as_deref().map(str::trim) {
            if !name.is_empty() {
                let path = format!(
                    "/rest/v1/drugs?name=eq.{}&select=id,name,rx_otc",
                    urlencoding::encode(name)
                );
                let rows: Vec<DrugInfo> = self
                    .gateway
                    .request(Method::GET, &path, Some(auth_token), None)
                    .await?;
                return rows
                    .into_iter()
                    .next()
                    .ok_or_else(|| PrescriptionError::DrugNotFoundByName(name.to_string()));
            }
        }

        Err(PrescriptionError::ValidationError(
            "DrugID is required. Provide either DrugID or DrugName.".to_string(),
        ))
    }

    async fn existing_prescriptions(
        &self,
        patient_id: i64,
        doctor_id: i64,
        auth_token: &str,
    ) -> Result<Vec<ExistingPrescription>, PrescriptionError> {
        let path = format!(
            "/rest/v1/prescriptions?patient_id=eq.{}&doctor_id=eq.{}&select=id,drug_id",
            patient_id, doctor_id
        );
        let rows = self
            .gateway
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(rows)
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let v = v.trim().to_string();
        if v.is_empty() {
            None
        } else {
            Some(v)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trimmed_drops_whitespace_only_values() {
        assert_eq!(trimmed(Some("  ".to_string())), None);
        assert_eq!(trimmed(Some(" 20mg ".to_string())), Some("20mg".to_string()));
        assert_eq!(trimmed(None), None);
    }
}
