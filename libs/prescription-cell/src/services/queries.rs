// libs/prescription-cell/src/services/queries.rs
use std::sync::Arc;

use reqwest::Method;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::GatewayClient;

use crate::models::{PatientPrescription, PrescriptionError, TrendRow};

/// Read-side projections over prescriptions.
pub struct PrescriptionQueryService {
    gateway: Arc<GatewayClient>,
}

impl PrescriptionQueryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            gateway: Arc::new(GatewayClient::new(config)),
        }
    }

    /// All prescriptions for a patient with drug, doctor and appointment
    /// context, newest first. An empty list is a normal answer.
    pub async fn patient_prescriptions(
        &self,
        patient_id: i64,
        auth_token: &str,
    ) -> Result<Vec<PatientPrescription>, PrescriptionError> {
        let path = format!(
            "/rest/v1/prescriptions?patient_id=eq.{}\
             &select=id,patient_id,doctor_id,appointment_id,drug_id,dosage,instructions,date_issued,follow_up_date,\
             drug:drugs(id,name,rx_otc),\
             doctor:doctors(first_name,last_name,specialization,email,phone),\
             appointment:appointments(date,time,reason)\
             &order=date_issued.desc,id.desc",
            patient_id
        );
        let rows: Vec<PatientPrescription> = self
            .gateway
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        debug!("Found {} prescriptions for patient {}", rows.len(), patient_id);
        Ok(rows)
    }

    /// The minimal projection the trend aggregation needs, issued-date
    /// ascending so bucket order falls out of the sort.
    pub async fn trend_rows(
        &self,
        patient_id: i64,
        auth_token: &str,
    ) -> Result<Vec<TrendRow>, PrescriptionError> {
        let path = format!(
            "/rest/v1/prescriptions?patient_id=eq.{}\
             &select=date_issued,drug_id,doctor_id,drug:drugs(id,name,rx_otc)\
             &order=date_issued.asc",
            patient_id
        );
        let rows = self
            .gateway
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(rows)
    }
}
