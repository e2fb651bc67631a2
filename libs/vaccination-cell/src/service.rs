// libs/vaccination-cell/src/service.rs
use std::sync::Arc;

use reqwest::Method;
use serde_json::json;
use tracing::info;

use shared_config::AppConfig;
use shared_database::GatewayClient;

use crate::models::{SaveVaccineCheckRequest, VaccineCheckLog, VaccineError};

const HISTORY_LIMIT: usize = 50;

/// Append-only log of vaccine eligibility checks.
pub struct VaccineCheckService {
    gateway: Arc<GatewayClient>,
}

impl VaccineCheckService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            gateway: Arc::new(GatewayClient::new(config)),
        }
    }

    pub async fn save_check(
        &self,
        request: SaveVaccineCheckRequest,
        auth_token: &str,
    ) -> Result<i64, VaccineError> {
        if !(0..=150).contains(&request.age) {
            return Err(VaccineError::InvalidAge);
        }
        if !matches!(request.gender.as_str(), "Male" | "Female" | "Other") {
            return Err(VaccineError::InvalidGender);
        }

        let body = json!({
            "patient_id": request.patient_id,
            "age": request.age,
            "gender": request.gender,
            "received_vaccines": request.received_vaccines,
            "mandatory_vaccines": request.mandatory_vaccines,
            "optional_vaccines": request.optional_vaccines,
        });

        let rows: Vec<VaccineCheckLog> = self
            .gateway
            .request_returning(
                Method::POST,
                "/rest/v1/vaccine_check_logs",
                Some(auth_token),
                Some(body),
            )
            .await?;

        let log = rows.into_iter().next().ok_or_else(|| {
            VaccineError::DatabaseError("Vaccine check insert returned no rows".to_string())
        })?;

        info!(
            "Saved vaccine check log {} (age {}, gender {})",
            log.id, log.age, log.gender
        );
        Ok(log.id)
    }

    /// Latest checks, newest first, optionally scoped to one patient.
    pub async fn check_history(
        &self,
        patient_id: Option<i64>,
        limit: Option<usize>,
        auth_token: &str,
    ) -> Result<Vec<VaccineCheckLog>, VaccineError> {
        let limit = limit.unwrap_or(HISTORY_LIMIT).min(HISTORY_LIMIT);

        let mut path = format!(
            "/rest/v1/vaccine_check_logs?order=checked_at.desc&limit={}",
            limit
        );
        if let Some(patient_id) = patient_id {
            path.push_str(&format!("&patient_id=eq.{}", patient_id));
        }

        let logs = self
            .gateway
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(logs)
    }
}
