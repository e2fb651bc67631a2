// libs/vaccination-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{SaveVaccineCheckRequest, VaccineError};
use crate::service::VaccineCheckService;

fn map_error(e: VaccineError) -> AppError {
    match e {
        VaccineError::InvalidAge | VaccineError::InvalidGender => {
            AppError::BadRequest(e.to_string())
        }
        VaccineError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

#[axum::debug_handler]
pub async fn save_vaccine_check(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Json(request): Json<SaveVaccineCheckRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = VaccineCheckService::new(&state);

    let log_id = service
        .save_check(request, token)
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "message": "Vaccine check log saved successfully",
        "logId": log_id
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    patient_id: Option<i64>,
    limit: Option<usize>,
}

#[axum::debug_handler]
pub async fn get_vaccine_check_history(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<HistoryParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = VaccineCheckService::new(&state);

    let logs = service
        .check_history(params.patient_id, params.limit, token)
        .await
        .map_err(map_error)?;

    let total = logs.len();
    Ok(Json(json!({
        "logs": logs,
        "totalLogs": total
    })))
}
