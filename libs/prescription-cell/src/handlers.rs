// libs/prescription-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreatePrescriptionRequest, PrescriptionError, TrendPeriod};
use crate::services::create::PrescriptionService;
use crate::services::queries::PrescriptionQueryService;
use crate::services::trends;

fn map_error(e: PrescriptionError) -> AppError {
    match e {
        PrescriptionError::AppointmentNotFound
        | PrescriptionError::DrugNotFound
        | PrescriptionError::DrugNotFoundByName(_) => AppError::NotFound(e.to_string()),
        PrescriptionError::AppointmentMismatch(msg) => AppError::BadRequest(msg),
        PrescriptionError::AppointmentNotPrescribable(_) | PrescriptionError::InvalidPeriod => {
            AppError::BadRequest(e.to_string())
        }
        PrescriptionError::ValidationError(msg) => AppError::BadRequest(msg),
        PrescriptionError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

#[axum::debug_handler]
pub async fn create_prescription(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let token = auth.token();

    let is_admin = user.role.as_deref() == Some("admin");
    let is_doctor = user.role.as_deref() == Some("doctor");

    if !is_admin && !is_doctor {
        return Err(AppError::Auth(
            "Not authorized to create prescriptions".to_string(),
        ));
    }

    let service = PrescriptionService::new(&state);

    let created = service
        .create_prescription(request, token)
        .await
        .map_err(map_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "prescription": created.prescription,
            "statistics": {
                "totalPrescriptionsForPatient": created.total_for_patient,
                "sameDrugPrescriptions": created.same_drug_count,
                "drugName": created.drug_name
            }
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_patient_prescriptions(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_patient = patient_id.to_string() == user.id;
    let is_admin = user.role.as_deref() == Some("admin");
    let is_doctor = user.role.as_deref() == Some("doctor");

    if !is_patient && !is_admin && !is_doctor {
        return Err(AppError::Auth(
            "Not authorized to view prescriptions for this patient".to_string(),
        ));
    }

    let query_service = PrescriptionQueryService::new(&state);

    // An empty list is a 200, not a 404
    let prescriptions = query_service
        .patient_prescriptions(patient_id, token)
        .await
        .map_err(map_error)?;

    Ok(Json(json!({ "prescriptions": prescriptions })))
}

#[derive(Debug, Deserialize)]
pub struct TrendParams {
    period: Option<String>,
}

#[axum::debug_handler]
pub async fn get_prescription_trends(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
    Query(params): Query<TrendParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_patient = patient_id.to_string() == user.id;
    let is_admin = user.role.as_deref() == Some("admin");
    let is_doctor = user.role.as_deref() == Some("doctor");

    if !is_patient && !is_admin && !is_doctor {
        return Err(AppError::Auth(
            "Not authorized to view prescription trends for this patient".to_string(),
        ));
    }

    let period: TrendPeriod = params
        .period
        .as_deref()
        .unwrap_or("monthly")
        .parse()
        .map_err(map_error)?;

    let query_service = PrescriptionQueryService::new(&state);

    let rows = query_service
        .trend_rows(patient_id, token)
        .await
        .map_err(map_error)?;

    let trend_points = trends::aggregate(&rows, period);
    let summary = trends::summarize(&trend_points);

    Ok(Json(json!({
        "patientId": patient_id,
        "period": period.as_str(),
        "trends": trend_points,
        "summary": summary
    })))
}
