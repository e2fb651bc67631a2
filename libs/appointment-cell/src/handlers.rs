// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AppointmentStatus, BookAppointmentRequest, UpdateAppointmentRequest,
    UpdateStatusRequest,
};
use crate::services::booking::AppointmentBookingService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::queries::AppointmentQueryService;
use crate::services::sweep::NoShowSweepService;

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Only the patient themselves, a doctor, or an admin can book
    let is_patient = request.patient_id.to_string() == user.id;
    let is_admin = user.role.as_deref() == Some("admin");
    let is_doctor = user.role.as_deref() == Some("doctor");

    if !is_patient && !is_admin && !is_doctor {
        return Err(AppError::Auth(
            "Not authorized to book appointment for this patient".to_string(),
        ));
    }

    let booking_service = AppointmentBookingService::new(&state);

    let appointment_id = booking_service
        .book_appointment(request, token)
        .await
        .map_err(|e| match e {
            AppointmentError::SlotTaken => AppError::Conflict(e.to_string()),
            AppointmentError::ValidationError(msg) => AppError::BadRequest(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "message": "Appointment booked successfully",
        "appointmentId": appointment_id
    })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_patient = request.patient_id.to_string() == user.id;
    let is_admin = user.role.as_deref() == Some("admin");
    let is_doctor = user.role.as_deref() == Some("doctor");

    if !is_patient && !is_admin && !is_doctor {
        return Err(AppError::Auth(
            "Not authorized to update this appointment".to_string(),
        ));
    }

    let booking_service = AppointmentBookingService::new(&state);

    booking_service
        .update_appointment(appointment_id, request, token)
        .await
        .map_err(|e| match e {
            AppointmentError::NotFound => {
                AppError::NotFound("Appointment not found or cannot be updated".to_string())
            }
            AppointmentError::SlotTaken => AppError::Conflict(e.to_string()),
            AppointmentError::ValidationError(msg) => AppError::BadRequest(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "message": "Appointment updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    booking_service
        .delete_appointment(appointment_id, token)
        .await
        .map_err(|e| match e {
            AppointmentError::NotFound => {
                AppError::NotFound("Appointment not found or cannot be deleted".to_string())
            }
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "message": "Appointment deleted successfully"
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_admin = user.role.as_deref() == Some("admin");
    let is_doctor = user.role.as_deref() == Some("doctor");

    if !is_admin && !is_doctor {
        return Err(AppError::Auth(
            "Not authorized to change appointment status".to_string(),
        ));
    }

    let new_status: AppointmentStatus = request.status.parse().map_err(|_| {
        AppError::BadRequest(
            "Invalid status. Must be one of: Scheduled, Completed, Cancelled, No Show".to_string(),
        )
    })?;

    let lifecycle_service = AppointmentLifecycleService::new(&state);

    let change = lifecycle_service
        .set_status(appointment_id, new_status, token)
        .await
        .map_err(|e| match e {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::InvalidTransition { .. } => AppError::BadRequest(e.to_string()),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "message": "Appointment status updated successfully",
        "appointmentId": change.appointment_id,
        "newStatus": change.new_status
    })))
}

#[axum::debug_handler]
pub async fn mark_past_appointments_as_no_show(
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
            "Not authorized to update appointments for this patient".to_string(),
        ));
    }

    let sweep_service = NoShowSweepService::new(&state);

    let outcome = sweep_service
        .mark_past_as_no_show(patient_id, Utc::now(), token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if outcome.updated_count == 0 {
        return Ok(Json(json!({
            "message": "No past scheduled appointments found",
            "updatedCount": 0
        })));
    }

    Ok(Json(json!({
        "message": "Past scheduled appointments marked as No Show",
        "updatedCount": outcome.updated_count,
        "appointmentIds": outcome.appointment_ids
    })))
}

#[axum::debug_handler]
pub async fn get_patient_calendar(
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
            "Not authorized to view appointments for this patient".to_string(),
        ));
    }

    let query_service = AppointmentQueryService::new(&state);

    let appointments = query_service
        .patient_calendar(patient_id, token)
        .await
        .map_err(|e| match e {
            AppointmentError::NotFound => {
                AppError::NotFound("No appointments found for this patient.".to_string())
            }
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({ "appointments": appointments })))
}

#[axum::debug_handler]
pub async fn get_doctor_calendar(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_doctor = doctor_id.to_string() == user.id;
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_doctor && !is_admin {
        return Err(AppError::Auth(
            "Not authorized to view appointments for this doctor".to_string(),
        ));
    }

    let query_service = AppointmentQueryService::new(&state);

    let appointments = query_service
        .doctor_calendar(doctor_id, token)
        .await
        .map_err(|e| match e {
            AppointmentError::NotFound => {
                AppError::NotFound("No appointments found for this doctor.".to_string())
            }
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({ "appointments": appointments })))
}

#[axum::debug_handler]
pub async fn get_patient_past_appointments(
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
            "Not authorized to view appointments for this patient".to_string(),
        ));
    }

    let query_service = AppointmentQueryService::new(&state);

    let appointments = query_service
        .patient_past_appointments(patient_id, token)
        .await
        .map_err(|e| match e {
            AppointmentError::NotFound => {
                AppError::NotFound("No completed appointments found".to_string())
            }
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({ "appointments": appointments })))
}

#[axum::debug_handler]
pub async fn get_doctor_completed_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_doctor = doctor_id.to_string() == user.id;
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_doctor && !is_admin {
        return Err(AppError::Auth(
            "Not authorized to view appointments for this doctor".to_string(),
        ));
    }

    let query_service = AppointmentQueryService::new(&state);

    let appointments = query_service
        .doctor_completed_appointments(doctor_id, token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({ "appointments": appointments })))
}

#[axum::debug_handler]
pub async fn get_doctor_audit_logs(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_doctor = doctor_id.to_string() == user.id;
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_doctor && !is_admin {
        return Err(AppError::Auth(
            "Not authorized to view audit logs for this doctor".to_string(),
        ));
    }

    let query_service = AppointmentQueryService::new(&state);

    let logs = query_service
        .doctor_audit_logs(doctor_id, token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let total = logs.len();
    Ok(Json(json!({
        "auditLogs": logs,
        "totalLogs": total
    })))
}
