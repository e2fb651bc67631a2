// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::GatewayClient;

use crate::models::{
    Appointment, AppointmentError, BookAppointmentRequest, UpdateAppointmentRequest,
};

pub struct AppointmentBookingService {
    gateway: Arc<GatewayClient>,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            gateway: Arc::new(GatewayClient::new(config)),
        }
    }

    /// Book a new appointment in a `Scheduled` slot.
    ///
    /// The pre-check keeps the common double-booking case on a friendly 409
    /// path; the partial unique index on (doctor_id, date, time) for scheduled
    /// rows catches the racing insert that slips past it, and the gateway's
    /// conflict error maps to the same `SlotTaken`.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<i64, AppointmentError> {
        debug!(
            "Booking appointment for patient {} with doctor {} on {} at {}",
            request.patient_id, request.doctor_id, request.date, request.time
        );

        if self
            .slot_is_taken(request.doctor_id, request.date, request.time, None, auth_token)
            .await?
        {
            warn!(
                "Slot conflict for doctor {} on {} at {}",
                request.doctor_id, request.date, request.time
            );
            return Err(AppointmentError::SlotTaken);
        }

        let body = json!({
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "date": request.date,
            "time": request.time,
            "reason": request.reason,
            "status": "Scheduled",
        });

        let inserted: Vec<Appointment> = self
            .gateway
            .request_returning(Method::POST, "/rest/v1/appointments", Some(auth_token), Some(body))
            .await?;

        let appointment = inserted
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Insert returned no row".to_string()))?;

        info!("Booked appointment {}", appointment.id);
        Ok(appointment.id)
    }

    /// Rebook an existing `Scheduled` appointment onto a (possibly) new slot.
    ///
    /// The conflict check runs only when the (doctor, date, time) triple
    /// actually changed, and always excludes the appointment itself, so a
    /// reason-only edit can never collide with the appointment's own slot.
    pub async fn update_appointment(
        &self,
        appointment_id: i64,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        debug!("Updating appointment {}", appointment_id);

        let path = format!(
            "/rest/v1/appointments?id=eq.{}&patient_id=eq.{}&status=eq.Scheduled&select=id,doctor_id,date,time",
            appointment_id, request.patient_id
        );
        let existing: Vec<Value> = self
            .gateway
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let current = existing.into_iter().next().ok_or(AppointmentError::NotFound)?;

        let old_doctor_id = current["doctor_id"].as_i64();
        let old_date: Option<NaiveDate> =
            serde_json::from_value(current["date"].clone()).ok();
        let old_time: Option<NaiveTime> =
            serde_json::from_value(current["time"].clone()).ok();

        let slot_changed = old_doctor_id != Some(request.doctor_id)
            || old_date != Some(request.date)
            || old_time != Some(request.time);

        if slot_changed
            && self
                .slot_is_taken(
                    request.doctor_id,
                    request.date,
                    request.time,
                    Some(appointment_id),
                    auth_token,
                )
                .await?
        {
            warn!("Slot conflict while updating appointment {}", appointment_id);
            return Err(AppointmentError::SlotTaken);
        }

        let patch_path = format!(
            "/rest/v1/appointments?id=eq.{}&patient_id=eq.{}&status=eq.Scheduled",
            appointment_id, request.patient_id
        );
        let body = json!({
            "doctor_id": request.doctor_id,
            "date": request.date,
            "time": request.time,
            "reason": request.reason,
        });

        let updated: Vec<Value> = self
            .gateway
            .request_returning(Method::PATCH, &patch_path, Some(auth_token), Some(body))
            .await?;

        if updated.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        info!("Updated appointment {}", appointment_id);
        Ok(())
    }

    /// Delete an appointment; only `Scheduled` ones can be removed.
    pub async fn delete_appointment(
        &self,
        appointment_id: i64,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        debug!("Deleting appointment {}", appointment_id);

        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.Scheduled",
            appointment_id
        );
        let deleted: Vec<Value> = self
            .gateway
            .request_returning(Method::DELETE, &path, Some(auth_token), None)
            .await?;

        if deleted.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        info!("Deleted appointment {}", appointment_id);
        Ok(())
    }

    async fn slot_is_taken(
        &self,
        doctor_id: i64,
        date: NaiveDate,
        time: NaiveTime,
        exclude_appointment_id: Option<i64>,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        let mut query_parts = vec![
            format!("doctor_id=eq.{}", doctor_id),
            format!("date=eq.{}", date),
            format!(
                "time=eq.{}",
                urlencoding::encode(&time.format("%H:%M:%S").to_string())
            ),
            "status=eq.Scheduled".to_string(),
        ];

        if let Some(exclude_id) = exclude_appointment_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!("/rest/v1/appointments?{}&select=id", query_parts.join("&"));

        let result: Vec<Value> = self
            .gateway
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(!result.is_empty())
    }
}
