// libs/appointment-cell/src/services/queries.rs
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use reqwest::Method;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::GatewayClient;

use crate::models::{
    AppointmentError, AuditLogEntry, CompletedAppointment, DoctorCalendarEntry,
    PatientCalendarEntry, PrescriptionSummary,
};

/// Read-side projections over appointments: calendars, completed-visit
/// histories, and the completion audit trail.
pub struct AppointmentQueryService {
    gateway: Arc<GatewayClient>,
}

impl AppointmentQueryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            gateway: Arc::new(GatewayClient::new(config)),
        }
    }

    pub async fn patient_calendar(
        &self,
        patient_id: i64,
        auth_token: &str,
    ) -> Result<Vec<PatientCalendarEntry>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}\
             &select=id,date,time,status,reason,doctor_id,doctor:doctors(first_name,last_name,specialization)\
             &order=date.asc,time.asc",
            patient_id
        );
        let rows: Vec<PatientCalendarEntry> = self
            .gateway
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        if rows.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        debug!("Found {} appointments for patient {}", rows.len(), patient_id);
        Ok(rows)
    }

    pub async fn doctor_calendar(
        &self,
        doctor_id: i64,
        auth_token: &str,
    ) -> Result<Vec<DoctorCalendarEntry>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}\
             &select=id,date,time,status,reason,patient_id,patient:patients(first_name,last_name)\
             &order=date.asc,time.asc",
            doctor_id
        );
        let rows: Vec<DoctorCalendarEntry> = self
            .gateway
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        if rows.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        debug!("Found {} appointments for doctor {}", rows.len(), doctor_id);
        Ok(rows)
    }

    /// A patient's `Completed` appointments, newest first, each with the
    /// prescriptions written for it.
    pub async fn patient_past_appointments(
        &self,
        patient_id: i64,
        auth_token: &str,
    ) -> Result<Vec<CompletedAppointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&status=eq.Completed\
             &select=id,date,time,status,reason,patient_id,doctor_id,doctor:doctors(first_name,last_name,specialization)\
             &order=date.desc,time.desc",
            patient_id
        );
        let mut appointments: Vec<CompletedAppointment> = self
            .gateway
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        if appointments.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        for appointment in &mut appointments {
            appointment.prescriptions = self
                .prescriptions_for_appointment(
                    appointment.patient_id,
                    appointment.doctor_id,
                    appointment.id,
                    appointment.date,
                    auth_token,
                )
                .await?;
        }

        Ok(appointments)
    }

    /// A doctor's `Completed` appointments with patient context. An empty
    /// history is a normal answer here, not a 404.
    pub async fn doctor_completed_appointments(
        &self,
        doctor_id: i64,
        auth_token: &str,
    ) -> Result<Vec<CompletedAppointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&status=eq.Completed\
             &select=id,date,time,status,reason,patient_id,doctor_id,patient:patients(first_name,last_name,age,gender,email,phone)\
             &order=date.desc,time.desc",
            doctor_id
        );
        let mut appointments: Vec<CompletedAppointment> = self
            .gateway
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        for appointment in &mut appointments {
            appointment.prescriptions = self
                .prescriptions_for_appointment(
                    appointment.patient_id,
                    appointment.doctor_id,
                    appointment.id,
                    appointment.date,
                    auth_token,
                )
                .await?;
        }

        Ok(appointments)
    }

    /// Latest 50 completion audit rows for a doctor, newest first.
    pub async fn doctor_audit_logs(
        &self,
        doctor_id: i64,
        auth_token: &str,
    ) -> Result<Vec<AuditLogEntry>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointment_audit_log?doctor_id=eq.{}\
             &select=id,appointment_id,patient_id,old_status,new_status,changed_at,notes,\
             patient:patients(first_name,last_name),appointment:appointments(date,time,reason)\
             &order=changed_at.desc&limit=50",
            doctor_id
        );
        let logs: Vec<AuditLogEntry> = self
            .gateway
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(logs)
    }

    /// Prescriptions belonging to an appointment: matched by appointment id,
    /// or unlinked ones issued within a day of the appointment date.
    async fn prescriptions_for_appointment(
        &self,
        patient_id: i64,
        doctor_id: i64,
        appointment_id: i64,
        appointment_date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<PrescriptionSummary>, AppointmentError> {
        let window_start = appointment_date - Duration::days(1);
        let window_end = appointment_date + Duration::days(1);

        let path = format!(
            "/rest/v1/prescriptions?patient_id=eq.{}&doctor_id=eq.{}\
             &or=(appointment_id.eq.{},and(appointment_id.is.null,date_issued.gte.{},date_issued.lte.{}))\
             &select=id,drug_id,dosage,instructions,date_issued,follow_up_date,appointment_id,drug:drugs(name)\
             &order=date_issued.desc",
            patient_id, doctor_id, appointment_id, window_start, window_end
        );

        let prescriptions: Vec<PrescriptionSummary> = self
            .gateway
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(prescriptions)
    }
}
