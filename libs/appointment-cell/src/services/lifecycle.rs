// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::GatewayClient;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, StatusChange};

pub struct AppointmentLifecycleService {
    gateway: Arc<GatewayClient>,
}

impl AppointmentLifecycleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            gateway: Arc::new(GatewayClient::new(config)),
        }
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
            AppointmentStatus::NoShow => vec![],
        }
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!(
            "Validating status transition from {} to {}",
            current_status, new_status
        );

        if !Self::get_valid_transitions(current_status).contains(new_status) {
            warn!(
                "Invalid status transition attempted: {} -> {}",
                current_status, new_status
            );
            return Err(AppointmentError::InvalidTransition {
                from: *current_status,
                to: *new_status,
            });
        }

        Ok(())
    }

    /// Move an appointment to a new status.
    ///
    /// A transition into `Completed` appends exactly one audit row in the same
    /// operation; the write happens here in the application instead of a
    /// database trigger so the audit trail is visible in one place.
    pub async fn set_status(
        &self,
        appointment_id: i64,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<StatusChange, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let existing: Vec<Appointment> = self
            .gateway
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let appointment = existing.into_iter().next().ok_or(AppointmentError::NotFound)?;
        let old_status = appointment.status;

        Self::validate_status_transition(&old_status, &new_status)?;

        // Re-filter on the status the transition was validated against, so a
        // racing writer that already moved the row makes this PATCH match
        // nothing instead of flipping it twice.
        let patch_path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}",
            appointment_id,
            urlencoding::encode(&old_status.to_string())
        );
        let updated: Vec<Value> = self
            .gateway
            .request_returning(
                Method::PATCH,
                &patch_path,
                Some(auth_token),
                Some(json!({ "status": new_status })),
            )
            .await?;

        // Empty set means we lost the race between read and write
        if updated.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        if new_status == AppointmentStatus::Completed {
            self.write_completion_audit(&appointment, auth_token).await?;
        }

        info!(
            "Appointment {} moved from {} to {}",
            appointment_id, old_status, new_status
        );

        Ok(StatusChange {
            appointment_id,
            old_status,
            new_status,
        })
    }

    async fn write_completion_audit(
        &self,
        appointment: &Appointment,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let note = format!(
            "Appointment completed on {} at {}. Reason: {}",
            appointment.date,
            appointment.time,
            appointment.reason.as_deref().unwrap_or("N/A")
        );

        let body = json!({
            "appointment_id": appointment.id,
            "doctor_id": appointment.doctor_id,
            "patient_id": appointment.patient_id,
            "old_status": appointment.status,
            "new_status": AppointmentStatus::Completed,
            "changed_at": Utc::now(),
            "notes": note,
        });

        let _: Vec<Value> = self
            .gateway
            .request_returning(
                Method::POST,
                "/rest/v1/appointment_audit_log",
                Some(auth_token),
                Some(body),
            )
            .await?;

        debug!("Audit row written for appointment {}", appointment.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn scheduled_can_reach_every_terminal_state() {
        let next = AppointmentLifecycleService::get_valid_transitions(&AppointmentStatus::Scheduled);
        assert!(next.contains(&AppointmentStatus::Completed));
        assert!(next.contains(&AppointmentStatus::Cancelled));
        assert!(next.contains(&AppointmentStatus::NoShow));
        assert_eq!(next.len(), 3);
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for terminal in [
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
        ] {
            assert!(AppointmentLifecycleService::get_valid_transitions(&terminal).is_empty());
        }
    }

    #[test]
    fn completed_cannot_return_to_scheduled() {
        let result = AppointmentLifecycleService::validate_status_transition(
            &AppointmentStatus::Completed,
            &AppointmentStatus::Scheduled,
        );
        assert_matches!(result, Err(AppointmentError::InvalidTransition { .. }));
    }

    #[test]
    fn cancelled_cannot_become_completed() {
        let result = AppointmentLifecycleService::validate_status_transition(
            &AppointmentStatus::Cancelled,
            &AppointmentStatus::Completed,
        );
        assert_matches!(result, Err(AppointmentError::InvalidTransition { .. }));
    }

    #[test]
    fn scheduled_to_no_show_is_allowed() {
        assert!(AppointmentLifecycleService::validate_status_transition(
            &AppointmentStatus::Scheduled,
            &AppointmentStatus::NoShow,
        )
        .is_ok());
    }

    #[test]
    fn self_transition_is_rejected() {
        let result = AppointmentLifecycleService::validate_status_transition(
            &AppointmentStatus::Scheduled,
            &AppointmentStatus::Scheduled,
        );
        assert_matches!(result, Err(AppointmentError::InvalidTransition { .. }));
    }
}
