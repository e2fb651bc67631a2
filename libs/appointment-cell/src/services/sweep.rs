// libs/appointment-cell/src/services/sweep.rs
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::GatewayClient;

use crate::models::{AppointmentError, SweepOutcome};

#[derive(Debug, Deserialize)]
struct ScheduledSlot {
    id: i64,
    date: NaiveDate,
    time: NaiveTime,
}

/// Pull-based no-show sweep: callers invoke it when they fetch a patient's
/// appointments; there is no background job.
pub struct NoShowSweepService {
    gateway: Arc<GatewayClient>,
    clinic_offset: FixedOffset,
}

impl NoShowSweepService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            gateway: Arc::new(GatewayClient::new(config)),
            clinic_offset: config.clinic_offset(),
        }
    }

    /// An appointment is stale when its civil (date, time) in the clinic's
    /// configured UTC offset is at or before `now`. The offset is explicit so
    /// the application and database cannot disagree on what "past" means.
    pub fn is_stale(
        date: NaiveDate,
        time: NaiveTime,
        now: DateTime<Utc>,
        clinic_offset: FixedOffset,
    ) -> bool {
        match clinic_offset.from_local_datetime(&date.and_time(time)).single() {
            Some(instant) => instant <= now,
            None => false,
        }
    }

    /// Mark all of the patient's past `Scheduled` appointments as `No Show`.
    ///
    /// `now` is passed in rather than read from the wall clock so the staleness
    /// cutoff is deterministic under test. The bulk update re-filters on
    /// `status = Scheduled`, so a row completed between the read and the write
    /// is left alone and a second sweep reports zero updates.
    pub async fn mark_past_as_no_show(
        &self,
        patient_id: i64,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<SweepOutcome, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&status=eq.Scheduled&select=id,date,time",
            patient_id
        );
        let scheduled: Vec<ScheduledSlot> = self
            .gateway
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let stale_ids: Vec<i64> = scheduled
            .iter()
            .filter(|slot| Self::is_stale(slot.date, slot.time, now, self.clinic_offset))
            .map(|slot| slot.id)
            .collect();

        if stale_ids.is_empty() {
            debug!("No past scheduled appointments for patient {}", patient_id);
            return Ok(SweepOutcome {
                updated_count: 0,
                appointment_ids: vec![],
            });
        }

        let id_list = stale_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let patch_path = format!(
            "/rest/v1/appointments?id=in.({})&status=eq.Scheduled",
            id_list
        );
        let updated: Vec<Value> = self
            .gateway
            .request_returning(
                Method::PATCH,
                &patch_path,
                Some(auth_token),
                Some(json!({ "status": "No Show" })),
            )
            .await?;

        info!(
            "Marked {} appointment(s) as No Show for patient {}",
            updated.len(),
            patient_id
        );

        Ok(SweepOutcome {
            updated_count: updated.len(),
            appointment_ids: stale_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset_minus_5() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).unwrap()
    }

    #[test]
    fn past_slot_is_stale() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 18, 0, 0).unwrap();
        // 2025-06-15 09:00 at -05:00 is 14:00 UTC, four hours before now.
        assert!(NoShowSweepService::is_stale(
            NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            now,
            offset_minus_5(),
        ));
    }

    #[test]
    fn future_slot_is_not_stale() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        // 2025-06-15 09:00 at -05:00 is 14:00 UTC, two hours after now.
        assert!(!NoShowSweepService::is_stale(
            NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            now,
            offset_minus_5(),
        ));
    }

    #[test]
    fn slot_exactly_at_now_is_stale() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 14, 0, 0).unwrap();
        assert!(NoShowSweepService::is_stale(
            NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            now,
            offset_minus_5(),
        ));
    }

    #[test]
    fn offset_shifts_the_cutoff() {
        // Same civil slot, same now: stale in UTC, not yet at -05:00.
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 10, 0, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

        assert!(NoShowSweepService::is_stale(
            date,
            time,
            now,
            FixedOffset::east_opt(0).unwrap(),
        ));
        assert!(!NoShowSweepService::is_stale(date, time, now, offset_minus_5()));
    }
}
