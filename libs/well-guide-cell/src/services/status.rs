use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::models::{GuideStatus, PatientGuideRecord};

/// Average Gregorian month (365.2425 / 12 days) in milliseconds.
pub const MILLIS_PER_AVERAGE_MONTH: f64 = 2_629_746_000.0;

type Rule = (fn(f64, f64) -> bool, GuideStatus);

/// Evaluated top-down; the first matching predicate decides the status.
/// Arguments are (elapsed months, recurrence months).
const CLASSIFICATION: &[Rule] = &[
    (appointment_in_future, GuideStatus::Scheduled),
    (at_final_month_start, GuideStatus::DueInOneMonth),
    (no_time_elapsed, GuideStatus::DueForAVisit),
    (before_final_month, GuideStatus::UpToDate),
    (within_final_month, GuideStatus::DueInOneMonth),
    (period_exhausted, GuideStatus::DueForAVisit),
];

fn appointment_in_future(elapsed: f64, _period: f64) -> bool {
    elapsed < 0.0
}

fn at_final_month_start(elapsed: f64, period: f64) -> bool {
    elapsed == period - 1.0
}

fn no_time_elapsed(elapsed: f64, _period: f64) -> bool {
    elapsed == 0.0
}

fn before_final_month(elapsed: f64, period: f64) -> bool {
    elapsed < period - 1.0
}

fn within_final_month(elapsed: f64, period: f64) -> bool {
    elapsed >= period - 1.0 && elapsed < period
}

fn period_exhausted(elapsed: f64, period: f64) -> bool {
    elapsed >= period
}

/// Derives a record's status and one-shot reminder bookkeeping from its last
/// appointment and the guide's recurrence period. Pure; persisting the
/// result is up to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusEngine;

impl StatusEngine {
    pub fn new() -> Self {
        Self
    }

    /// Continuous months between `last_appointment` and `as_of`; negative
    /// when the appointment lies in the future.
    pub fn months_elapsed(&self, last_appointment: DateTime<Utc>, as_of: DateTime<Utc>) -> f64 {
        let millis = (as_of - last_appointment).num_milliseconds();
        millis as f64 / MILLIS_PER_AVERAGE_MONTH
    }

    pub fn classify(&self, months_elapsed: f64, recurrence_months: u32) -> GuideStatus {
        let period = f64::from(recurrence_months);

        CLASSIFICATION
            .iter()
            .find(|(predicate, _)| predicate(months_elapsed, period))
            .map(|(_, status)| *status)
            .unwrap_or(GuideStatus::DueForAVisit)
    }

    pub fn compute(
        &self,
        record: &PatientGuideRecord,
        recurrence_months: u32,
        as_of: DateTime<Utc>,
    ) -> PatientGuideRecord {
        let elapsed = self.months_elapsed(record.last_appointment_date, as_of);
        let status = self.classify(elapsed, recurrence_months);

        debug!(
            "Guide {} for patient {}: {:.3} of {} months elapsed -> {}",
            record.guide_id, record.patient_id, elapsed, recurrence_months, status
        );

        let mut updated = PatientGuideRecord {
            status,
            ..record.clone()
        };

        let reminder_sent = match status {
            GuideStatus::DueInOneMonth => Some(&mut updated.due_in_one_month_reminder_sent),
            GuideStatus::DueForAVisit => Some(&mut updated.due_for_visit_reminder_sent),
            GuideStatus::Scheduled | GuideStatus::UpToDate => None,
        };

        if let Some(sent) = reminder_sent {
            if !*sent {
                *sent = true;
                updated.next_reminder = as_of.date_naive();
                info!(
                    "Reminder raised for patient {} guide {} ({})",
                    record.patient_id, record.guide_id, status
                );
            }
        }

        updated
    }
}
