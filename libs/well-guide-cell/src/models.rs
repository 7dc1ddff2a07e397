use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ==============================================================================
// GUIDE STATUS
// ==============================================================================

/// Where a patient stands in the recurrence cycle of a guide.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GuideStatus {
    /// The recorded appointment is still in the future.
    #[serde(rename = "scheduled")]
    Scheduled,
    #[serde(rename = "uptodate")]
    UpToDate,
    #[serde(rename = "dueInOneMonth")]
    DueInOneMonth,
    #[serde(rename = "dueForAVisit")]
    DueForAVisit,
}

impl GuideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuideStatus::Scheduled => "scheduled",
            GuideStatus::UpToDate => "uptodate",
            GuideStatus::DueInOneMonth => "dueInOneMonth",
            GuideStatus::DueForAVisit => "dueForAVisit",
        }
    }
}

impl std::fmt::Display for GuideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==============================================================================
// CATALOG
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuideDefinition {
    #[serde(rename = "id")]
    pub guide_id: i64,
    pub name: String,
    pub speciality: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Filled from the recurrence catalog, not stored with the guide row.
    #[serde(default)]
    pub recurrence_months: Option<u32>,
}

// ==============================================================================
// PATIENT RECORDS
// ==============================================================================

/// One row per (patient, guide). Field names follow the `user_well_guide` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientGuideRecord {
    pub patient_id: i64,
    #[serde(rename = "well_guide_id")]
    pub guide_id: i64,
    pub last_appointment_date: DateTime<Utc>,
    pub status: GuideStatus,
    pub next_reminder: NaiveDate,
    #[serde(rename = "due_in_one_month_reminder", default, deserialize_with = "null_as_false")]
    pub due_in_one_month_reminder_sent: bool,
    #[serde(rename = "due_for_visit_reminder", default, deserialize_with = "null_as_false")]
    pub due_for_visit_reminder_sent: bool,
    #[serde(rename = "reminder", default, deserialize_with = "null_as_false")]
    pub reminder_enabled: bool,
    /// Owned by the booking subsystem; never written from here.
    #[serde(default, skip_serializing)]
    pub booking_id: Option<i64>,
}

impl PatientGuideRecord {
    /// A record for a fresh recurrence cycle. The status is provisional until
    /// the status engine has run over it.
    pub fn new_cycle(
        patient_id: i64,
        guide_id: i64,
        last_appointment_date: DateTime<Utc>,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            patient_id,
            guide_id,
            last_appointment_date,
            status: GuideStatus::UpToDate,
            next_reminder: default_next_reminder(as_of),
            due_in_one_month_reminder_sent: false,
            due_for_visit_reminder_sent: false,
            reminder_enabled: false,
            booking_id: None,
        }
    }

    /// Moves an existing record onto a new appointment, clearing the cycle's
    /// reminder bookkeeping.
    pub fn restart_cycle(self, last_appointment_date: DateTime<Utc>, as_of: DateTime<Utc>) -> Self {
        Self {
            last_appointment_date,
            next_reminder: default_next_reminder(as_of),
            due_in_one_month_reminder_sent: false,
            due_for_visit_reminder_sent: false,
            ..self
        }
    }
}

/// Column-level change to one stored record. Unset fields keep their stored
/// value; a flag set to `true` is only written while it is still unset.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RecordUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<GuideStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_reminder: Option<NaiveDate>,
    #[serde(rename = "due_in_one_month_reminder", skip_serializing_if = "Option::is_none")]
    pub due_in_one_month_reminder_sent: Option<bool>,
    #[serde(rename = "due_for_visit_reminder", skip_serializing_if = "Option::is_none")]
    pub due_for_visit_reminder_sent: Option<bool>,
    #[serde(rename = "reminder", skip_serializing_if = "Option::is_none")]
    pub reminder_enabled: Option<bool>,
    /// Applied only while the stored cycle still starts at this appointment.
    #[serde(skip)]
    pub expected_appointment: Option<DateTime<Utc>>,
}

impl RecordUpdate {
    /// The columns that differ between `before` and `after`, guarded on the
    /// appointment `before` was computed from.
    pub fn between(before: &PatientGuideRecord, after: &PatientGuideRecord) -> Self {
        fn changed<T: PartialEq + Copy>(old: T, new: T) -> Option<T> {
            (old != new).then_some(new)
        }

        Self {
            status: changed(before.status, after.status),
            next_reminder: changed(before.next_reminder, after.next_reminder),
            due_in_one_month_reminder_sent: changed(
                before.due_in_one_month_reminder_sent,
                after.due_in_one_month_reminder_sent,
            ),
            due_for_visit_reminder_sent: changed(
                before.due_for_visit_reminder_sent,
                after.due_for_visit_reminder_sent,
            ),
            reminder_enabled: changed(before.reminder_enabled, after.reminder_enabled),
            expected_appointment: Some(before.last_appointment_date),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.next_reminder.is_none()
            && self.due_in_one_month_reminder_sent.is_none()
            && self.due_for_visit_reminder_sent.is_none()
            && self.reminder_enabled.is_none()
    }
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Baseline reminder date for a new cycle: tomorrow.
pub fn default_next_reminder(as_of: DateTime<Utc>) -> NaiveDate {
    (as_of + Duration::days(1)).date_naive()
}

/// Read-only booking data joined onto a patient's guide listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BookingReference {
    pub start_time: Option<DateTime<Utc>>,
    pub booking_time_zone: Option<String>,
}

/// A patient's guide record joined with its guide and booking for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientGuideView {
    pub patient_id: i64,
    pub well_guide_id: i64,
    pub last_appointment_date: Option<DateTime<Utc>>,
    pub well_guide_status: Option<GuideStatus>,
    pub well_guide_name: Option<String>,
    pub well_guide_speciality: Option<String>,
    pub well_guide_description: Option<String>,
    pub well_guide_image_url: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub booking_time_zone: Option<String>,
}

// ==============================================================================
// REQUESTS
// ==============================================================================

/// Ids and timestamps arrive either as JSON numbers or numeric strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(i64),
    Text(String),
}

impl NumberOrString {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NumberOrString::Number(value) => Some(*value),
            NumberOrString::Text(text) => text.trim().parse().ok(),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            NumberOrString::Number(value) => value.to_string(),
            NumberOrString::Text(text) => text.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateWellGuideRequest {
    pub last_appointment_date: NumberOrString,
    pub well_guide_id: NumberOrString,
    pub off_set: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellGuideReminderRequest {
    pub reminder: bool,
    pub well_guide_id: NumberOrString,
}

/// A validated appointment submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitAppointment {
    pub guide_id: i64,
    /// Epoch milliseconds as submitted.
    pub last_appointment_date: String,
    /// UTC offset of the submitting client; UTC when absent.
    pub utc_offset: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnableReminder {
    pub guide_id: i64,
    pub reminder_enabled: bool,
}

// ==============================================================================
// RESPONSES
// ==============================================================================

/// Month and year of the next required visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NextRoutine {
    pub month: String,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReminderUpdate {
    pub record: PatientGuideRecord,
    pub next_routine: NextRoutine,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WellGuideError {
    #[error("Unknown well guide: {0}")]
    UnknownGuide(i64),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Please complete the onboarding process.")]
    MissingIdentity,

    #[error("No well guide record for patient {patient_id} and guide {guide_id}")]
    RecordNotFound { patient_id: i64, guide_id: i64 },

    #[error("Unsupported API version: {0}")]
    UnsupportedVersion(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
