use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::models::{
    EnableReminder, GuideDefinition, PatientGuideRecord, PatientGuideView, RecordUpdate,
    ReminderUpdate, SubmitAppointment, WellGuideError,
};
use crate::services::catalog::{RecurrenceCatalog, StaticRecurrenceCatalog};
use crate::services::scheduler;
use crate::services::status::StatusEngine;
use crate::services::store::{GuideCatalogStore, GuideRecordStore, SupabaseGuideStore};
use crate::services::timestamp;

pub struct WellGuideService {
    records: Arc<dyn GuideRecordStore>,
    guides: Arc<dyn GuideCatalogStore>,
    recurrence: Arc<dyn RecurrenceCatalog>,
    engine: StatusEngine,
}

impl WellGuideService {
    pub fn new(config: &AppConfig) -> Self {
        let store = Arc::new(SupabaseGuideStore::new(config));
        Self::with_parts(
            store.clone(),
            store,
            Arc::new(StaticRecurrenceCatalog::from_config(config)),
        )
    }

    pub fn with_parts(
        records: Arc<dyn GuideRecordStore>,
        guides: Arc<dyn GuideCatalogStore>,
        recurrence: Arc<dyn RecurrenceCatalog>,
    ) -> Self {
        Self {
            records,
            guides,
            recurrence,
            engine: StatusEngine::new(),
        }
    }

    /// All guides, each annotated with its recurrence period when known.
    pub async fn list_guides(&self) -> Result<Vec<GuideDefinition>, WellGuideError> {
        let guides = self.guides.list_all_guides().await?;

        Ok(guides
            .into_iter()
            .map(|mut guide| {
                guide.recurrence_months = match self.recurrence.recurrence_months(guide.guide_id) {
                    Ok(months) => Some(months),
                    Err(_) => {
                        warn!("Guide {} ({}) has no recurrence period", guide.guide_id, guide.name);
                        None
                    }
                };
                guide
            })
            .collect())
    }

    pub async fn patient_guides(&self, patient_id: i64) -> Result<Vec<PatientGuideView>, WellGuideError> {
        require_patient(patient_id)?;
        Ok(self.records.list_by_patient(patient_id).await?)
    }

    /// Records an appointment for a guide and stores the recomputed status.
    /// A changed appointment instant starts a new reminder cycle.
    pub async fn record_appointment(
        &self,
        patient_id: i64,
        request: SubmitAppointment,
        as_of: DateTime<Utc>,
    ) -> Result<PatientGuideRecord, WellGuideError> {
        require_patient(patient_id)?;
        let months = self.recurrence.recurrence_months(request.guide_id)?;
        let appointment = timestamp::normalize_appointment(
            &request.last_appointment_date,
            request.utc_offset.as_deref(),
        )?;

        debug!(
            "Recording appointment {} for patient {} guide {}",
            appointment, patient_id, request.guide_id
        );

        let record = match self.records.find(patient_id, request.guide_id).await? {
            Some(existing) if existing.last_appointment_date == appointment => {
                let computed = self.engine.compute(&existing, months, as_of);
                return self.apply_changes(&existing, &computed).await;
            }
            Some(existing) => {
                info!(
                    "New appointment for patient {} guide {}, starting a new cycle",
                    patient_id, request.guide_id
                );
                existing.restart_cycle(appointment, as_of)
            }
            None => PatientGuideRecord::new_cycle(patient_id, request.guide_id, appointment, as_of),
        };

        let computed = self.engine.compute(&record, months, as_of);
        Ok(self.records.upsert(&computed).await?)
    }

    /// Recomputes every stored record of a patient and writes back the ones
    /// that changed.
    pub async fn refresh_patient_guides(
        &self,
        patient_id: i64,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<PatientGuideRecord>, WellGuideError> {
        require_patient(patient_id)?;

        let records = self.records.list_records(patient_id).await?;
        let mut refreshed = Vec::with_capacity(records.len());

        for record in records {
            let months = match self.recurrence.recurrence_months(record.guide_id) {
                Ok(months) => months,
                Err(e) => {
                    warn!("Skipping refresh for patient {}: {}", patient_id, e);
                    refreshed.push(record);
                    continue;
                }
            };

            let computed = self.engine.compute(&record, months, as_of);
            refreshed.push(self.apply_changes(&record, &computed).await?);
        }

        Ok(refreshed)
    }

    /// Stores the patient's reminder preference. Enabling it on a due or
    /// overdue guide schedules the follow-up reminder.
    pub async fn enable_reminder(
        &self,
        patient_id: i64,
        request: EnableReminder,
        today: NaiveDate,
    ) -> Result<ReminderUpdate, WellGuideError> {
        require_patient(patient_id)?;
        let months = self.recurrence.recurrence_months(request.guide_id)?;

        let stored = self
            .records
            .find(patient_id, request.guide_id)
            .await?
            .ok_or(WellGuideError::RecordNotFound {
                patient_id,
                guide_id: request.guide_id,
            })?;

        let mut update = RecordUpdate {
            reminder_enabled: Some(request.reminder_enabled),
            ..RecordUpdate::default()
        };
        if request.reminder_enabled {
            match scheduler::next_reminder_date(stored.status, today) {
                Some(next) => {
                    info!(
                        "Reminder for patient {} guide {} scheduled on {}",
                        patient_id, request.guide_id, next
                    );
                    update.next_reminder = Some(next);
                }
                None => debug!(
                    "Guide {} is {}, reminder date left at {}",
                    request.guide_id, stored.status, stored.next_reminder
                ),
            }
        }

        let record = self
            .records
            .update(patient_id, request.guide_id, &update)
            .await?
            .ok_or(WellGuideError::RecordNotFound {
                patient_id,
                guide_id: request.guide_id,
            })?;
        let next_routine = scheduler::next_routine(record.last_appointment_date, months)
            .ok_or_else(|| WellGuideError::InvalidTimestamp(format!(
                "next routine after {} is out of range",
                record.last_appointment_date
            )))?;

        Ok(ReminderUpdate { record, next_routine })
    }

    /// Writes the columns `computed` changed relative to `stored`. When the
    /// row moved on underneath us the stored version wins.
    async fn apply_changes(
        &self,
        stored: &PatientGuideRecord,
        computed: &PatientGuideRecord,
    ) -> Result<PatientGuideRecord, WellGuideError> {
        let update = RecordUpdate::between(stored, computed);
        if update.is_empty() {
            return Ok(stored.clone());
        }

        if let Some(saved) = self.records.update(stored.patient_id, stored.guide_id, &update).await? {
            return Ok(saved);
        }

        warn!(
            "Well guide {} for patient {} changed concurrently, keeping the stored record",
            stored.guide_id, stored.patient_id
        );
        self.records
            .find(stored.patient_id, stored.guide_id)
            .await?
            .ok_or(WellGuideError::RecordNotFound {
                patient_id: stored.patient_id,
                guide_id: stored.guide_id,
            })
    }
}

fn require_patient(patient_id: i64) -> Result<(), WellGuideError> {
    if patient_id <= 0 {
        return Err(WellGuideError::MissingIdentity);
    }
    Ok(())
}
