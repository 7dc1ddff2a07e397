#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use well_guide_cell::models::{GuideDefinition, PatientGuideRecord, PatientGuideView, RecordUpdate};
use well_guide_cell::services::status::MILLIS_PER_AVERAGE_MONTH;
use well_guide_cell::services::{GuideCatalogStore, GuideRecordStore, StaticRecurrenceCatalog, WellGuideService};

pub const DENTAL: i64 = 1;
pub const SKIN: i64 = 3;

/// In-memory stand-in for the Supabase tables.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<BTreeMap<(i64, i64), PatientGuideRecord>>,
    guides: Mutex<Vec<GuideDefinition>>,
    writes: AtomicUsize,
    unavailable: AtomicBool,
    concurrent_write: Mutex<Option<PatientGuideRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, record: PatientGuideRecord) {
        self.records
            .lock()
            .unwrap()
            .insert((record.patient_id, record.guide_id), record);
    }

    pub fn seed_guide(&self, guide: GuideDefinition) {
        self.guides.lock().unwrap().push(guide);
    }

    pub fn get(&self, patient_id: i64, guide_id: i64) -> Option<PatientGuideRecord> {
        self.records.lock().unwrap().get(&(patient_id, guide_id)).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Stores `record` just before the next column update runs, as another
    /// writer would between our read and our write.
    pub fn interleave_write(&self, record: PatientGuideRecord) {
        *self.concurrent_write.lock().unwrap() = Some(record);
    }

    pub fn go_down(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(anyhow!("store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl GuideRecordStore for InMemoryStore {
    async fn find(&self, patient_id: i64, guide_id: i64) -> Result<Option<PatientGuideRecord>> {
        self.check_available()?;
        Ok(self.get(patient_id, guide_id))
    }

    async fn upsert(&self, record: &PatientGuideRecord) -> Result<PatientGuideRecord> {
        self.check_available()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.seed(record.clone());
        Ok(record.clone())
    }

    async fn update(
        &self,
        patient_id: i64,
        guide_id: i64,
        update: &RecordUpdate,
    ) -> Result<Option<PatientGuideRecord>> {
        self.check_available()?;
        if let Some(other) = self.concurrent_write.lock().unwrap().take() {
            self.seed(other);
        }

        let mut records = self.records.lock().unwrap();
        let Some(record) = records.get_mut(&(patient_id, guide_id)) else {
            return Ok(None);
        };

        let cycle_moved = update
            .expected_appointment
            .is_some_and(|appointment| appointment != record.last_appointment_date);
        let already_raised = (update.due_in_one_month_reminder_sent == Some(true)
            && record.due_in_one_month_reminder_sent)
            || (update.due_for_visit_reminder_sent == Some(true) && record.due_for_visit_reminder_sent);
        if cycle_moved || already_raised {
            return Ok(None);
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(next) = update.next_reminder {
            record.next_reminder = next;
        }
        if let Some(sent) = update.due_in_one_month_reminder_sent {
            record.due_in_one_month_reminder_sent = sent;
        }
        if let Some(sent) = update.due_for_visit_reminder_sent {
            record.due_for_visit_reminder_sent = sent;
        }
        if let Some(enabled) = update.reminder_enabled {
            record.reminder_enabled = enabled;
        }
        Ok(Some(record.clone()))
    }

    async fn list_records(&self, patient_id: i64) -> Result<Vec<PatientGuideRecord>> {
        self.check_available()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .collect())
    }

    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<PatientGuideView>> {
        let guides = self.guides.lock().unwrap().clone();
        Ok(self
            .list_records(patient_id)
            .await?
            .into_iter()
            .map(|r| {
                let guide = guides.iter().find(|g| g.guide_id == r.guide_id);
                PatientGuideView {
                    patient_id: r.patient_id,
                    well_guide_id: r.guide_id,
                    last_appointment_date: Some(r.last_appointment_date),
                    well_guide_status: Some(r.status),
                    well_guide_name: guide.map(|g| g.name.clone()),
                    well_guide_speciality: guide.and_then(|g| g.speciality.clone()),
                    well_guide_description: guide.and_then(|g| g.description.clone()),
                    well_guide_image_url: guide.and_then(|g| g.image_url.clone()),
                    start_time: None,
                    booking_time_zone: None,
                }
            })
            .collect())
    }
}

#[async_trait]
impl GuideCatalogStore for InMemoryStore {
    async fn list_all_guides(&self) -> Result<Vec<GuideDefinition>> {
        self.check_available()?;
        Ok(self.guides.lock().unwrap().clone())
    }
}

pub fn service(store: &Arc<InMemoryStore>) -> WellGuideService {
    WellGuideService::with_parts(
        store.clone(),
        store.clone(),
        Arc::new(StaticRecurrenceCatalog::from_entries([(DENTAL, 6), (SKIN, 12)])),
    )
}

pub fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
}

pub fn months_before(as_of: DateTime<Utc>, months: f64) -> DateTime<Utc> {
    as_of - Duration::milliseconds((months * MILLIS_PER_AVERAGE_MONTH) as i64)
}

pub fn guide(guide_id: i64, name: &str) -> GuideDefinition {
    GuideDefinition {
        guide_id,
        name: name.to_string(),
        speciality: Some("General Practice".to_string()),
        description: None,
        image_url: None,
        recurrence_months: None,
    }
}
