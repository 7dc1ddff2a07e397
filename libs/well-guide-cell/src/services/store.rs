use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    BookingReference, GuideDefinition, GuideStatus, PatientGuideRecord, PatientGuideView, RecordUpdate,
};

const RECORD_TABLE: &str = "/rest/v1/user_well_guide";
const GUIDE_TABLE: &str = "/rest/v1/well_guide";

/// Per-patient guide records keyed by (patient, guide).
#[async_trait]
pub trait GuideRecordStore: Send + Sync {
    async fn find(&self, patient_id: i64, guide_id: i64) -> Result<Option<PatientGuideRecord>>;

    /// Atomic create-or-replace on (patient_id, guide_id).
    async fn upsert(&self, record: &PatientGuideRecord) -> Result<PatientGuideRecord>;

    /// Writes only the columns set in `update`. `None` when no row matched,
    /// either because it does not exist or because a guard no longer holds.
    async fn update(
        &self,
        patient_id: i64,
        guide_id: i64,
        update: &RecordUpdate,
    ) -> Result<Option<PatientGuideRecord>>;

    async fn list_records(&self, patient_id: i64) -> Result<Vec<PatientGuideRecord>>;

    /// Records joined with guide metadata and booking details.
    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<PatientGuideView>>;
}

#[async_trait]
pub trait GuideCatalogStore: Send + Sync {
    async fn list_all_guides(&self) -> Result<Vec<GuideDefinition>>;
}

pub struct SupabaseGuideStore {
    supabase: SupabaseClient,
    token: String,
}

impl SupabaseGuideStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            token: config.service_token().to_string(),
        }
    }

    fn prefer(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static(value));
        headers
    }

    fn update_path(patient_id: i64, guide_id: i64, update: &RecordUpdate) -> String {
        let mut path = format!(
            "{}?patient_id=eq.{}&well_guide_id=eq.{}",
            RECORD_TABLE, patient_id, guide_id
        );
        if let Some(appointment) = update.expected_appointment {
            path.push_str(&format!(
                "&last_appointment_date=eq.{}",
                appointment.to_rfc3339_opts(SecondsFormat::Millis, true)
            ));
        }
        if update.due_in_one_month_reminder_sent == Some(true) {
            path.push_str("&due_in_one_month_reminder=not.is.true");
        }
        if update.due_for_visit_reminder_sent == Some(true) {
            path.push_str("&due_for_visit_reminder=not.is.true");
        }
        path
    }
}

#[derive(Debug, Deserialize)]
struct GuideSummaryRow {
    name: Option<String>,
    speciality: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PatientGuideRow {
    patient_id: i64,
    well_guide_id: i64,
    last_appointment_date: Option<DateTime<Utc>>,
    status: Option<GuideStatus>,
    well_guide: Option<GuideSummaryRow>,
    booking: Option<BookingReference>,
}

impl From<PatientGuideRow> for PatientGuideView {
    fn from(row: PatientGuideRow) -> Self {
        let guide = row.well_guide;
        let booking = row.booking.unwrap_or_default();

        Self {
            patient_id: row.patient_id,
            well_guide_id: row.well_guide_id,
            last_appointment_date: row.last_appointment_date,
            well_guide_status: row.status,
            well_guide_name: guide.as_ref().and_then(|g| g.name.clone()),
            well_guide_speciality: guide.as_ref().and_then(|g| g.speciality.clone()),
            well_guide_description: guide.as_ref().and_then(|g| g.description.clone()),
            well_guide_image_url: guide.and_then(|g| g.image_url),
            start_time: booking.start_time,
            booking_time_zone: booking.booking_time_zone,
        }
    }
}

#[async_trait]
impl GuideRecordStore for SupabaseGuideStore {
    async fn find(&self, patient_id: i64, guide_id: i64) -> Result<Option<PatientGuideRecord>> {
        debug!("Looking up well guide {} for patient {}", guide_id, patient_id);

        let path = format!(
            "{}?patient_id=eq.{}&well_guide_id=eq.{}&limit=1",
            RECORD_TABLE, patient_id, guide_id
        );
        let rows: Vec<PatientGuideRecord> = self.supabase.request(
            Method::GET,
            &path,
            Some(&self.token),
            None,
        ).await?;

        Ok(rows.into_iter().next())
    }

    async fn upsert(&self, record: &PatientGuideRecord) -> Result<PatientGuideRecord> {
        let path = format!("{}?on_conflict=patient_id,well_guide_id", RECORD_TABLE);
        let body: Value = serde_json::to_value(record)?;

        let rows: Vec<PatientGuideRecord> = self.supabase.request_with_headers(
            Method::POST,
            &path,
            Some(&self.token),
            Some(body),
            Some(Self::prefer("resolution=merge-duplicates,return=representation")),
        ).await?;

        let saved = rows.into_iter().next().ok_or_else(|| anyhow!(
            "Upsert of well guide {} for patient {} returned no rows",
            record.guide_id, record.patient_id
        ))?;

        info!(
            "Stored well guide {} for patient {} with status {}",
            saved.guide_id, saved.patient_id, saved.status
        );
        Ok(saved)
    }

    async fn update(
        &self,
        patient_id: i64,
        guide_id: i64,
        update: &RecordUpdate,
    ) -> Result<Option<PatientGuideRecord>> {
        let path = Self::update_path(patient_id, guide_id, update);
        let body: Value = serde_json::to_value(update)?;

        let rows: Vec<PatientGuideRecord> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(&self.token),
            Some(body),
            Some(Self::prefer("return=representation")),
        ).await?;

        let saved = rows.into_iter().next();
        match &saved {
            Some(record) => info!(
                "Updated well guide {} for patient {} with status {}",
                guide_id, patient_id, record.status
            ),
            None => debug!(
                "Update of well guide {} for patient {} matched no row",
                guide_id, patient_id
            ),
        }
        Ok(saved)
    }

    async fn list_records(&self, patient_id: i64) -> Result<Vec<PatientGuideRecord>> {
        let path = format!("{}?patient_id=eq.{}&order=well_guide_id.asc", RECORD_TABLE, patient_id);
        self.supabase.request(Method::GET, &path, Some(&self.token), None).await
    }

    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<PatientGuideView>> {
        debug!("Listing well guides for patient {}", patient_id);

        let path = format!(
            "{}?select=patient_id,well_guide_id,last_appointment_date,status,\
             well_guide(name,speciality,description,image_url),\
             booking(start_time,booking_time_zone)\
             &patient_id=eq.{}&order=well_guide_id.asc",
            RECORD_TABLE, patient_id
        );
        let rows: Vec<PatientGuideRow> = self.supabase.request(
            Method::GET,
            &path,
            Some(&self.token),
            None,
        ).await?;

        Ok(rows.into_iter().map(PatientGuideView::from).collect())
    }
}

#[async_trait]
impl GuideCatalogStore for SupabaseGuideStore {
    async fn list_all_guides(&self) -> Result<Vec<GuideDefinition>> {
        let path = format!("{}?select=*&order=id.asc", GUIDE_TABLE);
        self.supabase.request(Method::GET, &path, Some(&self.token), None).await
    }
}
