use std::sync::Arc;
use serde_json::{json, Value};

use shared_config::AppConfig;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: Option<String>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_role_key: Some("test-service-role-key".to_string()),
        }
    }
}

impl TestConfig {
    pub fn with_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: self.supabase_service_role_key.clone(),
            port: 3000,
            well_guide_recurrence: None,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Rows shaped like the Supabase REST responses for the well guide tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn well_guide_row(id: i64, name: &str, speciality: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "speciality": speciality,
            "description": format!("Regular {} check", name.to_lowercase()),
            "image_url": format!("https://cdn.example.com/guides/{}.png", id),
            "created_at": "2024-01-01T00:00:00+00:00"
        })
    }

    pub fn user_well_guide_row(
        patient_id: i64,
        well_guide_id: i64,
        last_appointment_date: &str,
        status: &str,
        next_reminder: &str,
    ) -> Value {
        json!({
            "id": patient_id * 1000 + well_guide_id,
            "patient_id": patient_id,
            "well_guide_id": well_guide_id,
            "last_appointment_date": last_appointment_date,
            "status": status,
            "next_reminder": next_reminder,
            "due_in_one_month_reminder": false,
            "due_for_visit_reminder": false,
            "reminder": false,
            "booking_id": null
        })
    }

    pub fn patient_guide_row(patient_id: i64, well_guide_id: i64, name: &str, status: &str) -> Value {
        json!({
            "patient_id": patient_id,
            "well_guide_id": well_guide_id,
            "last_appointment_date": "2026-04-01T09:00:00+00:00",
            "status": status,
            "well_guide": {
                "name": name,
                "speciality": "General Practice",
                "description": null,
                "image_url": null
            },
            "booking": {
                "start_time": "2026-11-02T10:30:00+00:00",
                "booking_time_zone": "Europe/Dublin"
            }
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
