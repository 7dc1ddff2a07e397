use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    EnableReminder, NumberOrString, SubmitAppointment, UpdateWellGuideRequest,
    WellGuideError, WellGuideReminderRequest,
};
use crate::services::WellGuideService;

pub const API_VERSION_HEADER: &str = "accept-version";

/// Versions of the appointment update contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    /// `off_set` optional, UTC assumed.
    V100,
    /// `off_set` required.
    V110,
}

impl ApiVersion {
    /// Absent header means the latest version.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, WellGuideError> {
        let Some(value) = headers.get(API_VERSION_HEADER) else {
            return Ok(ApiVersion::V110);
        };

        match value.to_str().map(str::trim) {
            Ok("1.0.0") => Ok(ApiVersion::V100),
            Ok("1.1.0") => Ok(ApiVersion::V110),
            Ok(other) => Err(WellGuideError::UnsupportedVersion(other.to_string())),
            Err(_) => Err(WellGuideError::UnsupportedVersion("<non-ascii>".to_string())),
        }
    }

    pub fn requires_offset(&self) -> bool {
        matches!(self, ApiVersion::V110)
    }
}

impl From<WellGuideError> for AppError {
    fn from(err: WellGuideError) -> Self {
        match err {
            WellGuideError::MissingIdentity => AppError::BadRequest(err.to_string()),
            WellGuideError::UnknownGuide(_) => AppError::BadRequest(err.to_string()),
            WellGuideError::UnsupportedVersion(_) => AppError::BadRequest(err.to_string()),
            WellGuideError::InvalidTimestamp(_) => AppError::ValidationError(err.to_string()),
            WellGuideError::InvalidInput(_) => AppError::ValidationError(err.to_string()),
            WellGuideError::RecordNotFound { .. } => AppError::NotFound(err.to_string()),
            WellGuideError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}

fn parse_patient_id(raw: &str) -> Result<i64, WellGuideError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or(WellGuideError::MissingIdentity)
}

fn parse_guide_id(value: &NumberOrString) -> Result<i64, WellGuideError> {
    value
        .as_i64()
        .filter(|id| *id > 0)
        .ok_or_else(|| WellGuideError::InvalidInput(format!(
            "well_guide_id must be a positive integer, got '{}'",
            value.to_text()
        )))
}

/// Validates an update body against the requested contract version.
pub fn submission_from_request(
    version: ApiVersion,
    request: UpdateWellGuideRequest,
) -> Result<SubmitAppointment, WellGuideError> {
    let guide_id = parse_guide_id(&request.well_guide_id)?;

    if version.requires_offset() && request.off_set.is_none() {
        return Err(WellGuideError::InvalidInput("off_set is required".to_string()));
    }

    Ok(SubmitAppointment {
        guide_id,
        last_appointment_date: request.last_appointment_date.to_text(),
        utc_offset: request.off_set,
    })
}

#[axum::debug_handler]
pub async fn list_well_guides(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = WellGuideService::new(&config);

    let guides = service.list_guides().await?;

    Ok(Json(json!({ "data": guides })))
}

#[axum::debug_handler]
pub async fn get_patient_well_guides(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let patient_id = parse_patient_id(&patient_id)?;
    let service = WellGuideService::new(&config);

    let records = service.patient_guides(patient_id).await?;

    Ok(Json(json!({ "data": records })))
}

#[axum::debug_handler]
pub async fn update_well_guide_detail(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<UpdateWellGuideRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = parse_patient_id(&patient_id)?;
    let version = ApiVersion::from_headers(&headers)?;
    let submission = submission_from_request(version, request).map_err(|e| {
        warn!("Rejected well guide update for patient {}: {}", patient_id, e);
        e
    })?;

    let service = WellGuideService::new(&config);
    let record = service
        .record_appointment(patient_id, submission, Utc::now())
        .await?;

    Ok(Json(json!({ "data": record })))
}

#[axum::debug_handler]
pub async fn enable_reminder(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<String>,
    Json(request): Json<WellGuideReminderRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = parse_patient_id(&patient_id)?;
    let guide_id = parse_guide_id(&request.well_guide_id)?;

    let service = WellGuideService::new(&config);
    let update = service
        .enable_reminder(
            patient_id,
            EnableReminder { guide_id, reminder_enabled: request.reminder },
            Utc::now().date_naive(),
        )
        .await?;

    Ok(Json(json!({
        "data": update.record,
        "nextReminderMonth": update.next_routine.month,
        "nextReminderYear": update.next_routine.year,
    })))
}

#[axum::debug_handler]
pub async fn refresh_well_guides(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let patient_id = parse_patient_id(&patient_id)?;
    let service = WellGuideService::new(&config);

    let records = service.refresh_patient_guides(patient_id, Utc::now()).await?;

    Ok(Json(json!({ "data": records })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::http::HeaderValue;

    #[test]
    fn test_version_dispatch() {
        let mut headers = HeaderMap::new();
        assert_eq!(ApiVersion::from_headers(&headers).unwrap(), ApiVersion::V110);

        headers.insert(API_VERSION_HEADER, HeaderValue::from_static("1.0.0"));
        assert_eq!(ApiVersion::from_headers(&headers).unwrap(), ApiVersion::V100);

        headers.insert(API_VERSION_HEADER, HeaderValue::from_static("2.0.0"));
        assert_matches!(
            ApiVersion::from_headers(&headers),
            Err(WellGuideError::UnsupportedVersion(v)) if v == "2.0.0"
        );
    }

    #[test]
    fn test_patient_id_parsing() {
        assert_eq!(parse_patient_id("42").unwrap(), 42);
        assert_matches!(parse_patient_id("0"), Err(WellGuideError::MissingIdentity));
        assert_matches!(parse_patient_id("-3"), Err(WellGuideError::MissingIdentity));
        assert_matches!(parse_patient_id("null"), Err(WellGuideError::MissingIdentity));
    }

    #[test]
    fn test_offset_required_only_on_latest_version() {
        let request = UpdateWellGuideRequest {
            last_appointment_date: NumberOrString::Text("1760000000000".to_string()),
            well_guide_id: NumberOrString::Text("3".to_string()),
            off_set: None,
        };

        let legacy = submission_from_request(ApiVersion::V100, request.clone()).unwrap();
        assert_eq!(legacy.guide_id, 3);
        assert_eq!(legacy.utc_offset, None);

        assert_matches!(
            submission_from_request(ApiVersion::V110, request),
            Err(WellGuideError::InvalidInput(_))
        );
    }

    #[test]
    fn test_guide_id_must_be_positive() {
        let request = UpdateWellGuideRequest {
            last_appointment_date: NumberOrString::Number(1_760_000_000_000),
            well_guide_id: NumberOrString::Number(0),
            off_set: Some("+00:00".to_string()),
        };
        assert_matches!(
            submission_from_request(ApiVersion::V110, request),
            Err(WellGuideError::InvalidInput(_))
        );
    }

    #[test]
    fn test_error_mapping() {
        assert_matches!(AppError::from(WellGuideError::UnknownGuide(9)), AppError::BadRequest(_));
        assert_matches!(
            AppError::from(WellGuideError::RecordNotFound { patient_id: 1, guide_id: 2 }),
            AppError::NotFound(_)
        );
        assert_matches!(
            AppError::from(WellGuideError::Store(anyhow::anyhow!("down"))),
            AppError::Database(msg) if msg == "down"
        );
    }
}
