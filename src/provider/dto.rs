use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{care::TaskProgress, mood::MoodEntry, users::Profile};

#[derive(Debug, Serialize, FromRow)]
pub struct LinkedPatient {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub onboarding_name: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub linked_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct PatientSummary {
    pub profile: Profile,
    pub recent_moods: Vec<MoodEntry>,
    pub today_tasks: TaskProgress,
}

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_for: OffsetDateTime,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    pub notes: Option<String>,
}

fn default_duration() -> i32 {
    30
}

#[derive(Debug, Serialize, FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub patient_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_for: OffsetDateTime,
    pub duration_minutes: i32,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Body of a note or a message.
#[derive(Debug, Deserialize)]
pub struct BodyRequest {
    pub body: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ProviderNote {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub patient_id: Uuid,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ProviderMessage {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub provider_name: Option<String>,
    pub patient_id: Uuid,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appointment_defaults_to_half_hour() {
        let req: CreateAppointmentRequest =
            serde_json::from_str(r#"{"scheduled_for":"2024-07-01T15:00:00Z"}"#).unwrap();
        assert_eq!(req.duration_minutes, 30);
        assert_eq!(req.scheduled_for.hour(), 15);
        assert!(serde_json::from_str::<CreateAppointmentRequest>(r#"{"scheduled_for":"tomorrow"}"#).is_err());
    }
}
