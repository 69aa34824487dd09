use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CarePlan {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CareTask {
    pub id: Uuid,
    pub care_plan_id: Option<Uuid>,
    pub title: String,
    pub category: String,
    pub reminder_time: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Active task joined with its completion state for one local day.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TodayTask {
    pub id: Uuid,
    pub care_plan_id: Option<Uuid>,
    pub title: String,
    pub category: String,
    pub reminder_time: Option<String>,
    pub notes: Option<String>,
    pub completed: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct GoalRow {
    pub id: Uuid,
    pub title: String,
    pub current_value: f64,
    pub target_value: f64,
    pub unit: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
