use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::Role;

#[derive(Debug, Default, Serialize)]
pub struct FeatureCounts {
    pub conversations: i64,
    pub messages: i64,
    pub mood_entries: i64,
    pub nutrition_plans: i64,
    pub nutrition_logs: i64,
    pub routine_sessions: i64,
    pub care_plan_tasks: i64,
    pub care_team_members: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TopUser {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub conversations: i64,
    pub routine_sessions: i64,
    pub total: i64,
}

#[derive(Debug, Default, Serialize)]
pub struct UsageStats {
    pub total_users: i64,
    pub active_users: i64,
    pub total_events: i64,
    pub events_today: i64,
    pub events_7d: i64,
    pub events_30d: i64,
    pub active_users_today: i64,
    pub active_users_7d: i64,
    pub active_users_30d: i64,
    pub features: FeatureCounts,
    pub top_users: Vec<TopUser>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct AdminUserRow {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct UserPage {
    pub users: Vec<AdminUserRow>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub search: Option<String>,
    #[serde(default = "default_page_size")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_page_size() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(default = "default_log_limit")]
    pub limit: i64,
}

fn default_log_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LinkPatientRequest {
    pub patient_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PatientLink {
    pub provider_id: Uuid,
    pub patient_id: Uuid,
    pub created: bool,
}
