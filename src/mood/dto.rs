use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 10;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MoodEntry {
    pub id: Uuid,
    pub score: i32,
    pub label: Option<String>,
    pub note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateMoodRequest {
    pub score: i32,
    pub label: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}
fn default_days() -> i64 {
    30
}

#[derive(Debug, Serialize)]
pub struct MoodSummary {
    pub days: i64,
    pub count: i64,
    /// One decimal place; `None` when there are no entries.
    pub average: Option<f64>,
    pub latest: Option<MoodEntry>,
}

impl MoodSummary {
    pub fn from_entries(days: i64, entries: &[MoodEntry]) -> Self {
        let count = entries.len() as i64;
        let average = (count > 0).then(|| {
            let sum: i64 = entries.iter().map(|e| e.score as i64).sum();
            (sum as f64 / count as f64 * 10.0).round() / 10.0
        });
        let latest = entries.iter().max_by_key(|e| e.created_at).cloned();
        Self {
            days,
            count,
            average,
            latest,
        }
    }
}
