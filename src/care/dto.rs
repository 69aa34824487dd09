use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{GoalRow, TodayTask};
use crate::metrics::calculate_progress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Medication,
    Activity,
    Measurement,
    Habit,
}

impl TaskCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskCategory::Medication => "medication",
            TaskCategory::Activity => "activity",
            TaskCategory::Measurement => "measurement",
            TaskCategory::Habit => "habit",
        }
    }
}

/// `HH:MM`, 24-hour clock.
pub fn is_valid_reminder(s: &str) -> bool {
    lazy_static! {
        static ref REMINDER_RE: Regex = Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").unwrap();
    }
    REMINDER_RE.is_match(s)
}

#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub category: TaskCategory,
    pub reminder_time: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGoalRequest {
    pub title: String,
    pub target_value: f64,
    #[serde(default)]
    pub current_value: f64,
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GoalProgressRequest {
    pub current_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskProgress {
    pub completed: u32,
    pub total: u32,
    pub percent: u8,
}

impl TaskProgress {
    pub fn of(tasks: &[TodayTask]) -> Self {
        let total = tasks.len() as u32;
        let completed = tasks.iter().filter(|t| t.completed).count() as u32;
        Self {
            completed,
            total,
            percent: calculate_progress(completed as f64, total as f64),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Goal {
    pub id: Uuid,
    pub title: String,
    pub current_value: f64,
    pub target_value: f64,
    pub unit: Option<String>,
    pub progress_percent: u8,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<GoalRow> for Goal {
    fn from(r: GoalRow) -> Self {
        Self {
            progress_percent: calculate_progress(r.current_value, r.target_value),
            id: r.id,
            title: r.title,
            current_value: r.current_value,
            target_value: r.target_value,
            unit: r.unit,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(completed: bool) -> TodayTask {
        TodayTask {
            id: Uuid::new_v4(),
            care_plan_id: None,
            title: "Take vitamins".into(),
            category: "medication".into(),
            reminder_time: None,
            notes: None,
            completed,
        }
    }

    #[test]
    fn reminder_format() {
        assert!(is_valid_reminder("08:30"));
        assert!(is_valid_reminder("23:59"));
        assert!(!is_valid_reminder("24:00"));
        assert!(!is_valid_reminder("8:30"));
        assert!(!is_valid_reminder("08:60"));
    }

    #[test]
    fn progress_counts_completed() {
        assert_eq!(
            TaskProgress::of(&[]),
            TaskProgress { completed: 0, total: 0, percent: 0 }
        );
        let p = TaskProgress::of(&[task(true), task(false), task(false), task(true)]);
        assert_eq!((p.completed, p.total, p.percent), (2, 4, 50));
    }

    #[test]
    fn goal_percent_is_clamped() {
        let row = GoalRow {
            id: Uuid::new_v4(),
            title: "Steps".into(),
            current_value: 12_000.0,
            target_value: 10_000.0,
            unit: Some("steps".into()),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        assert_eq!(Goal::from(row.clone()).progress_percent, 100);
        let zero = GoalRow { target_value: 0.0, ..row };
        assert_eq!(Goal::from(zero).progress_percent, 0);
    }

    #[test]
    fn unknown_category_rejected() {
        let bad = serde_json::from_str::<CreateTaskRequest>(r#"{"title":"x","category":"diet"}"#);
        assert!(bad.is_err());
    }
}
