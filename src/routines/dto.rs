use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{calendar::iso_date, metrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutineKind {
    Morning,
    Evening,
}

impl RoutineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RoutineKind::Morning => "morning",
            RoutineKind::Evening => "evening",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RoutineSession {
    pub id: Uuid,
    pub kind: String,
    pub duration_seconds: i32,
    pub notes: Option<String>,
    #[serde(with = "iso_date")]
    pub completed_on: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRoutineRequest {
    pub kind: RoutineKind,
    #[serde(default)]
    pub duration_seconds: i32,
    pub notes: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub completed_on: Option<Date>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct StreakQuery {
    pub kind: Option<RoutineKind>,
}

#[derive(Debug, Serialize)]
pub struct StreakResponse {
    pub kind: Option<RoutineKind>,
    pub current: u32,
    pub longest: u32,
    #[serde(with = "iso_date::option")]
    pub last_completed_on: Option<Date>,
}

impl StreakResponse {
    pub fn new(kind: Option<RoutineKind>, dates: &[Date], today: Date) -> Self {
        let streak = metrics::streak(dates, today);
        Self {
            kind,
            current: streak.current,
            longest: streak.longest,
            last_completed_on: dates.iter().filter(|d| **d <= today).max().copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn kind_wire_names() {
        let req: CompleteRoutineRequest =
            serde_json::from_str(r#"{"kind":"evening","duration_seconds":600}"#).unwrap();
        assert_eq!(req.kind, RoutineKind::Evening);
        assert_eq!(req.completed_on, None);
        assert!(serde_json::from_str::<CompleteRoutineRequest>(r#"{"kind":"noon"}"#).is_err());
    }

    #[test]
    fn streak_response_reports_latest_date() {
        let dates = [date!(2024 - 03 - 01), date!(2024 - 03 - 03), date!(2024 - 03 - 02)];
        let res = StreakResponse::new(Some(RoutineKind::Morning), &dates, date!(2024 - 03 - 04));
        assert_eq!((res.current, res.longest), (3, 3));
        assert_eq!(res.last_completed_on, Some(date!(2024 - 03 - 03)));

        let stale = StreakResponse::new(None, &dates, date!(2024 - 04 - 01));
        assert_eq!((stale.current, stale.longest), (0, 3));

        let json =
            serde_json::to_value(StreakResponse::new(None, &[], date!(2024 - 03 - 04))).unwrap();
        assert_eq!(json["current"], 0);
        assert!(json["last_completed_on"].is_null());
    }
}
