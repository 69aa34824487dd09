use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Check-in category. Stored and routed in kebab-case (`doctors-orders`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionKind {
    Morning,
    Evening,
    Mood,
    Nutrition,
    Diet,
    DoctorsOrders,
    General,
}

impl SessionKind {
    pub const ALL: [SessionKind; 7] = [
        SessionKind::Morning,
        SessionKind::Evening,
        SessionKind::Mood,
        SessionKind::Nutrition,
        SessionKind::Diet,
        SessionKind::DoctorsOrders,
        SessionKind::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::Morning => "morning",
            SessionKind::Evening => "evening",
            SessionKind::Mood => "mood",
            SessionKind::Nutrition => "nutrition",
            SessionKind::Diet => "diet",
            SessionKind::DoctorsOrders => "doctors-orders",
            SessionKind::General => "general",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub kind: String,
    pub session_date: Date,
    pub completed: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct MessageRow {
    pub role: String,
    pub text: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct SessionSummaryRow {
    pub id: Uuid,
    pub kind: String,
    pub session_date: Date,
    pub completed: bool,
    pub created_at: OffsetDateTime,
    pub message_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_round_trip_through_str_and_serde() {
        for kind in SessionKind::ALL {
            assert_eq!(SessionKind::parse(kind.as_str()), Some(kind));
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert_eq!(SessionKind::parse("lunch"), None);
    }
}
