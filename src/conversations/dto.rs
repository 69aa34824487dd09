use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{MessageRow, SessionKind, SessionSummaryRow};
use crate::calendar::iso_date;

#[derive(Debug, Clone, Serialize)]
pub struct MessageDto {
    pub role: String,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<MessageRow> for MessageDto {
    fn from(m: MessageRow) -> Self {
        Self {
            role: m.role,
            text: m.text,
            created_at: m.created_at,
        }
    }
}

/// Today's transcript, or a synthesized greeting when nothing exists yet.
#[derive(Debug, Serialize)]
pub struct TodayConversation {
    pub kind: SessionKind,
    pub session_id: Option<Uuid>,
    pub completed: bool,
    pub messages: Vec<MessageDto>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
    /// Greeting the client showed, persisted when this message opens the session.
    pub greeting: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub session_id: Uuid,
    pub reply: String,
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub kind: Option<SessionKind>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}
fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub kind: String,
    #[serde(with = "iso_date")]
    pub session_date: Date,
    pub completed: bool,
    pub message_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<SessionSummaryRow> for SessionSummary {
    fn from(r: SessionSummaryRow) -> Self {
        Self {
            id: r.id,
            kind: r.kind,
            session_date: r.session_date,
            completed: r.completed,
            message_count: r.message_count,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionDetails {
    pub id: Uuid,
    pub kind: String,
    #[serde(with = "iso_date")]
    pub session_date: Date,
    pub completed: bool,
    pub messages: Vec<MessageDto>,
}
