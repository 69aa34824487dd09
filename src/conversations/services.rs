use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{MessageDto, SendMessageResponse, TodayConversation},
    repo,
    repo_types::SessionKind,
};
use crate::{
    assistant::ChatTurn,
    audit,
    auth::repo_types::User,
    calendar::{self, DayPart},
    error::{ApiError, ApiResult},
    state::AppState,
};

pub const MAX_MESSAGE_LEN: usize = 4000;
const MAX_GREETING_LEN: usize = 1000;

pub const FALLBACK_REPLY: &str =
    "I'm having a little trouble responding right now. Could you tell me a bit more?";

pub fn greeting(kind: SessionKind, part: DayPart, name: &str) -> String {
    let salutation = part.salutation();
    let name = name.trim();
    let addressed = if name.is_empty() {
        String::new()
    } else {
        format!(", {name}")
    };
    match kind {
        SessionKind::Morning => {
            format!("{salutation}{addressed}! How did you sleep last night?")
        }
        SessionKind::Evening => format!("{salutation}{addressed}! How was your day today?"),
        SessionKind::Mood => format!("{salutation}{addressed}. How are you feeling right now?"),
        SessionKind::Nutrition => {
            format!("{salutation}{addressed}! What have you eaten so far today?")
        }
        SessionKind::Diet => format!(
            "{salutation}{addressed}! Let's check in on your eating plan. How has it been going?"
        ),
        SessionKind::DoctorsOrders => format!(
            "{salutation}{addressed}. Have you been able to follow your doctor's instructions today?"
        ),
        SessionKind::General => {
            format!("{salutation}{addressed}! It's Emma. What's on your mind?")
        }
    }
}

pub fn system_prompt(kind: SessionKind, name: &str) -> String {
    let focus = match kind {
        SessionKind::Morning => {
            "This is a short morning check-in. Ask about sleep, energy and plans for the day."
        }
        SessionKind::Evening => {
            "This is a short evening reflection. Ask about the day, wins, and how they feel winding down."
        }
        SessionKind::Mood => {
            "This is a mood check-in. Help them name how they feel and offer one gentle coping idea."
        }
        SessionKind::Nutrition => {
            "This is a nutrition check-in. Ask what they ate and encourage balanced choices without judgement."
        }
        SessionKind::Diet => {
            "This is a check-in about their eating plan. Ask how the plan is going and what is hard."
        }
        SessionKind::DoctorsOrders => {
            "This is a check-in about their doctor's instructions: medications, activity limits and appointments. Never give medical advice beyond encouraging them to follow their care team."
        }
        SessionKind::General => "This is an open conversation. Listen and respond warmly.",
    };
    let who = if name.trim().is_empty() {
        "the user".to_string()
    } else {
        name.trim().to_string()
    };
    format!(
        "You are Emma, a warm and concise wellness companion talking with {who}. {focus} \
         Keep replies to two or three sentences and ask at most one question. \
         When the check-in feels finished, close with a friendly sign-off such as \
         \"Have a great day!\" or \"Sleep well!\"."
    )
}

/// Heuristic: the assistant signed off, so the check-in is done.
pub fn is_closing_reply(reply: &str) -> bool {
    lazy_static! {
        static ref CLOSING_RE: Regex = Regex::new(
            r"(?i)\b(have a (great|good|wonderful|lovely|nice|restful) (day|night|evening|morning|afternoon|rest of your day)|talk (to you )?(soon|later|tomorrow)|see you (tomorrow|later|soon|tonight)|good ?night|sleep well|sweet dreams|until next time)\b"
        )
        .unwrap();
    }
    CLOSING_RE.is_match(reply)
}

/// Offset and preferred name, or UTC and no name when the profile is unavailable.
async fn caller_context(state: &AppState, user_id: Uuid) -> (i32, String) {
    match User::find_by_id(&state.db, user_id).await {
        Ok(Some(user)) => (user.utc_offset_minutes, user.preferred_name().to_string()),
        Ok(None) => {
            warn!(%user_id, "profile missing; unpersonalized greeting");
            (0, String::new())
        }
        Err(e) => {
            warn!(error = %e, %user_id, "profile lookup failed; unpersonalized greeting");
            (0, String::new())
        }
    }
}

fn greeting_for_now(kind: SessionKind, offset_minutes: i32, name: &str) -> (String, OffsetDateTime) {
    let now = calendar::local_now(offset_minutes);
    (greeting(kind, DayPart::from_hour(now.hour()), name), now)
}

pub async fn today(state: &AppState, user_id: Uuid, kind: SessionKind) -> ApiResult<TodayConversation> {
    let (offset, name) = caller_context(state, user_id).await;
    let day = calendar::local_today(offset);

    if let Some(session) = repo::find_session_for_day(&state.db, user_id, kind, day).await? {
        let messages = repo::list_messages(&state.db, session.id)
            .await?
            .into_iter()
            .map(MessageDto::from)
            .collect();
        return Ok(TodayConversation {
            kind,
            session_id: Some(session.id),
            completed: session.completed,
            messages,
        });
    }

    let (text, now) = greeting_for_now(kind, offset, &name);
    Ok(TodayConversation {
        kind,
        session_id: None,
        completed: false,
        messages: vec![MessageDto {
            role: "assistant".into(),
            text,
            created_at: now,
        }],
    })
}

pub async fn send(
    state: &AppState,
    user_id: Uuid,
    kind: SessionKind,
    text: &str,
    client_greeting: Option<&str>,
) -> ApiResult<SendMessageResponse> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("Message text is required"));
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::bad_request(format!(
            "Message must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }

    let (offset, name) = caller_context(state, user_id).await;
    let day = calendar::local_today(offset);

    let existing = repo::find_session_for_day(&state.db, user_id, kind, day).await?;
    let (history, opening) = match &existing {
        Some(session) => {
            let turns = repo::list_messages(&state.db, session.id)
                .await?
                .into_iter()
                .map(|m| ChatTurn { role: m.role, text: m.text })
                .collect::<Vec<_>>();
            (turns, None)
        }
        None => {
            let opening = client_greeting
                .map(str::trim)
                .filter(|g| !g.is_empty() && g.chars().count() <= MAX_GREETING_LEN)
                .map(str::to_string)
                .unwrap_or_else(|| greeting_for_now(kind, offset, &name).0);
            (vec![ChatTurn::assistant(opening.clone())], Some(opening))
        }
    };

    let (reply, answered) = match state
        .assistant
        .complete(&system_prompt(kind, &name), &history, text)
        .await
    {
        Ok(reply) => (reply, true),
        Err(e) => {
            warn!(error = %e, %user_id, kind = kind.as_str(), "assistant unavailable; fallback reply");
            (FALLBACK_REPLY.to_string(), false)
        }
    };
    let closing = answered && is_closing_reply(&reply);

    let mut tx = state.db.begin().await?;
    let (session_id, created) = repo::upsert_session_tx(&mut tx, user_id, kind, day).await?;
    if created {
        if let Some(opening) = &opening {
            repo::insert_message_tx(&mut tx, session_id, "assistant", opening).await?;
        }
    }
    repo::insert_message_tx(&mut tx, session_id, "user", text).await?;
    repo::insert_message_tx(&mut tx, session_id, "assistant", &reply).await?;
    let completed = repo::touch_completed_tx(&mut tx, session_id, closing).await?;
    tx.commit().await?;

    info!(%user_id, %session_id, kind = kind.as_str(), created, completed, "check-in message stored");
    audit::record(
        &state.db,
        Some(user_id),
        "conversation.message",
        json!({ "kind": kind.as_str(), "completed": completed }),
    )
    .await;
    Ok(SendMessageResponse {
        session_id,
        reply,
        completed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_uses_day_part_and_name() {
        let g = greeting(SessionKind::Morning, DayPart::Morning, "Emma");
        assert_eq!(g, "Good morning, Emma! How did you sleep last night?");
        let g = greeting(SessionKind::Morning, DayPart::Evening, "Emma");
        assert!(g.starts_with("Good evening, Emma!"));
    }

    #[test]
    fn greeting_without_name_has_no_dangling_comma() {
        let g = greeting(SessionKind::Mood, DayPart::Afternoon, "  ");
        assert_eq!(g, "Good afternoon. How are you feeling right now?");
    }

    #[test]
    fn every_kind_has_distinct_greeting() {
        let mut seen = std::collections::HashSet::new();
        for kind in SessionKind::ALL {
            assert!(seen.insert(greeting(kind, DayPart::Morning, "")));
        }
    }

    #[test]
    fn system_prompt_mentions_name_and_focus() {
        let p = system_prompt(SessionKind::DoctorsOrders, "Emma");
        assert!(p.contains("talking with Emma"));
        assert!(p.contains("doctor's instructions"));
        assert!(system_prompt(SessionKind::General, "").contains("talking with the user"));
    }

    #[test]
    fn closing_heuristic() {
        assert!(is_closing_reply("Thanks for sharing. Have a great day!"));
        assert!(is_closing_reply("That sounds lovely. Sleep well, Emma."));
        assert!(is_closing_reply("Goodnight!"));
        assert!(is_closing_reply("I'll talk to you tomorrow."));
        assert!(is_closing_reply("See you later"));
        assert!(!is_closing_reply("How did you sleep?"));
        assert!(!is_closing_reply("What would make today a great day?"));
        assert!(!is_closing_reply(FALLBACK_REPLY));
    }

    #[tokio::test]
    async fn send_rejects_blank_text_before_touching_db() {
        let state = AppState::fake();
        let err = send(&state, Uuid::new_v4(), SessionKind::General, "   ", None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Message text is required");
    }

    #[tokio::test]
    async fn send_rejects_oversized_text() {
        let state = AppState::fake();
        let long = "a".repeat(MAX_MESSAGE_LEN + 1);
        let err = send(&state, Uuid::new_v4(), SessionKind::General, &long, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
