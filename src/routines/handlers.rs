use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::json;
use time::Date;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CompleteRoutineRequest, ListQuery, RoutineSession, StreakQuery, StreakResponse},
    repo,
};
use crate::{
    audit,
    auth::extractors::AuthUser,
    calendar,
    error::{ApiError, ApiResult},
    state::AppState,
    users,
};

const MAX_DURATION_SECONDS: i32 = 24 * 60 * 60;
const MAX_LIMIT: i64 = 365;
const MAX_NOTES_LEN: usize = 2000;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/routines", get(list_sessions).post(complete_routine))
        .route("/routines/streak", get(streak))
}

fn validate(req: &CompleteRoutineRequest) -> ApiResult<()> {
    if !(0..=MAX_DURATION_SECONDS).contains(&req.duration_seconds) {
        return Err(ApiError::bad_request(format!(
            "duration_seconds must be between 0 and {MAX_DURATION_SECONDS}"
        )));
    }
    if req.notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
        return Err(ApiError::bad_request("notes are too long"));
    }
    Ok(())
}

/// Completion date for a new session; defaults to today, never later.
fn completion_day(requested: Option<Date>, today: Date) -> ApiResult<Date> {
    match requested {
        Some(d) if d > today => Err(ApiError::bad_request("completed_on cannot be in the future")),
        Some(d) => Ok(d),
        None => Ok(today),
    }
}

async fn local_today(state: &AppState, user_id: Uuid) -> ApiResult<Date> {
    let offset = users::repo::utc_offset(&state.db, user_id).await?;
    Ok(calendar::local_today(offset))
}

#[instrument(skip(state, body))]
pub async fn complete_routine(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CompleteRoutineRequest>,
) -> ApiResult<(StatusCode, Json<RoutineSession>)> {
    validate(&body)?;
    let day = completion_day(body.completed_on, local_today(&state, user_id).await?)?;
    let notes = body.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let row = repo::insert(&state.db, user_id, body.kind, body.duration_seconds, notes, day).await?;
    info!(%user_id, kind = body.kind.as_str(), %day, "routine completed");
    audit::record(&state.db, Some(user_id), "routine.completed", json!({ "kind": body.kind })).await;
    Ok((StatusCode::CREATED, Json(row)))
}

#[instrument(skip(state))]
pub async fn list_sessions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ListQuery>,
) -> ApiResult<Json<Vec<RoutineSession>>> {
    let rows = repo::list_recent(&state.db, user_id, q.limit.clamp(1, MAX_LIMIT)).await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn streak(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<StreakQuery>,
) -> ApiResult<Json<StreakResponse>> {
    let dates = repo::completion_dates(&state.db, user_id, q.kind).await?;
    let today = local_today(&state, user_id).await?;
    Ok(Json(StreakResponse::new(q.kind, &dates, today)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routines::dto::RoutineKind;

    fn req(duration_seconds: i32) -> CompleteRoutineRequest {
        CompleteRoutineRequest {
            kind: RoutineKind::Morning,
            duration_seconds,
            notes: None,
            completed_on: None,
        }
    }

    #[test]
    fn duration_bounds() {
        assert!(validate(&req(0)).is_ok());
        assert!(validate(&req(900)).is_ok());
        assert!(validate(&req(-1)).is_err());
        assert!(validate(&req(MAX_DURATION_SECONDS + 1)).is_err());
    }

    #[test]
    fn completion_day_defaults_to_today_and_rejects_future() {
        let today = time::macros::date!(2024 - 05 - 10);
        assert_eq!(completion_day(None, today).unwrap(), today);
        let yesterday = time::macros::date!(2024 - 05 - 09);
        assert_eq!(completion_day(Some(yesterday), today).unwrap(), yesterday);
        let err = completion_day(Some(time::macros::date!(2024 - 05 - 15)), today).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
