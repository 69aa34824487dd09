use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument};

use super::{
    dto::{CreateMoodRequest, DaysQuery, MoodEntry, MoodSummary, MAX_SCORE, MIN_SCORE},
    repo,
};
use crate::{
    audit,
    auth::extractors::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

const MAX_DAYS: i64 = 365;
const MAX_ENTRIES: i64 = 1000;
const MAX_TEXT_LEN: usize = 2000;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/mood", get(list_entries).post(create_entry))
        .route("/mood/summary", get(summary))
}

fn validate(req: &CreateMoodRequest) -> ApiResult<()> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&req.score) {
        return Err(ApiError::bad_request(format!(
            "score must be between {MIN_SCORE} and {MAX_SCORE}"
        )));
    }
    let too_long = [&req.label, &req.note]
        .into_iter()
        .flatten()
        .any(|s| s.chars().count() > MAX_TEXT_LEN);
    if too_long {
        return Err(ApiError::bad_request("label or note is too long"));
    }
    Ok(())
}

fn clamp_days(days: i64) -> i64 {
    days.clamp(1, MAX_DAYS)
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[instrument(skip(state, body))]
pub async fn create_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateMoodRequest>,
) -> ApiResult<(StatusCode, Json<MoodEntry>)> {
    validate(&body)?;
    let entry = repo::create(
        &state.db,
        user_id,
        body.score,
        non_blank(&body.label),
        non_blank(&body.note),
    )
    .await?;
    info!(%user_id, score = entry.score, "mood logged");
    audit::record(&state.db, Some(user_id), "mood.logged", json!({ "score": entry.score })).await;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[instrument(skip(state))]
pub async fn list_entries(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<DaysQuery>,
) -> ApiResult<Json<Vec<MoodEntry>>> {
    let rows = repo::list_recent(&state.db, user_id, clamp_days(q.days), MAX_ENTRIES).await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<DaysQuery>,
) -> ApiResult<Json<MoodSummary>> {
    let days = clamp_days(q.days);
    let rows = repo::list_recent(&state.db, user_id, days, MAX_ENTRIES).await?;
    Ok(Json(MoodSummary::from_entries(days, &rows)))
}
