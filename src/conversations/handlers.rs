use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        ListQuery, MessageDto, SendMessageRequest, SendMessageResponse, SessionDetails,
        SessionSummary, TodayConversation,
    },
    repo,
    repo_types::SessionKind,
    services,
};
use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/conversations", get(list_sessions))
        .route("/conversations/sessions/:id", get(get_session))
        .route("/conversations/:kind/today", get(today))
        .route("/conversations/:kind/messages", post(send_message))
}

#[instrument(skip(state))]
pub async fn today(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(kind): Path<SessionKind>,
) -> ApiResult<Json<TodayConversation>> {
    Ok(Json(services::today(&state, user_id, kind).await?))
}

#[instrument(skip(state, body))]
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(kind): Path<SessionKind>,
    Json(body): Json<SendMessageRequest>,
) -> ApiResult<Json<SendMessageResponse>> {
    let res = services::send(&state, user_id, kind, &body.text, body.greeting.as_deref()).await?;
    Ok(Json(res))
}

#[instrument(skip(state))]
pub async fn list_sessions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ListQuery>,
) -> ApiResult<Json<Vec<SessionSummary>>> {
    let rows = repo::list_sessions(&state.db, user_id, q.kind, q.limit.clamp(1, 100)).await?;
    Ok(Json(rows.into_iter().map(SessionSummary::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionDetails>> {
    let session = repo::find_session(&state.db, user_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Conversation not found"))?;
    let messages = repo::list_messages(&state.db, session.id)
        .await?
        .into_iter()
        .map(MessageDto::from)
        .collect();
    Ok(Json(SessionDetails {
        id: session.id,
        kind: session.kind,
        session_date: session.session_date,
        completed: session.completed,
        messages,
    }))
}
