use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        is_valid_reminder, CreateGoalRequest, CreatePlanRequest, CreateTaskRequest, Goal,
        GoalProgressRequest, TaskProgress,
    },
    repo,
    repo_types::{CarePlan, CareTask, TodayTask},
};
use crate::{
    audit,
    auth::extractors::AuthUser,
    calendar,
    error::{is_unique_violation, ApiError, ApiResult},
    state::AppState,
    users,
};

const MAX_TITLE_LEN: usize = 200;
const MAX_TEXT_LEN: usize = 2000;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/care-plans", post(start_plan))
        .route("/care-plans/active", get(active_plan))
        .route("/care-plans/tasks", post(create_task))
        .route("/care-plans/tasks/today", get(today_tasks))
        .route("/care-plans/tasks/:id/complete", post(complete_task))
        .route("/care-plans/tasks/:id", delete(delete_task))
        .route("/care-plans/progress", get(progress))
        .route("/care-plans/goals", get(list_goals).post(create_goal))
        .route("/care-plans/goals/:id/progress", patch(update_goal_progress))
}

fn required_title(title: &str) -> ApiResult<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::bad_request(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title)
}

fn optional_text(s: &Option<String>) -> ApiResult<Option<&str>> {
    let s = s.as_deref().map(str::trim).filter(|s| !s.is_empty());
    if s.is_some_and(|s| s.chars().count() > MAX_TEXT_LEN) {
        return Err(ApiError::bad_request("text is too long"));
    }
    Ok(s)
}

fn check_goal_value(name: &str, v: f64) -> ApiResult<()> {
    if !v.is_finite() || v < 0.0 {
        return Err(ApiError::bad_request(format!("{name} must be a non-negative number")));
    }
    Ok(())
}

async fn local_today(state: &AppState, user_id: Uuid) -> ApiResult<time::Date> {
    let offset = users::repo::utc_offset(&state.db, user_id).await?;
    Ok(calendar::local_today(offset))
}

#[instrument(skip(state, body))]
pub async fn start_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreatePlanRequest>,
) -> ApiResult<(StatusCode, Json<CarePlan>)> {
    let title = required_title(&body.title)?;
    let description = optional_text(&body.description)?;
    let plan = match repo::start_plan(&state.db, user_id, title, description).await {
        Ok(p) => p,
        Err(e) if is_unique_violation(&e) => {
            warn!(%user_id, "concurrent care plan start");
            return Err(ApiError::conflict("Another plan was started at the same time; retry"));
        }
        Err(e) => return Err(e.into()),
    };
    info!(%user_id, plan_id = %plan.id, "care plan started");
    Ok((StatusCode::CREATED, Json(plan)))
}

#[instrument(skip(state))]
pub async fn active_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<CarePlan>> {
    repo::active_plan(&state.db, user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No active care plan"))
}

#[instrument(skip(state, body))]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<CareTask>)> {
    let title = required_title(&body.title)?;
    let reminder = body.reminder_time.as_deref().map(str::trim).filter(|r| !r.is_empty());
    if reminder.is_some_and(|r| !is_valid_reminder(r)) {
        return Err(ApiError::bad_request("reminder_time must be HH:MM"));
    }
    let notes = optional_text(&body.notes)?;
    let task = repo::create_task(&state.db, user_id, title, body.category, reminder, notes).await?;
    info!(%user_id, task_id = %task.id, category = body.category.as_str(), "care task created");
    Ok((StatusCode::CREATED, Json(task)))
}

#[instrument(skip(state))]
pub async fn today_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<TodayTask>>> {
    let day = local_today(&state, user_id).await?;
    Ok(Json(repo::tasks_for_day(&state.db, user_id, day).await?))
}

#[instrument(skip(state))]
pub async fn complete_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !repo::owns_active_task(&state.db, user_id, task_id).await? {
        return Err(ApiError::not_found("Task not found"));
    }
    let day = local_today(&state, user_id).await?;
    if !repo::complete_task(&state.db, task_id, day).await? {
        return Err(ApiError::conflict("Task already completed today"));
    }
    info!(%user_id, %task_id, %day, "care task completed");
    audit::record(&state.db, Some(user_id), "care_task.completed", json!({ "task_id": task_id })).await;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !repo::deactivate_task(&state.db, user_id, task_id).await? {
        return Err(ApiError::not_found("Task not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn progress(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<TaskProgress>> {
    let day = local_today(&state, user_id).await?;
    let tasks = repo::tasks_for_day(&state.db, user_id, day).await?;
    Ok(Json(TaskProgress::of(&tasks)))
}

#[instrument(skip(state, body))]
pub async fn create_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateGoalRequest>,
) -> ApiResult<(StatusCode, Json<Goal>)> {
    let title = required_title(&body.title)?;
    check_goal_value("target_value", body.target_value)?;
    check_goal_value("current_value", body.current_value)?;
    let unit = optional_text(&body.unit)?;
    let row = repo::create_goal(
        &state.db,
        user_id,
        title,
        body.current_value,
        body.target_value,
        unit,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[instrument(skip(state))]
pub async fn list_goals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<Goal>>> {
    let rows = repo::list_goals(&state.db, user_id).await?;
    Ok(Json(rows.into_iter().map(Goal::from).collect()))
}

#[instrument(skip(state, body))]
pub async fn update_goal_progress(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(goal_id): Path<Uuid>,
    Json(body): Json<GoalProgressRequest>,
) -> ApiResult<Json<Goal>> {
    check_goal_value("current_value", body.current_value)?;
    repo::update_goal_progress(&state.db, user_id, goal_id, body.current_value)
        .await?
        .map(|row| Json(row.into()))
        .ok_or_else(|| ApiError::not_found("Goal not found"))
}
