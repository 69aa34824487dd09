use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{DailySummary, LogMealRequest, StartPlanRequest, SummaryQuery},
    repo,
    repo_types::{NutritionLog, NutritionPlan},
};
use crate::{
    auth::extractors::AuthUser,
    calendar,
    error::{is_unique_violation, ApiError, ApiResult},
    state::AppState,
    users,
};

const MAX_CALORIES: f64 = 20_000.0;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/nutrition/plans", post(start_plan))
        .route("/nutrition/plans/active", get(active_plan))
        .route("/nutrition/logs", post(log_meal))
        .route("/nutrition/summary", get(daily_summary))
}

fn check_amount(name: &str, v: f64) -> ApiResult<()> {
    if !v.is_finite() || v < 0.0 || v > MAX_CALORIES {
        return Err(ApiError::bad_request(format!("{name} must be between 0 and {MAX_CALORIES}")));
    }
    Ok(())
}

fn validate_plan(req: &StartPlanRequest) -> ApiResult<()> {
    if req.goal.trim().is_empty() {
        return Err(ApiError::bad_request("goal is required"));
    }
    check_amount("daily_calories", req.daily_calories)?;
    check_amount("protein_g", req.protein_g)?;
    check_amount("carbs_g", req.carbs_g)?;
    check_amount("fat_g", req.fat_g)
}

fn validate_log(req: &LogMealRequest) -> ApiResult<()> {
    if req.meal.trim().is_empty() {
        return Err(ApiError::bad_request("meal is required"));
    }
    check_amount("calories", req.calories)?;
    check_amount("protein_g", req.protein_g)?;
    check_amount("carbs_g", req.carbs_g)?;
    check_amount("fat_g", req.fat_g)
}

#[instrument(skip(state, body))]
pub async fn start_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<StartPlanRequest>,
) -> ApiResult<(StatusCode, Json<NutritionPlan>)> {
    validate_plan(&body)?;
    let plan = match repo::start_plan(&state.db, user_id, &body).await {
        Ok(p) => p,
        Err(e) if is_unique_violation(&e) => {
            warn!(%user_id, "concurrent nutrition plan start");
            return Err(ApiError::conflict("Another plan was started at the same time; retry"));
        }
        Err(e) => return Err(e.into()),
    };
    info!(%user_id, plan_id = %plan.id, "nutrition plan started");
    Ok((StatusCode::CREATED, Json(plan)))
}

#[instrument(skip(state))]
pub async fn active_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<NutritionPlan>> {
    repo::active_plan(&state.db, user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No active nutrition plan"))
}

#[instrument(skip(state, body))]
pub async fn log_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<LogMealRequest>,
) -> ApiResult<(StatusCode, Json<NutritionLog>)> {
    validate_log(&body)?;
    let day = match body.logged_on {
        Some(d) => d,
        None => calendar::local_today(users::repo::utc_offset(&state.db, user_id).await?),
    };
    let log = repo::insert_log(&state.db, user_id, day, &body).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

#[instrument(skip(state))]
pub async fn daily_summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<SummaryQuery>,
) -> ApiResult<Json<DailySummary>> {
    let day = match q.date {
        Some(d) => d,
        None => calendar::local_today(users::repo::utc_offset(&state.db, user_id).await?),
    };
    let logs = repo::logs_for_day(&state.db, user_id, day).await?;
    let plan = repo::active_plan(&state.db, user_id).await?;
    Ok(Json(DailySummary::build(day, logs, plan)))
}
