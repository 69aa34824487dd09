use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        LinkPatientRequest, LogQuery, PatientLink, SetRoleRequest, SetStatusRequest, UsageStats,
        UserListQuery, UserPage,
    },
    repo,
};
use crate::{
    audit::{
        self,
        dto::{AccessLogEntry, AuditLogEntry, ClientErrorEntry},
    },
    auth::{
        self,
        extractors::AdminUser,
        repo_types::Role,
    },
    error::{ApiError, ApiResult},
    provider,
    state::AppState,
    users,
};

const MAX_PAGE_SIZE: i64 = 200;
const MAX_LOG_LIMIT: i64 = 500;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(stats))
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id/status", patch(set_status))
        .route("/admin/users/:id/role", patch(set_role))
        .route("/admin/providers/:id/patients", post(link_patient))
        .route("/admin/audit-logs", get(audit_logs))
        .route("/admin/client-errors", get(client_errors))
        .route("/admin/access-logs", get(access_logs))
}

fn page_bounds(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_PAGE_SIZE), offset.max(0))
}

fn log_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_LOG_LIMIT)
}

#[instrument(skip(state))]
pub async fn stats(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
) -> ApiResult<Json<UsageStats>> {
    let stats = repo::usage_stats(&state.db).await?;
    info!(%admin_id, total_users = stats.total_users, "usage stats computed");
    Ok(Json(stats))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
    Query(q): Query<UserListQuery>,
) -> ApiResult<Json<UserPage>> {
    let (limit, offset) = page_bounds(q.limit, q.offset);
    let search = q.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let (users, total) = repo::list_users(&state.db, search, limit, offset).await?;
    Ok(Json(UserPage {
        users,
        total,
        limit,
        offset,
    }))
}

#[instrument(skip(state, body))]
pub async fn set_status(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetStatusRequest>,
) -> ApiResult<StatusCode> {
    if user_id == admin_id && !body.is_active {
        return Err(ApiError::bad_request("Admins cannot deactivate themselves"));
    }
    if !users::repo::set_active(&state.db, user_id, body.is_active).await? {
        return Err(ApiError::not_found("User not found"));
    }
    if !body.is_active {
        let dropped = auth::repo::delete_user_sessions(&state.db, user_id).await?;
        info!(%user_id, dropped, "sessions revoked");
    }
    audit::record(
        &state.db,
        Some(admin_id),
        "admin.user_status",
        json!({ "user_id": user_id, "is_active": body.is_active }),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, body))]
pub async fn set_role(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetRoleRequest>,
) -> ApiResult<StatusCode> {
    if user_id == admin_id && body.role != Role::Admin {
        return Err(ApiError::bad_request("Admins cannot remove their own admin role"));
    }
    if !repo::set_role(&state.db, user_id, body.role).await? {
        return Err(ApiError::not_found("User not found"));
    }
    audit::record(
        &state.db,
        Some(admin_id),
        "admin.user_role",
        json!({ "user_id": user_id, "role": body.role.as_str() }),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, body))]
pub async fn link_patient(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(provider_id): Path<Uuid>,
    Json(body): Json<LinkPatientRequest>,
) -> ApiResult<(StatusCode, Json<PatientLink>)> {
    if provider_id == body.patient_id {
        return Err(ApiError::bad_request("A provider cannot be their own patient"));
    }
    match auth::repo::find_principal(&state.db, provider_id).await? {
        Some(p) if matches!(Role::parse(&p.role), Role::Provider | Role::Admin) => {}
        Some(_) => return Err(ApiError::bad_request("User is not a provider")),
        None => return Err(ApiError::not_found("Provider not found")),
    }
    if auth::repo::find_principal(&state.db, body.patient_id).await?.is_none() {
        return Err(ApiError::not_found("Patient not found"));
    }

    let created = provider::repo::link_patient(&state.db, provider_id, body.patient_id).await?;
    if !created {
        warn!(%provider_id, patient_id = %body.patient_id, "patient already linked");
    }
    audit::record(
        &state.db,
        Some(admin_id),
        "admin.link_patient",
        json!({ "provider_id": provider_id, "patient_id": body.patient_id }),
    )
    .await;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(PatientLink {
            provider_id,
            patient_id: body.patient_id,
            created,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn audit_logs(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
    Query(q): Query<LogQuery>,
) -> ApiResult<Json<Vec<AuditLogEntry>>> {
    Ok(Json(audit::repo::list_audit_logs(&state.db, log_limit(q.limit)).await?))
}

#[instrument(skip(state))]
pub async fn client_errors(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
    Query(q): Query<LogQuery>,
) -> ApiResult<Json<Vec<ClientErrorEntry>>> {
    Ok(Json(audit::repo::list_client_errors(&state.db, log_limit(q.limit)).await?))
}

#[instrument(skip(state))]
pub async fn access_logs(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
    Query(q): Query<LogQuery>,
) -> ApiResult<Json<Vec<AccessLogEntry>>> {
    Ok(Json(audit::repo::list_access_logs(&state.db, log_limit(q.limit)).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{app::build_app, auth::jwt::JwtKeys};
    use axum::{
        body::Body,
        http::{header, Request},
    };
    use tower::ServiceExt;

    #[test]
    fn paging_is_clamped() {
        assert_eq!(page_bounds(0, -5), (1, 0));
        assert_eq!(page_bounds(10_000, 20), (MAX_PAGE_SIZE, 20));
        assert_eq!(log_limit(-1), 1);
        assert_eq!(log_limit(50), 50);
    }

    #[tokio::test]
    async fn stats_require_credentials() {
        let res = build_app(AppState::fake())
            .oneshot(Request::get("/api/v1/admin/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    mod db {
        use super::*;
        use sqlx::PgPool;
        use std::sync::Arc;

        async fn user_with_role(pool: &PgPool, email: &str, role: &str) -> Uuid {
            sqlx::query_scalar(
                "INSERT INTO users (email, password_hash, role) VALUES ($1, 'x', $2) RETURNING id",
            )
            .bind(email)
            .bind(role)
            .fetch_one(pool)
            .await
            .unwrap()
        }

        fn app_and_token(pool: PgPool, user_id: Uuid) -> (axum::Router, String) {
            let state = AppState::from_parts(
                pool,
                Arc::new(crate::state::test_config()),
                Arc::new(crate::assistant::ScriptedAssistant::new("ok")),
            );
            let token = JwtKeys::from_config(&state.config.jwt).sign_access(user_id).unwrap();
            (build_app(state), format!("Bearer {token}"))
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "requires DATABASE_URL"]
        async fn members_are_forbidden(pool: PgPool) {
            let member = user_with_role(&pool, "m@example.com", "member").await;
            let (app, auth) = app_and_token(pool, member);
            let res = app
                .oneshot(
                    Request::get("/api/v1/admin/stats")
                        .header(header::AUTHORIZATION, auth)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::FORBIDDEN);
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "requires DATABASE_URL"]
        async fn admin_links_provider_to_patient(pool: PgPool) {
            let admin = user_with_role(&pool, "a@example.com", "admin").await;
            let doc = user_with_role(&pool, "doc@example.com", "provider").await;
            let patient = user_with_role(&pool, "p@example.com", "member").await;
            let (app, auth) = app_and_token(pool.clone(), admin);

            let link = |app: axum::Router, target: Uuid| {
                let auth = auth.clone();
                async move {
                    app.oneshot(
                        Request::post(format!("/api/v1/admin/providers/{target}/patients"))
                            .header(header::AUTHORIZATION, auth)
                            .header(header::CONTENT_TYPE, "application/json")
                            .body(Body::from(json!({ "patient_id": patient }).to_string()))
                            .unwrap(),
                    )
                    .await
                    .unwrap()
                    .status()
                }
            };
            assert_eq!(link(app.clone(), doc).await, StatusCode::CREATED);
            assert_eq!(link(app.clone(), doc).await, StatusCode::OK);
            // members cannot be assigned patients
            let other = user_with_role(&pool, "o@example.com", "member").await;
            assert_eq!(link(app, other).await, StatusCode::BAD_REQUEST);
        }
    }
}
