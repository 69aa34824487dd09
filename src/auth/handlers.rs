use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use crate::{
    audit,
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, SignupRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, is_strong_enough, verify_password, MIN_PASSWORD_LEN},
        repo,
        repo_types::{Role, User},
        services::{
            clear_session_cookie, cookie_value, is_valid_email, new_session_token,
            normalize_email, session_cookie, SESSION_COOKIE,
        },
    },
    error::{is_unique_violation, ApiError, ApiResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn issue_tokens(state: &AppState, user: &User) -> ApiResult<AuthResponse> {
    let keys = JwtKeys::from_config(&state.config.jwt);
    let access_token = keys.sign_access(user.id).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        ApiError::Internal(e)
    })?;
    let refresh_token = keys.sign_refresh(user.id).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        ApiError::Internal(e)
    })?;
    Ok(AuthResponse {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role(),
        access_token,
        refresh_token,
    })
}

/// Persist a fresh session row and return its `Set-Cookie` value.
async fn open_session(state: &AppState, user: &User) -> ApiResult<String> {
    let ttl = Duration::days(state.config.session_ttl_days.max(1));
    let token = new_session_token();
    repo::create_session(&state.db, &token, user.id, OffsetDateTime::now_utc() + ttl).await?;
    Ok(session_cookie(
        &token,
        ttl.whole_seconds(),
        state.config.cookie_secure,
    ))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::bad_request("Invalid email"));
    }

    if !is_strong_enough(&payload.password) {
        warn!("password too short");
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(ApiError::conflict("An account with this email already exists"));
    }

    let hash = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "hash_password failed");
        ApiError::Internal(e)
    })?;

    let role = if state.config.is_admin_email(&email) {
        Role::Admin
    } else {
        Role::Member
    };
    let display_name = payload
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let user = match User::create(&state.db, &email, &hash, display_name, role).await {
        Ok(u) => u,
        Err(e) if is_unique_violation(&e) => {
            warn!(%email, "email registered concurrently");
            return Err(ApiError::conflict("An account with this email already exists"));
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(ApiError::Internal(e));
        }
    };

    let tokens = issue_tokens(&state, &user)?;
    let cookie = open_session(&state, &user).await?;

    audit::record(&state.db, Some(user.id), "auth.signup", json!({ "role": role })).await;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(tokens),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::bad_request("Invalid email"));
    }

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(u) if u.is_active => u,
        Some(u) => {
            warn!(user_id = %u.id, "login to deactivated account");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
        None => {
            warn!(%email, "login unknown email");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    let ok = verify_password(&payload.password, &user.password_hash).map_err(|e| {
        error!(error = %e, "verify_password failed");
        ApiError::Internal(e)
    })?;

    if !ok {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let tokens = issue_tokens(&state, &user)?;
    let cookie = open_session(&state, &user).await?;

    audit::record(&state.db, Some(user.id), "auth.login", json!({})).await;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(([(header::SET_COOKIE, cookie)], Json(tokens)))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_config(&state.config.jwt);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        ApiError::unauthorized("Invalid refresh token")
    })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    Ok(Json(issue_tokens(&state, &user)?))
}

#[instrument(skip(state, headers))]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    if let Some(token) = cookie_value(&headers, SESSION_COOKIE) {
        if let Some(user_id) = repo::find_session_user(&state.db, token).await? {
            audit::record(&state.db, Some(user_id), "auth.logout", json!({})).await;
        }
        repo::delete_session(&state.db, token).await?;
    }
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_session_cookie(state.config.cookie_secure))],
    ))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;
    Ok(Json(PublicUser::from(&user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_app;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    async fn post_json(uri: &str, body: serde_json::Value) -> axum::response::Response {
        build_app(AppState::fake())
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn error_text(res: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        v["error"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn signup_rejects_invalid_email() {
        let res = post_json(
            "/api/v1/auth/signup",
            json!({ "email": "nope", "password": "longenough" }),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_text(res).await, "Invalid email");
    }

    #[tokio::test]
    async fn signup_rejects_short_password() {
        let res = post_json(
            "/api/v1/auth/signup",
            json!({ "email": "emma@example.com", "password": "short" }),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(error_text(res).await.contains("at least 8"));
    }

    #[tokio::test]
    async fn refresh_rejects_garbage_token() {
        let res = post_json("/api/v1/auth/refresh", json!({ "refresh_token": "x.y.z" })).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_rejects_access_token() {
        let state = AppState::fake();
        let access = JwtKeys::from_config(&state.config.jwt)
            .sign_access(uuid::Uuid::new_v4())
            .unwrap();
        let res = post_json("/api/v1/auth/refresh", json!({ "refresh_token": access })).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_without_cookie_clears_anyway() {
        let res = build_app(AppState::fake())
            .oneshot(Request::post("/api/v1/auth/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn me_requires_credentials() {
        let res = build_app(AppState::fake())
            .oneshot(Request::get("/api/v1/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn public_user_serialization() {
        let user = crate::auth::repo_types::sample_user();
        let json = serde_json::to_string(&PublicUser::from(&user)).unwrap();
        assert!(json.contains("emma@example.com"));
        assert!(json.contains(r#""role":"member""#));
    }

    mod db {
        use super::*;
        use sqlx::PgPool;
        use std::sync::Arc;

        fn state(pool: PgPool) -> AppState {
            AppState::from_parts(
                pool,
                Arc::new(crate::state::test_config()),
                Arc::new(crate::assistant::ScriptedAssistant::new("ok")),
            )
        }

        async fn signup(app: axum::Router, email: &str) -> axum::response::Response {
            app.oneshot(
                Request::post("/api/v1/auth/signup")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "email": email, "password": "password123" }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap()
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "requires DATABASE_URL"]
        async fn signup_sets_cookie_and_rejects_duplicates(pool: PgPool) {
            let app = build_app(state(pool));

            let res = signup(app.clone(), "emma@example.com").await;
            assert_eq!(res.status(), StatusCode::CREATED);
            let cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
            assert!(cookie.starts_with("session="));
            let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert!(body["user_id"].as_str().is_some());

            let again = signup(app, "Emma@Example.com").await;
            assert_eq!(again.status(), StatusCode::CONFLICT);
            assert!(error_text(again).await.contains("already exists"));
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "requires DATABASE_URL"]
        async fn session_cookie_authenticates_me(pool: PgPool) {
            let app = build_app(state(pool));
            let res = signup(app.clone(), "admin@example.com").await;
            let cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
            let pair = cookie.split(';').next().unwrap().to_string();

            let me = app
                .oneshot(
                    Request::get("/api/v1/me")
                        .header(header::COOKIE, pair)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(me.status(), StatusCode::OK);
            let bytes = axum::body::to_bytes(me.into_body(), usize::MAX).await.unwrap();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["role"], "admin");
        }
    }
}
