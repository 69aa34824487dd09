use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use super::{
    jwt::JwtKeys,
    repo,
    repo_types::Role,
    services::{cookie_value, SESSION_COOKIE},
};
use crate::{error::ApiError, state::AppState};

/// Authenticated caller and their role.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Any active user, by bearer access token or session cookie.
pub struct AuthUser(pub Uuid);

/// Users with the admin role.
pub struct AdminUser(pub Uuid);

/// Providers, and admins acting as providers.
pub struct ProviderUser(pub Principal);

enum Credential<'a> {
    Bearer(&'a str),
    Session(&'a str),
}

fn credential(parts: &Parts) -> Result<Credential<'_>, ApiError> {
    if let Some(auth) = parts.headers.get(header::AUTHORIZATION) {
        let auth = auth
            .to_str()
            .map_err(|_| ApiError::unauthorized("Invalid Authorization header"))?;
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header"))?;
        return Ok(Credential::Bearer(token.trim()));
    }
    cookie_value(&parts.headers, SESSION_COOKIE)
        .map(Credential::Session)
        .ok_or_else(|| ApiError::unauthorized("Missing credentials"))
}

pub async fn authenticate(parts: &Parts, state: &AppState) -> Result<Principal, ApiError> {
    let user_id = match credential(parts)? {
        Credential::Bearer(token) => {
            let keys = JwtKeys::from_config(&state.config.jwt);
            match keys.verify_access(token) {
                Ok(claims) => claims.sub,
                Err(e) => {
                    warn!(error = %e, "invalid or expired token");
                    return Err(ApiError::unauthorized("Invalid or expired token"));
                }
            }
        }
        Credential::Session(token) => repo::find_session_user(&state.db, token)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Session expired"))?,
    };

    match repo::find_principal(&state.db, user_id).await? {
        Some(row) if row.is_active => Ok(Principal {
            user_id: row.id,
            role: Role::parse(&row.role),
        }),
        _ => {
            warn!(%user_id, "credential for missing or inactive account");
            Err(ApiError::unauthorized("Account not found or inactive"))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(AuthUser(authenticate(parts, state).await?.user_id))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = authenticate(parts, state).await?;
        if !principal.is_admin() {
            warn!(user_id = %principal.user_id, "admin route denied");
            return Err(ApiError::forbidden("Admin access required"));
        }
        Ok(AdminUser(principal.user_id))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ProviderUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = authenticate(parts, state).await?;
        match principal.role {
            Role::Provider | Role::Admin => Ok(ProviderUser(principal)),
            Role::Member => Err(ApiError::forbidden("Provider access required")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    fn parts_with(header_name: Option<(header::HeaderName, &'static str)>) -> Parts {
        let mut req = Request::builder().uri("/me");
        if let Some((k, v)) = header_name {
            req = req.header(k, v);
        }
        req.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_credentials_are_rejected_before_db() {
        let state = AppState::fake();
        let err = authenticate(&parts_with(None), &state).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Missing credentials");
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_rejected() {
        let state = AppState::fake();
        let parts = parts_with(Some((header::AUTHORIZATION, "Basic Zm9vOmJhcg==")));
        let err = authenticate(&parts, &state).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid Authorization header");
    }

    #[tokio::test]
    async fn garbage_bearer_is_rejected() {
        let state = AppState::fake();
        let parts = parts_with(Some((header::AUTHORIZATION, "Bearer not-a-jwt")));
        let err = authenticate(&parts, &state).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Invalid or expired token");
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let req = Request::builder()
            .header(header::AUTHORIZATION, "Bearer abc")
            .header(header::COOKIE, "session=xyz")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        assert!(matches!(credential(&req), Ok(Credential::Bearer("abc"))));
        let cookie_only = parts_with(Some((header::COOKIE, "session=xyz")));
        assert!(matches!(credential(&cookie_only), Ok(Credential::Session("xyz"))));
    }
}
