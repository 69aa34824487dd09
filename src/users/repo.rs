use sqlx::PgPool;
use uuid::Uuid;

use super::dto::{UpdatePreferencesRequest, UpdateProfileRequest};
use crate::auth::{repo::USER_COLUMNS, repo_types::User};

/// Fields left as `None` keep their stored value.
pub async fn update_profile(
    db: &PgPool,
    user_id: Uuid,
    req: &UpdateProfileRequest,
) -> anyhow::Result<Option<User>> {
    let sql = format!(
        "UPDATE users SET \
             display_name = COALESCE($2, display_name), \
             onboarding_name = COALESCE($3, onboarding_name), \
             updated_at = now() \
         WHERE id = $1 AND is_active \
         RETURNING {USER_COLUMNS}"
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .bind(req.display_name.as_deref().map(str::trim))
        .bind(req.onboarding_name.as_deref().map(str::trim))
        .fetch_optional(db)
        .await?;
    Ok(user)
}

pub async fn update_preferences(
    db: &PgPool,
    user_id: Uuid,
    req: &UpdatePreferencesRequest,
) -> anyhow::Result<Option<User>> {
    let sql = format!(
        "UPDATE users SET \
             voice_id = COALESCE($2, voice_id), \
             timezone = COALESCE($3, timezone), \
             utc_offset_minutes = COALESCE($4, utc_offset_minutes), \
             notify_email = COALESCE($5, notify_email), \
             notify_push = COALESCE($6, notify_push), \
             notify_sms = COALESCE($7, notify_sms), \
             updated_at = now() \
         WHERE id = $1 AND is_active \
         RETURNING {USER_COLUMNS}"
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .bind(req.voice_id.as_deref())
        .bind(req.timezone.as_deref().map(str::trim))
        .bind(req.utc_offset_minutes)
        .bind(req.notify_email)
        .bind(req.notify_push)
        .bind(req.notify_sms)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

pub async fn set_active(db: &PgPool, user_id: Uuid, active: bool) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"UPDATE users SET is_active = $2, updated_at = now() WHERE id = $1"#,
    )
    .bind(user_id)
    .bind(active)
    .execute(db)
    .await?;
    Ok(res.rows_affected() > 0)
}

/// Local-time settings used for "today" and greetings.
pub async fn utc_offset(db: &PgPool, user_id: Uuid) -> anyhow::Result<i32> {
    let offset = sqlx::query_scalar::<_, i32>(
        r#"SELECT utc_offset_minutes FROM users WHERE id = $1"#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(offset.unwrap_or(0))
}
