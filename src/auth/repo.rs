use crate::auth::repo_types::{PrincipalRow, Role, User};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

pub(crate) const USER_COLUMNS: &str = "id, email, password_hash, display_name, onboarding_name, \
     role, is_active, voice_id, timezone, utc_offset_minutes, notify_email, notify_push, \
     notify_sms, created_at, updated_at";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    /// Create a new user with hashed password.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        display_name: Option<&str>,
        role: Role,
    ) -> anyhow::Result<User> {
        let sql = format!(
            "INSERT INTO users (email, password_hash, display_name, role) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(password_hash)
            .bind(display_name)
            .bind(role.as_str())
            .fetch_one(db)
            .await?;
        Ok(user)
    }
}

pub async fn find_principal(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<PrincipalRow>> {
    let row = sqlx::query_as::<_, PrincipalRow>(
        r#"SELECT id, role, is_active FROM users WHERE id = $1"#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn create_session(
    db: &PgPool,
    token: &str,
    user_id: Uuid,
    expires_at: OffsetDateTime,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO auth_sessions (token, user_id, expires_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(token)
    .bind(user_id)
    .bind(expires_at)
    .execute(db)
    .await?;
    Ok(())
}

/// User behind an unexpired session token.
pub async fn find_session_user(db: &PgPool, token: &str) -> anyhow::Result<Option<Uuid>> {
    let user_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT user_id
          FROM auth_sessions
         WHERE token = $1 AND expires_at > now()
        "#,
    )
    .bind(token)
    .fetch_optional(db)
    .await?;
    Ok(user_id)
}

pub async fn delete_session(db: &PgPool, token: &str) -> anyhow::Result<()> {
    sqlx::query(r#"DELETE FROM auth_sessions WHERE token = $1"#)
        .bind(token)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete_user_sessions(db: &PgPool, user_id: Uuid) -> anyhow::Result<u64> {
    let res = sqlx::query(r#"DELETE FROM auth_sessions WHERE user_id = $1"#)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}
