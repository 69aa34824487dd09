use sqlx::PgPool;
use uuid::Uuid;

use super::dto::{Platform, PushSubscription};

/// Insert or refresh; returns the row and whether it was new.
pub async fn upsert(
    db: &PgPool,
    user_id: Uuid,
    platform: Platform,
    token: &str,
) -> anyhow::Result<(PushSubscription, bool)> {
    let (id, inserted) = sqlx::query_as::<_, (Uuid, bool)>(
        r#"
        INSERT INTO push_subscriptions (user_id, platform, token)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, token) DO UPDATE SET platform = EXCLUDED.platform
        RETURNING id, (xmax = 0) AS inserted
        "#,
    )
    .bind(user_id)
    .bind(platform.as_str())
    .bind(token)
    .fetch_one(db)
    .await?;

    let row = sqlx::query_as::<_, PushSubscription>(
        r#"SELECT id, platform, token, created_at FROM push_subscriptions WHERE id = $1"#,
    )
    .bind(id)
    .fetch_one(db)
    .await?;
    Ok((row, inserted))
}

pub async fn list(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<PushSubscription>> {
    let rows = sqlx::query_as::<_, PushSubscription>(
        r#"
        SELECT id, platform, token, created_at
          FROM push_subscriptions
         WHERE user_id = $1
         ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query(r#"DELETE FROM push_subscriptions WHERE id = $1 AND user_id = $2"#)
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
