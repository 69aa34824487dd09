use sqlx::PgPool;
use uuid::Uuid;

use super::dto::MoodEntry;

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    score: i32,
    label: Option<&str>,
    note: Option<&str>,
) -> anyhow::Result<MoodEntry> {
    let entry = sqlx::query_as::<_, MoodEntry>(
        r#"
        INSERT INTO mood_entries (user_id, score, label, note)
        VALUES ($1, $2, $3, $4)
        RETURNING id, score, label, note, created_at
        "#,
    )
    .bind(user_id)
    .bind(score)
    .bind(label)
    .bind(note)
    .fetch_one(db)
    .await?;
    Ok(entry)
}

/// Entries from the last `days` days, newest first.
pub async fn list_recent(
    db: &PgPool,
    user_id: Uuid,
    days: i64,
    limit: i64,
) -> anyhow::Result<Vec<MoodEntry>> {
    let rows = sqlx::query_as::<_, MoodEntry>(
        r#"
        SELECT id, score, label, note, created_at
          FROM mood_entries
         WHERE user_id = $1 AND created_at >= now() - make_interval(days => $2::int)
         ORDER BY created_at DESC
         LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(days as i32)
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Most recent entries regardless of age.
pub async fn latest(db: &PgPool, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<MoodEntry>> {
    let rows = sqlx::query_as::<_, MoodEntry>(
        r#"
        SELECT id, score, label, note, created_at
          FROM mood_entries
         WHERE user_id = $1
         ORDER BY created_at DESC
         LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
