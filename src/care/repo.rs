use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use super::{
    dto::TaskCategory,
    repo_types::{CarePlan, CareTask, GoalRow, TodayTask},
};

const TASK_COLUMNS: &str =
    "id, care_plan_id, title, category, reminder_time, notes, is_active, created_at";
const GOAL_COLUMNS: &str =
    "id, title, current_value, target_value, unit, created_at, updated_at";

/// Replaces the active care plan: deactivate, then insert, in one transaction.
pub async fn start_plan(
    db: &PgPool,
    user_id: Uuid,
    title: &str,
    description: Option<&str>,
) -> anyhow::Result<CarePlan> {
    let mut tx = db.begin().await?;
    sqlx::query(
        r#"UPDATE care_plans SET is_active = FALSE, updated_at = now() WHERE user_id = $1 AND is_active"#,
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?;
    let plan = sqlx::query_as::<_, CarePlan>(
        r#"
        INSERT INTO care_plans (user_id, title, description)
        VALUES ($1, $2, $3)
        RETURNING id, title, description, is_active, created_at
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(description)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(plan)
}

pub async fn active_plan(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<CarePlan>> {
    let plan = sqlx::query_as::<_, CarePlan>(
        r#"
        SELECT id, title, description, is_active, created_at
          FROM care_plans
         WHERE user_id = $1 AND is_active
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(plan)
}

/// New task, attached to the active plan when there is one.
pub async fn create_task(
    db: &PgPool,
    user_id: Uuid,
    title: &str,
    category: TaskCategory,
    reminder_time: Option<&str>,
    notes: Option<&str>,
) -> anyhow::Result<CareTask> {
    let sql = format!(
        "INSERT INTO care_plan_tasks (user_id, care_plan_id, title, category, reminder_time, notes) \
         VALUES ($1, (SELECT id FROM care_plans WHERE user_id = $1 AND is_active), $2, $3, $4, $5) \
         RETURNING {TASK_COLUMNS}"
    );
    let task = sqlx::query_as::<_, CareTask>(&sql)
        .bind(user_id)
        .bind(title)
        .bind(category.as_str())
        .bind(reminder_time)
        .bind(notes)
        .fetch_one(db)
        .await?;
    Ok(task)
}

pub async fn tasks_for_day(db: &PgPool, user_id: Uuid, day: Date) -> anyhow::Result<Vec<TodayTask>> {
    let rows = sqlx::query_as::<_, TodayTask>(
        r#"
        SELECT t.id, t.care_plan_id, t.title, t.category, t.reminder_time, t.notes,
               (c.task_id IS NOT NULL) AS completed
          FROM care_plan_tasks t
          LEFT JOIN care_task_completions c
            ON c.task_id = t.id AND c.completed_on = $2
         WHERE t.user_id = $1 AND t.is_active
         ORDER BY t.reminder_time ASC NULLS LAST, t.created_at ASC
        "#,
    )
    .bind(user_id)
    .bind(day)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn owns_active_task(db: &PgPool, user_id: Uuid, task_id: Uuid) -> anyhow::Result<bool> {
    let found = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM care_plan_tasks WHERE id = $1 AND user_id = $2 AND is_active
        )
        "#,
    )
    .bind(task_id)
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(found)
}

/// False when the task was already completed that day.
pub async fn complete_task(db: &PgPool, task_id: Uuid, day: Date) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        INSERT INTO care_task_completions (task_id, completed_on)
        VALUES ($1, $2)
        ON CONFLICT (task_id, completed_on) DO NOTHING
        "#,
    )
    .bind(task_id)
    .bind(day)
    .execute(db)
    .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn deactivate_task(db: &PgPool, user_id: Uuid, task_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        UPDATE care_plan_tasks
           SET is_active = FALSE, updated_at = now()
         WHERE id = $1 AND user_id = $2 AND is_active
        "#,
    )
    .bind(task_id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn create_goal(
    db: &PgPool,
    user_id: Uuid,
    title: &str,
    current_value: f64,
    target_value: f64,
    unit: Option<&str>,
) -> anyhow::Result<GoalRow> {
    let sql = format!(
        "INSERT INTO care_plan_goals (user_id, title, current_value, target_value, unit) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {GOAL_COLUMNS}"
    );
    let row = sqlx::query_as::<_, GoalRow>(&sql)
        .bind(user_id)
        .bind(title)
        .bind(current_value)
        .bind(target_value)
        .bind(unit)
        .fetch_one(db)
        .await?;
    Ok(row)
}

pub async fn list_goals(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<GoalRow>> {
    let sql = format!(
        "SELECT {GOAL_COLUMNS} FROM care_plan_goals WHERE user_id = $1 ORDER BY created_at ASC"
    );
    let rows = sqlx::query_as::<_, GoalRow>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn update_goal_progress(
    db: &PgPool,
    user_id: Uuid,
    goal_id: Uuid,
    current_value: f64,
) -> anyhow::Result<Option<GoalRow>> {
    let sql = format!(
        "UPDATE care_plan_goals SET current_value = $3, updated_at = now() \
         WHERE id = $1 AND user_id = $2 RETURNING {GOAL_COLUMNS}"
    );
    let row = sqlx::query_as::<_, GoalRow>(&sql)
        .bind(goal_id)
        .bind(user_id)
        .bind(current_value)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    async fn create_user(pool: &PgPool) -> Uuid {
        sqlx::query_scalar("INSERT INTO users (email, password_hash) VALUES ($1, 'x') RETURNING id")
            .bind(format!("{}@example.com", Uuid::new_v4()))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn task_completion_round_trip(pool: PgPool) {
        let user_id = create_user(&pool).await;
        let day = date!(2024 - 05 - 10);
        let plan = start_plan(&pool, user_id, "Recovery", None).await.unwrap();
        let task = create_task(&pool, user_id, "Walk", TaskCategory::Activity, Some("09:00"), None)
            .await
            .unwrap();
        assert_eq!(task.care_plan_id, Some(plan.id));

        let today = tasks_for_day(&pool, user_id, day).await.unwrap();
        assert_eq!(today.len(), 1);
        assert!(!today[0].completed);

        assert!(complete_task(&pool, task.id, day).await.unwrap());
        assert!(!complete_task(&pool, task.id, day).await.unwrap());
        let today = tasks_for_day(&pool, user_id, day).await.unwrap();
        assert!(today[0].completed);

        let tomorrow = tasks_for_day(&pool, user_id, date!(2024 - 05 - 11)).await.unwrap();
        assert!(!tomorrow[0].completed);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn only_one_active_plan(pool: PgPool) {
        let user_id = create_user(&pool).await;
        let first = start_plan(&pool, user_id, "A", None).await.unwrap();
        let second = start_plan(&pool, user_id, "B", Some("after surgery")).await.unwrap();
        let active = active_plan(&pool, user_id).await.unwrap().unwrap();
        assert_eq!(active.id, second.id);
        assert_ne!(active.id, first.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn foreign_tasks_are_not_owned(pool: PgPool) {
        let owner = create_user(&pool).await;
        let other = create_user(&pool).await;
        let task = create_task(&pool, owner, "Pills", TaskCategory::Medication, None, None)
            .await
            .unwrap();
        assert!(owns_active_task(&pool, owner, task.id).await.unwrap());
        assert!(!owns_active_task(&pool, other, task.id).await.unwrap());
        assert!(!deactivate_task(&pool, other, task.id).await.unwrap());
        assert!(deactivate_task(&pool, owner, task.id).await.unwrap());
        assert!(!owns_active_task(&pool, owner, task.id).await.unwrap());
    }
}
