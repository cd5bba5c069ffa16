use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{NewTask, Task, TaskPatch, TaskRow};

/// Every call is scoped to an owner; another user's task reads as missing.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, user_id: Uuid, task: NewTask) -> anyhow::Result<Task>;
    async fn list_by_user(&self, user_id: Uuid, limit: i64, offset: i64)
        -> anyhow::Result<Vec<Task>>;
    async fn get(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Task>>;
    async fn update(&self, user_id: Uuid, id: Uuid, patch: TaskPatch)
        -> anyhow::Result<Option<Task>>;
    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgTaskStore {
    db: PgPool,
}

impl PgTaskStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn create(&self, user_id: Uuid, task: NewTask) -> anyhow::Result<Task> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            INSERT INTO tasks (id, user_id, title, description, status, due_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, title, description, status, due_date, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.due_date)
        .fetch_one(&self.db)
        .await
        .context("insert task")?;
        row.try_into()
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, user_id, title, description, status, due_date, created_at, updated_at
            FROM tasks
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list tasks by user")?;
        rows.into_iter().map(Task::try_from).collect()
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, user_id, title, description, status, due_date, created_at, updated_at
            FROM tasks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("get task")?;
        row.map(Task::try_from).transpose()
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: TaskPatch,
    ) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            UPDATE tasks
               SET title       = COALESCE($3, title),
                   description = COALESCE($4, description),
                   status      = COALESCE($5, status),
                   due_date    = COALESCE($6, due_date),
                   updated_at  = $7
             WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, status, due_date, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.due_date)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.db)
        .await
        .context("update task")?;
        row.map(Task::try_from).transpose()
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete task")?;
        Ok(res.rows_affected() == 1)
    }
}
