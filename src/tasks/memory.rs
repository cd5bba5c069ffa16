use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::TaskStore;
use super::repo_types::{NewTask, Task, TaskPatch};

#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, user_id: Uuid, task: NewTask) -> anyhow::Result<Task> {
        let now = OffsetDateTime::now_utc();
        let record = Task {
            id: Uuid::new_v4(),
            user_id,
            title: task.title,
            description: task.description,
            status: task.status,
            due_date: task.due_date,
            created_at: now,
            updated_at: now,
        };
        self.tasks.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Task>> {
        let tasks = self.tasks.read().await;
        let mut owned: Vec<Task> = tasks
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(&id).filter(|t| t.user_id == user_id).cloned())
    }

    async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: TaskPatch,
    ) -> anyhow::Result<Option<Task>> {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(&id).filter(|t| t.user_id == user_id) else {
            return Ok(None);
        };
        if let Some(v) = patch.title {
            task.title = v;
        }
        if let Some(v) = patch.description {
            task.description = Some(v);
        }
        if let Some(v) = patch.status {
            task.status = v;
        }
        if let Some(v) = patch.due_date {
            task.due_date = Some(v);
        }
        task.updated_at = OffsetDateTime::now_utc();
        Ok(Some(task.clone()))
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let mut tasks = self.tasks.write().await;
        match tasks.get(&id) {
            Some(t) if t.user_id == user_id => Ok(tasks.remove(&id).is_some()),
            _ => Ok(false),
        }
    }
}
