// src/db/task_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        feedback::Priority,
        team::{Task, TaskFilter},
    },
};

#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        team_id: Option<Uuid>,
        title: &str,
        description: Option<&str>,
        priority: Priority,
        assigned_to: Option<Uuid>,
        assigned_by: Uuid,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Task, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (team_id, title, description, status, priority, assigned_to, assigned_by, due_date)
            VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(team_id)
        .bind(title)
        .bind(description)
        .bind(priority)
        .bind(assigned_to)
        .bind(assigned_by)
        .bind(due_date)
        .fetch_one(executor)
        .await?;
        Ok(task)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Task>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(task)
    }

    /// Pré-filtro SQL das tarefas legíveis. O serviço ainda passa cada linha
    /// por `policy::team::task_access`.
    pub async fn list_visible<'e, E>(
        &self,
        executor: E,
        all: bool,
        managed_branch: Option<Uuid>,
        principal_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT t.* FROM tasks t
            LEFT JOIN teams tm ON tm.id = t.team_id
            WHERE ($1
                OR t.assigned_to = $3
                OR (t.team_id IS NULL AND t.assigned_by = $3)
                OR tm.manager_id = $3
                OR tm.branch_id = $2
                OR EXISTS (SELECT 1 FROM team_members m WHERE m.team_id = t.team_id AND m.profile_id = $3))
              AND ($4::uuid IS NULL OR t.team_id = $4)
              AND ($5::task_status IS NULL OR t.status = $5)
            ORDER BY t.due_date ASC NULLS LAST, t.created_at DESC
            "#,
        )
        .bind(all)
        .bind(managed_branch)
        .bind(principal_id)
        .bind(filter.team_id)
        .bind(filter.status)
        .fetch_all(executor)
        .await?;
        Ok(tasks)
    }

    /// Grava o estado final (o serviço já aplicou o patch).
    pub async fn save<'e, E>(&self, executor: E, task: &Task) -> Result<Task, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let saved = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks SET
                title = $2,
                description = $3,
                status = $4,
                priority = $5,
                assigned_to = $6,
                due_date = $7,
                completed_at = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(task.description.as_deref())
        .bind(task.status)
        .bind(task.priority)
        .bind(task.assigned_to)
        .bind(task.due_date)
        .bind(task.completed_at)
        .fetch_one(executor)
        .await?;
        Ok(saved)
    }
}
