// src/db/feedback_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        feedback::{
            Feedback, FeedbackCategory, FeedbackFilter, FeedbackResponse, FeedbackStatus, NewFeedback,
            Priority,
        },
        profile::{Actor, Role},
    },
};

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 500;

/// Pré-filtro SQL equivalente à visibilidade por filial. O resultado ainda
/// passa pela projeção em `policy::redaction`, que decide linha a linha.
#[derive(Debug, Clone, Copy)]
pub struct FeedbackScope {
    pub all: bool,
    // Filial cujas linhas entram (gerente ou equipe)
    pub branch_id: Option<Uuid>,
    // Gerentes veem as linhas sem filial
    pub include_branchless: bool,
    pub principal_id: Uuid,
    // Filial atual do principal: o responsável só vê linhas dela ou sem filial
    pub principal_branch_id: Option<Uuid>,
}

impl FeedbackScope {
    pub fn for_actor(actor: &Actor) -> Self {
        let scoped_role = matches!(actor.role, Role::Manager | Role::Staff);
        Self {
            all: actor.is_admin(),
            branch_id: if scoped_role { actor.branch_id } else { None },
            include_branchless: actor.role == Role::Manager,
            principal_id: actor.id,
            principal_branch_id: actor.branch_id,
        }
    }
}

#[derive(Clone)]
pub struct FeedbackRepository {
    pool: PgPool,
}

impl FeedbackRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CATEGORIAS
    // =========================================================================

    pub async fn list_active_categories(&self) -> Result<Vec<FeedbackCategory>, AppError> {
        let categories = sqlx::query_as::<_, FeedbackCategory>(
            "SELECT * FROM feedback_categories WHERE is_active ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn find_category<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<FeedbackCategory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let category = sqlx::query_as::<_, FeedbackCategory>("SELECT * FROM feedback_categories WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(category)
    }

    pub async fn create_category<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
        color: Option<&str>,
    ) -> Result<FeedbackCategory, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, FeedbackCategory>(
            r#"
            INSERT INTO feedback_categories (name, description, color)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(color)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, format!("A categoria '{}' já existe.", name)))
    }

    // =========================================================================
    //  FEEDBACK
    // =========================================================================

    pub async fn insert<'e, E>(&self, executor: E, input: &NewFeedback) -> Result<Feedback, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback (
                branch_id, category_id, rating, subject, message, status, priority,
                is_anonymous, customer_name, customer_email, customer_phone
            )
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(input.branch_id)
        .bind(input.category_id)
        .bind(input.rating)
        .bind(&input.subject)
        .bind(&input.message)
        .bind(input.priority)
        .bind(input.is_anonymous)
        .bind(input.customer_name.as_deref())
        .bind(input.customer_email.as_deref())
        .bind(input.customer_phone.as_deref())
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Feedback>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Feedback>("SELECT * FROM feedback WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    /// Linhas candidatas para o escopo, mais recentes primeiro (paginado).
    pub async fn list_scoped<'e, E>(
        &self,
        executor: E,
        scope: FeedbackScope,
        filter: &FeedbackFilter,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Feedback>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = filter.offset.unwrap_or(0).max(0);
        self.fetch_scoped(executor, scope, filter, since, limit, offset).await
    }

    /// Sem o teto de paginação, para exportação.
    pub async fn list_export<'e, E>(
        &self,
        executor: E,
        scope: FeedbackScope,
        filter: &FeedbackFilter,
    ) -> Result<Vec<Feedback>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        self.fetch_scoped(executor, scope, filter, None, limit, 0).await
    }

    async fn fetch_scoped<'e, E>(
        &self,
        executor: E,
        scope: FeedbackScope,
        filter: &FeedbackFilter,
        since: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Feedback>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, Feedback>(
            r#"
            SELECT * FROM feedback
            WHERE ($1
                OR branch_id = $2
                OR ($3 AND branch_id IS NULL)
                OR (assigned_to = $4 AND (branch_id IS NULL OR branch_id = $10)))
              AND ($5::feedback_status IS NULL OR status = $5)
              AND ($6::uuid IS NULL OR branch_id = $6)
              AND ($7::timestamptz IS NULL OR created_at >= $7)
            ORDER BY created_at DESC
            LIMIT $8 OFFSET $9
            "#,
        )
        .bind(scope.all)
        .bind(scope.branch_id)
        .bind(scope.include_branchless)
        .bind(scope.principal_id)
        .bind(filter.status)
        .bind(filter.branch_id)
        .bind(since)
        .bind(limit)
        .bind(offset)
        .bind(scope.principal_branch_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    /// Grava o estado final de triagem (o serviço já combinou o patch com a linha).
    pub async fn update_triage<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: FeedbackStatus,
        priority: Priority,
        assigned_to: Option<Uuid>,
        category_id: Option<Uuid>,
        resolved_at: Option<DateTime<Utc>>,
    ) -> Result<Feedback, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Feedback>(
            r#"
            UPDATE feedback SET
                status = $2,
                priority = $3,
                assigned_to = $4,
                category_id = $5,
                resolved_at = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(priority)
        .bind(assigned_to)
        .bind(category_id)
        .bind(resolved_at)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    // =========================================================================
    //  RESPOSTAS
    // =========================================================================

    pub async fn list_responses<'e, E>(&self, executor: E, feedback_id: Uuid) -> Result<Vec<FeedbackResponse>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let responses = sqlx::query_as::<_, FeedbackResponse>(
            "SELECT * FROM feedback_responses WHERE feedback_id = $1 ORDER BY created_at ASC",
        )
        .bind(feedback_id)
        .fetch_all(executor)
        .await?;
        Ok(responses)
    }

    pub async fn insert_response<'e, E>(
        &self,
        executor: E,
        feedback_id: Uuid,
        author_id: Uuid,
        message: &str,
        is_internal: bool,
    ) -> Result<FeedbackResponse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let response = sqlx::query_as::<_, FeedbackResponse>(
            r#"
            INSERT INTO feedback_responses (feedback_id, author_id, message, is_internal)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(feedback_id)
        .bind(author_id)
        .bind(message)
        .bind(is_internal)
        .fetch_one(executor)
        .await?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::access::{
        branch_access,
        tests::{actor, feedback},
    };

    // A cláusula WHERE de `fetch_scoped`, linha a linha.
    fn admits(scope: &FeedbackScope, row: &Feedback) -> bool {
        scope.all
            || (row.branch_id.is_some() && row.branch_id == scope.branch_id)
            || (scope.include_branchless && row.branch_id.is_none())
            || (row.assigned_to == Some(scope.principal_id)
                && (row.branch_id.is_none()
                    || (row.branch_id.is_some() && row.branch_id == scope.principal_branch_id)))
    }

    #[test]
    fn assigned_rows_from_other_branches_are_not_fetched() {
        let home = Uuid::new_v4();
        let staff = actor(Role::Staff, Some(home));
        let scope = FeedbackScope::for_actor(&staff);

        assert!(admits(&scope, &feedback(Some(home), Some(staff.id))));
        assert!(admits(&scope, &feedback(None, Some(staff.id))));
        assert!(!admits(&scope, &feedback(Some(Uuid::new_v4()), Some(staff.id))));
    }

    // O pré-filtro traz exatamente as linhas que a política deixa ler.
    #[test]
    fn prefilter_matches_branch_access() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let roles = [Role::Admin, Role::Manager, Role::Staff, Role::User];

        for role in roles {
            for actor_branch in [Some(a), Some(b), None] {
                let who = actor(role, actor_branch);
                let scope = FeedbackScope::for_actor(&who);
                for row_branch in [Some(a), Some(b), None] {
                    for assigned in [None, Some(who.id), Some(Uuid::new_v4())] {
                        let row = feedback(row_branch, assigned);
                        assert_eq!(
                            admits(&scope, &row),
                            branch_access(&who, &row).can_read(),
                            "{:?} em {:?}, linha em {:?}, responsável {:?}",
                            role,
                            actor_branch,
                            row_branch,
                            assigned
                        );
                    }
                }
            }
        }
    }
}
