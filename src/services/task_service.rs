// src/services/task_service.rs

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, response::WithWarnings},
    db::{ProfileRepository, TaskRepository, TeamRepository},
    integrations::email::EmailSender,
    models::{
        profile::{Actor, Profile, Role},
        team::{CreateTaskPayload, Task, TaskFilter, TaskStatus, Team, UpdateTaskPayload},
    },
    policy::team::{task_access, team_access, visible_tasks, TaskAccess, TeamAccess},
    services::notifications,
};

#[derive(Clone)]
pub struct TaskService {
    task_repo: TaskRepository,
    team_repo: TeamRepository,
    profile_repo: ProfileRepository,
    email: Arc<dyn EmailSender>,
    app_base_url: String,
    pool: PgPool,
}

impl TaskService {
    pub fn new(
        task_repo: TaskRepository,
        team_repo: TeamRepository,
        profile_repo: ProfileRepository,
        email: Arc<dyn EmailSender>,
        app_base_url: String,
        pool: PgPool,
    ) -> Self {
        Self {
            task_repo,
            team_repo,
            profile_repo,
            email,
            app_base_url,
            pool,
        }
    }

    pub async fn create(&self, creator: &Profile, input: &CreateTaskPayload) -> Result<WithWarnings<Task>, AppError> {
        let actor = creator.actor();

        let team = match input.team_id {
            Some(team_id) => {
                let team = self.load_team(team_id).await?;
                let is_member = self.team_repo.is_member(&self.pool, team_id, actor.id).await?;
                if team_access(&actor, &team, is_member) != TeamAccess::Manage {
                    return Err(AppError::Forbidden("Só o gerente da equipe cria tarefas nela.".into()));
                }
                Some(team)
            }
            None if matches!(actor.role, Role::Admin | Role::Manager | Role::Staff) => None,
            None => return Err(AppError::Forbidden("Sem permissão para criar tarefas.".into())),
        };

        if let Some(assignee_id) = input.assigned_to {
            self.validate_assignee(&actor, team.as_ref(), assignee_id).await?;
        }

        let task = self
            .task_repo
            .create(
                &self.pool,
                input.team_id,
                input.title.trim(),
                input.description.as_deref(),
                input.priority.unwrap_or_default(),
                input.assigned_to,
                creator.id,
                input.due_date,
            )
            .await?;

        let mut result = WithWarnings::new(task);
        if let Some(assignee_id) = input.assigned_to.filter(|id| *id != creator.id) {
            self.notify_assignee(assignee_id, &mut result).await;
        }
        Ok(result)
    }

    pub async fn list(&self, viewer: &Profile, filter: &TaskFilter) -> Result<Vec<Task>, AppError> {
        let actor = viewer.actor();
        if actor.role == Role::Unrecognized {
            return Ok(Vec::new());
        }
        let managed_branch = if actor.role == Role::Manager { actor.branch_id } else { None };
        let candidates = self
            .task_repo
            .list_visible(&self.pool, actor.is_admin(), managed_branch, actor.id, filter)
            .await?;

        let mut team_ids: Vec<Uuid> = candidates.iter().filter_map(|t| t.team_id).collect();
        team_ids.sort_unstable();
        team_ids.dedup();
        let teams: HashMap<Uuid, Team> = self
            .team_repo
            .find_by_ids(&self.pool, &team_ids)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        let member_of: HashSet<Uuid> = self.team_repo.team_ids_of_member(&self.pool, actor.id).await?.into_iter().collect();

        Ok(visible_tasks(&actor, candidates, &teams, &member_of))
    }

    /// Gestão altera tudo; o responsável só o status.
    pub async fn update(&self, editor: &Profile, id: Uuid, input: &UpdateTaskPayload) -> Result<WithWarnings<Task>, AppError> {
        let actor = editor.actor();
        let task = self
            .task_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tarefa {}", id)))?;

        let team = match task.team_id {
            Some(team_id) => Some(self.load_team(team_id).await?),
            None => None,
        };
        let is_member = match &team {
            Some(t) => self.team_repo.is_member(&self.pool, t.id, actor.id).await?,
            None => false,
        };

        let access = task_access(&actor, &task, team.as_ref(), is_member);
        if input.touches_management_fields() && access != TaskAccess::Manage {
            return Err(AppError::Forbidden("Só o gerente da equipe altera esta tarefa.".into()));
        }
        if input.status.is_some() && !access.can_update_status() {
            return Err(AppError::Forbidden("Sem permissão para alterar o status desta tarefa.".into()));
        }
        if !access.can_read() {
            return Err(AppError::Forbidden("Sem acesso a esta tarefa.".into()));
        }

        let mut newly_assigned = None;
        if let Some(Some(assignee_id)) = input.assigned_to {
            self.validate_assignee(&actor, team.as_ref(), assignee_id).await?;
            if task.assigned_to != Some(assignee_id) && assignee_id != editor.id {
                newly_assigned = Some(assignee_id);
            }
        }

        let patched = apply_patch(task, input, Utc::now());
        let saved = self.task_repo.save(&self.pool, &patched).await?;

        let mut result = WithWarnings::new(saved);
        if let Some(assignee_id) = newly_assigned {
            self.notify_assignee(assignee_id, &mut result).await;
        }
        Ok(result)
    }

    async fn load_team(&self, team_id: Uuid) -> Result<Team, AppError> {
        self.team_repo
            .find_by_id(&self.pool, team_id)
            .await?
            .ok_or_else(|| AppError::InvalidInput(format!("Equipe {} não existe.", team_id)))
    }

    /// Em equipe: o responsável é membro ou o gerente. Sem equipe: staff só
    /// atribui a si mesmo; gerentes e admins a qualquer perfil.
    async fn validate_assignee(&self, actor: &Actor, team: Option<&Team>, assignee_id: Uuid) -> Result<(), AppError> {
        self.profile_repo
            .find_by_id(assignee_id)
            .await?
            .ok_or_else(|| AppError::InvalidInput(format!("Perfil {} não existe.", assignee_id)))?;

        let ok = match team {
            Some(team) => {
                team.manager_id == assignee_id || self.team_repo.is_member(&self.pool, team.id, assignee_id).await?
            }
            None => assignee_id == actor.id || matches!(actor.role, Role::Admin | Role::Manager),
        };

        if !ok {
            return Err(AppError::InvalidInput("O responsável precisa ser membro da equipe.".into()));
        }
        Ok(())
    }

    /// Depois da escrita: nenhuma falha aqui desfaz a tarefa, só vira aviso.
    async fn notify_assignee(&self, assignee_id: Uuid, result: &mut WithWarnings<Task>) {
        let lookup = self.profile_repo.find_by_id(assignee_id).await;
        let link = format!("{}/tasks/{}", self.app_base_url, result.data.id);
        notify_task_assignee(self.email.as_ref(), lookup, &link, result).await;
    }
}

async fn notify_task_assignee(
    sender: &dyn EmailSender,
    lookup: Result<Option<Profile>, AppError>,
    link: &str,
    result: &mut WithWarnings<Task>,
) {
    match lookup {
        Ok(Some(assignee)) => {
            let message = notifications::task_assigned(&assignee.email, &result.data.title, link);
            notifications::deliver(sender, message, result).await;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(task_id = %result.data.id, error = %e, "Falha ao buscar o responsável da tarefa");
            result.warn("Não foi possível notificar o responsável pela tarefa.");
        }
    }
}

fn apply_patch(mut task: Task, input: &UpdateTaskPayload, now: DateTime<Utc>) -> Task {
    if let Some(title) = &input.title {
        task.title = title.trim().to_string();
    }
    if let Some(description) = &input.description {
        task.description = Some(description.clone());
    }
    if let Some(priority) = input.priority {
        task.priority = priority;
    }
    if let Some(assigned_to) = input.assigned_to {
        task.assigned_to = assigned_to;
    }
    if let Some(due_date) = input.due_date {
        task.due_date = due_date;
    }
    if let Some(status) = input.status {
        task.status = status;
    }
    task.completed_at = match task.status {
        TaskStatus::Completed => task.completed_at.or(Some(now)),
        _ => None,
    };
    task
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::email::tests::MockEmailSender;
    use crate::models::feedback::Priority;

    fn task() -> Task {
        Task {
            id: Uuid::new_v4(),
            team_id: None,
            title: "Ligar para a cliente".into(),
            description: None,
            status: TaskStatus::InProgress,
            priority: Priority::Medium,
            assigned_to: Some(Uuid::new_v4()),
            assigned_by: Uuid::new_v4(),
            due_date: None,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn completing_sets_completed_at_and_reopening_clears_it() {
        let now = Utc::now();
        let done = apply_patch(
            task(),
            &UpdateTaskPayload { status: Some(TaskStatus::Completed), ..Default::default() },
            now,
        );
        assert_eq!(done.completed_at, Some(now));

        let reopened = apply_patch(
            done,
            &UpdateTaskPayload { status: Some(TaskStatus::Pending), ..Default::default() },
            now,
        );
        assert_eq!(reopened.completed_at, None);
    }

    #[test]
    fn null_clears_assignee_and_missing_keeps_it() {
        let original = task();
        let kept = apply_patch(original.clone(), &UpdateTaskPayload::default(), Utc::now());
        assert_eq!(kept.assigned_to, original.assigned_to);

        let cleared = apply_patch(
            original,
            &UpdateTaskPayload { assigned_to: Some(None), ..Default::default() },
            Utc::now(),
        );
        assert_eq!(cleared.assigned_to, None);
    }

    fn profile(email: &str) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: email.into(),
            full_name: None,
            role: "staff".into(),
            branch_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn failed_assignee_lookup_keeps_the_task_and_warns() {
        let (sender, sent) = MockEmailSender::new(false);
        let saved = task();
        let mut result = WithWarnings::new(saved.clone());

        let lookup = Err(AppError::InternalServerError(anyhow::anyhow!("conexão perdida")));
        notify_task_assignee(&sender, lookup, "https://x/tasks/1", &mut result).await;

        assert_eq!(result.data.id, saved.id);
        assert_eq!(result.warnings.len(), 1);
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn assignee_is_emailed_when_found() {
        let (sender, sent) = MockEmailSender::new(false);
        let mut result = WithWarnings::new(task());

        notify_task_assignee(&sender, Ok(Some(profile("s@loja.com"))), "https://x/tasks/1", &mut result).await;

        assert!(result.warnings.is_empty());
        assert_eq!(sent.lock().unwrap()[0].to, "s@loja.com");
    }
}
