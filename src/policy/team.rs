// src/policy/team.rs
//
// Delegação por equipe: mesma forma da visibilidade por filial, mas a chave é
// ser gerente/membro da equipe.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::{
    profile::{Actor, Role},
    team::{InvitationStatus, Task, Team, TeamInvitation},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamAccess {
    /// Gerente da equipe, gerente da filial ou admin: membros, convites e tarefas.
    Manage,
    /// Membro: lê a equipe e suas tarefas.
    Member,
    None,
}

pub fn team_access(actor: &Actor, team: &Team, is_member: bool) -> TeamAccess {
    if actor.role == Role::Unrecognized {
        return TeamAccess::None;
    }
    if actor.is_admin() || actor.manages_branch(team.branch_id) || team.manager_id == actor.id {
        return TeamAccess::Manage;
    }
    if is_member {
        return TeamAccess::Member;
    }
    TeamAccess::None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAccess {
    Manage,
    /// O responsável: só muda o status.
    Assignee,
    Read,
    None,
}

impl TaskAccess {
    pub fn can_read(&self) -> bool {
        !matches!(self, TaskAccess::None)
    }

    pub fn can_update_status(&self) -> bool {
        matches!(self, TaskAccess::Manage | TaskAccess::Assignee)
    }
}

/// `team` é a equipe da tarefa (se houver) e `is_member` diz se o ator é membro dela.
pub fn task_access(actor: &Actor, task: &Task, team: Option<&Team>, is_member: bool) -> TaskAccess {
    if actor.role == Role::Unrecognized {
        return TaskAccess::None;
    }
    if actor.is_admin() {
        return TaskAccess::Manage;
    }

    match team {
        Some(team) if team_access(actor, team, is_member) == TeamAccess::Manage => {
            return TaskAccess::Manage;
        }
        None if task.assigned_by == actor.id => return TaskAccess::Manage,
        _ => {}
    }

    if task.assigned_to == Some(actor.id) {
        return TaskAccess::Assignee;
    }
    if team.is_some() && is_member {
        return TaskAccess::Read;
    }
    TaskAccess::None
}

/// Filtra uma lista de equipes por `team_access`. `member_of` são as equipes
/// das quais o ator é membro.
pub fn visible_teams(actor: &Actor, teams: Vec<Team>, member_of: &HashSet<Uuid>) -> Vec<Team> {
    teams
        .into_iter()
        .filter(|t| team_access(actor, t, member_of.contains(&t.id)) != TeamAccess::None)
        .collect()
}

/// Filtra uma lista de tarefas por `task_access`. `teams` precisa conter a
/// equipe de cada tarefa; uma tarefa cuja equipe falta no mapa é descartada.
pub fn visible_tasks(
    actor: &Actor,
    tasks: Vec<Task>,
    teams: &HashMap<Uuid, Team>,
    member_of: &HashSet<Uuid>,
) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|task| match task.team_id {
            Some(team_id) => teams
                .get(&team_id)
                .is_some_and(|team| task_access(actor, task, Some(team), member_of.contains(&team_id)).can_read()),
            None => task_access(actor, task, None, false).can_read(),
        })
        .collect()
}

// =============================================================================
//  CONVITES
// =============================================================================

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn invitation_expiry(now: DateTime<Utc>, ttl_days: i64) -> DateTime<Utc> {
    now + Duration::days(ttl_days)
}

/// Status efetivo: um convite pendente depois de `expires_at` está expirado,
/// mesmo que a linha ainda diga `pending`. Todo caminho de leitura usa isto.
pub fn effective_status(invitation: &TeamInvitation, now: DateTime<Utc>) -> InvitationStatus {
    match invitation.status {
        InvitationStatus::Pending if invitation.expires_at <= now => InvitationStatus::Expired,
        other => other,
    }
}

pub fn with_effective_status(mut invitation: TeamInvitation, now: DateTime<Utc>) -> TeamInvitation {
    invitation.status = effective_status(&invitation, now);
    invitation
}

/// Falha com `Conflict` se já houver convite pendente e válido para (equipe, e-mail).
pub fn ensure_no_live_invitation(
    existing: &[TeamInvitation],
    team_id: Uuid,
    email: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let email = normalize_email(email);
    let live = existing.iter().any(|inv| {
        inv.team_id == team_id
            && normalize_email(&inv.email) == email
            && effective_status(inv, now) == InvitationStatus::Pending
    });

    if live {
        return Err(AppError::Conflict(format!(
            "Já existe um convite pendente para {} nesta equipe.",
            email
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::feedback::Priority;
    use crate::models::team::TaskStatus;
    use crate::policy::access::tests::actor;

    fn team(branch: Uuid, manager: Uuid) -> Team {
        Team {
            id: Uuid::new_v4(),
            branch_id: branch,
            name: "Salão".into(),
            description: None,
            manager_id: manager,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn task(team_id: Option<Uuid>, assigned_by: Uuid, assigned_to: Option<Uuid>) -> Task {
        Task {
            id: Uuid::new_v4(),
            team_id,
            title: "Responder reclamações".into(),
            description: None,
            status: TaskStatus::Pending,
            priority: Priority::High,
            assigned_to,
            assigned_by,
            due_date: None,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn invitation(team_id: Uuid, email: &str, expires_at: DateTime<Utc>) -> TeamInvitation {
        TeamInvitation {
            id: Uuid::new_v4(),
            team_id,
            email: email.into(),
            role: "member".into(),
            invited_by: Uuid::new_v4(),
            status: InvitationStatus::Pending,
            expires_at,
            created_at: Utc::now(),
            accepted_at: None,
        }
    }

    #[test]
    fn team_manager_member_and_outsider() {
        let branch = Uuid::new_v4();
        let lead = actor(Role::Staff, Some(branch));
        let t = team(branch, lead.id);

        assert_eq!(team_access(&lead, &t, false), TeamAccess::Manage);
        assert_eq!(team_access(&actor(Role::Staff, Some(branch)), &t, true), TeamAccess::Member);
        assert_eq!(team_access(&actor(Role::Staff, Some(branch)), &t, false), TeamAccess::None);
        assert_eq!(team_access(&actor(Role::Manager, Some(branch)), &t, false), TeamAccess::Manage);
        assert_eq!(team_access(&actor(Role::Manager, Some(Uuid::new_v4())), &t, false), TeamAccess::None);
    }

    #[test]
    fn task_roles() {
        let branch = Uuid::new_v4();
        let lead = actor(Role::Staff, Some(branch));
        let worker = actor(Role::Staff, Some(branch));
        let colleague = actor(Role::Staff, Some(branch));
        let t = team(branch, lead.id);
        let job = task(Some(t.id), lead.id, Some(worker.id));

        assert_eq!(task_access(&lead, &job, Some(&t), false), TaskAccess::Manage);
        assert_eq!(task_access(&worker, &job, Some(&t), true), TaskAccess::Assignee);
        assert_eq!(task_access(&colleague, &job, Some(&t), true), TaskAccess::Read);
        assert_eq!(task_access(&colleague, &job, Some(&t), false), TaskAccess::None);
        assert!(!TaskAccess::Read.can_update_status());
    }

    #[test]
    fn teamless_task_belongs_to_its_creator() {
        let creator = actor(Role::Manager, Some(Uuid::new_v4()));
        let job = task(None, creator.id, None);
        assert_eq!(task_access(&creator, &job, None, false), TaskAccess::Manage);
        assert_eq!(task_access(&actor(Role::Staff, None), &job, None, false), TaskAccess::None);
    }

    #[test]
    fn outsider_sees_no_teams_or_tasks() {
        let branch = Uuid::new_v4();
        let lead = actor(Role::Staff, Some(branch));
        let worker = actor(Role::Staff, Some(branch));
        let outsider = actor(Role::Staff, Some(branch));
        let t = team(branch, lead.id);
        let teams = HashMap::from([(t.id, t.clone())]);
        let tasks = vec![
            task(Some(t.id), lead.id, Some(worker.id)),
            task(Some(t.id), lead.id, None),
            task(None, lead.id, Some(lead.id)),
        ];

        let none = HashSet::new();
        assert!(visible_teams(&outsider, vec![t.clone()], &none).is_empty());
        assert!(visible_tasks(&outsider, tasks.clone(), &teams, &none).is_empty());

        // gerente de outra filial também fica de fora
        let foreign = actor(Role::Manager, Some(Uuid::new_v4()));
        assert!(visible_teams(&foreign, vec![t.clone()], &none).is_empty());
        assert!(visible_tasks(&foreign, tasks.clone(), &teams, &none).is_empty());
    }

    #[test]
    fn members_and_assignees_see_their_share() {
        let branch = Uuid::new_v4();
        let lead = actor(Role::Staff, Some(branch));
        let worker = actor(Role::Staff, Some(branch));
        let t = team(branch, lead.id);
        let teams = HashMap::from([(t.id, t.clone())]);
        let assigned = task(Some(t.id), lead.id, Some(worker.id));
        let open = task(Some(t.id), lead.id, None);
        let private = task(None, lead.id, None);
        let tasks = vec![assigned.clone(), open.clone(), private.clone()];

        let member_of = HashSet::from([t.id]);
        assert_eq!(visible_teams(&worker, vec![t.clone()], &member_of).len(), 1);
        let seen: Vec<Uuid> = visible_tasks(&worker, tasks.clone(), &teams, &member_of)
            .into_iter()
            .map(|x| x.id)
            .collect();
        assert_eq!(seen, vec![assigned.id, open.id]);

        // o responsável fora da equipe ainda vê a própria tarefa
        let seen = visible_tasks(&worker, tasks.clone(), &teams, &HashSet::new());
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, assigned.id);

        // o gerente da equipe vê tudo da equipe e a própria tarefa sem equipe
        assert_eq!(visible_tasks(&lead, tasks, &teams, &HashSet::new()).len(), 3);
    }

    #[test]
    fn task_whose_team_is_missing_is_dropped() {
        let lead = actor(Role::Staff, Some(Uuid::new_v4()));
        let orphan = task(Some(Uuid::new_v4()), lead.id, Some(lead.id));
        assert!(visible_tasks(&lead, vec![orphan], &HashMap::new(), &HashSet::new()).is_empty());
    }

    #[test]
    fn expiry_is_lazy() {
        let now = Utc::now();
        let inv = invitation(Uuid::new_v4(), "x@y.com", now - Duration::seconds(1));
        assert_eq!(inv.status, InvitationStatus::Pending);
        assert_eq!(effective_status(&inv, now), InvitationStatus::Expired);
        assert_eq!(with_effective_status(inv, now).status, InvitationStatus::Expired);
    }

    #[test]
    fn duplicate_pending_invitation_conflicts() {
        let now = Utc::now();
        let team_id = Uuid::new_v4();
        let existing = vec![invitation(team_id, "Novo@Loja.com", now + Duration::days(3))];

        let err = ensure_no_live_invitation(&existing, team_id, " novo@loja.com ", now).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // outra equipe: ok
        assert!(ensure_no_live_invitation(&existing, Uuid::new_v4(), "novo@loja.com", now).is_ok());
    }

    #[test]
    fn invitation_after_expiry_is_allowed() {
        let now = Utc::now();
        let team_id = Uuid::new_v4();
        let existing = vec![invitation(team_id, "novo@loja.com", now - Duration::hours(1))];
        assert!(ensure_no_live_invitation(&existing, team_id, "novo@loja.com", now).is_ok());
    }
}
