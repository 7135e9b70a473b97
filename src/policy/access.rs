// src/policy/access.rs
//
// Visibilidade por filial. Toda entidade que pertence a uma filial passa por
// `branch_access`; a regra se reduz a
// "admin, OU (gerente E mesma filial), OU (principal responsável/dono)".

use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::{
    branch::Branch,
    feedback::Feedback,
    profile::{Actor, Role},
    qr::QrCode,
    settings::FeedbackFormSettings,
    team::Team,
};

/// Nível de acesso de um ator sobre uma linha. A primeira regra que casa vence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Leitura e escrita de todos os campos.
    Full,
    /// Responsável/dono: lê tudo, escreve só status/atribuição.
    Assigned,
    /// Equipe da filial: lê a projeção mascarada, não escreve.
    Redacted,
    Denied,
}

impl Access {
    pub fn can_read(&self) -> bool {
        !matches!(self, Access::Denied)
    }

    pub fn can_write(&self) -> bool {
        matches!(self, Access::Full)
    }

    /// Status e atribuição: o responsável também pode.
    pub fn can_write_status(&self) -> bool {
        matches!(self, Access::Full | Access::Assigned)
    }
}

/// Uma linha com dono numa filial.
pub trait BranchScoped {
    fn branch_id(&self) -> Option<Uuid>;

    /// Responsável (`assigned_to`) ou dono (`owner_id`), quando existir.
    fn owner_id(&self) -> Option<Uuid> {
        None
    }
}

pub fn branch_access<E: BranchScoped + ?Sized>(actor: &Actor, entity: &E) -> Access {
    let branch = entity.branch_id();

    // Papel desconhecido: nenhum privilégio, nem como responsável.
    if actor.role == Role::Unrecognized {
        return Access::Denied;
    }

    // 1. Admin
    if actor.is_admin() {
        return Access::Full;
    }

    // 2. Gerente da mesma filial. Linhas sem filial são visíveis a todos os gerentes.
    if actor.role == Role::Manager {
        match branch {
            Some(b) if actor.manages_branch(b) => return Access::Full,
            None => return Access::Full,
            _ => {}
        }
    }

    // 3. Responsável/dono. Nunca atravessa filiais: a linha precisa estar sem
    //    filial ou na filial atual do ator.
    if entity.owner_id() == Some(actor.id) && (branch.is_none() || branch == actor.branch_id) {
        return Access::Assigned;
    }

    // 4. Equipe da própria filial: só projeção mascarada.
    if actor.role == Role::Staff {
        if let Some(b) = branch {
            if actor.branch_id == Some(b) {
                return Access::Redacted;
            }
        }
    }

    // 5. O resto
    Access::Denied
}

// ---
// Entidades
// ---

impl BranchScoped for Feedback {
    fn branch_id(&self) -> Option<Uuid> {
        self.branch_id
    }

    fn owner_id(&self) -> Option<Uuid> {
        self.assigned_to
    }
}

impl BranchScoped for QrCode {
    fn branch_id(&self) -> Option<Uuid> {
        Some(self.branch_id)
    }

    fn owner_id(&self) -> Option<Uuid> {
        Some(self.owner_id)
    }
}

impl BranchScoped for Team {
    fn branch_id(&self) -> Option<Uuid> {
        Some(self.branch_id)
    }

    fn owner_id(&self) -> Option<Uuid> {
        Some(self.manager_id)
    }
}

impl BranchScoped for FeedbackFormSettings {
    fn branch_id(&self) -> Option<Uuid> {
        self.branch_id
    }
}

// A filial é dona de si mesma: o gerente designado (manager_id) conta como dono.
impl BranchScoped for Branch {
    fn branch_id(&self) -> Option<Uuid> {
        Some(self.id)
    }

    fn owner_id(&self) -> Option<Uuid> {
        self.manager_id
    }
}

/// Um destino de escrita ainda inexistente (ex: criar algo numa filial).
pub struct BranchTarget(pub Option<Uuid>);

impl BranchScoped for BranchTarget {
    fn branch_id(&self) -> Option<Uuid> {
        self.0
    }
}

/// Pode criar entidades (QR codes, equipes) nesta filial?
pub fn can_manage_branch(actor: &Actor, branch_id: Uuid) -> bool {
    actor.is_admin() || actor.manages_branch(branch_id)
}

/// A configuração padrão (sem filial) é exclusiva do admin; a de uma filial
/// segue a regra de escrita da filial.
pub fn can_edit_form_settings(actor: &Actor, branch_id: Option<Uuid>) -> bool {
    match branch_id {
        None => actor.is_admin(),
        Some(b) => can_manage_branch(actor, b),
    }
}

/// Um responsável precisa ser da filial da linha (ou a linha não tem filial).
pub fn assignee_fits_branch(assignee_branch: Option<Uuid>, row_branch: Option<Uuid>) -> bool {
    match row_branch {
        None => true,
        Some(b) => assignee_branch == Some(b),
    }
}

/// O gerente designado (`branches.manager_id`) precisa ter papel `manager` e,
/// numa filial existente, estar nela. Assim a designação coincide com a regra
/// "gerente da mesma filial" de `branch_access`.
pub fn check_designated_manager(candidate: &Actor, branch_id: Option<Uuid>) -> Result<(), AppError> {
    if candidate.role != Role::Manager {
        return Err(AppError::InvalidInput(
            "O gerente designado precisa ter o papel manager.".into(),
        ));
    }
    if let Some(b) = branch_id {
        if candidate.branch_id != Some(b) {
            return Err(AppError::InvalidInput(
                "O gerente designado precisa pertencer à filial.".into(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::feedback::{FeedbackStatus, Priority};
    use chrono::Utc;

    pub fn actor(role: Role, branch: Option<Uuid>) -> Actor {
        Actor { id: Uuid::new_v4(), role, branch_id: branch }
    }

    pub fn feedback(branch: Option<Uuid>, assigned_to: Option<Uuid>) -> Feedback {
        Feedback {
            id: Uuid::new_v4(),
            branch_id: branch,
            category_id: None,
            rating: 2,
            subject: "Demora".into(),
            message: "Esperei 40 minutos".into(),
            status: FeedbackStatus::Pending,
            priority: Priority::Medium,
            is_anonymous: false,
            assigned_to,
            customer_name: Some("Ana".into()),
            customer_email: Some("a@b.com".into()),
            customer_phone: Some("+5511999990000".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            resolved_at: None,
        }
    }

    fn qr(branch: Uuid, owner: Uuid) -> QrCode {
        QrCode {
            id: Uuid::new_v4(),
            owner_id: owner,
            branch_id: branch,
            category_id: None,
            name: "Mesa 1".into(),
            target_url: "https://x/feedback".into(),
            image_ref: "/api/qr-codes/x/image".into(),
            scan_count: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn admin_has_full_access_everywhere() {
        let admin = actor(Role::Admin, None);
        assert_eq!(branch_access(&admin, &feedback(Some(Uuid::new_v4()), None)), Access::Full);
        assert_eq!(branch_access(&admin, &feedback(None, None)), Access::Full);
    }

    #[test]
    fn manager_is_scoped_to_own_branch() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let manager = actor(Role::Manager, Some(a));
        assert_eq!(branch_access(&manager, &feedback(Some(a), None)), Access::Full);
        assert_eq!(branch_access(&manager, &feedback(Some(b), None)), Access::Denied);
    }

    #[test]
    fn branchless_rows_are_visible_to_all_managers_but_not_staff() {
        let manager = actor(Role::Manager, Some(Uuid::new_v4()));
        let staff = actor(Role::Staff, Some(Uuid::new_v4()));
        let walk_in = feedback(None, None);
        assert_eq!(branch_access(&manager, &walk_in), Access::Full);
        assert_eq!(branch_access(&staff, &walk_in), Access::Denied);
    }

    #[test]
    fn assignee_reads_and_updates_status_only() {
        let a = Uuid::new_v4();
        let staff = actor(Role::Staff, Some(a));
        let access = branch_access(&staff, &feedback(Some(a), Some(staff.id)));
        assert_eq!(access, Access::Assigned);
        assert!(access.can_read());
        assert!(access.can_write_status());
        assert!(!access.can_write());
    }

    #[test]
    fn staff_of_same_branch_gets_redacted_read_only() {
        let a = Uuid::new_v4();
        let staff = actor(Role::Staff, Some(a));
        let access = branch_access(&staff, &feedback(Some(a), None));
        assert_eq!(access, Access::Redacted);
        assert!(access.can_read());
        assert!(!access.can_write_status());
    }

    #[test]
    fn staff_never_crosses_branches_even_when_assigned() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let staff = actor(Role::Staff, Some(a));

        for row in [feedback(Some(b), None), feedback(Some(b), Some(staff.id))] {
            let access = branch_access(&staff, &row);
            assert!(!access.can_read());
            assert!(!access.can_write_status());
        }

        let code = qr(b, staff.id);
        assert_eq!(branch_access(&staff, &code), Access::Denied);
    }

    #[test]
    fn plain_users_and_unknown_roles_are_denied() {
        let a = Uuid::new_v4();
        let user = actor(Role::User, Some(a));
        assert_eq!(branch_access(&user, &feedback(Some(a), None)), Access::Denied);

        let weird = actor(Role::Unrecognized, Some(a));
        assert_eq!(branch_access(&weird, &feedback(Some(a), Some(weird.id))), Access::Denied);
    }

    #[test]
    fn qr_owner_is_the_owning_principal() {
        let a = Uuid::new_v4();
        let user = actor(Role::User, Some(a));
        assert_eq!(branch_access(&user, &qr(a, user.id)), Access::Assigned);
    }

    #[test]
    fn form_settings_default_is_admin_only() {
        let a = Uuid::new_v4();
        assert!(can_edit_form_settings(&actor(Role::Admin, None), None));
        assert!(!can_edit_form_settings(&actor(Role::Manager, Some(a)), None));
        assert!(can_edit_form_settings(&actor(Role::Manager, Some(a)), Some(a)));
        assert!(!can_edit_form_settings(&actor(Role::Staff, Some(a)), Some(a)));
    }

    #[test]
    fn assignees_must_belong_to_the_row_branch() {
        let a = Uuid::new_v4();
        assert!(assignee_fits_branch(Some(a), Some(a)));
        assert!(assignee_fits_branch(None, None));
        assert!(!assignee_fits_branch(Some(Uuid::new_v4()), Some(a)));
        assert!(!assignee_fits_branch(None, Some(a)));
    }

    #[test]
    fn designated_manager_must_be_a_manager_of_that_branch() {
        let a = Uuid::new_v4();
        assert!(check_designated_manager(&actor(Role::Manager, Some(a)), Some(a)).is_ok());
        assert!(check_designated_manager(&actor(Role::Manager, Some(Uuid::new_v4())), Some(a)).is_err());
        assert!(check_designated_manager(&actor(Role::Staff, Some(a)), Some(a)).is_err());
        assert!(check_designated_manager(&actor(Role::Admin, None), Some(a)).is_err());

        // filial nova: basta o papel, o perfil é movido para ela na criação
        assert!(check_designated_manager(&actor(Role::Manager, None), None).is_ok());
        assert!(check_designated_manager(&actor(Role::User, None), None).is_err());

        // designado e validado, ele tem acesso total às linhas da filial
        let manager = actor(Role::Manager, Some(a));
        assert_eq!(branch_access(&manager, &feedback(Some(a), None)), Access::Full);
    }
}
