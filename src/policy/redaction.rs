// src/policy/redaction.rs
//
// Dados pessoais do cliente (nome/e-mail/telefone) só saem completos para o
// admin, o gerente da filial da linha ou o responsável pela linha. Todo caminho
// de leitura de feedback passa por `project`: a linha crua nunca é serializada.

use crate::models::{
    feedback::{Feedback, FeedbackView},
    profile::Actor,
};
use crate::policy::access::{branch_access, Access};

pub const REDACTED_CUSTOMER_NAME: &str = "Customer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Full,
    Redacted,
}

/// Qual projeção um ator recebe (ou `None` se não pode ler).
pub fn projection_for(actor: &Actor, row: &Feedback) -> Option<Projection> {
    match branch_access(actor, row) {
        Access::Full | Access::Assigned => Some(Projection::Full),
        Access::Redacted => Some(Projection::Redacted),
        Access::Denied => None,
    }
}

pub fn project(actor: &Actor, row: Feedback) -> Option<FeedbackView> {
    projection_for(actor, &row).map(|p| apply(p, row))
}

/// Filtra e projeta uma lista inteira.
pub fn project_all(actor: &Actor, rows: Vec<Feedback>) -> Vec<FeedbackView> {
    rows.into_iter().filter_map(|row| project(actor, row)).collect()
}

pub fn apply(projection: Projection, row: Feedback) -> FeedbackView {
    let redacted = projection == Projection::Redacted;

    let (customer_name, customer_email, customer_phone) = if redacted {
        let name = (!row.is_anonymous).then(|| REDACTED_CUSTOMER_NAME.to_string());
        (name, None, None)
    } else {
        (row.customer_name, row.customer_email, row.customer_phone)
    };

    FeedbackView {
        id: row.id,
        branch_id: row.branch_id,
        category_id: row.category_id,
        rating: row.rating,
        subject: row.subject,
        message: row.message,
        status: row.status,
        priority: row.priority,
        is_anonymous: row.is_anonymous,
        assigned_to: row.assigned_to,
        customer_name,
        customer_email,
        customer_phone,
        redacted,
        created_at: row.created_at,
        updated_at: row.updated_at,
        resolved_at: row.resolved_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::Role;
    use crate::policy::access::tests::{actor, feedback};
    use uuid::Uuid;

    #[test]
    fn redacted_view_masks_contact_fields() {
        let a = Uuid::new_v4();
        let staff = actor(Role::Staff, Some(a));
        let view = project(&staff, feedback(Some(a), None)).unwrap();
        assert!(view.redacted);
        assert_eq!(view.customer_name.as_deref(), Some(REDACTED_CUSTOMER_NAME));
        assert_eq!(view.customer_email, None);
        assert_eq!(view.customer_phone, None);
    }

    #[test]
    fn anonymous_rows_have_no_name_in_redacted_view() {
        let a = Uuid::new_v4();
        let staff = actor(Role::Staff, Some(a));
        let mut row = feedback(Some(a), None);
        row.is_anonymous = true;
        row.customer_name = None;
        let view = project(&staff, row).unwrap();
        assert!(view.is_anonymous);
        assert_eq!(view.customer_name, None);
    }

    #[test]
    fn assignee_sees_full_projection() {
        let a = Uuid::new_v4();
        let staff = actor(Role::Staff, Some(a));
        let view = project(&staff, feedback(Some(a), Some(staff.id))).unwrap();
        assert!(!view.redacted);
        assert_eq!(view.customer_email.as_deref(), Some("a@b.com"));
    }

    // Para todas as combinações de ator e linha: e-mail/telefone só aparecem
    // para admin, gerente da filial ou responsável.
    #[test]
    fn contact_data_only_reaches_privileged_readers() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let roles = [Role::Admin, Role::Manager, Role::Staff, Role::User, Role::Unrecognized];
        let branches = [Some(a), Some(b), None];

        for role in roles {
            for actor_branch in branches {
                let who = actor(role, actor_branch);
                for row_branch in branches {
                    for assigned in [None, Some(who.id), Some(Uuid::new_v4())] {
                        let row = feedback(row_branch, assigned);
                        let privileged = role == Role::Admin
                            || (role == Role::Manager
                                && (row_branch.is_none() || row_branch == actor_branch))
                            || (role != Role::Unrecognized
                                && assigned == Some(who.id)
                                && (row_branch.is_none() || row_branch == actor_branch));

                        if let Some(view) = project(&who, row) {
                            if !privileged {
                                assert!(view.redacted);
                                assert_eq!(view.customer_email, None);
                                assert_eq!(view.customer_phone, None);
                            } else {
                                assert!(!view.redacted);
                            }
                        }
                    }
                }
            }
        }
    }

    // Admin cria "Uptown"; M é gerente de Uptown; cliente anônimo envia nota 2
    // com e-mail; S (outra filial, não responsável) não vê a linha ou vê sem e-mail;
    // M vê o e-mail.
    #[test]
    fn uptown_scenario() {
        let uptown = Uuid::new_v4();
        let elsewhere = Uuid::new_v4();
        let manager = actor(Role::Manager, Some(uptown));
        let staff = actor(Role::Staff, Some(elsewhere));

        let mut row = feedback(Some(uptown), None);
        row.rating = 2;
        row.is_anonymous = true;
        row.customer_name = None;
        row.customer_email = Some("a@b.com".into());

        let staff_list = project_all(&staff, vec![row.clone()]);
        assert!(staff_list.iter().all(|v| v.customer_email.is_none()));

        let manager_view = project(&manager, row).unwrap();
        assert_eq!(manager_view.customer_email.as_deref(), Some("a@b.com"));
    }
}
