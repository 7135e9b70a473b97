// src/services/auth.rs
//
// Os tokens são emitidos pelo provedor de autenticação externo; aqui só
// validamos e resolvemos o perfil.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{BranchRepository, ProfileRepository, SubscriberRepository, TeamRepository},
    models::profile::{Claims, Principal, Profile, ProvisionedProfile},
};

#[derive(Clone)]
pub struct AuthService {
    profile_repo: ProfileRepository,
    branch_repo: BranchRepository,
    subscriber_repo: SubscriberRepository,
    team_repo: TeamRepository,
    jwt_secret: String,
    jwt_audience: String,
    trial_days: i64,
    pool: PgPool,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        profile_repo: ProfileRepository,
        branch_repo: BranchRepository,
        subscriber_repo: SubscriberRepository,
        team_repo: TeamRepository,
        jwt_secret: String,
        jwt_audience: String,
        trial_days: i64,
        pool: PgPool,
    ) -> Self {
        Self {
            profile_repo,
            branch_repo,
            subscriber_repo,
            team_repo,
            jwt_secret,
            jwt_audience,
            trial_days,
            pool,
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<Principal, AppError> {
        decode_principal(token, &self.jwt_secret, &self.jwt_audience)
    }

    /// Um principal autenticado sem perfil não deveria existir depois do cadastro.
    pub async fn resolve_profile(&self, principal: &Principal) -> Result<Profile, AppError> {
        self.profile_repo
            .find_by_id(principal.id)
            .await?
            .ok_or_else(|| AppError::Integrity(format!("principal {} sem perfil", principal.id)))
    }

    /// Cria perfil, linha de teste e membros de equipe a partir dos convites,
    /// tudo numa transação. Idempotente: chamar de novo não duplica nada.
    pub async fn provision(&self, principal: &Principal, full_name: Option<&str>) -> Result<ProvisionedProfile, AppError> {
        let email = principal
            .email
            .as_deref()
            .ok_or_else(|| AppError::InvalidInput("O token não contém e-mail.".into()))?;
        let now = Utc::now();

        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;

        let existing = self.profile_repo.find_by_id_with(&mut *tx, principal.id).await?;
        let created = existing.is_none();

        let profile = match existing {
            Some(profile) => profile,
            None => {
                let default_branch = self.branch_repo.find_default(&mut *tx).await?;
                let profile = self
                    .profile_repo
                    .create(&mut *tx, principal.id, email, full_name, default_branch.map(|b| b.id))
                    .await?;

                self.subscriber_repo
                    .ensure_trial(&mut *tx, profile.id, email, now + Duration::days(self.trial_days))
                    .await?;
                profile
            }
        };

        // Convites pendentes e válidos viram membros (uma vez cada)
        let accepted = self.team_repo.accept_pending_for_email(&mut *tx, email, now).await?;
        let mut joined_team_ids = Vec::with_capacity(accepted.len());
        for invitation in &accepted {
            if self
                .team_repo
                .add_member_if_absent(&mut *tx, invitation.team_id, profile.id, &invitation.role)
                .await?
            {
                joined_team_ids.push(invitation.team_id);
            }
        }

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        if created {
            tracing::info!(profile_id = %profile.id, "👤 Perfil provisionado");
        }
        if !joined_team_ids.is_empty() {
            tracing::info!(
                profile_id = %profile.id,
                teams = joined_team_ids.len(),
                "🔗 Convites aceitos no cadastro"
            );
        }

        Ok(ProvisionedProfile {
            profile,
            created,
            joined_team_ids,
        })
    }
}

pub fn decode_principal(token: &str, secret: &str, audience: &str) -> Result<Principal, AppError> {
    let mut validation = Validation::default();
    validation.set_audience(&[audience]);

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &validation)
        .map_err(|_| AppError::InvalidToken)?;

    Ok(Principal {
        id: token_data.claims.sub,
        email: token_data.claims.email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;
    use uuid::Uuid;

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: Uuid,
        email: &'a str,
        aud: &'a str,
        exp: usize,
    }

    fn token(secret: &str, aud: &str, exp_offset: i64) -> (Uuid, String) {
        let sub = Uuid::new_v4();
        let claims = TestClaims {
            sub,
            email: "staff@loja.com",
            aud,
            exp: (Utc::now().timestamp() + exp_offset) as usize,
        };
        let jwt = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref())).unwrap();
        (sub, jwt)
    }

    #[test]
    fn valid_token_yields_principal() {
        let (sub, jwt) = token("segredo", "authenticated", 3600);
        let principal = decode_principal(&jwt, "segredo", "authenticated").unwrap();
        assert_eq!(principal.id, sub);
        assert_eq!(principal.email.as_deref(), Some("staff@loja.com"));
    }

    #[test]
    fn wrong_secret_audience_or_expired_is_rejected() {
        let (_, jwt) = token("segredo", "authenticated", 3600);
        assert!(matches!(decode_principal(&jwt, "outro", "authenticated"), Err(AppError::InvalidToken)));

        let (_, jwt) = token("segredo", "anon", 3600);
        assert!(matches!(decode_principal(&jwt, "segredo", "authenticated"), Err(AppError::InvalidToken)));

        let (_, jwt) = token("segredo", "authenticated", -3600);
        assert!(matches!(decode_principal(&jwt, "segredo", "authenticated"), Err(AppError::InvalidToken)));
    }
}
