// src/services/user_service.rs

use chrono::{Duration, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BranchRepository, CompanyRepository, RbacRepository, UserRepository},
    models::user::{CompanyUser, InviteResponse},
};

/// Dados do convite vindos da tela de usuários.
#[derive(Debug, Clone)]
pub struct InviteRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role_id: Uuid,
    pub branch_ids: Vec<Uuid>,
}

/// Token opaco de uso único (256 bits aleatórios em hexadecimal).
pub fn new_invite_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub fn invite_link(base_url: &str, token: &str) -> String {
    format!("{}/accept-invite?token={}", base_url.trim_end_matches('/'), token)
}

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    company_repo: CompanyRepository,
    branch_repo: BranchRepository,
    rbac_repo: RbacRepository,
    pool: PgPool,
    app_base_url: String,
    invite_ttl: Duration,
}

impl UserService {
    pub fn new(
        user_repo: UserRepository,
        company_repo: CompanyRepository,
        branch_repo: BranchRepository,
        rbac_repo: RbacRepository,
        pool: PgPool,
        app_base_url: String,
        invite_ttl: Duration,
    ) -> Self {
        Self {
            user_repo,
            company_repo,
            branch_repo,
            rbac_repo,
            pool,
            app_base_url,
            invite_ttl,
        }
    }

    pub async fn list_users(&self, company_id: Uuid) -> Result<Vec<CompanyUser>, AppError> {
        self.user_repo.list_company_users(&self.pool, company_id).await
    }

    pub async fn get_user(&self, company_id: Uuid, user_id: Uuid) -> Result<CompanyUser, AppError> {
        self.user_repo
            .find_company_user(&self.pool, company_id, user_id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    /// Convida alguém para a empresa. Cria a conta se o e-mail for novo, vincula
    /// cargo e filiais e emite o link de uso único, tudo na mesma transação.
    pub async fn invite_user(
        &self,
        company_id: Uuid,
        request: &InviteRequest,
    ) -> Result<InviteResponse, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. O cargo precisa estar visível para a empresa
        self.rbac_repo
            .find_role(&mut *tx, company_id, request.role_id)
            .await?
            .ok_or(AppError::RoleNotFound)?;

        // 2. Conta existente ou nova (sem senha)
        let user = match self.user_repo.find_by_email_with(&mut *tx, &request.email).await? {
            Some(user) => user,
            None => {
                self.user_repo
                    .create_user(&mut *tx, &request.email, &request.first_name, &request.last_name, None)
                    .await?
            }
        };

        // 3. Vínculos
        self.company_repo
            .add_member(&mut *tx, company_id, user.id, request.role_id)
            .await?;
        self.branch_repo
            .add_user_branches(&mut *tx, user.id, company_id, &request.branch_ids)
            .await?;

        // 4. Link de convite só para quem ainda não tem senha
        let (invite_link, expires_at) = if user.has_accepted_invite() {
            (None, None)
        } else {
            let (link, expires_at) = self.issue_invite(&mut tx, user.id, company_id).await?;
            (Some(link), Some(expires_at))
        };

        let company_user = self
            .user_repo
            .find_company_user(&mut *tx, company_id, user.id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        tx.commit().await?;

        tracing::info!("✉️ Usuário {} convidado para a empresa {}", user.id, company_id);
        if let Some(link) = &invite_link {
            tracing::info!("🔗 Link de convite: {}", link);
        }

        Ok(InviteResponse { user: company_user, invite_link, expires_at })
    }

    /// Gera um novo link e invalida os anteriores.
    pub async fn resend_invite(&self, company_id: Uuid, user_id: Uuid) -> Result<InviteResponse, AppError> {
        let mut tx = self.pool.begin().await?;

        let company_user = self
            .user_repo
            .find_company_user(&mut *tx, company_id, user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if company_user.invite_accepted {
            return Err(AppError::InvalidInvite);
        }

        self.user_repo.invalidate_invites(&mut *tx, user_id, company_id).await?;
        let (link, expires_at) = self.issue_invite(&mut tx, user_id, company_id).await?;

        tx.commit().await?;

        tracing::info!("🔗 Convite reenviado para {}: {}", user_id, link);
        Ok(InviteResponse {
            user: company_user,
            invite_link: Some(link),
            expires_at: Some(expires_at),
        })
    }

    /// Troca cargo e filiais do usuário na empresa.
    pub async fn assign_role(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
        branch_ids: &[Uuid],
    ) -> Result<CompanyUser, AppError> {
        let mut tx = self.pool.begin().await?;

        self.rbac_repo
            .find_role(&mut *tx, company_id, role_id)
            .await?
            .ok_or(AppError::RoleNotFound)?;

        let updated = self
            .company_repo
            .update_member_role(&mut *tx, company_id, user_id, role_id)
            .await?;
        if updated == 0 {
            return Err(AppError::UserNotFound);
        }

        self.branch_repo.clear_user_branches(&mut *tx, user_id, company_id).await?;
        self.branch_repo
            .add_user_branches(&mut *tx, user_id, company_id, branch_ids)
            .await?;

        let company_user = self
            .user_repo
            .find_company_user(&mut *tx, company_id, user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        tx.commit().await?;
        Ok(company_user)
    }

    /// Remove o usuário da empresa; a conta some junto se não pertencer a nenhuma outra.
    pub async fn remove_user(
        &self,
        company_id: Uuid,
        acting_user_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), AppError> {
        if acting_user_id == user_id {
            return Err(AppError::CannotRemoveSelf);
        }

        let mut tx = self.pool.begin().await?;

        let removed = self.company_repo.remove_member(&mut *tx, company_id, user_id).await?;
        if removed == 0 {
            return Err(AppError::UserNotFound);
        }
        self.branch_repo.clear_user_branches(&mut *tx, user_id, company_id).await?;
        self.user_repo.invalidate_invites(&mut *tx, user_id, company_id).await?;

        let remaining = self.company_repo.count_memberships(&mut *tx, user_id).await?;
        if remaining == 0 {
            self.user_repo.delete_user(&mut *tx, user_id).await?;
        }

        tx.commit().await?;

        tracing::info!(
            "🗑️ Usuário {} removido da empresa {} (conta apagada: {})",
            user_id,
            company_id,
            remaining == 0
        );
        Ok(())
    }

    async fn issue_invite(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<(String, chrono::DateTime<Utc>), AppError> {
        let token = new_invite_token();
        let expires_at = Utc::now() + self.invite_ttl;

        self.user_repo
            .create_invite(&mut **tx, &token, user_id, company_id, expires_at)
            .await?;

        Ok((invite_link(&self.app_base_url, &token), expires_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_tokens_are_long_and_unique() {
        let a = new_invite_token();
        let b = new_invite_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn invite_link_ignores_trailing_slash() {
        assert_eq!(
            invite_link("https://app.example.com/", "abc"),
            "https://app.example.com/accept-invite?token=abc"
        );
        assert_eq!(
            invite_link("http://localhost:5173", "abc"),
            "http://localhost:5173/accept-invite?token=abc"
        );
    }
}
