// src/services/session_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BranchRepository, CompanyRepository, UserRepository},
    models::{auth::User, company::SessionState},
    services::branch_service::{can_access_branch, BranchService},
};

/// Escolha automática da tela de seleção: mantém a escolha salva se ainda for válida;
/// senão, avança sozinho quando só existe uma opção.
pub fn auto_select(current: Option<Uuid>, options: &[Uuid]) -> Option<Uuid> {
    match current {
        Some(id) if options.contains(&id) => Some(id),
        _ if options.len() == 1 => Some(options[0]),
        _ => None,
    }
}

#[derive(Clone)]
pub struct SessionService {
    company_repo: CompanyRepository,
    branch_repo: BranchRepository,
    user_repo: UserRepository,
    branch_service: BranchService,
    pool: PgPool,
}

impl SessionService {
    pub fn new(
        company_repo: CompanyRepository,
        branch_repo: BranchRepository,
        user_repo: UserRepository,
        branch_service: BranchService,
        pool: PgPool,
    ) -> Self {
        Self { company_repo, branch_repo, user_repo, branch_service, pool }
    }

    /// Estado atual de seleção. Uma escolha automática é persistida como padrão do usuário.
    pub async fn session(&self, user: &User) -> Result<SessionState, AppError> {
        let companies = self
            .company_repo
            .list_memberships_for_user(&self.pool, user.id)
            .await?;

        let company_ids: Vec<Uuid> = companies.iter().map(|c| c.id).collect();
        let selected_company_id = auto_select(user.default_company_id, &company_ids);

        let (branches, selected_branch_id) = match selected_company_id {
            Some(company_id) => {
                let role = self
                    .company_repo
                    .member_role(&self.pool, user.id, company_id)
                    .await?
                    .ok_or(AppError::NotCompanyMember)?;

                let branches = self
                    .branch_service
                    .list_accessible(company_id, user.id, &role)
                    .await?;
                let branch_ids: Vec<Uuid> = branches.iter().map(|b| b.id).collect();
                let selected = auto_select(user.default_branch_id, &branch_ids);
                (branches, selected)
            }
            None => (Vec::new(), None),
        };

        if selected_company_id != user.default_company_id || selected_branch_id != user.default_branch_id {
            self.user_repo
                .set_defaults(&self.pool, user.id, selected_company_id, selected_branch_id)
                .await?;
            tracing::debug!(
                "Seleção automática para {}: empresa {:?}, filial {:?}",
                user.id,
                selected_company_id,
                selected_branch_id
            );
        }

        Ok(SessionState {
            needs_company_selection: selected_company_id.is_none() && !companies.is_empty(),
            needs_branch_selection: selected_company_id.is_some()
                && selected_branch_id.is_none()
                && !branches.is_empty(),
            companies,
            selected_company_id,
            branches,
            selected_branch_id,
        })
    }

    /// Grava a empresa (e, opcionalmente, a filial) escolhida pelo usuário.
    pub async fn select(
        &self,
        user: &User,
        company_id: Uuid,
        branch_id: Option<Uuid>,
    ) -> Result<SessionState, AppError> {
        let role = self
            .company_repo
            .member_role(&self.pool, user.id, company_id)
            .await?
            .ok_or(AppError::NotCompanyMember)?;

        let branch_id = match branch_id {
            Some(branch_id) => {
                self.branch_repo
                    .find_by_id(&self.pool, company_id, branch_id)
                    .await?
                    .ok_or(AppError::BranchNotFound)?;

                let assigned = self.branch_repo.assigned_branch_ids(user.id, company_id).await?;
                if !can_access_branch(&role, &assigned, branch_id) {
                    return Err(AppError::BranchAccessDenied);
                }
                Some(branch_id)
            }
            None => None,
        };

        let user = self
            .user_repo
            .set_defaults(&self.pool, user.id, Some(company_id), branch_id)
            .await?;

        self.session(&user).await
    }
}
