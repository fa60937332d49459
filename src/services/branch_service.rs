// src/services/branch_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BranchRepository, CompanyRepository, InventoryRepository},
    models::{
        branch::{Branch, BranchFields},
        role::{Role, RoleType},
    },
};

/// Regras que impedem a exclusão de uma filial.
/// Itens vinculados são checados primeiro para a mensagem informar a quantidade.
pub fn ensure_deletable(branch: &Branch, item_count: i64) -> Result<(), AppError> {
    if item_count > 0 {
        return Err(AppError::BranchHasItems { count: item_count });
    }
    if branch.is_main_branch {
        return Err(AppError::MainBranchDeletion);
    }
    Ok(())
}

/// Gerentes enxergam todas as filiais; os demais cargos só as vinculadas.
pub fn can_access_branch(role: &Role, assigned: &[Uuid], branch_id: Uuid) -> bool {
    role.role_type == RoleType::Manager || assigned.contains(&branch_id)
}

/// Filiais às quais as consultas do usuário ficam restritas. None = todas (gerente).
pub fn branch_scope(role: &Role, assigned: Vec<Uuid>) -> Option<Vec<Uuid>> {
    if role.role_type == RoleType::Manager {
        None
    } else {
        Some(assigned)
    }
}

/// Filtra a lista de filiais pelo que o cargo pode ver.
pub fn accessible_branches(role: &Role, assigned: &[Uuid], branches: Vec<Branch>) -> Vec<Branch> {
    branches
        .into_iter()
        .filter(|b| can_access_branch(role, assigned, b.id))
        .collect()
}

#[derive(Clone)]
pub struct BranchService {
    branch_repo: BranchRepository,
    company_repo: CompanyRepository,
    inventory_repo: InventoryRepository,
    pool: PgPool,
}

impl BranchService {
    pub fn new(
        branch_repo: BranchRepository,
        company_repo: CompanyRepository,
        inventory_repo: InventoryRepository,
        pool: PgPool,
    ) -> Self {
        Self { branch_repo, company_repo, inventory_repo, pool }
    }

    pub async fn list_branches(&self, company_id: Uuid) -> Result<Vec<Branch>, AppError> {
        self.branch_repo.list_by_company(&self.pool, company_id).await
    }

    /// Filiais visíveis para o usuário nesta empresa.
    pub async fn list_accessible(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        role: &Role,
    ) -> Result<Vec<Branch>, AppError> {
        let branches = self.branch_repo.list_by_company(&self.pool, company_id).await?;
        if role.role_type == RoleType::Manager {
            return Ok(branches);
        }

        let assigned = self.branch_repo.assigned_branch_ids(user_id, company_id).await?;
        Ok(accessible_branches(role, &assigned, branches))
    }

    /// Restrição de filiais para listagens (None quando o cargo vê todas).
    pub async fn visible_branch_ids(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        role: &Role,
    ) -> Result<Option<Vec<Uuid>>, AppError> {
        if role.role_type == RoleType::Manager {
            return Ok(None);
        }
        let assigned = self.branch_repo.assigned_branch_ids(user_id, company_id).await?;
        Ok(branch_scope(role, assigned))
    }

    /// Falha com 403 se o usuário não pode operar na filial.
    pub async fn ensure_access(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        role: &Role,
        branch_id: Uuid,
    ) -> Result<(), AppError> {
        if role.role_type == RoleType::Manager {
            return Ok(());
        }

        let assigned = self.branch_repo.assigned_branch_ids(user_id, company_id).await?;
        if can_access_branch(role, &assigned, branch_id) {
            Ok(())
        } else {
            Err(AppError::BranchAccessDenied)
        }
    }

    pub async fn get_branch(&self, company_id: Uuid, branch_id: Uuid) -> Result<Branch, AppError> {
        self.branch_repo
            .find_by_id(&self.pool, company_id, branch_id)
            .await?
            .ok_or(AppError::BranchNotFound)
    }

    /// Cria uma filial. A primeira da empresa vira a principal; a partir da segunda a empresa passa a "ter filiais".
    pub async fn create_branch(
        &self,
        company_id: Uuid,
        fields: &BranchFields<'_>,
    ) -> Result<Branch, AppError> {
        let mut tx = self.pool.begin().await?;

        let existing = self.branch_repo.count_by_company(&mut *tx, company_id).await?;

        let branch = self
            .branch_repo
            .create_branch(&mut *tx, company_id, fields, existing == 0)
            .await?;

        if existing >= 1 {
            self.company_repo.set_has_branches(&mut *tx, company_id, true).await?;
        }

        tx.commit().await?;

        tracing::info!("🏬 Filial '{}' criada na empresa {}", branch.name, company_id);
        Ok(branch)
    }

    pub async fn update_branch(
        &self,
        company_id: Uuid,
        branch_id: Uuid,
        fields: &BranchFields<'_>,
    ) -> Result<Branch, AppError> {
        self.branch_repo
            .update_branch(&self.pool, company_id, branch_id, fields)
            .await?
            .ok_or(AppError::BranchNotFound)
    }

    /// Troca a filial principal: desmarca a atual e marca a nova na mesma transação.
    pub async fn set_main_branch(&self, company_id: Uuid, branch_id: Uuid) -> Result<Branch, AppError> {
        let mut tx = self.pool.begin().await?;

        self.branch_repo
            .find_by_id(&mut *tx, company_id, branch_id)
            .await?
            .ok_or(AppError::BranchNotFound)?;

        self.branch_repo.clear_main(&mut *tx, company_id).await?;
        let branch = self
            .branch_repo
            .mark_main(&mut *tx, company_id, branch_id)
            .await?
            .ok_or(AppError::BranchNotFound)?;

        tx.commit().await?;
        Ok(branch)
    }

    pub async fn delete_branch(&self, company_id: Uuid, branch_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let branch = self
            .branch_repo
            .find_by_id(&mut *tx, company_id, branch_id)
            .await?
            .ok_or(AppError::BranchNotFound)?;

        let item_count = self.inventory_repo.count_by_branch(&mut *tx, branch_id).await?;
        ensure_deletable(&branch, item_count)?;

        self.branch_repo.delete_branch(&mut *tx, company_id, branch_id).await?;

        let remaining = self.branch_repo.count_by_company(&mut *tx, company_id).await?;
        if remaining <= 1 {
            self.company_repo.set_has_branches(&mut *tx, company_id, false).await?;
        }

        tx.commit().await?;

        tracing::info!("🗑️ Filial '{}' removida da empresa {}", branch.name, company_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{branch::BranchStatus, role::PermissionMatrix};
    use chrono::Utc;

    fn branch(is_main: bool) -> Branch {
        let now = Utc::now();
        Branch {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: "Centro".into(),
            address: None,
            phone: None,
            email: None,
            is_main_branch: is_main,
            status: BranchStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    fn role(role_type: RoleType) -> Role {
        let now = Utc::now();
        Role {
            id: Uuid::new_v4(),
            company_id: None,
            role_name: role_type.default_role_name().into(),
            role_type,
            permissions: PermissionMatrix::template(role_type),
            is_default: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn branch_with_items_cannot_be_deleted_and_reports_the_count() {
        match ensure_deletable(&branch(false), 7) {
            Err(AppError::BranchHasItems { count }) => assert_eq!(count, 7),
            other => panic!("resultado inesperado: {:?}", other),
        }
    }

    #[test]
    fn item_count_is_reported_even_for_the_main_branch() {
        assert!(matches!(
            ensure_deletable(&branch(true), 2),
            Err(AppError::BranchHasItems { count: 2 })
        ));
    }

    #[test]
    fn empty_main_branch_cannot_be_deleted() {
        assert!(matches!(
            ensure_deletable(&branch(true), 0),
            Err(AppError::MainBranchDeletion)
        ));
    }

    #[test]
    fn empty_secondary_branch_can_be_deleted() {
        assert!(ensure_deletable(&branch(false), 0).is_ok());
    }

    #[test]
    fn manager_sees_every_branch_others_only_assigned() {
        let a = branch(true);
        let b = branch(false);
        let all = vec![a.clone(), b.clone()];

        let manager = role(RoleType::Manager);
        assert_eq!(accessible_branches(&manager, &[], all.clone()).len(), 2);

        let clerk = role(RoleType::InventoryManager);
        let visible = accessible_branches(&clerk, &[b.id], all);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, b.id);
        assert!(!can_access_branch(&clerk, &[b.id], a.id));
    }

    #[test]
    fn listing_scope_is_unrestricted_only_for_managers() {
        let assigned = vec![Uuid::new_v4()];

        assert_eq!(branch_scope(&role(RoleType::Manager), assigned.clone()), None);
        assert_eq!(
            branch_scope(&role(RoleType::InventoryManager), assigned.clone()),
            Some(assigned)
        );
        // Sem vínculo nenhum, a lista fica vazia em vez de liberar tudo
        assert_eq!(branch_scope(&role(RoleType::SalesManager), Vec::new()), Some(Vec::new()));
    }

    // ---
    // Contra o banco (migrations/)
    // ---

    use crate::services::test_support::Fixture;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn branch_with_items_is_not_deleted(pool: PgPool) {
        let fx = Fixture::new(pool).await;
        let bairro = fx.add_branch("Bairro").await;
        fx.add_item(bairro.id, "A-1", rust_decimal::Decimal::ONE).await;
        fx.add_item(bairro.id, "A-2", rust_decimal::Decimal::ZERO).await;

        let err = fx.branch_service().delete_branch(fx.company.id, bairro.id).await.unwrap_err();
        assert!(matches!(err, AppError::BranchHasItems { count: 2 }));

        assert!(fx.branch_service().get_branch(fx.company.id, bairro.id).await.is_ok());
        assert!(fx.company().await.has_branches);
    }

    #[sqlx::test]
    async fn has_branches_follows_the_branch_count(pool: PgPool) {
        let fx = Fixture::new(pool).await;
        assert!(!fx.company().await.has_branches);

        let bairro = fx.add_branch("Bairro").await;
        assert!(!bairro.is_main_branch);
        assert!(fx.company().await.has_branches);

        fx.branch_service().delete_branch(fx.company.id, bairro.id).await.unwrap();
        assert!(!fx.company().await.has_branches);

        let err = fx
            .branch_service()
            .delete_branch(fx.company.id, fx.main_branch.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MainBranchDeletion));
    }
}
