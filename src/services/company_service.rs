// src/services/company_service.rs

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BranchRepository, CompanyRepository, RbacRepository},
    models::{
        branch::{BranchFields, BranchStatus},
        company::{Company, CompanyMembership},
        role::RoleType,
    },
};

pub const DEFAULT_MAIN_BRANCH_NAME: &str = "Main Branch";

#[derive(Clone)]
pub struct CompanyService {
    company_repo: CompanyRepository,
    rbac_repo: RbacRepository,
    branch_repo: BranchRepository,
    pool: PgPool,
}

impl CompanyService {
    pub fn new(
        company_repo: CompanyRepository,
        rbac_repo: RbacRepository,
        branch_repo: BranchRepository,
        pool: PgPool,
    ) -> Self {
        Self { company_repo, rbac_repo, branch_repo, pool }
    }

    /// Cria a empresa e, na mesma transação, vincula o criador como Manager
    /// e cria a filial principal.
    pub async fn create_company(
        &self,
        owner_id: Uuid,
        name: &str,
        financial_year_start: NaiveDate,
        book_start_date: NaiveDate,
        main_branch_name: Option<&str>,
    ) -> Result<Company, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. A empresa
        let company = self
            .company_repo
            .create_company(&mut *tx, name, financial_year_start, book_start_date, owner_id)
            .await?;

        // 2. O criador entra com o cargo global de Manager
        let manager_role = self
            .rbac_repo
            .find_default_role(&mut *tx, RoleType::Manager)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Cargo padrão 'Manager' não foi semeado"))?;

        self.company_repo
            .add_member(&mut *tx, company.id, owner_id, manager_role.id)
            .await?;

        // 3. Filial principal
        let branch_name = main_branch_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_MAIN_BRANCH_NAME);

        let fields = BranchFields {
            name: branch_name,
            address: None,
            phone: None,
            email: None,
            status: BranchStatus::Active,
        };
        self.branch_repo
            .create_branch(&mut *tx, company.id, &fields, true)
            .await?;

        // 4. Commit
        tx.commit().await?;

        tracing::info!("🏢 Empresa '{}' criada por {}", company.name, owner_id);
        Ok(company)
    }

    pub async fn list_user_companies(&self, user_id: Uuid) -> Result<Vec<CompanyMembership>, AppError> {
        self.company_repo
            .list_memberships_for_user(&self.pool, user_id)
            .await
    }

    pub async fn get_company(&self, company_id: Uuid) -> Result<Company, AppError> {
        self.company_repo
            .find_by_id(&self.pool, company_id)
            .await?
            .ok_or(AppError::CompanyNotFound)
    }

    pub async fn update_company(
        &self,
        company_id: Uuid,
        name: &str,
        financial_year_start: NaiveDate,
        book_start_date: NaiveDate,
    ) -> Result<Company, AppError> {
        self.company_repo
            .update_company(&self.pool, company_id, name, financial_year_start, book_start_date)
            .await?
            .ok_or(AppError::CompanyNotFound)
    }

    pub async fn delete_company(&self, company_id: Uuid) -> Result<(), AppError> {
        let deleted = self.company_repo.delete_company(&self.pool, company_id).await?;
        if deleted == 0 {
            return Err(AppError::CompanyNotFound);
        }

        tracing::info!("🗑️ Empresa {} removida", company_id);
        Ok(())
    }
}
