// src/db/company_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    models::{
        company::{Company, CompanyMembership},
        role::Role,
    },
};

#[derive(Clone)]
pub struct CompanyRepository {
    pool: PgPool,
}

impl CompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cargo do usuário na empresa (com a matriz de permissões).
    pub async fn member_role<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<Role>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT r.*
            FROM user_companies uc
            JOIN roles r ON r.id = uc.role_id
            WHERE uc.user_id = $1 AND uc.company_id = $2
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_optional(executor)
        .await?;

        Ok(role)
    }

    pub async fn create_company<'e, E>(
        &self,
        executor: E,
        name: &str,
        financial_year_start: NaiveDate,
        book_start_date: NaiveDate,
        created_by: Uuid,
    ) -> Result<Company, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name, financial_year_start, book_start_date, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(financial_year_start)
        .bind(book_start_date)
        .bind(created_by)
        .fetch_one(executor)
        .await?;

        Ok(company)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Company>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(company)
    }

    pub async fn update_company<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: &str,
        financial_year_start: NaiveDate,
        book_start_date: NaiveDate,
    ) -> Result<Option<Company>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let company = sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET name = $2, financial_year_start = $3, book_start_date = $4, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(financial_year_start)
        .bind(book_start_date)
        .fetch_optional(executor)
        .await?;

        Ok(company)
    }

    pub async fn set_has_branches<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        has_branches: bool,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE companies SET has_branches = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(has_branches)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Apaga a empresa. Filiais, itens, cargos e vínculos caem em cascata.
    pub async fn delete_company<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // ---
    // Vínculos usuário <-> empresa
    // ---

    /// Empresas do usuário, com o nome do cargo e a flag de empresa padrão.
    pub async fn list_memberships_for_user<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<CompanyMembership>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let companies = sqlx::query_as::<_, CompanyMembership>(
            r#"
            SELECT
                c.id, c.name, c.financial_year_start, c.book_start_date, c.has_branches,
                uc.role_id, r.role_name,
                COALESCE(u.default_company_id = c.id, false) AS is_default
            FROM user_companies uc
            JOIN companies c ON c.id = uc.company_id
            JOIN roles r ON r.id = uc.role_id
            JOIN users u ON u.id = uc.user_id
            WHERE uc.user_id = $1
            ORDER BY c.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(companies)
    }

    pub async fn add_member<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO user_companies (user_id, company_id, role_id)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .bind(role_id)
        .execute(executor)
        .await
        .map_err(|e| map_unique_violation(e, |_| AppError::UserAlreadyMember))?;
        Ok(())
    }

    pub async fn update_member_role<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE user_companies SET role_id = $3 WHERE company_id = $1 AND user_id = $2",
        )
        .bind(company_id)
        .bind(user_id)
        .bind(role_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn remove_member<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM user_companies WHERE company_id = $1 AND user_id = $2")
            .bind(company_id)
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_memberships<'e, E>(&self, executor: E, user_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM user_companies WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }
}
