// src/db/branch_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    models::branch::{Branch, BranchFields},
};

#[derive(Clone)]
pub struct BranchRepository {
    pool: PgPool,
}

impl BranchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Leitura
    // ---

    pub async fn list_by_company<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<Vec<Branch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // A filial principal vem primeiro
        let branches = sqlx::query_as::<_, Branch>(
            r#"
            SELECT * FROM branches
            WHERE company_id = $1
            ORDER BY is_main_branch DESC, name ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(executor)
        .await?;
        Ok(branches)
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Branch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let branch = sqlx::query_as::<_, Branch>(
            "SELECT * FROM branches WHERE company_id = $1 AND id = $2",
        )
        .bind(company_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(branch)
    }

    /// Filiais às quais o usuário foi vinculado nesta empresa.
    pub async fn assigned_branch_ids(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT branch_id FROM user_branches WHERE user_id = $1 AND company_id = $2",
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    // ---
    // Escrita
    // ---

    pub async fn create_branch<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        fields: &BranchFields<'_>,
        is_main_branch: bool,
    ) -> Result<Branch, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Branch>(
            r#"
            INSERT INTO branches (company_id, name, address, phone, email, status, is_main_branch)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(fields.name)
        .bind(fields.address)
        .bind(fields.phone)
        .bind(fields.email)
        .bind(fields.status)
        .bind(is_main_branch)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_unique_violation(e, |constraint| match constraint {
                "branches_company_name_key" => AppError::BranchNameAlreadyExists(fields.name.to_string()),
                other => AppError::UniqueConstraintViolation(other.to_string()),
            })
        })
    }

    pub async fn update_branch<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        id: Uuid,
        fields: &BranchFields<'_>,
    ) -> Result<Option<Branch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Branch>(
            r#"
            UPDATE branches
            SET name = $3, address = $4, phone = $5, email = $6, status = $7, updated_at = now()
            WHERE company_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(id)
        .bind(fields.name)
        .bind(fields.address)
        .bind(fields.phone)
        .bind(fields.email)
        .bind(fields.status)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            map_unique_violation(e, |_| AppError::BranchNameAlreadyExists(fields.name.to_string()))
        })
    }

    /// Desmarca a filial principal atual. Deve rodar na mesma transação de `mark_main`.
    pub async fn clear_main<'e, E>(&self, executor: E, company_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE branches SET is_main_branch = false, updated_at = now()
            WHERE company_id = $1 AND is_main_branch
            "#,
        )
        .bind(company_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn mark_main<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Branch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let branch = sqlx::query_as::<_, Branch>(
            r#"
            UPDATE branches SET is_main_branch = true, updated_at = now()
            WHERE company_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(branch)
    }

    pub async fn count_by_company<'e, E>(&self, executor: E, company_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM branches WHERE company_id = $1")
            .bind(company_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn delete_branch<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM branches WHERE company_id = $1 AND id = $2")
            .bind(company_id)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // ---
    // Vínculos usuário <-> filial
    // ---

    pub async fn clear_user_branches<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM user_branches WHERE user_id = $1 AND company_id = $2")
            .bind(user_id)
            .bind(company_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Vincula o usuário às filiais informadas. Ids de outras empresas são ignorados.
    pub async fn add_user_branches<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        company_id: Uuid,
        branch_ids: &[Uuid],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO user_branches (user_id, branch_id, company_id)
            SELECT $1, b.id, b.company_id
            FROM branches b
            WHERE b.company_id = $2 AND b.id = ANY($3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .bind(branch_ids)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
