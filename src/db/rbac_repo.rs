// src/db/rbac_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    models::role::{PermissionMatrix, Role, RoleType},
};

#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cargos visíveis para a empresa: os dela mais os modelos globais.
    pub async fn list_roles<'e, E>(&self, executor: E, company_id: Uuid) -> Result<Vec<Role>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT * FROM roles
            WHERE company_id = $1 OR company_id IS NULL
            ORDER BY is_default DESC, role_name ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(executor)
        .await?;
        Ok(roles)
    }

    pub async fn find_role<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Role>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let role = sqlx::query_as::<_, Role>(
            "SELECT * FROM roles WHERE id = $2 AND (company_id = $1 OR company_id IS NULL)",
        )
        .bind(company_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(role)
    }

    pub async fn find_default_role<'e, E>(
        &self,
        executor: E,
        role_type: RoleType,
    ) -> Result<Option<Role>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT * FROM roles
            WHERE company_id IS NULL AND is_default AND role_type = $1
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(role_type)
        .fetch_optional(executor)
        .await?;
        Ok(role)
    }

    /// Garante o cargo global padrão do tipo informado (idempotente).
    pub async fn ensure_default_role(&self, role_type: RoleType) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO roles (company_id, role_name, role_type, permissions, is_default)
            VALUES (NULL, $1, $2, $3, true)
            ON CONFLICT (role_name) WHERE company_id IS NULL DO NOTHING
            "#,
        )
        .bind(role_type.default_role_name())
        .bind(role_type)
        .bind(Json(PermissionMatrix::template(role_type)))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn create_role<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        role_name: &str,
        role_type: RoleType,
        permissions: &PermissionMatrix,
    ) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (company_id, role_name, role_type, permissions, is_default)
            VALUES ($1, $2, $3, $4, false)
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(role_name)
        .bind(role_type)
        .bind(Json(permissions))
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, |_| AppError::RoleNameAlreadyExists(role_name.to_string())))
    }

    pub async fn update_role<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        id: Uuid,
        role_name: &str,
        permissions: &PermissionMatrix,
    ) -> Result<Option<Role>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET role_name = $3, permissions = $4, updated_at = now()
            WHERE company_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(id)
        .bind(role_name)
        .bind(Json(permissions))
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, |_| AppError::RoleNameAlreadyExists(role_name.to_string())))
    }

    pub async fn count_assignments<'e, E>(&self, executor: E, role_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_companies WHERE role_id = $1")
            .bind(role_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn delete_role<'e, E>(&self, executor: E, company_id: Uuid, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM roles WHERE company_id = $1 AND id = $2")
            .bind(company_id)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
