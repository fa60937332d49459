// src/db/item_group_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    models::inventory::ItemGroup,
};

#[derive(Clone)]
pub struct ItemGroupRepository {
    pool: PgPool,
}

impl ItemGroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_groups(&self, company_id: Uuid) -> Result<Vec<ItemGroup>, AppError> {
        let groups = sqlx::query_as::<_, ItemGroup>(
            "SELECT * FROM item_groups WHERE company_id = $1 ORDER BY name ASC",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    /// Trava todos os grupos da empresa até o fim da transação.
    pub async fn list_groups_for_update<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<Vec<ItemGroup>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let groups = sqlx::query_as::<_, ItemGroup>(
            "SELECT * FROM item_groups WHERE company_id = $1 ORDER BY id FOR UPDATE",
        )
        .bind(company_id)
        .fetch_all(executor)
        .await?;
        Ok(groups)
    }

    pub async fn find_group<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ItemGroup>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let group = sqlx::query_as::<_, ItemGroup>(
            "SELECT * FROM item_groups WHERE company_id = $1 AND id = $2",
        )
        .bind(company_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(group)
    }

    /// Cria uma nova categoria (raiz ou subgrupo).
    pub async fn create_group<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
        description: Option<&str>,
    ) -> Result<ItemGroup, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ItemGroup>(
            r#"
            INSERT INTO item_groups (company_id, parent_id, name, description)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(parent_id)
        .bind(name)
        .bind(description)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, |_| AppError::ItemGroupNameAlreadyExists(name.to_string())))
    }

    pub async fn update_group<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
        description: Option<&str>,
    ) -> Result<Option<ItemGroup>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ItemGroup>(
            r#"
            UPDATE item_groups
            SET parent_id = $3, name = $4, description = $5, updated_at = now()
            WHERE company_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(id)
        .bind(parent_id)
        .bind(name)
        .bind(description)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, |_| AppError::ItemGroupNameAlreadyExists(name.to_string())))
    }

    pub async fn count_children<'e, E>(&self, executor: E, id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM item_groups WHERE parent_id = $1")
            .bind(id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    /// Apaga o grupo; os itens dele ficam sem grupo (ON DELETE SET NULL).
    pub async fn delete_group<'e, E>(&self, executor: E, company_id: Uuid, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM item_groups WHERE company_id = $1 AND id = $2")
            .bind(company_id)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
