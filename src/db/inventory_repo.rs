// src/db/inventory_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    models::inventory::{
        Item, ItemFilter, ItemUpdate, NewItem, StockMovement, StockMovementReason,
        TransferCandidate,
    },
};

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Funções de "Leitura"
    // ---

    pub async fn list_items<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        filter: &ItemFilter,
        branch_scope: Option<&[Uuid]>,
    ) -> Result<Vec<Item>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT * FROM items
            WHERE company_id = $1
              AND ($2::uuid IS NULL OR branch_id = $2)
              AND ($3::uuid IS NULL OR group_id = $3)
              AND ($4::text IS NULL OR name ILIKE $4 OR code ILIKE $4)
              AND ($5::uuid[] IS NULL OR branch_id = ANY($5))
            ORDER BY name ASC
            "#,
        )
        .bind(company_id)
        .bind(filter.branch_id)
        .bind(filter.group_id)
        .bind(filter.search_pattern())
        .bind(branch_scope.map(<[Uuid]>::to_vec))
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn find_item<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Item>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE company_id = $1 AND id = $2")
            .bind(company_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(item)
    }

    /// Lê o item travando a linha até o fim da transação.
    pub async fn find_item_for_update<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Item>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, Item>(
            "SELECT * FROM items WHERE company_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(company_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(item)
    }

    /// Procura, com trava, o item de mesmo código numa filial.
    pub async fn find_by_code_for_update<'e, E>(
        &self,
        executor: E,
        branch_id: Uuid,
        code: &str,
    ) -> Result<Option<Item>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, Item>(
            "SELECT * FROM items WHERE branch_id = $1 AND code = $2 FOR UPDATE",
        )
        .bind(branch_id)
        .bind(code)
        .fetch_optional(executor)
        .await?;
        Ok(item)
    }

    pub async fn transfer_candidates<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Vec<TransferCandidate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, TransferCandidate>(
            r#"
            SELECT id, name, code, stock_quantity
            FROM items
            WHERE company_id = $1 AND branch_id = $2 AND stock_quantity > 0
            ORDER BY name ASC
            "#,
        )
        .bind(company_id)
        .bind(branch_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn count_by_branch<'e, E>(&self, executor: E, branch_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items WHERE branch_id = $1")
            .bind(branch_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn list_movements<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        item_id: Uuid,
    ) -> Result<Vec<StockMovement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE company_id = $1 AND item_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(company_id)
        .bind(item_id)
        .fetch_all(executor)
        .await?;
        Ok(movements)
    }

    // ---
    // Funções de "Escrita" (rodam dentro da transação do serviço)
    // ---

    pub async fn create_item<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        item: &NewItem,
    ) -> Result<Item, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (company_id, branch_id, group_id, name, code, description, price, stock_quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(item.branch_id)
        .bind(item.group_id)
        .bind(&item.name)
        .bind(&item.code)
        .bind(&item.description)
        .bind(item.price)
        .bind(item.stock_quantity)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, |_| AppError::CodeAlreadyExists(item.code.clone())))
    }

    pub async fn update_item<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        id: Uuid,
        changes: &ItemUpdate,
    ) -> Result<Option<Item>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Item>(
            r#"
            UPDATE items
            SET group_id = $3, name = $4, code = $5, description = $6, price = $7, updated_at = now()
            WHERE company_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(id)
        .bind(changes.group_id)
        .bind(&changes.name)
        .bind(&changes.code)
        .bind(&changes.description)
        .bind(changes.price)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, |_| AppError::CodeAlreadyExists(changes.code.clone())))
    }

    /// Grava o saldo calculado pelo serviço (a linha já está travada).
    pub async fn set_stock_quantity<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        stock_quantity: Decimal,
    ) -> Result<Item, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Item>(
            r#"
            UPDATE items SET stock_quantity = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(stock_quantity)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::ItemNotFound)
    }

    pub async fn delete_item<'e, E>(&self, executor: E, company_id: Uuid, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM items WHERE company_id = $1 AND id = $2")
            .bind(company_id)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Registra uma movimentação no livro-razão (auditoria).
    #[allow(clippy::too_many_arguments)]
    pub async fn record_stock_movement<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        item_id: Uuid,
        branch_id: Uuid,
        transfer_id: Option<Uuid>,
        quantity_changed: Decimal,
        reason: StockMovementReason,
        notes: Option<&str>,
        created_by: Uuid,
    ) -> Result<StockMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, StockMovement>(
            r#"
            INSERT INTO stock_movements
                (company_id, item_id, branch_id, transfer_id, quantity_changed, reason, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(item_id)
        .bind(branch_id)
        .bind(transfer_id)
        .bind(quantity_changed)
        .bind(reason)
        .bind(notes)
        .bind(created_by)
        .fetch_one(executor)
        .await?;

        Ok(movement)
    }
}
