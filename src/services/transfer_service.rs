// src/services/transfer_service.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BranchRepository, InventoryRepository},
    models::inventory::{
        fits_scale, Item, NewItem, StockMovementReason, TransferCandidate, TransferReceipt,
        QUANTITY_SCALE,
    },
};

/// Pedido de transferência de estoque de uma filial de origem para outra.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub item_id: Uuid,
    pub target_branch_id: Uuid,
    pub quantity: Decimal,
    pub notes: Option<String>,
}

/// Como a filial de destino recebe a quantidade transferida.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetCredit {
    /// Já existe item com o mesmo código no destino: soma ao saldo.
    Increment { item_id: Uuid, new_quantity: Decimal },
    /// Não existe: clona o cadastro da origem com a quantidade transferida.
    Clone(NewItem),
}

/// Resultado do cálculo de uma transferência, antes de qualquer escrita.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferPlan {
    pub source_remaining: Decimal,
    pub target: TargetCredit,
}

/// Validações que não dependem do banco.
pub fn validate_request(source_branch_id: Uuid, request: &TransferRequest) -> Result<(), AppError> {
    if request.quantity <= Decimal::ZERO || !fits_scale(request.quantity, QUANTITY_SCALE) {
        return Err(AppError::InvalidQuantity(request.quantity));
    }
    if request.target_branch_id == source_branch_id {
        return Err(AppError::SameBranchTransfer);
    }
    Ok(())
}

/// Calcula os novos saldos a partir do estado atual (já travado) da origem e do destino.
pub fn plan_transfer(
    source: &Item,
    target_branch_id: Uuid,
    target_match: Option<&Item>,
    quantity: Decimal,
) -> Result<TransferPlan, AppError> {
    // Mais casas que a coluna seria arredondado pelo banco nas duas pernas
    if quantity <= Decimal::ZERO || !fits_scale(quantity, QUANTITY_SCALE) {
        return Err(AppError::InvalidQuantity(quantity));
    }
    if source.branch_id == target_branch_id {
        return Err(AppError::SameBranchTransfer);
    }
    if quantity > source.stock_quantity {
        return Err(AppError::InsufficientStock {
            available: source.stock_quantity,
            requested: quantity,
        });
    }

    let target = match target_match {
        Some(existing) => {
            debug_assert_eq!(existing.branch_id, target_branch_id);
            debug_assert_eq!(existing.code, source.code);
            TargetCredit::Increment {
                item_id: existing.id,
                new_quantity: existing.stock_quantity + quantity,
            }
        }
        None => TargetCredit::Clone(NewItem {
            branch_id: target_branch_id,
            group_id: source.group_id,
            name: source.name.clone(),
            code: source.code.clone(),
            description: source.description.clone(),
            price: source.price,
            stock_quantity: quantity,
        }),
    };

    Ok(TransferPlan {
        source_remaining: source.stock_quantity - quantity,
        target,
    })
}

#[derive(Clone)]
pub struct TransferService {
    inventory_repo: InventoryRepository,
    branch_repo: BranchRepository,
    pool: PgPool,
}

impl TransferService {
    pub fn new(inventory_repo: InventoryRepository, branch_repo: BranchRepository, pool: PgPool) -> Self {
        Self { inventory_repo, branch_repo, pool }
    }

    /// Itens da filial de origem com saldo para transferir.
    pub async fn candidates(
        &self,
        company_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Vec<TransferCandidate>, AppError> {
        self.branch_repo
            .find_by_id(&self.pool, company_id, branch_id)
            .await?
            .ok_or(AppError::BranchNotFound)?;

        self.inventory_repo
            .transfer_candidates(&self.pool, company_id, branch_id)
            .await
    }

    /// Move `quantity` do item da filial de origem para a filial de destino.
    /// Baixa, crédito (ou clone) e o registro no livro-razão acontecem numa única transação.
    pub async fn transfer(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        source_branch_id: Uuid,
        request: TransferRequest,
    ) -> Result<TransferReceipt, AppError> {
        validate_request(source_branch_id, &request)?;

        let mut tx = self.pool.begin().await?;

        // 1. As duas filiais precisam ser da empresa
        self.branch_repo
            .find_by_id(&mut *tx, company_id, source_branch_id)
            .await?
            .ok_or(AppError::BranchNotFound)?;
        self.branch_repo
            .find_by_id(&mut *tx, company_id, request.target_branch_id)
            .await?
            .ok_or(AppError::BranchNotFound)?;

        // 2. Relê o saldo da origem com trava
        let source = self
            .inventory_repo
            .find_item_for_update(&mut *tx, company_id, request.item_id)
            .await?
            .filter(|item| item.branch_id == source_branch_id)
            .ok_or(AppError::ItemNotFound)?;

        // 3. Mesmo código no destino?
        let target_match = self
            .inventory_repo
            .find_by_code_for_update(&mut *tx, request.target_branch_id, &source.code)
            .await?;

        let plan = plan_transfer(&source, request.target_branch_id, target_match.as_ref(), request.quantity)?;

        // 4. Baixa na origem
        let source = self
            .inventory_repo
            .set_stock_quantity(&mut *tx, source.id, plan.source_remaining)
            .await?;

        // 5. Crédito no destino
        let (target, created_in_target) = match plan.target {
            TargetCredit::Increment { item_id, new_quantity } => {
                let item = self
                    .inventory_repo
                    .set_stock_quantity(&mut *tx, item_id, new_quantity)
                    .await?;
                (item, false)
            }
            TargetCredit::Clone(new_item) => {
                let item = self
                    .inventory_repo
                    .create_item(&mut *tx, company_id, &new_item)
                    .await?;
                (item, true)
            }
        };

        // 6. Livro-razão: as duas pernas com o mesmo transfer_id
        let transfer_id = Uuid::new_v4();
        let notes = request.notes.as_deref();

        self.inventory_repo
            .record_stock_movement(
                &mut *tx,
                company_id,
                source.id,
                source.branch_id,
                Some(transfer_id),
                -request.quantity,
                StockMovementReason::TransferOut,
                notes,
                user_id,
            )
            .await?;
        self.inventory_repo
            .record_stock_movement(
                &mut *tx,
                company_id,
                target.id,
                target.branch_id,
                Some(transfer_id),
                request.quantity,
                StockMovementReason::TransferIn,
                notes,
                user_id,
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            "🔁 Transferência {}: {} x '{}' da filial {} para {}",
            transfer_id,
            request.quantity,
            source.code,
            source.branch_id,
            target.branch_id
        );

        Ok(TransferReceipt {
            transfer_id,
            quantity: request.quantity,
            source,
            target,
            created_in_target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn dec(num: i64, scale: u32) -> Decimal {
        Decimal::new(num, scale)
    }

    fn item(branch_id: Uuid, code: &str, stock: Decimal) -> Item {
        let now = Utc::now();
        Item {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            branch_id,
            group_id: Some(Uuid::new_v4()),
            name: "Café Torrado 500g".into(),
            code: code.into(),
            description: Some("Pacote".into()),
            price: dec(1990, 2),
            stock_quantity: stock,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn transfer_within_stock_decreases_source_by_exact_amount() {
        let source_branch = Uuid::new_v4();
        let target_branch = Uuid::new_v4();
        let source = item(source_branch, "CAF-500", dec(10, 0));

        let plan = plan_transfer(&source, target_branch, None, dec(4, 0)).unwrap();
        assert_eq!(plan.source_remaining, dec(6, 0));

        // Transferir tudo zera a origem
        let plan = plan_transfer(&source, target_branch, None, dec(10, 0)).unwrap();
        assert_eq!(plan.source_remaining, Decimal::ZERO);
    }

    #[test]
    fn transfer_above_stock_is_rejected_before_any_write() {
        let source = item(Uuid::new_v4(), "CAF-500", dec(3, 0));

        let err = plan_transfer(&source, Uuid::new_v4(), None, dec(5, 0)).unwrap_err();
        match err {
            AppError::InsufficientStock { available, requested } => {
                assert_eq!(available, dec(3, 0));
                assert_eq!(requested, dec(5, 0));
            }
            other => panic!("erro inesperado: {:?}", other),
        }
    }

    #[test]
    fn missing_product_in_target_is_cloned_with_new_branch_and_quantity() {
        let target_branch = Uuid::new_v4();
        let source = item(Uuid::new_v4(), "CAF-500", dec(10, 0));

        let plan = plan_transfer(&source, target_branch, None, dec(4, 0)).unwrap();
        match plan.target {
            TargetCredit::Clone(new_item) => {
                assert_eq!(new_item.branch_id, target_branch);
                assert_eq!(new_item.stock_quantity, dec(4, 0));
                assert_eq!(new_item.code, source.code);
                assert_eq!(new_item.name, source.name);
                assert_eq!(new_item.price, source.price);
                assert_eq!(new_item.group_id, source.group_id);
                assert_eq!(new_item.description, source.description);
            }
            other => panic!("esperava clone, veio {:?}", other),
        }
    }

    #[test]
    fn existing_product_in_target_is_incremented_not_duplicated() {
        let target_branch = Uuid::new_v4();
        let source = item(Uuid::new_v4(), "CAF-500", dec(10, 0));
        let existing = item(target_branch, "CAF-500", dec(2, 0));

        let plan = plan_transfer(&source, target_branch, Some(&existing), dec(4, 0)).unwrap();
        assert_eq!(
            plan.target,
            TargetCredit::Increment { item_id: existing.id, new_quantity: dec(6, 0) }
        );
    }

    #[test]
    fn fractional_quantities_are_exact() {
        let target_branch = Uuid::new_v4();
        let source = item(Uuid::new_v4(), "GRAO-KG", dec(1_000, 3));
        let existing = item(target_branch, "GRAO-KG", dec(250, 3));

        let plan = plan_transfer(&source, target_branch, Some(&existing), dec(333, 3)).unwrap();
        assert_eq!(plan.source_remaining, dec(667, 3));
        assert_eq!(
            plan.target,
            TargetCredit::Increment { item_id: existing.id, new_quantity: dec(583, 3) }
        );
    }

    #[test]
    fn quantity_finer_than_the_stock_column_is_rejected() {
        // 0.0005 de um saldo de 0.001 seria arredondado para 0.001 nas duas pernas
        let target_branch = Uuid::new_v4();
        let source = item(Uuid::new_v4(), "GRAO-KG", dec(1, 3));

        assert!(matches!(
            plan_transfer(&source, target_branch, None, dec(5, 4)),
            Err(AppError::InvalidQuantity(q)) if q == dec(5, 4)
        ));

        let request = TransferRequest {
            item_id: source.id,
            target_branch_id: target_branch,
            quantity: dec(5, 4),
            notes: None,
        };
        assert!(matches!(
            validate_request(source.branch_id, &request),
            Err(AppError::InvalidQuantity(_))
        ));

        // Zeros à direita não contam como precisão extra
        assert!(plan_transfer(&source, target_branch, None, dec(10, 4)).is_ok());
    }

    #[test]
    fn request_validation_happens_before_touching_the_database() {
        let source_branch = Uuid::new_v4();
        let mut request = TransferRequest {
            item_id: Uuid::new_v4(),
            target_branch_id: Uuid::new_v4(),
            quantity: Decimal::ZERO,
            notes: None,
        };
        assert!(matches!(
            validate_request(source_branch, &request),
            Err(AppError::InvalidQuantity(_))
        ));

        request.quantity = dec(-1, 0);
        assert!(matches!(
            validate_request(source_branch, &request),
            Err(AppError::InvalidQuantity(_))
        ));

        request.quantity = dec(1, 0);
        request.target_branch_id = source_branch;
        assert!(matches!(
            validate_request(source_branch, &request),
            Err(AppError::SameBranchTransfer)
        ));

        request.target_branch_id = Uuid::new_v4();
        assert!(validate_request(source_branch, &request).is_ok());
    }

    #[test]
    fn same_branch_is_rejected_by_the_plan_too() {
        let branch = Uuid::new_v4();
        let source = item(branch, "CAF-500", dec(10, 0));
        assert!(matches!(
            plan_transfer(&source, branch, None, dec(1, 0)),
            Err(AppError::SameBranchTransfer)
        ));
    }

    // ---
    // Contra o banco (migrations/)
    // ---

    use crate::services::test_support::Fixture;
    use sqlx::PgPool;

    fn request(item_id: Uuid, target_branch_id: Uuid, quantity: Decimal) -> TransferRequest {
        TransferRequest { item_id, target_branch_id, quantity, notes: Some("reposição".into()) }
    }

    #[sqlx::test]
    async fn transfer_clones_item_and_records_both_legs(pool: PgPool) {
        let fx = Fixture::new(pool).await;
        let target = fx.add_branch("Bairro").await;
        let source = fx.add_item(fx.main_branch.id, "CAF-1", dec(10_000, 3)).await;

        let receipt = fx
            .transfer_service()
            .transfer(fx.company.id, fx.owner.id, fx.main_branch.id, request(source.id, target.id, dec(2_500, 3)))
            .await
            .unwrap();

        assert!(receipt.created_in_target);
        let inventory = fx.inventory_service();
        let source_now = inventory.get_item(fx.company.id, source.id).await.unwrap();
        let target_now = inventory.get_item(fx.company.id, receipt.target.id).await.unwrap();
        assert_eq!(source_now.stock_quantity, dec(7_500, 3));
        assert_eq!(target_now.stock_quantity, dec(2_500, 3));
        assert_eq!(target_now.branch_id, target.id);
        assert_eq!(target_now.code, "CAF-1");
        assert_eq!(target_now.price, source.price);

        let out = inventory.list_movements(fx.company.id, source.id).await.unwrap();
        let out = out.iter().find(|m| m.reason == StockMovementReason::TransferOut).unwrap();
        let inn = inventory.list_movements(fx.company.id, target_now.id).await.unwrap();
        assert_eq!(inn.len(), 1);
        let inn = &inn[0];

        assert_eq!(inn.reason, StockMovementReason::TransferIn);
        assert_eq!(out.transfer_id, Some(receipt.transfer_id));
        assert_eq!(inn.transfer_id, Some(receipt.transfer_id));
        assert_eq!(out.quantity_changed, -dec(2_500, 3));
        assert_eq!(inn.quantity_changed, dec(2_500, 3));
        assert_eq!(out.created_by, Some(fx.owner.id));
    }

    #[sqlx::test]
    async fn transfer_increments_item_with_same_code(pool: PgPool) {
        let fx = Fixture::new(pool).await;
        let target = fx.add_branch("Bairro").await;
        let source = fx.add_item(fx.main_branch.id, "ARR-5", dec(8, 0)).await;
        let existing = fx.add_item(target.id, "ARR-5", dec(1, 0)).await;

        let receipt = fx
            .transfer_service()
            .transfer(fx.company.id, fx.owner.id, fx.main_branch.id, request(source.id, target.id, dec(3, 0)))
            .await
            .unwrap();

        assert!(!receipt.created_in_target);
        assert_eq!(receipt.target.id, existing.id);

        let inventory = fx.inventory_service();
        assert_eq!(inventory.get_item(fx.company.id, existing.id).await.unwrap().stock_quantity, dec(4, 0));
        assert_eq!(inventory.get_item(fx.company.id, source.id).await.unwrap().stock_quantity, dec(5, 0));
        assert_eq!(
            InventoryRepository::new(fx.pool.clone()).count_by_branch(&fx.pool, target.id).await.unwrap(),
            1
        );
    }

    #[sqlx::test]
    async fn overdrawn_transfer_writes_nothing(pool: PgPool) {
        let fx = Fixture::new(pool).await;
        let target = fx.add_branch("Bairro").await;
        let source = fx.add_item(fx.main_branch.id, "FEI-1", dec(10, 0)).await;

        let err = fx
            .transfer_service()
            .transfer(fx.company.id, fx.owner.id, fx.main_branch.id, request(source.id, target.id, dec(11, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { .. }));

        let inventory = fx.inventory_service();
        assert_eq!(inventory.get_item(fx.company.id, source.id).await.unwrap().stock_quantity, dec(10, 0));

        // Só o saldo inicial no livro-razão, nenhum item no destino
        let movements = inventory.list_movements(fx.company.id, source.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].reason, StockMovementReason::InitialStock);
        assert_eq!(
            InventoryRepository::new(fx.pool.clone()).count_by_branch(&fx.pool, target.id).await.unwrap(),
            0
        );
    }
}
