// src/services/inventory_service.rs

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BranchRepository, InventoryRepository, ItemGroupRepository},
    models::inventory::{
        fits_scale, Item, ItemFilter, ItemGroup, ItemGroupNode, ItemUpdate, NewItem,
        StockMovement, StockMovementReason, QUANTITY_SCALE,
    },
};

/// Novo saldo após um ajuste manual. O estoque nunca fica negativo.
pub fn apply_adjustment(current: Decimal, delta: Decimal) -> Result<Decimal, AppError> {
    if delta.is_zero() || !fits_scale(delta, QUANTITY_SCALE) {
        return Err(AppError::InvalidQuantity(delta));
    }
    let next = current + delta;
    if next < Decimal::ZERO {
        return Err(AppError::InsufficientStock {
            available: current,
            requested: -delta,
        });
    }
    Ok(next)
}

/// Monta a árvore de grupos a partir da lista plana.
/// Grupos cujo pai não está na lista viram raízes.
pub fn build_group_tree(groups: Vec<ItemGroup>) -> Vec<ItemGroupNode> {
    let known: HashSet<Uuid> = groups.iter().map(|g| g.id).collect();
    let mut by_parent: HashMap<Option<Uuid>, Vec<ItemGroup>> = HashMap::new();

    for group in groups {
        let parent = group.parent_id.filter(|p| known.contains(p));
        by_parent.entry(parent).or_default().push(group);
    }

    fn attach(parent: Option<Uuid>, by_parent: &mut HashMap<Option<Uuid>, Vec<ItemGroup>>) -> Vec<ItemGroupNode> {
        let mut level = by_parent.remove(&parent).unwrap_or_default();
        level.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        level
            .into_iter()
            .map(|group| {
                let children = attach(Some(group.id), by_parent);
                ItemGroupNode { group, children }
            })
            .collect()
    }

    attach(None, &mut by_parent)
}

/// true se mover `group_id` para debaixo de `new_parent` criaria um ciclo.
pub fn would_create_cycle(groups: &[ItemGroup], group_id: Uuid, new_parent: Option<Uuid>) -> bool {
    let parents: HashMap<Uuid, Option<Uuid>> = groups.iter().map(|g| (g.id, g.parent_id)).collect();

    let mut visited = HashSet::new();
    let mut cursor = new_parent;
    while let Some(current) = cursor {
        if current == group_id || !visited.insert(current) {
            return true;
        }
        cursor = parents.get(&current).copied().flatten();
    }
    false
}

/// Valida a troca de pai de `group_id` contra a lista atual de grupos da empresa.
pub fn check_reparent(groups: &[ItemGroup], group_id: Uuid, new_parent: Option<Uuid>) -> Result<(), AppError> {
    if !groups.iter().any(|g| g.id == group_id) {
        return Err(AppError::ItemGroupNotFound);
    }
    if let Some(parent_id) = new_parent {
        if !groups.iter().any(|g| g.id == parent_id) {
            return Err(AppError::ItemGroupNotFound);
        }
        if would_create_cycle(groups, group_id, Some(parent_id)) {
            return Err(AppError::ItemGroupCycle);
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct InventoryService {
    inventory_repo: InventoryRepository,
    group_repo: ItemGroupRepository,
    branch_repo: BranchRepository,
    pool: PgPool,
}

impl InventoryService {
    pub fn new(
        inventory_repo: InventoryRepository,
        group_repo: ItemGroupRepository,
        branch_repo: BranchRepository,
        pool: PgPool,
    ) -> Self {
        Self { inventory_repo, group_repo, branch_repo, pool }
    }

    // ---
    // Itens
    // ---

    /// `branch_scope` restringe às filiais visíveis para o cargo (None = todas).
    pub async fn list_items(
        &self,
        company_id: Uuid,
        filter: &ItemFilter,
        branch_scope: Option<&[Uuid]>,
    ) -> Result<Vec<Item>, AppError> {
        self.inventory_repo
            .list_items(&self.pool, company_id, filter, branch_scope)
            .await
    }

    pub async fn get_item(&self, company_id: Uuid, item_id: Uuid) -> Result<Item, AppError> {
        self.inventory_repo
            .find_item(&self.pool, company_id, item_id)
            .await?
            .ok_or(AppError::ItemNotFound)
    }

    /// Cadastra o item e registra o saldo inicial no livro-razão.
    pub async fn create_item(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        new_item: &NewItem,
    ) -> Result<Item, AppError> {
        if new_item.stock_quantity < Decimal::ZERO || !fits_scale(new_item.stock_quantity, QUANTITY_SCALE) {
            return Err(AppError::InvalidQuantity(new_item.stock_quantity));
        }

        let mut tx = self.pool.begin().await?;

        self.branch_repo
            .find_by_id(&mut *tx, company_id, new_item.branch_id)
            .await?
            .ok_or(AppError::BranchNotFound)?;

        if let Some(group_id) = new_item.group_id {
            self.group_repo
                .find_group(&mut *tx, company_id, group_id)
                .await?
                .ok_or(AppError::ItemGroupNotFound)?;
        }

        let item = self.inventory_repo.create_item(&mut *tx, company_id, new_item).await?;

        if item.stock_quantity > Decimal::ZERO {
            self.inventory_repo
                .record_stock_movement(
                    &mut *tx,
                    company_id,
                    item.id,
                    item.branch_id,
                    None,
                    item.stock_quantity,
                    StockMovementReason::InitialStock,
                    None,
                    user_id,
                )
                .await?;
        }

        tx.commit().await?;
        Ok(item)
    }

    pub async fn update_item(
        &self,
        company_id: Uuid,
        item_id: Uuid,
        changes: &ItemUpdate,
    ) -> Result<Item, AppError> {
        if let Some(group_id) = changes.group_id {
            self.group_repo
                .find_group(&self.pool, company_id, group_id)
                .await?
                .ok_or(AppError::ItemGroupNotFound)?;
        }

        self.inventory_repo
            .update_item(&self.pool, company_id, item_id, changes)
            .await?
            .ok_or(AppError::ItemNotFound)
    }

    /// Ajuste manual de estoque (delta com sinal), registrado como ADJUSTMENT.
    pub async fn adjust_stock(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        item_id: Uuid,
        delta: Decimal,
        notes: Option<&str>,
    ) -> Result<Item, AppError> {
        let mut tx = self.pool.begin().await?;

        let item = self
            .inventory_repo
            .find_item_for_update(&mut *tx, company_id, item_id)
            .await?
            .ok_or(AppError::ItemNotFound)?;

        let next = apply_adjustment(item.stock_quantity, delta)?;

        let item = self
            .inventory_repo
            .set_stock_quantity(&mut *tx, item.id, next)
            .await?;

        self.inventory_repo
            .record_stock_movement(
                &mut *tx,
                company_id,
                item.id,
                item.branch_id,
                None,
                delta,
                StockMovementReason::Adjustment,
                notes,
                user_id,
            )
            .await?;

        tx.commit().await?;
        Ok(item)
    }

    pub async fn delete_item(&self, company_id: Uuid, item_id: Uuid) -> Result<(), AppError> {
        let deleted = self.inventory_repo.delete_item(&self.pool, company_id, item_id).await?;
        if deleted == 0 {
            return Err(AppError::ItemNotFound);
        }
        Ok(())
    }

    pub async fn list_movements(&self, company_id: Uuid, item_id: Uuid) -> Result<Vec<StockMovement>, AppError> {
        self.get_item(company_id, item_id).await?;
        self.inventory_repo.list_movements(&self.pool, company_id, item_id).await
    }

    // ---
    // Grupos de itens
    // ---

    pub async fn list_groups(&self, company_id: Uuid) -> Result<Vec<ItemGroup>, AppError> {
        self.group_repo.list_groups(company_id).await
    }

    pub async fn group_tree(&self, company_id: Uuid) -> Result<Vec<ItemGroupNode>, AppError> {
        let groups = self.group_repo.list_groups(company_id).await?;
        Ok(build_group_tree(groups))
    }

    pub async fn get_group(&self, company_id: Uuid, group_id: Uuid) -> Result<ItemGroup, AppError> {
        self.group_repo
            .find_group(&self.pool, company_id, group_id)
            .await?
            .ok_or(AppError::ItemGroupNotFound)
    }

    pub async fn create_group(
        &self,
        company_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
        description: Option<&str>,
    ) -> Result<ItemGroup, AppError> {
        if let Some(parent_id) = parent_id {
            self.get_group(company_id, parent_id).await?;
        }

        self.group_repo
            .create_group(&self.pool, company_id, parent_id, name, description)
            .await
    }

    pub async fn update_group(
        &self,
        company_id: Uuid,
        group_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
        description: Option<&str>,
    ) -> Result<ItemGroup, AppError> {
        let mut tx = self.pool.begin().await?;

        // Duas trocas de pai concorrentes não podem fechar um ciclo entre si
        let groups = self.group_repo.list_groups_for_update(&mut *tx, company_id).await?;
        check_reparent(&groups, group_id, parent_id)?;

        let group = self
            .group_repo
            .update_group(&mut *tx, company_id, group_id, parent_id, name, description)
            .await?
            .ok_or(AppError::ItemGroupNotFound)?;

        tx.commit().await?;
        Ok(group)
    }

    /// Só apaga grupos sem subgrupos; os itens do grupo ficam sem grupo.
    pub async fn delete_group(&self, company_id: Uuid, group_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        self.group_repo
            .find_group(&mut *tx, company_id, group_id)
            .await?
            .ok_or(AppError::ItemGroupNotFound)?;

        if self.group_repo.count_children(&mut *tx, group_id).await? > 0 {
            return Err(AppError::ItemGroupHasChildren);
        }

        self.group_repo.delete_group(&mut *tx, company_id, group_id).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn group(name: &str, parent_id: Option<Uuid>) -> ItemGroup {
        let now = Utc::now();
        ItemGroup {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            parent_id,
            name: name.into(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn tree_nests_children_under_their_parent() {
        let bebidas = group("Bebidas", None);
        let cafe = group("Café", Some(bebidas.id));
        let graos = group("Grãos", Some(cafe.id));
        let limpeza = group("Limpeza", None);

        let tree = build_group_tree(vec![graos.clone(), limpeza.clone(), cafe.clone(), bebidas.clone()]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].group.id, bebidas.id);
        assert_eq!(tree[1].group.id, limpeza.id);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].group.id, cafe.id);
        assert_eq!(tree[0].children[0].children[0].group.id, graos.id);
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn orphan_group_becomes_root() {
        let orphan = group("Órfão", Some(Uuid::new_v4()));
        let tree = build_group_tree(vec![orphan.clone()]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].group.id, orphan.id);
    }

    #[test]
    fn reparenting_under_own_descendant_is_a_cycle() {
        let a = group("A", None);
        let b = group("B", Some(a.id));
        let c = group("C", Some(b.id));
        let groups = vec![a.clone(), b.clone(), c.clone()];

        assert!(would_create_cycle(&groups, a.id, Some(c.id)));
        assert!(would_create_cycle(&groups, a.id, Some(a.id)));
        assert!(!would_create_cycle(&groups, c.id, Some(a.id)));
        assert!(!would_create_cycle(&groups, b.id, None));
    }

    #[test]
    fn reparent_checks_both_groups_and_the_cycle() {
        let a = group("A", None);
        let b = group("B", Some(a.id));
        let groups = vec![a.clone(), b.clone()];

        assert!(check_reparent(&groups, b.id, None).is_ok());
        assert!(check_reparent(&groups, b.id, Some(a.id)).is_ok());
        assert!(matches!(check_reparent(&groups, a.id, Some(b.id)), Err(AppError::ItemGroupCycle)));
        assert!(matches!(
            check_reparent(&groups, b.id, Some(Uuid::new_v4())),
            Err(AppError::ItemGroupNotFound)
        ));
        assert!(matches!(
            check_reparent(&groups, Uuid::new_v4(), None),
            Err(AppError::ItemGroupNotFound)
        ));
    }

    #[test]
    fn adjustment_never_goes_below_zero() {
        let current = Decimal::new(5, 0);

        assert_eq!(apply_adjustment(current, Decimal::new(3, 0)).unwrap(), Decimal::new(8, 0));
        assert_eq!(apply_adjustment(current, Decimal::new(-5, 0)).unwrap(), Decimal::ZERO);

        match apply_adjustment(current, Decimal::new(-6, 0)) {
            Err(AppError::InsufficientStock { available, requested }) => {
                assert_eq!(available, current);
                assert_eq!(requested, Decimal::new(6, 0));
            }
            other => panic!("resultado inesperado: {:?}", other),
        }
    }

    #[test]
    fn zero_adjustment_is_rejected() {
        assert!(matches!(
            apply_adjustment(Decimal::ONE, Decimal::ZERO),
            Err(AppError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn adjustment_finer_than_the_stock_column_is_rejected() {
        assert!(matches!(
            apply_adjustment(Decimal::new(1, 3), Decimal::new(-5, 4)),
            Err(AppError::InvalidQuantity(_))
        ));
        assert!(apply_adjustment(Decimal::new(1, 3), Decimal::new(25, 4)).is_err());
        assert_eq!(
            apply_adjustment(Decimal::new(1, 3), Decimal::new(20, 4)).unwrap(),
            Decimal::new(3, 3)
        );
    }

    // ---
    // Contra o banco (migrations/)
    // ---

    use crate::{models::role::RoleType, services::test_support::Fixture};
    use sqlx::PgPool;

    #[sqlx::test]
    async fn listing_is_limited_to_assigned_branches(pool: PgPool) {
        let fx = Fixture::new(pool).await;
        let bairro = fx.add_branch("Bairro").await;
        let matriz_item = fx.add_item(fx.main_branch.id, "M-1", Decimal::ONE).await;
        let bairro_item = fx.add_item(bairro.id, "B-1", Decimal::ONE).await;

        let clerk = fx.add_member("estoque@loja.com", RoleType::InventoryManager, &[bairro.id]).await;
        let role = crate::db::CompanyRepository::new(fx.pool.clone())
            .member_role(&fx.pool, clerk.id, fx.company.id)
            .await
            .unwrap()
            .unwrap();

        let branches = fx.branch_service();
        let scope = branches.visible_branch_ids(fx.company.id, clerk.id, &role).await.unwrap();
        assert_eq!(scope, Some(vec![bairro.id]));

        let inventory = fx.inventory_service();
        let filter = ItemFilter::default();
        let visible = inventory.list_items(fx.company.id, &filter, scope.as_deref()).await.unwrap();
        assert_eq!(visible.iter().map(|i| i.id).collect::<Vec<_>>(), vec![bairro_item.id]);

        // Gerente vê tudo
        let owner_role = crate::db::CompanyRepository::new(fx.pool.clone())
            .member_role(&fx.pool, fx.owner.id, fx.company.id)
            .await
            .unwrap()
            .unwrap();
        let scope = branches.visible_branch_ids(fx.company.id, fx.owner.id, &owner_role).await.unwrap();
        assert_eq!(scope, None);
        let all = inventory.list_items(fx.company.id, &filter, None).await.unwrap();
        assert!(all.iter().any(|i| i.id == matriz_item.id));
        assert_eq!(all.len(), 2);

        assert!(matches!(
            branches.ensure_access(fx.company.id, clerk.id, &role, matriz_item.branch_id).await,
            Err(AppError::BranchAccessDenied)
        ));
    }

    #[sqlx::test]
    async fn reparenting_into_a_descendant_is_rejected_and_nothing_changes(pool: PgPool) {
        let fx = Fixture::new(pool).await;
        let inventory = fx.inventory_service();
        let bebidas = inventory.create_group(fx.company.id, None, "Bebidas", None).await.unwrap();
        let cafe = inventory.create_group(fx.company.id, Some(bebidas.id), "Café", None).await.unwrap();

        let err = inventory
            .update_group(fx.company.id, bebidas.id, Some(cafe.id), "Bebidas", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ItemGroupCycle));
        assert_eq!(inventory.get_group(fx.company.id, bebidas.id).await.unwrap().parent_id, None);

        let moved = inventory
            .update_group(fx.company.id, cafe.id, None, "Café", Some("Grãos e moídos"))
            .await
            .unwrap();
        assert_eq!(moved.parent_id, None);
        assert_eq!(moved.description.as_deref(), Some("Grãos e moídos"));
    }
}
