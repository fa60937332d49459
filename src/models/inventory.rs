// src/models/inventory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Casas decimais das colunas `stock_quantity`/`quantity_changed` (NUMERIC(14, 3)).
pub const QUANTITY_SCALE: u32 = 3;
/// Casas decimais da coluna `price` (NUMERIC(14, 2)).
pub const PRICE_SCALE: u32 = 2;

/// true se o valor cabe na coluna sem arredondamento (zeros à direita não contam).
pub fn fits_scale(value: Decimal, scale: u32) -> bool {
    value.normalize().scale() <= scale
}

// --- 1. Grupos de Itens (categorias, opcionalmente aninhadas) ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemGroup {
    pub id: Uuid,
    pub company_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Nó da árvore de grupos
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemGroupNode {
    #[serde(flatten)]
    pub group: ItemGroup,
    #[schema(no_recursion)]
    pub children: Vec<ItemGroupNode>,
}

// --- 2. Itens / Produtos ---
// Cada item pertence a uma filial; o mesmo produto em outra filial é outra linha com o mesmo código.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub company_id: Uuid,
    pub branch_id: Uuid,
    pub group_id: Option<Uuid>,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Dados para gravar um item novo (cadastro ou clone numa transferência)
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub branch_id: Uuid,
    pub group_id: Option<Uuid>,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: Decimal,
}

// Campos editáveis de um item (o estoque só muda por ajuste ou transferência)
#[derive(Debug, Clone)]
pub struct ItemUpdate {
    pub group_id: Option<Uuid>,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub price: Decimal,
}

// Filtros da listagem de itens (?branchId=&groupId=&search=)
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ItemFilter {
    pub branch_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    /// Busca por nome ou código
    pub search: Option<String>,
}

impl ItemFilter {
    /// Padrão ILIKE para a busca, ou None quando a busca está vazia.
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                let escaped = s
                    .replace('\\', "\\\\")
                    .replace('%', "\\%")
                    .replace('_', "\\_");
                format!("%{}%", escaped)
            })
    }
}

// --- 3. Movimentações de Estoque ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "stock_movement_reason", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockMovementReason {
    InitialStock,
    Adjustment,
    TransferOut,
    TransferIn,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    pub company_id: Uuid,
    pub item_id: Uuid,
    pub branch_id: Uuid,
    pub transfer_id: Option<Uuid>,
    pub quantity_changed: Decimal,
    pub reason: StockMovementReason,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// --- 4. Transferência entre filiais ---

// Item candidato à transferência (só o necessário para a tela de seleção)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferCandidate {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub stock_quantity: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub transfer_id: Uuid,
    pub quantity: Decimal,
    pub source: Item,
    pub target: Item,
    /// true quando o item foi clonado na filial de destino
    pub created_in_target: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_ignores_trailing_zeros() {
        assert!(fits_scale(Decimal::new(1_500, 3), QUANTITY_SCALE));
        assert!(fits_scale(Decimal::new(15_000, 4), QUANTITY_SCALE));
        assert!(!fits_scale(Decimal::new(5, 4), QUANTITY_SCALE));
        assert!(fits_scale(Decimal::new(1_999, 2), PRICE_SCALE));
        assert!(!fits_scale(Decimal::new(1_999, 3), PRICE_SCALE));
    }

    #[test]
    fn blank_search_is_ignored() {
        let filter = ItemFilter { search: Some("   ".into()), ..Default::default() };
        assert_eq!(filter.search_pattern(), None);
        assert_eq!(ItemFilter::default().search_pattern(), None);
    }

    #[test]
    fn search_escapes_like_wildcards() {
        let filter = ItemFilter { search: Some(" 50%_off ".into()), ..Default::default() };
        assert_eq!(filter.search_pattern().as_deref(), Some("%50\\%\\_off%"));
    }
}
