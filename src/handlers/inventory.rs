// src/handlers/inventory.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Importa os nossos extratores e erros
use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::validation::{
        validate_code, validate_name, validate_price, validate_stock_quantity,
    },
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{
            PermInventoryDelete, PermInventoryRead, PermInventoryWrite, PermItemGroupsDelete,
            PermItemGroupsRead, PermItemGroupsWrite, RequirePermission,
        },
        tenancy::TenantContext,
    },
    models::inventory::{
        Item, ItemFilter, ItemGroup, ItemGroupNode, ItemUpdate, NewItem, StockMovement,
    },
};

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemPayload {
    pub branch_id: Uuid,
    pub group_id: Option<Uuid>,

    #[validate(custom(function = "validate_name"))]
    pub name: String,

    #[validate(custom(function = "validate_code"))]
    pub code: String,

    pub description: Option<String>,

    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,

    // Se o JSON não tiver esse campo, assume 0
    #[validate(custom(function = "validate_stock_quantity"))]
    #[serde(default)]
    pub stock_quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemPayload {
    pub group_id: Option<Uuid>,

    #[validate(custom(function = "validate_name"))]
    pub name: String,

    #[validate(custom(function = "validate_code"))]
    pub code: String,

    pub description: Option<String>,

    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,
}

// Ajuste manual: delta positivo entra, negativo sai
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockPayload {
    pub delta: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemGroupPayload {
    pub parent_id: Option<Uuid>,
    #[validate(custom(function = "validate_name"))]
    pub name: String,
    pub description: Option<String>,
}

// Carrega o item e confere se o usuário opera na filial dele
async fn accessible_item(
    app_state: &AppState,
    tenant: &TenantContext,
    user: &AuthenticatedUser,
    item_id: Uuid,
) -> Result<Item, AppError> {
    let item = app_state.inventory_service.get_item(tenant.company_id, item_id).await?;
    app_state
        .branch_service
        .ensure_access(tenant.company_id, user.0.id, &tenant.role, item.branch_id)
        .await?;
    Ok(item)
}

// ---
// Itens
// ---

#[utoipa::path(
    get,
    path = "/api/inventory/items",
    tag = "Inventory",
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ItemFilter
    ),
    responses(
        (status = 200, description = "Itens filtrados", body = Vec<Item>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_items(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermInventoryRead>,
    Query(filter): Query<ItemFilter>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    if let Some(branch_id) = filter.branch_id {
        app_state
            .branch_service
            .ensure_access(tenant.company_id, user.0.id, &tenant.role, branch_id)
            .await
            .map_err(to_api)?;
    }

    // Sem filtro de filial, quem não é gerente só vê as filiais vinculadas
    let scope = app_state
        .branch_service
        .visible_branch_ids(tenant.company_id, user.0.id, &tenant.role)
        .await
        .map_err(to_api)?;

    let items = app_state
        .inventory_service
        .list_items(tenant.company_id, &filter, scope.as_deref())
        .await
        .map_err(to_api)?;

    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/api/inventory/items/{id}",
    tag = "Inventory",
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID do Item")
    ),
    responses(
        (status = 200, description = "Item", body = Item),
        (status = 404, description = "Item não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_item(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermInventoryRead>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<Item>, ApiError> {
    let item = accessible_item(&app_state, &tenant, &user, item_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(item))
}

#[utoipa::path(
    post,
    path = "/api/inventory/items",
    tag = "Inventory",
    request_body = CreateItemPayload,
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 201, description = "Item criado", body = Item),
        (status = 409, description = "Código já usado na filial")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_item(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermInventoryWrite>,
    Json(payload): Json<CreateItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    payload.validate().map_err(|e| to_api(AppError::ValidationError(e)))?;

    app_state
        .branch_service
        .ensure_access(tenant.company_id, user.0.id, &tenant.role, payload.branch_id)
        .await
        .map_err(to_api)?;

    let new_item = NewItem {
        branch_id: payload.branch_id,
        group_id: payload.group_id,
        name: payload.name.trim().to_string(),
        code: payload.code.trim().to_string(),
        description: payload.description,
        price: payload.price,
        stock_quantity: payload.stock_quantity,
    };

    let item = app_state
        .inventory_service
        .create_item(tenant.company_id, user.0.id, &new_item)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    put,
    path = "/api/inventory/items/{id}",
    tag = "Inventory",
    request_body = UpdateItemPayload,
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID do Item")
    ),
    responses(
        (status = 200, description = "Item atualizado", body = Item)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermInventoryWrite>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateItemPayload>,
) -> Result<Json<Item>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    accessible_item(&app_state, &tenant, &user, item_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let changes = ItemUpdate {
        group_id: payload.group_id,
        name: payload.name.trim().to_string(),
        code: payload.code.trim().to_string(),
        description: payload.description,
        price: payload.price,
    };

    let item = app_state
        .inventory_service
        .update_item(tenant.company_id, item_id, &changes)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(item))
}

#[utoipa::path(
    post,
    path = "/api/inventory/items/{id}/adjust",
    tag = "Inventory",
    request_body = AdjustStockPayload,
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID do Item")
    ),
    responses(
        (status = 200, description = "Saldo ajustado", body = Item),
        (status = 422, description = "O ajuste deixaria o estoque negativo")
    ),
    security(("api_jwt" = []))
)]
pub async fn adjust_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermInventoryWrite>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<AdjustStockPayload>,
) -> Result<Json<Item>, ApiError> {
    accessible_item(&app_state, &tenant, &user, item_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let item = app_state
        .inventory_service
        .adjust_stock(
            tenant.company_id,
            user.0.id,
            item_id,
            payload.delta,
            payload.notes.as_deref(),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(item))
}

#[utoipa::path(
    delete,
    path = "/api/inventory/items/{id}",
    tag = "Inventory",
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID do Item")
    ),
    responses(
        (status = 204, description = "Item removido")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_item(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermInventoryDelete>,
    Path(item_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    accessible_item(&app_state, &tenant, &user, item_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .inventory_service
        .delete_item(tenant.company_id, item_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/inventory/items/{id}/movements",
    tag = "Inventory",
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID do Item")
    ),
    responses(
        (status = 200, description = "Histórico de movimentações, mais recente primeiro", body = Vec<StockMovement>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermInventoryRead>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<Vec<StockMovement>>, ApiError> {
    accessible_item(&app_state, &tenant, &user, item_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let movements = app_state
        .inventory_service
        .list_movements(tenant.company_id, item_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(movements))
}

// ---
// Grupos de itens
// ---

#[utoipa::path(
    get,
    path = "/api/inventory/groups",
    tag = "Item Groups",
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 200, description = "Lista plana de grupos", body = Vec<ItemGroup>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_groups(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermItemGroupsRead>,
) -> Result<Json<Vec<ItemGroup>>, ApiError> {
    let groups = app_state
        .inventory_service
        .list_groups(tenant.company_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(groups))
}

#[utoipa::path(
    get,
    path = "/api/inventory/groups/tree",
    tag = "Item Groups",
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 200, description = "Grupos em árvore", body = Vec<ItemGroupNode>)
    ),
    security(("api_jwt" = []))
)]
pub async fn group_tree(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermItemGroupsRead>,
) -> Result<Json<Vec<ItemGroupNode>>, ApiError> {
    let tree = app_state
        .inventory_service
        .group_tree(tenant.company_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tree))
}

#[utoipa::path(
    get,
    path = "/api/inventory/groups/{id}",
    tag = "Item Groups",
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID do Grupo")
    ),
    responses(
        (status = 200, description = "Grupo", body = ItemGroup)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_group(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermItemGroupsRead>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<ItemGroup>, ApiError> {
    let group = app_state
        .inventory_service
        .get_group(tenant.company_id, group_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(group))
}

#[utoipa::path(
    post,
    path = "/api/inventory/groups",
    tag = "Item Groups",
    request_body = ItemGroupPayload,
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 201, description = "Grupo criado", body = ItemGroup)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_group(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermItemGroupsWrite>,
    Json(payload): Json<ItemGroupPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let group = app_state
        .inventory_service
        .create_group(
            tenant.company_id,
            payload.parent_id,
            payload.name.trim(),
            payload.description.as_deref(),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(group)))
}

#[utoipa::path(
    put,
    path = "/api/inventory/groups/{id}",
    tag = "Item Groups",
    request_body = ItemGroupPayload,
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID do Grupo")
    ),
    responses(
        (status = 200, description = "Grupo atualizado", body = ItemGroup),
        (status = 400, description = "A mudança de pai criaria um ciclo")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_group(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermItemGroupsWrite>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<ItemGroupPayload>,
) -> Result<Json<ItemGroup>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let group = app_state
        .inventory_service
        .update_group(
            tenant.company_id,
            group_id,
            payload.parent_id,
            payload.name.trim(),
            payload.description.as_deref(),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(group))
}

#[utoipa::path(
    delete,
    path = "/api/inventory/groups/{id}",
    tag = "Item Groups",
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID do Grupo")
    ),
    responses(
        (status = 204, description = "Grupo removido"),
        (status = 409, description = "Grupo ainda tem subgrupos")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_group(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermItemGroupsDelete>,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state
        .inventory_service
        .delete_group(tenant.company_id, group_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_payload(price: i64, stock: i64) -> CreateItemPayload {
        CreateItemPayload {
            branch_id: Uuid::new_v4(),
            group_id: None,
            name: "Café".into(),
            code: "CAF-1".into(),
            description: None,
            price: Decimal::new(price, 2),
            stock_quantity: Decimal::new(stock, 0),
        }
    }

    #[test]
    fn negative_price_or_stock_is_rejected() {
        assert!(item_payload(1000, 5).validate().is_ok());
        assert!(item_payload(0, 0).validate().is_ok());

        let errors = item_payload(-1, -2).validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("price"));
        assert!(fields.contains_key("stock_quantity"));
    }

    #[test]
    fn blank_code_is_rejected() {
        let mut payload = item_payload(100, 0);
        payload.code = String::new();
        assert!(payload.validate().unwrap_err().field_errors().contains_key("code"));
    }

    #[test]
    fn whitespace_code_and_sub_cent_price_are_rejected() {
        let mut payload = item_payload(100, 0);
        payload.code = "   ".into();
        payload.price = Decimal::new(10_005, 3);
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("code"));
        assert!(fields.contains_key("price"));
    }

    #[test]
    fn opening_stock_finer_than_a_thousandth_is_rejected() {
        let mut payload = item_payload(100, 0);
        payload.stock_quantity = Decimal::new(5, 4);
        assert!(payload.validate().unwrap_err().field_errors().contains_key("stock_quantity"));
    }
}
