// src/handlers/branches.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::validation::{validate_name, validate_positive},
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{
            PermBranchesDelete, PermBranchesRead, PermBranchesWrite, PermInventoryRead,
            PermInventoryWrite, RequirePermission,
        },
        tenancy::TenantContext,
    },
    models::{
        branch::{Branch, BranchFields, BranchStatus},
        inventory::{TransferCandidate, TransferReceipt},
    },
    services::transfer_service::TransferRequest,
};

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BranchPayload {
    #[validate(custom(function = "validate_name"))]
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "validation.email"))]
    pub email: Option<String>,
    /// Padrão: active
    pub status: Option<BranchStatus>,
}

impl BranchPayload {
    fn fields(&self) -> BranchFields<'_> {
        BranchFields {
            name: self.name.trim(),
            address: self.address.as_deref(),
            phone: self.phone.as_deref(),
            email: self.email.as_deref(),
            status: self.status.unwrap_or(BranchStatus::Active),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferPayload {
    pub item_id: Uuid,
    pub target_branch_id: Uuid,
    #[validate(custom(function = "validate_positive"))]
    pub quantity: Decimal,
    pub notes: Option<String>,
}

// ---
// CRUD
// ---

#[utoipa::path(
    get,
    path = "/api/branches",
    tag = "Branches",
    responses(
        (status = 200, description = "Filiais da empresa (a principal primeiro)", body = Vec<Branch>)
    ),
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_branches(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermBranchesRead>,
) -> Result<Json<Vec<Branch>>, ApiError> {
    let branches = app_state
        .branch_service
        .list_branches(tenant.company_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(branches))
}

#[utoipa::path(
    get,
    path = "/api/branches/{id}",
    tag = "Branches",
    responses(
        (status = 200, description = "Filial", body = Branch),
        (status = 404, description = "Filial não encontrada")
    ),
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID da Filial")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_branch(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermBranchesRead>,
    Path(branch_id): Path<Uuid>,
) -> Result<Json<Branch>, ApiError> {
    let branch = app_state
        .branch_service
        .get_branch(tenant.company_id, branch_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(branch))
}

#[utoipa::path(
    post,
    path = "/api/branches",
    tag = "Branches",
    request_body = BranchPayload,
    responses(
        (status = 201, description = "Filial criada", body = Branch),
        (status = 409, description = "Nome já usado na empresa")
    ),
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_branch(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermBranchesWrite>,
    Json(payload): Json<BranchPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let branch = app_state
        .branch_service
        .create_branch(tenant.company_id, &payload.fields())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(branch)))
}

#[utoipa::path(
    put,
    path = "/api/branches/{id}",
    tag = "Branches",
    request_body = BranchPayload,
    responses(
        (status = 200, description = "Filial atualizada", body = Branch)
    ),
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID da Filial")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_branch(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermBranchesWrite>,
    Path(branch_id): Path<Uuid>,
    Json(payload): Json<BranchPayload>,
) -> Result<Json<Branch>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let branch = app_state
        .branch_service
        .update_branch(tenant.company_id, branch_id, &payload.fields())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(branch))
}

#[utoipa::path(
    post,
    path = "/api/branches/{id}/main",
    tag = "Branches",
    responses(
        (status = 200, description = "Filial marcada como principal", body = Branch)
    ),
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID da Filial")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_main_branch(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermBranchesWrite>,
    Path(branch_id): Path<Uuid>,
) -> Result<Json<Branch>, ApiError> {
    let branch = app_state
        .branch_service
        .set_main_branch(tenant.company_id, branch_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(branch))
}

#[utoipa::path(
    delete,
    path = "/api/branches/{id}",
    tag = "Branches",
    responses(
        (status = 204, description = "Filial removida"),
        (status = 409, description = "Filial com itens ou filial principal")
    ),
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID da Filial")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_branch(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermBranchesDelete>,
    Path(branch_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state
        .branch_service
        .delete_branch(tenant.company_id, branch_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Transferência de estoque
// ---

#[utoipa::path(
    get,
    path = "/api/branches/{id}/transfer-candidates",
    tag = "Branches",
    responses(
        (status = 200, description = "Itens da filial com saldo", body = Vec<TransferCandidate>)
    ),
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID da Filial de origem")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_transfer_candidates(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermInventoryRead>,
    Path(branch_id): Path<Uuid>,
) -> Result<Json<Vec<TransferCandidate>>, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    app_state
        .branch_service
        .ensure_access(tenant.company_id, user.0.id, &tenant.role, branch_id)
        .await
        .map_err(to_api)?;

    let candidates = app_state
        .transfer_service
        .candidates(tenant.company_id, branch_id)
        .await
        .map_err(to_api)?;

    Ok(Json(candidates))
}

#[utoipa::path(
    post,
    path = "/api/branches/{id}/transfers",
    tag = "Branches",
    request_body = TransferPayload,
    responses(
        (status = 201, description = "Transferência concluída", body = TransferReceipt),
        (status = 400, description = "Quantidade inválida ou mesma filial"),
        (status = 422, description = "Estoque insuficiente")
    ),
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID da Filial de origem")
    ),
    security(("api_jwt" = []))
)]
pub async fn transfer_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermInventoryWrite>,
    Path(branch_id): Path<Uuid>,
    Json(payload): Json<TransferPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    payload.validate().map_err(|e| to_api(AppError::ValidationError(e)))?;

    app_state
        .branch_service
        .ensure_access(tenant.company_id, user.0.id, &tenant.role, branch_id)
        .await
        .map_err(to_api)?;

    let request = TransferRequest {
        item_id: payload.item_id,
        target_branch_id: payload.target_branch_id,
        quantity: payload.quantity,
        notes: payload.notes.filter(|n| !n.trim().is_empty()),
    };

    let receipt = app_state
        .transfer_service
        .transfer(tenant.company_id, user.0.id, branch_id, request)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_branch_name_is_rejected() {
        let payload: BranchPayload =
            serde_json::from_value(serde_json::json!({ "name": "   " })).unwrap();
        assert!(payload.validate().unwrap_err().field_errors().contains_key("name"));

        let payload: BranchPayload =
            serde_json::from_value(serde_json::json!({ "name": "Filial Centro" })).unwrap();
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn transfer_quantity_beyond_three_decimals_is_rejected() {
        let payload = TransferPayload {
            item_id: Uuid::new_v4(),
            target_branch_id: Uuid::new_v4(),
            quantity: Decimal::new(5, 4),
            notes: None,
        };
        assert!(payload.validate().unwrap_err().field_errors().contains_key("quantity"));
    }
}
