// src/handlers/rbac.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::validation::validate_name,
    middleware::{
        i18n::Locale,
        rbac::{PermRolesDelete, PermRolesRead, PermRolesWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::role::{PermissionCatalog, PermissionMatrix, PermissionToggle, Role, RoleType},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRolePayload {
    #[validate(custom(function = "validate_name"))]
    pub role_name: String,
    pub role_type: RoleType,
    /// Sem matriz, o cargo nasce com o modelo do tipo
    pub permissions: Option<PermissionMatrix>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRolePayload {
    #[validate(custom(function = "validate_name"))]
    pub role_name: String,
    pub permissions: Option<PermissionMatrix>,
}

// GET /api/permissions (Para o frontend saber o que mostrar na tela de cargos)
#[utoipa::path(
    get,
    path = "/api/permissions",
    tag = "Roles",
    responses(
        (status = 200, description = "Módulos e ações da matriz", body = PermissionCatalog)
    ),
    security(("api_jwt" = []))
)]
pub async fn permission_catalog(State(app_state): State<AppState>) -> Json<PermissionCatalog> {
    Json(app_state.rbac_service.permission_catalog())
}

#[utoipa::path(
    get,
    path = "/api/roles",
    tag = "Roles",
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 200, description = "Cargos padrão e da empresa", body = Vec<Role>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_roles(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermRolesRead>,
) -> Result<Json<Vec<Role>>, ApiError> {
    let roles = app_state
        .rbac_service
        .list_roles(tenant.company_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(roles))
}

#[utoipa::path(
    get,
    path = "/api/roles/{id}",
    tag = "Roles",
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID do Cargo")
    ),
    responses(
        (status = 200, description = "Cargo", body = Role),
        (status = 404, description = "Cargo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_role(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermRolesRead>,
    Path(role_id): Path<Uuid>,
) -> Result<Json<Role>, ApiError> {
    let role = app_state
        .rbac_service
        .get_role(tenant.company_id, role_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(role))
}

#[utoipa::path(
    post,
    path = "/api/roles",
    tag = "Roles",
    request_body = CreateRolePayload,
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 201, description = "Cargo criado", body = Role),
        (status = 409, description = "Nome de cargo já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_role(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermRolesWrite>,
    Json(payload): Json<CreateRolePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let role = app_state
        .rbac_service
        .create_role(
            tenant.company_id,
            payload.role_name.trim(),
            payload.role_type,
            payload.permissions,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    put,
    path = "/api/roles/{id}",
    tag = "Roles",
    request_body = UpdateRolePayload,
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID do Cargo")
    ),
    responses(
        (status = 200, description = "Cargo atualizado", body = Role),
        (status = 403, description = "Cargo padrão não pode ser alterado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_role(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermRolesWrite>,
    Path(role_id): Path<Uuid>,
    Json(payload): Json<UpdateRolePayload>,
) -> Result<Json<Role>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let role = app_state
        .rbac_service
        .update_role(
            tenant.company_id,
            role_id,
            payload.role_name.trim(),
            payload.permissions,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(role))
}

#[utoipa::path(
    post,
    path = "/api/roles/{id}/permissions/{module}",
    tag = "Roles",
    request_body = PermissionToggle,
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID do Cargo"),
        ("module" = String, Path, description = "Módulo da matriz (ex.: inventory)")
    ),
    responses(
        (status = 200, description = "Matriz atualizada", body = Role),
        (status = 400, description = "Módulo desconhecido")
    ),
    security(("api_jwt" = []))
)]
pub async fn toggle_permission(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermRolesWrite>,
    Path((role_id, module)): Path<(Uuid, String)>,
    Json(toggle): Json<PermissionToggle>,
) -> Result<Json<Role>, ApiError> {
    let role = app_state
        .rbac_service
        .toggle_permission(tenant.company_id, role_id, &module, toggle)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(role))
}

#[utoipa::path(
    delete,
    path = "/api/roles/{id}",
    tag = "Roles",
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID do Cargo")
    ),
    responses(
        (status = 204, description = "Cargo removido"),
        (status = 409, description = "Cargo ainda atribuído a usuários")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_role(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermRolesDelete>,
    Path(role_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state
        .rbac_service
        .delete_role(tenant.company_id, role_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_payload_accepts_matrix_json() {
        let payload: CreateRolePayload = serde_json::from_value(serde_json::json!({
            "roleName": "Caixa",
            "roleType": "custom",
            "permissions": { "inventory": { "read": true } }
        }))
        .unwrap();

        assert_eq!(payload.role_type, RoleType::Custom);
        let matrix = payload.permissions.unwrap();
        assert!(matrix.flags("inventory").read);
        assert!(!matrix.flags("inventory").write);
    }

    #[test]
    fn toggle_body_is_tagged_by_op() {
        let toggle: PermissionToggle =
            serde_json::from_value(serde_json::json!({ "op": "select_all" })).unwrap();
        assert_eq!(toggle, PermissionToggle::SelectAll);

        let toggle: PermissionToggle = serde_json::from_value(serde_json::json!({
            "op": "set", "action": "export", "enabled": false
        }))
        .unwrap();
        assert!(matches!(toggle, PermissionToggle::Set { enabled: false, .. }));
    }

    #[test]
    fn blank_role_name_is_rejected() {
        let payload = UpdateRolePayload { role_name: String::new(), permissions: None };
        assert!(payload.validate().is_err());

        let payload = UpdateRolePayload { role_name: "  \t ".into(), permissions: None };
        assert!(payload.validate().unwrap_err().field_errors().contains_key("role_name"));
    }
}
