// src/handlers/users.rs

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
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermUsersDelete, PermUsersRead, PermUsersWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::user::{CompanyUser, InviteResponse},
    services::user_service::InviteRequest,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteUserPayload {
    #[validate(email(message = "validation.email"))]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role_id: Uuid,
    #[serde(default)]
    pub branch_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRolePayload {
    pub role_id: Uuid,
    #[serde(default)]
    pub branch_ids: Vec<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 200, description = "Usuários da empresa", body = Vec<CompanyUser>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermUsersRead>,
) -> Result<Json<Vec<CompanyUser>>, ApiError> {
    let users = app_state
        .user_service
        .list_users(tenant.company_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID do Usuário")
    ),
    responses(
        (status = 200, description = "Usuário", body = CompanyUser),
        (status = 404, description = "Usuário não pertence à empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermUsersRead>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<CompanyUser>, ApiError> {
    let user = app_state
        .user_service
        .get_user(tenant.company_id, user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/users/invite",
    tag = "Users",
    request_body = InviteUserPayload,
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 201, description = "Usuário vinculado; link de convite quando a conta é nova", body = InviteResponse),
        (status = 409, description = "Usuário já pertence à empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn invite_user(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermUsersWrite>,
    Json(payload): Json<InviteUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let request = InviteRequest {
        email: payload.email.trim().to_lowercase(),
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        role_id: payload.role_id,
        branch_ids: payload.branch_ids,
    };

    let response = app_state
        .user_service
        .invite_user(tenant.company_id, &request)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/resend-invite",
    tag = "Users",
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID do Usuário")
    ),
    responses(
        (status = 200, description = "Novo link gerado", body = InviteResponse),
        (status = 404, description = "Convite já aceito ou usuário inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn resend_invite(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermUsersWrite>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<InviteResponse>, ApiError> {
    let response = app_state
        .user_service
        .resend_invite(tenant.company_id, user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}/assignment",
    tag = "Users",
    request_body = AssignRolePayload,
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID do Usuário")
    ),
    responses(
        (status = 200, description = "Cargo e filiais atualizados", body = CompanyUser)
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_role(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermUsersWrite>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AssignRolePayload>,
) -> Result<Json<CompanyUser>, ApiError> {
    let user = app_state
        .user_service
        .assign_role(tenant.company_id, user_id, payload.role_id, &payload.branch_ids)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa"),
        ("id" = Uuid, Path, description = "ID do Usuário")
    ),
    responses(
        (status = 204, description = "Usuário removido da empresa"),
        (status = 400, description = "Não é possível remover a si mesmo")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_user(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(acting): AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermUsersDelete>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state
        .user_service
        .remove_user(tenant.company_id, acting.id, user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_payload_defaults_optional_fields() {
        let payload: InviteUserPayload = serde_json::from_value(serde_json::json!({
            "email": "joao@loja.com",
            "roleId": Uuid::nil()
        }))
        .unwrap();

        assert!(payload.validate().is_ok());
        assert!(payload.branch_ids.is_empty());
        assert!(payload.first_name.is_empty());
    }

    #[test]
    fn invite_payload_rejects_bad_email() {
        let payload = InviteUserPayload {
            email: "joao".into(),
            first_name: String::new(),
            last_name: String::new(),
            role_id: Uuid::new_v4(),
            branch_ids: vec![],
        };
        assert!(payload.validate().unwrap_err().field_errors().contains_key("email"));
    }
}
