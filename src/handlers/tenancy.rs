// src/handlers/tenancy.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Importa os nossos extratores e erros
use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::validation::validate_name,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermCompaniesDelete, PermCompaniesWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::company::{Company, CompanyMembership, SessionState},
};

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyPayload {
    #[validate(custom(function = "validate_name"))]
    pub name: String,
    pub financial_year_start: NaiveDate,
    pub book_start_date: NaiveDate,
    /// Nome da filial principal (padrão: "Main Branch")
    pub main_branch_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompanyPayload {
    #[validate(custom(function = "validate_name"))]
    pub name: String,
    pub financial_year_start: NaiveDate,
    pub book_start_date: NaiveDate,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectCompanyPayload {
    pub company_id: Uuid,
    pub branch_id: Option<Uuid>,
}

// ---
// Empresas do usuário
// ---

#[utoipa::path(
    post,
    path = "/api/companies",
    tag = "Companies",
    request_body = CreateCompanyPayload,
    responses(
        (status = 201, description = "Empresa criada com filial principal", body = Company),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_company(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateCompanyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let company = app_state
        .company_service
        .create_company(
            user.0.id,
            payload.name.trim(),
            payload.financial_year_start,
            payload.book_start_date,
            payload.main_branch_name.as_deref(),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(company)))
}

#[utoipa::path(
    get,
    path = "/api/companies",
    tag = "Companies",
    responses(
        (status = 200, description = "Empresas do usuário", body = Vec<CompanyMembership>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_my_companies(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<Json<Vec<CompanyMembership>>, ApiError> {
    let companies = app_state
        .company_service
        .list_user_companies(user.0.id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(companies))
}

// ---
// Empresa atual (X-Company-ID)
// ---

#[utoipa::path(
    get,
    path = "/api/company",
    tag = "Companies",
    responses(
        (status = 200, description = "Empresa selecionada", body = Company),
        (status = 403, description = "Usuário não pertence à empresa")
    ),
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_current_company(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<Json<Company>, ApiError> {
    let company = app_state
        .company_service
        .get_company(tenant.company_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(company))
}

#[utoipa::path(
    put,
    path = "/api/company",
    tag = "Companies",
    request_body = UpdateCompanyPayload,
    responses(
        (status = 200, description = "Empresa atualizada", body = Company),
        (status = 400, description = "Dados inválidos")
    ),
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_current_company(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermCompaniesWrite>,
    Json(payload): Json<UpdateCompanyPayload>,
) -> Result<Json<Company>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let company = app_state
        .company_service
        .update_company(
            tenant.company_id,
            payload.name.trim(),
            payload.financial_year_start,
            payload.book_start_date,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(company))
}

#[utoipa::path(
    delete,
    path = "/api/company",
    tag = "Companies",
    responses(
        (status = 204, description = "Empresa removida com filiais, itens e vínculos")
    ),
    params(
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_current_company(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequirePermission<PermCompaniesDelete>,
) -> Result<StatusCode, ApiError> {
    app_state
        .company_service
        .delete_company(tenant.company_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Seleção de empresa/filial
// ---

#[utoipa::path(
    get,
    path = "/api/session",
    tag = "Session",
    responses(
        (status = 200, description = "Empresas, filiais e o que está selecionado", body = SessionState)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_session(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<Json<SessionState>, ApiError> {
    let session = app_state
        .session_service
        .session(&user.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/api/session/select",
    tag = "Session",
    request_body = SelectCompanyPayload,
    responses(
        (status = 200, description = "Seleção gravada como padrão do usuário", body = SessionState),
        (status = 403, description = "Sem acesso à empresa ou filial")
    ),
    security(("api_jwt" = []))
)]
pub async fn select_company(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<SelectCompanyPayload>,
) -> Result<Json<SessionState>, ApiError> {
    let session = app_state
        .session_service
        .select(&user.0, payload.company_id, payload.branch_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(session))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_company_name_is_rejected() {
        let payload: CreateCompanyPayload = serde_json::from_value(serde_json::json!({
            "name": " ",
            "financialYearStart": "2024-04-01",
            "bookStartDate": "2024-04-01"
        }))
        .unwrap();
        assert!(payload.validate().unwrap_err().field_errors().contains_key("name"));
    }
}
