// src/middleware/auth.rs

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::{locale_from_headers, Locale},
        tenancy::{company_id_from_headers, TenantContext},
    },
    models::auth::User,
};

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

fn bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
        .ok_or(AppError::InvalidToken)
}

async fn authenticate(app_state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let token = bearer_token(headers)?;
    app_state.auth_service.validate_token(&token).await
}

/// Exige um JWT válido e deixa o usuário nas extensions da requisição.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&app_state, request.headers())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Autentica e resolve a empresa do X-Company-ID: o usuário precisa ser membro,
/// e o cargo dele vai junto no `TenantContext`.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let user = authenticate(&app_state, request.headers()).await.map_err(to_api)?;
    let company_id = company_id_from_headers(request.headers()).map_err(to_api)?;

    let role = app_state
        .company_repo
        .member_role(&app_state.db_pool, user.id, company_id)
        .await
        .map_err(to_api)?
        .ok_or(AppError::NotCompanyMember)
        .map_err(to_api)?;

    tracing::debug!("Requisição de {} na empresa {} ({})", user.id, company_id, role.role_name);

    request.extensions_mut().insert(AuthenticatedUser(user));
    request.extensions_mut().insert(TenantContext { company_id, role });
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        let app_state = AppState::from_ref(state);
        let locale = locale_from_headers(&parts.headers);
        Err(AppError::InvalidToken.to_api_error(&locale, &app_state.i18n_store))
    }
}
