// src/middleware/tenancy.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::locale_from_headers,
    models::role::Role,
};

// O nome do nosso cabeçalho HTTP customizado
pub const COMPANY_ID_HEADER: &str = "x-company-id";

/// Empresa selecionada na requisição e o cargo do usuário nela.
/// Montado pelo `tenant_guard` e lido pelos handlers.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub company_id: Uuid,
    pub role: Role,
}

/// Lê o X-Company-ID.
pub fn company_id_from_headers(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let value = headers
        .get(COMPANY_ID_HEADER)
        .ok_or(AppError::MissingCompanyHeader)?;

    let value_str = value.to_str().map_err(|_| AppError::InvalidCompanyHeader)?;

    Uuid::parse_str(value_str.trim()).map_err(|_| AppError::InvalidCompanyHeader)
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(context) = parts.extensions.get::<TenantContext>() {
            return Ok(context.clone());
        }

        // Rota sem tenant_guard: erro de montagem do router
        let app_state = AppState::from_ref(state);
        let locale = locale_from_headers(&parts.headers);
        Err(AppError::MissingCompanyHeader.to_api_error(&locale, &app_state.i18n_store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_valid_company_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(COMPANY_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());

        assert_eq!(company_id_from_headers(&headers).unwrap(), id);
    }

    #[test]
    fn missing_header_is_reported() {
        assert!(matches!(
            company_id_from_headers(&HeaderMap::new()),
            Err(AppError::MissingCompanyHeader)
        ));
    }

    #[test]
    fn garbage_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(COMPANY_ID_HEADER, HeaderValue::from_static("loja-1"));

        assert!(matches!(
            company_id_from_headers(&headers),
            Err(AppError::InvalidCompanyHeader)
        ));
    }
}
