// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};

use crate::common::i18n::DEFAULT_LANG;

/// Idiomas com catálogo em `locales/`.
pub const SUPPORTED_LANGS: &[&str] = &["en", "pt"];

// Extrator de idioma (Accept-Language)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

/// Escolhe o primeiro idioma suportado na ordem de preferência do cliente.
/// "pt-BR" -> "pt"; sem correspondência cai no idioma padrão.
pub fn negotiate(accept_language: Option<&str>) -> Locale {
    let lang = accept_language
        .map(accept_language::parse)
        .unwrap_or_default()
        .into_iter()
        .map(|tag| tag.split('-').next().unwrap_or(tag.as_str()).to_lowercase())
        .find(|primary| SUPPORTED_LANGS.contains(&primary.as_str()))
        .unwrap_or_else(|| DEFAULT_LANG.to_string());

    Locale(lang)
}

pub fn locale_from_headers(headers: &HeaderMap) -> Locale {
    negotiate(
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok()),
    )
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(locale_from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regional_tag_maps_to_primary_language() {
        assert_eq!(negotiate(Some("pt-BR,pt;q=0.9,en;q=0.8")), Locale("pt".into()));
    }

    #[test]
    fn quality_order_is_respected() {
        assert_eq!(negotiate(Some("pt;q=0.5, en;q=0.9")), Locale("en".into()));
    }

    #[test]
    fn unsupported_languages_are_skipped() {
        assert_eq!(negotiate(Some("fr-FR, de;q=0.9, pt;q=0.1")), Locale("pt".into()));
        assert_eq!(negotiate(Some("ja")), Locale("en".into()));
    }

    #[test]
    fn missing_header_uses_default() {
        assert_eq!(negotiate(None), Locale("en".into()));
    }
}
