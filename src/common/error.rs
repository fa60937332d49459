use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

use crate::{
    common::i18n::I18nStore,
    middleware::i18n::Locale,
    models::role::PermissionAction,
};

// Erros de domínio. Cada variante vira uma mensagem traduzida em `to_api_error`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Convite inválido ou expirado")]
    InvalidInvite,

    #[error("Empresa não encontrada")]
    CompanyNotFound,

    #[error("Usuário não pertence à empresa")]
    NotCompanyMember,

    #[error("Cabeçalho X-Company-ID ausente")]
    MissingCompanyHeader,

    #[error("Cabeçalho X-Company-ID inválido")]
    InvalidCompanyHeader,

    #[error("Filial não encontrada")]
    BranchNotFound,

    #[error("Sem acesso à filial")]
    BranchAccessDenied,

    #[error("Item não encontrado")]
    ItemNotFound,

    #[error("Grupo de itens não encontrado")]
    ItemGroupNotFound,

    #[error("Cargo não encontrado")]
    RoleNotFound,

    #[error("Permissão negada: {module}:{action}")]
    PermissionDenied {
        module: String,
        action: PermissionAction,
    },

    #[error("Filial possui {count} itens")]
    BranchHasItems { count: i64 },

    #[error("A filial principal não pode ser excluída")]
    MainBranchDeletion,

    #[error("Grupo possui subgrupos")]
    ItemGroupHasChildren,

    #[error("Hierarquia de grupos cíclica")]
    ItemGroupCycle,

    #[error("Cargo atribuído a {count} usuários")]
    RoleInUse { count: i64 },

    #[error("Cargo padrão é somente leitura")]
    DefaultRoleReadOnly,

    #[error("Transferência para a mesma filial")]
    SameBranchTransfer,

    #[error("Quantidade inválida: {0}")]
    InvalidQuantity(Decimal),

    #[error("Estoque insuficiente: disponível {available}, solicitado {requested}")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Usuário já é membro da empresa")]
    UserAlreadyMember,

    #[error("Usuário não pode remover a si mesmo")]
    CannotRemoveSelf,

    #[error("Código '{0}' já existe na filial")]
    CodeAlreadyExists(String),

    #[error("Filial '{0}' já existe")]
    BranchNameAlreadyExists(String),

    #[error("Cargo '{0}' já existe")]
    RoleNameAlreadyExists(String),

    #[error("Grupo '{0}' já existe")]
    ItemGroupNameAlreadyExists(String),

    #[error("Violação de restrição única: {0}")]
    UniqueConstraintViolation(String),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::MissingCompanyHeader
            | AppError::InvalidCompanyHeader
            | AppError::SameBranchTransfer
            | AppError::InvalidQuantity(_)
            | AppError::ItemGroupCycle => StatusCode::BAD_REQUEST,

            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,

            AppError::NotCompanyMember
            | AppError::BranchAccessDenied
            | AppError::PermissionDenied { .. }
            | AppError::DefaultRoleReadOnly
            | AppError::CannotRemoveSelf => StatusCode::FORBIDDEN,

            AppError::UserNotFound
            | AppError::InvalidInvite
            | AppError::CompanyNotFound
            | AppError::BranchNotFound
            | AppError::ItemNotFound
            | AppError::ItemGroupNotFound
            | AppError::RoleNotFound => StatusCode::NOT_FOUND,

            AppError::EmailAlreadyExists
            | AppError::BranchHasItems { .. }
            | AppError::MainBranchDeletion
            | AppError::ItemGroupHasChildren
            | AppError::RoleInUse { .. }
            | AppError::UserAlreadyMember
            | AppError::CodeAlreadyExists(_)
            | AppError::BranchNameAlreadyExists(_)
            | AppError::RoleNameAlreadyExists(_)
            | AppError::ItemGroupNameAlreadyExists(_)
            | AppError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,

            AppError::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message_key(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "errors.validation",
            AppError::EmailAlreadyExists => "errors.email_exists",
            AppError::InvalidCredentials => "errors.invalid_credentials",
            AppError::InvalidToken => "errors.invalid_token",
            AppError::UserNotFound => "errors.user_not_found",
            AppError::InvalidInvite => "errors.invalid_invite",
            AppError::CompanyNotFound => "errors.company_not_found",
            AppError::NotCompanyMember => "errors.not_company_member",
            AppError::MissingCompanyHeader => "errors.missing_company_header",
            AppError::InvalidCompanyHeader => "errors.invalid_company_header",
            AppError::BranchNotFound => "errors.branch_not_found",
            AppError::BranchAccessDenied => "errors.branch_access_denied",
            AppError::ItemNotFound => "errors.item_not_found",
            AppError::ItemGroupNotFound => "errors.item_group_not_found",
            AppError::RoleNotFound => "errors.role_not_found",
            AppError::PermissionDenied { .. } => "errors.permission_denied",
            AppError::BranchHasItems { .. } => "errors.branch_has_items",
            AppError::MainBranchDeletion => "errors.main_branch_deletion",
            AppError::ItemGroupHasChildren => "errors.item_group_has_children",
            AppError::ItemGroupCycle => "errors.item_group_cycle",
            AppError::RoleInUse { .. } => "errors.role_in_use",
            AppError::DefaultRoleReadOnly => "errors.default_role_read_only",
            AppError::SameBranchTransfer => "errors.same_branch_transfer",
            AppError::InvalidQuantity(_) => "errors.invalid_quantity",
            AppError::InsufficientStock { .. } => "errors.insufficient_stock",
            AppError::UserAlreadyMember => "errors.user_already_member",
            AppError::CannotRemoveSelf => "errors.cannot_remove_self",
            AppError::CodeAlreadyExists(_) => "errors.code_exists",
            AppError::BranchNameAlreadyExists(_) => "errors.branch_name_exists",
            AppError::RoleNameAlreadyExists(_) => "errors.role_name_exists",
            AppError::ItemGroupNameAlreadyExists(_) => "errors.item_group_name_exists",
            AppError::UniqueConstraintViolation(_) => "errors.conflict",
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => "errors.internal",
        }
    }

    fn message_args(&self) -> Vec<(&'static str, String)> {
        match self {
            AppError::PermissionDenied { module, action } => {
                vec![("module", module.clone()), ("action", action.to_string())]
            }
            AppError::BranchHasItems { count } | AppError::RoleInUse { count } => {
                vec![("count", count.to_string())]
            }
            AppError::InsufficientStock { available, requested } => vec![
                ("available", available.normalize().to_string()),
                ("requested", requested.normalize().to_string()),
            ],
            AppError::CodeAlreadyExists(code) => vec![("code", code.clone())],
            AppError::BranchNameAlreadyExists(name)
            | AppError::RoleNameAlreadyExists(name)
            | AppError::ItemGroupNameAlreadyExists(name) => vec![("name", name.clone())],
            AppError::UniqueConstraintViolation(constraint) => {
                vec![("constraint", constraint.clone())]
            }
            _ => Vec::new(),
        }
    }

    /// Converte o erro de domínio na resposta HTTP, já traduzida para o idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        }

        let error = i18n.translate(&locale.0, self.message_key(), &self.message_args());

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut fields = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| match &e.message {
                            Some(key) => i18n.translate(&locale.0, key, &[]),
                            None => e.code.to_string(),
                        })
                        .collect();
                    fields.insert(field.to_string(), json!(messages));
                }
                Some(serde_json::Value::Object(fields))
            }
            AppError::InsufficientStock { available, requested } => Some(json!({
                "available": available,
                "requested": requested,
            })),
            AppError::BranchHasItems { count } => Some(json!({ "itemCount": count })),
            _ => None,
        };

        ApiError { status, error, details }
    }
}

// A resposta de erro que efetivamente vai para o cliente.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::{ValidationError, ValidationErrors};

    fn store() -> I18nStore {
        I18nStore::load().unwrap()
    }

    #[test]
    fn insufficient_stock_is_unprocessable_with_details() {
        let err = AppError::InsufficientStock {
            available: Decimal::new(3, 0),
            requested: Decimal::new(5, 0),
        };
        let api = err.to_api_error(&Locale("en".into()), &store());

        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api.error, "Insufficient stock: 3 available, 5 requested.");
        assert!(api.details.is_some());
    }

    #[test]
    fn branch_with_items_names_the_count() {
        let api = AppError::BranchHasItems { count: 12 }
            .to_api_error(&Locale("pt".into()), &store());

        assert_eq!(api.status, StatusCode::CONFLICT);
        assert!(api.error.contains("12 item(ns)"));
        assert_eq!(api.details, Some(json!({ "itemCount": 12 })));
    }

    #[test]
    fn permission_denied_names_module_and_action() {
        let api = AppError::PermissionDenied {
            module: "inventory".into(),
            action: PermissionAction::Delete,
        }
        .to_api_error(&Locale("en".into()), &store());

        assert_eq!(api.status, StatusCode::FORBIDDEN);
        assert!(api.error.contains("'delete'"));
        assert!(api.error.contains("'inventory'"));
    }

    #[test]
    fn validation_details_are_translated_per_field() {
        let mut errors = ValidationErrors::new();
        let mut field_error = ValidationError::new("length");
        field_error.message = Some("validation.name_required".into());
        errors.add("name", field_error);

        let api = AppError::ValidationError(errors).to_api_error(&Locale("en".into()), &store());

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            api.details,
            Some(json!({ "name": ["The name is required."] }))
        );
    }

    #[test]
    fn internal_errors_hide_the_cause() {
        let api = AppError::InternalServerError(anyhow::anyhow!("senha do banco: hunter2"))
            .to_api_error(&Locale("en".into()), &store());

        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.error, "An unexpected error occurred.");
    }
}
