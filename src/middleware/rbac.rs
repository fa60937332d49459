// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::locale_from_headers, tenancy::TenantContext},
    models::role::{PermissionAction, Role},
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn module() -> &'static str;
    fn action() -> PermissionAction;
}

/// 2. O Extractor (Guardião)
pub struct RequirePermission<T>(pub PhantomData<T>);

pub fn check_permission(role: &Role, module: &str, action: PermissionAction) -> Result<(), AppError> {
    if role.permissions.allows(module, action) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied {
            module: module.to_string(),
            action,
        })
    }
}

// 3. A matriz do cargo já veio carregada pelo tenant_guard
impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = locale_from_headers(&parts.headers);

        let tenant = parts
            .extensions
            .get::<TenantContext>()
            .ok_or_else(|| AppError::MissingCompanyHeader.to_api_error(&locale, &app_state.i18n_store))?;

        check_permission(&tenant.role, T::module(), T::action())
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

macro_rules! permission {
    ($name:ident, $module:literal, $action:ident) => {
        pub struct $name;
        impl PermissionDef for $name {
            fn module() -> &'static str {
                $module
            }
            fn action() -> PermissionAction {
                PermissionAction::$action
            }
        }
    };
}

permission!(PermCompaniesWrite, "companies", Write);
permission!(PermCompaniesDelete, "companies", Delete);

permission!(PermBranchesRead, "branches", Read);
permission!(PermBranchesWrite, "branches", Write);
permission!(PermBranchesDelete, "branches", Delete);

permission!(PermInventoryRead, "inventory", Read);
permission!(PermInventoryWrite, "inventory", Write);
permission!(PermInventoryDelete, "inventory", Delete);

permission!(PermItemGroupsRead, "item_groups", Read);
permission!(PermItemGroupsWrite, "item_groups", Write);
permission!(PermItemGroupsDelete, "item_groups", Delete);

permission!(PermRolesRead, "roles", Read);
permission!(PermRolesWrite, "roles", Write);
permission!(PermRolesDelete, "roles", Delete);

permission!(PermUsersRead, "users", Read);
permission!(PermUsersWrite, "users", Write);
permission!(PermUsersDelete, "users", Delete);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::{PermissionMatrix, RoleType};
    use chrono::Utc;
    use uuid::Uuid;

    fn role(role_type: RoleType) -> Role {
        let now = Utc::now();
        Role {
            id: Uuid::new_v4(),
            company_id: None,
            role_name: role_type.default_role_name().into(),
            role_type,
            permissions: PermissionMatrix::template(role_type),
            is_default: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn manager_passes_every_guard() {
        let manager = role(RoleType::Manager);
        assert!(check_permission(&manager, PermUsersDelete::module(), PermUsersDelete::action()).is_ok());
        assert!(check_permission(&manager, PermRolesWrite::module(), PermRolesWrite::action()).is_ok());
    }

    #[test]
    fn missing_flag_names_module_and_action() {
        let sales = role(RoleType::SalesManager);
        assert!(check_permission(&sales, PermInventoryRead::module(), PermInventoryRead::action()).is_ok());

        match check_permission(&sales, PermInventoryWrite::module(), PermInventoryWrite::action()) {
            Err(AppError::PermissionDenied { module, action }) => {
                assert_eq!(module, "inventory");
                assert_eq!(action, PermissionAction::Write);
            }
            other => panic!("resultado inesperado: {:?}", other),
        }
    }
}
