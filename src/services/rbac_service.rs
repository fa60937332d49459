// src/services/rbac_service.rs

use sqlx::PgPool;
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::error::AppError,
    db::RbacRepository,
    models::role::{
        PermissionCatalog, PermissionMatrix, PermissionToggle, Role, RoleType, MODULES,
    },
};

/// Cargos globais semeados na inicialização.
pub const SEEDED_ROLE_TYPES: [RoleType; 3] = [
    RoleType::Manager,
    RoleType::InventoryManager,
    RoleType::SalesManager,
];

/// Cargos padrão (globais) são só leitura para as empresas.
pub fn ensure_editable(role: &Role) -> Result<(), AppError> {
    if role.is_default || role.company_id.is_none() {
        return Err(AppError::DefaultRoleReadOnly);
    }
    Ok(())
}

pub fn ensure_known_module(module: &str) -> Result<(), AppError> {
    if MODULES.contains(&module) {
        return Ok(());
    }
    let mut error = ValidationError::new("unknown_module");
    error.message = Some("validation.unknown_module".into());

    let mut errors = ValidationErrors::new();
    errors.add("module", error);
    Err(AppError::ValidationError(errors))
}

/// Permissões de um cargo novo: as informadas ou, na falta delas, o modelo do tipo.
pub fn initial_permissions(role_type: RoleType, permissions: Option<PermissionMatrix>) -> PermissionMatrix {
    permissions
        .unwrap_or_else(|| PermissionMatrix::template(role_type))
        .retain_known_modules()
}

#[derive(Clone)]
pub struct RbacService {
    rbac_repo: RbacRepository,
    pool: PgPool,
}

impl RbacService {
    pub fn new(rbac_repo: RbacRepository, pool: PgPool) -> Self {
        Self { rbac_repo, pool }
    }

    pub async fn seed_default_roles(&self) -> Result<(), AppError> {
        for role_type in SEEDED_ROLE_TYPES {
            self.rbac_repo.ensure_default_role(role_type).await?;
        }
        tracing::info!("🔐 Cargos padrão garantidos");
        Ok(())
    }

    pub fn permission_catalog(&self) -> PermissionCatalog {
        PermissionCatalog::current()
    }

    pub async fn list_roles(&self, company_id: Uuid) -> Result<Vec<Role>, AppError> {
        self.rbac_repo.list_roles(&self.pool, company_id).await
    }

    pub async fn get_role(&self, company_id: Uuid, role_id: Uuid) -> Result<Role, AppError> {
        self.rbac_repo
            .find_role(&self.pool, company_id, role_id)
            .await?
            .ok_or(AppError::RoleNotFound)
    }

    pub async fn create_role(
        &self,
        company_id: Uuid,
        role_name: &str,
        role_type: RoleType,
        permissions: Option<PermissionMatrix>,
    ) -> Result<Role, AppError> {
        let permissions = initial_permissions(role_type, permissions);

        self.rbac_repo
            .create_role(&self.pool, company_id, role_name, role_type, &permissions)
            .await
    }

    /// Atualiza nome e matriz. `permissions` ausente mantém a matriz atual.
    pub async fn update_role(
        &self,
        company_id: Uuid,
        role_id: Uuid,
        role_name: &str,
        permissions: Option<PermissionMatrix>,
    ) -> Result<Role, AppError> {
        let role = self.get_role(company_id, role_id).await?;
        ensure_editable(&role)?;

        let permissions = permissions.unwrap_or(role.permissions).retain_known_modules();

        self.rbac_repo
            .update_role(&self.pool, company_id, role_id, role_name, &permissions)
            .await?
            .ok_or(AppError::RoleNotFound)
    }

    /// "Marcar tudo" / "limpar tudo" / uma ação isolada de um módulo.
    pub async fn toggle_permission(
        &self,
        company_id: Uuid,
        role_id: Uuid,
        module: &str,
        toggle: PermissionToggle,
    ) -> Result<Role, AppError> {
        ensure_known_module(module)?;

        let role = self.get_role(company_id, role_id).await?;
        ensure_editable(&role)?;

        let mut permissions = role.permissions;
        permissions.apply(module, toggle);
        let permissions = permissions.retain_known_modules();

        self.rbac_repo
            .update_role(&self.pool, company_id, role_id, &role.role_name, &permissions)
            .await?
            .ok_or(AppError::RoleNotFound)
    }

    pub async fn delete_role(&self, company_id: Uuid, role_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let role = self
            .rbac_repo
            .find_role(&mut *tx, company_id, role_id)
            .await?
            .ok_or(AppError::RoleNotFound)?;
        ensure_editable(&role)?;

        let assigned = self.rbac_repo.count_assignments(&mut *tx, role_id).await?;
        if assigned > 0 {
            return Err(AppError::RoleInUse { count: assigned });
        }

        self.rbac_repo.delete_role(&mut *tx, company_id, role_id).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::PermissionAction;
    use chrono::Utc;

    fn role(company_id: Option<Uuid>, is_default: bool) -> Role {
        let now = Utc::now();
        Role {
            id: Uuid::new_v4(),
            company_id,
            role_name: "Caixa".into(),
            role_type: RoleType::Custom,
            permissions: PermissionMatrix::default(),
            is_default,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn global_default_roles_are_read_only() {
        assert!(matches!(ensure_editable(&role(None, true)), Err(AppError::DefaultRoleReadOnly)));
        assert!(ensure_editable(&role(Some(Uuid::new_v4()), false)).is_ok());
    }

    #[test]
    fn unknown_module_is_a_validation_error() {
        assert!(ensure_known_module("inventory").is_ok());
        match ensure_known_module("payroll") {
            Err(AppError::ValidationError(errors)) => {
                assert!(errors.field_errors().contains_key("module"));
            }
            other => panic!("resultado inesperado: {:?}", other),
        }
    }

    #[test]
    fn new_role_falls_back_to_type_template() {
        let matrix = initial_permissions(RoleType::InventoryManager, None);
        assert!(matrix.allows("inventory", PermissionAction::Delete));
        assert!(!matrix.allows("users", PermissionAction::Read));
    }

    #[test]
    fn explicit_permissions_drop_unknown_modules() {
        let mut custom = PermissionMatrix::default();
        custom.apply("users", PermissionToggle::SelectAll);
        custom.apply("payroll", PermissionToggle::SelectAll);

        let matrix = initial_permissions(RoleType::Custom, Some(custom));
        assert!(matrix.allows("users", PermissionAction::Export));
        assert!(!matrix.0.contains_key("payroll"));
    }
}
