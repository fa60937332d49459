// src/models/role.rs

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Módulos do sistema que aparecem na matriz de permissões.
pub const MODULES: &[&str] = &[
    "dashboard",
    "companies",
    "branches",
    "inventory",
    "item_groups",
    "roles",
    "users",
    "reports",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    Read,
    Write,
    Delete,
    Export,
}

impl PermissionAction {
    pub const ALL: [PermissionAction; 4] = [
        PermissionAction::Read,
        PermissionAction::Write,
        PermissionAction::Delete,
        PermissionAction::Export,
    ];
}

impl fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionAction::Read => "read",
            PermissionAction::Write => "write",
            PermissionAction::Delete => "delete",
            PermissionAction::Export => "export",
        };
        f.write_str(s)
    }
}

// As quatro flags de um módulo
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActionFlags {
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub export: bool,
}

impl ActionFlags {
    pub const ALL: ActionFlags = ActionFlags { read: true, write: true, delete: true, export: true };
    pub const NONE: ActionFlags = ActionFlags { read: false, write: false, delete: false, export: false };

    pub fn get(&self, action: PermissionAction) -> bool {
        match action {
            PermissionAction::Read => self.read,
            PermissionAction::Write => self.write,
            PermissionAction::Delete => self.delete,
            PermissionAction::Export => self.export,
        }
    }

    pub fn set(&mut self, action: PermissionAction, enabled: bool) {
        match action {
            PermissionAction::Read => self.read = enabled,
            PermissionAction::Write => self.write = enabled,
            PermissionAction::Delete => self.delete = enabled,
            PermissionAction::Export => self.export = enabled,
        }
    }
}

fn grant(module: &str, actions: &[PermissionAction]) -> (String, ActionFlags) {
    let mut flags = ActionFlags::NONE;
    for action in actions {
        flags.set(*action, true);
    }
    (module.to_string(), flags)
}

/// Alteração pontual na matriz, vinda dos botões "marcar tudo" / "limpar tudo" da tela de cargos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PermissionToggle {
    SelectAll,
    ClearAll,
    Set { action: PermissionAction, enabled: bool },
}

/// Mapa módulo -> flags, gravado como JSONB na coluna `roles.permissions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct PermissionMatrix(pub BTreeMap<String, ActionFlags>);

impl PermissionMatrix {
    pub fn full() -> Self {
        Self(
            MODULES
                .iter()
                .map(|m| (m.to_string(), ActionFlags::ALL))
                .collect(),
        )
    }

    /// Permissões iniciais de cada tipo de cargo.
    pub fn template(role_type: RoleType) -> Self {
        use PermissionAction::*;

        let grants = match role_type {
            RoleType::Manager => return Self::full(),
            RoleType::InventoryManager => vec![
                grant("dashboard", &[Read]),
                grant("branches", &[Read, Write]),
                grant("inventory", &[Read, Write, Delete, Export]),
                grant("item_groups", &[Read, Write, Delete, Export]),
                grant("reports", &[Read, Export]),
            ],
            RoleType::SalesManager => vec![
                grant("dashboard", &[Read]),
                grant("branches", &[Read]),
                grant("inventory", &[Read, Export]),
                grant("item_groups", &[Read]),
                grant("reports", &[Read, Export]),
            ],
            RoleType::Custom => Vec::new(),
        };

        Self(grants.into_iter().collect())
    }

    pub fn flags(&self, module: &str) -> ActionFlags {
        self.0.get(module).copied().unwrap_or_default()
    }

    pub fn allows(&self, module: &str, action: PermissionAction) -> bool {
        self.flags(module).get(action)
    }

    pub fn apply(&mut self, module: &str, toggle: PermissionToggle) {
        let flags = self.0.entry(module.to_string()).or_default();
        match toggle {
            PermissionToggle::SelectAll => *flags = ActionFlags::ALL,
            PermissionToggle::ClearAll => *flags = ActionFlags::NONE,
            PermissionToggle::Set { action, enabled } => flags.set(action, enabled),
        }
    }

    /// Descarta módulos desconhecidos e entradas sem nenhuma flag ligada.
    pub fn retain_known_modules(mut self) -> Self {
        self.0
            .retain(|module, flags| MODULES.contains(&module.as_str()) && *flags != ActionFlags::NONE);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "role_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RoleType {
    Manager,
    InventoryManager,
    SalesManager,
    Custom,
}

impl RoleType {
    pub fn default_role_name(&self) -> &'static str {
        match self {
            RoleType::Manager => "Manager",
            RoleType::InventoryManager => "Inventory Manager",
            RoleType::SalesManager => "Sales Manager",
            RoleType::Custom => "Custom",
        }
    }
}

// Cargos com company_id NULL são os modelos globais (is_default = true)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Uuid,
    pub company_id: Option<Uuid>,
    pub role_name: String,
    pub role_type: RoleType,
    #[sqlx(json)]
    pub permissions: PermissionMatrix,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Catálogo exposto para o frontend montar a matriz
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCatalog {
    pub modules: Vec<String>,
    pub actions: Vec<PermissionAction>,
}

impl PermissionCatalog {
    pub fn current() -> Self {
        Self {
            modules: MODULES.iter().map(|m| m.to_string()).collect(),
            actions: PermissionAction::ALL.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_all_sets_every_action_of_the_module() {
        let mut matrix = PermissionMatrix::default();
        matrix.apply("inventory", PermissionToggle::SelectAll);

        for action in PermissionAction::ALL {
            assert!(matrix.allows("inventory", action), "{} deveria estar ligado", action);
        }
        assert!(!matrix.allows("users", PermissionAction::Read));
    }

    #[test]
    fn clear_all_unsets_every_action_of_the_module() {
        let mut matrix = PermissionMatrix::full();
        matrix.apply("branches", PermissionToggle::ClearAll);

        assert_eq!(matrix.flags("branches"), ActionFlags::NONE);
        assert!(matrix.allows("inventory", PermissionAction::Delete));
    }

    #[test]
    fn single_toggle_touches_one_flag() {
        let mut matrix = PermissionMatrix::default();
        matrix.apply(
            "reports",
            PermissionToggle::Set { action: PermissionAction::Export, enabled: true },
        );

        let flags = matrix.flags("reports");
        assert!(flags.export);
        assert!(!flags.read && !flags.write && !flags.delete);
    }

    #[test]
    fn templates_match_role_types() {
        let manager = PermissionMatrix::template(RoleType::Manager);
        assert!(MODULES.iter().all(|m| manager.flags(m) == ActionFlags::ALL));

        let sales = PermissionMatrix::template(RoleType::SalesManager);
        assert!(sales.allows("inventory", PermissionAction::Read));
        assert!(!sales.allows("inventory", PermissionAction::Write));

        assert_eq!(PermissionMatrix::template(RoleType::Custom), PermissionMatrix::default());
    }

    #[test]
    fn json_shape_is_module_to_flags() {
        let mut matrix = PermissionMatrix::default();
        matrix.apply("inventory", PermissionToggle::SelectAll);

        let value = serde_json::to_value(&matrix).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "inventory": { "read": true, "write": true, "delete": true, "export": true }
            })
        );

        let parsed: PermissionMatrix =
            serde_json::from_value(serde_json::json!({ "users": { "read": true } })).unwrap();
        assert!(parsed.allows("users", PermissionAction::Read));
        assert!(!parsed.allows("users", PermissionAction::Export));
    }

    #[test]
    fn unknown_and_empty_modules_are_dropped() {
        let mut matrix = PermissionMatrix::default();
        matrix.apply("spaceships", PermissionToggle::SelectAll);
        matrix.apply("users", PermissionToggle::ClearAll);
        matrix.apply("roles", PermissionToggle::SelectAll);

        let cleaned = matrix.retain_known_modules();
        assert_eq!(cleaned.0.keys().collect::<Vec<_>>(), vec!["roles"]);
    }

    #[test]
    fn toggle_payload_format() {
        let toggle: PermissionToggle = serde_json::from_value(
            serde_json::json!({ "op": "set", "action": "delete", "enabled": false }),
        )
        .unwrap();
        assert_eq!(
            toggle,
            PermissionToggle::Set { action: PermissionAction::Delete, enabled: false }
        );

        let toggle: PermissionToggle =
            serde_json::from_value(serde_json::json!({ "op": "select_all" })).unwrap();
        assert_eq!(toggle, PermissionToggle::SelectAll);
    }
}
