// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::accept_invite,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::get_my_companies,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::invite_user,
        handlers::users::resend_invite,
        handlers::users::assign_role,
        handlers::users::remove_user,

        // --- Companies ---
        handlers::tenancy::create_company,
        handlers::tenancy::list_my_companies,
        handlers::tenancy::get_current_company,
        handlers::tenancy::update_current_company,
        handlers::tenancy::delete_current_company,

        // --- Session ---
        handlers::tenancy::get_session,
        handlers::tenancy::select_company,

        // --- Branches ---
        handlers::branches::list_branches,
        handlers::branches::get_branch,
        handlers::branches::create_branch,
        handlers::branches::update_branch,
        handlers::branches::set_main_branch,
        handlers::branches::delete_branch,
        handlers::branches::list_transfer_candidates,
        handlers::branches::transfer_stock,

        // --- INVENTORY ---
        handlers::inventory::list_items,
        handlers::inventory::get_item,
        handlers::inventory::create_item,
        handlers::inventory::update_item,
        handlers::inventory::adjust_stock,
        handlers::inventory::delete_item,
        handlers::inventory::list_movements,

        // --- ITEM GROUPS ---
        handlers::inventory::list_groups,
        handlers::inventory::group_tree,
        handlers::inventory::get_group,
        handlers::inventory::create_group,
        handlers::inventory::update_group,
        handlers::inventory::delete_group,

        // --- RBAC ---
        handlers::rbac::permission_catalog,
        handlers::rbac::list_roles,
        handlers::rbac::get_role,
        handlers::rbac::create_role,
        handlers::rbac::update_role,
        handlers::rbac::toggle_permission,
        handlers::rbac::delete_role,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AcceptInvitePayload,
            models::auth::AuthResponse,

            // --- Users ---
            models::user::CompanyUser,
            models::user::InviteResponse,
            handlers::users::InviteUserPayload,
            handlers::users::AssignRolePayload,

            // --- Companies / Session ---
            models::company::Company,
            models::company::CompanyMembership,
            models::company::SessionState,
            handlers::tenancy::CreateCompanyPayload,
            handlers::tenancy::UpdateCompanyPayload,
            handlers::tenancy::SelectCompanyPayload,

            // --- Branches ---
            models::branch::BranchStatus,
            models::branch::Branch,
            handlers::branches::BranchPayload,
            handlers::branches::TransferPayload,

            // --- Inventory ---
            models::inventory::Item,
            models::inventory::ItemGroup,
            models::inventory::ItemGroupNode,
            models::inventory::StockMovementReason,
            models::inventory::StockMovement,
            models::inventory::TransferCandidate,
            models::inventory::TransferReceipt,

            // --- Payloads ---
            handlers::inventory::CreateItemPayload,
            handlers::inventory::UpdateItemPayload,
            handlers::inventory::AdjustStockPayload,
            handlers::inventory::ItemGroupPayload,

            // --- RBAC ---
            models::role::PermissionAction,
            models::role::ActionFlags,
            models::role::PermissionToggle,
            models::role::PermissionMatrix,
            models::role::RoleType,
            models::role::Role,
            models::role::PermissionCatalog,
            handlers::rbac::CreateRolePayload,
            handlers::rbac::UpdateRolePayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação, Registro e Convites"),
        (name = "Users", description = "Perfil e Gestão de Usuários da Empresa"),
        (name = "Companies", description = "Gestão de Empresas"),
        (name = "Session", description = "Seleção de Empresa e Filial"),
        (name = "Branches", description = "Filiais e Transferência de Estoque"),
        (name = "Inventory", description = "Gestão de Estoque e Produtos"),
        (name = "Item Groups", description = "Grupos de Itens"),
        (name = "Roles", description = "Controle de Acesso (Cargos e Permissões)")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
