// src/main.rs

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::auth::{auth_guard, tenant_guard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controla o nível; padrão info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config).await?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    app_state.rbac_service.seed_default_roles().await?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    tracing::info!("📚 Documentação em http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app(app_state))
        .await
        .context("Erro no servidor Axum")?;

    Ok(())
}

fn app(app_state: AppState) -> Router {
    // Rotas públicas
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/accept-invite", post(handlers::auth::accept_invite));

    // Só JWT: o usuário ainda pode não ter escolhido empresa
    let company_routes = Router::new()
        .route(
            "/",
            post(handlers::tenancy::create_company).get(handlers::tenancy::list_my_companies),
        )
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let session_routes = Router::new()
        .route("/", get(handlers::tenancy::get_session))
        .route("/select", post(handlers::tenancy::select_company))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let permission_routes = Router::new()
        .route("/", get(handlers::rbac::permission_catalog))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // /me fica só com JWT; a gestão de usuários exige X-Company-ID
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/me/companies", get(handlers::auth::get_my_companies))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard))
        .merge(
            Router::new()
                .route("/", get(handlers::users::list_users))
                .route("/invite", post(handlers::users::invite_user))
                .route(
                    "/{id}",
                    get(handlers::users::get_user).delete(handlers::users::remove_user),
                )
                .route("/{id}/resend-invite", post(handlers::users::resend_invite))
                .route("/{id}/assignment", put(handlers::users::assign_role))
                .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard)),
        );

    // --- Rotas da empresa selecionada (X-Company-ID) ---
    let current_company_routes = Router::new()
        .route(
            "/",
            get(handlers::tenancy::get_current_company)
                .put(handlers::tenancy::update_current_company)
                .delete(handlers::tenancy::delete_current_company),
        )
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard));

    let branch_routes = Router::new()
        .route(
            "/",
            get(handlers::branches::list_branches).post(handlers::branches::create_branch),
        )
        .route(
            "/{id}",
            get(handlers::branches::get_branch)
                .put(handlers::branches::update_branch)
                .delete(handlers::branches::delete_branch),
        )
        .route("/{id}/main", post(handlers::branches::set_main_branch))
        .route(
            "/{id}/transfer-candidates",
            get(handlers::branches::list_transfer_candidates),
        )
        .route("/{id}/transfers", post(handlers::branches::transfer_stock))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard));

    let inventory_routes = Router::new()
        .route(
            "/items",
            get(handlers::inventory::list_items).post(handlers::inventory::create_item),
        )
        .route(
            "/items/{id}",
            get(handlers::inventory::get_item)
                .put(handlers::inventory::update_item)
                .delete(handlers::inventory::delete_item),
        )
        .route("/items/{id}/adjust", post(handlers::inventory::adjust_stock))
        .route("/items/{id}/movements", get(handlers::inventory::list_movements))
        .route(
            "/groups",
            get(handlers::inventory::list_groups).post(handlers::inventory::create_group),
        )
        .route("/groups/tree", get(handlers::inventory::group_tree))
        .route(
            "/groups/{id}",
            get(handlers::inventory::get_group)
                .put(handlers::inventory::update_group)
                .delete(handlers::inventory::delete_group),
        )
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard));

    let role_routes = Router::new()
        .route(
            "/",
            get(handlers::rbac::list_roles).post(handlers::rbac::create_role),
        )
        .route(
            "/{id}",
            get(handlers::rbac::get_role)
                .put(handlers::rbac::update_role)
                .delete(handlers::rbac::delete_role),
        )
        .route(
            "/{id}/permissions/{module}",
            post(handlers::rbac::toggle_permission),
        )
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/companies", company_routes)
        .nest("/api/company", current_company_routes)
        .nest("/api/session", session_routes)
        .nest("/api/permissions", permission_routes)
        .nest("/api/branches", branch_routes)
        .nest("/api/inventory", inventory_routes)
        .nest("/api/roles", role_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
