// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    common::i18n::I18nStore,
    db::{
        BranchRepository, CompanyRepository, InventoryRepository, ItemGroupRepository,
        RbacRepository, UserRepository,
    },
    services::{
        auth::AuthService, branch_service::BranchService, company_service::CompanyService,
        inventory_service::InventoryService, rbac_service::RbacService,
        session_service::SessionService, transfer_service::TransferService,
        user_service::UserService,
    },
};

/// Configuração lida do ambiente (.env).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub database_max_connections: u32,
    /// Base dos links de convite (o frontend)
    pub app_base_url: String,
    pub invite_ttl: chrono::Duration,
    pub token_ttl: chrono::Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de uma função de busca (o ambiente, ou um mapa nos testes).
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let app_base_url = lookup("APP_BASE_URL").unwrap_or_else(|| "http://localhost:5173".to_string());

        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5u32)?;
        let invite_ttl_hours = parse_or(&lookup, "INVITE_TTL_HOURS", 72i64)?;
        let token_ttl_days = parse_or(&lookup, "TOKEN_TTL_DAYS", 7i64)?;

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            database_max_connections,
            app_base_url,
            invite_ttl: chrono::Duration::hours(invite_ttl_hours),
            token_ttl: chrono::Duration::days(token_ttl_days),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} inválido: '{}'", key, raw)),
        None => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Config,
    pub i18n_store: I18nStore,
    pub company_repo: CompanyRepository,
    pub auth_service: AuthService,
    pub company_service: CompanyService,
    pub branch_service: BranchService,
    pub inventory_service: InventoryService,
    pub transfer_service: TransferService,
    pub rbac_service: RbacService,
    pub session_service: SessionService,
    pub user_service: UserService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let i18n_store = I18nStore::load()?;

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let company_repo = CompanyRepository::new(db_pool.clone());
        let branch_repo = BranchRepository::new(db_pool.clone());
        let inventory_repo = InventoryRepository::new(db_pool.clone());
        let group_repo = ItemGroupRepository::new(db_pool.clone());
        let rbac_repo = RbacRepository::new(db_pool.clone());

        let auth_service = AuthService::new(
            user_repo.clone(),
            config.jwt_secret.clone(),
            config.token_ttl,
            db_pool.clone(),
        );
        let company_service = CompanyService::new(
            company_repo.clone(),
            rbac_repo.clone(),
            branch_repo.clone(),
            db_pool.clone(),
        );
        let branch_service = BranchService::new(
            branch_repo.clone(),
            company_repo.clone(),
            inventory_repo.clone(),
            db_pool.clone(),
        );
        let inventory_service = InventoryService::new(
            inventory_repo.clone(),
            group_repo,
            branch_repo.clone(),
            db_pool.clone(),
        );
        let transfer_service = TransferService::new(inventory_repo, branch_repo.clone(), db_pool.clone());
        let rbac_service = RbacService::new(rbac_repo.clone(), db_pool.clone());
        let session_service = SessionService::new(
            company_repo.clone(),
            branch_repo.clone(),
            user_repo.clone(),
            branch_service.clone(),
            db_pool.clone(),
        );
        let user_service = UserService::new(
            user_repo,
            company_repo.clone(),
            branch_repo,
            rbac_repo,
            db_pool.clone(),
            config.app_base_url.clone(),
            config.invite_ttl,
        );

        Ok(Self {
            db_pool,
            config,
            i18n_store,
            company_repo,
            auth_service,
            company_service,
            branch_service,
            inventory_service,
            transfer_service,
            rbac_service,
            session_service,
            user_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_fill_optional_values() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/retail"),
            ("JWT_SECRET", "segredo"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.invite_ttl, chrono::Duration::hours(72));
        assert_eq!(config.token_ttl, chrono::Duration::days(7));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/retail"),
            ("JWT_SECRET", "segredo"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("DATABASE_MAX_CONNECTIONS", " 20 "),
            ("INVITE_TTL_HOURS", "24"),
            ("TOKEN_TTL_DAYS", "1"),
            ("APP_BASE_URL", "https://app.example.com"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.database_max_connections, 20);
        assert_eq!(config.invite_ttl, chrono::Duration::hours(24));
        assert_eq!(config.token_ttl, chrono::Duration::days(1));
        assert_eq!(config.app_base_url, "https://app.example.com");
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/retail")]))
            .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn malformed_number_is_an_error() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/retail"),
            ("JWT_SECRET", "segredo"),
            ("TOKEN_TTL_DAYS", "sete"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("TOKEN_TTL_DAYS"));
    }
}
