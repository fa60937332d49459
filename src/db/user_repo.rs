// src/db/user_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    models::{
        auth::User,
        user::{CompanyUser, UserInvite},
    },
};

// Colunas da listagem de usuários de uma empresa
const COMPANY_USER_SELECT: &str = r#"
    SELECT
        u.id, u.email, u.first_name, u.last_name,
        uc.role_id, r.role_name,
        COALESCE(
            ARRAY(
                SELECT ub.branch_id FROM user_branches ub
                WHERE ub.user_id = u.id AND ub.company_id = uc.company_id
                ORDER BY ub.created_at
            ),
            '{}'
        ) AS branch_ids,
        (u.password_hash IS NOT NULL) AS invite_accepted,
        uc.created_at AS joined_at
    FROM user_companies uc
    JOIN users u ON u.id = uc.user_id
    JOIN roles r ON r.id = uc.role_id
"#;

// O repositório de usuários, responsável pelas tabelas 'users' e 'user_invites'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo seu e-mail
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.find_by_email_with(&self.pool, email).await
    }

    pub async fn find_by_email_with<'e, E>(
        &self,
        executor: E,
        email: &str,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Cria o usuário. `password_hash` é None para contas criadas por convite.
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        email: &str,
        first_name: &str,
        last_name: &str,
        password_hash: Option<&str>,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, first_name, last_name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .bind(password_hash)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, |_| AppError::EmailAlreadyExists))
    }

    pub async fn set_password<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(password_hash)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::UserNotFound)
    }

    /// Grava a empresa/filial padrão escolhida na tela de seleção.
    pub async fn set_defaults<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        company_id: Option<Uuid>,
        branch_id: Option<Uuid>,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET default_company_id = $2, default_branch_id = $3, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .bind(branch_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::UserNotFound)
    }

    pub async fn delete_user<'e, E>(&self, executor: E, user_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // ---
    // Usuários de uma empresa
    // ---

    pub async fn list_company_users<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<Vec<CompanyUser>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("{COMPANY_USER_SELECT} WHERE uc.company_id = $1 ORDER BY u.email ASC");
        let users = sqlx::query_as::<_, CompanyUser>(&sql)
            .bind(company_id)
            .fetch_all(executor)
            .await?;
        Ok(users)
    }

    pub async fn find_company_user<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<CompanyUser>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("{COMPANY_USER_SELECT} WHERE uc.company_id = $1 AND uc.user_id = $2");
        let user = sqlx::query_as::<_, CompanyUser>(&sql)
            .bind(company_id)
            .bind(user_id)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    // ---
    // Convites
    // ---

    pub async fn create_invite<'e, E>(
        &self,
        executor: E,
        token: &str,
        user_id: Uuid,
        company_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<UserInvite, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invite = sqlx::query_as::<_, UserInvite>(
            r#"
            INSERT INTO user_invites (token, user_id, company_id, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(company_id)
        .bind(expires_at)
        .fetch_one(executor)
        .await?;
        Ok(invite)
    }

    /// Invalida os convites pendentes do usuário nesta empresa (reenvio gera um novo).
    pub async fn invalidate_invites<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE user_invites SET consumed_at = now()
            WHERE user_id = $1 AND company_id = $2 AND consumed_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_invite_for_update<'e, E>(
        &self,
        executor: E,
        token: &str,
    ) -> Result<Option<UserInvite>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invite = sqlx::query_as::<_, UserInvite>(
            "SELECT * FROM user_invites WHERE token = $1 FOR UPDATE",
        )
        .bind(token)
        .fetch_optional(executor)
        .await?;
        Ok(invite)
    }

    pub async fn consume_invite<'e, E>(&self, executor: E, token: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE user_invites SET consumed_at = now() WHERE token = $1")
            .bind(token)
            .execute(executor)
            .await?;
        Ok(())
    }
}
