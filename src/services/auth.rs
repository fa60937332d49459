// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, User},
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    token_ttl: Duration,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, token_ttl: Duration, pool: PgPool) -> Self {
        Self { user_repo, jwt_secret, token_ttl, pool }
    }

    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<String, AppError> {
        let hashed_password = hash_password(password).await?;

        let new_user = self
            .user_repo
            .create_user(&self.pool, email, first_name, last_name, Some(&hashed_password))
            .await?;

        tracing::info!("👤 Usuário {} registrado", new_user.id);
        self.create_token(new_user.id)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        // Conta criada por convite ainda sem senha
        let password_hash = user.password_hash.clone().ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(user.id)
    }

    /// Aceita o convite: define a senha, consome o token e já devolve o JWT.
    pub async fn accept_invite(&self, token: &str, password: &str) -> Result<String, AppError> {
        let hashed_password = hash_password(password).await?;

        let mut tx = self.pool.begin().await?;

        let invite = self
            .user_repo
            .find_invite_for_update(&mut *tx, token)
            .await?
            .filter(|invite| invite.is_usable(Utc::now()))
            .ok_or(AppError::InvalidInvite)?;

        let user = self
            .user_repo
            .set_password(&mut *tx, invite.user_id, &hashed_password)
            .await?;

        self.user_repo.consume_invite(&mut *tx, token).await?;

        tx.commit().await?;

        tracing::info!("✉️ Convite aceito pelo usuário {}", user.id);
        self.create_token(user.id)
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = decode_token(token, &self.jwt_secret)?;

        self.user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        encode_token(user_id, &self.jwt_secret, self.token_ttl)
    }
}

/// Gera o hash bcrypt fora do runtime assíncrono.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password_clone = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

pub fn encode_token(user_id: Uuid, secret: &str, ttl: Duration) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = now + ttl;

    let claims = Claims {
        sub: user_id,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_subject() {
        let user_id = Uuid::new_v4();
        let token = encode_token(user_id, "segredo", Duration::days(7)).unwrap();

        let claims = decode_token(&token, "segredo").unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = encode_token(Uuid::new_v4(), "segredo", Duration::days(7)).unwrap();
        assert!(matches!(decode_token(&token, "outro"), Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = encode_token(Uuid::new_v4(), "segredo", Duration::hours(-2)).unwrap();
        assert!(matches!(decode_token(&token, "segredo"), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn hashed_password_verifies() {
        let hashed = hash_password("senha-forte").await.unwrap();
        assert!(verify("senha-forte", &hashed).unwrap());
        assert!(!verify("senha-fraca", &hashed).unwrap());
    }
}
