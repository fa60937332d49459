// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Usuário listado na tela de gestão de usuários da empresa
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role_id: Uuid,
    pub role_name: String,
    pub branch_ids: Vec<Uuid>,
    /// false enquanto o convite estiver pendente
    pub invite_accepted: bool,
    pub joined_at: DateTime<Utc>,
}

// Convite de uso único
#[derive(Debug, Clone, FromRow)]
pub struct UserInvite {
    pub token: String,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserInvite {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.consumed_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteResponse {
    pub user: CompanyUser,
    /// None quando a conta já existia com senha (só foi vinculada à empresa)
    pub invite_link: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invite(expires_in: Duration, consumed: bool) -> UserInvite {
        let now = Utc::now();
        UserInvite {
            token: "abc".into(),
            user_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            expires_at: now + expires_in,
            consumed_at: consumed.then_some(now),
            created_at: now,
        }
    }

    #[test]
    fn invite_usable_only_once_and_before_expiry() {
        let now = Utc::now();
        assert!(invite(Duration::hours(1), false).is_usable(now));
        assert!(!invite(Duration::hours(1), true).is_usable(now));
        assert!(!invite(Duration::hours(-1), false).is_usable(now));
    }
}
