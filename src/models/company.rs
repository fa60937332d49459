// src/models/company.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::branch::Branch;

// A empresa (o "tenant")
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub financial_year_start: NaiveDate,
    pub book_start_date: NaiveDate,
    pub has_branches: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// A empresa vista por um usuário: inclui o cargo dele e se é a empresa padrão
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyMembership {
    pub id: Uuid,
    pub name: String,
    pub financial_year_start: NaiveDate,
    pub book_start_date: NaiveDate,
    pub has_branches: bool,
    pub role_id: Uuid,
    pub role_name: String,
    pub is_default: bool,
}

// Estado de seleção empresa/filial devolvido ao frontend
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub companies: Vec<CompanyMembership>,
    pub selected_company_id: Option<Uuid>,
    pub branches: Vec<Branch>,
    pub selected_branch_id: Option<Uuid>,
    pub needs_company_selection: bool,
    pub needs_branch_selection: bool,
}
