// src/services/test_support.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::{
        BranchRepository, CompanyRepository, InventoryRepository, ItemGroupRepository,
        RbacRepository, UserRepository,
    },
    models::{
        auth::User,
        branch::{Branch, BranchFields, BranchStatus},
        company::Company,
        inventory::{Item, NewItem},
        role::RoleType,
    },
    services::{
        branch_service::BranchService, company_service::CompanyService,
        inventory_service::InventoryService, rbac_service::RbacService,
        session_service::SessionService, transfer_service::TransferService,
    },
};

/// Banco migrado com cargos padrão, um dono e uma empresa com a filial principal.
pub(crate) struct Fixture {
    pub pool: PgPool,
    pub owner: User,
    pub company: Company,
    pub main_branch: Branch,
}

impl Fixture {
    pub async fn new(pool: PgPool) -> Self {
        RbacService::new(RbacRepository::new(pool.clone()), pool.clone())
            .seed_default_roles()
            .await
            .unwrap();

        let owner = UserRepository::new(pool.clone())
            .create_user(&pool, "dono@loja.com", "Dona", "Loja", None)
            .await
            .unwrap();

        let company = CompanyService::new(
            CompanyRepository::new(pool.clone()),
            RbacRepository::new(pool.clone()),
            BranchRepository::new(pool.clone()),
            pool.clone(),
        )
        .create_company(
            owner.id,
            "Mercado Central",
            chrono::NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            Some("Matriz"),
        )
        .await
        .unwrap();

        let main_branch = BranchRepository::new(pool.clone())
            .list_by_company(&pool, company.id)
            .await
            .unwrap()
            .remove(0);

        Self { pool, owner, company, main_branch }
    }

    pub fn branch_service(&self) -> BranchService {
        BranchService::new(
            BranchRepository::new(self.pool.clone()),
            CompanyRepository::new(self.pool.clone()),
            InventoryRepository::new(self.pool.clone()),
            self.pool.clone(),
        )
    }

    pub fn inventory_service(&self) -> InventoryService {
        InventoryService::new(
            InventoryRepository::new(self.pool.clone()),
            ItemGroupRepository::new(self.pool.clone()),
            BranchRepository::new(self.pool.clone()),
            self.pool.clone(),
        )
    }

    pub fn transfer_service(&self) -> TransferService {
        TransferService::new(
            InventoryRepository::new(self.pool.clone()),
            BranchRepository::new(self.pool.clone()),
            self.pool.clone(),
        )
    }

    pub fn session_service(&self) -> SessionService {
        SessionService::new(
            CompanyRepository::new(self.pool.clone()),
            BranchRepository::new(self.pool.clone()),
            UserRepository::new(self.pool.clone()),
            self.branch_service(),
            self.pool.clone(),
        )
    }

    pub async fn company(&self) -> Company {
        CompanyRepository::new(self.pool.clone())
            .find_by_id(&self.pool, self.company.id)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn add_branch(&self, name: &str) -> Branch {
        let fields = BranchFields {
            name,
            address: None,
            phone: None,
            email: None,
            status: BranchStatus::Active,
        };
        self.branch_service().create_branch(self.company.id, &fields).await.unwrap()
    }

    pub async fn add_item(&self, branch_id: Uuid, code: &str, stock: Decimal) -> Item {
        let new_item = NewItem {
            branch_id,
            group_id: None,
            name: format!("Item {}", code),
            code: code.into(),
            description: None,
            price: Decimal::new(990, 2),
            stock_quantity: stock,
        };
        self.inventory_service()
            .create_item(self.company.id, self.owner.id, &new_item)
            .await
            .unwrap()
    }

    /// Novo membro com um cargo padrão, vinculado só às filiais informadas.
    pub async fn add_member(&self, email: &str, role_type: RoleType, branch_ids: &[Uuid]) -> User {
        let user = UserRepository::new(self.pool.clone())
            .create_user(&self.pool, email, "Ana", "Caixa", None)
            .await
            .unwrap();
        let role = RbacRepository::new(self.pool.clone())
            .find_default_role(&self.pool, role_type)
            .await
            .unwrap()
            .unwrap();

        CompanyRepository::new(self.pool.clone())
            .add_member(&self.pool, self.company.id, user.id, role.id)
            .await
            .unwrap();
        BranchRepository::new(self.pool.clone())
            .add_user_branches(&self.pool, user.id, self.company.id, branch_ids)
            .await
            .unwrap();
        user
    }
}
