pub mod branch_repo;
pub use branch_repo::BranchRepository;
pub mod company_repo;
pub use company_repo::CompanyRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod item_group_repo;
pub use item_group_repo::ItemGroupRepository;
pub mod rbac_repo;
pub use rbac_repo::RbacRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
