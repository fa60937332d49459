pub mod auth;
pub mod branch_service;
pub mod company_service;
pub mod inventory_service;
pub mod rbac_service;
pub mod session_service;
pub mod transfer_service;
pub mod user_service;

#[cfg(test)]
pub(crate) mod test_support;
