pub mod auth;
pub mod branches;
pub mod inventory;
pub mod rbac;
pub mod tenancy;
pub mod users;
pub mod validation;
