pub mod auth;
pub mod branch;
pub mod company;
pub mod inventory;
pub mod role;
pub mod user;
