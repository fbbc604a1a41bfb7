pub mod audit;
pub mod auth;
pub mod products;
pub mod rbac;
pub mod tenancy;
