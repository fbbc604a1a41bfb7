pub mod audit;
pub mod auth;
pub mod permission;
pub mod tenant_registry;
pub mod token;
