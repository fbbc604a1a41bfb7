pub mod audit_repo;
pub use audit_repo::{AuditRepository, AuditStore};
pub mod directory;
pub use directory::{GlobalDirectory, PgDirectory};
pub mod memory;
pub mod product_repo;
pub use product_repo::ProductRepository;
pub mod store_repo;
pub use store_repo::StoreRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
