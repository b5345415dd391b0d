use async_trait::async_trait;
use thiserror::Error;

use bakehouse_core::clients::SearchMode;
use bakehouse_core::domain::customer::{Customer, CustomerId, CustomerPatch, CustomerStats};
use bakehouse_core::domain::order::{Order, OrderId};

pub mod customer;
pub mod memory;
pub mod order;

pub use customer::SqlCustomerRepository;
pub use memory::{InMemoryCustomerRepository, InMemoryOrderRepository};
pub use order::SqlOrderRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Maps unique-constraint violations to `Conflict`, everything else to
    /// `Database`.
    pub fn from_write(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &error {
            if db_error.is_unique_violation() {
                return Self::Conflict(db_error.message().to_string());
            }
        }
        Self::Database(error)
    }
}

/// Storage primitives the client directory needs. Single-row lookups return
/// at most one record even if duplicates exist (oldest first).
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError>;

    /// Case-insensitive email equality.
    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, RepositoryError>;

    /// Exact phone string equality.
    async fn find_by_phone(&self, phone: &str) -> Result<Option<Customer>, RepositoryError>;

    /// Equality on the digit-only phone projection.
    async fn find_by_phone_digits(&self, digits: &str)
        -> Result<Option<Customer>, RepositoryError>;

    async fn search(&self, mode: &SearchMode) -> Result<Vec<Customer>, RepositoryError>;

    /// Page of customers ordered by name.
    async fn list(&self, offset: u32, limit: u32) -> Result<Vec<Customer>, RepositoryError>;

    async fn count(&self) -> Result<u64, RepositoryError>;

    async fn list_ids(&self) -> Result<Vec<CustomerId>, RepositoryError>;

    async fn insert(&self, customer: Customer) -> Result<Customer, RepositoryError>;

    /// Writes only the patch fields whose column is still empty and returns
    /// the updated row, `None` when the id is unknown.
    async fn apply_patch(
        &self,
        id: &CustomerId,
        patch: &CustomerPatch,
    ) -> Result<Option<Customer>, RepositoryError>;

    /// Overwrites name, notes and contact columns from `customer`.
    async fn save_profile(&self, customer: &Customer) -> Result<Option<Customer>, RepositoryError>;

    /// Replaces the four aggregate columns in one statement.
    async fn update_stats(
        &self,
        id: &CustomerId,
        stats: &CustomerStats,
    ) -> Result<Option<Customer>, RepositoryError>;

    async fn delete(&self, id: &CustomerId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Full order history of a customer, newest first.
    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Order>, RepositoryError>;

    async fn has_any_for_customer(&self, customer_id: &CustomerId)
        -> Result<bool, RepositoryError>;

    async fn insert(&self, order: Order) -> Result<Order, RepositoryError>;

    async fn delete(&self, id: &OrderId) -> Result<bool, RepositoryError>;
}
