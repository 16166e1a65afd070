// mini_oms/src/store/mod.rs

//! The storage collaborator the workflows are written against.
//!
//! A `StoreTx` is a scoped resource: every mutation goes through one, and
//! dropping it without calling `commit` discards everything it staged and
//! releases every row lock it holds. That holds for early returns as much as
//! for a panic unwinding through the owner.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::config::RevenueStatusSet;
use crate::models::{AuditLogEntry, Order, OrderStats, OrderStatus, Payment, Product};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Names of the uniqueness rules every store enforces.
pub mod constraints {
  pub const ORDER_NUMBER: &str = "orders_order_number_key";
  pub const PAYMENT_NUMBER: &str = "payments_payment_number_key";
  /// At most one `pending`/`success` payment per order.
  pub const LIVE_PAYMENT: &str = "payments_one_live_per_order";
  pub const PRODUCT_STOCK_NON_NEGATIVE: &str = "products_stock_check";
  pub const PRODUCT_PKEY: &str = "products_pkey";
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("Unique constraint violated: {constraint}")]
  UniqueViolation { constraint: String },

  #[error("Check constraint violated: {constraint}")]
  CheckViolation { constraint: String },

  /// The transaction was chosen to abort so that a lock cycle can resolve.
  #[error("Deadlock detected while waiting for {resource}")]
  Deadlock { resource: String },

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),

  #[error("Undecodable value '{value}' in column {column}")]
  Decode { column: &'static str, value: String },
}

impl StoreError {
  pub fn unique(constraint: &str) -> Self {
    StoreError::UniqueViolation {
      constraint: constraint.to_string(),
    }
  }

  pub fn is_unique_violation(&self, constraint: &str) -> bool {
    matches!(self, StoreError::UniqueViolation { constraint: c } if c == constraint)
  }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
  type Tx: StoreTx;

  async fn begin(&self) -> StoreResult<Self::Tx>;

  /// Order with its items and latest payment. Soft-deleted orders are absent.
  async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>>;
  async fn list_orders(&self) -> StoreResult<Vec<Order>>;
  async fn list_orders_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Order>>;

  /// Unlocked read; not authoritative for stock admission.
  async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>>;
  async fn insert_product(&self, product: &Product) -> StoreResult<()>;

  async fn find_payment(&self, id: Uuid) -> StoreResult<Option<Payment>>;
  async fn find_payment_by_order(&self, order_id: Uuid) -> StoreResult<Option<Payment>>;

  async fn order_stats(&self, revenue_statuses: &RevenueStatusSet) -> StoreResult<OrderStats>;
  async fn audit_entries_for(&self, entity_id: Uuid) -> StoreResult<Vec<AuditLogEntry>>;
}

#[async_trait]
pub trait StoreTx: Send {
  /// Takes the exclusive row lock and holds it until the transaction ends.
  /// Missing and soft-deleted products both yield `None`.
  async fn lock_product(&mut self, id: Uuid) -> StoreResult<Option<Product>>;
  async fn update_product_stock(&mut self, id: Uuid, stock: i32) -> StoreResult<()>;

  /// Locks the order row and loads its items (not its payment).
  async fn lock_order(&mut self, id: Uuid) -> StoreResult<Option<Order>>;
  /// Inserts the order and its items. A taken order number is reported as
  /// `UniqueViolation(ORDER_NUMBER)` and leaves the transaction usable.
  async fn insert_order(&mut self, order: &Order) -> StoreResult<()>;
  async fn update_order_status(&mut self, id: Uuid, status: OrderStatus, at: DateTime<Utc>) -> StoreResult<()>;

  async fn lock_payment(&mut self, id: Uuid) -> StoreResult<Option<Payment>>;
  async fn live_payment_for_order(&mut self, order_id: Uuid) -> StoreResult<Option<Payment>>;
  /// A taken payment number or a second live payment for the same order is
  /// reported as the matching `UniqueViolation` and leaves the transaction
  /// usable.
  async fn insert_payment(&mut self, payment: &Payment) -> StoreResult<()>;
  async fn update_payment(&mut self, payment: &Payment) -> StoreResult<()>;

  async fn append_audit(&mut self, entry: &AuditLogEntry) -> StoreResult<()>;

  async fn commit(self) -> StoreResult<()>;
  async fn rollback(self) -> StoreResult<()>;
}
