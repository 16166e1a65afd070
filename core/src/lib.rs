// src/lib.rs

//! Mini OMS: transactional order, inventory and payment workflows.
//!
//! The core exposes two workflows over a pluggable transactional store:
//!  - `OrderWorkflow`: create (reserving stock per line under row locks),
//!    cancel (restoring stock), complete, stats and owner-scoped reads.
//!  - `PaymentWorkflow`: create, verify (payment and order advance
//!    together), reject, and a latest-payment read.
//!
//! Every mutation appends its audit entry inside the same transaction, and a
//! transaction that is not explicitly committed is rolled back when dropped.

pub mod audit;
pub mod config;
pub mod error;
pub mod inventory;
pub mod models;
pub mod numbering;
pub mod state;
pub mod store;
pub mod workflow;

// --- Re-exports for the Public API ---

pub use crate::config::{OmsConfig, RevenueStatusSet};
pub use crate::error::{ErrorKind, OmsError, OmsResult};
pub use crate::models::{
  Actor, AuditLogEntry, Order, OrderItem, OrderStats, OrderStatus, Payment, PaymentMethod, PaymentStatus, Product,
  Role,
};
pub use crate::numbering::{NumberGenerator, RandomSuffixGenerator};
pub use crate::state::Oms;
pub use crate::store::{MemoryStore, PgStore, Store, StoreError, StoreTx};
pub use crate::workflow::{CreateOrderRequest, CreatePaymentRequest, OrderLine, OrderWorkflow, PaymentWorkflow};
