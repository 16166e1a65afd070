// mini_oms/src/models/mod.rs

//! Entities the core reads and writes. Every entity is fully populated by
//! its own constructor (ids, defaults, derived fields) before it is handed
//! to a store.

pub mod actor;
pub mod audit_log;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod product;

pub use actor::{Actor, Role};
pub use audit_log::AuditLogEntry;
pub use order::{Order, OrderDraft, OrderStats, OrderStatus};
pub use order_item::OrderItem;
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use product::Product;
