// mini_oms/src/workflow/mod.rs

//! The business operations. Each mutating operation runs inside exactly one
//! store transaction that is committed as its last step; every other exit
//! drops the transaction and so rolls it back.

pub mod order;
pub mod payment;

pub use order::{CreateOrderRequest, OrderLine, OrderWorkflow};
pub use payment::{CreatePaymentRequest, PaymentWorkflow};

use crate::error::OmsError;
use crate::store::StoreError;

/// Error reported once every generated business number has collided.
fn numbers_exhausted(what: &str, attempts: u32, last: StoreError) -> OmsError {
  OmsError::infrastructure(
    format!("generating a unique {} number ({} attempts)", what, attempts),
    last,
  )
}
