// mini_oms/src/audit.rs

//! Audit trail writes.
//!
//! An entry can only be appended through an open transaction, so it commits
//! or rolls back together with the mutation it describes.

use crate::error::OmsResult;
use crate::models::AuditLogEntry;
use crate::store::StoreTx;
use tracing::{event, Level};
use uuid::Uuid;

pub const ORDER_ENTITY: &str = "Order";
pub const PAYMENT_ENTITY: &str = "Payment";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
  OrderCreated,
  OrderCanceled,
  OrderCompleted,
  PaymentCreated,
  PaymentVerified,
  PaymentRejected,
}

impl AuditAction {
  pub fn as_str(&self) -> &'static str {
    match self {
      AuditAction::OrderCreated => "ORDER_CREATED",
      AuditAction::OrderCanceled => "ORDER_CANCELED",
      AuditAction::OrderCompleted => "ORDER_COMPLETED",
      AuditAction::PaymentCreated => "PAYMENT_CREATED",
      AuditAction::PaymentVerified => "PAYMENT_VERIFIED",
      AuditAction::PaymentRejected => "PAYMENT_REJECTED",
    }
  }

  pub fn entity_name(&self) -> &'static str {
    match self {
      AuditAction::OrderCreated | AuditAction::OrderCanceled | AuditAction::OrderCompleted => ORDER_ENTITY,
      AuditAction::PaymentCreated | AuditAction::PaymentVerified | AuditAction::PaymentRejected => PAYMENT_ENTITY,
    }
  }
}

impl std::fmt::Display for AuditAction {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Appends one entry to the trail inside `tx`.
pub async fn append<T>(
  tx: &mut T,
  actor_id: Uuid,
  action: AuditAction,
  entity_id: Uuid,
  details: impl Into<String>,
) -> OmsResult<AuditLogEntry>
where
  T: StoreTx + ?Sized,
{
  let entry = AuditLogEntry::new(actor_id, action.as_str(), action.entity_name(), entity_id, details);
  tx.append_audit(&entry).await?;
  event!(
    Level::DEBUG,
    action = %action,
    entity_id = %entity_id,
    actor_id = %actor_id,
    "Audit entry staged."
  );
  Ok(entry)
}
