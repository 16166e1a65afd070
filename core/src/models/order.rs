// mini_oms/src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{OrderItem, Payment, Product};
use crate::error::{OmsError, OmsResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Created,
  /// Paid but not yet shipped.
  Processing,
  Completed,
  Canceled,
}

impl OrderStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Created => "created",
      OrderStatus::Processing => "processing",
      OrderStatus::Completed => "completed",
      OrderStatus::Canceled => "canceled",
    }
  }

  /// Parses a stored status. Historical rows may still carry `paid` or
  /// `success`; both meant "paid, not shipped" and read back as `Processing`.
  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "created" => Some(OrderStatus::Created),
      "processing" | "paid" | "success" => Some(OrderStatus::Processing),
      "completed" => Some(OrderStatus::Completed),
      "canceled" => Some(OrderStatus::Canceled),
      _ => None,
    }
  }
}

impl std::fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
  pub id: Uuid,
  pub owner_id: Uuid,
  pub order_number: String,
  pub total_amount: Decimal,
  pub status: OrderStatus,
  pub notes: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  #[serde(skip)]
  pub deleted_at: Option<DateTime<Utc>>,

  pub items: Vec<OrderItem>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payment: Option<Payment>,
}

impl Order {
  /// Only orders that have not been paid yet may be canceled.
  pub fn can_be_canceled(&self) -> bool {
    self.status == OrderStatus::Created
  }

  pub fn can_be_completed(&self) -> bool {
    self.status == OrderStatus::Processing
  }

  pub fn accepts_payment(&self) -> bool {
    self.status == OrderStatus::Created
  }

  pub fn items_total(&self) -> Decimal {
    self.items.iter().map(|item| item.subtotal).sum()
  }
}

/// Accumulates item snapshots for an order that does not exist yet. The
/// running total is only ever the sum of the snapshots pushed into it.
#[derive(Debug, Clone)]
pub struct OrderDraft {
  id: Uuid,
  owner_id: Uuid,
  notes: String,
  items: Vec<OrderItem>,
  total: Decimal,
  started_at: DateTime<Utc>,
}

impl OrderDraft {
  pub fn new(owner_id: Uuid, notes: impl Into<String>) -> Self {
    Self {
      id: Uuid::new_v4(),
      owner_id,
      notes: notes.into(),
      items: Vec::new(),
      total: Decimal::ZERO,
      started_at: Utc::now(),
    }
  }

  /// Snapshots `product` as it is right now and adds the line's subtotal.
  /// A subtotal or running total that overflows `Decimal` is a validation
  /// error and leaves the draft unchanged.
  pub fn push_line(&mut self, product: &Product, quantity: i32) -> OmsResult<&OrderItem> {
    let too_large = || {
      OmsError::validation(format!(
        "amount for {} x {} (price {}) is too large",
        quantity, product.name, product.price
      ))
    };
    let item = OrderItem::snapshot(self.id, product, quantity, self.started_at).ok_or_else(too_large)?;
    self.total = self.total.checked_add(item.subtotal).ok_or_else(too_large)?;
    self.items.push(item);
    Ok(&self.items[self.items.len() - 1])
  }

  pub fn finish(self, order_number: String) -> Order {
    Order {
      id: self.id,
      owner_id: self.owner_id,
      order_number,
      total_amount: self.total,
      status: OrderStatus::Created,
      notes: self.notes,
      created_at: self.started_at,
      updated_at: self.started_at,
      deleted_at: None,
      items: self.items,
      payment: None,
    }
  }
}

/// Dashboard aggregates returned by `OrderWorkflow::get_stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderStats {
  pub total_orders: i64,
  pub total_revenue: Decimal,
  pub pending_payments: i64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn draft_total_is_the_sum_of_its_lines() {
    let rice = Product::new("Beras", Decimal::new(100_000, 0), 10);
    let oil = Product::new("Minyak", Decimal::new(25_500, 0), 10);
    let mut draft = OrderDraft::new(Uuid::new_v4(), "");
    draft.push_line(&rice, 3).unwrap();
    draft.push_line(&oil, 2).unwrap();
    let order = draft.finish("ORD-TEST".into());

    assert_eq!(order.total_amount, Decimal::new(351_000, 0));
    assert_eq!(order.total_amount, order.items_total());
    assert!(order.items.iter().all(|item| item.order_id == order.id));
    assert_eq!(order.status, OrderStatus::Created);
  }

  #[test]
  fn overflowing_total_is_a_validation_error() {
    let gold = Product::new("Emas", Decimal::MAX / Decimal::from(2), 10);
    let mut draft = OrderDraft::new(Uuid::new_v4(), "");
    draft.push_line(&gold, 1).unwrap();
    let err = draft.push_line(&gold, 2).unwrap_err();
    assert!(matches!(err, OmsError::Validation { .. }));
    let order = draft.finish("ORD-BIG".into());
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.total_amount, order.items_total());
  }

  #[test]
  fn legacy_statuses_read_as_processing() {
    assert_eq!(OrderStatus::parse("paid"), Some(OrderStatus::Processing));
    assert_eq!(OrderStatus::parse("success"), Some(OrderStatus::Processing));
    assert_eq!(OrderStatus::parse("shipped"), None);
  }

  #[test]
  fn only_created_orders_are_cancelable() {
    let mut order = OrderDraft::new(Uuid::new_v4(), "").finish("ORD-X".into());
    assert!(order.can_be_canceled());
    for status in [OrderStatus::Processing, OrderStatus::Completed, OrderStatus::Canceled] {
      order.status = status;
      assert!(!order.can_be_canceled(), "{status} must not be cancelable");
    }
  }
}
