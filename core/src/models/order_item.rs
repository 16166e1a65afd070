// mini_oms/src/models/order_item.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::Product;

/// One line of an order. `product_name` and `product_price` are copied from
/// the product when the line is created and never resynchronized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub product_name: String,
  pub product_price: Decimal,
  pub quantity: i32,
  pub subtotal: Decimal,
  pub created_at: DateTime<Utc>,
}

impl OrderItem {
  /// `None` when the subtotal does not fit in a `Decimal`.
  pub fn snapshot(order_id: Uuid, product: &Product, quantity: i32, now: DateTime<Utc>) -> Option<Self> {
    let subtotal = product.price.checked_mul(Decimal::from(quantity))?;
    Some(Self {
      id: Uuid::new_v4(),
      order_id,
      product_id: product.id,
      product_name: product.name.clone(),
      product_price: product.price,
      quantity,
      subtotal,
      created_at: now,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn snapshot_copies_name_and_price_and_derives_subtotal() {
    let product = Product::new("Beras 5kg", Decimal::new(100_000, 0), 5);
    let item = OrderItem::snapshot(Uuid::new_v4(), &product, 3, Utc::now()).unwrap();
    assert_eq!(item.product_name, "Beras 5kg");
    assert_eq!(item.product_price, Decimal::new(100_000, 0));
    assert_eq!(item.subtotal, Decimal::new(300_000, 0));
  }

  #[test]
  fn subtotal_keeps_cents() {
    let product = Product::new("Gula", Decimal::new(1_250, 2), 10);
    let item = OrderItem::snapshot(Uuid::new_v4(), &product, 3, Utc::now()).unwrap();
    assert_eq!(item.subtotal, Decimal::new(3_750, 2));
  }

  #[test]
  fn subtotal_overflow_yields_no_snapshot() {
    let product = Product::new("Emas", Decimal::MAX, 1);
    assert!(OrderItem::snapshot(Uuid::new_v4(), &product, 2, Utc::now()).is_none());
  }
}
