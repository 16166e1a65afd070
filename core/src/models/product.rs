// mini_oms/src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
  pub id: Uuid,
  pub category_id: Option<Uuid>,
  pub name: String,
  pub description: String,
  pub price: Decimal,
  pub stock: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  #[serde(skip)]
  pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
  pub fn new(name: impl Into<String>, price: Decimal, stock: i32) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      category_id: None,
      name: name.into(),
      description: String::new(),
      price,
      stock,
      created_at: now,
      updated_at: now,
      deleted_at: None,
    }
  }

  pub fn has_stock_for(&self, quantity: i32) -> bool {
    self.stock >= quantity
  }

  pub fn is_deleted(&self) -> bool {
    self.deleted_at.is_some()
  }
}
