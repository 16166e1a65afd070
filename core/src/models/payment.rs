// mini_oms/src/models/payment.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Order;

/// Stored when the payer did not attach any proof.
pub const NO_PROOF_PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
  #[serde(rename = "bank_transfer")]
  BankTransfer,
  #[serde(rename = "e-wallet")]
  EWallet,
  #[serde(rename = "credit_card")]
  CreditCard,
}

impl PaymentMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentMethod::BankTransfer => "bank_transfer",
      PaymentMethod::EWallet => "e-wallet",
      PaymentMethod::CreditCard => "credit_card",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "bank_transfer" => Some(PaymentMethod::BankTransfer),
      "e-wallet" => Some(PaymentMethod::EWallet),
      "credit_card" => Some(PaymentMethod::CreditCard),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Success,
  Failed,
}

impl PaymentStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentStatus::Pending => "pending",
      PaymentStatus::Success => "success",
      PaymentStatus::Failed => "failed",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "pending" => Some(PaymentStatus::Pending),
      "success" | "paid" => Some(PaymentStatus::Success),
      "failed" => Some(PaymentStatus::Failed),
      _ => None,
    }
  }

  /// A live payment blocks any further attempt for the same order.
  pub fn is_live(&self) -> bool {
    matches!(self, PaymentStatus::Pending | PaymentStatus::Success)
  }
}

impl std::fmt::Display for PaymentStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payment {
  pub id: Uuid,
  pub order_id: Uuid,
  pub payment_number: String,
  pub amount: Decimal,
  pub method: PaymentMethod,
  pub status: PaymentStatus,
  pub proof_reference: String,
  pub verified_by: Option<Uuid>,
  pub verified_at: Option<DateTime<Utc>>,
  pub notes: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Payment {
  /// New pending payment for `order`; the amount is the order total at this
  /// instant.
  pub fn new(
    order: &Order,
    payment_number: String,
    method: PaymentMethod,
    proof_reference: Option<String>,
    notes: impl Into<String>,
  ) -> Self {
    let now = Utc::now();
    let proof_reference = proof_reference
      .filter(|proof| !proof.trim().is_empty())
      .unwrap_or_else(|| NO_PROOF_PLACEHOLDER.to_string());
    Self {
      id: Uuid::new_v4(),
      order_id: order.id,
      payment_number,
      amount: order.total_amount,
      method,
      status: PaymentStatus::Pending,
      proof_reference,
      verified_by: None,
      verified_at: None,
      notes: notes.into(),
      created_at: now,
      updated_at: now,
    }
  }

  pub fn mark_verified(&mut self, admin_id: Uuid, at: DateTime<Utc>) {
    self.status = PaymentStatus::Success;
    self.verified_by = Some(admin_id);
    self.verified_at = Some(at);
    self.updated_at = at;
  }

  pub fn mark_failed(&mut self, admin_id: Uuid, reason: impl Into<String>, at: DateTime<Utc>) {
    self.status = PaymentStatus::Failed;
    self.verified_by = Some(admin_id);
    self.verified_at = Some(at);
    self.notes = reason.into();
    self.updated_at = at;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{OrderDraft, Product};

  fn order_worth(amount: i64) -> Order {
    let product = Product::new("Item", Decimal::new(amount, 0), 1);
    let mut draft = OrderDraft::new(Uuid::new_v4(), "");
    draft.push_line(&product, 1).unwrap();
    draft.finish("ORD-1".into())
  }

  #[test]
  fn new_payment_copies_total_and_defaults_proof() {
    let order = order_worth(42_000);
    let payment = Payment::new(&order, "PAY-1".into(), PaymentMethod::EWallet, None, "");
    assert_eq!(payment.amount, Decimal::new(42_000, 0));
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.proof_reference, NO_PROOF_PLACEHOLDER);

    let blank = Payment::new(&order, "PAY-2".into(), PaymentMethod::EWallet, Some("  ".into()), "");
    assert_eq!(blank.proof_reference, NO_PROOF_PLACEHOLDER);
  }

  #[test]
  fn method_names_match_their_wire_spelling() {
    for method in [PaymentMethod::BankTransfer, PaymentMethod::EWallet, PaymentMethod::CreditCard] {
      assert_eq!(PaymentMethod::parse(method.as_str()), Some(method));
    }
    assert_eq!(PaymentMethod::parse("cash"), None);
    assert_eq!(serde_json::to_string(&PaymentMethod::EWallet).unwrap(), "\"e-wallet\"");
    let parsed: PaymentMethod = serde_json::from_str("\"bank_transfer\"").unwrap();
    assert_eq!(parsed, PaymentMethod::BankTransfer);
  }

  #[test]
  fn failed_payments_are_not_live() {
    assert!(PaymentStatus::Pending.is_live());
    assert!(PaymentStatus::Success.is_live());
    assert!(!PaymentStatus::Failed.is_live());
  }
}
