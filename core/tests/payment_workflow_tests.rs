// tests/payment_workflow_tests.rs
mod common;

use common::*;
use mini_oms::models::payment::NO_PROOF_PLACEHOLDER;
use mini_oms::{
  Actor, CreateOrderRequest, CreatePaymentRequest, ErrorKind, MemoryStore, Oms, OmsError, Order, OrderLine,
  OrderStatus, PaymentMethod, PaymentStatus, Store,
};
use uuid::Uuid;

struct Fixture {
  oms: Oms<MemoryStore>,
  owner: Actor,
  admin: Actor,
  order: Order,
}

async fn fixture() -> Fixture {
  let oms = memory_oms();
  let product = seed_product(&oms.store, "Beras 5kg", 100_000, 5).await;
  let owner = Actor::user(Uuid::new_v4());
  let order = oms
    .orders
    .create_order(CreateOrderRequest::new(owner.id, vec![OrderLine::new(product.id, 3)]))
    .await
    .unwrap();
  Fixture {
    oms,
    owner,
    admin: Actor::admin(Uuid::new_v4()),
    order,
  }
}

#[tokio::test]
async fn test_create_and_verify_advances_order() {
  let Fixture { oms, owner, admin, order } = fixture().await;

  let payment = oms
    .payments
    .create_payment(owner, CreatePaymentRequest::new(order.id, "bank_transfer").with_proof("trf-0042.jpg"))
    .await
    .unwrap();
  assert_eq!(payment.status, PaymentStatus::Pending);
  assert_eq!(payment.method, PaymentMethod::BankTransfer);
  assert_eq!(payment.amount, order.total_amount);
  assert_eq!(payment.proof_reference, "trf-0042.jpg");
  assert!(payment.payment_number.starts_with("PAY-"));

  let verified = oms.payments.verify_payment(payment.id, admin.id).await.unwrap();
  assert_eq!(verified.status, PaymentStatus::Success);
  assert_eq!(verified.verified_by, Some(admin.id));
  assert!(verified.verified_at.is_some());

  let stored = oms.store.find_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.status, OrderStatus::Processing);
  assert_eq!(stored.payment.as_ref().map(|p| p.id), Some(payment.id));

  let actions: Vec<String> = oms
    .store
    .audit_entries_for(payment.id)
    .await
    .unwrap()
    .into_iter()
    .map(|e| e.action)
    .collect();
  assert_eq!(actions, vec!["PAYMENT_CREATED", "PAYMENT_VERIFIED"]);
}

#[tokio::test]
async fn test_second_live_payment_is_rejected() {
  let Fixture { oms, owner, order, .. } = fixture().await;

  let first = oms
    .payments
    .create_payment(owner, CreatePaymentRequest::new(order.id, "bank_transfer"))
    .await
    .unwrap();
  let err = oms
    .payments
    .create_payment(owner, CreatePaymentRequest::new(order.id, "e-wallet"))
    .await
    .unwrap_err();

  assert!(matches!(err, OmsError::PaymentAlreadyExists { payment_id, .. } if payment_id == first.id));
  assert_eq!(err.kind(), ErrorKind::Conflict);
  assert_eq!(oms.store.payments_for_order(order.id).len(), 1);
}

#[tokio::test]
async fn test_verifying_twice_fails_the_second_time() {
  let Fixture { oms, owner, admin, order } = fixture().await;
  let payment = oms
    .payments
    .create_payment(owner, CreatePaymentRequest::new(order.id, "credit_card"))
    .await
    .unwrap();

  oms.payments.verify_payment(payment.id, admin.id).await.unwrap();
  let err = oms.payments.verify_payment(payment.id, admin.id).await.unwrap_err();
  assert!(matches!(err, OmsError::PaymentAlreadyVerified { .. }));
  assert!(err.is_conflict());

  let verified_entries = oms
    .store
    .audit_entries_for(payment.id)
    .await
    .unwrap()
    .into_iter()
    .filter(|e| e.action == "PAYMENT_VERIFIED")
    .count();
  assert_eq!(verified_entries, 1);
  assert_eq!(
    oms.store.find_order(order.id).await.unwrap().unwrap().status,
    OrderStatus::Processing
  );
}

#[tokio::test]
async fn test_a_paid_order_accepts_no_new_payment() {
  let Fixture { oms, owner, admin, order } = fixture().await;
  let payment = oms
    .payments
    .create_payment(owner, CreatePaymentRequest::new(order.id, "bank_transfer"))
    .await
    .unwrap();
  oms.payments.verify_payment(payment.id, admin.id).await.unwrap();

  let err = oms
    .payments
    .create_payment(owner, CreatePaymentRequest::new(order.id, "bank_transfer"))
    .await
    .unwrap_err();
  assert!(matches!(err, OmsError::PaymentAlreadyExists { .. }));
}

#[tokio::test]
async fn test_rejected_payment_frees_the_order_for_a_retry() {
  let Fixture { oms, owner, admin, order } = fixture().await;
  let first = oms
    .payments
    .create_payment(owner, CreatePaymentRequest::new(order.id, "bank_transfer"))
    .await
    .unwrap();

  let rejected = oms
    .payments
    .reject_payment(first.id, admin.id, "transfer not received")
    .await
    .unwrap();
  assert_eq!(rejected.status, PaymentStatus::Failed);
  assert_eq!(rejected.notes, "transfer not received");
  assert_eq!(
    oms.store.find_order(order.id).await.unwrap().unwrap().status,
    OrderStatus::Created
  );

  let err = oms.payments.verify_payment(first.id, admin.id).await.unwrap_err();
  assert!(matches!(err, OmsError::InvalidTransition { action: "verify", .. }));

  let retry = oms
    .payments
    .create_payment(owner, CreatePaymentRequest::new(order.id, "e-wallet"))
    .await
    .unwrap();
  assert_ne!(retry.id, first.id);
  assert_eq!(oms.store.payments_for_order(order.id).len(), 2);

  let latest = oms.payments.payment_for_order(order.id).await.unwrap().unwrap();
  assert_eq!(latest.id, retry.id);
}

#[tokio::test]
async fn test_invalid_method_is_a_validation_error() {
  let Fixture { oms, owner, order, .. } = fixture().await;
  let err = oms
    .payments
    .create_payment(owner, CreatePaymentRequest::new(order.id, "cash"))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert!(oms.store.payments_for_order(order.id).is_empty());
}

#[tokio::test]
async fn test_missing_proof_gets_placeholder() {
  let Fixture { oms, owner, order, .. } = fixture().await;
  let payment = oms
    .payments
    .create_payment(owner, CreatePaymentRequest::new(order.id, "e-wallet").with_proof("   "))
    .await
    .unwrap();
  assert_eq!(payment.proof_reference, NO_PROOF_PLACEHOLDER);
}

#[tokio::test]
async fn test_payment_on_unknown_or_canceled_order() {
  let Fixture { oms, owner, order, .. } = fixture().await;

  let err = oms
    .payments
    .create_payment(owner, CreatePaymentRequest::new(Uuid::new_v4(), "bank_transfer"))
    .await
    .unwrap_err();
  assert!(matches!(err, OmsError::NotFound { entity: "Order", .. }));

  oms.orders.cancel_order(order.id, owner).await.unwrap();
  let err = oms
    .payments
    .create_payment(owner, CreatePaymentRequest::new(order.id, "bank_transfer"))
    .await
    .unwrap_err();
  assert!(matches!(err, OmsError::InvalidTransition { action: "pay for", .. }));
}

#[tokio::test]
async fn test_only_owner_or_admin_may_pay() {
  let Fixture { oms, admin, order, .. } = fixture().await;
  let err = oms
    .payments
    .create_payment(Actor::user(Uuid::new_v4()), CreatePaymentRequest::new(order.id, "bank_transfer"))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Authorization);

  oms
    .payments
    .create_payment(admin, CreatePaymentRequest::new(order.id, "bank_transfer"))
    .await
    .unwrap();
}

#[tokio::test]
async fn test_verify_refuses_payment_of_a_canceled_order() {
  let Fixture { oms, owner, admin, order } = fixture().await;
  let payment = oms
    .payments
    .create_payment(owner, CreatePaymentRequest::new(order.id, "bank_transfer"))
    .await
    .unwrap();
  oms.orders.cancel_order(order.id, owner).await.unwrap();

  let err = oms.payments.verify_payment(payment.id, admin.id).await.unwrap_err();
  assert!(matches!(err, OmsError::InvalidTransition { entity: "Order", .. }));

  // Nothing moved: payment still pending, order still canceled.
  let stored = oms.store.find_payment(payment.id).await.unwrap().unwrap();
  assert_eq!(stored.status, PaymentStatus::Pending);
  assert_eq!(
    oms.store.find_order(order.id).await.unwrap().unwrap().status,
    OrderStatus::Canceled
  );
}

#[tokio::test]
async fn test_verify_unknown_payment_is_not_found() {
  let Fixture { oms, admin, .. } = fixture().await;
  let err = oms.payments.verify_payment(Uuid::new_v4(), admin.id).await.unwrap_err();
  assert!(matches!(err, OmsError::NotFound { entity: "Payment", .. }));
  assert!(oms.payments.payment_for_order(Uuid::new_v4()).await.unwrap().is_none());
}
