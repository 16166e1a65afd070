// mini_oms/src/workflow/payment.rs

use super::numbers_exhausted;
use crate::audit::{self, AuditAction, ORDER_ENTITY, PAYMENT_ENTITY};
use crate::config::OmsConfig;
use crate::error::{OmsError, OmsResult};
use crate::models::{Actor, OrderStatus, Payment, PaymentMethod, PaymentStatus};
use crate::numbering::{NumberGenerator, PAYMENT_NUMBER_PREFIX};
use crate::store::{constraints, Store, StoreTx};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{event, instrument, Level};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentRequest {
  pub order_id: Uuid,
  /// One of `bank_transfer`, `e-wallet`, `credit_card`.
  pub method: String,
  #[serde(default)]
  pub proof_reference: Option<String>,
  #[serde(default)]
  pub notes: String,
}

impl CreatePaymentRequest {
  pub fn new(order_id: Uuid, method: impl Into<String>) -> Self {
    Self {
      order_id,
      method: method.into(),
      proof_reference: None,
      notes: String::new(),
    }
  }

  pub fn with_proof(mut self, proof_reference: impl Into<String>) -> Self {
    self.proof_reference = Some(proof_reference.into());
    self
  }

  pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
    self.notes = notes.into();
    self
  }
}

#[derive(Clone)]
pub struct PaymentWorkflow<S: Store> {
  store: S,
  config: Arc<OmsConfig>,
  numbers: Arc<dyn NumberGenerator>,
}

impl<S: Store> PaymentWorkflow<S> {
  pub fn new(store: S, config: Arc<OmsConfig>, numbers: Arc<dyn NumberGenerator>) -> Self {
    Self { store, config, numbers }
  }

  /// Records a pending payment for the order's current total. The order row
  /// is locked for the duration so two attempts for one order serialize.
  #[instrument(
    name = "PaymentWorkflow::create_payment",
    skip_all,
    fields(order_id = %request.order_id, actor_id = %actor.id, method = %request.method),
    err(Display)
  )]
  pub async fn create_payment(&self, actor: Actor, request: CreatePaymentRequest) -> OmsResult<Payment> {
    let mut tx = self.store.begin().await?;
    let order = tx
      .lock_order(request.order_id)
      .await?
      .ok_or_else(|| OmsError::not_found(ORDER_ENTITY, request.order_id))?;

    if !actor.may_act_on(order.owner_id) {
      return Err(OmsError::Unauthorized {
        actor_id: actor.id,
        order_id: order.id,
      });
    }

    if let Some(existing) = tx.live_payment_for_order(order.id).await? {
      event!(
        Level::WARN,
        payment_id = %existing.id,
        status = %existing.status,
        "Payment refused: order already has a live payment."
      );
      return Err(OmsError::PaymentAlreadyExists {
        order_id: order.id,
        payment_id: existing.id,
      });
    }

    if !order.accepts_payment() {
      return Err(OmsError::InvalidTransition {
        entity: ORDER_ENTITY,
        id: order.id,
        status: order.status.to_string(),
        action: "pay for",
      });
    }

    let method = PaymentMethod::parse(&request.method)
      .ok_or_else(|| OmsError::validation(format!("invalid payment method '{}'", request.method)))?;

    let mut payment = Payment::new(
      &order,
      self.numbers.generate(PAYMENT_NUMBER_PREFIX, Utc::now()),
      method,
      request.proof_reference,
      request.notes,
    );
    self.insert_with_fresh_number(&mut tx, &mut payment).await?;

    audit::append(
      &mut tx,
      actor.id,
      AuditAction::PaymentCreated,
      payment.id,
      format!("Payment {} created via {}", payment.payment_number, method.as_str()),
    )
    .await?;

    tx.commit().await?;
    event!(
      Level::INFO,
      payment_id = %payment.id,
      payment_number = %payment.payment_number,
      amount = %payment.amount,
      "Payment created."
    );
    Ok(payment)
  }

  async fn insert_with_fresh_number(&self, tx: &mut S::Tx, payment: &mut Payment) -> OmsResult<()> {
    let attempts = self.config.number_generation_attempts.max(1);
    let mut attempt = 1;
    loop {
      match tx.insert_payment(payment).await {
        Ok(()) => return Ok(()),
        Err(err) if err.is_unique_violation(constraints::PAYMENT_NUMBER) => {
          event!(
            Level::WARN,
            payment_number = %payment.payment_number,
            attempt,
            "Payment number already taken."
          );
          if attempt >= attempts {
            return Err(numbers_exhausted("payment", attempts, err));
          }
          attempt += 1;
          payment.payment_number = self.numbers.generate(PAYMENT_NUMBER_PREFIX, Utc::now());
        }
        // Lost a race with a concurrent attempt for the same order.
        Err(err) if err.is_unique_violation(constraints::LIVE_PAYMENT) => {
          return Err(OmsError::PaymentAlreadyExists {
            order_id: payment.order_id,
            payment_id: payment.id,
          });
        }
        Err(err) => return Err(err.into()),
      }
    }
  }

  /// Confirms a pending payment and moves its order to `processing`, both in
  /// one transaction.
  #[instrument(
    name = "PaymentWorkflow::verify_payment",
    skip_all,
    fields(payment_id = %payment_id, admin_id = %admin_id),
    err(Display)
  )]
  pub async fn verify_payment(&self, payment_id: Uuid, admin_id: Uuid) -> OmsResult<Payment> {
    let mut tx = self.store.begin().await?;
    let mut payment = tx
      .lock_payment(payment_id)
      .await?
      .ok_or_else(|| OmsError::not_found(PAYMENT_ENTITY, payment_id))?;

    match payment.status {
      PaymentStatus::Pending => {}
      PaymentStatus::Success => {
        event!(Level::WARN, "Verification refused: payment already verified.");
        return Err(OmsError::PaymentAlreadyVerified { payment_id });
      }
      PaymentStatus::Failed => {
        return Err(OmsError::InvalidTransition {
          entity: PAYMENT_ENTITY,
          id: payment_id,
          status: payment.status.to_string(),
          action: "verify",
        });
      }
    }

    let order = tx
      .lock_order(payment.order_id)
      .await?
      .ok_or_else(|| OmsError::not_found(ORDER_ENTITY, payment.order_id))?;
    if order.status != OrderStatus::Created {
      event!(Level::WARN, order_status = %order.status, "Verification refused: order no longer awaits payment.");
      return Err(OmsError::InvalidTransition {
        entity: ORDER_ENTITY,
        id: order.id,
        status: order.status.to_string(),
        action: "mark as paid",
      });
    }

    let now = Utc::now();
    payment.mark_verified(admin_id, now);
    tx.update_payment(&payment).await?;
    tx.update_order_status(order.id, OrderStatus::Processing, now).await?;
    audit::append(&mut tx, admin_id, AuditAction::PaymentVerified, payment.id, "Payment verified by admin").await?;

    tx.commit().await?;
    event!(Level::INFO, order_id = %order.id, "Payment verified; order is processing.");
    Ok(payment)
  }

  /// Marks a pending payment as failed. The order stays `created` and may
  /// receive a new payment attempt.
  #[instrument(
    name = "PaymentWorkflow::reject_payment",
    skip_all,
    fields(payment_id = %payment_id, admin_id = %admin_id),
    err(Display)
  )]
  pub async fn reject_payment(&self, payment_id: Uuid, admin_id: Uuid, reason: &str) -> OmsResult<Payment> {
    let mut tx = self.store.begin().await?;
    let mut payment = tx
      .lock_payment(payment_id)
      .await?
      .ok_or_else(|| OmsError::not_found(PAYMENT_ENTITY, payment_id))?;

    match payment.status {
      PaymentStatus::Pending => {}
      PaymentStatus::Success => return Err(OmsError::PaymentAlreadyVerified { payment_id }),
      PaymentStatus::Failed => {
        return Err(OmsError::InvalidTransition {
          entity: PAYMENT_ENTITY,
          id: payment_id,
          status: payment.status.to_string(),
          action: "reject",
        });
      }
    }

    payment.mark_failed(admin_id, reason, Utc::now());
    tx.update_payment(&payment).await?;
    audit::append(
      &mut tx,
      admin_id,
      AuditAction::PaymentRejected,
      payment.id,
      format!("Payment rejected: {}", reason),
    )
    .await?;

    tx.commit().await?;
    event!(Level::INFO, order_id = %payment.order_id, "Payment rejected.");
    Ok(payment)
  }

  /// Most recent payment attempt for the order, if any.
  #[instrument(name = "PaymentWorkflow::payment_for_order", skip_all, fields(order_id = %order_id), err(Display))]
  pub async fn payment_for_order(&self, order_id: Uuid) -> OmsResult<Option<Payment>> {
    Ok(self.store.find_payment_by_order(order_id).await?)
  }
}
