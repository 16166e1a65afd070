// mini_oms/src/workflow/order.rs

use super::numbers_exhausted;
use crate::audit::{self, AuditAction, ORDER_ENTITY};
use crate::config::OmsConfig;
use crate::error::{OmsError, OmsResult};
use crate::inventory;
use crate::models::{Actor, Order, OrderDraft, OrderStats, OrderStatus};
use crate::numbering::{NumberGenerator, ORDER_NUMBER_PREFIX};
use crate::store::{constraints, Store, StoreTx};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{event, instrument, Level};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OrderLine {
  pub product_id: Uuid,
  pub quantity: i32,
}

impl OrderLine {
  pub fn new(product_id: Uuid, quantity: i32) -> Self {
    Self { product_id, quantity }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
  pub owner_id: Uuid,
  pub items: Vec<OrderLine>,
  #[serde(default)]
  pub notes: String,
}

impl CreateOrderRequest {
  pub fn new(owner_id: Uuid, items: Vec<OrderLine>) -> Self {
    Self {
      owner_id,
      items,
      notes: String::new(),
    }
  }

  pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
    self.notes = notes.into();
    self
  }

  fn validate(&self) -> OmsResult<()> {
    if self.items.is_empty() {
      return Err(OmsError::validation("order must contain at least one item"));
    }
    if let Some(line) = self.items.iter().find(|line| line.quantity <= 0) {
      return Err(OmsError::validation(format!(
        "quantity for product {} must be positive, got {}",
        line.product_id, line.quantity
      )));
    }
    Ok(())
  }
}

/// Order placement, cancellation, completion and the read side over orders.
#[derive(Clone)]
pub struct OrderWorkflow<S: Store> {
  store: S,
  config: Arc<OmsConfig>,
  numbers: Arc<dyn NumberGenerator>,
}

impl<S: Store> OrderWorkflow<S> {
  pub fn new(store: S, config: Arc<OmsConfig>, numbers: Arc<dyn NumberGenerator>) -> Self {
    Self { store, config, numbers }
  }

  /// Reserves stock for every line in request order, then persists the
  /// order, its item snapshots and the `ORDER_CREATED` audit entry. Either
  /// everything commits or nothing does.
  #[instrument(
    name = "OrderWorkflow::create_order",
    skip_all,
    fields(owner_id = %request.owner_id, lines = request.items.len()),
    err(Display)
  )]
  pub async fn create_order(&self, request: CreateOrderRequest) -> OmsResult<Order> {
    request.validate()?;

    let mut tx = self.store.begin().await?;
    let mut draft = OrderDraft::new(request.owner_id, request.notes);

    for line in &request.items {
      let product = inventory::reserve(&mut tx, line.product_id, line.quantity).await?;
      let item = draft.push_line(&product, line.quantity)?;
      event!(
        Level::DEBUG,
        product_id = %item.product_id,
        quantity = item.quantity,
        subtotal = %item.subtotal,
        "Line reserved."
      );
    }

    let order = self.insert_with_fresh_number(&mut tx, draft).await?;

    audit::append(
      &mut tx,
      order.owner_id,
      AuditAction::OrderCreated,
      order.id,
      format!("Order created with {} items", order.items.len()),
    )
    .await?;

    tx.commit().await?;
    event!(
      Level::INFO,
      order_id = %order.id,
      order_number = %order.order_number,
      total_amount = %order.total_amount,
      "Order created."
    );
    Ok(order)
  }

  async fn insert_with_fresh_number(&self, tx: &mut S::Tx, draft: OrderDraft) -> OmsResult<Order> {
    let attempts = self.config.number_generation_attempts.max(1);
    let mut order = draft.finish(self.numbers.generate(ORDER_NUMBER_PREFIX, Utc::now()));
    let mut attempt = 1;
    loop {
      match tx.insert_order(&order).await {
        Ok(()) => return Ok(order),
        Err(err) if err.is_unique_violation(constraints::ORDER_NUMBER) => {
          event!(
            Level::WARN,
            order_number = %order.order_number,
            attempt,
            "Order number already taken."
          );
          if attempt >= attempts {
            return Err(numbers_exhausted("order", attempts, err));
          }
          attempt += 1;
          order.order_number = self.numbers.generate(ORDER_NUMBER_PREFIX, Utc::now());
        }
        Err(err) => return Err(err.into()),
      }
    }
  }

  /// Cancels a `created` order on behalf of its owner or an admin and puts
  /// every line's quantity back into stock. Lines whose product has since
  /// disappeared are skipped.
  #[instrument(
    name = "OrderWorkflow::cancel_order",
    skip_all,
    fields(order_id = %order_id, actor_id = %actor.id, role = actor.role.as_str()),
    err(Display)
  )]
  pub async fn cancel_order(&self, order_id: Uuid, actor: Actor) -> OmsResult<Order> {
    let mut tx = self.store.begin().await?;
    let mut order = tx
      .lock_order(order_id)
      .await?
      .ok_or_else(|| OmsError::not_found(ORDER_ENTITY, order_id))?;

    if !actor.may_act_on(order.owner_id) {
      event!(Level::WARN, owner_id = %order.owner_id, "Cancellation refused: not owner or admin.");
      return Err(OmsError::Unauthorized {
        actor_id: actor.id,
        order_id,
      });
    }

    if !order.can_be_canceled() {
      event!(Level::WARN, status = %order.status, "Cancellation refused: order not in a cancelable state.");
      return Err(OmsError::InvalidTransition {
        entity: ORDER_ENTITY,
        id: order_id,
        status: order.status.to_string(),
        action: "cancel",
      });
    }

    let now = Utc::now();
    tx.update_order_status(order_id, OrderStatus::Canceled, now).await?;

    let mut restocked = 0usize;
    for item in &order.items {
      if inventory::restock(&mut tx, item.product_id, item.quantity).await?.is_some() {
        restocked += 1;
      }
    }

    audit::append(
      &mut tx,
      actor.id,
      AuditAction::OrderCanceled,
      order_id,
      format!("Order canceled by {}", actor.role.as_str()),
    )
    .await?;

    tx.commit().await?;
    event!(
      Level::INFO,
      restocked_lines = restocked,
      skipped_lines = order.items.len() - restocked,
      "Order canceled."
    );

    order.status = OrderStatus::Canceled;
    order.updated_at = now;
    Ok(order)
  }

  /// Marks a `processing` order as delivered.
  #[instrument(
    name = "OrderWorkflow::complete_order",
    skip_all,
    fields(order_id = %order_id, admin_id = %admin_id),
    err(Display)
  )]
  pub async fn complete_order(&self, order_id: Uuid, admin_id: Uuid) -> OmsResult<Order> {
    let mut tx = self.store.begin().await?;
    let mut order = tx
      .lock_order(order_id)
      .await?
      .ok_or_else(|| OmsError::not_found(ORDER_ENTITY, order_id))?;

    if !order.can_be_completed() {
      event!(Level::WARN, status = %order.status, "Completion refused.");
      return Err(OmsError::InvalidTransition {
        entity: ORDER_ENTITY,
        id: order_id,
        status: order.status.to_string(),
        action: "complete",
      });
    }

    let now = Utc::now();
    tx.update_order_status(order_id, OrderStatus::Completed, now).await?;
    audit::append(&mut tx, admin_id, AuditAction::OrderCompleted, order_id, "Order completed by admin").await?;
    tx.commit().await?;
    event!(Level::INFO, "Order completed.");

    order.status = OrderStatus::Completed;
    order.updated_at = now;
    Ok(order)
  }

  #[instrument(name = "OrderWorkflow::get_stats", skip_all, err(Display))]
  pub async fn get_stats(&self) -> OmsResult<OrderStats> {
    let stats = self.store.order_stats(&self.config.revenue_statuses).await?;
    event!(
      Level::DEBUG,
      total_orders = stats.total_orders,
      total_revenue = %stats.total_revenue,
      pending_payments = stats.pending_payments,
      "Stats computed."
    );
    Ok(stats)
  }

  /// Order with items and latest payment, visible to its owner and admins.
  #[instrument(
    name = "OrderWorkflow::get_order",
    skip_all,
    fields(order_id = %order_id, actor_id = %actor.id),
    err(Display)
  )]
  pub async fn get_order(&self, actor: Actor, order_id: Uuid) -> OmsResult<Order> {
    let order = self
      .store
      .find_order(order_id)
      .await?
      .ok_or_else(|| OmsError::not_found(ORDER_ENTITY, order_id))?;
    if !actor.may_act_on(order.owner_id) {
      return Err(OmsError::Unauthorized {
        actor_id: actor.id,
        order_id,
      });
    }
    Ok(order)
  }

  /// Admins see every order, everyone else only their own. Newest first.
  #[instrument(name = "OrderWorkflow::list_orders", skip_all, fields(actor_id = %actor.id), err(Display))]
  pub async fn list_orders(&self, actor: Actor) -> OmsResult<Vec<Order>> {
    let orders = if actor.is_admin() {
      self.store.list_orders().await?
    } else {
      self.store.list_orders_by_owner(actor.id).await?
    };
    Ok(orders)
  }
}
