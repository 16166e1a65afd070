// mini_oms/src/store/memory.rs

//! In-process store with real row locks.
//!
//! Committed tables live behind one `parking_lot::RwLock` that is only held
//! for short, non-async critical sections. Row locks are per-row
//! `tokio::sync::Mutex`es: a transaction keeps the owned guard until it
//! commits or is dropped, so a second transaction touching the same row
//! waits at `lock_*` and then reads the committed value. Writes are staged
//! in the transaction and applied in a single critical section at commit,
//! before any row lock is released.
//!
//! Every wait is recorded in a wait-for graph. A transaction whose wait would
//! close a cycle gets `StoreError::Deadlock` instead of blocking, the same
//! way Postgres aborts one participant of a deadlock.

use super::{constraints, Store, StoreError, StoreResult, StoreTx};
use crate::config::RevenueStatusSet;
use crate::models::{AuditLogEntry, Order, OrderItem, OrderStats, OrderStatus, Payment, PaymentStatus, Product};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex as RowMutex, OwnedMutexGuard};
use tracing::{event, Level};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
  Product(Uuid),
  Order(Uuid),
  Payment(Uuid),
}

/// Mirrors the `orders` table: the status is kept as stored text.
#[derive(Debug, Clone)]
struct OrderRow {
  id: Uuid,
  owner_id: Uuid,
  order_number: String,
  total_amount: Decimal,
  status: String,
  notes: String,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
  deleted_at: Option<DateTime<Utc>>,
}

impl OrderRow {
  fn from_order(order: &Order) -> Self {
    Self {
      id: order.id,
      owner_id: order.owner_id,
      order_number: order.order_number.clone(),
      total_amount: order.total_amount,
      status: order.status.as_str().to_string(),
      notes: order.notes.clone(),
      created_at: order.created_at,
      updated_at: order.updated_at,
      deleted_at: order.deleted_at,
    }
  }

  fn into_order(self, items: Vec<OrderItem>, payment: Option<Payment>) -> StoreResult<Order> {
    let status = OrderStatus::parse(&self.status).ok_or(StoreError::Decode {
      column: "orders.status",
      value: self.status.clone(),
    })?;
    Ok(Order {
      id: self.id,
      owner_id: self.owner_id,
      order_number: self.order_number,
      total_amount: self.total_amount,
      status,
      notes: self.notes,
      created_at: self.created_at,
      updated_at: self.updated_at,
      deleted_at: self.deleted_at,
      items,
      payment,
    })
  }
}

#[derive(Debug, Default)]
struct Tables {
  products: HashMap<Uuid, Product>,
  orders: HashMap<Uuid, OrderRow>,
  order_items: HashMap<Uuid, Vec<OrderItem>>,
  payments: HashMap<Uuid, Payment>,
  audit_logs: Vec<AuditLogEntry>,
}

impl Tables {
  fn latest_payment(&self, order_id: Uuid) -> Option<Payment> {
    self
      .payments
      .values()
      .filter(|p| p.order_id == order_id)
      .max_by_key(|p| p.created_at)
      .cloned()
  }

  fn assemble_order(&self, row: &OrderRow) -> StoreResult<Order> {
    let items = self.order_items.get(&row.id).cloned().unwrap_or_default();
    row.clone().into_order(items, self.latest_payment(row.id))
  }

  fn assemble_orders<'a>(&self, rows: impl Iterator<Item = &'a OrderRow>) -> StoreResult<Vec<Order>> {
    let mut orders = rows
      .filter(|row| row.deleted_at.is_none())
      .map(|row| self.assemble_order(row))
      .collect::<StoreResult<Vec<_>>>()?;
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }
}

type TxId = u64;

/// Row mutexes plus the wait-for graph over them. An entry in `rows` lives
/// only while some transaction holds or waits for that row.
#[derive(Debug, Default)]
struct LockTable {
  rows: HashMap<RowKey, Arc<RowMutex<()>>>,
  owners: HashMap<RowKey, TxId>,
  waiting: HashMap<TxId, RowKey>,
}

impl LockTable {
  /// Follows owner -> awaited row -> owner from `key` and reports whether
  /// the chain leads back to `tx`.
  fn closes_cycle(&self, tx: TxId, key: RowKey) -> bool {
    let mut next = key;
    for _ in 0..=self.waiting.len() {
      let owner = match self.owners.get(&next) {
        Some(&owner) => owner,
        None => return false,
      };
      if owner == tx {
        return true;
      }
      next = match self.waiting.get(&owner) {
        Some(&row) => row,
        None => return false,
      };
    }
    false
  }

  fn release(&mut self, tx: TxId, key: RowKey, guard: OwnedMutexGuard<()>) {
    if self.owners.get(&key) == Some(&tx) {
      self.owners.remove(&key);
    }
    drop(guard);
    if self.rows.get(&key).is_some_and(|row| Arc::strong_count(row) == 1) {
      self.rows.remove(&key);
    }
  }
}

#[derive(Debug, Default)]
struct Shared {
  tables: RwLock<Tables>,
  locks: Mutex<LockTable>,
  next_tx: AtomicU64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  shared: Arc<Shared>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Soft-deletes a product the way the catalog service would; locked reads
  /// treat it as missing from then on.
  pub fn soft_delete_product(&self, id: Uuid) -> bool {
    let mut tables = self.shared.tables.write();
    match tables.products.get_mut(&id) {
      Some(product) => {
        product.deleted_at = Some(Utc::now());
        true
      }
      None => false,
    }
  }

  /// Writes the status text verbatim, bypassing domain validation. Used to
  /// load historical rows that predate the current status vocabulary.
  pub fn overwrite_order_status_raw(&self, order_id: Uuid, status: &str) -> bool {
    let mut tables = self.shared.tables.write();
    match tables.orders.get_mut(&order_id) {
      Some(row) => {
        row.status = status.to_string();
        true
      }
      None => false,
    }
  }

  pub fn audit_log(&self) -> Vec<AuditLogEntry> {
    self.shared.tables.read().audit_logs.clone()
  }

  pub fn payments_for_order(&self, order_id: Uuid) -> Vec<Payment> {
    let tables = self.shared.tables.read();
    let mut payments: Vec<Payment> = tables.payments.values().filter(|p| p.order_id == order_id).cloned().collect();
    payments.sort_by_key(|p| p.created_at);
    payments
  }
}

#[async_trait]
impl Store for MemoryStore {
  type Tx = MemoryTx;

  async fn begin(&self) -> StoreResult<MemoryTx> {
    Ok(MemoryTx {
      id: self.shared.next_tx.fetch_add(1, Ordering::Relaxed),
      shared: Arc::clone(&self.shared),
      held: HashMap::new(),
      staged: Staged::default(),
    })
  }

  async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
    let tables = self.shared.tables.read();
    match tables.orders.get(&id) {
      Some(row) if row.deleted_at.is_none() => tables.assemble_order(row).map(Some),
      _ => Ok(None),
    }
  }

  async fn list_orders(&self) -> StoreResult<Vec<Order>> {
    let tables = self.shared.tables.read();
    tables.assemble_orders(tables.orders.values())
  }

  async fn list_orders_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Order>> {
    let tables = self.shared.tables.read();
    tables.assemble_orders(tables.orders.values().filter(|row| row.owner_id == owner_id))
  }

  async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
    let tables = self.shared.tables.read();
    Ok(tables.products.get(&id).filter(|p| !p.is_deleted()).cloned())
  }

  async fn insert_product(&self, product: &Product) -> StoreResult<()> {
    if product.stock < 0 {
      return Err(StoreError::CheckViolation {
        constraint: constraints::PRODUCT_STOCK_NON_NEGATIVE.to_string(),
      });
    }
    let mut tables = self.shared.tables.write();
    if tables.products.contains_key(&product.id) {
      return Err(StoreError::unique(constraints::PRODUCT_PKEY));
    }
    tables.products.insert(product.id, product.clone());
    Ok(())
  }

  async fn find_payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
    Ok(self.shared.tables.read().payments.get(&id).cloned())
  }

  async fn find_payment_by_order(&self, order_id: Uuid) -> StoreResult<Option<Payment>> {
    Ok(self.shared.tables.read().latest_payment(order_id))
  }

  async fn order_stats(&self, revenue_statuses: &RevenueStatusSet) -> StoreResult<OrderStats> {
    let tables = self.shared.tables.read();
    let live_orders = tables.orders.values().filter(|row| row.deleted_at.is_none());
    let mut total_orders = 0i64;
    let mut total_revenue = Decimal::ZERO;
    for row in live_orders {
      total_orders += 1;
      if revenue_statuses.contains(&row.status) {
        total_revenue += row.total_amount;
      }
    }
    let pending_payments = tables
      .payments
      .values()
      .filter(|p| p.status == PaymentStatus::Pending)
      .count() as i64;
    Ok(OrderStats {
      total_orders,
      total_revenue,
      pending_payments,
    })
  }

  async fn audit_entries_for(&self, entity_id: Uuid) -> StoreResult<Vec<AuditLogEntry>> {
    let tables = self.shared.tables.read();
    Ok(tables.audit_logs.iter().filter(|e| e.entity_id == entity_id).cloned().collect())
  }
}

#[derive(Debug, Default)]
struct Staged {
  products: HashMap<Uuid, Product>,
  orders: HashMap<Uuid, OrderRow>,
  order_items: HashMap<Uuid, Vec<OrderItem>>,
  payments: HashMap<Uuid, Payment>,
  audit_logs: Vec<AuditLogEntry>,
}

impl Staged {
  fn is_empty(&self) -> bool {
    self.products.is_empty()
      && self.orders.is_empty()
      && self.order_items.is_empty()
      && self.payments.is_empty()
      && self.audit_logs.is_empty()
  }
}

pub struct MemoryTx {
  id: TxId,
  shared: Arc<Shared>,
  held: HashMap<RowKey, OwnedMutexGuard<()>>,
  staged: Staged,
}

impl MemoryTx {
  /// Returns true when this call took the lock (false if already held).
  async fn acquire(&mut self, key: RowKey) -> StoreResult<bool> {
    if self.held.contains_key(&key) {
      return Ok(false);
    }
    let row_lock = {
      let mut locks = self.shared.locks.lock();
      if locks.closes_cycle(self.id, key) {
        event!(Level::WARN, tx = self.id, row = ?key, "Deadlock detected; aborting the waiting transaction.");
        return Err(StoreError::Deadlock {
          resource: format!("{key:?}"),
        });
      }
      locks.waiting.insert(self.id, key);
      let row_lock = Arc::clone(locks.rows.entry(key).or_insert_with(|| Arc::new(RowMutex::new(()))));
      row_lock
    };
    event!(Level::TRACE, tx = self.id, row = ?key, "Waiting for row lock.");
    let guard = row_lock.lock_owned().await;
    {
      let mut locks = self.shared.locks.lock();
      locks.waiting.remove(&self.id);
      locks.owners.insert(key, self.id);
    }
    self.held.insert(key, guard);
    Ok(true)
  }

  /// Gives back a row lock taken for a row that turned out not to exist.
  fn release_row(&mut self, key: RowKey) {
    if let Some(guard) = self.held.remove(&key) {
      self.shared.locks.lock().release(self.id, key, guard);
    }
  }

  fn release_all(&mut self) {
    let mut locks = self.shared.locks.lock();
    locks.waiting.remove(&self.id);
    for (key, guard) in self.held.drain() {
      locks.release(self.id, key, guard);
    }
  }

  fn current_product(&self, id: Uuid) -> Option<Product> {
    if let Some(product) = self.staged.products.get(&id) {
      return Some(product.clone());
    }
    self.shared.tables.read().products.get(&id).cloned()
  }

  fn current_order_row(&self, id: Uuid) -> Option<OrderRow> {
    if let Some(row) = self.staged.orders.get(&id) {
      return Some(row.clone());
    }
    self.shared.tables.read().orders.get(&id).cloned()
  }

  fn current_payment(&self, id: Uuid) -> Option<Payment> {
    if let Some(payment) = self.staged.payments.get(&id) {
      return Some(payment.clone());
    }
    self.shared.tables.read().payments.get(&id).cloned()
  }

  /// Live payment for `order_id` other than `except`, staged rows first.
  fn other_live_payment(&self, order_id: Uuid, except: Option<Uuid>) -> Option<Payment> {
    let is_other_live = |p: &&Payment| p.order_id == order_id && p.status.is_live() && Some(p.id) != except;
    if let Some(p) = self.staged.payments.values().find(is_other_live) {
      return Some(p.clone());
    }
    let tables = self.shared.tables.read();
    tables
      .payments
      .values()
      .filter(|p| !self.staged.payments.contains_key(&p.id))
      .find(is_other_live)
      .cloned()
  }

  fn stage_order_row(&mut self, row: OrderRow) {
    self.staged.orders.insert(row.id, row);
  }
}

#[async_trait]
impl StoreTx for MemoryTx {
  async fn lock_product(&mut self, id: Uuid) -> StoreResult<Option<Product>> {
    let newly_locked = self.acquire(RowKey::Product(id)).await?;
    let product = self.current_product(id).filter(|p| !p.is_deleted());
    if product.is_none() && newly_locked {
      self.release_row(RowKey::Product(id));
    }
    Ok(product)
  }

  async fn update_product_stock(&mut self, id: Uuid, stock: i32) -> StoreResult<()> {
    if stock < 0 {
      return Err(StoreError::CheckViolation {
        constraint: constraints::PRODUCT_STOCK_NON_NEGATIVE.to_string(),
      });
    }
    self.acquire(RowKey::Product(id)).await?;
    if let Some(mut product) = self.current_product(id) {
      product.stock = stock;
      product.updated_at = Utc::now();
      self.staged.products.insert(id, product);
    }
    Ok(())
  }

  async fn lock_order(&mut self, id: Uuid) -> StoreResult<Option<Order>> {
    let newly_locked = self.acquire(RowKey::Order(id)).await?;
    let row = match self.current_order_row(id).filter(|row| row.deleted_at.is_none()) {
      Some(row) => row,
      None => {
        if newly_locked {
          self.release_row(RowKey::Order(id));
        }
        return Ok(None);
      }
    };
    let items = match self.staged.order_items.get(&id) {
      Some(items) => items.clone(),
      None => self.shared.tables.read().order_items.get(&id).cloned().unwrap_or_default(),
    };
    row.into_order(items, None).map(Some)
  }

  async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
    let number_taken = self.staged.orders.values().any(|row| row.order_number == order.order_number)
      || self
        .shared
        .tables
        .read()
        .orders
        .values()
        .any(|row| row.order_number == order.order_number);
    if number_taken {
      return Err(StoreError::unique(constraints::ORDER_NUMBER));
    }
    self.acquire(RowKey::Order(order.id)).await?;
    self.stage_order_row(OrderRow::from_order(order));
    self.staged.order_items.insert(order.id, order.items.clone());
    Ok(())
  }

  async fn update_order_status(&mut self, id: Uuid, status: OrderStatus, at: DateTime<Utc>) -> StoreResult<()> {
    self.acquire(RowKey::Order(id)).await?;
    if let Some(mut row) = self.current_order_row(id) {
      row.status = status.as_str().to_string();
      row.updated_at = at;
      self.stage_order_row(row);
    }
    Ok(())
  }

  async fn lock_payment(&mut self, id: Uuid) -> StoreResult<Option<Payment>> {
    let newly_locked = self.acquire(RowKey::Payment(id)).await?;
    let payment = self.current_payment(id);
    if payment.is_none() && newly_locked {
      self.release_row(RowKey::Payment(id));
    }
    Ok(payment)
  }

  async fn live_payment_for_order(&mut self, order_id: Uuid) -> StoreResult<Option<Payment>> {
    Ok(self.other_live_payment(order_id, None))
  }

  async fn insert_payment(&mut self, payment: &Payment) -> StoreResult<()> {
    let number_taken = self
      .staged
      .payments
      .values()
      .any(|p| p.payment_number == payment.payment_number)
      || self
        .shared
        .tables
        .read()
        .payments
        .values()
        .any(|p| p.payment_number == payment.payment_number);
    if number_taken {
      return Err(StoreError::unique(constraints::PAYMENT_NUMBER));
    }
    if payment.status.is_live() && self.other_live_payment(payment.order_id, Some(payment.id)).is_some() {
      return Err(StoreError::unique(constraints::LIVE_PAYMENT));
    }
    self.acquire(RowKey::Payment(payment.id)).await?;
    self.staged.payments.insert(payment.id, payment.clone());
    Ok(())
  }

  async fn update_payment(&mut self, payment: &Payment) -> StoreResult<()> {
    if payment.status.is_live() && self.other_live_payment(payment.order_id, Some(payment.id)).is_some() {
      return Err(StoreError::unique(constraints::LIVE_PAYMENT));
    }
    self.acquire(RowKey::Payment(payment.id)).await?;
    self.staged.payments.insert(payment.id, payment.clone());
    Ok(())
  }

  async fn append_audit(&mut self, entry: &AuditLogEntry) -> StoreResult<()> {
    self.staged.audit_logs.push(entry.clone());
    Ok(())
  }

  async fn commit(mut self) -> StoreResult<()> {
    let staged = std::mem::take(&mut self.staged);
    {
      let mut tables = self.shared.tables.write();

      // Re-check uniqueness against rows committed since they were staged.
      for row in staged.orders.values() {
        let clash = tables
          .orders
          .values()
          .any(|committed| committed.id != row.id && committed.order_number == row.order_number);
        if clash {
          return Err(StoreError::unique(constraints::ORDER_NUMBER));
        }
      }
      for payment in staged.payments.values() {
        let number_clash = tables
          .payments
          .values()
          .any(|committed| committed.id != payment.id && committed.payment_number == payment.payment_number);
        if number_clash {
          return Err(StoreError::unique(constraints::PAYMENT_NUMBER));
        }
        let live_clash = payment.status.is_live()
          && tables.payments.values().any(|committed| {
            committed.id != payment.id
              && committed.order_id == payment.order_id
              && committed.status.is_live()
              && !staged.payments.contains_key(&committed.id)
          });
        if live_clash {
          return Err(StoreError::unique(constraints::LIVE_PAYMENT));
        }
      }

      tables.products.extend(staged.products);
      tables.orders.extend(staged.orders);
      tables.order_items.extend(staged.order_items);
      tables.payments.extend(staged.payments);
      tables.audit_logs.extend(staged.audit_logs);
    }
    event!(Level::TRACE, rows_released = self.held.len(), "Memory transaction committed.");
    self.release_all();
    Ok(())
  }

  async fn rollback(self) -> StoreResult<()> {
    // Dropping discards the staged writes and releases the row locks.
    Ok(())
  }
}

impl Drop for MemoryTx {
  fn drop(&mut self) {
    if !self.staged.is_empty() {
      event!(
        Level::DEBUG,
        rows_released = self.held.len(),
        "Memory transaction dropped without commit; staged writes discarded."
      );
    }
    self.release_all();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn product(stock: i32) -> Product {
    Product::new("Kopi", Decimal::new(15_000, 0), stock)
  }

  #[tokio::test]
  async fn uncommitted_writes_are_invisible_and_discarded_on_drop() {
    let store = MemoryStore::new();
    let p = product(5);
    store.insert_product(&p).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.lock_product(p.id).await.unwrap().unwrap();
    tx.update_product_stock(p.id, 1).await.unwrap();
    assert_eq!(tx.lock_product(p.id).await.unwrap().unwrap().stock, 1);
    assert_eq!(store.find_product(p.id).await.unwrap().unwrap().stock, 5);
    drop(tx);

    assert_eq!(store.find_product(p.id).await.unwrap().unwrap().stock, 5);
    let mut next = store.begin().await.unwrap();
    assert_eq!(next.lock_product(p.id).await.unwrap().unwrap().stock, 5);
  }

  #[tokio::test]
  async fn commit_publishes_staged_rows() {
    let store = MemoryStore::new();
    let p = product(5);
    store.insert_product(&p).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.update_product_stock(p.id, 3).await.unwrap();
    tx.append_audit(&AuditLogEntry::new(Uuid::new_v4(), "TEST", "Product", p.id, ""))
      .await
      .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(store.find_product(p.id).await.unwrap().unwrap().stock, 3);
    assert_eq!(store.audit_entries_for(p.id).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn negative_stock_is_refused_by_the_store() {
    let store = MemoryStore::new();
    let p = product(1);
    store.insert_product(&p).await.unwrap();
    let mut tx = store.begin().await.unwrap();
    let err = tx.update_product_stock(p.id, -1).await.unwrap_err();
    assert!(matches!(err, StoreError::CheckViolation { .. }));
  }

  #[tokio::test]
  async fn soft_deleted_products_cannot_be_locked() {
    let store = MemoryStore::new();
    let p = product(1);
    store.insert_product(&p).await.unwrap();
    assert!(store.soft_delete_product(p.id));
    let mut tx = store.begin().await.unwrap();
    assert!(tx.lock_product(p.id).await.unwrap().is_none());
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn second_locker_waits_for_the_first_to_finish() {
    let store = MemoryStore::new();
    let p = product(2);
    store.insert_product(&p).await.unwrap();

    let mut first = store.begin().await.unwrap();
    first.lock_product(p.id).await.unwrap().unwrap();

    let contender_store = store.clone();
    let contender = tokio::spawn(async move {
      let mut tx = contender_store.begin().await.unwrap();
      tx.lock_product(p.id).await.unwrap().unwrap().stock
    });

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!contender.is_finished());

    first.update_product_stock(p.id, 0).await.unwrap();
    first.commit().await.unwrap();

    assert_eq!(contender.await.unwrap(), 0);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn lock_cycle_aborts_the_transaction_that_closes_it() {
    let store = MemoryStore::new();
    let a = product(1);
    let b = product(1);
    store.insert_product(&a).await.unwrap();
    store.insert_product(&b).await.unwrap();
    let b_id = b.id;

    let mut first = store.begin().await.unwrap();
    let mut second = store.begin().await.unwrap();
    first.lock_product(a.id).await.unwrap().unwrap();
    second.lock_product(b.id).await.unwrap().unwrap();

    let waiter = tokio::spawn(async move {
      first.lock_product(b_id).await.unwrap().unwrap();
      first.commit().await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    let err = second.lock_product(a.id).await.unwrap_err();
    assert!(matches!(err, StoreError::Deadlock { .. }), "{err}");
    drop(second);

    tokio::time::timeout(std::time::Duration::from_secs(2), waiter)
      .await
      .expect("the surviving transaction must get the row")
      .unwrap();
  }

  #[tokio::test]
  async fn row_lock_entries_are_dropped_once_released() {
    let store = MemoryStore::new();
    let p = product(1);
    store.insert_product(&p).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.lock_product(p.id).await.unwrap().unwrap();
    assert!(tx.lock_product(Uuid::new_v4()).await.unwrap().is_none());
    assert!(tx.lock_order(Uuid::new_v4()).await.unwrap().is_none());
    assert_eq!(store.shared.locks.lock().rows.len(), 1);

    tx.commit().await.unwrap();
    let locks = store.shared.locks.lock();
    assert!(locks.rows.is_empty());
    assert!(locks.owners.is_empty());
    assert!(locks.waiting.is_empty());
  }
}
