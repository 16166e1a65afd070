// mini_oms/src/store/postgres.rs

use super::{constraints, Store, StoreError, StoreResult, StoreTx};
use crate::config::{OmsConfig, RevenueStatusSet};
use crate::models::{
  AuditLogEntry, Order, OrderItem, OrderStats, OrderStatus, Payment, PaymentMethod, PaymentStatus, Product,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction};
use std::collections::HashMap;
use tracing::{event, Level};
use uuid::Uuid;

const ORDER_COLUMNS: &str =
  "id, owner_id, order_number, total_amount, status, notes, created_at, updated_at, deleted_at";
const ITEM_COLUMNS: &str =
  "id, order_id, product_id, product_name, product_price, quantity, subtotal, created_at";
const PAYMENT_COLUMNS: &str = "id, order_id, payment_number, amount, method, status, proof_reference, \
   verified_by, verified_at, notes, created_at, updated_at";
const PRODUCT_COLUMNS: &str =
  "id, category_id, name, description, price, stock, created_at, updated_at, deleted_at";

/// Maps constraint failures reported by Postgres onto `StoreError`.
fn classify(err: sqlx::Error) -> StoreError {
  if let Some(db_err) = err.as_database_error() {
    let constraint = db_err.constraint().unwrap_or_default().to_string();
    match db_err.code().as_deref() {
      // unique_violation
      Some("23505") => return StoreError::UniqueViolation { constraint },
      // check_violation
      Some("23514") => return StoreError::CheckViolation { constraint },
      // deadlock_detected
      Some("40P01") => {
        return StoreError::Deadlock {
          resource: db_err.message().to_string(),
        }
      }
      _ => {}
    }
  }
  StoreError::Database(err)
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
  Ok(Product {
    id: row.try_get("id")?,
    category_id: row.try_get("category_id")?,
    name: row.try_get("name")?,
    description: row.try_get("description")?,
    price: row.try_get("price")?,
    stock: row.try_get("stock")?,
    created_at: row.try_get("created_at")?,
    updated_at: row.try_get("updated_at")?,
    deleted_at: row.try_get("deleted_at")?,
  })
}

fn order_from_row(row: &PgRow) -> StoreResult<Order> {
  let status: String = row.try_get("status")?;
  Ok(Order {
    id: row.try_get("id")?,
    owner_id: row.try_get("owner_id")?,
    order_number: row.try_get("order_number")?,
    total_amount: row.try_get("total_amount")?,
    status: OrderStatus::parse(&status).ok_or(StoreError::Decode {
      column: "orders.status",
      value: status.clone(),
    })?,
    notes: row.try_get("notes")?,
    created_at: row.try_get("created_at")?,
    updated_at: row.try_get("updated_at")?,
    deleted_at: row.try_get("deleted_at")?,
    items: Vec::new(),
    payment: None,
  })
}

fn item_from_row(row: &PgRow) -> StoreResult<OrderItem> {
  Ok(OrderItem {
    id: row.try_get("id")?,
    order_id: row.try_get("order_id")?,
    product_id: row.try_get("product_id")?,
    product_name: row.try_get("product_name")?,
    product_price: row.try_get("product_price")?,
    quantity: row.try_get("quantity")?,
    subtotal: row.try_get("subtotal")?,
    created_at: row.try_get("created_at")?,
  })
}

fn payment_from_row(row: &PgRow) -> StoreResult<Payment> {
  let method: String = row.try_get("method")?;
  let status: String = row.try_get("status")?;
  Ok(Payment {
    id: row.try_get("id")?,
    order_id: row.try_get("order_id")?,
    payment_number: row.try_get("payment_number")?,
    amount: row.try_get("amount")?,
    method: PaymentMethod::parse(&method).ok_or(StoreError::Decode {
      column: "payments.method",
      value: method.clone(),
    })?,
    status: PaymentStatus::parse(&status).ok_or(StoreError::Decode {
      column: "payments.status",
      value: status.clone(),
    })?,
    proof_reference: row.try_get("proof_reference")?,
    verified_by: row.try_get("verified_by")?,
    verified_at: row.try_get("verified_at")?,
    notes: row.try_get("notes")?,
    created_at: row.try_get("created_at")?,
    updated_at: row.try_get("updated_at")?,
  })
}

fn audit_from_row(row: &PgRow) -> StoreResult<AuditLogEntry> {
  Ok(AuditLogEntry {
    id: row.try_get("id")?,
    actor_id: row.try_get("actor_id")?,
    action: row.try_get("action")?,
    entity_name: row.try_get("entity_name")?,
    entity_id: row.try_get("entity_id")?,
    details: row.try_get("details")?,
    created_at: row.try_get("created_at")?,
  })
}

async fn fetch_items(conn: &mut PgConnection, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
  let rows = sqlx::query(&format!(
    "select {ITEM_COLUMNS} from order_items where order_id = $1 order by created_at, id"
  ))
  .bind(order_id)
  .fetch_all(&mut *conn)
  .await
  .map_err(classify)?;
  rows.iter().map(item_from_row).collect()
}

/// Attaches items and the most recent payment to each order in one round
/// trip per table.
async fn attach_children(conn: &mut PgConnection, orders: &mut [Order]) -> StoreResult<()> {
  if orders.is_empty() {
    return Ok(());
  }
  let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();

  let item_rows = sqlx::query(&format!(
    "select {ITEM_COLUMNS} from order_items where order_id = any($1) order by created_at, id"
  ))
  .bind(&ids)
  .fetch_all(&mut *conn)
  .await
  .map_err(classify)?;
  let mut items: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
  for row in &item_rows {
    let item = item_from_row(row)?;
    items.entry(item.order_id).or_default().push(item);
  }

  let payment_rows = sqlx::query(&format!(
    "select distinct on (order_id) {PAYMENT_COLUMNS} from payments \
     where order_id = any($1) order by order_id, created_at desc"
  ))
  .bind(&ids)
  .fetch_all(&mut *conn)
  .await
  .map_err(classify)?;
  let mut payments: HashMap<Uuid, Payment> = HashMap::new();
  for row in &payment_rows {
    let payment = payment_from_row(row)?;
    payments.insert(payment.order_id, payment);
  }

  for order in orders.iter_mut() {
    order.items = items.remove(&order.id).unwrap_or_default();
    order.payment = payments.remove(&order.id);
  }
  Ok(())
}

#[derive(Debug, Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn from_pool(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn connect(config: &OmsConfig) -> crate::error::OmsResult<Self> {
    let url = config.require_database_url()?;
    let pool = PgPoolOptions::new()
      .max_connections(config.db_max_connections)
      .connect(url)
      .await
      .map_err(|e| crate::error::OmsError::infrastructure("connecting to Postgres", e))?;
    event!(Level::INFO, max_connections = config.db_max_connections, "Postgres pool established.");
    Ok(Self { pool })
  }

  /// Applies the embedded migrations.
  pub async fn migrate(&self) -> StoreResult<()> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    Ok(())
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  async fn fetch_orders(&self, owner_id: Option<Uuid>) -> StoreResult<Vec<Order>> {
    let mut conn = self.pool.acquire().await?;
    let rows = sqlx::query(&format!(
      "select {ORDER_COLUMNS} from orders \
       where deleted_at is null and ($1::uuid is null or owner_id = $1) \
       order by created_at desc"
    ))
    .bind(owner_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(classify)?;
    let mut orders = rows.iter().map(order_from_row).collect::<StoreResult<Vec<_>>>()?;
    attach_children(&mut *conn, &mut orders).await?;
    Ok(orders)
  }
}

#[async_trait]
impl Store for PgStore {
  type Tx = PgTx;

  async fn begin(&self) -> StoreResult<PgTx> {
    let tx = self.pool.begin().await?;
    Ok(PgTx { tx })
  }

  async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
    let mut conn = self.pool.acquire().await?;
    let row = sqlx::query(&format!(
      "select {ORDER_COLUMNS} from orders where id = $1 and deleted_at is null"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(classify)?;
    let Some(row) = row else {
      return Ok(None);
    };
    let mut orders = vec![order_from_row(&row)?];
    attach_children(&mut *conn, &mut orders).await?;
    Ok(orders.pop())
  }

  async fn list_orders(&self) -> StoreResult<Vec<Order>> {
    self.fetch_orders(None).await
  }

  async fn list_orders_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Order>> {
    self.fetch_orders(Some(owner_id)).await
  }

  async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
    let row = sqlx::query(&format!(
      "select {PRODUCT_COLUMNS} from products where id = $1 and deleted_at is null"
    ))
    .bind(id)
    .fetch_optional(&self.pool)
    .await
    .map_err(classify)?;
    row.as_ref().map(product_from_row).transpose()
  }

  async fn insert_product(&self, product: &Product) -> StoreResult<()> {
    sqlx::query(
      r#"
      insert into products (
        id, category_id, name, description, price, stock, created_at, updated_at, deleted_at
      ) values (
        $1, $2, $3, $4, $5, $6, $7, $8, $9
      )
      "#,
    )
    .bind(product.id)
    .bind(product.category_id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.stock)
    .bind(product.created_at)
    .bind(product.updated_at)
    .bind(product.deleted_at)
    .execute(&self.pool)
    .await
    .map_err(classify)?;
    Ok(())
  }

  async fn find_payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
    let row = sqlx::query(&format!("select {PAYMENT_COLUMNS} from payments where id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(classify)?;
    row.as_ref().map(payment_from_row).transpose()
  }

  async fn find_payment_by_order(&self, order_id: Uuid) -> StoreResult<Option<Payment>> {
    let row = sqlx::query(&format!(
      "select {PAYMENT_COLUMNS} from payments where order_id = $1 order by created_at desc limit 1"
    ))
    .bind(order_id)
    .fetch_optional(&self.pool)
    .await
    .map_err(classify)?;
    row.as_ref().map(payment_from_row).transpose()
  }

  async fn order_stats(&self, revenue_statuses: &RevenueStatusSet) -> StoreResult<OrderStats> {
    let row = sqlx::query(
      r#"
      select
        (select count(*) from orders where deleted_at is null)::bigint as total_orders,
        (select coalesce(sum(total_amount), 0) from orders
          where deleted_at is null and status = any($1)) as total_revenue,
        (select count(*) from payments where status = 'pending')::bigint as pending_payments
      "#,
    )
    .bind(revenue_statuses.as_slice().to_vec())
    .fetch_one(&self.pool)
    .await
    .map_err(classify)?;

    let total_revenue: Decimal = row.try_get("total_revenue")?;
    Ok(OrderStats {
      total_orders: row.try_get("total_orders")?,
      total_revenue,
      pending_payments: row.try_get("pending_payments")?,
    })
  }

  async fn audit_entries_for(&self, entity_id: Uuid) -> StoreResult<Vec<AuditLogEntry>> {
    let rows = sqlx::query(
      r#"
      select id, actor_id, action, entity_name, entity_id, details, created_at
      from audit_logs
      where entity_id = $1
      order by created_at, id
      "#,
    )
    .bind(entity_id)
    .fetch_all(&self.pool)
    .await
    .map_err(classify)?;
    rows.iter().map(audit_from_row).collect()
  }
}

/// A Postgres transaction. Row locks are `SELECT ... FOR UPDATE`; dropping
/// the value rolls the transaction back.
pub struct PgTx {
  tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
  async fn lock_product(&mut self, id: Uuid) -> StoreResult<Option<Product>> {
    let row = sqlx::query(&format!(
      "select {PRODUCT_COLUMNS} from products where id = $1 and deleted_at is null for update"
    ))
    .bind(id)
    .fetch_optional(&mut *self.tx)
    .await
    .map_err(classify)?;
    row.as_ref().map(product_from_row).transpose()
  }

  async fn update_product_stock(&mut self, id: Uuid, stock: i32) -> StoreResult<()> {
    sqlx::query("update products set stock = $2, updated_at = now() where id = $1")
      .bind(id)
      .bind(stock)
      .execute(&mut *self.tx)
      .await
      .map_err(classify)?;
    Ok(())
  }

  async fn lock_order(&mut self, id: Uuid) -> StoreResult<Option<Order>> {
    let row = sqlx::query(&format!(
      "select {ORDER_COLUMNS} from orders where id = $1 and deleted_at is null for update"
    ))
    .bind(id)
    .fetch_optional(&mut *self.tx)
    .await
    .map_err(classify)?;
    let Some(row) = row else {
      return Ok(None);
    };
    let mut order = order_from_row(&row)?;
    order.items = fetch_items(&mut *self.tx, id).await?;
    Ok(Some(order))
  }

  async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
    // `on conflict do nothing` keeps the transaction usable after a number
    // collision so the caller can retry with a fresh number.
    let inserted = sqlx::query(
      r#"
      insert into orders (
        id, owner_id, order_number, total_amount, status, notes, created_at, updated_at
      ) values (
        $1, $2, $3, $4, $5, $6, $7, $8
      )
      on conflict (order_number) do nothing
      "#,
    )
    .bind(order.id)
    .bind(order.owner_id)
    .bind(&order.order_number)
    .bind(order.total_amount)
    .bind(order.status.as_str())
    .bind(&order.notes)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *self.tx)
    .await
    .map_err(classify)?
    .rows_affected();
    if inserted == 0 {
      return Err(StoreError::unique(constraints::ORDER_NUMBER));
    }

    for item in &order.items {
      sqlx::query(
        r#"
        insert into order_items (
          id, order_id, product_id, product_name, product_price, quantity, subtotal, created_at
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8
        )
        "#,
      )
      .bind(item.id)
      .bind(item.order_id)
      .bind(item.product_id)
      .bind(&item.product_name)
      .bind(item.product_price)
      .bind(item.quantity)
      .bind(item.subtotal)
      .bind(item.created_at)
      .execute(&mut *self.tx)
      .await
      .map_err(classify)?;
    }
    Ok(())
  }

  async fn update_order_status(&mut self, id: Uuid, status: OrderStatus, at: DateTime<Utc>) -> StoreResult<()> {
    sqlx::query("update orders set status = $2, updated_at = $3 where id = $1")
      .bind(id)
      .bind(status.as_str())
      .bind(at)
      .execute(&mut *self.tx)
      .await
      .map_err(classify)?;
    Ok(())
  }

  async fn lock_payment(&mut self, id: Uuid) -> StoreResult<Option<Payment>> {
    let row = sqlx::query(&format!("select {PAYMENT_COLUMNS} from payments where id = $1 for update"))
      .bind(id)
      .fetch_optional(&mut *self.tx)
      .await
      .map_err(classify)?;
    row.as_ref().map(payment_from_row).transpose()
  }

  async fn live_payment_for_order(&mut self, order_id: Uuid) -> StoreResult<Option<Payment>> {
    let row = sqlx::query(&format!(
      "select {PAYMENT_COLUMNS} from payments \
       where order_id = $1 and status in ('pending', 'success') \
       order by created_at desc limit 1"
    ))
    .bind(order_id)
    .fetch_optional(&mut *self.tx)
    .await
    .map_err(classify)?;
    row.as_ref().map(payment_from_row).transpose()
  }

  async fn insert_payment(&mut self, payment: &Payment) -> StoreResult<()> {
    let inserted = sqlx::query(
      r#"
      insert into payments (
        id, order_id, payment_number, amount, method, status, proof_reference,
        verified_by, verified_at, notes, created_at, updated_at
      ) values (
        $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12
      )
      on conflict do nothing
      "#,
    )
    .bind(payment.id)
    .bind(payment.order_id)
    .bind(&payment.payment_number)
    .bind(payment.amount)
    .bind(payment.method.as_str())
    .bind(payment.status.as_str())
    .bind(&payment.proof_reference)
    .bind(payment.verified_by)
    .bind(payment.verified_at)
    .bind(&payment.notes)
    .bind(payment.created_at)
    .bind(payment.updated_at)
    .execute(&mut *self.tx)
    .await
    .map_err(classify)?
    .rows_affected();
    if inserted > 0 {
      return Ok(());
    }

    // Nothing inserted: work out which uniqueness rule refused the row.
    let (live_exists,): (bool,) = sqlx::query_as(
      "select exists (select 1 from payments where order_id = $1 and status in ('pending', 'success'))",
    )
    .bind(payment.order_id)
    .fetch_one(&mut *self.tx)
    .await
    .map_err(classify)?;
    if live_exists && payment.status.is_live() {
      Err(StoreError::unique(constraints::LIVE_PAYMENT))
    } else {
      Err(StoreError::unique(constraints::PAYMENT_NUMBER))
    }
  }

  async fn update_payment(&mut self, payment: &Payment) -> StoreResult<()> {
    sqlx::query(
      r#"
      update payments
      set status = $2, verified_by = $3, verified_at = $4, notes = $5, updated_at = $6
      where id = $1
      "#,
    )
    .bind(payment.id)
    .bind(payment.status.as_str())
    .bind(payment.verified_by)
    .bind(payment.verified_at)
    .bind(&payment.notes)
    .bind(payment.updated_at)
    .execute(&mut *self.tx)
    .await
    .map_err(classify)?;
    Ok(())
  }

  async fn append_audit(&mut self, entry: &AuditLogEntry) -> StoreResult<()> {
    sqlx::query(
      r#"
      insert into audit_logs (
        id, actor_id, action, entity_name, entity_id, details, created_at
      ) values (
        $1, $2, $3, $4, $5, $6, $7
      )
      "#,
    )
    .bind(entry.id)
    .bind(entry.actor_id)
    .bind(&entry.action)
    .bind(&entry.entity_name)
    .bind(entry.entity_id)
    .bind(&entry.details)
    .bind(entry.created_at)
    .execute(&mut *self.tx)
    .await
    .map_err(classify)?;
    Ok(())
  }

  async fn commit(self) -> StoreResult<()> {
    self.tx.commit().await.map_err(classify)
  }

  async fn rollback(self) -> StoreResult<()> {
    self.tx.rollback().await.map_err(classify)
  }
}
