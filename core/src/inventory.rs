// mini_oms/src/inventory.rs

//! Stock mutations. Every change follows lock, check, mutate inside the
//! caller's transaction; nothing here commits.

use crate::error::{OmsError, OmsResult};
use crate::models::Product;
use crate::store::StoreTx;
use tracing::{event, Level};
use uuid::Uuid;

pub const PRODUCT_ENTITY: &str = "Product";

/// Locks the product row, checks it can cover `quantity`, and decrements the
/// stock. Returns the product as it was before the decrement so the caller
/// can snapshot its name and price.
pub async fn reserve<T>(tx: &mut T, product_id: Uuid, quantity: i32) -> OmsResult<Product>
where
  T: StoreTx + ?Sized,
{
  let product = tx
    .lock_product(product_id)
    .await?
    .ok_or_else(|| OmsError::not_found(PRODUCT_ENTITY, product_id))?;

  if !product.has_stock_for(quantity) {
    event!(
      Level::WARN,
      product_id = %product_id,
      requested = quantity,
      available = product.stock,
      "Reservation refused: insufficient stock."
    );
    return Err(OmsError::InsufficientStock {
      product_id,
      product_name: product.name.clone(),
      requested: quantity,
      available: product.stock,
    });
  }

  tx.update_product_stock(product_id, product.stock - quantity).await?;
  event!(
    Level::TRACE,
    product_id = %product_id,
    remaining = product.stock - quantity,
    "Stock reserved."
  );
  Ok(product)
}

/// Puts `quantity` units back. A product that no longer exists is skipped
/// and `None` is returned.
pub async fn restock<T>(tx: &mut T, product_id: Uuid, quantity: i32) -> OmsResult<Option<Product>>
where
  T: StoreTx + ?Sized,
{
  let Some(mut product) = tx.lock_product(product_id).await? else {
    event!(
      Level::WARN,
      product_id = %product_id,
      quantity,
      "Restock skipped: product no longer exists."
    );
    return Ok(None);
  };

  product.stock += quantity;
  tx.update_product_stock(product_id, product.stock).await?;
  Ok(Some(product))
}
